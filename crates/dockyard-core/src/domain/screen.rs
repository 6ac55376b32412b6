//! Attached screens.
//!
//! Screens are identified by their stable connector name (e.g. `"HDMI-1"`).
//! The `handle` is whatever the platform uses for the live output object; it
//! changes when a screen is unplugged and plugged back in, even though the
//! name stays the same.

use serde::{Deserialize, Serialize};

/// Opaque platform handle of a live screen object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenHandle(pub u64);

/// A single attached screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screen {
    /// Stable connector name.
    pub name: String,
    /// Volatile platform handle.
    pub handle: ScreenHandle,
    /// Whether this is the primary screen.
    pub primary: bool,
}

impl Screen {
    pub fn new(name: impl Into<String>, handle: u64, primary: bool) -> Self {
        Self {
            name: name.into(),
            handle: ScreenHandle(handle),
            primary,
        }
    }
}

/// The set of currently attached screens.
///
/// At most one screen is primary.  When the platform reports none as primary
/// the first attached screen is treated as primary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenTopology {
    screens: Vec<Screen>,
}

impl ScreenTopology {
    pub fn new(screens: Vec<Screen>) -> Self {
        Self { screens }
    }

    /// Returns the primary screen, if any screen is attached.
    pub fn primary(&self) -> Option<&Screen> {
        self.screens
            .iter()
            .find(|s| s.primary)
            .or_else(|| self.screens.first())
    }

    /// Returns `true` when `name` is the primary screen.
    pub fn is_primary(&self, name: &str) -> bool {
        self.primary().is_some_and(|p| p.name == name)
    }

    /// Looks a screen up by connector name.
    pub fn by_name(&self, name: &str) -> Option<&Screen> {
        self.screens.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name(name).is_some()
    }

    pub fn screens(&self) -> impl Iterator<Item = &Screen> {
        self.screens.iter()
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }
}
