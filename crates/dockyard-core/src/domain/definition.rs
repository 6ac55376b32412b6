//! Dock definitions: the persisted description of every dock in a layout.
//!
//! A [`DockDefinition`] is a *container*-level entity (a dock, a tray
//! container, or some other containment).  Inside it live *leaf* entities
//! ([`LeafDefinition`]), the applets shown on the dock.  Containers and leaves
//! share one identifier namespace, which is why duplication has to renumber
//! both of them together.
//!
//! The kind of a container is decided once, from its plugin id, when the
//! definition is constructed.  Nothing downstream inspects plugin strings.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::edge::Edge;

/// Plugin id of a dock container managed by dockyard.
pub const DOCK_PLUGIN: &str = "org.dockyard.containment";

/// Plugin id of a tray container nested inside a dock's tray leaf.
pub const TRAY_PLUGIN: &str = "org.dockyard.systemtray";

/// Plugin id of desktop placeholder containers, which are never duplicated.
pub const GHOST_PLUGIN: &str = "org.dockyard.desktopcontainment";

/// Layout name reserved for the hidden aggregate file used when several
/// layouts are loaded at the same time.
pub const MULTIPLE_LAYOUTS_NAME: &str = ".multiple-layouts_hidden";

/// `general` entries that hold `;`-joined leaf identifier lists.
pub const ORDER_LIST_KEYS: [&str; 3] = [
    "leaf_order",
    "locked_zoom_leaves",
    "user_blocks_colorizing_leaves",
];

/// Errors produced when parsing persisted identifiers or enum values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionParseError {
    #[error("invalid entity id: {0:?}")]
    InvalidId(String),
    #[error("unknown visibility mode: {0:?}")]
    InvalidVisibility(String),
}

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Identifier of a container or leaf.
///
/// Persisted as the decimal string of a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = DefinitionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(v) if v > 0 => Ok(EntityId(v)),
            _ => Err(DefinitionParseError::InvalidId(s.to_string())),
        }
    }
}

/// Parses a `;`-joined identifier list.  Empty and malformed elements are skipped.
pub fn parse_id_list(value: &str) -> Vec<EntityId> {
    value
        .split(';')
        .filter_map(|part| part.parse::<EntityId>().ok())
        .collect()
}

/// Joins identifiers back into the persisted `;` form.
pub fn join_id_list(ids: &[EntityId]) -> String {
    ids.iter()
        .map(EntityId::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

// ── Enumerations ──────────────────────────────────────────────────────────────

/// Which screen a dock follows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScreenAffinity {
    /// Always placed on whichever screen is currently primary.
    OnPrimary,
    /// Pinned to the named screen.
    Explicit(String),
}

/// How a dock reacts to windows overlapping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    AlwaysVisible,
    AutoHide,
    #[default]
    DodgeActive,
    DodgeMaximized,
    DodgeAllWindows,
    WindowsGoBelow,
    WindowsCanCover,
    WindowsAlwaysCover,
}

impl VisibilityMode {
    pub fn as_str(self) -> &'static str {
        match self {
            VisibilityMode::AlwaysVisible => "always_visible",
            VisibilityMode::AutoHide => "auto_hide",
            VisibilityMode::DodgeActive => "dodge_active",
            VisibilityMode::DodgeMaximized => "dodge_maximized",
            VisibilityMode::DodgeAllWindows => "dodge_all_windows",
            VisibilityMode::WindowsGoBelow => "windows_go_below",
            VisibilityMode::WindowsCanCover => "windows_can_cover",
            VisibilityMode::WindowsAlwaysCover => "windows_always_cover",
        }
    }

    /// Modes that keep a real strut and therefore always go through the
    /// compositor.
    pub fn forbids_compositor_bypass(self) -> bool {
        matches!(
            self,
            VisibilityMode::AlwaysVisible | VisibilityMode::WindowsGoBelow
        )
    }
}

impl FromStr for VisibilityMode {
    type Err = DefinitionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.trim() {
            "always_visible" => VisibilityMode::AlwaysVisible,
            "auto_hide" => VisibilityMode::AutoHide,
            "dodge_active" => VisibilityMode::DodgeActive,
            "dodge_maximized" => VisibilityMode::DodgeMaximized,
            "dodge_all_windows" => VisibilityMode::DodgeAllWindows,
            "windows_go_below" => VisibilityMode::WindowsGoBelow,
            "windows_can_cover" => VisibilityMode::WindowsCanCover,
            "windows_always_cover" => VisibilityMode::WindowsAlwaysCover,
            other => return Err(DefinitionParseError::InvalidVisibility(other.to_string())),
        };
        Ok(mode)
    }
}

/// What a container definition is, decided from its plugin id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    /// A dock managed by dockyard.
    Dock,
    /// A tray container referenced from a dock leaf.
    Tray,
    /// A desktop placeholder.  Never duplicated.
    Ghost,
    /// Any other container flowing through the same channel.
    Other,
}

impl DefinitionKind {
    pub fn from_plugin(plugin: &str) -> Self {
        match plugin {
            DOCK_PLUGIN => DefinitionKind::Dock,
            TRAY_PLUGIN => DefinitionKind::Tray,
            GHOST_PLUGIN => DefinitionKind::Ghost,
            _ => DefinitionKind::Other,
        }
    }
}

/// Whether one layout or several layouts are loaded at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryUsage {
    #[default]
    Single,
    Multiple,
}

// ── Leaves ────────────────────────────────────────────────────────────────────

/// An applet living on a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafDefinition {
    pub id: EntityId,
    pub plugin: String,
    /// Free-form configuration entries of the leaf.
    pub configuration: BTreeMap<String, String>,
    /// Tray container this leaf hosts, when the leaf is a tray applet.
    pub tray_container: Option<EntityId>,
}

impl LeafDefinition {
    pub fn new(id: EntityId, plugin: impl Into<String>) -> Self {
        Self {
            id,
            plugin: plugin.into(),
            configuration: BTreeMap::new(),
            tray_container: None,
        }
    }

    pub fn with_tray(mut self, tray: EntityId) -> Self {
        self.tray_container = Some(tray);
        self
    }
}

// ── Containers ────────────────────────────────────────────────────────────────

/// A persisted container definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockDefinition {
    pub id: EntityId,
    plugin: String,
    kind: DefinitionKind,
    pub affinity: ScreenAffinity,
    /// Last screen the dock was seen on.
    pub last_screen: Option<String>,
    pub edge: Edge,
    pub visibility: VisibilityMode,
    pub bypass_compositor: bool,
    /// Owning layout in multi-layout mode.
    pub layout_owner: Option<String>,
    /// `general` block, including the identifier ordering lists.
    pub general: BTreeMap<String, String>,
    pub leaves: Vec<LeafDefinition>,
}

impl DockDefinition {
    /// Creates a container with default placement (primary screen, bottom edge).
    pub fn new(id: EntityId, plugin: impl Into<String>) -> Self {
        let plugin = plugin.into();
        Self {
            id,
            kind: DefinitionKind::from_plugin(&plugin),
            plugin,
            affinity: ScreenAffinity::OnPrimary,
            last_screen: None,
            edge: Edge::Bottom,
            visibility: VisibilityMode::default(),
            bypass_compositor: false,
            layout_owner: None,
            general: BTreeMap::new(),
            leaves: Vec::new(),
        }
    }

    /// Shorthand for a dock-kind definition.
    pub fn dock(id: u32, affinity: ScreenAffinity, edge: Edge) -> Self {
        let mut def = Self::new(EntityId(id), DOCK_PLUGIN);
        def.affinity = affinity;
        def.edge = edge;
        def
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn kind(&self) -> DefinitionKind {
        self.kind
    }

    pub fn is_dock(&self) -> bool {
        self.kind == DefinitionKind::Dock
    }

    /// A definition with no plugin cannot be instantiated.
    pub fn is_loadable(&self) -> bool {
        !self.plugin.trim().is_empty()
    }

    pub fn is_on_primary(&self) -> bool {
        self.affinity == ScreenAffinity::OnPrimary
    }

    /// The pinned screen, for explicit-affinity definitions.
    pub fn explicit_screen(&self) -> Option<&str> {
        match &self.affinity {
            ScreenAffinity::Explicit(name) => Some(name.as_str()),
            ScreenAffinity::OnPrimary => None,
        }
    }

    /// The screen this definition names: its pinned screen, else the last
    /// screen it was seen on.
    pub fn requested_screen(&self) -> Option<&str> {
        self.explicit_screen().or(self.last_screen.as_deref())
    }

    /// Compositor bypass after the visibility mode has had its say.
    pub fn effective_bypass_compositor(&self) -> bool {
        !self.visibility.forbids_compositor_bypass() && self.bypass_compositor
    }

    /// Tray containers referenced from this definition's leaves.
    pub fn tray_containers(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.leaves.iter().filter_map(|leaf| leaf.tray_container)
    }

    /// Tray back-reference of the first tray leaf, if any.
    pub fn tray_container(&self) -> Option<EntityId> {
        self.tray_containers().next()
    }

    pub fn leaf_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.leaves.iter().map(|leaf| leaf.id)
    }

    /// Reads one of the `;`-joined ordering lists from `general`.
    pub fn order_list(&self, key: &str) -> Vec<EntityId> {
        self.general
            .get(key)
            .map(|v| parse_id_list(v))
            .unwrap_or_default()
    }

    pub fn set_order_list(&mut self, key: &str, ids: &[EntityId]) {
        self.general.insert(key.to_string(), join_id_list(ids));
    }
}

// ── Definition sets ───────────────────────────────────────────────────────────

/// All container definitions of one layout, in insertion order.
///
/// Insertion order matters: when two definitions claim the same edge, the
/// one encountered first wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionSet {
    definitions: Vec<DockDefinition>,
}

impl DefinitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(definitions: Vec<DockDefinition>) -> Self {
        let mut set = Self::new();
        for def in definitions {
            set.insert(def);
        }
        set
    }

    /// Inserts a definition, replacing any definition with the same id in place.
    pub fn insert(&mut self, def: DockDefinition) {
        match self.definitions.iter_mut().find(|d| d.id == def.id) {
            Some(existing) => *existing = def,
            None => self.definitions.push(def),
        }
    }

    pub fn remove(&mut self, id: EntityId) -> Option<DockDefinition> {
        let index = self.definitions.iter().position(|d| d.id == id)?;
        Some(self.definitions.remove(index))
    }

    pub fn get(&self, id: EntityId) -> Option<&DockDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut DockDefinition> {
        self.definitions.iter_mut().find(|d| d.id == id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DockDefinition> {
        self.definitions.iter()
    }

    /// Definitions of the managed dock kind.
    pub fn docks(&self) -> impl Iterator<Item = &DockDefinition> {
        self.definitions.iter().filter(|d| d.is_dock())
    }

    /// Tray containers referenced by the given dock.
    pub fn trays_of(&self, dock: EntityId) -> Vec<&DockDefinition> {
        let Some(def) = self.get(dock) else {
            return Vec::new();
        };
        def.tray_containers()
            .filter_map(|tray| self.get(tray))
            .collect()
    }

    pub fn container_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.definitions.iter().map(|d| d.id)
    }

    pub fn leaf_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.definitions.iter().flat_map(|d| d.leaf_ids())
    }

    /// Every identifier in use, containers and leaves together.
    pub fn all_ids(&self) -> BTreeSet<EntityId> {
        self.container_ids().chain(self.leaf_ids()).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Keeps only definitions owned by `layout`.
    pub fn retain_owned_by(&mut self, layout: &str) {
        self.definitions
            .retain(|d| d.layout_owner.as_deref() == Some(layout));
    }
}

impl IntoIterator for DefinitionSet {
    type Item = DockDefinition;
    type IntoIter = std::vec::IntoIter<DockDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.into_iter()
    }
}
