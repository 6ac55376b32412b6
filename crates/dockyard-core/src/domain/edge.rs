//! Screen edges a dock can occupy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four edges of a rectangular screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

/// Error returned when a persisted edge name is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown screen edge: {0:?}")]
pub struct ParseEdgeError(pub String);

impl Edge {
    /// Every edge, in the order free edges are reported.
    ///
    /// Bottom comes first because it is where a new dock lands when the
    /// caller simply takes the first free edge.
    pub const ALL: [Edge; 4] = [Edge::Bottom, Edge::Left, Edge::Top, Edge::Right];

    /// Lower-case name used in layout files.
    pub fn as_str(self) -> &'static str {
        match self {
            Edge::Top => "top",
            Edge::Bottom => "bottom",
            Edge::Left => "left",
            Edge::Right => "right",
        }
    }

    /// Returns `true` for the edges that produce a vertical dock.
    pub fn is_vertical(self) -> bool {
        matches!(self, Edge::Left | Edge::Right)
    }
}

impl Default for Edge {
    fn default() -> Self {
        Edge::Bottom
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Edge {
    type Err = ParseEdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Edge::Top),
            "bottom" => Ok(Edge::Bottom),
            "left" => Ok(Edge::Left),
            "right" => Ok(Edge::Right),
            _ => Err(ParseEdgeError(s.to_string())),
        }
    }
}
