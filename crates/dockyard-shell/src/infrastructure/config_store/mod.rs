//! Hierarchical key/value store holding layout files.
//!
//! A layout file is a tree of *groups*, each holding string *entries* and
//! nested groups.  Groups are addressed with `/`-separated paths such as
//! `containments/12/leaves/40`.  The empty path is the root group.
//!
//! [`ConfigStore`] is the seam the application layer uses.  [`TomlConfigStore`]
//! implements it over a nested TOML table, either in memory or backed by a
//! file on disk:
//!
//! ```toml
//! [containments.12]
//! plugin = "org.dockyard.containment"
//! on_primary = "true"
//! edge = "bottom"
//!
//! [containments.12.leaves.40]
//! plugin = "org.clock"
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::{Table, Value};

/// Error type for config store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A path segment names an entry where a group was expected.
    #[error("{0:?} is an entry, not a group")]
    NotAGroup(String),

    /// The group to copy does not exist.
    #[error("group {0:?} does not exist")]
    MissingGroup(String),

    /// A file system I/O error occurred.
    #[error("I/O error accessing layout file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file content could not be parsed.
    #[error("failed to parse layout file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The store could not be serialized.
    #[error("failed to serialize layout file: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Group/entry storage for layout definitions.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigStore: Send {
    /// Reads one entry, `None` when the group or the entry is absent.
    fn read_entry(&self, group: &str, key: &str) -> Option<String>;

    /// Reads one entry, falling back to `default`.
    fn read_entry_or(&self, group: &str, key: &str, default: &str) -> String {
        self.read_entry(group, key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Writes one entry, creating missing groups on the way.
    fn write_entry(&mut self, group: &str, key: &str, value: &str) -> Result<(), StoreError>;

    /// Names of the direct child groups of `group`.
    fn group_list(&self, group: &str) -> Vec<String>;

    /// Names of the entries of `group`.
    fn key_list(&self, group: &str) -> Vec<String>;

    fn has_group(&self, group: &str) -> bool;

    /// Deep-copies `from` to `to`, replacing anything already at `to`.
    fn copy_group(&mut self, from: &str, to: &str) -> Result<(), StoreError>;

    /// Deletes a group and everything below it.  Deleting a missing group is
    /// not an error.
    fn delete_group(&mut self, group: &str) -> Result<(), StoreError>;

    /// Flushes pending changes to the backing file, if any.
    fn sync(&mut self) -> Result<(), StoreError>;
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// [`ConfigStore`] over a nested TOML table.
#[derive(Debug, Clone, Default)]
pub struct TomlConfigStore {
    root: Table,
    path: Option<PathBuf>,
}

impl TomlConfigStore {
    /// A store that lives only in memory.  `sync` is a no-op.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Parses a store from TOML text, without a backing file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Parse`] if the text is not valid TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, StoreError> {
        Ok(Self {
            root: toml::from_str::<Table>(content)?,
            path: None,
        })
    }

    /// Opens the store backed by `path`.  A missing file yields an empty store
    /// that will be created on the first `sync`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for file-system errors other than "not
    /// found" and [`StoreError::Parse`] if the file is malformed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let root = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str::<Table>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Table::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            root,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Serializes the whole store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, StoreError> {
        Ok(toml::to_string_pretty(&self.root)?)
    }

    fn group(&self, path: &str) -> Option<&Table> {
        let mut table = &self.root;
        for segment in segments(path) {
            table = table.get(segment)?.as_table()?;
        }
        Some(table)
    }

    fn group_mut(&mut self, path: &str) -> Result<&mut Table, StoreError> {
        let mut table = &mut self.root;
        for segment in segments(path) {
            let value = table
                .entry(segment.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            table = match value {
                Value::Table(inner) => inner,
                _ => return Err(StoreError::NotAGroup(path.to_string())),
            };
        }
        Ok(table)
    }

    /// Splits `a/b/c` into (`a/b`, `c`).
    fn split_parent(path: &str) -> Option<(String, String)> {
        let parts: Vec<&str> = segments(path).collect();
        let (last, parent) = parts.split_last()?;
        Some((parent.join("/"), (*last).to_string()))
    }
}

impl ConfigStore for TomlConfigStore {
    fn read_entry(&self, group: &str, key: &str) -> Option<String> {
        match self.group(group)?.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Table(_) => None,
            other => Some(other.to_string()),
        }
    }

    fn write_entry(&mut self, group: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let table = self.group_mut(group)?;
        if let Some(Value::Table(_)) = table.get(key) {
            return Err(StoreError::NotAGroup(format!("{group}/{key}")));
        }
        table.insert(key.to_string(), Value::String(value.to_string()));
        Ok(())
    }

    fn group_list(&self, group: &str) -> Vec<String> {
        self.group(group)
            .map(|t| {
                t.iter()
                    .filter(|(_, v)| v.is_table())
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn key_list(&self, group: &str) -> Vec<String> {
        self.group(group)
            .map(|t| {
                t.iter()
                    .filter(|(_, v)| !v.is_table())
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn has_group(&self, group: &str) -> bool {
        self.group(group).is_some()
    }

    fn copy_group(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        let copy = self
            .group(from)
            .cloned()
            .ok_or_else(|| StoreError::MissingGroup(from.to_string()))?;
        let (parent, name) =
            Self::split_parent(to).ok_or_else(|| StoreError::NotAGroup(to.to_string()))?;
        self.group_mut(&parent)?.insert(name, Value::Table(copy));
        Ok(())
    }

    fn delete_group(&mut self, group: &str) -> Result<(), StoreError> {
        let Some((parent, name)) = Self::split_parent(group) else {
            self.root.clear();
            return Ok(());
        };
        if self.group(&parent).is_none() {
            return Ok(());
        }
        self.group_mut(&parent)?.remove(&name);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(&self.root)?;
        std::fs::write(path, content).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(())
    }
}
