//! Pending `-m dev[:mnt]` mounts.
//!
//! Entries are kept in the order they were given and replayed in that
//! order: the Nth `-m` on the command line is mounted Nth.

use std::str::FromStr;

use crate::backend::Backend;
use crate::error::ShellError;
use crate::session::Session;

/// A device waiting to be mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mountpoint: String,
}

impl MountEntry {
    pub fn new(device: impl Into<String>, mountpoint: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            mountpoint: mountpoint.into(),
        }
    }
}

impl FromStr for MountEntry {
    type Err = String;

    /// Parse `dev` or `dev:mnt`, splitting at the first `:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (device, mountpoint) = match s.split_once(':') {
            Some((device, mountpoint)) => (device, mountpoint),
            None => (s, "/"),
        };
        if device.is_empty() {
            return Err(format!("'{s}': missing device name"));
        }
        Ok(Self::new(device, mountpoint))
    }
}

/// Ordered list of pending mounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountList {
    entries: Vec<MountEntry>,
}

impl MountList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a mount; `None` mounts at `/`.
    pub fn add(&mut self, device: impl Into<String>, mountpoint: Option<String>) {
        self.entries.push(MountEntry::new(
            device,
            mountpoint.unwrap_or_else(|| "/".to_string()),
        ));
    }

    pub fn push(&mut self, entry: MountEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountEntry> {
        self.entries.iter()
    }

    /// Mount every entry in order, stopping at the first failure.
    ///
    /// The session must already be launched.
    pub fn replay<B: Backend>(&self, session: &mut Session<B>) -> Result<(), ShellError> {
        for entry in &self.entries {
            tracing::debug!(device = %entry.device, mountpoint = %entry.mountpoint, "replaying mount");
            session
                .mount(&entry.device, &entry.mountpoint)
                .map_err(|source| ShellError::MountFailed {
                    device: entry.device.clone(),
                    mountpoint: entry.mountpoint.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

impl FromIterator<MountEntry> for MountList {
    fn from_iter<I: IntoIterator<Item = MountEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<MountEntry> for MountList {
    fn extend<I: IntoIterator<Item = MountEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}
