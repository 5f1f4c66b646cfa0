//! In-memory appliance.
//!
//! Simulates a guest appliance without a hypervisor: added images become
//! devices with empty, session-lived filesystems, and a mount table maps
//! guest paths onto them by longest matching mountpoint.

use std::io;
use std::path::{Path, PathBuf};

use super::traits::{Backend, BackendError, BackendResult};
use super::tree::{MemoryTree, TreeEntry};

/// What kind of image a device was added as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveKind {
    Disk,
    Cdrom,
}

#[derive(Debug)]
struct Drive {
    device: String,
    kind: DriveKind,
    tree: MemoryTree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Config,
    Launching,
    Ready,
}

#[derive(Debug, Clone)]
struct Mount {
    mountpoint: PathBuf,
    drive: usize,
}

/// The in-memory appliance backend.
#[derive(Debug)]
pub struct MemoryBackend {
    drives: Vec<Drive>,
    mounts: Vec<Mount>,
    state: State,
    autosync: bool,
    verbose: u32,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Linux-style disk name for the n'th drive: sda..sdz, sdaa, sdab, ...
fn device_name(index: usize) -> String {
    let mut suffix = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        n -= 1;
        suffix.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    suffix.reverse();
    format!("/dev/sd{}", String::from_utf8_lossy(&suffix))
}

/// Attach a guest path to a tree error.
fn at(path: &str, err: io::Error) -> BackendError {
    let path = path.to_string();
    match err.kind() {
        io::ErrorKind::NotFound => BackendError::NotFound(path),
        io::ErrorKind::NotADirectory => BackendError::NotADirectory(path),
        io::ErrorKind::IsADirectory => BackendError::IsADirectory(path),
        io::ErrorKind::DirectoryNotEmpty => BackendError::DirectoryNotEmpty(path),
        io::ErrorKind::AlreadyExists => BackendError::AlreadyExists(path),
        _ => BackendError::Io(err),
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            drives: Vec::new(),
            mounts: Vec::new(),
            state: State::Config,
            autosync: false,
            verbose: 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    pub fn autosync(&self) -> bool {
        self.autosync
    }

    pub fn verbose(&self) -> u32 {
        self.verbose
    }

    fn add(&mut self, path: &str, kind: DriveKind) -> BackendResult<()> {
        if self.state != State::Config {
            return Err(BackendError::AlreadyLaunched);
        }
        let image = PathBuf::from(path);
        match std::fs::metadata(&image) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BackendError::NoSuchFile(image));
            }
            Err(e) => return Err(e.into()),
        }

        let device = device_name(self.drives.len());
        tracing::debug!(device = %device, image = %image.display(), ?kind, "added drive");
        self.drives.push(Drive {
            device,
            kind,
            tree: MemoryTree::new(),
        });
        Ok(())
    }

    fn require_ready(&self) -> BackendResult<()> {
        if self.state == State::Ready {
            Ok(())
        } else {
            Err(BackendError::NotLaunched)
        }
    }

    fn find_device(&self, device: &str) -> BackendResult<usize> {
        self.drives
            .iter()
            .position(|d| d.device == device)
            .ok_or_else(|| BackendError::NoSuchDevice(device.to_string()))
    }

    /// Route an absolute guest path to (drive index, path inside that drive).
    fn resolve(&self, path: &str) -> BackendResult<(usize, PathBuf)> {
        self.require_ready()?;
        if !path.starts_with('/') {
            return Err(BackendError::RelativePath(path.to_string()));
        }
        let guest = Path::new(path);
        self.mounts
            .iter()
            .filter(|m| guest.starts_with(&m.mountpoint))
            .max_by_key(|m| m.mountpoint.components().count())
            .map(|m| {
                let rel = guest.strip_prefix(&m.mountpoint).unwrap_or(guest);
                (m.drive, rel.to_path_buf())
            })
            .ok_or_else(|| BackendError::NotMounted(path.to_string()))
    }

    fn resolve_writable(&mut self, path: &str) -> BackendResult<(&mut MemoryTree, PathBuf)> {
        let (drive, rel) = self.resolve(path)?;
        let drive = &mut self.drives[drive];
        if drive.kind == DriveKind::Cdrom {
            return Err(BackendError::ReadOnly(path.to_string()));
        }
        Ok((&mut drive.tree, rel))
    }

    /// Device names, in the order they were added.
    pub fn list_devices(&self) -> BackendResult<Vec<String>> {
        self.require_ready()?;
        Ok(self.drives.iter().map(|d| d.device.clone()).collect())
    }

    /// Mounted devices paired with their mountpoints, in mount order.
    pub fn mounts(&self) -> BackendResult<Vec<(String, String)>> {
        self.require_ready()?;
        Ok(self
            .mounts
            .iter()
            .map(|m| {
                (
                    self.drives[m.drive].device.clone(),
                    m.mountpoint.display().to_string(),
                )
            })
            .collect())
    }

    pub fn umount_all(&mut self) -> BackendResult<()> {
        self.require_ready()?;
        self.mounts.clear();
        Ok(())
    }

    pub fn sync(&mut self) -> BackendResult<()> {
        self.require_ready()?;
        tracing::debug!(mounts = self.mounts.len(), "sync");
        Ok(())
    }

    pub fn mkdir(&mut self, path: &str) -> BackendResult<()> {
        let (tree, rel) = self.resolve_writable(path)?;
        tree.mkdir(&rel).map_err(|e| at(path, e))
    }

    pub fn touch(&mut self, path: &str) -> BackendResult<()> {
        let (tree, rel) = self.resolve_writable(path)?;
        tree.touch(&rel).map_err(|e| at(path, e))
    }

    pub fn write_file(&mut self, path: &str, content: &[u8]) -> BackendResult<()> {
        let (tree, rel) = self.resolve_writable(path)?;
        tree.write(&rel, content).map_err(|e| at(path, e))
    }

    pub fn rm(&mut self, path: &str) -> BackendResult<()> {
        let (drive, rel) = self.resolve(path)?;
        // Removing a mountpoint out from under its mount is refused.
        if self.mounts.iter().any(|m| m.mountpoint == Path::new(path)) {
            return Err(BackendError::InvalidArgument(format!(
                "{path}: is a mountpoint"
            )));
        }
        let (tree, rel) = match self.drives[drive].kind {
            DriveKind::Cdrom => return Err(BackendError::ReadOnly(path.to_string())),
            DriveKind::Disk => (&mut self.drives[drive].tree, rel),
        };
        tree.remove(&rel).map_err(|e| at(path, e))
    }

    pub fn cat(&self, path: &str) -> BackendResult<Vec<u8>> {
        let (drive, rel) = self.resolve(path)?;
        self.drives[drive].tree.read(&rel).map_err(|e| at(path, e))
    }

    pub fn ls(&self, directory: &str) -> BackendResult<Vec<TreeEntry>> {
        let (drive, rel) = self.resolve(directory)?;
        self.drives[drive].tree.list(&rel).map_err(|e| at(directory, e))
    }
}

impl Backend for MemoryBackend {
    fn launch(&mut self) -> BackendResult<()> {
        if self.state != State::Config {
            return Err(BackendError::AlreadyLaunched);
        }
        if self.drives.is_empty() {
            return Err(BackendError::LaunchFailed(
                "no drives have been added".to_string(),
            ));
        }
        tracing::info!(drives = self.drives.len(), "launching appliance");
        self.state = State::Launching;
        Ok(())
    }

    fn wait_ready(&mut self) -> BackendResult<()> {
        match self.state {
            State::Config => Err(BackendError::NotReady(
                "launch has not been called".to_string(),
            )),
            State::Launching | State::Ready => {
                self.state = State::Ready;
                Ok(())
            }
        }
    }

    fn add_drive(&mut self, path: &str) -> BackendResult<()> {
        self.add(path, DriveKind::Disk)
    }

    fn add_cdrom(&mut self, path: &str) -> BackendResult<()> {
        self.add(path, DriveKind::Cdrom)
    }

    fn mount(&mut self, device: &str, mountpoint: &str) -> BackendResult<()> {
        self.require_ready()?;
        let drive = self.find_device(device)?;
        if !mountpoint.starts_with('/') {
            return Err(BackendError::RelativePath(mountpoint.to_string()));
        }
        let target = PathBuf::from(mountpoint);

        if self.mounts.iter().any(|m| m.drive == drive) {
            return Err(BackendError::AlreadyMounted(device.to_string()));
        }
        if self.mounts.iter().any(|m| m.mountpoint == target) {
            return Err(BackendError::AlreadyMounted(mountpoint.to_string()));
        }
        if target != Path::new("/") {
            let (under, rel) = self.resolve(mountpoint)?;
            if !self.drives[under].tree.is_dir(&rel) {
                return Err(BackendError::NotFound(mountpoint.to_string()));
            }
        }

        tracing::info!(device, mountpoint, "mounted");
        self.mounts.push(Mount {
            mountpoint: target,
            drive,
        });
        Ok(())
    }

    fn set_autosync(&mut self, autosync: bool) -> BackendResult<()> {
        self.autosync = autosync;
        Ok(())
    }

    fn set_verbose(&mut self, level: u32) -> BackendResult<()> {
        self.verbose = level;
        Ok(())
    }
}

impl Drop for MemoryBackend {
    fn drop(&mut self) {
        if self.autosync && self.state == State::Ready {
            tracing::debug!("autosync: unmounting and syncing on close");
            self.mounts.clear();
        }
    }
}
