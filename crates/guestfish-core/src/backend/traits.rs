//! The backend trait and its error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by a backend operation.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("call launch before using this function")]
    NotLaunched,

    #[error("the appliance has already been launched")]
    AlreadyLaunched,

    #[error("launch failed: {0}")]
    LaunchFailed(String),

    #[error("appliance is not ready: {0}")]
    NotReady(String),

    #[error("{}: no such file", .0.display())]
    NoSuchFile(PathBuf),

    #[error("{0}: no such device")]
    NoSuchDevice(String),

    #[error("{0}: no such file or directory")]
    NotFound(String),

    #[error("{0}: not a directory")]
    NotADirectory(String),

    #[error("{0}: is a directory")]
    IsADirectory(String),

    #[error("{0}: directory not empty")]
    DirectoryNotEmpty(String),

    #[error("{0}: file exists")]
    AlreadyExists(String),

    #[error("{0}: path must start with a / character")]
    RelativePath(String),

    #[error("{0}: no filesystem is mounted here")]
    NotMounted(String),

    #[error("{0}: already mounted")]
    AlreadyMounted(String),

    #[error("{0}: read-only filesystem")]
    ReadOnly(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// The stateful session handle the shell sits in front of.
///
/// Calls are blocking and either succeed or fail; the shell decides what a
/// failure means (usage error, fatal setup error, ...).
pub trait Backend {
    /// Start the backend process.
    fn launch(&mut self) -> BackendResult<()>;

    /// Block until a launched backend reports ready.
    fn wait_ready(&mut self) -> BackendResult<()>;

    /// Register a disk image. Only valid before launch.
    fn add_drive(&mut self, path: &str) -> BackendResult<()>;

    /// Register a CD-ROM image. Only valid before launch.
    fn add_cdrom(&mut self, path: &str) -> BackendResult<()>;

    /// Mount `device` at `mountpoint`. Requires a launched backend.
    fn mount(&mut self, device: &str, mountpoint: &str) -> BackendResult<()>;

    /// Whether to unmount and sync when the handle is torn down.
    fn set_autosync(&mut self, autosync: bool) -> BackendResult<()>;

    fn set_verbose(&mut self, level: u32) -> BackendResult<()>;
}
