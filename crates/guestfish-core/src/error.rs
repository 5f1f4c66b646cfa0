//! Fatal shell errors.
//!
//! Anything returned as a `ShellError` ends the process with exit status 1.
//! Recoverable per-command failures are a [`Status`](crate::flow::Status)
//! instead and never show up here.

use std::io;

use thiserror::Error;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum ShellError {
    /// An input line overflowed the argument vector.
    #[error("too many arguments in command (at most {limit})")]
    TooManyArguments { limit: usize },

    /// A chain started with, or contained two consecutive, `:` separators.
    #[error("empty command on command line")]
    EmptyChainCommand,

    /// A command in chain mode returned failure.
    #[error("command '{command}' failed")]
    ChainCommandFailed { command: String },

    /// Launch during mandatory setup failed.
    #[error("launch failed")]
    LaunchFailed(#[source] BackendError),

    /// A `-m` mount failed during startup replay.
    #[error("mount {device} on {mountpoint}")]
    MountFailed {
        device: String,
        mountpoint: String,
        #[source]
        source: BackendError,
    },

    /// Writing shell output failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}
