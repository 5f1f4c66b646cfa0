//! guestfish-core: the command-line processing and dispatch engine of guestfish.
//!
//! This crate provides:
//!
//! - **Tokenizer**: splits an input line into a command name and a bounded argument vector
//! - **Mounts**: the ordered `-m dev[:mnt]` list, replayed in command-line order
//! - **Session**: the backend handle plus the one-shot launcher
//! - **Dispatch**: builtin commands (`help`, `quit`, `add`, `cdrom`, `launch`) and the
//!   fall-through to the generic action table
//! - **Driver**: script mode and command-line chain mode (`cmd : cmd : cmd`)
//! - **Backend**: the backend trait and an in-memory appliance
//! - **Actions**: the table-driven generic action dispatcher

pub mod actions;
pub mod backend;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod flow;
pub mod help;
pub mod mounts;
pub mod session;
pub mod tokenizer;

pub use actions::{ActionTable, Actions};
pub use backend::{Backend, BackendError, BackendResult, MemoryBackend};
pub use dispatch::{Builtin, Command, Shell};
pub use driver::{ChainGroups, InputMode};
pub use error::ShellError;
pub use flow::{Flow, Status};
pub use help::HelpRenderer;
pub use mounts::{MountEntry, MountList};
pub use session::{Session, ShellConfig};
pub use tokenizer::{tokenize, Invocation, ARG_SLOTS};
