//! Backends that a guestfish session drives.
//!
//! The shell only ever talks to a backend through the [`Backend`] trait,
//! which covers the setup operations it sequences itself (drives, launch,
//! mounts, verbosity, autosync). [`MemoryBackend`] is a self-contained
//! appliance used by the `guestfish` binary and in tests:
//!
//! ```text
//! host image files ──add_drive──▶ /dev/sda, /dev/sdb, ...
//!                                  │
//!                     launch ─▶ wait_ready
//!                                  │
//!                   mount /dev/sda /      mount /dev/sdb /boot
//!                                  ▼
//!                       one path namespace, longest mountpoint wins
//! ```

mod memory;
mod traits;
mod tree;

pub use memory::MemoryBackend;
pub use traits::{Backend, BackendError, BackendResult};
pub use tree::{EntryKind, MemoryTree, TreeEntry};
