//! Generic actions: every command that is not a shell builtin.
//!
//! The dispatcher forwards such commands, by name and raw argument vector,
//! to an [`Actions`] implementation. [`ActionTable`] is the table-driven one
//! used with [`MemoryBackend`](crate::backend::MemoryBackend).

mod table;

use std::io::{self, Write};

use crate::backend::Backend;
use crate::flow::Status;
use crate::help::HelpRenderer;
use crate::session::Session;

pub use table::{ActionSpec, ActionTable, Arg, Param, ParamKind};

/// The collaborator that runs non-builtin commands.
pub trait Actions<B: Backend> {
    /// Run `name` with `args`. Reports its own diagnostics on stderr.
    fn run_action(
        &self,
        session: &mut Session<B>,
        name: &str,
        args: &[String],
        out: &mut dyn Write,
    ) -> io::Result<Status>;

    /// One summary line per command.
    fn list_commands(&self, out: &mut dyn Write) -> io::Result<()>;

    /// Detailed help for `name`. Returns false if the command is unknown.
    fn display_command(
        &self,
        name: &str,
        help: &HelpRenderer,
        out: &mut dyn Write,
    ) -> io::Result<bool>;
}
