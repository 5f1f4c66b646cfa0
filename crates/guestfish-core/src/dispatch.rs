//! Command dispatch.
//!
//! A command name resolves, case-insensitively and first match wins, to:
//!
//! 1. `help`: list commands, or describe one
//! 2. `quit` / `exit` / `q`: stop immediately
//! 3. `add` / `drive` / `add_drive`: add a disk image (one argument)
//! 4. `cdrom`: add a CD-ROM image (one argument)
//! 5. `launch`: start the backend (no arguments)
//! 6. anything else: forwarded unchanged to the generic actions
//!
//! Wrong arity for a builtin is a usage error: a diagnostic on stderr and a
//! failed status, never fatal on its own.

use std::io::{self, Write};

use crate::actions::Actions;
use crate::backend::{Backend, BackendResult};
use crate::error::ShellError;
use crate::flow::{Flow, Status};
use crate::help::{self, HelpRenderer};
use crate::mounts::MountList;
use crate::session::{Session, ShellConfig};
use crate::tokenizer::Invocation;

/// Commands handled by the shell itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Help,
    Quit,
    AddDrive,
    AddCdrom,
    Launch,
}

impl Builtin {
    /// In resolution (and listing) order.
    pub const ALL: [Builtin; 5] = [
        Builtin::Help,
        Builtin::Quit,
        Builtin::AddDrive,
        Builtin::AddCdrom,
        Builtin::Launch,
    ];

    /// Resolve a command name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.aliases().iter().any(|a| a.eq_ignore_ascii_case(name)))
    }

    /// Primary name.
    pub fn name(self) -> &'static str {
        self.aliases()[0]
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Builtin::Help => &["help"],
            Builtin::Quit => &["quit", "exit", "q"],
            Builtin::AddDrive => &["add", "drive", "add_drive"],
            Builtin::AddCdrom => &["cdrom"],
            Builtin::Launch => &["launch"],
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Builtin::Help => "display a list of commands or help on a command",
            Builtin::Quit => "quit guestfish",
            Builtin::AddDrive => "add a guest image to be examined or modified",
            Builtin::AddCdrom => "add a CD-ROM image to be examined",
            Builtin::Launch => "launch the subprocess",
        }
    }

    pub fn usage(self) -> &'static [&'static str] {
        match self {
            Builtin::Help => &["help cmd", "help"],
            Builtin::Quit => &["quit"],
            Builtin::AddDrive => &["add <image>"],
            Builtin::AddCdrom => &["cdrom <iso-file>"],
            Builtin::Launch => &["launch"],
        }
    }
}

/// What a command name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Builtin(Builtin),
    /// Forwarded to the generic actions with the raw name.
    Action(&'a str),
}

impl<'a> Command<'a> {
    pub fn resolve(name: &'a str) -> Self {
        match Builtin::from_name(name) {
            Some(builtin) => Command::Builtin(builtin),
            None => Command::Action(name),
        }
    }
}

/// The shell: a session, the generic actions, and the quit flag.
pub struct Shell<B: Backend, A: Actions<B>> {
    session: Session<B>,
    actions: A,
    help: HelpRenderer,
    quit: bool,
}

impl<B: Backend, A: Actions<B>> Shell<B, A> {
    /// Create a shell around a freshly created backend.
    pub fn new(backend: B, actions: A, config: ShellConfig) -> BackendResult<Self> {
        let mut session = Session::new(backend)?;
        if !config.autosync {
            session.set_autosync(false)?;
        }
        if config.verbose > 0 {
            session.set_verbose(config.verbose)?;
        }
        Ok(Self {
            session,
            actions,
            help: HelpRenderer::new(config.help_filter),
            quit: false,
        })
    }

    pub fn session(&self) -> &Session<B> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<B> {
        &mut self.session
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn is_quit(&self) -> bool {
        self.quit
    }

    /// Stop the input loop after the current command.
    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    /// Launch the backend and apply `-m` mounts, if there are any.
    pub fn mount_all(&mut self, mounts: &MountList) -> Result<(), ShellError> {
        if mounts.is_empty() {
            return Ok(());
        }
        self.session.launch().map_err(ShellError::LaunchFailed)?;
        tracing::info!(count = mounts.len(), "mounting filesystems");
        mounts.replay(&mut self.session)
    }

    /// Run one tokenized command.
    pub fn dispatch(&mut self, invocation: &Invocation, out: &mut dyn Write) -> io::Result<Flow> {
        let name = invocation.name.as_str();
        let args = invocation.args.as_slice();
        let command = Command::resolve(name);
        tracing::debug!(?command, argc = args.len(), "dispatch");

        let status = match command {
            Command::Builtin(Builtin::Help) => {
                self.help(args.first().map(String::as_str), out)?;
                Status::Ok
            }
            Command::Builtin(Builtin::Quit) => {
                self.quit = true;
                return Ok(Flow::Quit);
            }
            Command::Builtin(Builtin::AddDrive) => match args {
                [image] => Status::report(self.session.add_drive(image)),
                _ => {
                    eprintln!("use 'add image' to add a guest image");
                    Status::Failed
                }
            },
            Command::Builtin(Builtin::AddCdrom) => match args {
                [image] => Status::report(self.session.add_cdrom(image)),
                _ => {
                    eprintln!("use 'cdrom image' to add a CD-ROM image");
                    Status::Failed
                }
            },
            Command::Builtin(Builtin::Launch) => {
                if args.is_empty() {
                    Status::report(self.session.launch())
                } else {
                    eprintln!("'launch' command takes no parameters");
                    Status::Failed
                }
            }
            Command::Action(name) => {
                self.actions
                    .run_action(&mut self.session, name, args, out)?
            }
        };
        Ok(Flow::Continue(status))
    }

    /// `help` and `help <cmd>`.
    pub fn help(&self, command: Option<&str>, out: &mut dyn Write) -> io::Result<()> {
        match command {
            None => {
                help::list_builtin_commands(out)?;
                self.actions.list_commands(out)
            }
            Some(name) => {
                if help::display_builtin_command(name, out)?
                    || self.actions.display_command(name, &self.help, out)?
                {
                    return Ok(());
                }
                eprintln!("{name}: command not known, use -h to list all commands");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Actions that record what was forwarded to them.

    use std::cell::RefCell;
    use std::io::{self, Write};

    use crate::actions::Actions;
    use crate::backend::Backend;
    use crate::flow::Status;
    use crate::help::HelpRenderer;
    use crate::session::Session;

    #[derive(Debug, Default)]
    pub struct RecordingActions {
        pub forwarded: RefCell<Vec<(String, Vec<String>)>>,
        /// Command names that report failure.
        pub failing: Vec<String>,
    }

    impl RecordingActions {
        pub fn failing(names: &[&str]) -> Self {
            Self {
                failing: names.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn names(&self) -> Vec<String> {
            self.forwarded.borrow().iter().map(|(n, _)| n.clone()).collect()
        }
    }

    impl<B: Backend> Actions<B> for RecordingActions {
        fn run_action(
            &self,
            _session: &mut Session<B>,
            name: &str,
            args: &[String],
            out: &mut dyn Write,
        ) -> io::Result<Status> {
            self.forwarded
                .borrow_mut()
                .push((name.to_string(), args.to_vec()));
            writeln!(out, "ran {name}")?;
            if self.failing.iter().any(|f| f == name) {
                Ok(Status::Failed)
            } else {
                Ok(Status::Ok)
            }
        }

        fn list_commands(&self, out: &mut dyn Write) -> io::Result<()> {
            writeln!(out, "{:<20} {}", "frob", "frobnicate the guest")
        }

        fn display_command(
            &self,
            name: &str,
            help: &HelpRenderer,
            out: &mut dyn Write,
        ) -> io::Result<bool> {
            if name.eq_ignore_ascii_case("frob") {
                help.render("frob - frobnicate the guest", " frob", out)?;
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }
}
