//! Table-driven actions for the in-memory appliance.
//!
//! Each action declares its parameters with a type; raw arguments are
//! checked for arity and coerced before the handler runs.

use std::io::{self, Write};

use crate::backend::{BackendError, BackendResult, EntryKind, MemoryBackend};
use crate::flow::Status;
use crate::help::HelpRenderer;
use crate::session::Session;

use super::Actions;

/// How a raw argument is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    /// An absolute guest path.
    Path,
    /// A device name such as `/dev/sda`.
    Device,
    Int,
    Bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
}

const fn param(name: &'static str, kind: ParamKind) -> Param {
    Param { name, kind }
}

/// A coerced argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Str(String),
    Int(i64),
    Bool(bool),
}

type Handler = fn(&mut Session<MemoryBackend>, &[Arg], &mut dyn Write) -> BackendResult<()>;

/// One entry of the action table.
pub struct ActionSpec {
    pub name: &'static str,
    pub params: &'static [Param],
    pub summary: &'static str,
    pub description: &'static str,
    /// Refuse to run until the session is launched.
    pub needs_launch: bool,
    handler: Handler,
}

impl std::fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("needs_launch", &self.needs_launch)
            .finish()
    }
}

impl ActionSpec {
    /// Usage line, e.g. ` mount device mountpoint`.
    pub fn usage(&self) -> String {
        let mut usage = format!(" {}", self.name);
        for p in self.params {
            usage.push(' ');
            usage.push_str(p.name);
        }
        usage
    }
}

/// Compare command names ignoring case and treating `-` and `_` alike.
fn same_name(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes().zip(b.bytes()).all(|(x, y)| {
            let norm = |c: u8| if c == b'_' { b'-' } else { c.to_ascii_lowercase() };
            norm(x) == norm(y)
        })
}

fn coerce(kind: ParamKind, raw: &str) -> Result<Arg, String> {
    match kind {
        ParamKind::String | ParamKind::Path | ParamKind::Device => Ok(Arg::Str(raw.to_string())),
        ParamKind::Int => raw
            .parse::<i64>()
            .map(Arg::Int)
            .map_err(|_| format!("{raw}: expecting an integer")),
        ParamKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Arg::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Arg::Bool(false)),
            _ => Err(format!("{raw}: expecting true or false")),
        },
    }
}

fn bad_args() -> BackendError {
    BackendError::InvalidArgument("unexpected argument types".to_string())
}

/// The actions available with [`MemoryBackend`].
#[derive(Debug)]
pub struct ActionTable {
    actions: &'static [ActionSpec],
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionTable {
    pub fn new() -> Self {
        Self { actions: ACTIONS }
    }

    pub fn get(&self, name: &str) -> Option<&'static ActionSpec> {
        self.actions.iter().find(|a| same_name(a.name, name))
    }

    /// Action names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.actions.iter().map(|a| a.name).collect();
        names.sort_unstable();
        names
    }
}

impl Actions<MemoryBackend> for ActionTable {
    fn run_action(
        &self,
        session: &mut Session<MemoryBackend>,
        name: &str,
        args: &[String],
        out: &mut dyn Write,
    ) -> io::Result<Status> {
        let Some(spec) = self.get(name) else {
            eprintln!("guestfish: unknown command: {name}");
            return Ok(Status::Failed);
        };

        if args.len() != spec.params.len() {
            let n = spec.params.len();
            eprintln!(
                "{} should have {n} parameter{}",
                spec.name,
                if n == 1 { "" } else { "s" }
            );
            eprintln!("type 'help {}' for help on {}", spec.name, spec.name);
            return Ok(Status::Failed);
        }

        let mut coerced = Vec::with_capacity(args.len());
        for (param, raw) in spec.params.iter().zip(args) {
            match coerce(param.kind, raw) {
                Ok(arg) => coerced.push(arg),
                Err(msg) => {
                    eprintln!("{}: {}: {msg}", spec.name, param.name);
                    return Ok(Status::Failed);
                }
            }
        }

        if spec.needs_launch && !session.is_launched() {
            eprintln!("{}: call 'launch' before using this command", spec.name);
            return Ok(Status::Failed);
        }

        tracing::debug!(action = spec.name, "running action");
        match (spec.handler)(session, &coerced, out) {
            Ok(()) => Ok(Status::Ok),
            // A closed output stream ends the shell, not just this command.
            Err(BackendError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => Err(e),
            Err(e) => {
                eprintln!("{}: {e}", spec.name);
                Ok(Status::Failed)
            }
        }
    }

    fn list_commands(&self, out: &mut dyn Write) -> io::Result<()> {
        for name in self.names() {
            if let Some(spec) = self.get(name) {
                writeln!(out, "{:<20} {}", spec.name, spec.summary)?;
            }
        }
        writeln!(out, "    Use -h <cmd> / help <cmd> to show detailed help for a command.")
    }

    fn display_command(
        &self,
        name: &str,
        help: &HelpRenderer,
        out: &mut dyn Write,
    ) -> io::Result<bool> {
        let Some(spec) = self.get(name) else {
            return Ok(false);
        };
        let heading = format!("{} - {}", spec.name, spec.summary);
        let body = format!("{}\n\n{}", spec.usage(), spec.description);
        help.render(&heading, &body, out)?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn list_devices(s: &mut Session<MemoryBackend>, _: &[Arg], out: &mut dyn Write) -> BackendResult<()> {
    for device in s.backend().list_devices()? {
        writeln!(out, "{device}")?;
    }
    Ok(())
}

fn mounts(s: &mut Session<MemoryBackend>, _: &[Arg], out: &mut dyn Write) -> BackendResult<()> {
    for (device, _) in s.backend().mounts()? {
        writeln!(out, "{device}")?;
    }
    Ok(())
}

fn mount(s: &mut Session<MemoryBackend>, args: &[Arg], _: &mut dyn Write) -> BackendResult<()> {
    let [Arg::Str(device), Arg::Str(mountpoint)] = args else {
        return Err(bad_args());
    };
    s.mount(device, mountpoint)
}

fn umount_all(s: &mut Session<MemoryBackend>, _: &[Arg], _: &mut dyn Write) -> BackendResult<()> {
    s.backend_mut().umount_all()
}

fn sync(s: &mut Session<MemoryBackend>, _: &[Arg], _: &mut dyn Write) -> BackendResult<()> {
    s.backend_mut().sync()
}

fn touch(s: &mut Session<MemoryBackend>, args: &[Arg], _: &mut dyn Write) -> BackendResult<()> {
    let [Arg::Str(path)] = args else {
        return Err(bad_args());
    };
    s.backend_mut().touch(path)
}

fn mkdir(s: &mut Session<MemoryBackend>, args: &[Arg], _: &mut dyn Write) -> BackendResult<()> {
    let [Arg::Str(path)] = args else {
        return Err(bad_args());
    };
    s.backend_mut().mkdir(path)
}

fn write_file(s: &mut Session<MemoryBackend>, args: &[Arg], _: &mut dyn Write) -> BackendResult<()> {
    let [Arg::Str(path), Arg::Str(content)] = args else {
        return Err(bad_args());
    };
    s.backend_mut().write_file(path, content.as_bytes())
}

fn cat(s: &mut Session<MemoryBackend>, args: &[Arg], out: &mut dyn Write) -> BackendResult<()> {
    let [Arg::Str(path)] = args else {
        return Err(bad_args());
    };
    let data = s.backend().cat(path)?;
    out.write_all(&data)?;
    if !data.is_empty() && !data.ends_with(b"\n") {
        writeln!(out)?;
    }
    Ok(())
}

fn ls(s: &mut Session<MemoryBackend>, args: &[Arg], out: &mut dyn Write) -> BackendResult<()> {
    let [Arg::Str(directory)] = args else {
        return Err(bad_args());
    };
    for entry in s.backend().ls(directory)? {
        match entry.kind {
            EntryKind::Directory => writeln!(out, "{}/", entry.name)?,
            EntryKind::File => writeln!(out, "{}", entry.name)?,
        }
    }
    Ok(())
}

fn rm(s: &mut Session<MemoryBackend>, args: &[Arg], _: &mut dyn Write) -> BackendResult<()> {
    let [Arg::Str(path)] = args else {
        return Err(bad_args());
    };
    s.backend_mut().rm(path)
}

fn set_verbose(s: &mut Session<MemoryBackend>, args: &[Arg], _: &mut dyn Write) -> BackendResult<()> {
    let [Arg::Int(level)] = args else {
        return Err(bad_args());
    };
    let level = u32::try_from(*level)
        .map_err(|_| BackendError::InvalidArgument(format!("{level}: verbosity must be non-negative")))?;
    s.set_verbose(level)
}

fn get_verbose(s: &mut Session<MemoryBackend>, _: &[Arg], out: &mut dyn Write) -> BackendResult<()> {
    writeln!(out, "{}", s.verbose())?;
    Ok(())
}

fn set_autosync(s: &mut Session<MemoryBackend>, args: &[Arg], _: &mut dyn Write) -> BackendResult<()> {
    let [Arg::Bool(autosync)] = args else {
        return Err(bad_args());
    };
    s.set_autosync(*autosync)
}

fn get_autosync(s: &mut Session<MemoryBackend>, _: &[Arg], out: &mut dyn Write) -> BackendResult<()> {
    writeln!(out, "{}", s.autosync())?;
    Ok(())
}

use ParamKind::{Bool, Device, Int, Path, String as Str};

static ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "cat",
        params: &[param("path", Path)],
        summary: "list the contents of a file",
        description: "Return the contents of the file named C<path>.",
        needs_launch: true,
        handler: cat,
    },
    ActionSpec {
        name: "get-autosync",
        params: &[],
        summary: "get autosync mode",
        description: "Get the autosync flag.",
        needs_launch: false,
        handler: get_autosync,
    },
    ActionSpec {
        name: "get-verbose",
        params: &[],
        summary: "get verbose mode",
        description: "This returns the verbose messages flag.",
        needs_launch: false,
        handler: get_verbose,
    },
    ActionSpec {
        name: "list-devices",
        params: &[],
        summary: "list the block devices",
        description: "List all the block devices, in the order they were added.",
        needs_launch: true,
        handler: list_devices,
    },
    ActionSpec {
        name: "ls",
        params: &[param("directory", Path)],
        summary: "list the files in a directory",
        description: "List the files in C<directory> (relative to the root directory, \
            there is no cwd). Subdirectories are shown with a trailing C</>.",
        needs_launch: true,
        handler: ls,
    },
    ActionSpec {
        name: "mkdir",
        params: &[param("path", Path)],
        summary: "create a directory",
        description: "Create a directory named C<path>. The parent directory must exist.",
        needs_launch: true,
        handler: mkdir,
    },
    ActionSpec {
        name: "mount",
        params: &[param("device", Device), param("mountpoint", Path)],
        summary: "mount a guest disk at a position in the filesystem",
        description: "Mount a guest disk at a position in the filesystem. Block devices \
            are named C</dev/sda>, C</dev/sdb> and so on, as they were added to the guest. \
            The filesystem must be mounted on C</> before anything else, and every other \
            mountpoint must be an existing directory.",
        needs_launch: true,
        handler: mount,
    },
    ActionSpec {
        name: "mounts",
        params: &[],
        summary: "show mounted filesystems",
        description: "This returns the list of currently mounted filesystems, \
            in the order they were mounted.",
        needs_launch: true,
        handler: mounts,
    },
    ActionSpec {
        name: "rm",
        params: &[param("path", Path)],
        summary: "remove a file",
        description: "Remove the single file or empty directory C<path>.",
        needs_launch: true,
        handler: rm,
    },
    ActionSpec {
        name: "set-autosync",
        params: &[param("autosync", Bool)],
        summary: "set autosync mode",
        description: "If C<autosync> is true, the filesystems are unmounted and synced \
            when the handle is closed. This is enabled by default.",
        needs_launch: false,
        handler: set_autosync,
    },
    ActionSpec {
        name: "set-verbose",
        params: &[param("verbose", Int)],
        summary: "set verbose mode",
        description: "Set the verbosity level for messages from the backend.",
        needs_launch: false,
        handler: set_verbose,
    },
    ActionSpec {
        name: "sync",
        params: &[],
        summary: "sync disks, writes are flushed through to the disk image",
        description: "This syncs the disk, so that any writes are flushed through to the \
            underlying disk image.",
        needs_launch: true,
        handler: sync,
    },
    ActionSpec {
        name: "touch",
        params: &[param("path", Path)],
        summary: "update file timestamps or create a new file",
        description: "Touch acts like the L<touch(1)> command. It can be used to update \
            the timestamps on a file, or, if the file does not exist, to create a new \
            zero-length file.",
        needs_launch: true,
        handler: touch,
    },
    ActionSpec {
        name: "umount-all",
        params: &[],
        summary: "unmount all filesystems",
        description: "This unmounts all mounted filesystems.",
        needs_launch: true,
        handler: umount_all,
    },
    ActionSpec {
        name: "write-file",
        params: &[param("path", Path), param("content", Str)],
        summary: "create a file",
        description: "This call creates a file called C<path>. The contents of the file \
            is the string C<content>. Since the shell splits arguments on whitespace, \
            C<content> is a single word.",
        needs_launch: true,
        handler: write_file,
    },
];
