//! guestfish: the filesystem interactive shell.
//!
//! Parses the process flags, performs the startup sequence and then runs
//! exactly one input mode:
//!
//! 1. `-a` images are checked and added, in order
//! 2. with any `-m`, the backend is launched and the mounts applied in
//!    command-line order
//! 3. positional arguments run as a `:`-separated chain; otherwise stdin is
//!    read interactively (terminal) or as a script

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use owo_colors::OwoColorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use guestfish_core::{
    ActionTable, Actions, Backend, Flow, InputMode, MemoryBackend, MountEntry, MountList, Shell,
    ShellConfig,
};

pub const PROMPT: &str = "><fs> ";

pub const USAGE: &str = "\
guestfish: guest filesystem shell
guestfish lets you edit virtual machine filesystems
Copyright (C) 2009 Red Hat Inc.
Usage:
  guestfish [--options] cmd [: cmd : cmd ...]
or for interactive use:
  guestfish
or from a shell script:
  guestfish <<EOF
  cmd
  ...
  EOF
Options:
  -h|--cmd-help       List available commands
  -h|--cmd-help cmd   Display detailed help on 'cmd'
  -a image            Add image
  -m dev[:mnt]        Mount dev on mnt (if omitted, /)
  -n|--no-sync        Don't autosync
  -v|--verbose        Verbose messages
  -?|--help           Display this usage text
For more information, see the manpage guestfish(1).
";

/// Process flags.
#[derive(Debug, Parser)]
#[command(name = "guestfish", disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Add image.
    #[arg(short = 'a', long = "add", value_name = "image")]
    pub add: Vec<String>,

    /// List commands, or describe one. An empty value lists them all.
    #[arg(
        short = 'h',
        long = "cmd-help",
        value_name = "cmd",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    pub cmd_help: Option<String>,

    /// Mount dev on mnt (if omitted, /).
    #[arg(short = 'm', long = "mount", value_name = "dev[:mnt]")]
    pub mount: Vec<MountEntry>,

    /// Don't autosync.
    #[arg(short = 'n', long = "no-sync")]
    pub no_sync: bool,

    /// Verbose messages. Repeat for more.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Print usage text.
    #[arg(short = '?', long = "help")]
    pub usage: bool,

    /// `cmd [: cmd : cmd ...]`
    #[arg(trailing_var_arg = true, value_name = "cmd")]
    pub commands: Vec<String>,

    /// How many `-a` images were given before `-h`.
    #[arg(skip)]
    pub images_before_help: usize,
}

impl Cli {
    /// Parse the process arguments.
    pub fn try_parse_ordered() -> Result<Self, clap::Error> {
        Self::try_parse_ordered_from(std::env::args_os())
    }

    /// Parse `args`, keeping track of where `-h` sat among the `-a` flags.
    pub fn try_parse_ordered_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let mut cli = Self::from_arg_matches(&matches)?;
        if let Some(help_at) = matches.index_of("cmd_help") {
            cli.images_before_help = matches
                .indices_of("add")
                .map_or(0, |indices| indices.filter(|&i| i < help_at).count());
        }
        Ok(cli)
    }

    /// `-h` given: `Some(None)` lists every command, `Some(Some(cmd))`
    /// describes one.
    pub fn help_topic(&self) -> Option<Option<&str>> {
        self.cmd_help
            .as_deref()
            .map(|cmd| (!cmd.is_empty()).then_some(cmd))
    }

    pub fn config(&self) -> ShellConfig {
        ShellConfig {
            verbose: u32::from(self.verbose),
            autosync: !self.no_sync,
            ..ShellConfig::default()
        }
    }

    pub fn mounts(&self) -> MountList {
        self.mount.iter().cloned().collect()
    }
}

/// Run guestfish with parsed flags.
pub fn run(cli: Cli) -> Result<ExitCode> {
    if cli.usage {
        print!("{USAGE}");
        return Ok(ExitCode::SUCCESS);
    }

    let mut shell = Shell::new(MemoryBackend::new(), ActionTable::new(), cli.config())
        .context("failed to create handle")?;

    // Flags take effect in command-line order: images before `-h` are
    // checked before help is shown, later ones never are.
    let (early, late) = cli.add.split_at(cli.images_before_help.min(cli.add.len()));
    for image in early {
        add_image(&mut shell, image)?;
    }

    if let Some(topic) = cli.help_topic() {
        let mut stdout = io::stdout().lock();
        shell.help(topic, &mut stdout)?;
        stdout.flush()?;
        return Ok(ExitCode::SUCCESS);
    }

    for image in late {
        add_image(&mut shell, image)?;
    }

    shell.mount_all(&cli.mounts())?;

    match InputMode::select(cli.commands, io::stdin().is_terminal()) {
        InputMode::Chain(args) => {
            tracing::debug!(argc = args.len(), "chain mode");
            shell.run_chain(&args, &mut io::stdout().lock())?;
        }
        InputMode::Interactive => {
            tracing::debug!("interactive mode");
            Repl::new(TerminalInput::new()?).run(&mut shell, &mut io::stdout())?;
        }
        InputMode::Script => {
            tracing::debug!("script mode");
            shell.run_script(io::stdin().lock(), &mut io::stdout().lock())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// `-a image`: the image must be readable before it is handed to the backend.
fn add_image<B: Backend, A: Actions<B>>(shell: &mut Shell<B, A>, image: &str) -> Result<()> {
    File::open(image).with_context(|| image.to_string())?;
    shell
        .session_mut()
        .add_drive(image)
        .with_context(|| format!("add_drive {image}"))?;
    Ok(())
}

/// XDG data path for interactive history.
pub fn history_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.data_dir().join("guestfish").join("history.txt"))
}

/// Where interactive lines come from.
pub trait LineSource {
    /// Show `prompt` and read one line.
    fn readline(&mut self, prompt: &str) -> rustyline::Result<String>;

    /// Remember a non-blank line.
    fn add_history(&mut self, _line: &str) {}

    /// The loop has ended.
    fn close(&mut self) {}
}

/// The terminal, through rustyline, with history kept on disk.
pub struct TerminalInput {
    editor: DefaultEditor,
    history: Option<PathBuf>,
}

impl TerminalInput {
    pub fn new() -> Result<Self> {
        let mut editor = DefaultEditor::new().context("Failed to create editor")?;
        let history = history_path();
        if let Some(ref path) = history {
            // Missing history is normal on first run.
            let _ = editor.load_history(path);
        }
        Ok(Self { editor, history })
    }
}

impl LineSource for TerminalInput {
    fn readline(&mut self, prompt: &str) -> rustyline::Result<String> {
        self.editor.readline(prompt)
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }

    fn close(&mut self) {
        let Some(ref path) = self.history else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = self.editor.save_history(path) {
            tracing::debug!(error = %e, "could not save history");
        }
    }
}

/// Printed once when the interactive shell starts.
pub fn banner(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Welcome to {}, the libguestfs filesystem interactive shell for",
        "guestfish".bold()
    )?;
    writeln!(out, "editing virtual machine filesystems.")?;
    writeln!(out)?;
    writeln!(out, "Type: 'help' for help with commands")?;
    writeln!(out, "      'quit' to quit the shell")?;
    writeln!(out)
}

/// The interactive loop.
pub struct Repl<L> {
    input: L,
}

impl<L: LineSource> Repl<L> {
    pub fn new(input: L) -> Self {
        Self { input }
    }

    pub fn into_input(self) -> L {
        self.input
    }

    /// Banner, then prompt, read and dispatch until end of input or `quit`.
    ///
    /// Failed commands do not stop the loop. End of input (not `quit`) is
    /// followed by a blank line.
    pub fn run<B: Backend, A: Actions<B>>(
        &mut self,
        shell: &mut Shell<B, A>,
        out: &mut dyn Write,
    ) -> Result<()> {
        banner(out)?;
        let result = self.read_eval_loop(shell, out);
        self.input.close();
        result
    }

    fn read_eval_loop<B: Backend, A: Actions<B>>(
        &mut self,
        shell: &mut Shell<B, A>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut quit_by_command = false;
        while !shell.is_quit() {
            match self.input.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        self.input.add_history(&line);
                    }
                    if shell.run_line(&line, out)? == Flow::Quit {
                        quit_by_command = true;
                    }
                    out.flush()?;
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => shell.request_quit(),
                Err(err) => {
                    eprintln!("guestfish: {err}");
                    shell.request_quit();
                }
            }
        }
        if !quit_by_command {
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }
}
