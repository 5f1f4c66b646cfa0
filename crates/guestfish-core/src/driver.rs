//! Input driving: script mode and command-line chain mode.
//!
//! The interactive REPL lives in the `guestfish` binary; it feeds lines to
//! [`Shell::run_line`] exactly as script mode does, adding only the banner
//! and the prompt.

use std::io::{BufRead, Write};

use crate::actions::Actions;
use crate::backend::Backend;
use crate::dispatch::Shell;
use crate::error::ShellError;
use crate::flow::{Flow, Status};
use crate::tokenizer::{tokenize, Invocation};

/// Literal token separating commands in chain mode.
pub const CHAIN_SEPARATOR: &str = ":";

/// How commands reach the shell. Chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// Commands given as process arguments, separated by `:`.
    Chain(Vec<String>),
    /// Standard input is a terminal.
    Interactive,
    /// Standard input is a file or a pipe.
    Script,
}

impl InputMode {
    pub fn select(positional: Vec<String>, stdin_is_terminal: bool) -> Self {
        if !positional.is_empty() {
            InputMode::Chain(positional)
        } else if stdin_is_terminal {
            InputMode::Interactive
        } else {
            InputMode::Script
        }
    }
}

/// Iterator over the command groups of a chain.
///
/// Yields `cmd args...` groups lazily, so commands before an empty group
/// still run before the error surfaces. A trailing separator is ignored.
#[derive(Debug, Clone)]
pub struct ChainGroups<'a> {
    rest: &'a [String],
}

impl<'a> ChainGroups<'a> {
    pub fn new(args: &'a [String]) -> Self {
        Self { rest: args }
    }
}

impl Iterator for ChainGroups<'_> {
    type Item = Result<Invocation, ShellError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (name, tail) = self.rest.split_first()?;
        if name == CHAIN_SEPARATOR {
            self.rest = &[];
            return Some(Err(ShellError::EmptyChainCommand));
        }

        let end = tail
            .iter()
            .position(|a| a == CHAIN_SEPARATOR)
            .unwrap_or(tail.len());
        let args = tail[..end].to_vec();
        // Skip past the separator, if there was one.
        self.rest = tail.get(end + 1..).unwrap_or(&[]);

        Some(Ok(Invocation::new(name.clone(), args)))
    }
}

impl<B: Backend, A: Actions<B>> Shell<B, A> {
    /// Tokenize and dispatch one line. Blank lines do nothing.
    ///
    /// Only a fatal condition (argument overflow, failed output) is an error;
    /// a failing command is reported through the returned flow.
    pub fn run_line(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow, ShellError> {
        let Some(invocation) = tokenize(line)? else {
            return Ok(Flow::ok());
        };
        Ok(self.dispatch(&invocation, out)?)
    }

    /// Script mode: read lines until end of input or quit.
    ///
    /// Failed commands do not stop the loop. A read error counts as end of
    /// input.
    pub fn run_script<R: BufRead>(&mut self, mut input: R, out: &mut dyn Write) -> Result<(), ShellError> {
        let mut line = String::new();
        while !self.is_quit() {
            line.clear();
            match input.read_line(&mut line) {
                Ok(0) => self.request_quit(),
                Ok(_) => {
                    let flow = self.run_line(&line, out)?;
                    if let Flow::Continue(Status::Failed) = flow {
                        tracing::debug!(line = line.trim_end(), "command failed, continuing");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read input, stopping");
                    self.request_quit();
                }
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Chain mode: run each `:`-separated group in order.
    ///
    /// The chain is all-or-nothing: the first failing command is fatal.
    /// `quit` stops the chain successfully.
    pub fn run_chain(&mut self, args: &[String], out: &mut dyn Write) -> Result<(), ShellError> {
        for group in ChainGroups::new(args) {
            let invocation = group?;
            match self.dispatch(&invocation, out)? {
                Flow::Quit => break,
                Flow::Continue(Status::Ok) => {}
                Flow::Continue(Status::Failed) => {
                    out.flush()?;
                    return Err(ShellError::ChainCommandFailed {
                        command: invocation.name,
                    });
                }
            }
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::RecordingActions;
    use crate::session::testing::RecordingBackend;
    use crate::session::ShellConfig;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::io::Cursor;

    type TestShell = Shell<RecordingBackend, RecordingActions>;

    fn shell(actions: RecordingActions) -> TestShell {
        let config = ShellConfig {
            help_filter: None,
            ..Default::default()
        };
        Shell::new(RecordingBackend::default(), actions, config).unwrap()
    }

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn groups(s: &str) -> Vec<Result<(String, Vec<String>), String>> {
        let args = argv(s);
        ChainGroups::new(&args)
            .map(|g| g.map(|i| (i.name, i.args)).map_err(|e| e.to_string()))
            .collect()
    }

    #[rstest]
    #[case(vec![], false, InputMode::Script)]
    #[case(vec![], true, InputMode::Interactive)]
    #[case(vec!["launch".to_string()], true, InputMode::Chain(vec!["launch".to_string()]))]
    #[case(vec!["launch".to_string()], false, InputMode::Chain(vec!["launch".to_string()]))]
    fn selects_input_mode(#[case] positional: Vec<String>, #[case] tty: bool, #[case] expected: InputMode) {
        assert_eq!(InputMode::select(positional, tty), expected);
    }

    #[test]
    fn splits_chain_at_separators() {
        assert_eq!(
            groups("cmd1 arg : cmd2 arg1 arg2 : cmd3"),
            vec![
                Ok(("cmd1".to_string(), argv("arg"))),
                Ok(("cmd2".to_string(), argv("arg1 arg2"))),
                Ok(("cmd3".to_string(), vec![])),
            ]
        );
    }

    #[test]
    fn trailing_separator_is_ignored() {
        assert_eq!(groups("launch :"), vec![Ok(("launch".to_string(), vec![]))]);
    }

    #[rstest]
    #[case(": launch")]
    #[case(":")]
    fn leading_separator_is_an_empty_command(#[case] chain: &str) {
        assert_eq!(groups(chain), vec![Err("empty command on command line".to_string())]);
    }

    #[test]
    fn empty_group_surfaces_after_earlier_groups() {
        let g = groups("a : : b");
        assert_eq!(g.len(), 2);
        assert!(g[0].is_ok());
        assert!(g[1].is_err());
    }

    #[test]
    fn chain_dispatches_every_group_in_order() {
        let mut sh = shell(RecordingActions::default());
        let mut out = Vec::new();
        sh.run_chain(&argv("cmd1 arg : cmd2 arg1 arg2 : cmd3"), &mut out)
            .unwrap();

        assert_eq!(
            *sh.actions().forwarded.borrow(),
            vec![
                ("cmd1".to_string(), argv("arg")),
                ("cmd2".to_string(), argv("arg1 arg2")),
                ("cmd3".to_string(), vec![]),
            ]
        );
    }

    #[test]
    fn chain_stops_at_first_failure() {
        let mut sh = shell(RecordingActions::failing(&["cmd2"]));
        let mut out = Vec::new();
        let err = sh
            .run_chain(&argv("cmd1 arg : cmd2 arg1 arg2 : cmd3"), &mut out)
            .unwrap_err();

        assert!(matches!(err, ShellError::ChainCommandFailed { ref command } if command == "cmd2"));
        assert_eq!(sh.actions().names(), vec!["cmd1", "cmd2"]);
    }

    #[test]
    fn chain_usage_errors_are_fatal() {
        let mut sh = shell(RecordingActions::default());
        let mut out = Vec::new();
        let err = sh.run_chain(&argv("launch now : cmd"), &mut out).unwrap_err();
        assert!(matches!(err, ShellError::ChainCommandFailed { .. }));
        assert!(sh.actions().names().is_empty());
    }

    #[test]
    fn chain_runs_commands_before_an_empty_group() {
        let mut sh = shell(RecordingActions::default());
        let mut out = Vec::new();
        let err = sh.run_chain(&argv("cmd1 : : cmd2"), &mut out).unwrap_err();
        assert!(matches!(err, ShellError::EmptyChainCommand));
        assert_eq!(sh.actions().names(), vec!["cmd1"]);
    }

    #[test]
    fn quit_ends_chain_successfully() {
        let mut sh = shell(RecordingActions::default());
        let mut out = Vec::new();
        sh.run_chain(&argv("cmd1 : quit : cmd2"), &mut out).unwrap();
        assert_eq!(sh.actions().names(), vec!["cmd1"]);
        assert!(sh.is_quit());
    }

    #[test]
    fn script_skips_blank_lines_and_continues_after_failure() {
        let mut sh = shell(RecordingActions::failing(&["bad"]));
        let input = "first a b\n\n   \t\nbad\n  last  \n";
        let mut out = Vec::new();
        sh.run_script(Cursor::new(input), &mut out).unwrap();

        assert_eq!(sh.actions().names(), vec!["first", "bad", "last"]);
        assert!(sh.is_quit(), "end of input sets the quit flag");
    }

    #[test]
    fn script_continues_after_usage_error() {
        let mut sh = shell(RecordingActions::default());
        let mut out = Vec::new();
        sh.run_script(Cursor::new("add\ncmd\n"), &mut out).unwrap();
        assert_eq!(sh.actions().names(), vec!["cmd"]);
    }

    #[rstest]
    #[case("quit")]
    #[case("EXIT")]
    #[case("Q")]
    fn quit_stops_script_mid_way(#[case] quit: &str) {
        let mut sh = shell(RecordingActions::default());
        let input = format!("one\n{quit}\ntwo\n");
        let mut out = Vec::new();
        sh.run_script(Cursor::new(input), &mut out).unwrap();
        assert_eq!(sh.actions().names(), vec!["one"]);
    }

    #[test]
    fn script_without_trailing_newline() {
        let mut sh = shell(RecordingActions::default());
        let mut out = Vec::new();
        sh.run_script(Cursor::new("one\ntwo"), &mut out).unwrap();
        assert_eq!(sh.actions().names(), vec!["one", "two"]);
    }

    #[test]
    fn argument_overflow_in_script_is_fatal() {
        let mut sh = shell(RecordingActions::default());
        let long: Vec<String> = (0..65).map(|i| format!("a{i}")).collect();
        let input = format!("before\n{}\nafter\n", long.join(" "));
        let mut out = Vec::new();

        let err = sh.run_script(Cursor::new(input), &mut out).unwrap_err();
        assert!(matches!(err, ShellError::TooManyArguments { .. }));
        assert_eq!(sh.actions().names(), vec!["before"]);
    }

    #[test]
    fn invalid_utf8_ends_script_cleanly() {
        let mut sh = shell(RecordingActions::default());
        let mut out = Vec::new();
        let input: &[u8] = b"one\n\xff\xfe\ntwo\n";
        sh.run_script(input, &mut out).unwrap();
        assert_eq!(sh.actions().names(), vec!["one"]);
    }

    proptest! {
        #[test]
        fn whitespace_only_lines_never_dispatch(lines in prop::collection::vec("[ \t]{0,6}", 0..10)) {
            let mut sh = shell(RecordingActions::default());
            let mut out = Vec::new();
            let input = lines.join("\n");
            sh.run_script(Cursor::new(input), &mut out).unwrap();
            prop_assert!(sh.actions().names().is_empty());
            prop_assert!(sh.session().backend().calls.iter().all(|c| c.starts_with("set_")));
        }
    }
}
