//! Help text rendering.
//!
//! Long help is fed through an external formatter (`pod2text` by default)
//! and its output captured. When the formatter is missing or fails the raw
//! heading and body are printed instead; help never fails because of it.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use crate::dispatch::Builtin;

/// Renders help text, optionally through a formatting filter.
#[derive(Debug, Clone, Default)]
pub struct HelpRenderer {
    filter: Option<String>,
}

impl HelpRenderer {
    pub fn new(filter: Option<String>) -> Self {
        Self { filter }
    }

    /// A renderer that always prints plain text.
    pub fn plain() -> Self {
        Self { filter: None }
    }

    /// Render `heading` and `body` to `out`.
    pub fn render(&self, heading: &str, body: &str, out: &mut dyn Write) -> io::Result<()> {
        if let Some(program) = &self.filter {
            match filter_through(program, heading, body) {
                Ok(text) => return out.write_all(&text),
                Err(e) => tracing::warn!(program = %program, error = %e, "help filter unavailable, printing plain text"),
            }
        }
        writeln!(out, "{heading}\n\n{body}")
    }
}

/// Pipe a POD document through `program` and capture what it prints.
///
/// The document is written from a separate thread so a filter that starts
/// printing before it has read all of its input cannot block on a full pipe.
fn filter_through(program: &str, heading: &str, body: &str) -> io::Result<Vec<u8>> {
    let mut child = Command::new(program)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let document = format!("=head1 {heading}\n\n{body}");
    let stdin = child.stdin.take();

    let (written, output) = thread::scope(|scope| {
        let writer = scope.spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(document.as_bytes()),
            None => Err(io::Error::other("filter stdin unavailable")),
        });
        // Always reap the child, even if feeding it failed.
        let output = child.wait_with_output();
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("help filter writer panicked")));
        (written, output)
    });
    let output = output?;

    if !output.status.success() {
        return Err(io::Error::other(format!("{program} exited with {}", output.status)));
    }
    // A filter may stop reading once it has what it needs.
    match written {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
        _ => Ok(output.stdout),
    }
}

/// One line per builtin command.
pub fn list_builtin_commands(out: &mut dyn Write) -> io::Result<()> {
    for builtin in Builtin::ALL {
        writeln!(out, "{:<20} {}", builtin.name(), builtin.summary())?;
    }
    Ok(())
}

/// Detailed help for a builtin. Returns false if `name` is not a builtin.
pub fn display_builtin_command(name: &str, out: &mut dyn Write) -> io::Result<bool> {
    let Some(builtin) = Builtin::from_name(name) else {
        return Ok(false);
    };
    writeln!(out, "{} - {}", builtin.name(), builtin.summary())?;
    for usage in builtin.usage() {
        writeln!(out, "     {usage}")?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn rendered(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn builtin_listing() {
        let text = rendered(|out| list_builtin_commands(out));
        assert_snapshot!(text, @r"
        help                 display a list of commands or help on a command
        quit                 quit guestfish
        add                  add a guest image to be examined or modified
        cdrom                add a CD-ROM image to be examined
        launch               launch the subprocess
        ");
    }

    #[test]
    fn builtin_detail_resolves_aliases() {
        let add = rendered(|out| display_builtin_command("add_drive", out).map(|_| ()));
        assert_eq!(add, "add - add a guest image to be examined or modified\n     add <image>\n");

        let help = rendered(|out| display_builtin_command("HELP", out).map(|_| ()));
        assert_eq!(
            help,
            "help - display a list of commands or help on a command\n     help cmd\n     help\n"
        );
    }

    #[test]
    fn unknown_builtin_prints_nothing() {
        let mut buf = Vec::new();
        assert!(!display_builtin_command("mkfs", &mut buf).unwrap());
        assert!(buf.is_empty());
    }

    #[test]
    fn plain_renderer_prints_heading_and_body() {
        let text = rendered(|out| HelpRenderer::plain().render("cat - list a file", " cat path", out));
        assert_eq!(text, "cat - list a file\n\n cat path\n");
    }

    #[test]
    fn missing_filter_falls_back_to_plain_text() {
        let renderer = HelpRenderer::new(Some("guestfish-no-such-formatter".into()));
        let text = rendered(|out| renderer.render("heading", "body", out));
        assert_eq!(text, "heading\n\nbody\n");
    }

    #[cfg(unix)]
    #[test]
    fn failing_filter_falls_back_to_plain_text() {
        let renderer = HelpRenderer::new(Some("false".into()));
        let text = rendered(|out| renderer.render("heading", "body", out));
        assert_eq!(text, "heading\n\nbody\n");
    }

    #[cfg(unix)]
    #[test]
    fn filter_output_is_captured() {
        let renderer = HelpRenderer::new(Some("cat".into()));
        let text = rendered(|out| renderer.render("heading", "body\n", out));
        assert_eq!(text, "=head1 heading\n\nbody\n");
    }

    #[cfg(unix)]
    #[test]
    fn documents_larger_than_a_pipe_buffer_pass_through() {
        let body = "word ".repeat(200_000) + "\n";
        let renderer = HelpRenderer::new(Some("cat".into()));
        let text = rendered(|out| renderer.render("heading", &body, out));
        assert_eq!(text.len(), "=head1 heading\n\n".len() + body.len());
        assert!(text.ends_with("word \n"));
    }

    #[cfg(unix)]
    #[test]
    fn filter_that_stops_reading_early_still_renders() {
        let body: String = (0..100_000).map(|i| format!("line {i}\n")).collect();
        let renderer = HelpRenderer::new(Some("head".into()));
        let text = rendered(|out| renderer.render("heading", &body, out));
        let expected: String = ["=head1 heading\n", "\n"]
            .into_iter()
            .map(str::to_string)
            .chain((0..8).map(|i| format!("line {i}\n")))
            .collect();
        assert_eq!(text, expected);
    }
}
