//! Line tokenizer.
//!
//! Splits one input line on runs of spaces and tabs. There is no quoting,
//! escaping or expansion: `write-file /a "b c"` yields the arguments
//! `/a`, `"b` and `c"`.

use crate::error::ShellError;

/// Capacity of the argument vector, including its terminating slot.
///
/// A line may therefore carry at most `ARG_SLOTS - 1` arguments after the
/// command name; one more is a fatal error, never a truncation.
pub const ARG_SLOTS: usize = 64;

/// A command name plus its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command name, as typed (resolution is case-insensitive).
    pub name: String,
    /// Positional arguments in order.
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

fn is_separator(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Tokenize a line.
///
/// Returns `Ok(None)` for empty or blank lines; callers skip those without
/// dispatching anything.
pub fn tokenize(line: &str) -> Result<Option<Invocation>, ShellError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut words = line.split(is_separator).filter(|w| !w.is_empty());

    let Some(name) = words.next() else {
        return Ok(None);
    };

    let mut args = Vec::new();
    for word in words {
        if args.len() == ARG_SLOTS - 1 {
            return Err(ShellError::TooManyArguments { limit: ARG_SLOTS - 1 });
        }
        args.push(word.to_string());
    }

    Ok(Some(Invocation::new(name, args)))
}
