//! Per-command outcomes and the quit signal.

/// Result of a single dispatched command.
///
/// Failures are recoverable: the REPL and script loops ignore them, chain
/// mode turns them into a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Failed,
}

impl Status {
    /// Numeric status: 0 on success, -1 on failure.
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Failed => -1,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// Collapse a backend result, reporting the error on stderr.
    pub fn report<T, E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(e) => {
                eprintln!("guestfish: {e}");
                Status::Failed
            }
        }
    }
}

/// Control flow out of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading commands.
    Continue(Status),
    /// `quit`, `exit` or `q`: stop now, exit status 0.
    Quit,
}

impl Flow {
    pub fn ok() -> Self {
        Flow::Continue(Status::Ok)
    }

    pub fn failed() -> Self {
        Flow::Continue(Status::Failed)
    }

    /// The status of the command, treating quit as success.
    pub fn status(self) -> Status {
        match self {
            Flow::Continue(status) => status,
            Flow::Quit => Status::Ok,
        }
    }
}

impl From<Status> for Flow {
    fn from(status: Status) -> Self {
        Flow::Continue(status)
    }
}
