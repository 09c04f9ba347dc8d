use std::io;

/*
 * Errors that can occur within the console layer. Per-command problems (unknown
 * commands, bad item numbers) are not errors; they are reported to the user and
 * the session continues. Only failures of the terminal itself end the session.
 */
#[derive(Debug)]
pub enum ConsoleError {
    Io(io::Error),
    // The thread reading user input could not be started.
    InputReaderFailed(String),
}

impl From<io::Error> for ConsoleError {
    fn from(err: io::Error) -> Self {
        ConsoleError::Io(err)
    }
}

impl std::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsoleError::Io(e) => write!(f, "Console I/O error: {e}"),
            ConsoleError::InputReaderFailed(s) => write!(f, "Input reader failed: {s}"),
        }
    }
}

impl std::error::Error for ConsoleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConsoleError::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
