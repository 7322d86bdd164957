use std::error::Error;
use std::{fmt, io};

#[derive(Debug)]
pub enum BrainfuckError {
    /// Generic message
    Message(String),
    /// I/O error.
    IoError(io::Error),
    /// A character outside the instruction alphabet. `index` is the byte offset in the source.
    InvalidSymbol { symbol: char, index: usize },
    /// A `]` with no pending `[`. The index refers to the filtered instruction stream.
    UnmatchedLoopEnd(usize),
    /// A `[` that is never closed. The index refers to the filtered instruction stream.
    UnmatchedLoopStart(usize),
    /// The data pointer tried to leave the tape.
    PointerOutOfRange { pointer: isize, index: usize },
    /// The configured step budget ran out before the program finished.
    StepLimitExceeded(u64)
}

impl BrainfuckError {

    /// Returns `true` for the errors detected before anything runs.
    pub fn is_syntax_error(&self) -> bool {
        use BrainfuckError::*;
        match self {
            InvalidSymbol { .. } | UnmatchedLoopEnd(_) | UnmatchedLoopStart(_) => true,
            _ => false
        }
    }

}

impl Error for BrainfuckError {}

impl fmt::Display for BrainfuckError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use BrainfuckError::*;
        match self {
            Message(ref m) => {
                write!(f, "{}", m)
            },
            IoError(ref e) => {
                write!(f, "I/O error: {}", e)
            },
            InvalidSymbol { symbol, index } => {
                write!(f, "Invalid symbol {:?} at offset {}", symbol, index)
            },
            UnmatchedLoopEnd(index) => {
                write!(f, "Unmatched ']' at instruction {}", index)
            },
            UnmatchedLoopStart(index) => {
                write!(f, "Unmatched '[' at instruction {}", index)
            },
            PointerOutOfRange { pointer, index } => {
                write!(f, "Data pointer out of range ({}) at instruction {}", pointer, index)
            },
            StepLimitExceeded(limit) => {
                write!(f, "Step limit of {} exceeded", limit)
            }
        }
    }
}

impl From<&str> for BrainfuckError {
    fn from(s: &str) -> Self {
        BrainfuckError::Message(s.to_owned())
    }
}

impl From<String> for BrainfuckError {
    fn from(s: String) -> Self {
        BrainfuckError::Message(s)
    }
}

impl From<io::Error> for BrainfuckError {
    fn from(e: io::Error) -> Self {
        BrainfuckError::IoError(e)
    }
}
