//! Error taxonomy for the core: programmer errors are assertions (see
//! `board`/`moves::execute`), boundary errors are this `InputError`, and
//! missing external resources (an NNUE file) are `MissingResource`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    BadFen(String),
    BadMove(String),
    BadOption { name: String, value: String },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::BadFen(s) => write!(f, "malformed FEN: {s}"),
            InputError::BadMove(s) => write!(f, "malformed move: {s}"),
            InputError::BadOption { name, value } => {
                write!(f, "invalid value '{value}' for option '{name}'")
            }
        }
    }
}

impl std::error::Error for InputError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingResource {
    pub path: String,
    pub reason: String,
}

impl fmt::Display for MissingResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing resource '{}': {}", self.path, self.reason)
    }
}

impl std::error::Error for MissingResource {}
