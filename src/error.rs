use std::path::PathBuf;

use thiserror::Error;

/// Any of these aborts the whole run; a malformed program yields no output.
#[derive(Debug, Error, PartialEq)]
pub enum TranslateError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("`{line}`: `{segment}` is not a memory segment")]
    InvalidSegment { line: String, segment: String },

    #[error("cannot pop the constant segment")]
    PopConstant,

    #[error("`{line}`: missing {operand}")]
    MissingOperand { line: String, operand: &'static str },

    #[error("`{line}`: index must be a non-negative 16-bit integer")]
    InvalidIndex { line: String },

    #[error("`{line}`: malformed name")]
    InvalidName { line: String },

    #[error("`{line}`: unexpected trailing input `{rest}`")]
    TrailingInput { line: String, rest: String },

    #[error("pointer index {0} out of range (only 0 and 1 exist)")]
    PointerIndex(u16),

    #[error("function `{0}` defined more than once")]
    DuplicateFunction(String),

    #[error("no .vm input found at {}", .0.display())]
    NoInput(PathBuf),

    #[error("nothing to link")]
    EmptyProgram,
}
