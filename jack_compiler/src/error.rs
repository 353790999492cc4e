//! Result and errors.
use std::{io, path::PathBuf};

use smol_str::SmolStr;
use thiserror::Error;

pub type CompileResult<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    /// Malformed token in the source text.
    #[error("line {line}: {message}")]
    Lexical { line: u32, message: String },

    /// Tokenizer was advanced after the last token.
    #[error("no more tokens")]
    NoMoreTokens,

    /// A required token was not found at a grammar point.
    #[error("line {line}: expected {expected}, found {found}")]
    Syntax {
        line: u32,
        expected: String,
        found: String,
    },

    /// Name is absent from both the subroutine and class scope.
    #[error("line {line}: undefined symbol '{name}'")]
    UndefinedSymbol { line: u32, name: SmolStr },

    /// The emitter was given a symbol that has no VM counterpart.
    #[error("unknown operator '{0}'")]
    UnknownOperator(char),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CompileError {
    pub(crate) fn syntax(line: u32, expected: impl ToString, found: impl ToString) -> Self {
        Self::Syntax {
            line,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Compile failure of a single file in a batch.
#[derive(Debug, Error)]
#[error("{}: {source}", .path.display())]
pub struct FileError {
    pub path: PathBuf,
    #[source]
    pub source: CompileError,
}

impl FileError {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<CompileError>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}
