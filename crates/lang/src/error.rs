use std::io;

use thiserror::Error;

use crate::source::SourceInfo;
use crate::token::{Token, TokenKind};

/// Cause of a failure, independent of the stage it was detected in.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("unexpected token '{got}', expected one of [{}]", expected_names(.expected))]
    UnexpectedToken { expected: Vec<TokenKind>, got: Token },
    #[error("unknown command: '{0}'")]
    UnknownCommand(String),
    #[error("unknown label: '{0}'")]
    UnknownLabel(String),
    #[error("unknown preprocessor directive: '{0}'")]
    UnknownPreprocessorDirective(String),
    #[error("unknown operator: '{0}'")]
    UnknownOperator(TokenKind),
    #[error("unresolved symbol '{0}'")]
    UnresolvedSymbol(String),
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("missing argument value at index {index}: '{name}' ({ty})")]
    MissingArgument {
        index: usize,
        name: String,
        ty: String,
    },
    #[error("invalid argument at index {index}: '{name}' ({ty}): {cause}")]
    ArgumentType {
        index: usize,
        name: String,
        ty: String,
        cause: String,
    },
    #[error("invalid preprocessor value for directive '{directive}': {value}")]
    InvalidPreprocessorValue { directive: String, value: String },
    #[error("missing lookup function for '{0}'")]
    MissingLookupFn(String),
    #[error("unknown macro argument '{0}'")]
    UnknownMacroArgument(String),
    #[error("missing macro argument '{0}'")]
    MissingMacroArgument(String),
    #[error("unexpected type '{0}'")]
    UnexpectedType(String),
    #[error("unexpected binary operation with left operand '{left}' and right operand '{right}'")]
    UnexpectedBinaryOp { left: String, right: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("{stack} stack overflow")]
    StackOverflow { stack: &'static str },
    #[error("failed to read '{path}'")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

fn expected_names(expected: &[TokenKind]) -> String {
    expected
        .iter()
        .map(|kind| kind.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A failure, tagged with the stage that detected it and the position of the
/// originating token. Lex and parse stage errors abort compilation; runtime
/// errors are delivered to the host and execution continues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("syntax error at {at}: {cause}")]
    Syntax { at: SourceInfo, cause: ErrorKind },
    #[error("parse error at {at}: {cause}")]
    Parse { at: SourceInfo, cause: ErrorKind },
    #[error("runtime error at {at}: {cause}")]
    Runtime { at: SourceInfo, cause: ErrorKind },
}

impl Error {
    pub fn syntax(at: SourceInfo, cause: ErrorKind) -> Self {
        Self::Syntax { at, cause }
    }

    pub fn parse(at: SourceInfo, cause: ErrorKind) -> Self {
        Self::Parse { at, cause }
    }

    pub fn runtime(at: SourceInfo, cause: ErrorKind) -> Self {
        Self::Runtime { at, cause }
    }

    pub fn at(&self) -> &SourceInfo {
        match self {
            Self::Syntax { at, .. } | Self::Parse { at, .. } | Self::Runtime { at, .. } => at,
        }
    }

    pub fn cause(&self) -> &ErrorKind {
        match self {
            Self::Syntax { cause, .. }
            | Self::Parse { cause, .. }
            | Self::Runtime { cause, .. } => cause,
        }
    }

    /// Re-tag an error as a parse-stage failure at a fixed position. Used
    /// when a static expression is evaluated during parsing and the
    /// evaluator reports with runtime framing.
    pub fn into_parse_at(self, at: SourceInfo) -> Self {
        match self {
            Self::Syntax { cause, .. }
            | Self::Parse { cause, .. }
            | Self::Runtime { cause, .. } => Self::Parse { at, cause },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_unexpected_token() {
        let err = Error::syntax(
            SourceInfo::new("a.sqn", 2, 5),
            ErrorKind::UnexpectedToken {
                expected: vec![TokenKind::RParen, TokenKind::Comma],
                got: Token::new(TokenKind::Colon, "", SourceInfo::synthetic()),
            },
        );
        assert_eq!(
            err.to_string(),
            "syntax error at a.sqn:2:5: unexpected token 'COLON', expected one of [RPAREN, COMMA]"
        );
    }

    #[test]
    fn formats_runtime_cause() {
        let err = Error::runtime(SourceInfo::new("b.sqn", 1, 1), ErrorKind::DivisionByZero);
        assert_eq!(err.to_string(), "runtime error at b.sqn:1:1: division by zero");
    }
}
