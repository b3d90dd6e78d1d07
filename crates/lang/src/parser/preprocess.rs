use std::io;
use std::path::{Component, Path, PathBuf};

use super::Parser;
use crate::error::{Error, ErrorKind};
use crate::lexer::Lexer;
use crate::token::Token;

impl Parser<'_> {
    /// Dispatches a `PREPROCESSOR` token. The lexer captured the raw text
    /// after `@`; the first word is the directive, the rest its argument.
    pub(super) fn parse_directive(&mut self) -> Result<(), Error> {
        let tok = self.advance();

        let (directive, argument) = match tok.value.split_once(' ') {
            Some((directive, argument)) => (directive.to_string(), Some(argument.trim())),
            None => (tok.value.clone(), None),
        };

        let argument = argument.filter(|argument| !argument.is_empty());

        match directive.as_str() {
            "include" => {
                let file = argument.ok_or_else(|| invalid_value(&tok, "include"))?;
                self.include_file(file, &tok)
            }
            "def" => {
                let name = argument.ok_or_else(|| invalid_value(&tok, "def"))?;
                self.def_lookup(name, &tok)
            }
            other => Err(Error::syntax(
                tok.info.clone(),
                ErrorKind::UnknownPreprocessorDirective(other.to_string()),
            )),
        }
    }

    /// `@include <path>`: resolves the path relative to the directory of the
    /// file currently being lexed, reads it through the configured
    /// filesystem and splices a fresh lexer over its contents. Including the
    /// same resolved path twice is a no-op.
    fn include_file(&mut self, file: &str, tok: &Token) -> Result<(), Error> {
        let Some(fs) = &self.config.fs else {
            return Err(Error::syntax(
                tok.info.clone(),
                ErrorKind::Io {
                    path: file.to_string(),
                    source: io::Error::new(
                        io::ErrorKind::Unsupported,
                        "no filesystem configured for @include",
                    ),
                },
            ));
        };

        let current = self.src.filename().to_string();
        let dir = Path::new(&current)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let full = clean_path(&dir.join(file));

        if !self.included.insert(full.clone()) {
            return Ok(());
        }

        let bytes = fs.read(&full).map_err(|source| {
            Error::syntax(
                tok.info.clone(),
                ErrorKind::Io {
                    path: full.display().to_string(),
                    source,
                },
            )
        })?;

        let name = full.to_string_lossy().into_owned();
        self.src.insert("", Box::new(Lexer::new(bytes, name)));

        Ok(())
    }

    /// `@def <name>`: asks the host for the definition text and splices
    /// `def <result>` in front of the stream.
    fn def_lookup(&mut self, name: &str, tok: &Token) -> Result<(), Error> {
        let Some(lookup) = &self.config.lookup else {
            return Err(Error::syntax(
                tok.info.clone(),
                ErrorKind::MissingLookupFn(name.to_string()),
            ));
        };

        let value = lookup(name).map_err(|source| {
            Error::syntax(
                tok.info.clone(),
                ErrorKind::Io {
                    path: name.to_string(),
                    source,
                },
            )
        })?;

        let mut bytes = b"def ".to_vec();
        bytes.extend_from_slice(&value);

        self.src.insert("", Box::new(Lexer::new(bytes, "")));

        Ok(())
    }
}

fn invalid_value(tok: &Token, directive: &str) -> Error {
    Error::syntax(
        tok.info.clone(),
        ErrorKind::InvalidPreprocessorValue {
            directive: directive.to_string(),
            value: tok.value.clone(),
        },
    )
}

/// Lexical path cleanup so the include guard sees one spelling per file.
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}
