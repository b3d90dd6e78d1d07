//! Compiler half of the sequin scripting toolchain.
//!
//! A script is a label-addressed program of host-defined commands with a
//! small core instruction set. This crate lexes and parses source text into a
//! [`Script`] — an ordered command list addressed by program counter — and
//! evaluates expression trees; execution lives in the companion runtime
//! crate.

pub mod ast;
pub mod diag;
pub mod error;
pub mod eval;
pub mod fs;
pub mod lexer;
pub mod parser;
pub mod script;
pub mod source;
pub mod stream;
pub mod token;

use std::io;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

pub use ast::{CommandNode, CommandType, ExpressionNode, Identifier, VARIABLE_OFFSET};
pub use error::{Error, ErrorKind};
pub use eval::Value;
pub use fs::{MemFS, ScriptFS, StdScriptFS};
pub use lexer::Lexer;
pub use parser::{Macro, Parser};
pub use script::Script;
pub use source::SourceInfo;
pub use stream::{TokenSlice, TokenSource, TokenStack};
pub use token::{Token, TokenKind};

/// Command names visible to scripts, by registered type.
pub type CommandTypeTable = FxHashMap<String, CommandType>;

/// Host identifier names. All values must stay below [`VARIABLE_OFFSET`].
pub type IdentifierTable = FxHashMap<String, Identifier>;

/// Host hook backing the `@def <name>` directive.
pub type LookupFn = dyn Fn(&str) -> io::Result<Vec<u8>> + Send + Sync;

/// Everything the parser needs from the embedding host.
#[derive(Default)]
pub struct ParserConfig {
    /// Filesystem for `@include`; absent means includes fail.
    pub fs: Option<Arc<dyn ScriptFS>>,
    /// Lookup hook for `@def`; absent means the directive fails.
    pub lookup: Option<Box<LookupFn>>,
    pub commands: CommandTypeTable,
    pub identifiers: IdentifierTable,
    /// Token look-ahead per source, 0 for the default of 32.
    pub buf_size: usize,
}

/// Compiles a script held in memory.
pub fn load_script(
    source: impl Into<Vec<u8>>,
    name: &str,
    config: &ParserConfig,
) -> Result<Script, Error> {
    Parser::new(Box::new(Lexer::new(source.into(), name)), config).parse()
}

/// Compiles the script at `path`, read through the configured filesystem
/// (or the process filesystem when none is set).
pub fn load_file(path: impl AsRef<Path>, config: &ParserConfig) -> Result<Script, Error> {
    let path = path.as_ref();

    let std_fs = StdScriptFS;
    let fs: &dyn ScriptFS = match &config.fs {
        Some(fs) => fs.as_ref(),
        None => &std_fs,
    };

    let name = path.to_string_lossy().into_owned();
    let bytes = fs.read(path).map_err(|source| {
        Error::syntax(
            SourceInfo::new(name.clone(), 0, 0),
            ErrorKind::Io {
                path: name.clone(),
                source,
            },
        )
    })?;

    load_script(bytes, &name, config)
}
