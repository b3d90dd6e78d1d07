use std::fmt;
use std::sync::Arc;

/// Position of a token or node in its originating source.
///
/// Tokens spliced into the stream by macro expansion or `@def` lookups keep
/// the position they were lexed at, so errors inside an expansion point back
/// at the macro body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceInfo {
    pub filename: Arc<str>,
    /// 1-based line.
    pub line: u32,
    /// 1-based column of the first byte of the lexeme.
    pub column: u32,
}

impl SourceInfo {
    pub fn new(filename: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            filename: filename.into(),
            line,
            column,
        }
    }

    /// Position for tokens that have no backing file, such as replayed macro
    /// bodies or synthesized EOF markers.
    pub fn synthetic() -> Self {
        Self::new("", 0, 0)
    }
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self::synthetic()
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_file_line_column() {
        let info = SourceInfo::new("battle.sqn", 4, 11);
        assert_eq!(info.to_string(), "battle.sqn:4:11");
    }
}
