use std::fmt;

use crate::source::SourceInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Illegal,

    Newline,
    Comma,
    Colon,

    Str,
    Ident,
    Number,

    Def,
    Var,
    Macro,
    EndMacro,

    LParen,
    RParen,
    LBracket,
    RBracket,

    Add,
    Sub,
    Mul,
    Div,

    Shl,
    Shr,

    Lt,
    Gt,
    Lte,
    Gte,

    Eq,
    Neq,

    Excl,
    Inv,

    And,
    Or,

    Dollar,
    Percent,

    Preprocessor,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Eof => "EOF",
            Self::Illegal => "ILLEGAL",
            Self::Newline => "NEWLINE",
            Self::Comma => "COMMA",
            Self::Colon => "COLON",
            Self::Str => "STRING",
            Self::Ident => "IDENT",
            Self::Number => "NUMBER",
            Self::Def => "DEF",
            Self::Var => "VAR",
            Self::Macro => "MACRO",
            Self::EndMacro => "ENDMACRO",
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::LBracket => "LBRACKET",
            Self::RBracket => "RBRACKET",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Lte => "LTE",
            Self::Gte => "GTE",
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Excl => "EXCL",
            Self::Inv => "INV",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Dollar => "DOLLAR",
            Self::Percent => "PERCENT",
            Self::Preprocessor => "PREPROCESSOR",
        }
    }

    /// Surface syntax of an operator kind, used by the listing printer.
    pub fn operator_text(self) -> Option<&'static str> {
        Some(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Percent => "%",
            Self::Excl => "!",
            Self::Inv => "^",
            Self::And => "&",
            Self::Or => "|",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Lte => "<=",
            Self::Gte => ">=",
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Shl => "<<",
            Self::Shr => ">>",
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyword table: identifiers that lex to their own token kinds.
pub fn keyword(ident: &str) -> Option<TokenKind> {
    match ident {
        "var" => Some(TokenKind::Var),
        "def" => Some(TokenKind::Def),
        "macro" => Some(TokenKind::Macro),
        "endmacro" => Some(TokenKind::EndMacro),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub info: SourceInfo,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, info: SourceInfo) -> Self {
        Self {
            kind,
            value: value.into(),
            info,
        }
    }

    pub fn eof(info: SourceInfo) -> Self {
        Self::new(TokenKind::Eof, "", info)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            f.write_str(self.kind.name())
        } else {
            f.write_str(&self.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_resolve() {
        assert_eq!(keyword("var"), Some(TokenKind::Var));
        assert_eq!(keyword("endmacro"), Some(TokenKind::EndMacro));
        assert_eq!(keyword("varx"), None);
    }

    #[test]
    fn token_display_prefers_value() {
        let info = SourceInfo::synthetic();
        assert_eq!(Token::new(TokenKind::Ident, "push", info.clone()).to_string(), "push");
        assert_eq!(Token::new(TokenKind::Newline, "", info).to_string(), "NEWLINE");
    }
}
