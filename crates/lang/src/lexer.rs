use std::sync::Arc;

use crate::source::SourceInfo;
use crate::stream::TokenSource;
use crate::token::{keyword, Token, TokenKind};

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'-'
}

fn is_operator(c: u8) -> bool {
    matches!(
        c,
        b'+' | b'-' | b'*' | b'/' | b'%' | b'!' | b'^' | b'&' | b'|' | b'<' | b'>' | b'='
    )
}

/// Byte-level lexer producing the token stream lazily.
///
/// Runs of blank lines collapse to a single `NEWLINE`, and a `NEWLINE` before
/// any other token is suppressed entirely, so the parser never sees two
/// adjacent newline tokens. After the end of input the lexer keeps returning
/// `EOF`.
pub struct Lexer {
    source: Vec<u8>,
    pos: usize,

    filename: Arc<str>,
    line: u32,
    col: u32,

    last: Option<TokenKind>,
    done: bool,
}

impl Lexer {
    pub fn new(source: Vec<u8>, filename: impl Into<Arc<str>>) -> Self {
        Self {
            source,
            pos: 0,
            filename: filename.into(),
            line: 1,
            col: 0,
            last: None,
            done: false,
        }
    }

    fn peek_ahead(&self, n: usize) -> u8 {
        self.source.get(self.pos + n).copied().unwrap_or(0)
    }

    fn peek(&self) -> u8 {
        self.peek_ahead(0)
    }

    fn advance(&mut self) -> u8 {
        let curr = self.peek();
        if curr == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        curr
    }

    fn skip_ahead(&mut self, n: usize) {
        for _ in 0..n {
            if self.pos >= self.source.len() {
                break;
            }
            self.advance();
        }
    }

    /// Captures the next `n` bytes as a string and consumes them.
    fn take(&mut self, n: usize) -> String {
        let end = (self.pos + n).min(self.source.len());
        let text = String::from_utf8_lossy(&self.source[self.pos..end]).into_owned();
        self.skip_ahead(n);
        text
    }

    fn info(&self) -> SourceInfo {
        SourceInfo::new(self.filename.clone(), self.line, self.col + 1)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), b' ' | b'\t') {
            self.advance();
        }
    }

    fn lex_ident(&mut self, info: SourceInfo) -> Token {
        let mut n = 0;
        while is_alpha(self.peek_ahead(n)) || (n > 0 && self.peek_ahead(n).is_ascii_digit()) {
            n += 1;
        }

        let ident = self.take(n);

        match keyword(&ident) {
            Some(kind) => Token::new(kind, "", info),
            None => Token::new(TokenKind::Ident, ident, info),
        }
    }

    fn lex_number(&mut self, info: SourceInfo) -> Token {
        let mut n;

        // Radix prefixes stay part of the token text; the parser picks the
        // base when it materializes the literal.
        let radix = match (self.peek(), self.peek_ahead(1)) {
            (b'0', b'x') => Some(16),
            (b'0', b'o') => Some(8),
            (b'0', b'b') => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            n = 2;
            let digits: fn(u8) -> bool = if radix == 16 {
                |c| c.is_ascii_hexdigit()
            } else {
                |c| c.is_ascii_digit()
            };
            while digits(self.peek_ahead(n)) {
                n += 1;
            }
        } else {
            n = 0;
            loop {
                let next = self.peek_ahead(n);
                if next.is_ascii_digit() || next == b'.' {
                    n += 1;
                } else {
                    break;
                }
            }
        }

        Token::new(TokenKind::Number, self.take(n), info)
    }

    fn lex_operator(&mut self, info: SourceInfo) -> Token {
        let first = self.peek();
        let second = self.peek_ahead(1);

        let greedy = second == b'='
            || (first == b'<' && second == b'<')
            || (first == b'>' && second == b'>');

        let text = if greedy { self.take(2) } else { self.take(1) };

        let kind = match text.as_str() {
            "&" => TokenKind::And,
            "|" => TokenKind::Or,
            "!" => TokenKind::Excl,
            "^" => TokenKind::Inv,
            "+" => TokenKind::Add,
            "-" => TokenKind::Sub,
            "*" => TokenKind::Mul,
            "/" => TokenKind::Div,
            "%" => TokenKind::Percent,
            "<" => TokenKind::Lt,
            ">" => TokenKind::Gt,
            "<<" => TokenKind::Shl,
            ">>" => TokenKind::Shr,
            "<=" => TokenKind::Lte,
            ">=" => TokenKind::Gte,
            "==" => TokenKind::Eq,
            "!=" => TokenKind::Neq,
            _ => TokenKind::Illegal,
        };

        Token::new(kind, text, info)
    }

    fn lex_string(&mut self, info: SourceInfo) -> Token {
        self.advance();

        let mut n = 0;
        while self.peek_ahead(n) != b'"' && self.peek_ahead(n) != 0 {
            n += 1;
        }

        let token = Token::new(TokenKind::Str, self.take(n), info);

        if self.peek() == b'"' {
            self.advance();
        }

        token
    }

    fn lex_preprocessor(&mut self, info: SourceInfo) -> Token {
        self.advance();

        let mut n = 0;
        while self.peek_ahead(n) != b'\n' && self.peek_ahead(n) != 0 {
            n += 1;
        }

        Token::new(TokenKind::Preprocessor, self.take(n), info)
    }

    fn skip_comment(&mut self) -> Token {
        let mut n = 1;
        while self.peek_ahead(n) != b'\n' && self.peek_ahead(n) != 0 {
            n += 1;
        }
        self.skip_ahead(n);
        self.lex_token()
    }

    fn single(&mut self, kind: TokenKind, info: SourceInfo) -> Token {
        self.advance();
        Token::new(kind, "", info)
    }

    fn lex_token(&mut self) -> Token {
        self.skip_whitespace();

        let info = self.info();
        let c = self.peek();

        match c {
            0 => {
                self.done = true;
                return Token::eof(info);
            }
            b'@' => return self.lex_preprocessor(info),
            b',' => return self.single(TokenKind::Comma, info),
            b'\n' => return self.single(TokenKind::Newline, info),
            b':' => return self.single(TokenKind::Colon, info),
            b'(' => return self.single(TokenKind::LParen, info),
            b')' => return self.single(TokenKind::RParen, info),
            b'[' => return self.single(TokenKind::LBracket, info),
            b']' => return self.single(TokenKind::RBracket, info),
            b'$' => return self.single(TokenKind::Dollar, info),
            b'"' => return self.lex_string(info),
            b'#' => return self.skip_comment(),
            _ => {}
        }

        if is_operator(c) {
            return self.lex_operator(info);
        }

        if c.is_ascii_digit() {
            return self.lex_number(info);
        }

        if is_alpha(c) {
            return self.lex_ident(info);
        }

        self.advance();
        Token::new(TokenKind::Illegal, (c as char).to_string(), info)
    }

    pub fn next(&mut self) -> Token {
        if self.done {
            return Token::eof(self.info());
        }

        loop {
            let tok = self.lex_token();

            if tok.kind == TokenKind::Newline && self.last.map_or(true, |k| k == TokenKind::Newline)
            {
                continue;
            }

            self.last = Some(tok.kind);
            return tok;
        }
    }

    /// Drains the lexer into a vector, including the terminating `EOF`.
    pub fn lex(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Token {
        self.next()
    }

    fn filename(&self) -> &str {
        &self.filename
    }
}
