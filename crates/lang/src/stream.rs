use std::collections::VecDeque;

use crate::source::SourceInfo;
use crate::token::{Token, TokenKind};

pub const DEFAULT_BUFFER_SIZE: usize = 32;

/// Anything that can produce a token stream: a lexer over a source file, or a
/// replayed token slice from a macro body.
pub trait TokenSource {
    fn next_token(&mut self) -> Token;

    /// Name of the backing file, empty for synthesized sources.
    fn filename(&self) -> &str;
}

/// Replays a captured token vector, then reports `EOF`.
#[derive(Debug, Clone)]
pub struct TokenSlice {
    tokens: Vec<Token>,
    offset: usize,
}

impl TokenSlice {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, offset: 0 }
    }
}

impl TokenSource for TokenSlice {
    fn next_token(&mut self) -> Token {
        match self.tokens.get(self.offset) {
            Some(tok) => {
                self.offset += 1;
                tok.clone()
            }
            None => Token::eof(SourceInfo::synthetic()),
        }
    }

    fn filename(&self) -> &str {
        ""
    }
}

struct Frame {
    prefix: String,
    src: Box<dyn TokenSource>,
    buf: VecDeque<Token>,
    drained: bool,
}

impl Frame {
    fn fill(&mut self, want: usize) {
        while !self.drained && self.buf.len() < want {
            let tok = self.src.next_token();
            if tok.kind == TokenKind::Eof {
                self.drained = true;
                break;
            }
            self.buf.push_back(tok);
        }
    }
}

/// Push-down stack of token producers.
///
/// The parser reads from the top of the stack; macro expansions and included
/// files are spliced in front of the current stream with `insert` and drain
/// transparently back into the source below. Each frame keeps its own label
/// prefix so every insertion gets a fresh label namespace.
pub struct TokenStack {
    frames: Vec<Frame>,
    buf_size: usize,
    next_insert_id: u64,
}

impl TokenStack {
    pub fn new(prefix: impl Into<String>, src: Box<dyn TokenSource>, buf_size: usize) -> Self {
        let buf_size = if buf_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            buf_size
        };

        Self {
            frames: vec![Frame {
                prefix: prefix.into(),
                src,
                buf: VecDeque::new(),
                drained: false,
            }],
            buf_size,
            next_insert_id: 0,
        }
    }

    fn top(&self) -> &Frame {
        self.frames.last().expect("token stack keeps its base frame")
    }

    /// Sets the label prefix of the current source; a global label declaration
    /// opens a namespace for the `%`-local labels that follow it.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        if let Some(top) = self.frames.last_mut() {
            top.prefix = prefix.into();
        }
    }

    pub fn prefixed(&self, name: &str) -> String {
        format!("{}{}", self.top().prefix, name)
    }

    pub fn filename(&self) -> &str {
        self.top().src.filename()
    }

    /// Pushes `src` in front of the current stream. The prefix is suffixed
    /// with a monotonic id so that repeated expansions of the same macro land
    /// in distinct label namespaces.
    pub fn insert(&mut self, prefix: &str, src: Box<dyn TokenSource>) {
        let prefix = format!("{}_{}", prefix, self.next_insert_id);
        self.next_insert_id += 1;

        self.frames.push(Frame {
            prefix,
            src,
            buf: VecDeque::new(),
            drained: false,
        });
    }

    /// Returns the n-th unconsumed token, crossing into lower sources when
    /// the ones above run out.
    pub fn peek(&mut self, n: usize) -> Token {
        let mut n = n;

        for idx in (0..self.frames.len()).rev() {
            let want = self.buf_size.max(n + 1);
            let frame = &mut self.frames[idx];
            frame.fill(want);

            if n < frame.buf.len() {
                return frame.buf[n].clone();
            }
            n -= frame.buf.len();
        }

        Token::eof(SourceInfo::synthetic())
    }

    /// Consumes one token; drained sources above the base are popped
    /// transparently. `EOF` is only reported once the whole chain is dry.
    pub fn next_token(&mut self) -> Token {
        loop {
            let base = self.frames.len() == 1;
            let frame = self
                .frames
                .last_mut()
                .expect("token stack keeps its base frame");
            frame.fill(1);

            if let Some(tok) = frame.buf.pop_front() {
                return tok;
            }

            if base {
                return Token::eof(SourceInfo::synthetic());
            }
            self.frames.pop();
        }
    }
}
