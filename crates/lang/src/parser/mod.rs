mod expr;
mod macros;
mod preprocess;
mod vars;

pub use macros::Macro;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::path::PathBuf;

use crate::ast::{CommandNode, CommandType, ExpressionNode};
use crate::error::{Error, ErrorKind};
use crate::script::Script;
use crate::stream::{TokenSource, TokenStack};
use crate::token::{Token, TokenKind};
use crate::ParserConfig;

/// Recursive-descent parser turning a token stream into a [`Script`].
///
/// The parser owns a [`TokenStack`] so macro expansions, `@include`d files
/// and `@def` lookups can be spliced in front of the current stream while a
/// parse is in flight. The first error aborts.
pub struct Parser<'a> {
    src: TokenStack,
    config: &'a ParserConfig,
    included: FxHashSet<PathBuf>,
}

impl<'a> Parser<'a> {
    pub fn new(src: Box<dyn TokenSource>, config: &'a ParserConfig) -> Self {
        Self {
            src: TokenStack::new("main", src, config.buf_size),
            config,
            included: FxHashSet::default(),
        }
    }

    pub(crate) fn peek(&mut self) -> Token {
        self.src.peek(0)
    }

    pub(crate) fn peek_ahead(&mut self, n: usize) -> Token {
        self.src.peek(n)
    }

    pub(crate) fn advance(&mut self) -> Token {
        self.src.next_token()
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        let tok = self.advance();
        if tok.kind != kind {
            return Err(Error::syntax(
                tok.info.clone(),
                ErrorKind::UnexpectedToken {
                    expected: vec![kind],
                    got: tok,
                },
            ));
        }
        Ok(tok)
    }

    /// Consumes tokens up to and including `end` (or `EOF`), returning the
    /// tokens before the terminator verbatim.
    pub(crate) fn consume_until(&mut self, end: TokenKind) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.advance();
            if tok.kind == end || tok.kind == TokenKind::Eof {
                break;
            }
            tokens.push(tok);
        }
        tokens
    }

    pub fn parse(mut self) -> Result<Script, Error> {
        let mut script = Script::new();

        while self.parse_next(&mut script)? {}

        resolve_labels(&mut script)?;

        Ok(script)
    }

    fn parse_next(&mut self, script: &mut Script) -> Result<bool, Error> {
        let tok = self.peek();

        match tok.kind {
            TokenKind::Eof => {
                self.advance();
                Ok(false)
            }
            TokenKind::Preprocessor => {
                self.parse_directive()?;
                Ok(true)
            }
            TokenKind::Macro => {
                self.parse_macro(script)?;
                Ok(true)
            }
            TokenKind::Def => {
                self.parse_define(script)?;
                Ok(true)
            }
            TokenKind::Var => {
                self.parse_variable(script)?;
                Ok(true)
            }
            TokenKind::Percent | TokenKind::Ident => {
                self.parse_ident(script, tok)?;
                Ok(true)
            }
            TokenKind::Newline => {
                self.advance();
                Ok(true)
            }
            _ => Err(Error::syntax(
                tok.info.clone(),
                ErrorKind::UnexpectedToken {
                    expected: vec![
                        TokenKind::Eof,
                        TokenKind::Macro,
                        TokenKind::Def,
                        TokenKind::Var,
                        TokenKind::Ident,
                        TokenKind::Newline,
                    ],
                    got: tok,
                },
            )),
        }
    }

    /// A line starting with an identifier is either a label declaration or a
    /// command; `% ident :` declares a prefix-local label.
    fn parse_ident(&mut self, script: &mut Script, tok: Token) -> Result<(), Error> {
        let tok1 = self.peek_ahead(1);

        if tok.kind == TokenKind::Percent && tok1.kind == TokenKind::Ident {
            if self.peek_ahead(2).kind == TokenKind::Colon {
                self.advance();
                return self.parse_label_declaration(script, true);
            }
        } else if tok.kind == TokenKind::Ident && tok1.kind == TokenKind::Colon {
            return self.parse_label_declaration(script, false);
        }

        self.parse_command(script)
    }

    /// Binds a label to the current pc. A global label also becomes the
    /// namespace prefix for subsequent `%`-local labels.
    fn parse_label_declaration(&mut self, script: &mut Script, local: bool) -> Result<(), Error> {
        let name_tok = self.advance();
        self.advance(); // colon

        let name = if local {
            self.src.prefixed(&name_tok.value)
        } else {
            self.src.set_prefix(name_tok.value.clone());
            name_tok.value
        };

        script.labels.insert(name, script.pc());

        Ok(())
    }

    fn parse_define(&mut self, script: &mut Script) -> Result<(), Error> {
        self.advance();

        let name = self.expect(TokenKind::Ident)?;

        let expr = self.parse_expression(script)?.ok_or_else(|| {
            Error::syntax(
                name.info.clone(),
                ErrorKind::UnexpectedToken {
                    expected: expr::PRIMARY_STARTERS.to_vec(),
                    got: Token::new(TokenKind::Newline, "", name.info.clone()),
                },
            )
        })?;

        script.defines.insert(name.value, expr);

        Ok(())
    }

    /// Parses one command line: either a registered command with expression
    /// arguments, or a macro invocation whose argument token groups are
    /// spliced into the stream.
    fn parse_command(&mut self, script: &mut Script) -> Result<(), Error> {
        let mut ty: Option<CommandType> = None;
        let mut args: Vec<ExpressionNode> = Vec::new();
        let mut info = None;

        let mut macro_name: Option<String> = None;
        let mut macro_args: Vec<Vec<Token>> = Vec::new();

        loop {
            let tok = self.peek();

            if matches!(tok.kind, TokenKind::Newline | TokenKind::Eof) {
                self.advance();

                if let Some(ty) = ty {
                    script.commands.push(CommandNode {
                        ty,
                        args,
                        info: info.unwrap_or_default(),
                    });
                } else if let Some(name) = macro_name {
                    let body = script
                        .macros
                        .get(&name)
                        .expect("macro presence was checked at the line head")
                        .expand(&macro_args)?;
                    self.src.insert(&name, Box::new(body));
                }

                return Ok(());
            }

            if ty.is_none() && macro_name.is_none() {
                info = Some(tok.info.clone());
                self.advance();

                if let Some(&command) = self.config.commands.get(&tok.value) {
                    ty = Some(command);
                } else if script.macros.contains_key(&tok.value) {
                    macro_name = Some(tok.value);
                } else {
                    return Err(Error::syntax(
                        tok.info,
                        ErrorKind::UnknownCommand(tok.value),
                    ));
                }
            } else if macro_name.is_some() {
                self.collect_macro_args(&mut macro_args);
            } else {
                let Some(arg) = self.parse_expression(script)? else {
                    return Ok(());
                };

                if self.peek().kind == TokenKind::Comma {
                    self.advance();
                }

                args.push(arg);
            }
        }
    }

    /// Raw tokens up to the end of the line, split into comma-separated
    /// groups. The newline stays in the stream.
    fn collect_macro_args(&mut self, macro_args: &mut Vec<Vec<Token>>) {
        let mut group: Vec<Token> = Vec::new();

        loop {
            let tok = self.peek();
            let end = matches!(tok.kind, TokenKind::Newline | TokenKind::Eof);

            if end || tok.kind == TokenKind::Comma {
                if !group.is_empty() {
                    macro_args.push(std::mem::take(&mut group));
                }
                if end {
                    return;
                }
            } else {
                group.push(tok);
            }

            self.advance();
        }
    }
}

/// Finalization: every pending label reference left in the command list is
/// rewritten to the declared pc. The walk runs in program order, so a missing
/// label is reported at its first reference.
fn resolve_labels(script: &mut Script) -> Result<(), Error> {
    let Script {
        labels, commands, ..
    } = script;

    for cmd in commands.iter_mut() {
        for arg in cmd.args.iter_mut() {
            resolve_expr(labels, arg)?;
        }
    }

    Ok(())
}

fn resolve_expr(
    labels: &IndexMap<String, usize>,
    node: &mut ExpressionNode,
) -> Result<(), Error> {
    match node {
        ExpressionNode::Label { name, info } => {
            let pc = labels.get(name.as_str()).copied().ok_or_else(|| {
                Error::syntax(info.clone(), ErrorKind::UnknownLabel(name.clone()))
            })?;
            *node = ExpressionNode::Address {
                pc: pc as i64,
                info: info.clone(),
            };
        }
        ExpressionNode::Binary { left, right, .. } => {
            resolve_expr(labels, left)?;
            resolve_expr(labels, right)?;
        }
        ExpressionNode::Unary { expr, .. } => {
            resolve_expr(labels, expr)?;
        }
        ExpressionNode::ArrayAccess { index, .. } => {
            resolve_expr(labels, index)?;
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests;
