use super::Parser;
use crate::ast::ExpressionNode;
use crate::error::{Error, ErrorKind};
use crate::script::Script;
use crate::token::{Token, TokenKind};

/// Token kinds that may begin a primary expression; used in error messages.
pub(super) const PRIMARY_STARTERS: &[TokenKind] = &[
    TokenKind::Newline,
    TokenKind::Add,
    TokenKind::Sub,
    TokenKind::Mul,
    TokenKind::Excl,
    TokenKind::Inv,
    TokenKind::And,
    TokenKind::LParen,
    TokenKind::Number,
    TokenKind::Str,
    TokenKind::Ident,
];

impl Parser<'_> {
    /// Precedence climbing, loosest binding first. Returns `None` when the
    /// line ended where a primary was allowed to start.
    pub(crate) fn parse_expression(
        &mut self,
        script: &mut Script,
    ) -> Result<Option<ExpressionNode>, Error> {
        self.parse_equality(script)
    }

    fn parse_equality(&mut self, script: &mut Script) -> Result<Option<ExpressionNode>, Error> {
        self.parse_binary(
            script,
            Self::parse_comparison,
            &[TokenKind::Eq, TokenKind::Neq],
        )
    }

    fn parse_comparison(&mut self, script: &mut Script) -> Result<Option<ExpressionNode>, Error> {
        self.parse_binary(
            script,
            Self::parse_shift,
            &[TokenKind::Lt, TokenKind::Gt, TokenKind::Lte, TokenKind::Gte],
        )
    }

    fn parse_shift(&mut self, script: &mut Script) -> Result<Option<ExpressionNode>, Error> {
        self.parse_binary(
            script,
            Self::parse_additive,
            &[TokenKind::Shl, TokenKind::Shr],
        )
    }

    fn parse_additive(&mut self, script: &mut Script) -> Result<Option<ExpressionNode>, Error> {
        self.parse_binary(
            script,
            Self::parse_multiplicative,
            &[
                TokenKind::Add,
                TokenKind::Sub,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Inv,
            ],
        )
    }

    fn parse_multiplicative(
        &mut self,
        script: &mut Script,
    ) -> Result<Option<ExpressionNode>, Error> {
        self.parse_binary(
            script,
            Self::parse_primary,
            &[TokenKind::Mul, TokenKind::Div, TokenKind::Percent],
        )
    }

    fn parse_binary(
        &mut self,
        script: &mut Script,
        next: fn(&mut Self, &mut Script) -> Result<Option<ExpressionNode>, Error>,
        ops: &[TokenKind],
    ) -> Result<Option<ExpressionNode>, Error> {
        let Some(mut expr) = next(self, script)? else {
            return Ok(None);
        };

        loop {
            let current = self.peek();
            if !ops.contains(&current.kind) {
                break;
            }

            let op = self.advance();

            let Some(right) = next(self, script)? else {
                return Err(missing_operand(op));
            };

            expr = ExpressionNode::Binary {
                left: Box::new(expr),
                op: op.kind,
                right: Box::new(right),
                info: op.info,
            };
        }

        Ok(Some(expr))
    }

    fn parse_primary(&mut self, script: &mut Script) -> Result<Option<ExpressionNode>, Error> {
        let tok = self.advance();

        match tok.kind {
            TokenKind::Newline => Ok(None),
            TokenKind::Add
            | TokenKind::Sub
            | TokenKind::Mul
            | TokenKind::Excl
            | TokenKind::Inv
            | TokenKind::And => {
                let Some(operand) = self.parse_primary(script)? else {
                    return Err(missing_operand(tok));
                };
                Ok(Some(ExpressionNode::Unary {
                    op: tok.kind,
                    expr: Box::new(operand),
                    info: tok.info,
                }))
            }
            TokenKind::LParen => {
                let Some(expr) = self.parse_expression(script)? else {
                    return Err(missing_operand(tok));
                };
                self.expect(TokenKind::RParen)?;
                Ok(Some(expr))
            }
            TokenKind::Number => self.parse_number(&tok).map(Some),
            TokenKind::Str => Ok(Some(ExpressionNode::Str {
                value: tok.value,
                info: tok.info,
            })),
            TokenKind::Percent => self.parse_local_label_ref(script, &tok).map(Some),
            TokenKind::Ident => self.resolve_ident(script, tok).map(Some),
            _ => Err(Error::syntax(
                tok.info.clone(),
                ErrorKind::UnexpectedToken {
                    expected: PRIMARY_STARTERS.to_vec(),
                    got: tok,
                },
            )),
        }
    }

    /// The parser decides integer vs float and the base; the lexer only
    /// captured the text.
    fn parse_number(&self, tok: &Token) -> Result<ExpressionNode, Error> {
        let text = tok.value.as_str();
        let invalid = || {
            Error::syntax(
                tok.info.clone(),
                ErrorKind::InvalidNumber(text.to_string()),
            )
        };

        if text.contains('.') {
            let value: f64 = text.parse().map_err(|_| invalid())?;
            return Ok(ExpressionNode::Float {
                value,
                info: tok.info.clone(),
            });
        }

        let value = if let Some(hex) = text.strip_prefix("0x") {
            i64::from_str_radix(hex, 16).map_err(|_| invalid())?
        } else if let Some(oct) = text.strip_prefix("0o") {
            i64::from_str_radix(oct, 8).map_err(|_| invalid())?
        } else if let Some(bin) = text.strip_prefix("0b") {
            i64::from_str_radix(bin, 2).map_err(|_| invalid())?
        } else {
            text.parse().map_err(|_| invalid())?
        };

        Ok(ExpressionNode::Integer {
            value,
            info: tok.info.clone(),
        })
    }

    /// Identifier resolution order: define substitution, declared variable
    /// (with optional array subscript), host identifier, forward label.
    fn resolve_ident(
        &mut self,
        script: &mut Script,
        tok: Token,
    ) -> Result<ExpressionNode, Error> {
        if let Some(expr) = script.defines.get(&tok.value) {
            return Ok(expr.clone());
        }

        if let Some(var) = script.variable(&tok.value) {
            if self.peek().kind == TokenKind::LBracket {
                return self.parse_array_access(script, &tok, var);
            }
            return Ok(ExpressionNode::Identifier {
                id: var,
                info: tok.info,
            });
        }

        if let Some(&id) = self.config.identifiers.get(&tok.value) {
            return Ok(ExpressionNode::Identifier { id, info: tok.info });
        }

        script.add_symbol(&tok.value, tok.info.clone());
        Ok(ExpressionNode::Label {
            name: tok.value,
            info: tok.info,
        })
    }

    /// `% ident` in expression position references a label in the current
    /// namespace prefix.
    fn parse_local_label_ref(
        &mut self,
        script: &mut Script,
        percent: &Token,
    ) -> Result<ExpressionNode, Error> {
        let ident = self.advance();
        if ident.kind != TokenKind::Ident {
            return Err(Error::syntax(
                percent.info.clone(),
                ErrorKind::UnexpectedToken {
                    expected: vec![TokenKind::Ident],
                    got: ident,
                },
            ));
        }

        let name = self.src.prefixed(&ident.value);
        script.add_symbol(&name, ident.info.clone());

        Ok(ExpressionNode::Label {
            name,
            info: ident.info,
        })
    }
}

fn missing_operand(op: Token) -> Error {
    Error::syntax(
        op.info.clone(),
        ErrorKind::UnexpectedToken {
            expected: PRIMARY_STARTERS.to_vec(),
            got: Token::new(TokenKind::Newline, "", op.info),
        },
    )
}
