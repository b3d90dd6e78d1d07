use super::Parser;
use crate::ast::{ExpressionNode, Identifier};
use crate::error::{Error, ErrorKind};
use crate::eval::Value;
use crate::script::Script;
use crate::token::{Token, TokenKind};

impl Parser<'_> {
    /// `var name` or `var name[N]`. An array declaration reserves `N`
    /// contiguous cells; the extra slots are named `__name_1 … __name_{N-1}`
    /// so array subscripts can be resolved back to plain identifiers.
    pub(super) fn parse_variable(&mut self, script: &mut Script) -> Result<(), Error> {
        self.advance();

        let name = self.expect(TokenKind::Ident)?;
        let base = script.add_variable(&name.value);

        if self.peek().kind == TokenKind::LBracket {
            let len = self.parse_static_array_len(script)?;
            for i in 1..len {
                script.add_variable_at(&format!("__{}_{}", name.value, i), Identifier(base.0 + i));
            }
        }

        Ok(())
    }

    /// The `[N]` of an array declaration is evaluated at parse time; only
    /// constant integer expressions are legal, so the resolver refuses every
    /// identifier.
    fn parse_static_array_len(&mut self, script: &mut Script) -> Result<i64, Error> {
        self.advance(); // bracket

        let first = self.peek();

        let Some(expr) = self.parse_expression(script)? else {
            return Err(Error::syntax(
                first.info.clone(),
                ErrorKind::UnexpectedToken {
                    expected: vec![TokenKind::Number, TokenKind::LParen],
                    got: first,
                },
            ));
        };

        self.expect(TokenKind::RBracket)?;

        let value = script
            .eval(&expr, &mut |id| {
                Err(ErrorKind::UnresolvedSymbol(id.to_string()))
            })
            .map_err(|err| err.into_parse_at(first.info.clone()))?;

        match value {
            Value::Int(len) => Ok(len),
            other => Err(Error::parse(
                first.info.clone(),
                ErrorKind::UnexpectedType(other.type_name().to_string()),
            )),
        }
    }

    /// `name[expr]` in expression position, after `name` resolved to a
    /// declared variable.
    pub(super) fn parse_array_access(
        &mut self,
        script: &mut Script,
        ident: &Token,
        variable: Identifier,
    ) -> Result<ExpressionNode, Error> {
        self.advance(); // bracket

        let open = self.peek();
        let Some(index) = self.parse_expression(script)? else {
            return Err(Error::syntax(
                open.info.clone(),
                ErrorKind::UnexpectedToken {
                    expected: vec![TokenKind::Number, TokenKind::Ident, TokenKind::LParen],
                    got: open,
                },
            ));
        };

        self.expect(TokenKind::RBracket)?;

        Ok(ExpressionNode::ArrayAccess {
            variable,
            index: Box::new(index),
            info: ident.info.clone(),
        })
    }
}
