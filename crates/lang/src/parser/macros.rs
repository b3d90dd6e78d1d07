use rustc_hash::FxHashMap;

use super::Parser;
use crate::error::{Error, ErrorKind};
use crate::script::Script;
use crate::stream::TokenSlice;
use crate::token::{Token, TokenKind};

/// A macro definition: named argument slots and the body captured as a
/// verbatim token slice. Expansion is purely token-level; the expanded body
/// is parsed like any other source.
#[derive(Debug, Clone)]
pub struct Macro {
    name: String,
    params: FxHashMap<String, usize>,
    body: Vec<Token>,
}

impl Macro {
    pub(crate) fn new(name: String, param_names: Vec<String>, body: Vec<Token>) -> Self {
        let params = param_names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (name, idx))
            .collect();

        Self { name, params, body }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitutes each `$name` occurrence in the body with the matching
    /// argument token group.
    pub(crate) fn expand(&self, args: &[Vec<Token>]) -> Result<TokenSlice, Error> {
        let mut tokens = Vec::with_capacity(self.body.len());

        let mut i = 0;
        while i < self.body.len() {
            let Some(param) = param_at(&self.body, i) else {
                tokens.push(self.body[i].clone());
                i += 1;
                continue;
            };

            let idx = self.params.get(&param.value).copied().ok_or_else(|| {
                Error::syntax(
                    param.info.clone(),
                    ErrorKind::UnknownMacroArgument(param.value.clone()),
                )
            })?;

            let group = args.get(idx).ok_or_else(|| {
                Error::syntax(
                    param.info.clone(),
                    ErrorKind::MissingMacroArgument(param.value.clone()),
                )
            })?;

            tokens.extend(group.iter().cloned());
            i += 2;
        }

        Ok(TokenSlice::new(tokens))
    }
}

/// `$` directly followed by an identifier names a macro argument.
fn param_at(tokens: &[Token], i: usize) -> Option<&Token> {
    if tokens[i].kind != TokenKind::Dollar {
        return None;
    }
    tokens.get(i + 1).filter(|tok| tok.kind == TokenKind::Ident)
}

impl Parser<'_> {
    /// `macro name $a $b … NEWLINE body endmacro`. The body tokens are kept
    /// verbatim, including newlines, and replayed on each invocation.
    pub(super) fn parse_macro(&mut self, script: &mut Script) -> Result<(), Error> {
        self.advance();

        let name = self.expect(TokenKind::Ident)?;

        let header = self.consume_until(TokenKind::Newline);
        let mut params = Vec::new();
        let mut i = 0;
        while i < header.len() {
            match param_at(&header, i) {
                Some(param) => {
                    params.push(param.value.clone());
                    i += 2;
                }
                None => i += 1,
            }
        }

        let body = self.consume_until(TokenKind::EndMacro);

        script
            .macros
            .insert(name.value.clone(), Macro::new(name.value, params, body));

        Ok(())
    }
}
