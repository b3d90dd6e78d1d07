use std::fmt;

use crate::ast::{ExpressionNode, Identifier};
use crate::error::{Error, ErrorKind};
use crate::script::Script;
use crate::token::TokenKind;

/// Result of evaluating an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(value) => Some(*value as i64),
            Self::Str(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

/// Maps an identifier to its current integer value. Memory cells and host
/// identifiers both resolve through this; a resolver may refuse (static
/// evaluation during parsing does, for every identifier).
pub type Resolver<'a> = dyn FnMut(Identifier) -> Result<i64, ErrorKind> + 'a;

impl Script {
    /// Evaluates an expression tree against `resolve`. Pure apart from the
    /// resolver: no state inside the script is touched.
    pub fn eval(&self, node: &ExpressionNode, resolve: &mut Resolver<'_>) -> Result<Value, Error> {
        match node {
            ExpressionNode::Integer { value, .. } => Ok(Value::Int(*value)),
            ExpressionNode::Float { value, .. } => Ok(Value::Float(*value)),
            ExpressionNode::Str { value, .. } => Ok(Value::Str(value.clone())),
            ExpressionNode::Address { pc, .. } => Ok(Value::Int(*pc)),
            ExpressionNode::Identifier { id, info } => {
                let value =
                    resolve(*id).map_err(|cause| Error::runtime(info.clone(), cause))?;
                Ok(Value::Int(value))
            }
            ExpressionNode::Label { name, info } => Err(Error::runtime(
                info.clone(),
                ErrorKind::UnresolvedSymbol(name.clone()),
            )),
            ExpressionNode::ArrayAccess {
                variable,
                index,
                info,
            } => {
                let id = self.array_element(*variable, index, resolve)?;
                let value = resolve(id).map_err(|cause| Error::runtime(info.clone(), cause))?;
                Ok(Value::Int(value))
            }
            ExpressionNode::Unary { op, expr, info } => self.eval_unary(*op, expr, info, resolve),
            ExpressionNode::Binary {
                left,
                op,
                right,
                info,
            } => self.eval_binary(left, *op, right, info, resolve),
        }
    }

    /// Computes the effective identifier of an array access: the base
    /// variable for index 0, the `__base_i` slot otherwise.
    pub fn array_element(
        &self,
        variable: Identifier,
        index: &ExpressionNode,
        resolve: &mut Resolver<'_>,
    ) -> Result<Identifier, Error> {
        let info = index.info().clone();
        let idx = match self.eval(index, resolve)? {
            Value::Int(idx) => idx,
            other => {
                return Err(Error::runtime(
                    info,
                    ErrorKind::UnexpectedType(other.type_name().to_string()),
                ));
            }
        };

        if idx == 0 {
            return Ok(variable);
        }

        let base = self
            .variable_names
            .get(&variable.0)
            .ok_or_else(|| {
                Error::runtime(info.clone(), ErrorKind::UnresolvedSymbol(variable.to_string()))
            })?;

        self.variables
            .get(&format!("__{base}_{idx}"))
            .copied()
            .ok_or_else(|| {
                Error::runtime(
                    info,
                    ErrorKind::UnresolvedSymbol(format!("{variable}+{idx}")),
                )
            })
    }

    fn eval_unary(
        &self,
        op: TokenKind,
        expr: &ExpressionNode,
        info: &crate::source::SourceInfo,
        resolve: &mut Resolver<'_>,
    ) -> Result<Value, Error> {
        // Address-of and deref inspect the operand node, not just its value.
        match op {
            TokenKind::And => return self.eval_address_of(expr, info, resolve),
            TokenKind::Mul => return self.eval_deref(expr, info, resolve),
            _ => {}
        }

        let value = self.eval(expr, resolve)?;

        match op {
            TokenKind::Sub => Ok(match value {
                Value::Int(v) => Value::Int(v.wrapping_neg()),
                Value::Float(v) => Value::Float(-v),
                other => other,
            }),
            TokenKind::Inv => Ok(match value {
                Value::Int(v) => Value::Int(!v),
                Value::Float(v) => Value::Int(!(v as i64)),
                other => other,
            }),
            TokenKind::Excl => Ok(match value {
                Value::Int(v) => Value::Int(i64::from(v == 0)),
                Value::Float(v) => Value::Int(i64::from(v == 0.0)),
                other => other,
            }),
            // `+` is accepted by the parser but has no effect.
            TokenKind::Add => Ok(value),
            other => Err(Error::runtime(
                info.clone(),
                ErrorKind::UnknownOperator(other),
            )),
        }
    }

    /// `&x`: the numeric id of the operand, without resolving it.
    fn eval_address_of(
        &self,
        expr: &ExpressionNode,
        info: &crate::source::SourceInfo,
        resolve: &mut Resolver<'_>,
    ) -> Result<Value, Error> {
        match expr {
            ExpressionNode::Identifier { id, .. } => Ok(Value::Int(id.0)),
            ExpressionNode::Integer { value, .. } => Ok(Value::Int(*value)),
            other => match self.eval(other, resolve)? {
                Value::Int(id) => Ok(Value::Int(id)),
                value => Err(Error::runtime(
                    info.clone(),
                    ErrorKind::UnresolvedSymbol(value.to_string()),
                )),
            },
        }
    }

    /// `*x`: the value stored at the identifier the operand names.
    fn eval_deref(
        &self,
        expr: &ExpressionNode,
        info: &crate::source::SourceInfo,
        resolve: &mut Resolver<'_>,
    ) -> Result<Value, Error> {
        let id = match expr {
            ExpressionNode::Identifier { id, .. } => *id,
            ExpressionNode::Integer { value, .. } => Identifier(*value),
            other => match self.eval(other, resolve)? {
                Value::Int(id) => Identifier(id),
                value => {
                    return Err(Error::runtime(
                        info.clone(),
                        ErrorKind::UnresolvedSymbol(value.to_string()),
                    ));
                }
            },
        };

        let value = resolve(id).map_err(|cause| Error::runtime(info.clone(), cause))?;
        Ok(Value::Int(value))
    }

    fn eval_binary(
        &self,
        left: &ExpressionNode,
        op: TokenKind,
        right: &ExpressionNode,
        info: &crate::source::SourceInfo,
        resolve: &mut Resolver<'_>,
    ) -> Result<Value, Error> {
        let lhs = self.eval(left, resolve)?;
        let rhs = self.eval(right, resolve)?;

        match (&lhs, &rhs) {
            (Value::Int(a), Value::Int(b)) => {
                eval_int_op(op, *a, *b).map_err(|cause| Error::runtime(info.clone(), cause))
            }
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let a = match &lhs {
                    Value::Int(v) => *v as f64,
                    Value::Float(v) => *v,
                    Value::Str(_) => unreachable!(),
                };
                let b = match &rhs {
                    Value::Int(v) => *v as f64,
                    Value::Float(v) => *v,
                    Value::Str(_) => unreachable!(),
                };
                eval_float_op(op, a, b).map_err(|cause| Error::runtime(info.clone(), cause))
            }
            _ => Err(Error::runtime(
                info.clone(),
                ErrorKind::UnexpectedBinaryOp {
                    left: lhs.to_string(),
                    right: rhs.to_string(),
                },
            )),
        }
    }
}

fn eval_int_op(op: TokenKind, a: i64, b: i64) -> Result<Value, ErrorKind> {
    let value = match op {
        TokenKind::Add => a.wrapping_add(b),
        TokenKind::Sub => a.wrapping_sub(b),
        TokenKind::Mul => a.wrapping_mul(b),
        TokenKind::Div => {
            if b == 0 {
                return Err(ErrorKind::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        TokenKind::Percent => {
            if b == 0 {
                return Err(ErrorKind::DivisionByZero);
            }
            a.wrapping_rem(b)
        }
        TokenKind::Shl => a.wrapping_shl(b as u32),
        TokenKind::Shr => a.wrapping_shr(b as u32),
        TokenKind::And => a & b,
        TokenKind::Or => a | b,
        TokenKind::Inv => a ^ b,
        TokenKind::Lt => i64::from(a < b),
        TokenKind::Gt => i64::from(a > b),
        TokenKind::Lte => i64::from(a <= b),
        TokenKind::Gte => i64::from(a >= b),
        TokenKind::Eq => i64::from(a == b),
        TokenKind::Neq => i64::from(a != b),
        other => return Err(ErrorKind::UnknownOperator(other)),
    };

    Ok(Value::Int(value))
}

fn eval_float_op(op: TokenKind, a: f64, b: f64) -> Result<Value, ErrorKind> {
    let value = match op {
        TokenKind::Add => a + b,
        TokenKind::Sub => a - b,
        TokenKind::Mul => a * b,
        TokenKind::Div => {
            if b == 0.0 {
                return Err(ErrorKind::DivisionByZero);
            }
            a / b
        }
        // Integer-only operators truncate their operands but keep the
        // float-ness of the expression.
        TokenKind::Percent => {
            if b as i64 == 0 {
                return Err(ErrorKind::DivisionByZero);
            }
            ((a as i64).wrapping_rem(b as i64)) as f64
        }
        TokenKind::Shl => ((a as i64).wrapping_shl(b as u32)) as f64,
        TokenKind::Shr => ((a as i64).wrapping_shr(b as u32)) as f64,
        TokenKind::And => ((a as i64) & (b as i64)) as f64,
        TokenKind::Or => ((a as i64) | (b as i64)) as f64,
        TokenKind::Inv => ((a as i64) ^ (b as i64)) as f64,
        // Comparisons are integers regardless of operand types.
        TokenKind::Lt => return Ok(Value::Int(i64::from(a < b))),
        TokenKind::Gt => return Ok(Value::Int(i64::from(a > b))),
        TokenKind::Lte => return Ok(Value::Int(i64::from(a <= b))),
        TokenKind::Gte => return Ok(Value::Int(i64::from(a >= b))),
        TokenKind::Eq => return Ok(Value::Int(i64::from(a == b))),
        TokenKind::Neq => return Ok(Value::Int(i64::from(a != b))),
        other => return Err(ErrorKind::UnknownOperator(other)),
    };

    Ok(Value::Float(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceInfo;

    fn int(value: i64) -> ExpressionNode {
        ExpressionNode::Integer {
            value,
            info: SourceInfo::synthetic(),
        }
    }

    fn float(value: f64) -> ExpressionNode {
        ExpressionNode::Float {
            value,
            info: SourceInfo::synthetic(),
        }
    }

    fn binary(left: ExpressionNode, op: TokenKind, right: ExpressionNode) -> ExpressionNode {
        ExpressionNode::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
            info: SourceInfo::synthetic(),
        }
    }

    fn unary(op: TokenKind, expr: ExpressionNode) -> ExpressionNode {
        ExpressionNode::Unary {
            op,
            expr: Box::new(expr),
            info: SourceInfo::synthetic(),
        }
    }

    fn eval(node: &ExpressionNode) -> Result<Value, Error> {
        let script = Script::new();
        script.eval(node, &mut |id| Err(ErrorKind::UnresolvedSymbol(id.to_string())))
    }

    #[test]
    fn int_arithmetic_stays_int() {
        let node = binary(int(2), TokenKind::Add, binary(int(4), TokenKind::Mul, int(8)));
        assert_eq!(eval(&node).expect("eval"), Value::Int(34));
    }

    #[test]
    fn mixed_operands_promote_to_float() {
        let node = binary(int(1), TokenKind::Add, float(2.5));
        assert_eq!(eval(&node).expect("eval"), Value::Float(3.5));
    }

    #[test]
    fn integer_division_truncates_toward_zero() {
        assert_eq!(
            eval(&binary(int(-7), TokenKind::Div, int(2))).expect("eval"),
            Value::Int(-3)
        );
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let err = eval(&binary(int(1), TokenKind::Div, int(0))).expect_err("division");
        assert!(matches!(err.cause(), ErrorKind::DivisionByZero));

        let err = eval(&binary(int(1), TokenKind::Percent, int(0))).expect_err("modulo");
        assert!(matches!(err.cause(), ErrorKind::DivisionByZero));
    }

    #[test]
    fn comparisons_yield_int_zero_or_one() {
        assert_eq!(
            eval(&binary(int(3), TokenKind::Lt, int(4))).expect("eval"),
            Value::Int(1)
        );
        assert_eq!(
            eval(&binary(float(3.5), TokenKind::Gte, float(4.0))).expect("eval"),
            Value::Int(0)
        );
        assert_eq!(
            eval(&binary(int(4), TokenKind::Eq, int(4))).expect("eval"),
            Value::Int(1)
        );
    }

    #[test]
    fn bitwise_and_shifts() {
        assert_eq!(
            eval(&binary(int(0xFF), TokenKind::And, int(0b1010))).expect("eval"),
            Value::Int(10)
        );
        assert_eq!(
            eval(&binary(int(1), TokenKind::Shl, int(4))).expect("eval"),
            Value::Int(16)
        );
        assert_eq!(
            eval(&binary(int(6), TokenKind::Inv, int(3))).expect("eval"),
            Value::Int(5)
        );
    }

    #[test]
    fn logical_not_maps_zero_to_one_and_nonzero_to_zero() {
        assert_eq!(eval(&unary(TokenKind::Excl, int(0))).expect("eval"), Value::Int(1));
        assert_eq!(eval(&unary(TokenKind::Excl, int(42))).expect("eval"), Value::Int(0));
        assert_eq!(
            eval(&unary(TokenKind::Excl, float(0.0))).expect("eval"),
            Value::Int(1)
        );
    }

    #[test]
    fn negation_preserves_numeric_kind() {
        assert_eq!(eval(&unary(TokenKind::Sub, int(42))).expect("eval"), Value::Int(-42));
        assert_eq!(
            eval(&unary(TokenKind::Sub, float(42.0))).expect("eval"),
            Value::Float(-42.0)
        );
    }

    #[test]
    fn bitwise_not_truncates_floats() {
        assert_eq!(eval(&unary(TokenKind::Inv, int(0))).expect("eval"), Value::Int(-1));
        assert_eq!(
            eval(&unary(TokenKind::Inv, float(1.9))).expect("eval"),
            Value::Int(-2)
        );
    }

    #[test]
    fn address_of_yields_the_id_without_resolving() {
        let node = unary(
            TokenKind::And,
            ExpressionNode::Identifier {
                id: Identifier(7),
                info: SourceInfo::synthetic(),
            },
        );
        assert_eq!(eval(&node).expect("eval"), Value::Int(7));
    }

    #[test]
    fn deref_resolves_the_named_id() {
        let script = Script::new();
        let node = unary(TokenKind::Mul, int(5));
        let value = script
            .eval(&node, &mut |id| Ok(id.0 * 100))
            .expect("eval");
        assert_eq!(value, Value::Int(500));
    }

    #[test]
    fn address_of_string_is_unresolved() {
        let node = unary(
            TokenKind::And,
            ExpressionNode::Str {
                value: "x".into(),
                info: SourceInfo::synthetic(),
            },
        );
        let err = eval(&node).expect_err("address-of string");
        assert!(matches!(err.cause(), ErrorKind::UnresolvedSymbol(_)));
    }

    #[test]
    fn string_operand_in_binary_op_is_rejected() {
        let node = binary(
            ExpressionNode::Str {
                value: "hello".into(),
                info: SourceInfo::synthetic(),
            },
            TokenKind::Sub,
            int(42),
        );
        let err = eval(&node).expect_err("string operand");
        assert!(matches!(err.cause(), ErrorKind::UnexpectedBinaryOp { .. }));
    }

    #[test]
    fn array_access_addresses_slots() {
        let mut script = Script::new();
        let base = script.add_variable("a");
        script.add_variable_at("__a_1", Identifier(base.0 + 1));
        script.add_variable_at("__a_2", Identifier(base.0 + 2));

        let resolve = &mut |id: Identifier| Ok(id.0);

        let elem = script
            .array_element(base, &int(2), resolve)
            .expect("element");
        assert_eq!(elem, Identifier(base.0 + 2));

        let elem = script.array_element(base, &int(0), resolve).expect("base");
        assert_eq!(elem, base);

        let err = script
            .array_element(base, &int(3), resolve)
            .expect_err("out of range");
        assert!(matches!(err.cause(), ErrorKind::UnresolvedSymbol(_)));

        let err = script
            .array_element(base, &int(-1), resolve)
            .expect_err("negative index");
        assert!(matches!(err.cause(), ErrorKind::UnresolvedSymbol(_)));
    }
}
