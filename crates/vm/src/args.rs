use sequin_lang::{Error, ErrorKind, ExpressionNode, Identifier, Value};

use crate::frame::Frame;
use crate::Control;

/// Field types a command argument can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// An identifier literal, an array access (bound to its element
    /// address), or a numeric expression coerced to an id.
    Identifier,
    Int,
    Float,
    Str,
}

impl ArgKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "string",
        }
    }
}

/// Declarative binding contract for one field of a command's argument
/// record: positional index (defaults to the field's position in the spec
/// table) and an optional flag.
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub index: Option<usize>,
    pub optional: bool,
}

impl ArgSpec {
    pub const fn new(name: &'static str, kind: ArgKind) -> Self {
        Self {
            name,
            kind,
            index: None,
            optional: false,
        }
    }

    pub const fn ident(name: &'static str) -> Self {
        Self::new(name, ArgKind::Identifier)
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, ArgKind::Int)
    }

    pub const fn float(name: &'static str) -> Self {
        Self::new(name, ArgKind::Float)
    }

    pub const fn string(name: &'static str) -> Self {
        Self::new(name, ArgKind::Str)
    }

    pub const fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(Identifier),
}

/// The bound argument record, one value per spec field. Accessors are keyed
/// by field position; a successful bind guarantees the kinds match.
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    values: Vec<ArgValue>,
}

impl BoundArgs {
    pub fn get(&self, field: usize) -> Option<&ArgValue> {
        self.values.get(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn int(&self, field: usize) -> i64 {
        match self.values.get(field) {
            Some(ArgValue::Int(value)) => *value,
            Some(ArgValue::Float(value)) => *value as i64,
            _ => 0,
        }
    }

    pub fn float(&self, field: usize) -> f64 {
        match self.values.get(field) {
            Some(ArgValue::Float(value)) => *value,
            Some(ArgValue::Int(value)) => *value as f64,
            _ => 0.0,
        }
    }

    pub fn str(&self, field: usize) -> &str {
        match self.values.get(field) {
            Some(ArgValue::Str(value)) => value,
            _ => "",
        }
    }

    pub fn ident(&self, field: usize) -> Identifier {
        match self.values.get(field) {
            Some(ArgValue::Ident(id)) => *id,
            _ => Identifier(0),
        }
    }
}

/// Binds an expression-node argument vector against a spec table.
pub fn unmarshal_args(
    frame: &mut Frame<'_>,
    argv: &[ExpressionNode],
    spec: &[ArgSpec],
) -> Result<BoundArgs, Error> {
    let mut values = Vec::with_capacity(spec.len());

    for (field_idx, field) in spec.iter().enumerate() {
        let index = field.index.unwrap_or(field_idx);

        let Some(node) = argv.get(index) else {
            if !field.optional {
                return Err(Error::runtime(
                    frame.current(),
                    ErrorKind::MissingArgument {
                        index,
                        name: field.name.to_string(),
                        ty: field.kind.name().to_string(),
                    },
                ));
            }

            // There is no safe default id to write through.
            if field.kind == ArgKind::Identifier {
                return Err(Error::runtime(
                    frame.current(),
                    ErrorKind::ArgumentType {
                        index,
                        name: field.name.to_string(),
                        ty: field.kind.name().to_string(),
                        cause: "argument type cannot be optional".to_string(),
                    },
                ));
            }

            values.push(default_value(field.kind));
            continue;
        };

        values.push(bind_field(frame, node, field, index)?);
    }

    let args = BoundArgs { values };
    frame.post_unmarshal(&args);

    Ok(args)
}

fn default_value(kind: ArgKind) -> ArgValue {
    match kind {
        ArgKind::Identifier => ArgValue::Ident(Identifier(0)),
        ArgKind::Int => ArgValue::Int(0),
        ArgKind::Float => ArgValue::Float(0.0),
        ArgKind::Str => ArgValue::Str(String::new()),
    }
}

fn bind_field(
    frame: &mut Frame<'_>,
    node: &ExpressionNode,
    field: &ArgSpec,
    index: usize,
) -> Result<ArgValue, Error> {
    let type_error = |frame: &mut Frame<'_>, cause: String| {
        Error::runtime(
            frame.current(),
            ErrorKind::ArgumentType {
                index,
                name: field.name.to_string(),
                ty: field.kind.name().to_string(),
                cause,
            },
        )
    };

    if field.kind == ArgKind::Identifier {
        match node {
            ExpressionNode::Identifier { id, .. } => return Ok(ArgValue::Ident(*id)),
            ExpressionNode::ArrayAccess {
                variable, index, ..
            } => {
                let id = frame.element_address(*variable, index)?;
                return Ok(ArgValue::Ident(id));
            }
            _ => {
                return match frame.eval(node)? {
                    Value::Int(value) => Ok(ArgValue::Ident(Identifier(value))),
                    Value::Float(value) => Ok(ArgValue::Ident(Identifier(value as i64))),
                    other => Err(type_error(
                        frame,
                        format!("unsupported type: {}", other.type_name()),
                    )),
                };
            }
        }
    }

    let value = frame.eval(node)?;

    match (field.kind, value) {
        (ArgKind::Int, Value::Int(value)) => Ok(ArgValue::Int(value)),
        (ArgKind::Int, Value::Float(value)) => Ok(ArgValue::Int(value as i64)),
        (ArgKind::Float, Value::Float(value)) => Ok(ArgValue::Float(value)),
        (ArgKind::Float, Value::Int(value)) => Ok(ArgValue::Float(value as f64)),
        (ArgKind::Str, Value::Str(value)) => Ok(ArgValue::Str(value)),
        (_, other) => Err(type_error(
            frame,
            format!("unsupported type: {}", other.type_name()),
        )),
    }
}

/// Binds `argv` against `spec` and runs the handler body. A binding failure
/// is reported to the environment and the command falls through with no
/// effect.
pub fn with_args(
    frame: &mut Frame<'_>,
    argv: &[ExpressionNode],
    spec: &[ArgSpec],
    body: impl FnOnce(&mut Frame<'_>, &BoundArgs) -> Control,
) -> Control {
    match unmarshal_args(frame, argv, spec) {
        Ok(args) => body(frame, &args),
        Err(error) => {
            frame.handle_error(error);
            Control::next()
        }
    }
}
