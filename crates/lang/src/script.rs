use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::ast::{CommandNode, CommandType, ExpressionNode, Identifier, VARIABLE_OFFSET};
use crate::parser::Macro;
use crate::source::SourceInfo;

/// The compiled form of a source script: an addressable command list plus the
/// tables built up during parsing. Immutable once parsing finishes; may be
/// shared read-only between any number of runtimes.
#[derive(Debug, Default)]
pub struct Script {
    pub(crate) commands: Vec<CommandNode>,
    pub(crate) labels: IndexMap<String, usize>,
    /// Label references seen before (or without) a declaration, by name.
    /// Drained into `Address` nodes by the parser's finalization pass; kept
    /// for error reporting at the first reference.
    pub(crate) symbols: FxHashMap<String, Vec<SourceInfo>>,
    pub(crate) defines: FxHashMap<String, ExpressionNode>,
    pub(crate) variables: IndexMap<String, Identifier>,
    pub(crate) variable_names: FxHashMap<i64, String>,
    pub(crate) macros: FxHashMap<String, Macro>,
}

impl Script {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current program counter: the index the next parsed command will get.
    pub fn pc(&self) -> usize {
        self.commands.len()
    }

    /// A pc strictly past the last command; jumping here terminates the run.
    pub fn end_of_script(&self) -> i64 {
        self.commands.len() as i64 + 1
    }

    pub fn commands(&self) -> &[CommandNode] {
        &self.commands
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn labels(&self) -> &IndexMap<String, usize> {
        &self.labels
    }

    /// Label references recorded before resolution, by name. After a
    /// successful parse every entry has a matching label; the positions are
    /// kept for tooling.
    pub fn symbols(&self) -> &FxHashMap<String, Vec<SourceInfo>> {
        &self.symbols
    }

    pub fn variables(&self) -> &IndexMap<String, Identifier> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<Identifier> {
        self.variables.get(name).copied()
    }

    pub fn define(&self, name: &str) -> Option<&ExpressionNode> {
        self.defines.get(name)
    }

    pub(crate) fn add_variable(&mut self, name: &str) -> Identifier {
        let id = Identifier(VARIABLE_OFFSET + self.variables.len() as i64);
        self.add_variable_at(name, id);
        id
    }

    pub(crate) fn add_variable_at(&mut self, name: &str, id: Identifier) {
        self.variables.insert(name.to_string(), id);
        self.variable_names.insert(id.0, name.to_string());
    }

    pub(crate) fn add_symbol(&mut self, name: &str, at: SourceInfo) {
        self.symbols.entry(name.to_string()).or_default().push(at);
    }

    fn variable_name(&self, id: Identifier) -> Option<&str> {
        self.variable_names.get(&id.0).map(String::as_str)
    }

    /// Renders the program as re-parseable source: variable declarations,
    /// then the command list with label declarations interleaved. `names`
    /// maps command types back to their registered names.
    pub fn listing(&self, names: &FxHashMap<CommandType, String>) -> String {
        let mut out = String::new();

        for name in self.variables.keys() {
            if self.array_slot_base(name).is_some() {
                continue;
            }
            let len = self.array_len(name);
            if len > 1 {
                out.push_str(&format!("var {name}[{len}]\n"));
            } else {
                out.push_str(&format!("var {name}\n"));
            }
        }

        let mut labels_at: FxHashMap<usize, Vec<&str>> = FxHashMap::default();
        for (name, pc) in &self.labels {
            labels_at.entry(*pc).or_default().push(name.as_str());
        }

        for (pc, cmd) in self.commands.iter().enumerate() {
            if let Some(labels) = labels_at.get(&pc) {
                for label in labels {
                    out.push_str(&format!("{label}:\n"));
                }
            }
            out.push_str(&self.format_command(cmd, names));
            out.push('\n');
        }

        if let Some(labels) = labels_at.get(&self.commands.len()) {
            for label in labels {
                out.push_str(&format!("{label}:\n"));
            }
        }

        out
    }

    /// `__base_i` names synthesized for array slots; returns the base name
    /// and index when this is one of them.
    fn array_slot_base<'a>(&self, name: &'a str) -> Option<(&'a str, i64)> {
        let rest = name.strip_prefix("__")?;
        let (base, idx) = rest.rsplit_once('_')?;
        let idx: i64 = idx.parse().ok()?;
        if self.variables.contains_key(base) {
            Some((base, idx))
        } else {
            None
        }
    }

    fn array_len(&self, base: &str) -> i64 {
        let mut len = 1;
        while self.variables.contains_key(&format!("__{base}_{len}")) {
            len += 1;
        }
        len
    }

    fn format_command(&self, cmd: &CommandNode, names: &FxHashMap<CommandType, String>) -> String {
        let name = names
            .get(&cmd.ty)
            .cloned()
            .unwrap_or_else(|| format!("cmd{}", cmd.ty.0));

        if cmd.args.is_empty() {
            return name;
        }

        let args = cmd
            .args
            .iter()
            .map(|arg| self.format_expr(arg))
            .collect::<Vec<_>>()
            .join(", ");

        format!("{name} {args}")
    }

    fn format_expr(&self, node: &ExpressionNode) -> String {
        match node {
            ExpressionNode::Integer { value, .. } => value.to_string(),
            ExpressionNode::Float { value, .. } => {
                let mut text = format!("{value:?}");
                if !text.contains('.') {
                    text.push_str(".0");
                }
                text
            }
            ExpressionNode::Str { value, .. } => format!("\"{value}\""),
            ExpressionNode::Identifier { id, .. } => match self.variable_name(*id) {
                Some(name) => name.to_string(),
                None => id.0.to_string(),
            },
            ExpressionNode::Address { pc, .. } => pc.to_string(),
            ExpressionNode::Label { name, .. } => name.clone(),
            ExpressionNode::ArrayAccess {
                variable, index, ..
            } => {
                let base = match self.variable_name(*variable) {
                    Some(name) => name.to_string(),
                    None => variable.0.to_string(),
                };
                format!("{base}[{}]", self.format_expr(index))
            }
            ExpressionNode::Unary { op, expr, .. } => {
                let op = op.operator_text().unwrap_or("?");
                format!("{op}{}", self.format_expr(expr))
            }
            ExpressionNode::Binary {
                left, op, right, ..
            } => {
                let op = op.operator_text().unwrap_or("?");
                format!(
                    "({} {op} {})",
                    self.format_expr(left),
                    self.format_expr(right)
                )
            }
        }
    }
}
