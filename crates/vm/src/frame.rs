use sequin_lang::{Error, ErrorKind, ExpressionNode, Identifier, Script, SourceInfo, Value};

use crate::hooks::Hooks;
use crate::Environment;

/// The ephemeral execution context of one `start`/`call`: program counter
/// and the two fixed-capacity stacks. Memory belongs to the runtime and is
/// shared across frames of the same script.
pub struct Frame<'rt> {
    pub pc: i64,

    script: &'rt Script,
    memory: &'rt mut [i64],
    env: &'rt mut dyn Environment,
    hooks: &'rt Hooks,

    /// Position of the command being dispatched, for error reporting.
    current: SourceInfo,

    call_stack: Vec<i64>,
    csp: usize,

    operand_stack: Vec<i64>,
    osp: usize,
}

impl<'rt> Frame<'rt> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        pc: i64,
        script: &'rt Script,
        memory: &'rt mut [i64],
        env: &'rt mut dyn Environment,
        call_stack_size: usize,
        operand_stack_size: usize,
        hooks: &'rt Hooks,
    ) -> Self {
        Self {
            pc,
            script,
            memory,
            env,
            hooks,
            current: SourceInfo::synthetic(),
            call_stack: vec![0; call_stack_size],
            csp: 0,
            operand_stack: vec![0; operand_stack_size],
            osp: 0,
        }
    }

    pub fn script(&self) -> &Script {
        self.script
    }

    pub fn env(&mut self) -> &mut dyn Environment {
        &mut *self.env
    }

    pub fn end_of_script(&self) -> i64 {
        self.script.end_of_script()
    }

    pub(crate) fn set_current(&mut self, info: SourceInfo) {
        self.current = info;
    }

    pub(crate) fn current(&self) -> SourceInfo {
        self.current.clone()
    }

    pub fn handle_error(&mut self, error: Error) {
        self.env.handle_error(error);
    }

    fn report(&mut self, cause: ErrorKind) {
        let error = Error::runtime(self.current.clone(), cause);
        self.env.handle_error(error);
    }

    /// Reads an identifier: memory cell or host state depending on the id.
    /// Out-of-range memory reads yield 0.
    pub fn get_value(&mut self, id: Identifier) -> i64 {
        if id.is_variable() {
            let slot = id.memory_slot() as usize;
            self.memory.get(slot).copied().unwrap_or(0)
        } else {
            self.env.get(id)
        }
    }

    /// Writes an identifier; out-of-range memory writes are silently
    /// dropped.
    pub fn set_value(&mut self, id: Identifier, value: i64) {
        if id.is_variable() {
            let slot = id.memory_slot() as usize;
            if let Some(cell) = self.memory.get_mut(slot) {
                *cell = value;
            }
        } else {
            self.env.set(id, value);
        }
    }

    pub fn push_call(&mut self, value: i64) {
        if self.csp == self.call_stack.len() {
            self.report(ErrorKind::StackOverflow { stack: "call" });
            return;
        }
        self.call_stack[self.csp] = value;
        self.csp += 1;
    }

    pub fn pop_call(&mut self) -> Option<i64> {
        if self.csp == 0 {
            return None;
        }
        self.csp -= 1;
        Some(self.call_stack[self.csp])
    }

    pub fn push_operand(&mut self, value: i64) {
        if self.osp == self.operand_stack.len() {
            self.report(ErrorKind::StackOverflow { stack: "operand" });
            return;
        }
        self.operand_stack[self.osp] = value;
        self.osp += 1;
    }

    pub fn pop_operand(&mut self) -> Option<i64> {
        if self.osp == 0 {
            return None;
        }
        self.osp -= 1;
        Some(self.operand_stack[self.osp])
    }

    /// Evaluates an argument expression with this frame's identifier view.
    pub fn eval(&mut self, node: &ExpressionNode) -> Result<Value, Error> {
        let script = self.script;
        let memory = &*self.memory;
        let env = &mut *self.env;

        script.eval(node, &mut |id: Identifier| {
            if id.is_variable() {
                Ok(memory.get(id.memory_slot() as usize).copied().unwrap_or(0))
            } else {
                Ok(env.get(id))
            }
        })
    }

    /// Effective identifier of an array access, with indices evaluated
    /// against this frame.
    pub fn element_address(
        &mut self,
        variable: Identifier,
        index: &ExpressionNode,
    ) -> Result<Identifier, Error> {
        let script = self.script;
        let memory = &*self.memory;
        let env = &mut *self.env;

        script.array_element(variable, index, &mut |id: Identifier| {
            if id.is_variable() {
                Ok(memory.get(id.memory_slot() as usize).copied().unwrap_or(0))
            } else {
                Ok(env.get(id))
            }
        })
    }

    pub(crate) fn post_unmarshal(&self, args: &crate::args::BoundArgs) {
        self.hooks.unmarshal(args);
    }
}
