//! Runtime half of the sequin scripting toolchain.
//!
//! A [`Runtime`] executes a compiled [`Script`] under control of a host
//! [`Environment`]: a single-frame interpreter with an operand stack, a
//! call/return stack, a linear memory region for declared variables, and a
//! dense command dispatch table the host can extend.

pub mod args;
pub mod commands;
pub mod frame;
pub mod hooks;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use sequin_lang::{
    CommandType, CommandTypeTable, Error, ErrorKind, Identifier, IdentifierTable, LookupFn,
    ParserConfig, Script, ScriptFS,
};

pub use args::{unmarshal_args, with_args, ArgKind, ArgSpec, ArgValue, BoundArgs};
pub use commands::base_commands;
pub use frame::Frame;
pub use hooks::Hooks;

pub const DEFAULT_CALL_STACK_SIZE: usize = 32;
pub const DEFAULT_OPERAND_STACK_SIZE: usize = 64;

/// The embedding host: observable state plus the error sink. Identifier
/// reads and writes below [`sequin_lang::VARIABLE_OFFSET`] land here; cells
/// at or above it live in the runtime's own memory.
pub trait Environment {
    fn get(&mut self, id: Identifier) -> i64;
    fn set(&mut self, id: Identifier, value: i64);

    /// Runtime errors are reported here; execution continues with the
    /// failing command's effect omitted.
    fn handle_error(&mut self, error: Error);
}

/// What a command handler tells the interpreter loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub target: i64,
    pub jump: bool,
}

impl Control {
    /// Fall through to the next command.
    pub fn next() -> Self {
        Self {
            target: 0,
            jump: false,
        }
    }

    pub fn jump(target: i64) -> Self {
        Self { target, jump: true }
    }
}

pub type CommandHandler = Box<dyn Fn(&mut Frame<'_>, &[sequin_lang::ExpressionNode]) -> Control>;

/// A named opcode: what scripts call it, the type it dispatches on, and its
/// handler.
pub struct Command {
    pub name: String,
    pub ty: CommandType,
    pub handler: CommandHandler,
}

impl Command {
    pub fn new(name: impl Into<String>, ty: CommandType, handler: CommandHandler) -> Self {
        Self {
            name: name.into(),
            ty,
            handler,
        }
    }
}

/// Host-side runtime configuration.
#[derive(Default)]
pub struct RuntimeConfig {
    /// Commands registered on top of the built-in set; types must be at or
    /// above [`CommandType::USER_COMMAND_OFFSET`]. Re-registration
    /// overwrites.
    pub user_commands: Vec<Command>,
    pub identifiers: IdentifierTable,
    /// 0 means the default of 32.
    pub call_stack_size: usize,
    /// 0 means the default of 64.
    pub operand_stack_size: usize,
    pub hooks: Hooks,
}

impl RuntimeConfig {
    /// Parser configuration matching this runtime: the built-in command
    /// names plus everything in `user_commands`.
    pub fn parser_config(
        &self,
        fs: Option<Arc<dyn ScriptFS>>,
        lookup: Option<Box<LookupFn>>,
    ) -> ParserConfig {
        let mut commands = CommandTypeTable::default();
        for &(name, ty) in commands::BASE_COMMAND_NAMES {
            commands.insert(name.to_string(), ty);
        }
        for cmd in &self.user_commands {
            commands.insert(cmd.name.clone(), cmd.ty);
        }

        ParserConfig {
            fs,
            lookup,
            commands,
            identifiers: self.identifiers.clone(),
            buf_size: 0,
        }
    }

    /// Reverse command table, for listings.
    pub fn command_names(&self) -> FxHashMap<CommandType, String> {
        let mut names = FxHashMap::default();
        for &(name, ty) in commands::BASE_COMMAND_NAMES {
            names.insert(ty, name.to_string());
        }
        for cmd in &self.user_commands {
            names.insert(cmd.ty, cmd.name.clone());
        }
        names
    }
}

/// Executes a script. Owns the memory region backing the script's declared
/// variables and the dispatch table; each `start` spawns a fresh frame (pc
/// plus stacks) over that shared state. Not safe for concurrent use; the
/// script itself may be shared read-only between runtimes.
pub struct Runtime {
    script: Arc<Script>,
    handlers: Vec<Option<CommandHandler>>,
    memory: Vec<i64>,
    hooks: Hooks,
    call_stack_size: usize,
    operand_stack_size: usize,
}

impl Runtime {
    pub fn new(script: Arc<Script>) -> Self {
        Self::with_config(script, RuntimeConfig::default())
    }

    pub fn with_config(script: Arc<Script>, config: RuntimeConfig) -> Self {
        let memory = vec![0; script.variables().len()];

        let mut runtime = Self {
            script,
            handlers: Vec::new(),
            memory,
            hooks: config.hooks,
            call_stack_size: if config.call_stack_size == 0 {
                DEFAULT_CALL_STACK_SIZE
            } else {
                config.call_stack_size
            },
            operand_stack_size: if config.operand_stack_size == 0 {
                DEFAULT_OPERAND_STACK_SIZE
            } else {
                config.operand_stack_size
            },
        };

        runtime.register_commands(commands::base_commands());
        runtime.register_commands(config.user_commands);

        runtime
    }

    pub fn register_command(&mut self, cmd: Command) {
        if cmd.ty.0 >= self.handlers.len() {
            self.handlers.resize_with(cmd.ty.0 + 1, || None);
        }
        self.handlers[cmd.ty.0] = Some(cmd.handler);
    }

    pub fn register_commands(&mut self, cmds: Vec<Command>) {
        for cmd in cmds {
            self.register_command(cmd);
        }
    }

    pub fn script(&self) -> &Script {
        self.script.as_ref()
    }

    /// The linear memory backing declared variables, one cell per slot.
    pub fn memory(&self) -> &[i64] {
        &self.memory
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.script.label(name)
    }

    /// Runs from `pc` until the program counter leaves the command list.
    pub fn start(&mut self, pc: i64, env: &mut dyn Environment) {
        let script = self.script.as_ref();
        let handlers = &self.handlers;
        let hooks = &self.hooks;

        let mut frame = frame::Frame::new(
            pc,
            script,
            &mut self.memory,
            env,
            self.call_stack_size,
            self.operand_stack_size,
            hooks,
        );

        let commands = script.commands();

        while frame.pc >= 0 && (frame.pc as usize) < commands.len() {
            let cmd = &commands[frame.pc as usize];
            frame.set_current(cmd.info.clone());

            hooks.pre(cmd);

            let control = match handlers.get(cmd.ty.0).and_then(Option::as_ref) {
                Some(handler) => handler(&mut frame, &cmd.args),
                None => {
                    frame.handle_error(Error::runtime(
                        cmd.info.clone(),
                        ErrorKind::UnknownCommand(cmd.ty.0.to_string()),
                    ));
                    Control::next()
                }
            };

            hooks.post(cmd, control.target, control.jump);

            frame.pc = if control.jump {
                control.target
            } else {
                frame.pc + 1
            };
        }
    }

    /// Resolves `label` and runs from there; false when the label does not
    /// exist.
    pub fn call(&mut self, label: &str, env: &mut dyn Environment) -> bool {
        match self.label(label) {
            Some(pc) => {
                self.start(pc as i64, env);
                true
            }
            None => false,
        }
    }
}
