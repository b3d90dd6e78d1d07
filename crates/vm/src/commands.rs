use sequin_lang::{CommandType, ExpressionNode};

use crate::args::{with_args, ArgSpec};
use crate::frame::Frame;
use crate::{Command, Control};

/// The built-in command set; these names are permanently bound to their
/// types.
pub(crate) const BASE_COMMAND_NAMES: &[(&str, CommandType)] = &[
    ("nop", CommandType::NOP),
    ("exit", CommandType::EXIT),
    ("push", CommandType::PUSH),
    ("pop", CommandType::POP),
    ("goto", CommandType::GOTO),
    ("set", CommandType::SET),
    ("call", CommandType::CALL),
    ("ret", CommandType::RET),
    ("jumpIf", CommandType::JUMP_IF),
];

pub fn base_commands() -> Vec<Command> {
    vec![
        Command::new("nop", CommandType::NOP, Box::new(handle_nop)),
        Command::new("exit", CommandType::EXIT, Box::new(handle_exit)),
        Command::new("push", CommandType::PUSH, Box::new(handle_push)),
        Command::new("pop", CommandType::POP, Box::new(handle_pop)),
        Command::new("goto", CommandType::GOTO, Box::new(handle_goto)),
        Command::new("set", CommandType::SET, Box::new(handle_set)),
        Command::new("call", CommandType::CALL, Box::new(handle_call)),
        Command::new("ret", CommandType::RET, Box::new(handle_ret)),
        Command::new("jumpIf", CommandType::JUMP_IF, Box::new(handle_jump_if)),
    ]
}

fn handle_nop(_frame: &mut Frame<'_>, _args: &[ExpressionNode]) -> Control {
    Control::next()
}

fn handle_exit(frame: &mut Frame<'_>, _args: &[ExpressionNode]) -> Control {
    Control::jump(frame.end_of_script())
}

const PUSH_ARGS: &[ArgSpec] = &[ArgSpec::int("value")];

fn handle_push(frame: &mut Frame<'_>, args: &[ExpressionNode]) -> Control {
    with_args(frame, args, PUSH_ARGS, |frame, args| {
        frame.push_operand(args.int(0));
        Control::next()
    })
}

const POP_ARGS: &[ArgSpec] = &[ArgSpec::ident("variable")];

fn handle_pop(frame: &mut Frame<'_>, args: &[ExpressionNode]) -> Control {
    with_args(frame, args, POP_ARGS, |frame, args| {
        if let Some(value) = frame.pop_operand() {
            frame.set_value(args.ident(0), value);
        }
        Control::next()
    })
}

const GOTO_ARGS: &[ArgSpec] = &[ArgSpec::int("target")];

fn handle_goto(frame: &mut Frame<'_>, args: &[ExpressionNode]) -> Control {
    with_args(frame, args, GOTO_ARGS, |_frame, args| {
        Control::jump(args.int(0))
    })
}

const SET_ARGS: &[ArgSpec] = &[ArgSpec::ident("variable"), ArgSpec::int("value")];

fn handle_set(frame: &mut Frame<'_>, args: &[ExpressionNode]) -> Control {
    with_args(frame, args, SET_ARGS, |frame, args| {
        frame.set_value(args.ident(0), args.int(1));
        Control::next()
    })
}

const CALL_ARGS: &[ArgSpec] = &[ArgSpec::int("target")];

fn handle_call(frame: &mut Frame<'_>, args: &[ExpressionNode]) -> Control {
    with_args(frame, args, CALL_ARGS, |frame, args| {
        let target = args.int(0);

        // Address 0 can never be a call target; it doubles as "exit".
        if target == 0 {
            return Control::jump(frame.end_of_script());
        }

        frame.push_call(frame.pc + 1);
        Control::jump(target)
    })
}

fn handle_ret(frame: &mut Frame<'_>, _args: &[ExpressionNode]) -> Control {
    match frame.pop_call() {
        Some(pc) => Control::jump(pc),
        None => Control::jump(frame.end_of_script()),
    }
}

const JUMP_IF_ARGS: &[ArgSpec] = &[ArgSpec::int("condition"), ArgSpec::int("target")];

fn handle_jump_if(frame: &mut Frame<'_>, args: &[ExpressionNode]) -> Control {
    with_args(frame, args, JUMP_IF_ARGS, |_frame, args| {
        if args.int(0) != 0 {
            Control::jump(args.int(1))
        } else {
            Control::next()
        }
    })
}
