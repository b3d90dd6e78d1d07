use rustc_hash::FxHashMap;

use crate::ast::{CommandType, ExpressionNode, Identifier, VARIABLE_OFFSET};
use crate::error::{Error, ErrorKind};
use crate::eval::Value;
use crate::script::Script;
use crate::{load_script, CommandTypeTable, IdentifierTable, ParserConfig};

const CMD_ACCURACY_CHECK: CommandType = CommandType(CommandType::USER_COMMAND_OFFSET.0);
const CMD_HP_UPDATE: CommandType = CommandType(CommandType::USER_COMMAND_OFFSET.0 + 1);
const CMD_RECOIL: CommandType = CommandType(CommandType::USER_COMMAND_OFFSET.0 + 2);
const CMD_PRINT: CommandType = CommandType(CommandType::USER_COMMAND_OFFSET.0 + 3);

const IDENT_ATTACKER: Identifier = Identifier(0);
const IDENT_RECOIL_TYPE_MISS: Identifier = Identifier(1);

fn command_table() -> Vec<(&'static str, CommandType)> {
    vec![
        ("nop", CommandType::NOP),
        ("goto", CommandType::GOTO),
        ("set", CommandType::SET),
        ("accuracyCheck", CMD_ACCURACY_CHECK),
        ("hpUpdate", CMD_HP_UPDATE),
        ("recoil", CMD_RECOIL),
        ("print", CMD_PRINT),
    ]
}

fn test_config() -> ParserConfig {
    let mut commands = CommandTypeTable::default();
    for (name, ty) in command_table() {
        commands.insert(name.to_string(), ty);
    }

    let mut identifiers = IdentifierTable::default();
    identifiers.insert("attacker".to_string(), IDENT_ATTACKER);
    identifiers.insert("recoilTypeMiss".to_string(), IDENT_RECOIL_TYPE_MISS);
    identifiers.insert("A".to_string(), Identifier(2));

    ParserConfig {
        commands,
        identifiers,
        ..Default::default()
    }
}

fn command_names() -> FxHashMap<CommandType, String> {
    command_table()
        .into_iter()
        .map(|(name, ty)| (ty, name.to_string()))
        .collect()
}

fn parse(source: &str) -> Script {
    load_script(source, "test.sqn", &test_config()).expect("parse")
}

fn parse_err(source: &str) -> Error {
    load_script(source, "test.sqn", &test_config()).expect_err("expected parse failure")
}

fn listing(source: &str) -> String {
    parse(source).listing(&command_names())
}

fn eval_static(script: &Script, node: &ExpressionNode) -> Value {
    script
        .eval(node, &mut |id| {
            Err(ErrorKind::UnresolvedSymbol(id.to_string()))
        })
        .expect("eval")
}

#[test]
fn parses_defines() {
    let script = parse(
        "def msgHello \"Hello World!\"\n\
         def wordCount 2\n\
         def pi 3.14159\n",
    );

    assert!(script.commands().is_empty());
    assert!(matches!(
        script.define("msgHello"),
        Some(ExpressionNode::Str { value, .. }) if value == "Hello World!"
    ));
    assert!(matches!(
        script.define("wordCount"),
        Some(ExpressionNode::Integer { value: 2, .. })
    ));
    assert!(matches!(
        script.define("pi"),
        Some(ExpressionNode::Float { value, .. }) if (*value - 3.14159).abs() < 1e-12
    ));
}

#[test]
fn parses_bare_command() {
    let script = parse("nop\n");
    assert_eq!(script.commands().len(), 1);
    assert_eq!(script.commands()[0].ty, CommandType::NOP);
    assert!(script.commands()[0].args.is_empty());
}

#[test]
fn parses_command_arguments() {
    let script = parse("accuracyCheck -42.0 attacker \"hello world\" 33\n");
    let cmd = &script.commands()[0];
    assert_eq!(cmd.ty, CMD_ACCURACY_CHECK);
    assert_eq!(cmd.args.len(), 4);
    assert!(matches!(
        &cmd.args[0],
        ExpressionNode::Unary { op: crate::TokenKind::Sub, .. }
    ));
    assert!(matches!(
        &cmd.args[1],
        ExpressionNode::Identifier { id, .. } if *id == IDENT_ATTACKER
    ));
    assert!(matches!(
        &cmd.args[2],
        ExpressionNode::Str { value, .. } if value == "hello world"
    ));
    assert!(matches!(&cmd.args[3], ExpressionNode::Integer { value: 33, .. }));
}

#[test]
fn commas_between_arguments_are_optional() {
    let script = parse("accuracyCheck \"hello\", -42.0, \"world\"\n");
    assert_eq!(script.commands()[0].args.len(), 3);
}

#[test]
fn expression_precedence() {
    assert_eq!(
        listing("accuracyCheck 2 + 4 * 8\n"),
        "accuracyCheck (2 + (4 * 8))\n"
    );
    assert_eq!(
        listing("accuracyCheck (2 + 4) * 8\n"),
        "accuracyCheck ((2 + 4) * 8)\n"
    );
    assert_eq!(
        listing("accuracyCheck 2 * 4 + 8\n"),
        "accuracyCheck ((2 * 4) + 8)\n"
    );
    assert_eq!(
        listing("accuracyCheck 2 * -4 + 8\n"),
        "accuracyCheck ((2 * -4) + 8)\n"
    );
    assert_eq!(
        listing("accuracyCheck 1 << 2 == 4\n"),
        "accuracyCheck ((1 << 2) == 4)\n"
    );
    assert_eq!(
        listing("accuracyCheck 1 < 2 != 3 > 4\n"),
        "accuracyCheck ((1 < 2) != (3 > 4))\n"
    );
}

#[test]
fn tight_formatting_parses_like_spaced() {
    assert_eq!(listing("accuracyCheck 2*-4+8\n"), listing("accuracyCheck 2 * -4 + 8\n"));
    assert_eq!(listing("accuracyCheck (2+ 4)-42\n"), listing("accuracyCheck (2 + 4) - 42\n"));
}

#[test]
fn first_parse_scenario_evaluates_to_34() {
    let script = parse("accuracyCheck 2 + 4 * 8\n");
    assert_eq!(script.commands().len(), 1);
    let arg = &script.commands()[0].args[0];
    assert_eq!(eval_static(&script, arg), Value::Int(34));
}

#[test]
fn labels_are_backpatched() {
    let script = parse("goto end\nnop\nend: nop\n");

    assert_eq!(script.commands().len(), 3);
    assert_eq!(script.label("end"), Some(2));
    assert!(matches!(
        &script.commands()[0].args[0],
        ExpressionNode::Address { pc: 2, .. }
    ));
}

#[test]
fn multiple_labels_can_share_a_pc() {
    let script = parse(
        "effectHit:\n\
         \taccuracyCheck\n\
         \thpUpdate\n\
         second:\n\
         recoilMiss:\n\
         \trecoil recoilTypeMiss\n\
         end:\n\
         \tnop\n",
    );

    assert_eq!(script.label("effectHit"), Some(0));
    assert_eq!(script.label("second"), Some(2));
    assert_eq!(script.label("recoilMiss"), Some(2));
    assert_eq!(script.label("end"), Some(3));
}

#[test]
fn every_address_is_in_range_after_parse() {
    let script = parse(
        "goto end\n\
         loop:\n\
         \taccuracyCheck loop\n\
         \tgoto loop\n\
         end: nop\n",
    );

    fn check(node: &ExpressionNode, len: usize) {
        match node {
            ExpressionNode::Address { pc, .. } => {
                assert!(*pc >= 0 && (*pc as usize) < len, "address {pc} out of range");
            }
            ExpressionNode::Label { name, .. } => panic!("unresolved label '{name}'"),
            ExpressionNode::Binary { left, right, .. } => {
                check(left, len);
                check(right, len);
            }
            ExpressionNode::Unary { expr, .. } => check(expr, len),
            ExpressionNode::ArrayAccess { index, .. } => check(index, len),
            _ => {}
        }
    }

    let len = script.commands().len();
    for cmd in script.commands() {
        for arg in &cmd.args {
            check(arg, len);
        }
    }
}

#[test]
fn forward_label_inside_expression() {
    let script = parse("accuracyCheck end + 1\nend: nop\n");

    let arg = &script.commands()[0].args[0];
    assert!(matches!(
        arg,
        ExpressionNode::Binary { left, op: crate::TokenKind::Add, right, .. }
            if matches!(left.as_ref(), ExpressionNode::Address { pc: 1, .. })
            && matches!(right.as_ref(), ExpressionNode::Integer { value: 1, .. })
    ));
    assert_eq!(eval_static(&script, arg), Value::Int(2));
}

#[test]
fn unknown_label_is_reported_at_first_reference() {
    let err = parse_err("nop\ngoto nowhere\n");
    assert!(matches!(err.cause(), ErrorKind::UnknownLabel(name) if name == "nowhere"));
    assert_eq!(err.at().line, 2);
    assert_eq!(err.at().column, 6);
}

#[test]
fn unknown_command_aborts_the_parse() {
    let err = parse_err("frobnicate 1 2\n");
    assert!(matches!(err.cause(), ErrorKind::UnknownCommand(name) if name == "frobnicate"));
}

#[test]
fn declares_variables_with_contiguous_offsets() {
    let script = parse("var hp\nvar mana\n");

    assert_eq!(script.variable("hp"), Some(Identifier(VARIABLE_OFFSET)));
    assert_eq!(script.variable("mana"), Some(Identifier(VARIABLE_OFFSET + 1)));

    for (i, (_, id)) in script.variables().iter().enumerate() {
        assert_eq!(id.0, VARIABLE_OFFSET + i as i64);
    }
}

#[test]
fn array_declaration_reserves_named_slots() {
    let script = parse("var a[4]\nvar b\n");

    assert_eq!(script.variable("a"), Some(Identifier(VARIABLE_OFFSET)));
    assert_eq!(script.variable("__a_1"), Some(Identifier(VARIABLE_OFFSET + 1)));
    assert_eq!(script.variable("__a_2"), Some(Identifier(VARIABLE_OFFSET + 2)));
    assert_eq!(script.variable("__a_3"), Some(Identifier(VARIABLE_OFFSET + 3)));
    assert_eq!(script.variable("b"), Some(Identifier(VARIABLE_OFFSET + 4)));
}

#[test]
fn array_size_may_be_a_constant_expression() {
    let script = parse("var a[2 + 2]\n");
    assert_eq!(script.variables().len(), 4);
}

#[test]
fn array_size_must_be_static() {
    let err = parse_err("var n\nvar a[n]\n");
    assert!(matches!(err, Error::Parse { .. }));
    assert!(matches!(err.cause(), ErrorKind::UnresolvedSymbol(_)));
}

#[test]
fn array_access_parses_against_the_declared_variable() {
    let script = parse("var a[4]\nset a[2] 42\n");

    let cmd = &script.commands()[0];
    assert_eq!(cmd.ty, CommandType::SET);
    assert!(matches!(
        &cmd.args[0],
        ExpressionNode::ArrayAccess { variable, index, .. }
            if *variable == Identifier(VARIABLE_OFFSET)
            && matches!(index.as_ref(), ExpressionNode::Integer { value: 2, .. })
    ));
}

#[test]
fn define_substitutes_its_expression_tree() {
    let script = parse(
        "def mask 0xFF\n\
         accuracyCheck mask & 0b1010\n\
         accuracyCheck mask\n",
    );

    let masked = &script.commands()[0].args[0];
    assert_eq!(eval_static(&script, masked), Value::Int(10));
    assert!(matches!(
        &script.commands()[1].args[0],
        ExpressionNode::Integer { value: 255, .. }
    ));
}

#[test]
fn numeric_bases_are_decided_by_prefix() {
    let script = parse("accuracyCheck 0x10 0o20 0b10000 16\n");
    for arg in &script.commands()[0].args {
        assert!(matches!(arg, ExpressionNode::Integer { value: 16, .. }));
    }
}

#[test]
fn number_token_with_dot_parses_as_float() {
    let script = parse("accuracyCheck 42.0\n");
    assert!(matches!(
        &script.commands()[0].args[0],
        ExpressionNode::Float { value, .. } if *value == 42.0
    ));
}

#[test]
fn macro_expansion_materializes_commands() {
    let script = parse(
        "macro burst\n\
         \taccuracyCheck\n\
         \thpUpdate\n\
         endmacro\n\
         burst\n\
         burst\n",
    );

    assert_eq!(script.commands().len(), 4);
    assert_eq!(script.commands()[0].ty, CMD_ACCURACY_CHECK);
    assert_eq!(script.commands()[1].ty, CMD_HP_UPDATE);
    assert_eq!(script.commands()[2].ty, CMD_ACCURACY_CHECK);
    assert_eq!(script.commands()[3].ty, CMD_HP_UPDATE);
}

#[test]
fn macro_expansion_equals_textual_substitution() {
    let expanded = parse(
        "macro pair $x\n\
         \taccuracyCheck $x\n\
         \thpUpdate $x, $x\n\
         endmacro\n\
         pair 1 + 2\n",
    );
    let substituted = parse(
        "accuracyCheck 1 + 2\n\
         hpUpdate 1 + 2, 1 + 2\n",
    );

    let expanded_cmds = expanded.commands();
    let substituted_cmds = substituted.commands();
    assert_eq!(expanded_cmds.len(), substituted_cmds.len());
    for (a, b) in expanded_cmds.iter().zip(substituted_cmds) {
        assert_eq!(a.ty, b.ty);
        assert_eq!(a.args.len(), b.args.len());
        for (x, y) in a.args.iter().zip(&b.args) {
            assert_eq!(eval_static(&expanded, x), eval_static(&substituted, y));
        }
    }
}

#[test]
fn macros_may_invoke_other_macros() {
    let script = parse(
        "macro one\n\
         \taccuracyCheck\n\
         endmacro\n\
         macro two\n\
         \tone\n\
         \thpUpdate\n\
         endmacro\n\
         two\n",
    );

    assert_eq!(script.commands().len(), 2);
    assert_eq!(script.commands()[0].ty, CMD_ACCURACY_CHECK);
    assert_eq!(script.commands()[1].ty, CMD_HP_UPDATE);
}

#[test]
fn macro_local_labels_get_fresh_namespaces() {
    let script = parse(
        "macro loopN $n\n\
         %start:\n\
         \taccuracyCheck A\n\
         \taccuracyCheck %start\n\
         endmacro\n\
         loopN 3\n\
         loopN 5\n",
    );

    assert_eq!(script.commands().len(), 4);
    assert_eq!(script.label("loopN_0start"), Some(0));
    assert_eq!(script.label("loopN_1start"), Some(2));
    assert!(matches!(
        &script.commands()[1].args[0],
        ExpressionNode::Address { pc: 0, .. }
    ));
    assert!(matches!(
        &script.commands()[3].args[0],
        ExpressionNode::Address { pc: 2, .. }
    ));
}

#[test]
fn local_labels_live_under_the_enclosing_global_label() {
    let script = parse(
        "start:\n\
         %loop:\n\
         \tgoto %loop\n",
    );

    assert_eq!(script.label("startloop"), Some(0));
    assert!(matches!(
        &script.commands()[0].args[0],
        ExpressionNode::Address { pc: 0, .. }
    ));
}

#[test]
fn unknown_macro_argument_is_rejected() {
    let err = parse_err(
        "macro bad $x\n\
         \taccuracyCheck $y\n\
         endmacro\n\
         bad 1\n",
    );
    assert!(matches!(err.cause(), ErrorKind::UnknownMacroArgument(name) if name == "y"));
}

#[test]
fn missing_macro_argument_is_rejected() {
    let err = parse_err(
        "macro bad $x\n\
         \taccuracyCheck $x\n\
         endmacro\n\
         bad\n",
    );
    assert!(matches!(err.cause(), ErrorKind::MissingMacroArgument(name) if name == "x"));
}

#[test]
fn listing_round_trips_command_types() {
    let source = "var a[2]\n\
                  def limit 10\n\
                  start:\n\
                  \tset a limit\n\
                  \tset a[1] 4\n\
                  \taccuracyCheck start + 1, \"msg\"\n\
                  \tgoto start\n";

    let script = parse(source);
    let names = command_names();
    let reparsed = parse(&script.listing(&names));

    assert_eq!(script.commands().len(), reparsed.commands().len());
    for (a, b) in script.commands().iter().zip(reparsed.commands()) {
        assert_eq!(a.ty, b.ty);
    }
    assert_eq!(script.variables().len(), reparsed.variables().len());
}

#[test]
fn final_pc_matches_command_count() {
    let script = parse("nop\nnop\naccuracyCheck 1\n");
    assert_eq!(script.pc(), script.commands().len());
    assert_eq!(script.commands().len(), 3);
}

mod preprocessor {
    use std::sync::Arc;

    use super::*;
    use crate::fs::MemFS;

    fn config_with_fs(fs: MemFS) -> ParserConfig {
        let mut config = test_config();
        config.fs = Some(Arc::new(fs));
        config
    }

    #[test]
    fn include_splices_the_file_in_place() {
        let fs = MemFS::new().with("lib/util.sqn", "nop\nnop\n");
        let config = config_with_fs(fs);

        let script =
            load_script("@include lib/util.sqn\naccuracyCheck\n", "main.sqn", &config)
                .expect("parse");

        assert_eq!(script.commands().len(), 3);
        assert_eq!(script.commands()[0].ty, CommandType::NOP);
        assert_eq!(script.commands()[2].ty, CMD_ACCURACY_CHECK);
    }

    #[test]
    fn include_paths_resolve_relative_to_the_including_file() {
        let fs = MemFS::new()
            .with("lib/outer.sqn", "@include inner.sqn\nhpUpdate\n")
            .with("lib/inner.sqn", "nop\n");
        let config = config_with_fs(fs);

        let script =
            load_script("@include lib/outer.sqn\n", "main.sqn", &config).expect("parse");

        assert_eq!(script.commands().len(), 2);
        assert_eq!(script.commands()[0].ty, CommandType::NOP);
        assert_eq!(script.commands()[1].ty, CMD_HP_UPDATE);
    }

    #[test]
    fn including_the_same_file_twice_is_a_no_op() {
        let fs = MemFS::new().with("util.sqn", "nop\n");
        let config = config_with_fs(fs);

        let once = load_script("@include util.sqn\n", "main.sqn", &config).expect("parse");
        let twice = load_script(
            "@include util.sqn\n@include util.sqn\n",
            "main.sqn",
            &config,
        )
        .expect("parse");

        assert_eq!(once.commands().len(), twice.commands().len());
    }

    #[test]
    fn missing_include_file_fails_the_parse() {
        let config = config_with_fs(MemFS::new());
        let err = load_script("@include nope.sqn\n", "main.sqn", &config)
            .expect_err("expected missing include to fail");
        assert!(matches!(err.cause(), ErrorKind::Io { .. }));
    }

    #[test]
    fn def_directive_splices_a_define_through_the_lookup() {
        let mut config = test_config();
        config.lookup = Some(Box::new(|name: &str| {
            Ok(format!("{name} \"hello world!\"").into_bytes())
        }));

        let script = load_script("@def greeting\naccuracyCheck greeting\n", "main.sqn", &config)
            .expect("parse");

        assert!(matches!(
            &script.commands()[0].args[0],
            ExpressionNode::Str { value, .. } if value == "hello world!"
        ));
    }

    #[test]
    fn def_directive_without_lookup_fn_fails() {
        let err = parse_err("@def greeting\n");
        assert!(matches!(
            err.cause(),
            ErrorKind::MissingLookupFn(name) if name == "greeting"
        ));
    }

    #[test]
    fn unknown_directive_fails() {
        let err = parse_err("@pragma once\n");
        assert!(matches!(
            err.cause(),
            ErrorKind::UnknownPreprocessorDirective(name) if name == "pragma"
        ));
    }

    #[test]
    fn directive_without_required_argument_fails() {
        let err = {
            let config = config_with_fs(MemFS::new());
            load_script("@include\n", "main.sqn", &config).expect_err("expected failure")
        };
        assert!(matches!(
            err.cause(),
            ErrorKind::InvalidPreprocessorValue { directive, .. } if directive == "include"
        ));
    }
}
