use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use sequin_lang::{diag, load_script, CommandType, Error, Identifier, Script, StdScriptFS};
use sequin_vm::{Command, Control, Environment, Runtime, RuntimeConfig};

#[derive(Debug, Parser)]
#[command(
    name = "sequin",
    version,
    about = "Scripting toolchain for branching command sequences",
    after_help = "Examples:\n  sequin check battle.sqn\n  sequin run battle.sqn --entry main"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a script and print its program listing.
    Check {
        /// Input script file.
        input: PathBuf,
    },
    /// Execute a script under the demo host.
    Run {
        /// Input script file.
        input: PathBuf,

        /// Label to start from instead of the first command.
        #[arg(long, value_name = "LABEL")]
        entry: Option<String>,
    },
}

const CMD_PRINT: CommandType = CommandType(CommandType::USER_COMMAND_OFFSET.0);

/// The demo host: a `print` command and an identifier store backed by a map.
fn demo_config() -> RuntimeConfig {
    RuntimeConfig {
        user_commands: vec![Command::new(
            "print",
            CMD_PRINT,
            Box::new(|frame, args| {
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    match frame.eval(arg) {
                        Ok(value) => parts.push(value.to_string()),
                        Err(error) => frame.handle_error(error),
                    }
                }
                println!("{}", parts.join(" "));
                Control::next()
            }),
        )],
        ..Default::default()
    }
}

#[derive(Default)]
struct DemoEnv {
    values: HashMap<Identifier, i64>,
}

impl Environment for DemoEnv {
    fn get(&mut self, id: Identifier) -> i64 {
        self.values.get(&id).copied().unwrap_or(0)
    }

    fn set(&mut self, id: Identifier, value: i64) {
        self.values.insert(id, value);
    }

    fn handle_error(&mut self, error: Error) {
        eprintln!("{error}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { input } => check(&input),
        Commands::Run { input, entry } => run(&input, entry.as_deref()),
    }
}

fn compile(input: &Path, config: &RuntimeConfig) -> Result<Script> {
    let name = input.display().to_string();
    let bytes = fs::read(input).with_context(|| format!("failed to read {name}"))?;
    let text = String::from_utf8_lossy(&bytes).into_owned();

    let parser_config = config.parser_config(Some(Arc::new(StdScriptFS)), None);

    match load_script(bytes, &name, &parser_config) {
        Ok(script) => Ok(script),
        Err(error) => {
            eprintln!("{}", diag::render_error(&name, &text, &error));
            bail!("failed to compile {name}")
        }
    }
}

fn check(input: &Path) -> Result<()> {
    let config = demo_config();
    let script = compile(input, &config)?;

    print!("{}", script.listing(&config.command_names()));

    Ok(())
}

fn run(input: &Path, entry: Option<&str>) -> Result<()> {
    let config = demo_config();
    let script = compile(input, &config)?;

    let mut runtime = Runtime::with_config(Arc::new(script), config);
    let mut env = DemoEnv::default();

    match entry {
        Some(label) => {
            if !runtime.call(label, &mut env) {
                bail!("no such label: '{label}'");
            }
        }
        None => runtime.start(0, &mut env),
    }

    Ok(())
}
