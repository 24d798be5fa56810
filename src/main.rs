//! # Stratalog REPL
//!
//! Interactive shell for the Datalog interpreter.
//!
//! ## Usage
//!
//! ```bash
//! # Start the shell
//! cargo run --bin stratalog
//!
//! # Consult files, then drop into the shell
//! cargo run --bin stratalog -- family.dl queries.dl
//!
//! # One-shot evaluation
//! cargo run --bin stratalog -- -e "p(a). p(X)?"
//! ```
//!
//! Statements end with `.` (insert), `?` (query) or `~` (delete); input
//! accumulates across lines until a terminator is seen. `%` starts a
//! comment.

use anyhow::Context as _;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::fs;
use std::path::PathBuf;
use stratalog::{format_answers, Config, Interpreter};

#[derive(Debug, Parser)]
#[command(name = "stratalog", about = "A Datalog interpreter with stratified negation")]
struct Args {
    /// Datalog files to consult before starting
    files: Vec<PathBuf>,

    /// Evaluate a program and exit
    #[arg(short, long, value_name = "PROGRAM")]
    eval: Option<String>,

    /// Configuration file (default: stratalog.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<String>,
}

fn init_tracing(config: &Config) {
    // STRATALOG_LOG overrides the configured level.
    let level = env::var("STRATALOG_LOG")
        .ok()
        .unwrap_or_else(|| config.logging.level.clone());
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => Config::load().context("failed to load configuration")?,
    };
    init_tracing(&config);

    let mut interpreter = Interpreter::new();

    for file in &args.files {
        let source = fs::read_to_string(file)
            .with_context(|| format!("cannot read {}", file.display()))?;
        interpreter
            .execute_with(&source, |statement, answers| {
                println!("{statement}");
                println!("{}", format_answers(answers));
            })
            .with_context(|| format!("error in {}", file.display()))?;
    }

    if let Some(program) = &args.eval {
        interpreter.execute_with(program, |statement, answers| {
            println!("{statement}");
            println!("{}", format_answers(answers));
        })?;
        return Ok(());
    }

    run_repl(&mut interpreter, &config)
}

fn run_repl(interpreter: &mut Interpreter, config: &Config) -> anyhow::Result<()> {
    println!("Stratalog {}", env!("CARGO_PKG_VERSION"));
    println!("End statements with '.', query with '?', delete with '~'. Ctrl-D exits.\n");

    let mut editor = DefaultEditor::new()?;
    let history = &config.repl.history_file;
    if !history.is_empty() {
        let _ = editor.load_history(history);
    }

    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() {
            config.repl.prompt.clone()
        } else {
            "| ".to_string()
        };

        match editor.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);
                pending.push_str(&line);
                pending.push('\n');

                if !ends_statement(&pending) {
                    continue;
                }

                let source = std::mem::take(&mut pending);
                let result = interpreter.execute_with(&source, |statement, answers| {
                    println!("{statement}");
                    println!("{}", format_answers(answers));
                });
                if let Err(e) = result {
                    eprintln!("Error: {e}");
                }
            }
            Err(ReadlineError::Interrupted) => {
                pending.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    if !history.is_empty() {
        let _ = editor.save_history(history);
    }
    Ok(())
}

/// True when the buffered input ends with a statement terminator, outside
/// comments and string literals.
fn ends_statement(input: &str) -> bool {
    let mut last_significant = None;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '%' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '"' => {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
                last_significant = Some('"');
            }
            c if c.is_whitespace() => {}
            c => last_significant = Some(c),
        }
    }
    matches!(last_significant, Some('.' | '?' | '~'))
}
