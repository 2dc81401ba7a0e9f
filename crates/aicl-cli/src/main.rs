//! AICL command-line interface.
//!
//! Lex, parse, check or run an AICL workflow script. Runs use the built-in
//! simulated agent fleet; embedders wanting real transports should drive
//! `aicl-interpreter` as a library instead.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use ariadne::{Color, Label, Report, ReportKind, Source};
use aicl_parser::{parse, ParseError};
use aicl_runtime::Logger;
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "aicl")]
#[command(version)]
#[command(about = "Interpreter for the AICL agent workflow language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lex a script and display its tokens
    Lex {
        /// Script to lex
        file: PathBuf,
    },
    /// Parse a script and display the program structure
    Parse {
        /// Script to parse
        file: PathBuf,
        /// Show the full AST
        #[arg(short, long)]
        verbose: bool,
    },
    /// Check a script for parse errors without running it
    Check {
        /// Script to check
        file: PathBuf,
    },
    /// Run a script against the simulated agent fleet
    Run {
        /// Script to run
        file: PathBuf,
        /// Suppress the execution log, print only the outcome
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Lex { file } => lex_file(&file),
        Commands::Parse { file, verbose } => parse_file(&file, verbose),
        Commands::Check { file } => check_file(&file),
        Commands::Run { file, quiet } => run_file(&file, quiet),
    }
}

fn read_source(path: &PathBuf) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("error reading '{}': {}", path.display(), e);
        ExitCode::FAILURE
    })
}

fn lex_file(path: &PathBuf) -> ExitCode {
    let source = match read_source(path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let (tokens, lex_errors) = aicl_lexer::Lexer::new(&source).tokenize();
    println!("Tokens ({}):", tokens.len());
    for token in &tokens {
        println!("  {:?} @ {:?}", token.kind, token.span);
    }

    if lex_errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        println!("\nLexer errors ({}):", lex_errors.len());
        for error in &lex_errors {
            println!("  {error}");
        }
        ExitCode::FAILURE
    }
}

fn parse_file(path: &PathBuf, verbose: bool) -> ExitCode {
    let source = match read_source(path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let filename = path.display().to_string();
    let (program, errors) = parse(&source);
    for error in &errors {
        report_parse_error(&filename, &source, error);
    }

    if verbose {
        println!("{program:#?}");
    } else {
        println!(
            "{} global(s), {} agent grant(s), {} top-level statement(s)",
            program.globals.len(),
            program.permissions.len(),
            program.body.len()
        );
        for decl in program.globals.values() {
            println!(
                "  DATA {} : {} = {:?}",
                decl.name,
                decl.ty,
                decl.initial.as_deref().unwrap_or("")
            );
        }
        for grant in program.permissions.values() {
            println!("  PERM {} on {} variable(s)", grant.agent, grant.grants.len());
        }
    }

    if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn check_file(path: &PathBuf) -> ExitCode {
    let source = match read_source(path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let filename = path.display().to_string();
    let (_, errors) = parse(&source);
    for error in &errors {
        report_parse_error(&filename, &source, error);
    }

    if errors.is_empty() {
        println!("check passed: {}", path.display());
        ExitCode::SUCCESS
    } else {
        eprintln!("\ncheck failed with {} error(s)", errors.len());
        ExitCode::FAILURE
    }
}

fn run_file(path: &PathBuf, quiet: bool) -> ExitCode {
    let source = match read_source(path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let filename = path.display().to_string();
    let (program, errors) = parse(&source);
    if !errors.is_empty() {
        for error in &errors {
            report_parse_error(&filename, &source, error);
        }
        return ExitCode::FAILURE;
    }

    let logger = Arc::new(Logger::new());
    let interpreter = aicl_interpreter::Interpreter::new();
    let outcome = interpreter.run(&program, Arc::clone(&logger));

    if !quiet {
        logger.print_all();
    }

    println!("\nfinal globals: {}", Value::Object(outcome.store.snapshot()));

    if outcome.success() {
        println!("execution succeeded");
        ExitCode::SUCCESS
    } else {
        eprintln!("execution failed with {} error(s):", outcome.errors.len());
        for error in &outcome.errors {
            eprintln!("  {error}");
        }
        ExitCode::FAILURE
    }
}

/// Report a parse error as an ariadne span diagnostic.
fn report_parse_error(filename: &str, source: &str, error: &ParseError) {
    let span_range = match error.span() {
        Some(span) => span.start..span.end.max(span.start + 1),
        None => source.len().saturating_sub(1)..source.len(),
    };

    Report::build(ReportKind::Error, filename, span_range.start)
        .with_message("parse error")
        .with_label(
            Label::new((filename, span_range))
                .with_message(error.to_string())
                .with_color(Color::Red),
        )
        .finish()
        .print((filename, Source::from(source)))
        .ok();
}
