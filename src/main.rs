//! cinder CLI
//!
//! Main entry point for the `cinder` command.

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "cinder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A small C-like scripting language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program
    Run {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Parse and type-check a program without running it
    Check {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show the checked AST as JSON
        #[arg(long)]
        show_ast: bool,
    },

    /// Show information about the interpreter
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Run { input } => run(&input),
        Commands::Check { input, show_ast } => check(&input, show_ast),
        Commands::Info => info(),
    }
}

fn read_source(input: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(input)
        .map_err(|e| miette::miette!("Failed to read {}: {}", input.display(), e))
}

fn run(input: &std::path::Path) -> Result<()> {
    let source = read_source(input)?;
    let name = input.display().to_string();

    let value = cinder::interpret(&name, &source)?;
    match value {
        cinder::Value::Void => {}
        other => println!("{other}"),
    }
    Ok(())
}

fn check(input: &std::path::Path, show_ast: bool) -> Result<()> {
    let source = read_source(input)?;
    let name = input.display().to_string();

    let program = cinder::parse(&name, &source)?;

    if show_ast {
        let json = serde_json::to_string_pretty(&program)
            .map_err(|e| miette::miette!("Failed to serialize AST: {}", e))?;
        println!("{json}");
        return Ok(());
    }

    let user_functions = program
        .functions
        .len()
        .saturating_sub(cinder::NativeRegistry::with_builtins().bindings().len());
    println!(
        "Checked {} ({} functions, {} bodies)",
        input.display(),
        user_functions,
        program.bodies.len()
    );
    Ok(())
}

fn info() -> Result<()> {
    println!("cinder {}", cinder::VERSION);
    println!();
    println!("Pipeline: source -> lexer -> checking parser -> tree-walking evaluator");
    println!("Types: void, int, float, char, pointers and arrays over them");
    println!("Natives:");
    for binding in cinder::NativeRegistry::with_builtins().bindings() {
        let params: Vec<String> = binding.params.iter().map(|p| p.to_string()).collect();
        println!("  {} {}({})", binding.ret, binding.name, params.join(", "));
    }
    Ok(())
}
