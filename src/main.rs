use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::scanner;
use rox::token::Token;
use rox::{Lox, LoxError};

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to rox.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the token stream as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a program from a file and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Reads and runs one line at a time (the default)
    Repl,
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

/// Reads a source file as UTF‑8 text, exiting with a data error otherwise.
fn read_source(filename: &PathBuf) -> Result<String> {
    let buf = read_file(filename)?;

    match String::from_utf8(buf) {
        Ok(text) => Ok(text),
        Err(e) => fail(&LoxError::Utf8(e.utf8_error())),
    }
}

fn init_logger() -> Result<()> {
    let log_file = File::create("rox.log").context("Failed to create rox.log")?;

    // Default to Debug unless RUST_LOG says otherwise.
    let mut builder = Builder::new();
    builder.filter_level(log::LevelFilter::Debug);
    builder.parse_default_env();

    builder
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    info!("Logger initialized, writing to rox.log");
    Ok(())
}

/// Report `error` and terminate with its exit status.
fn fail<T>(error: &LoxError) -> T {
    debug!("Exiting after error: {}", error);
    eprintln!("{}", error);
    std::process::exit(error.exit_code());
}

fn tokenize(filename: &PathBuf, json: bool) -> Result<()> {
    let source = read_source(filename)?;

    // The first lexical error ends the run, as it does for every other phase.
    let tokens: Vec<Token<'_>> = match scanner::scan_all(&source) {
        Ok(tokens) => tokens,
        Err(e) => fail(&e),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &PathBuf) -> Result<()> {
    let source = read_source(filename)?;

    let statements = match rox::lox::compile(&source) {
        Ok(statements) => statements,
        Err(e) => fail(&e),
    };

    for stmt in &statements {
        println!("{}", AstPrinter::print_stmt(stmt));
    }

    info!("Parse subcommand completed");
    Ok(())
}

fn evaluate(filename: &PathBuf) -> Result<()> {
    let source = read_source(filename)?;

    let tokens = match scanner::scan_all(&source) {
        Ok(tokens) => tokens,
        Err(e) => fail(&e),
    };

    let expr = match Parser::new(&tokens).parse_expression() {
        Ok(expr) => expr,
        Err(e) => fail(&e),
    };

    let mut interpreter = Interpreter::new();

    match interpreter.evaluate(&expr) {
        Ok(value) => println!("{}", value),
        Err(e) => fail(&e),
    }

    info!("Evaluate subcommand completed");
    Ok(())
}

fn run(filename: &PathBuf) -> Result<()> {
    let source = read_file(filename)?;
    let mut lox = Lox::new();

    if let Err(e) = lox.run_bytes(&source) {
        fail::<()>(&e);
    }

    info!("Program executed successfully");
    Ok(())
}

fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }

        // Errors end the line, not the session.
        if let Err(e) = lox.run(&line) {
            eprintln!("{}", e);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Some(Commands::Tokenize { filename, json }) => tokenize(&filename, json),
        Some(Commands::Parse { filename }) => parse(&filename),
        Some(Commands::Evaluate { filename }) => evaluate(&filename),
        Some(Commands::Run { filename }) => run(&filename),
        Some(Commands::Repl) | None => repl(),
    }
}
