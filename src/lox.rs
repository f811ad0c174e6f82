//! The whole pipeline behind one call: scan → parse → resolve → execute.
//!
//! A [`Lox`] session keeps one interpreter alive across batches, so a REPL
//! can feed it one line at a time and later lines see earlier definitions.

use std::io::{Stdout, Write};

use log::{debug, info};

use crate::ast::Stmt;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::{Bindings, Resolver};
use crate::scanner;
use crate::token::Token;

pub struct Lox<W: Write = Stdout> {
    interpreter: Interpreter<W>,
}

impl Lox<Stdout> {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }
}

impl Default for Lox<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Lox<W> {
    /// Session whose `print` output goes to `out`.
    pub fn with_output(out: W) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
        }
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter<W> {
        &mut self.interpreter
    }

    pub fn into_output(self) -> W {
        self.interpreter.into_output()
    }

    /// Run raw bytes (a file's contents); they must be valid UTF‑8.
    pub fn run_bytes(&mut self, source: &[u8]) -> Result<()> {
        let text: &str = std::str::from_utf8(source)?;
        self.run(text)
    }

    /// Run one batch of source text.  Nothing executes unless scanning,
    /// parsing and resolution of the whole batch all succeed.
    pub fn run(&mut self, source: &str) -> Result<()> {
        info!("Running batch of {} bytes", source.len());

        let statements: Vec<Stmt> = compile(source)?;
        let bindings: Bindings = Resolver::new().resolve(&statements)?;

        debug!(
            "Batch resolved: {} statement(s), {} binding(s)",
            statements.len(),
            bindings.len()
        );

        self.interpreter.add_bindings(bindings);
        self.interpreter.interpret(&statements)
    }
}

/// Scan and parse `source` into statements (no resolution).
pub fn compile(source: &str) -> Result<Vec<Stmt>> {
    let tokens: Vec<Token<'_>> = scanner::scan_all(source)?;

    Parser::new(&tokens).parse()
}
