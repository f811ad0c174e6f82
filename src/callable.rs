//! Callable runtime values: host natives and user functions (closures).

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::class::LoxInstance;
use crate::environment::{EnvRef, Environment};
use crate::error::Result;
use crate::interpreter::{Flow, Interpreter};
use crate::value::Value;

/// Signature of a host function.  Errors are plain messages; the interpreter
/// attaches the call site's line.
pub type NativeFn = fn(&[Value]) -> std::result::Result<Value, String>;

/// A function implemented by the embedding host.
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new<S: Into<String>>(name: S, arity: usize, func: NativeFn) -> Self {
        Self {
            name: name.into(),
            arity,
            func,
        }
    }

    /// Wall‑clock seconds since the Unix epoch.
    pub fn clock() -> Self {
        Self::new("clock", 0, |_args: &[Value]| {
            let now = chrono::Utc::now();
            let seconds: f64 =
                now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0;

            debug!("Native 'clock' returned {}", seconds);

            Ok(Value::Number(seconds))
        })
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// A user function or method: its declaration plus the environment that was
/// active where it was defined.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef) -> Self {
        Self {
            declaration,
            closure,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.name
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy whose closure has one extra frame binding `this`.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        debug!("Binding method '{}' to an instance", self.name());

        let frame: EnvRef = Environment::child_of(&self.closure);
        frame.borrow_mut().define("this", Value::Instance(instance));

        LoxFunction::new(Rc::clone(&self.declaration), frame)
    }

    /// Run the body in a fresh frame whose parent is the *closure*, not the
    /// caller's environment.  The caller has already checked the arity.
    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Calling user function '{}'", self.name());

        let frame: EnvRef = Environment::child_of(&self.closure);
        {
            let mut frame = frame.borrow_mut();
            for (param, value) in self.declaration.params.iter().zip(arguments) {
                frame.define(&param.name, value);
            }
        }

        match interpreter.execute_block(&self.declaration.body, frame)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
