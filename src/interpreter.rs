//! Tree‑walking evaluator.
//!
//! Executes resolved statements against a chain of [`Environment`] frames.
//! `self.environment` is the frame active at the current point of execution;
//! blocks and calls swap in a child frame and always put the previous one
//! back, whichever way the body exits.
//!
//! `return` is not an error: statement execution yields a [`Flow`] that
//! propagates `Flow::Return` outward through blocks and loops until a call
//! boundary absorbs it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{BinaryOp, Expr, ExprId, Ident, LiteralValue, LogicalOp, Stmt, UnaryOp};
use crate::callable::{LoxFunction, NativeFunction};
use crate::class::{LoxClass, LoxInstance, INITIALIZER};
use crate::environment::{self, EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::resolver::Bindings;
use crate::stack;
use crate::value::Value;

/// Outcome of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fall through to the next statement.
    Normal,

    /// A `return` is unwinding to the nearest call boundary.
    Return(Value),
}

/// Deepest chain of active Lox calls before the run fails.
pub const MAX_CALL_DEPTH: usize = 2048;

pub struct Interpreter<W: Write = Stdout> {
    globals: EnvRef,
    environment: EnvRef,
    locals: Bindings,
    call_depth: usize,
    out: W,
}

impl Interpreter<Stdout> {
    /// Interpreter printing to standard output, with `clock` pre‑bound.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// Interpreter printing to `out`, with `clock` pre‑bound.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));

        let mut interpreter = Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            call_depth: 0,
            out,
        };

        interpreter.define_native(NativeFunction::clock());
        interpreter
    }

    /// Bind a host function in the global scope.
    pub fn define_native(&mut self, native: NativeFunction) {
        debug!("Defining native function '{}'", native.name);

        let name: String = native.name.clone();
        self.globals
            .borrow_mut()
            .define(&name, Value::Native(Rc::new(native)));
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Merge a resolver's binding table into the one used at runtime.
    pub fn add_bindings(&mut self, bindings: Bindings) {
        debug!("Installing {} binding(s)", bindings.len());

        self.locals.extend(bindings);
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                // Unreachable for resolved programs: top‑level `return` is
                // rejected statically.
                debug!("Top-level return of {} ignored", value);
                break;
            }
        }

        self.out.flush()?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        stack::ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.name, value);
                self.environment.borrow_mut().define(&name.name, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let frame: EnvRef = Environment::child_of(&self.environment);
                self.execute_block(statements, frame)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let flow @ Flow::Return(_) = self.execute(body)? {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.name);
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment));
                self.environment
                    .borrow_mut()
                    .define(&decl.name.name, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass: Option<Rc<LoxClass>> = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Class(class) => Some(class),
                        _ => {
                            return Err(LoxError::type_error(
                                expr.line(),
                                "Superclass must be a class.",
                            ))
                        }
                    },
                    None => None,
                };

                // Methods of a subclass close over an extra frame binding `super`.
                let method_env: EnvRef = match &superclass {
                    Some(class) => {
                        let frame: EnvRef = Environment::child_of(&self.environment);
                        frame
                            .borrow_mut()
                            .define("super", Value::Class(Rc::clone(class)));
                        frame
                    }
                    None => Rc::clone(&self.environment),
                };

                let table: HashMap<String, Rc<LoxFunction>> = methods
                    .iter()
                    .map(|decl| {
                        let method = LoxFunction::new(Rc::clone(decl), Rc::clone(&method_env));
                        (decl.name.name.clone(), Rc::new(method))
                    })
                    .collect();

                debug!("Defining class '{}' with {} method(s)", name.name, table.len());

                let class = LoxClass::new(name.name.clone(), superclass, table);
                self.environment
                    .borrow_mut()
                    .define(&name.name, Value::Class(Rc::new(class)));
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` with `frame` as the current environment, restoring
    /// the previous environment on every exit path.
    pub(crate) fn execute_block(&mut self, statements: &[Stmt], frame: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, frame);

        let result = self.execute_all(statements);

        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            if let flow @ Flow::Return(_) = self.execute(stmt)? {
                return Ok(flow);
            }
        }

        Ok(Flow::Normal)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        stack::ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary {
                operator,
                right,
                line,
            } => {
                let right: Value = self.evaluate(right)?;

                match operator {
                    UnaryOp::Not => Ok(Value::Bool(!right.is_truthy())),
                    UnaryOp::Negate => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(LoxError::type_error(
                            *line,
                            format!("Operand must be a number, got {}.", other.type_name()),
                        )),
                    },
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
                line,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;
                binary(*operator, left, right, *line)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                // The deciding operand is the result, not a normalised bool.
                match operator {
                    LogicalOp::Or if left.is_truthy() => Ok(left),
                    LogicalOp::And if !left.is_truthy() => Ok(left),
                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, &name.name, name.line),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone())?;
                Ok(value)
            }

            Expr::Call {
                callee,
                arguments,
                line,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee, args, *line)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    LoxInstance::get(&instance, &name.name).ok_or_else(|| {
                        LoxError::name_error(
                            name.line,
                            format!("Undefined property '{}'.", name.name),
                        )
                    })
                }
                other => Err(LoxError::type_error(
                    name.line,
                    format!("Only instances have properties, got {}.", other.type_name()),
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let instance: Rc<RefCell<LoxInstance>> = match self.evaluate(object)? {
                    Value::Instance(instance) => instance,
                    other => {
                        return Err(LoxError::type_error(
                            name.line,
                            format!("Only instances have fields, got {}.", other.type_name()),
                        ))
                    }
                };

                let value: Value = self.evaluate(value)?;
                instance.borrow_mut().set(&name.name, value.clone());
                Ok(value)
            }

            Expr::This { id, line } => self.look_up_variable(*id, "this", *line),

            Expr::Super { id, line, method } => self.evaluate_super(*id, *line, method),
        }
    }

    /// `super.method`: the superclass lives in the frame recorded for
    /// `super`, and `this` in the frame one step closer.
    fn evaluate_super(&mut self, id: ExprId, line: usize, method: &Ident) -> Result<Value> {
        let distance: usize = *self.locals.get(&id).ok_or_else(|| {
            LoxError::name_error(line, "Unresolved 'super' reference.")
        })?;

        let superclass: Rc<LoxClass> =
            match environment::get_at(&self.environment, distance, "super") {
                Some(Value::Class(class)) => class,
                _ => return Err(LoxError::name_error(line, "Undefined variable 'super'.")),
            };

        let this: Rc<RefCell<LoxInstance>> = match distance
            .checked_sub(1)
            .and_then(|d| environment::get_at(&self.environment, d, "this"))
        {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(LoxError::name_error(line, "Undefined variable 'this'.")),
        };

        let found: Rc<LoxFunction> = superclass.find_method(&method.name).ok_or_else(|| {
            LoxError::name_error(
                method.line,
                format!("Undefined property '{}'.", method.name),
            )
        })?;

        Ok(Value::Function(Rc::new(found.bind(this))))
    }

    /// Read through the resolved distance, or from the globals if the
    /// resolver left this occurrence unbound.
    fn look_up_variable(&self, id: ExprId, name: &str, line: usize) -> Result<Value> {
        let found: Option<Value> = match self.locals.get(&id) {
            Some(distance) => environment::get_at(&self.environment, *distance, name),
            None => self.globals.borrow().get(name),
        };

        found.ok_or_else(|| LoxError::name_error(line, format!("Undefined variable '{}'.", name)))
    }

    fn assign_variable(&mut self, id: ExprId, name: &Ident, value: Value) -> Result<()> {
        let assigned: bool = match self.locals.get(&id) {
            Some(distance) => {
                environment::assign_at(&self.environment, *distance, &name.name, value)
            }
            None => self.globals.borrow_mut().assign(&name.name, value),
        };

        if assigned {
            Ok(())
        } else {
            Err(LoxError::name_error(
                name.line,
                format!("Undefined variable '{}'.", name.name),
            ))
        }
    }

    /// Invoke a callable value with already evaluated arguments.
    fn call_value(&mut self, callee: Value, args: Vec<Value>, line: usize) -> Result<Value> {
        match callee {
            Value::Native(native) => {
                check_arity(native.arity, args.len(), line)?;
                debug!("Calling native function '{}'", native.name);
                (native.func)(&args).map_err(|message| LoxError::type_error(line, message))
            }

            Value::Function(function) => {
                check_arity(function.arity(), args.len(), line)?;
                self.call_function(&function, args, line)
            }

            Value::Class(class) => {
                check_arity(class.arity(), args.len(), line)?;
                debug!("Instantiating class '{}'", class.name);

                let instance: Rc<RefCell<LoxInstance>> =
                    Rc::new(RefCell::new(LoxInstance::new(Rc::clone(&class))));

                if let Some(init) = class.find_method(INITIALIZER) {
                    let init: LoxFunction = init.bind(Rc::clone(&instance));
                    self.call_function(&init, args, line)?;
                }

                Ok(Value::Instance(instance))
            }

            other => Err(LoxError::type_error(
                line,
                format!("Can only call functions and classes, got {}.", other.type_name()),
            )),
        }
    }

    /// Run a user function, failing once [`MAX_CALL_DEPTH`] calls are active.
    fn call_function(
        &mut self,
        function: &LoxFunction,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Value> {
        if self.call_depth >= MAX_CALL_DEPTH {
            debug!("Call depth limit hit calling '{}'", function.name());
            return Err(LoxError::type_error(line, "Stack overflow."));
        }

        self.call_depth += 1;
        let result: Result<Value> = function.call(self, args);
        self.call_depth -= 1;

        result
    }
}

fn check_arity(expected: usize, got: usize, line: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(LoxError::type_error(
            line,
            format!("Expected {} arguments but got {}.", expected, got),
        ))
    }
}

/// Apply a (non short‑circuit) binary operator to evaluated operands.
fn binary(operator: BinaryOp, left: Value, right: Value, line: usize) -> Result<Value> {
    let numbers = || number_operands(&left, &right, line);

    match operator {
        BinaryOp::Add => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (a, b) => Err(LoxError::type_error(
                line,
                format!(
                    "Operands must be two numbers or two strings, got {} and {}.",
                    a.type_name(),
                    b.type_name()
                ),
            )),
        },

        BinaryOp::Subtract => numbers().map(|(a, b)| Value::Number(a - b)),
        BinaryOp::Multiply => numbers().map(|(a, b)| Value::Number(a * b)),

        BinaryOp::Divide => match numbers()? {
            (_, b) if b == 0.0 => Err(LoxError::type_error(line, "Division by zero.")),
            (a, b) => Ok(Value::Number(a / b)),
        },

        BinaryOp::Modulo => match numbers()? {
            (_, b) if b == 0.0 => Err(LoxError::type_error(line, "Modulo by zero.")),
            (a, b) => Ok(Value::Number(floored_mod(a, b))),
        },

        BinaryOp::Less => numbers().map(|(a, b)| Value::Bool(a < b)),
        BinaryOp::LessEqual => numbers().map(|(a, b)| Value::Bool(a <= b)),
        BinaryOp::Greater => numbers().map(|(a, b)| Value::Bool(a > b)),
        BinaryOp::GreaterEqual => numbers().map(|(a, b)| Value::Bool(a >= b)),

        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
    }
}

fn number_operands(left: &Value, right: &Value, line: usize) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        (a, b) => Err(LoxError::type_error(
            line,
            format!(
                "Operands must be numbers, got {} and {}.",
                a.type_name(),
                b.type_name()
            ),
        )),
    }
}

/// Modulo whose result takes the sign of the divisor.
fn floored_mod(a: f64, b: f64) -> f64 {
    let r: f64 = a % b;

    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::floored_mod;

    #[test]
    fn modulo_follows_divisor_sign() {
        assert_eq!(floored_mod(7.0, 3.0), 1.0);
        assert_eq!(floored_mod(-7.0, 3.0), 2.0);
        assert_eq!(floored_mod(7.0, -3.0), -2.0);
        assert_eq!(floored_mod(-7.0, -3.0), -1.0);
        assert_eq!(floored_mod(5.5, 2.0), 1.5);
    }
}
