//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk, and must finish before
//! any statement runs:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, read in own initializer, misplaced
//!    `return`/`this`/`super`, a class inheriting from itself).
//! 3. Record, for *each* variable occurrence, how many scopes out its
//!    declaration lives.  Occurrences that match no scope are left out of the
//!    table and are looked up by name in the global environment at runtime.
//!
//! The outermost frame of the stack stands for the batch's top level, so the
//! scope shape seen here matches the environment chain the interpreter builds
//! (global → class `super` → class `this` → call → block …).

use crate::ast::{Expr, ExprId, FunctionDecl, Ident, Stmt};
use crate::error::{LoxError, Result};
use crate::stack;
use log::{debug, info};
use std::collections::HashMap;

/// Binding table: node identity → scope distance (0 = innermost frame).
pub type Bindings = HashMap<ExprId, usize>;

/// What kind of function body are we in?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
}

/// Are we inside a class body?  Used to validate `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances in its [`Bindings`] table.
pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    locals: Bindings,
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    /// Create a resolver whose only frame is the top level.
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: vec![HashMap::new()],
            locals: Bindings::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top‑level statements and hand back the binding table.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> Result<Bindings> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements)?;

        info!("Resolved {} local binding(s)", self.locals.len());

        Ok(self.locals)
    }

    fn resolve_stmts(&mut self, statements: &'a [Stmt]) -> Result<()> {
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        stack::ensure_sufficient_stack(|| self.resolve_stmt_inner(stmt))
    }

    fn resolve_stmt_inner(&mut self, stmt: &'a Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                let result = self.resolve_stmts(statements);
                self.end_scope();
                result?;
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name)?;
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // The name is visible *inside* its own body (recursion).
                self.declare(&decl.name)?;
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function)?;
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods)?,

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            Stmt::Return { line, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        *line,
                        "Can't return from top-level code.",
                    ));
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr)?;
                }
            }
        }

        Ok(())
    }

    fn resolve_class(
        &mut self,
        name: &'a Ident,
        superclass: Option<&'a Expr>,
        methods: &'a [std::rc::Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Resolving class '{}'", name.name);

        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        let result = self.resolve_class_body(name, superclass, methods);

        self.current_class = enclosing_class;
        result
    }

    fn resolve_class_body(
        &mut self,
        name: &'a Ident,
        superclass: Option<&'a Expr>,
        methods: &'a [std::rc::Rc<FunctionDecl>],
    ) -> Result<()> {
        self.declare(name)?;
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable { name: super_name, .. } = superclass {
                if super_name.name == name.name {
                    return Err(LoxError::resolve(
                        super_name.line,
                        "A class can't inherit from itself.",
                    ));
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass)?;

            // Scope holding `super`, enclosing the `this` scope below.
            self.begin_scope();
            self.mark_defined("super");
        }

        self.begin_scope();
        self.mark_defined("this");

        let mut result: Result<()> = Ok(());
        for method in methods {
            result = self.resolve_function(method, FunctionType::Method);
            if result.is_err() {
                break;
            }
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) -> Result<()> {
        stack::ensure_sufficient_stack(|| self.resolve_expr_inner(expr))
    }

    fn resolve_expr_inner(&mut self, expr: &'a Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.name.as_str()) == Some(&false) {
                        return Err(LoxError::resolve(
                            name.line,
                            format!(
                                "Can't read local variable '{}' in its own initializer.",
                                name.name
                            ),
                        ));
                    }
                }
                self.resolve_local(*id, &name.name);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value)?;
                self.resolve_local(*id, &name.name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object)?,

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)?;
            }

            Expr::This { id, line } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolve(
                        *line,
                        "Can't use 'this' outside of a class.",
                    ));
                }
                self.resolve_local(*id, "this");
            }

            Expr::Super { id, line, .. } => match self.current_class {
                ClassType::None => {
                    return Err(LoxError::resolve(
                        *line,
                        "Can't use 'super' outside of a class.",
                    ));
                }
                ClassType::Class => {
                    return Err(LoxError::resolve(
                        *line,
                        "Can't use 'super' in a class with no superclass.",
                    ));
                }
                ClassType::Subclass => self.resolve_local(*id, "super"),
            },
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.  The body
    /// shares the parameter scope (no extra block frame).
    fn resolve_function(&mut self, decl: &'a FunctionDecl, kind: FunctionType) -> Result<()> {
        debug!("Resolving {:?} '{}'", kind, decl.name.name);

        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        let result = self.resolve_params_and_body(decl);
        self.end_scope();

        self.current_function = enclosing;
        result
    }

    fn resolve_params_and_body(&mut self, decl: &'a FunctionDecl) -> Result<()> {
        for param in &decl.params {
            self.declare(param)?;
            self.define(param);
        }

        self.resolve_stmts(&decl.body)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Ident) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.name.as_str()) {
                return Err(LoxError::resolve(
                    name.line,
                    format!(
                        "Already a variable named '{}' in this scope.",
                        name.name
                    ),
                ));
            }
            scope.insert(name.name.as_str(), false);
        }

        Ok(())
    }

    fn define(&mut self, name: &'a Ident) {
        self.mark_defined(name.name.as_str());
    }

    fn mark_defined(&mut self, name: &'a str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at depth `d`, or leave it out of the
    /// table (global) if no scope declares it.
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                debug!("Resolved '{}' at depth {}", name, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name);
    }
}
