#[cfg(test)]
mod resolver_tests {
    use rox::ast::{Expr, ExprId, Stmt};
    use rox::error::LoxError;
    use rox::lox::compile;
    use rox::resolver::{Bindings, Resolver};

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// Every bindable occurrence in source order, as `(name, id)`.
    fn occurrences(statements: &[Stmt]) -> Vec<(String, ExprId)> {
        let mut out = Vec::new();
        for stmt in statements {
            walk_stmt(stmt, &mut out);
        }
        out
    }

    fn walk_stmt(stmt: &Stmt, out: &mut Vec<(String, ExprId)>) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => walk_expr(expr, out),
            Stmt::Var { initializer, .. } => {
                if let Some(expr) = initializer {
                    walk_expr(expr, out);
                }
            }
            Stmt::Block(statements) => statements.iter().for_each(|s| walk_stmt(s, out)),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                walk_expr(condition, out);
                walk_stmt(then_branch, out);
                if let Some(else_branch) = else_branch {
                    walk_stmt(else_branch, out);
                }
            }
            Stmt::While { condition, body } => {
                walk_expr(condition, out);
                walk_stmt(body, out);
            }
            Stmt::Function(decl) => decl.body.iter().for_each(|s| walk_stmt(s, out)),
            Stmt::Return { value, .. } => {
                if let Some(expr) = value {
                    walk_expr(expr, out);
                }
            }
            Stmt::Class {
                superclass,
                methods,
                ..
            } => {
                if let Some(superclass) = superclass {
                    walk_expr(superclass, out);
                }
                for method in methods {
                    method.body.iter().for_each(|s| walk_stmt(s, out));
                }
            }
        }
    }

    fn walk_expr(expr: &Expr, out: &mut Vec<(String, ExprId)>) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Grouping(inner) | Expr::Unary { right: inner, .. } => walk_expr(inner, out),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                walk_expr(left, out);
                walk_expr(right, out);
            }
            Expr::Variable { id, name } => out.push((name.name.clone(), *id)),
            Expr::Assign { id, name, value } => {
                walk_expr(value, out);
                out.push((name.name.clone(), *id));
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                walk_expr(callee, out);
                arguments.iter().for_each(|a| walk_expr(a, out));
            }
            Expr::Get { object, .. } => walk_expr(object, out),
            Expr::Set { object, value, .. } => {
                walk_expr(value, out);
                walk_expr(object, out);
            }
            Expr::This { id, .. } => out.push(("this".to_string(), *id)),
            Expr::Super { id, .. } => out.push(("super".to_string(), *id)),
        }
    }

    /// Resolve `source` and report the distance recorded for each occurrence.
    fn distances(source: &str) -> Vec<(String, Option<usize>)> {
        let statements = compile(source).unwrap();
        let bindings: Bindings = Resolver::new().resolve(&statements).unwrap();

        occurrences(&statements)
            .into_iter()
            .map(|(name, id)| (name, bindings.get(&id).copied()))
            .collect()
    }

    fn resolve_error(source: &str) -> LoxError {
        let statements = compile(source).unwrap();

        match Resolver::new().resolve(&statements) {
            Ok(bindings) => panic!("expected a static error, got {:?}", bindings),
            Err(e) => e,
        }
    }

    fn entry(name: &str, distance: Option<usize>) -> (String, Option<usize>) {
        (name.to_string(), distance)
    }

    #[test]
    fn test_top_level_declarations_bind_at_distance_zero() {
        assert_eq!(
            distances("var a = 1; print a; a = 2;"),
            vec![entry("a", Some(0)), entry("a", Some(0))]
        );
    }

    #[test]
    fn test_undeclared_names_stay_global() {
        assert_eq!(
            distances("print later; fun f() { return later; }"),
            vec![entry("later", None), entry("later", None)]
        );
    }

    #[test]
    fn test_shadowing_in_blocks() {
        assert_eq!(
            distances("var a = 1; { var a = 2; print a; } print a;"),
            vec![entry("a", Some(0)), entry("a", Some(0))]
        );
        assert_eq!(
            distances("var a = 1; { var b = 2; print a; }"),
            vec![entry("a", Some(1))]
        );
    }

    #[test]
    fn test_parameters_and_closures() {
        assert_eq!(
            distances(
                "fun outer(x) {\n\
                   { print x; }\n\
                   fun inner() { return x; }\n\
                   return inner;\n\
                 }"
            ),
            vec![entry("x", Some(1)), entry("x", Some(1)), entry("inner", Some(0))]
        );
    }

    #[test]
    fn test_recursive_function_sees_itself() {
        assert_eq!(
            distances("{ fun fib(n) { return fib(n - 1); } }"),
            vec![entry("fib", Some(1)), entry("n", Some(0))]
        );
    }

    #[test]
    fn test_this_and_super_distances() {
        assert_eq!(
            distances(
                "class A { m() { return 1; } }\n\
                 class B < A {\n\
                   m() { return super.m() + this.x; }\n\
                   n() { fun inner() { return this; } return inner; }\n\
                 }"
            ),
            vec![
                entry("A", Some(0)),
                entry("super", Some(2)),
                entry("this", Some(1)),
                entry("this", Some(2)),
                entry("inner", Some(0)),
            ]
        );
    }

    #[test]
    fn test_own_initializer_is_rejected_everywhere() {
        for source in ["var a = a;", "{ var a = a; }", "fun f() { var a = a; }"] {
            let err = resolve_error(source);

            assert!(matches!(err, LoxError::Resolve { .. }), "{}: {:?}", source, err);
            assert!(
                err.to_string()
                    .contains("Can't read local variable 'a' in its own initializer."),
                "{}: {}",
                source,
                err
            );
        }
    }

    #[test]
    fn test_outer_variable_in_initializer_is_fine() {
        assert_eq!(
            distances("var a = 1; { var b = a; }"),
            vec![entry("a", Some(1))]
        );
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        for source in [
            "var a = 1; var a = 2;",
            "{ var a; var a; }",
            "fun f(a) { var a; }",
            "fun f(a, a) {}",
        ] {
            let err = resolve_error(source);

            assert!(
                err.to_string().contains("Already a variable named 'a' in this scope."),
                "{}: {}",
                source,
                err
            );
        }
    }

    #[test]
    fn test_return_outside_function() {
        let err = resolve_error("print 1;\nreturn 2;");

        assert_eq!(
            err.to_string(),
            "[line 2] Error: Can't return from top-level code."
        );
    }

    #[test]
    fn test_function_context_is_restored() {
        let err = resolve_error("fun f() { fun g() { return 1; } return 2; }\nreturn 3;");

        assert!(matches!(err, LoxError::Resolve { line: 2, .. }));
    }

    #[test]
    fn test_this_outside_class() {
        for source in [
            "print this;",
            "fun f() { return this; }",
            "class A {}\nprint this;",
        ] {
            let err = resolve_error(source);

            assert!(
                err.to_string().contains("Can't use 'this' outside of a class."),
                "{}: {}",
                source,
                err
            );
        }
    }

    #[test]
    fn test_super_misuse() {
        let err = resolve_error("fun f() { return super.m(); }");
        assert!(err.to_string().contains("Can't use 'super' outside of a class."));

        let err = resolve_error("class A { m() { return super.m(); } }");
        assert!(err
            .to_string()
            .contains("Can't use 'super' in a class with no superclass."));
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        let err = resolve_error("class Loop < Loop {}");

        assert_eq!(
            err.to_string(),
            "[line 1] Error: A class can't inherit from itself."
        );
    }

    proptest! {
        #[test]
        fn reference_distance_matches_block_nesting(depth in 0usize..24) {
            let source = format!(
                "{{ var a = 1; {}print a;{} }}",
                "{ ".repeat(depth),
                " }".repeat(depth)
            );

            let found = distances(&source);

            prop_assert_eq!(found, vec![entry("a", Some(depth))]);
        }
    }
}
