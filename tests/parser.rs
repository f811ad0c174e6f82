#[cfg(test)]
mod parser_tests {
    use rox::ast::{Expr, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::error::LoxError;
    use rox::lox::compile;
    use rox::parser::Parser;
    use rox::scanner::scan_all;

    use pretty_assertions::assert_eq;

    fn print_program(source: &str) -> Vec<String> {
        compile(source)
            .unwrap()
            .iter()
            .map(AstPrinter::print_stmt)
            .collect()
    }

    fn print_expression(source: &str) -> String {
        let tokens = scan_all(source).unwrap();
        let expr = Parser::new(&tokens).parse_expression().unwrap();
        AstPrinter::print(&expr)
    }

    fn parse_error(source: &str) -> LoxError {
        match compile(source) {
            Ok(statements) => panic!("expected a syntax error, got {:?}", statements),
            Err(e) => e,
        }
    }

    #[test]
    fn test_precedence_ladder() {
        assert_eq!(print_expression("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(print_expression("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(print_expression("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
        assert_eq!(print_expression("-a * !b"), "(* (- a) (! b))");
        assert_eq!(print_expression("1 < 2 == true"), "(== (< 1.0 2.0) true)");
    }

    #[test]
    fn test_modulo_sits_with_additive_operators() {
        // `%` binds like `+`/`-`, looser than `*`.
        assert_eq!(print_expression("7 % 4 * 2"), "(% 7.0 (* 4.0 2.0))");
        assert_eq!(print_expression("1 + 7 % 4"), "(% (+ 1.0 7.0) 4.0)");
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(
            print_expression("a or b and c"),
            "(or a (and b c))"
        );
        assert_eq!(print_expression("a == b or c"), "(or (== a b) c)");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(print_expression("a = b = 3"), "(= a (= b 3.0))");
        assert_eq!(
            print_expression("point.x = point.y = 1"),
            "(= (. point x) (= (. point y) 1.0))"
        );
    }

    #[test]
    fn test_calls_and_property_chains() {
        assert_eq!(
            print_expression("make(1, \"s\").field.method()"),
            "(call (. (. (call make 1.0 s) field) method))"
        );
        assert_eq!(print_expression("f()()"), "(call (call f))");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_error("1 + 2 = 3;");

        assert!(matches!(err, LoxError::Parse { line: 1, .. }));
        assert!(err.to_string().contains("Invalid assignment target"));
    }

    #[test]
    fn test_for_desugars_into_while() {
        assert_eq!(
            print_program("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );
    }

    #[test]
    fn test_for_without_clauses_loops_on_true() {
        assert_eq!(
            print_program("for (;;) print 1;"),
            vec!["(while true (print 1.0))"]
        );
    }

    #[test]
    fn test_declarations() {
        assert_eq!(
            print_program(
                "var a; var b = 1;\n\
                 fun add(x, y) { return x + y; }\n\
                 class B < A { init(v) { this.v = v; } get() { return super.get(); } }"
            ),
            vec![
                "(var a)",
                "(var b 1.0)",
                "(fun add (x y) (return (+ x y)))",
                "(class B < A (fun init (v) (; (= (. this v) v))) (fun get () (return (call (super get)))))",
            ]
        );
    }

    #[test]
    fn test_if_else_and_while() {
        assert_eq!(
            print_program("if (a) print 1; else { print 2; } while (b) b = false;"),
            vec![
                "(if a (print 1.0) (block (print 2.0)))",
                "(while b (; (= b false)))",
            ]
        );
    }

    #[test]
    fn test_return_without_value() {
        assert_eq!(
            print_program("fun f() { return; }"),
            vec!["(fun f () (return))"]
        );
    }

    #[test]
    fn test_missing_semicolon_is_fatal() {
        let err = parse_error("print 1\nprint 2;");

        assert_eq!(
            err.to_string(),
            "[line 2] Error: Expected ';' after value at 'print'"
        );
    }

    #[test]
    fn test_unclosed_block_reports_end_of_input() {
        let err = parse_error("{ var a = 1;\n");

        assert!(matches!(err, LoxError::Parse { .. }));
        assert!(err.to_string().ends_with("at end"), "got {}", err);
    }

    #[test]
    fn test_missing_expression() {
        let err = parse_error("var x = ;");

        assert!(err.to_string().contains("Expected expression at ';'"));
    }

    #[test]
    fn test_super_requires_method_name() {
        let err = parse_error("class A < B { m() { super; } }");

        assert!(err.to_string().contains("Expected '.' after 'super'"));
    }

    #[test]
    fn test_too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        let err = parse_error(&source);

        assert!(err.to_string().contains("Can't have more than 255 parameters"));
    }

    #[test]
    fn test_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let err = parse_error(&source);

        assert!(err.to_string().contains("Can't have more than 255 arguments"));
    }

    #[test]
    fn test_identical_references_get_distinct_ids() {
        let statements = compile("a; a;").unwrap();

        let ids: Vec<_> = statements
            .iter()
            .map(|stmt| match stmt {
                Stmt::Expression(Expr::Variable { id, .. }) => *id,
                other => panic!("unexpected statement {:?}", other),
            })
            .collect();

        assert_ne!(ids[0], ids[1]);
    }
}
