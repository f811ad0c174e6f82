#[cfg(test)]
mod scanner_tests {
    use rox::error::LoxError;
    use rox::scanner::*;
    use rox::token::*;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let tokens: Vec<_> = Scanner::new(source).filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn first_error(source: &str) -> LoxError {
        match scan_all(source) {
            Ok(tokens) => panic!("expected a lexical error, got {:?}", tokens),
            Err(e) => e,
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*%})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::PERCENT, "%"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_maximal_munch() {
        assert_token_sequence(
            "!= == <= >= ! = < >",
            &[
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::BANG, "!"),
                (TokenType::EQUAL, "="),
                (TokenType::LESS, "<"),
                (TokenType::GREATER, ">"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_beat_identifiers() {
        assert_token_sequence(
            "class classy fun _fun super this",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::FUN, "fun"),
                (TokenType::IDENTIFIER, "_fun"),
                (TokenType::SUPER, "super"),
                (TokenType::THIS, "this"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comments_and_lines() {
        let tokens = scan_all("var a; // trailing comment\n// whole line\nprint a;").unwrap();

        let lines: Vec<(String, usize)> = tokens
            .iter()
            .map(|t| (t.lexeme.to_string(), t.line))
            .collect();

        assert_eq!(
            lines,
            vec![
                ("var".to_string(), 1),
                ("a".to_string(), 1),
                (";".to_string(), 1),
                ("print".to_string(), 3),
                ("a".to_string(), 3),
                (";".to_string(), 3),
                ("".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_scanner_05_literal_payloads() {
        let tokens = scan_all("\"hi there\" 12 3.25").unwrap();

        assert!(matches!(&tokens[0].token_type, TokenType::STRING(s) if s == "hi there"));
        assert!(matches!(tokens[1].token_type, TokenType::NUMBER(n) if n == 12.0));
        assert!(matches!(tokens[2].token_type, TokenType::NUMBER(n) if n == 3.25));
    }

    #[test]
    fn test_scanner_06_multiline_string_counts_lines() {
        let tokens = scan_all("\"a\nb\"\nx").unwrap();

        assert!(matches!(&tokens[0].token_type, TokenType::STRING(s) if s == "a\nb"));
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_scanner_07_token_display() {
        let tokens = scan_all("var x = 3; \"s\"").unwrap();
        let printed: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        assert_eq!(
            printed,
            vec![
                "VAR var null",
                "IDENTIFIER x null",
                "EQUAL = null",
                "NUMBER 3 3.0",
                "SEMICOLON ; null",
                "STRING \"s\" s",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_fatal() {
        let err = first_error("print \"never closed;\n");

        assert!(matches!(err, LoxError::Lex { line: 2, .. }), "got {:?}", err);
        assert!(err.to_string().contains("Unterminated string."));
    }

    #[test]
    fn test_decimal_point_needs_a_digit() {
        let err = first_error("var x = 1.;");

        assert!(matches!(err, LoxError::Lex { line: 1, .. }));
        assert!(err.to_string().contains("decimal point"));
    }

    #[test]
    fn test_unexpected_characters() {
        let results: Vec<_> = Scanner::new(",.$(#é").collect();

        // COMMA, DOT, error '$', LEFT_PAREN, error '#', error 'é', EOF
        assert_eq!(results.len(), 7, "got {:?}", results);

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
                "[line 1] Error: Unexpected character: é",
            ]
        );

        assert!(matches!(
            results.last(),
            Some(Ok(Token {
                token_type: TokenType::EOF,
                ..
            }))
        ));
    }

    #[test]
    fn test_scan_all_reports_only_the_first_error() {
        let err = first_error("var a = 1;\n$ # @");

        assert_eq!(err.to_string(), "[line 2] Error: Unexpected character: $");
    }

    #[test]
    fn test_scanner_is_fused() {
        let mut scanner = Scanner::new("x");

        assert!(scanner.next().is_some());
        assert!(scanner.next().is_some()); // EOF
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    proptest! {
        #[test]
        fn integer_literals_scan_to_their_value(n in 0u32..1_000_000) {
            let source = n.to_string();
            let tokens = scan_all(&source).unwrap();

            prop_assert_eq!(tokens.len(), 2);
            prop_assert!(matches!(tokens[0].token_type, TokenType::NUMBER(v) if v == f64::from(n)));
        }

        #[test]
        fn fractional_literals_scan_to_their_value(whole in 0u32..10_000, frac in 0u32..10_000) {
            let source = format!("{}.{}", whole, frac);
            let expected: f64 = source.parse().unwrap();
            let tokens = scan_all(&source).unwrap();

            prop_assert!(matches!(tokens[0].token_type, TokenType::NUMBER(v) if v == expected));
        }
    }
}
