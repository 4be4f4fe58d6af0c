//! Expression precedence and associativity tests.
//!
//! The expression grammar has three binary tiers plus prefix minus:
//! relational (`<`, `>`, `=`, non-associative, lowest), additive
//! (`+`, `-`), multiplicative (`*`, `/`, `\`), and unary `-` binding
//! tighter than any binary operator.

use minitri_ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use minitri_parser::{parse_expr, ParseError, ParseErrorKind};

/// Helper to parse an expression from source.
fn parse(source: &str) -> Expr {
    let tokens = minitri_lexer::scan(source).expect("scan failed");
    parse_expr(&tokens, 0).expect("parse failed")
}

/// Helper to parse source expecting a failure.
fn parse_err(source: &str) -> ParseError {
    let tokens = minitri_lexer::scan(source).expect("scan failed");
    parse_expr(&tokens, 0).expect_err("expected parse error")
}

/// Helper to check if an expression is a binary operation with an operator.
fn is_binary(expr: &Expr, expected: BinaryOp) -> bool {
    matches!(&expr.kind, ExprKind::Binary { op, .. } if *op == expected)
}

/// Helper to get left and right operands of a binary expression.
fn operands(expr: &Expr) -> Option<(&Expr, &Expr)> {
    match &expr.kind {
        ExprKind::Binary { left, right, .. } => Some((left.as_ref(), right.as_ref())),
        _ => None,
    }
}

// =============================================================================
// Multiplicative vs additive
// =============================================================================

#[test]
fn multiplication_binds_tighter_than_addition() {
    // 2 + 3 * 4 parses as 2 + (3 * 4)
    let expr = parse("2 + 3 * 4");
    assert!(is_binary(&expr, BinaryOp::Add));
    let (left, right) = operands(&expr).unwrap();
    assert!(matches!(left.kind, ExprKind::IntLiteral(2)));
    assert!(is_binary(right, BinaryOp::Mul));
}

#[test]
fn division_binds_tighter_than_subtraction() {
    // a - b / c parses as a - (b / c)
    let expr = parse("a - b / c");
    assert!(is_binary(&expr, BinaryOp::Sub));
    let (left, right) = operands(&expr).unwrap();
    assert!(matches!(left.kind, ExprKind::Var(_)));
    assert!(is_binary(right, BinaryOp::Div));
}

#[test]
fn modulo_is_multiplicative() {
    // a + b \ c parses as a + (b \ c)
    let expr = parse("a + b \\ c");
    assert!(is_binary(&expr, BinaryOp::Add));
    let (_, right) = operands(&expr).unwrap();
    assert!(is_binary(right, BinaryOp::Mod));
}

// =============================================================================
// Left associativity
// =============================================================================

#[test]
fn addition_is_left_associative() {
    // a + b - c parses as (a + b) - c
    let expr = parse("a + b - c");
    assert!(is_binary(&expr, BinaryOp::Sub));
    let (left, _) = operands(&expr).unwrap();
    assert!(is_binary(left, BinaryOp::Add));
}

#[test]
fn multiplication_is_left_associative() {
    // a / b * c parses as (a / b) * c
    let expr = parse("a / b * c");
    assert!(is_binary(&expr, BinaryOp::Mul));
    let (left, _) = operands(&expr).unwrap();
    assert!(is_binary(left, BinaryOp::Div));
}

// =============================================================================
// Relational tier
// =============================================================================

#[test]
fn relational_is_lowest() {
    // a + b < c * d parses as (a + b) < (c * d)
    let expr = parse("a + b < c * d");
    assert!(is_binary(&expr, BinaryOp::Lt));
    let (left, right) = operands(&expr).unwrap();
    assert!(is_binary(left, BinaryOp::Add));
    assert!(is_binary(right, BinaryOp::Mul));
}

#[test]
fn all_relational_operators_parse() {
    for (source, op) in [
        ("a < b", BinaryOp::Lt),
        ("a > b", BinaryOp::Gt),
        ("a = b", BinaryOp::Eq),
    ] {
        let expr = parse(source);
        assert!(is_binary(&expr, op), "wrong operator for {:?}", source);
    }
}

#[test]
fn relational_does_not_chain() {
    let err = parse_err("a < b < c");
    assert_eq!(err.kind, ParseErrorKind::InvalidSyntax);
    assert!(err.message.contains("non-associative"));
}

#[test]
fn mixed_relational_does_not_chain() {
    let err = parse_err("a < b = c");
    assert_eq!(err.kind, ParseErrorKind::InvalidSyntax);
}

// =============================================================================
// Unary minus
// =============================================================================

#[test]
fn unary_minus_binds_tighter_than_multiplication() {
    // -a * b parses as (-a) * b
    let expr = parse("-a * b");
    assert!(is_binary(&expr, BinaryOp::Mul));
    let (left, _) = operands(&expr).unwrap();
    assert!(matches!(
        left.kind,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            ..
        }
    ));
}

#[test]
fn unary_minus_nests() {
    let expr = parse("- -x");
    let ExprKind::Unary { operand, .. } = &expr.kind else {
        panic!("expected unary expression");
    };
    assert!(matches!(operand.kind, ExprKind::Unary { .. }));
}

// =============================================================================
// Grouping
// =============================================================================

#[test]
fn parentheses_override_precedence() {
    // (2 + 3) * 4 parses as Grouped(2 + 3) * 4
    let expr = parse("(2 + 3) * 4");
    assert!(is_binary(&expr, BinaryOp::Mul));
    let (left, _) = operands(&expr).unwrap();
    let ExprKind::Grouped(inner) = &left.kind else {
        panic!("expected grouped expression");
    };
    assert!(is_binary(inner, BinaryOp::Add));
}

#[test]
fn relational_allowed_inside_parens() {
    // (a < b) = c is fine: the inner comparison is grouped
    let expr = parse("(a < b) = c");
    assert!(is_binary(&expr, BinaryOp::Eq));
}

// =============================================================================
// Calls
// =============================================================================

#[test]
fn call_arguments_parse_full_expressions() {
    let expr = parse("f(a, b + 1)");
    let ExprKind::Call { name, args } = &expr.kind else {
        panic!("expected call expression");
    };
    assert_eq!(name.text, "f");
    assert_eq!(args.len(), 2);
    assert!(is_binary(&args[1], BinaryOp::Add));
}

#[test]
fn nullary_call_parses() {
    let expr = parse("f()");
    assert!(matches!(&expr.kind, ExprKind::Call { args, .. } if args.is_empty()));
}

#[test]
fn calls_nest_in_operators() {
    // fact(n - 1) * n
    let expr = parse("fact(n - 1) * n");
    assert!(is_binary(&expr, BinaryOp::Mul));
    let (left, _) = operands(&expr).unwrap();
    assert!(matches!(left.kind, ExprKind::Call { .. }));
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn unclosed_paren_reports_expected_rparen() {
    let err = parse_err("(a + b");
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
    assert!(err.message.contains(")"));
}

#[test]
fn dangling_operator_is_an_error() {
    let err = parse_err("a +");
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
}

#[test]
fn trailing_tokens_are_an_error() {
    let err = parse_err("a b");
    assert_eq!(err.kind, ParseErrorKind::UnexpectedToken);
}
