//! Property-based tests for operator precedence and the type compatibility
//! relation.
//!
//! These tests use proptest to generate arbitrary expressions and types and
//! verify that key invariants hold across many random inputs.

use std::path::PathBuf;

use myco_compiler::{
    BinaryOperator, CompileOptions, Compiler, Expression, ExpressionKind, Lexer, Literal, Parser,
    SourceFile, SourceId, StatementKind, Type,
};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
        }
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Add), Just(Op::Sub), Just(Op::Mul)]
}

/// Standard precedence: fold products into terms, then add the terms.
fn expected_value(first: i64, rest: &[(Op, i64)]) -> i64 {
    let mut total = 0;
    let mut sign = 1;
    let mut term = first;
    for (op, value) in rest {
        match op {
            Op::Mul => term *= value,
            Op::Add | Op::Sub => {
                total += sign * term;
                sign = if matches!(op, Op::Add) { 1 } else { -1 };
                term = *value;
            }
        }
    }
    total + sign * term
}

fn evaluate(expression: &Expression) -> f64 {
    match &expression.kind {
        ExpressionKind::Literal(Literal::Number(value)) => *value,
        ExpressionKind::Binary(binary) => {
            let left = evaluate(&binary.left);
            let right = evaluate(&binary.right);
            match binary.operator {
                BinaryOperator::Add => left + right,
                BinaryOperator::Subtract => left - right,
                BinaryOperator::Multiply => left * right,
                other => panic!("unexpected operator {other:?}"),
            }
        }
        other => panic!("unexpected expression {other:?}"),
    }
}

fn parse_single_expression(source: &str) -> Expression {
    let source_file = SourceFile::new(SourceId(0), PathBuf::from("prop.myco"), source.to_string());
    let tokens = Lexer::new(&source_file).tokenize().expect("lex source");
    let mut parser = Parser::new(&source_file, tokens);
    let block = parser.parse_program();
    assert_eq!(parser.error_record().count, 0, "syntax errors in {source:?}");
    match &block.statements[0].kind {
        StatementKind::Expression(expression) => expression.clone(),
        other => panic!("expected expression statement, got {other:?}"),
    }
}

/// Strategy for types without nesting.
fn leaf_type() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::Int),
        Just(Type::Float),
        Just(Type::String),
        Just(Type::Bool),
        Just(Type::Null),
        Just(Type::Any),
        Just(Type::Array(None)),
        "[A-Z][a-z]{1,4}".prop_map(Type::Class),
    ]
}

/// Strategy for arbitrary types built from the leaves.
fn arb_type() -> impl Strategy<Value = Type> {
    leaf_type().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::array_of),
            inner.clone().prop_map(|ty| Type::Set(Box::new(ty))),
            (inner.clone(), inner.clone())
                .prop_map(|(key, value)| Type::HashMap(Box::new(key), Box::new(value))),
            inner.clone().prop_map(Type::optional),
            (inner.clone(), prop::collection::vec(inner.clone(), 1..3))
                .prop_map(|(first, rest)| Type::union(first, rest)),
            (prop::collection::vec(inner.clone(), 0..3), inner)
                .prop_map(|(params, ret)| Type::Function(params, Box::new(ret))),
        ]
    })
}

const SNIPPETS: &[&str] = &[
    "let", "x", "=", "1", "2.5", "\"s\"", ";", "if", "while", "for", "in", "func", "end", ":",
    "(", ")", "[", "]", "{", "}", ",", "+", "*", "**", "..", "match", "case", "=>", "else",
    "class", "return", "\n", "not", "and", "Int", "|", "?", "try", "catch", "use", "from",
];

proptest! {
    #[test]
    fn arithmetic_follows_standard_precedence(
        first in 0i64..100,
        rest in prop::collection::vec((op_strategy(), 0i64..100), 0..8),
    ) {
        let mut source = first.to_string();
        for (op, value) in &rest {
            source.push_str(&format!(" {} {}", op.symbol(), value));
        }
        source.push(';');

        let expression = parse_single_expression(&source);
        prop_assert_eq!(evaluate(&expression), expected_value(first, &rest) as f64);
    }

    #[test]
    fn compatibility_is_reflexive(ty in arb_type()) {
        prop_assert!(ty.is_compatible(&ty), "{} should accept itself", ty);
        prop_assert!(ty.is_strictly_compatible(&ty), "{} should strictly accept itself", ty);
    }

    #[test]
    fn strict_compatibility_implies_loose(expected in arb_type(), actual in arb_type()) {
        if expected.is_strictly_compatible(&actual) {
            prop_assert!(expected.is_compatible(&actual));
        }
    }

    #[test]
    fn any_is_compatible_both_ways(ty in arb_type()) {
        prop_assert!(Type::Any.is_compatible(&ty));
        prop_assert!(ty.is_compatible(&Type::Any));
    }

    #[test]
    fn union_accepts_its_members(first in arb_type(), second in arb_type()) {
        let union = Type::union(first.clone(), [second.clone()]);
        prop_assert!(union.is_compatible(&first), "{} should accept {}", union, first);
        prop_assert!(union.is_compatible(&second), "{} should accept {}", union, second);
    }

    #[test]
    fn optional_accepts_inner_and_null(ty in arb_type()) {
        let optional = Type::optional(ty.clone());
        prop_assert!(optional.is_compatible(&ty));
        prop_assert!(optional.is_compatible(&Type::Null));
    }

    #[test]
    fn arbitrary_token_soup_never_panics(
        pieces in prop::collection::vec(prop::sample::select(SNIPPETS), 0..60),
    ) {
        let source = pieces.join(" ");
        let source_file = SourceFile::new(SourceId(0), PathBuf::from("soup.myco"), source);
        let mut compiler = Compiler::new(CompileOptions::default());
        let compilation = compiler.compile(&source_file).expect("snippets always lex");
        prop_assert_eq!(
            compilation.parse_errors.count > 0,
            compiler
                .diagnostics()
                .entries()
                .iter()
                .any(|diagnostic| diagnostic.kind == myco_compiler::DiagnosticKind::Syntax)
        );
    }
}
