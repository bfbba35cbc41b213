mod ast;
mod compiler;
mod diagnostics;
mod environment;
mod heuristics;
mod inference;
mod lexer;
mod parser;
mod source;
mod typechecker;
mod types;

pub use crate::ast::{
    ArmBody, AssignmentExpression, BinaryExpression, BinaryOperator, Block, CallExpression,
    ClassField, ClassStatement, ElseBranch, Expression, ExpressionKind, ForStatement,
    FunctionParameter, FunctionStatement, HashMapEntry, IfStatement, IndexExpression,
    LambdaExpression, LetStatement, Literal, MatchArm, MatchKind, MatchStatement,
    MemberExpression, ObjectPatternField, Pattern, PatternKind, RangeExpression, SourceSpan,
    Statement, StatementKind, TryStatement, TypeAnnotation, UnaryExpression, UnaryOperator,
    UseStatement, WhileStatement,
};
pub use crate::compiler::{Compilation, CompileOptions, Compiler};
pub use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLevel, Diagnostics};
pub use crate::environment::{EnvironmentError, TypeEnvironment};
pub use crate::heuristics::member_type as heuristic_member_type;
pub use crate::inference::{confidence_of, InferenceEngine, InferenceResult, FULL_CONFIDENCE};
pub use crate::lexer::{Keyword, Lexer, LexerError, Token, TokenKind};
pub use crate::parser::{ParseErrorRecord, Parser, ParserOptions, DEFAULT_MAX_DEPTH};
pub use crate::source::{SourceFile, SourceId};
pub use crate::typechecker::TypeChecker;
pub use crate::types::{ClassHierarchy, GenericError, Type};
