use serde::Serialize;

use crate::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    pub fn single_point(line: usize, column: usize) -> Self {
        Self::new(line, column, line, column)
    }

    pub fn from_token(token: &Token) -> Self {
        let width = token.lexeme.chars().count().max(1);
        Self::new(
            token.line,
            token.column,
            token.line,
            token.column + width - 1,
        )
    }

    /// Smallest span covering both inputs. A zeroed span counts as absent.
    pub fn union(a: &Self, b: &Self) -> Self {
        if a.line == 0 {
            return *b;
        }
        if b.line == 0 {
            return *a;
        }

        let (line, column) = (a.line, a.column).min((b.line, b.column));
        let (end_line, end_column) = (a.end_line, a.end_column).max((b.end_line, b.end_column));
        Self::new(line, column, end_line, end_column)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub span: SourceSpan,
    pub kind: StatementKind,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Let(LetStatement),
    Expression(Expression),
    If(IfStatement),
    While(WhileStatement),
    For(ForStatement),
    Function(FunctionStatement),
    Class(ClassStatement),
    Match(MatchStatement),
    Try(TryStatement),
    Throw(Expression),
    Return(Option<Expression>),
    Break,
    Continue,
    Use(UseStatement),
}

#[derive(Debug, Clone)]
pub struct LetStatement {
    pub name: String,
    pub name_span: SourceSpan,
    pub is_const: bool,
    pub type_annotation: Option<TypeAnnotation>,
    pub initializer: Expression,
}

/// Declared type as written in source. Resolved by the type checker.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
    Named {
        name: String,
        arguments: Vec<TypeAnnotation>,
        span: SourceSpan,
    },
    Array(Box<TypeAnnotation>),
    Union(Vec<TypeAnnotation>),
    Optional(Box<TypeAnnotation>),
    Function {
        parameters: Vec<TypeAnnotation>,
        return_type: Box<TypeAnnotation>,
    },
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub condition: Expression,
    pub consequent: Block,
    pub alternative: Option<ElseBranch>,
}

#[derive(Debug, Clone)]
pub enum ElseBranch {
    ElseIf(Box<Statement>),
    Else(Block),
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ForStatement {
    pub variable: String,
    pub variable_span: SourceSpan,
    pub iterable: Expression,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct FunctionParameter {
    pub name: String,
    pub span: SourceSpan,
    pub type_annotation: Option<TypeAnnotation>,
}

#[derive(Debug, Clone)]
pub struct FunctionStatement {
    pub name: String,
    pub name_span: SourceSpan,
    pub is_async: bool,
    pub parameters: Vec<FunctionParameter>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ClassStatement {
    pub name: String,
    pub name_span: SourceSpan,
    pub parent: Option<String>,
    pub fields: Vec<ClassField>,
    pub methods: Vec<FunctionStatement>,
}

#[derive(Debug, Clone)]
pub struct ClassField {
    pub name: String,
    pub span: SourceSpan,
    pub type_annotation: Option<TypeAnnotation>,
    pub default_value: Option<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Match,
    Spore,
}

#[derive(Debug, Clone)]
pub struct MatchStatement {
    pub kind: MatchKind,
    pub subject: Expression,
    pub arms: Vec<MatchArm>,
    /// The `else` arm of a match or the `root` arm of a spore.
    pub default: Option<ArmBody>,
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: ArmBody,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum ArmBody {
    Expression(Expression),
    Block(Block),
}

#[derive(Debug, Clone)]
pub struct TryStatement {
    pub body: Block,
    pub catch_variable: Option<String>,
    pub catch_body: Option<Block>,
    pub finally_body: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct UseStatement {
    pub library: String,
    pub library_span: SourceSpan,
    /// Imported names for `use a, b from lib`. Empty for a whole-library import.
    pub items: Vec<String>,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub span: SourceSpan,
    pub kind: ExpressionKind,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: SourceSpan) -> Self {
        Self { span, kind }
    }
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Literal(Literal),
    Identifier(String),
    SelfValue,
    Super,
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Range(RangeExpression),
    Assignment(AssignmentExpression),
    Array(Vec<Expression>),
    HashMap(Vec<HashMapEntry>),
    Set(Vec<Expression>),
    Lambda(LambdaExpression),
    Member(MemberExpression),
    Call(CallExpression),
    Index(IndexExpression),
    Await(Box<Expression>),
    Grouping(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
                | BinaryOperator::Power
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::Greater
                | BinaryOperator::GreaterEqual
                | BinaryOperator::Less
                | BinaryOperator::LessEqual
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct RangeExpression {
    pub start: Box<Expression>,
    pub end: Box<Expression>,
    pub step: Option<Box<Expression>>,
}

/// `None` is plain `=`; otherwise the arithmetic operator of `+=`, `-=`, ...
#[derive(Debug, Clone)]
pub struct AssignmentExpression {
    pub target: Box<Expression>,
    pub operator: Option<BinaryOperator>,
    pub value: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct HashMapEntry {
    pub key: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone)]
pub struct LambdaExpression {
    pub parameters: Vec<FunctionParameter>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: String,
    pub property_span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct IndexExpression {
    pub object: Box<Expression>,
    pub index: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub span: SourceSpan,
    pub kind: PatternKind,
}

impl Pattern {
    pub fn new(kind: PatternKind, span: SourceSpan) -> Self {
        Self { span, kind }
    }
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    /// Capitalized name such as `Int` or `Dog`.
    Type(String),
    Wildcard,
    Range {
        start: Expression,
        end: Expression,
        inclusive: bool,
    },
    Regex(String),
    Array(Vec<Pattern>),
    Object(Vec<ObjectPatternField>),
    Guard {
        pattern: Box<Pattern>,
        condition: Expression,
    },
    Or(Box<Pattern>, Box<Pattern>),
    And(Box<Pattern>, Box<Pattern>),
    Not(Box<Pattern>),
    Binding(String),
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub struct ObjectPatternField {
    pub name: String,
    pub pattern: Pattern,
}
