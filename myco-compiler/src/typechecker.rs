use std::collections::HashMap;

use tracing::debug;

use crate::ast::{
    ArmBody, AssignmentExpression, BinaryExpression, BinaryOperator, Block, CallExpression,
    ClassStatement, ElseBranch, Expression, ExpressionKind, FunctionParameter, FunctionStatement,
    HashMapEntry, IfStatement, IndexExpression, LambdaExpression, LetStatement, Literal, MatchStatement,
    MemberExpression, Pattern, PatternKind, SourceSpan, Statement, StatementKind, TryStatement,
    TypeAnnotation, UnaryExpression, UnaryOperator, UseStatement,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::environment::TypeEnvironment;
use crate::heuristics;
use crate::inference::InferenceEngine;
use crate::types::{ClassHierarchy, Type};

#[derive(Debug, Clone)]
struct FunctionSignature {
    parameters: Vec<Type>,
    return_type: Type,
}

impl FunctionSignature {
    fn as_type(&self) -> Type {
        Type::Function(self.parameters.clone(), Box::new(self.return_type.clone()))
    }
}

#[derive(Debug, Clone, Default)]
struct ClassInfo {
    parent: Option<String>,
    fields: HashMap<String, Type>,
    methods: HashMap<String, FunctionSignature>,
}

#[derive(Debug, Default)]
struct ClassRegistry {
    classes: HashMap<String, ClassInfo>,
}

impl ClassRegistry {
    fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Walks `class` and its ancestors, nearest first.
    fn lineage<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a ClassInfo> + 'a {
        let mut next = Some(class);
        let mut remaining = self.classes.len();
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let info = self.classes.get(next?)?;
            next = info.parent.as_deref();
            Some(info)
        })
    }

    fn field(&self, class: &str, name: &str) -> Option<Type> {
        self.lineage(class)
            .find_map(|info| info.fields.get(name).cloned())
    }

    fn method(&self, class: &str, name: &str) -> Option<FunctionSignature> {
        self.lineage(class)
            .find_map(|info| info.methods.get(name).cloned())
    }
}

impl ClassHierarchy for ClassRegistry {
    fn is_subclass(&self, class: &str, ancestor: &str) -> bool {
        self.lineage(class)
            .any(|info| info.parent.as_deref() == Some(ancestor))
    }
}

struct AnnotationProblem {
    message: String,
    span: SourceSpan,
}

struct FunctionContext {
    return_type: Option<Type>,
}

pub struct TypeChecker {
    environment: TypeEnvironment,
    functions: HashMap<String, FunctionSignature>,
    classes: ClassRegistry,
    generics: HashMap<String, Type>,
    class_stack: Vec<String>,
    contexts: Vec<FunctionContext>,
    diagnostics: Diagnostics,
    inference: InferenceEngine,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            environment: TypeEnvironment::new(),
            functions: HashMap::new(),
            classes: ClassRegistry::default(),
            generics: HashMap::new(),
            class_stack: Vec::new(),
            contexts: Vec::new(),
            diagnostics: Diagnostics::new(),
            inference: InferenceEngine::new(),
        }
    }

    /// Makes `name<Args>` usable in annotations. `generic` must be a
    /// [`Type::Generic`]; arguments are checked when the name is used.
    pub fn register_generic(&mut self, name: &str, generic: Type) {
        self.generics.insert(name.to_string(), generic);
    }

    /// Checks every statement of `program`, returning true when no type
    /// errors were found.
    pub fn type_check(&mut self, program: &Block) -> bool {
        let before = self.error_count();
        debug!(statements = program.len(), "type checking program");

        self.collect_declarations(&program.statements);
        self.check_statements(&program.statements);

        let found = self.error_count() - before;
        debug!(errors = found, "finished type checking");
        found == 0
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.count_of(DiagnosticKind::Type)
    }

    pub fn errors(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    pub fn environment(&self) -> &TypeEnvironment {
        &self.environment
    }

    pub fn inference(&self) -> &InferenceEngine {
        &self.inference
    }

    pub fn into_parts(self) -> (Diagnostics, InferenceEngine) {
        (self.diagnostics, self.inference)
    }

    fn report_error<S: Into<String>>(&mut self, message: S, span: Option<SourceSpan>) {
        self.diagnostics
            .push_error_with_span(DiagnosticKind::Type, message, span);
    }

    fn is_compatible(&self, expected: &Type, actual: &Type) -> bool {
        expected.is_compatible_in(actual, &self.classes)
    }

    /// Registers function signatures and class shapes up front so that uses
    /// may precede definitions.
    fn collect_declarations(&mut self, statements: &[Statement]) {
        for statement in statements {
            match &statement.kind {
                StatementKind::Function(function) => {
                    let signature = self.signature_of(
                        &function.parameters,
                        function.return_type.as_ref(),
                        &mut Vec::new(),
                    );
                    self.functions.insert(function.name.clone(), signature);
                }
                StatementKind::Class(class) => self.register_class(class),
                _ => {}
            }
        }
    }

    /// Records a class's shape. Annotation problems are reported later, when
    /// the class body itself is checked.
    fn register_class(&mut self, class: &ClassStatement) {
        let mut problems = Vec::new();
        let mut info = ClassInfo {
            parent: class.parent.clone(),
            ..ClassInfo::default()
        };
        for field in &class.fields {
            let ty = field
                .type_annotation
                .as_ref()
                .map(|annotation| self.resolve_annotation(annotation, &mut problems))
                .unwrap_or(Type::Any);
            info.fields.insert(field.name.clone(), ty);
        }
        for method in &class.methods {
            let signature = self.signature_of(
                &method.parameters,
                method.return_type.as_ref(),
                &mut problems,
            );
            info.methods.insert(method.name.clone(), signature);
        }
        self.classes.classes.insert(class.name.clone(), info);
    }

    fn check_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.check_statement(statement);
        }
    }

    fn check_scoped_block(&mut self, block: &Block) {
        self.environment.push_scope();
        self.check_statements(&block.statements);
        self.environment.pop_scope();
    }

    /// Walks the `else if` chain iteratively.
    fn check_if(&mut self, if_stmt: &IfStatement) {
        let mut current = if_stmt;
        loop {
            self.infer_expression(&current.condition);
            self.check_scoped_block(&current.consequent);
            match &current.alternative {
                Some(ElseBranch::ElseIf(branch)) => match &branch.kind {
                    StatementKind::If(next) => current = next,
                    _ => {
                        self.check_statement(branch);
                        return;
                    }
                },
                Some(ElseBranch::Else(block)) => {
                    self.check_scoped_block(block);
                    return;
                }
                None => return,
            }
        }
    }

    fn check_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Let(let_stmt) => self.check_let(let_stmt),
            StatementKind::Expression(expression) => {
                self.infer_expression(expression);
            }
            StatementKind::If(if_stmt) => self.check_if(if_stmt),
            StatementKind::While(while_stmt) => {
                self.infer_expression(&while_stmt.condition);
                self.check_scoped_block(&while_stmt.body);
            }
            StatementKind::For(for_stmt) => {
                let iterable = self.infer_expression(&for_stmt.iterable);
                let element = element_type_of(&iterable);
                self.environment.push_scope();
                if let Err(err) = self.environment.add_variable(&for_stmt.variable, element) {
                    self.report_error(err.to_string(), Some(for_stmt.variable_span));
                }
                self.check_statements(&for_stmt.body.statements);
                self.environment.pop_scope();
            }
            StatementKind::Function(function) => self.check_function(function),
            StatementKind::Class(class) => self.check_class(class),
            StatementKind::Match(match_stmt) => self.check_match(match_stmt),
            StatementKind::Try(try_stmt) => self.check_try(try_stmt),
            StatementKind::Throw(value) => {
                self.infer_expression(value);
            }
            StatementKind::Return(value) => self.check_return(value.as_ref(), statement.span),
            StatementKind::Break | StatementKind::Continue => {}
            StatementKind::Use(use_stmt) => self.check_use(use_stmt),
        }
    }

    fn check_let(&mut self, statement: &LetStatement) {
        let inferred = self.infer_expression(&statement.initializer);
        let binding_type = match &statement.type_annotation {
            Some(annotation) => {
                let declared = self.resolve_reporting(annotation);
                if !declared.is_strictly_compatible_in(&inferred, &self.classes) {
                    self.report_error(
                        format!(
                            "Type mismatch in variable initialization: expected {}, found {}",
                            declared.describe(),
                            inferred.describe()
                        ),
                        Some(statement.initializer.span),
                    );
                }
                declared
            }
            None => {
                self.inference
                    .record_declaration(&inferred, statement.name_span);
                inferred
            }
        };

        let declared = if statement.is_const {
            self.environment.add_constant(&statement.name, binding_type)
        } else {
            self.environment.add_variable(&statement.name, binding_type)
        };
        if let Err(err) = declared {
            self.report_error(err.to_string(), Some(statement.name_span));
        }
    }

    fn signature_of(
        &self,
        parameters: &[FunctionParameter],
        return_type: Option<&TypeAnnotation>,
        problems: &mut Vec<AnnotationProblem>,
    ) -> FunctionSignature {
        let parameters = parameters
            .iter()
            .map(|parameter| {
                parameter
                    .type_annotation
                    .as_ref()
                    .map(|annotation| self.resolve_annotation(annotation, problems))
                    .unwrap_or(Type::Any)
            })
            .collect();
        let return_type = return_type
            .map(|annotation| self.resolve_annotation(annotation, problems))
            .unwrap_or(Type::Unknown);
        FunctionSignature {
            parameters,
            return_type,
        }
    }

    fn reporting_signature_of(
        &mut self,
        parameters: &[FunctionParameter],
        return_type: Option<&TypeAnnotation>,
    ) -> FunctionSignature {
        let mut problems = Vec::new();
        let signature = self.signature_of(parameters, return_type, &mut problems);
        self.report_problems(problems);
        signature
    }

    fn check_function(&mut self, function: &FunctionStatement) {
        let signature =
            self.reporting_signature_of(&function.parameters, function.return_type.as_ref());
        self.functions
            .insert(function.name.clone(), signature.clone());
        if let Err(err) = self
            .environment
            .add_variable(&function.name, signature.as_type())
        {
            self.report_error(err.to_string(), Some(function.name_span));
        }

        let declared_return = function.return_type.as_ref().map(|_| signature.return_type.clone());
        self.check_callable_body(
            &function.parameters,
            &signature.parameters,
            declared_return,
            &function.body,
        );
    }

    fn check_callable_body(
        &mut self,
        parameters: &[FunctionParameter],
        parameter_types: &[Type],
        return_type: Option<Type>,
        body: &Block,
    ) {
        self.environment.push_scope();
        for (parameter, ty) in parameters.iter().zip(parameter_types) {
            if let Err(err) = self.environment.add_variable(&parameter.name, ty.clone()) {
                self.report_error(err.to_string(), Some(parameter.span));
            }
        }
        self.contexts.push(FunctionContext { return_type });
        self.check_statements(&body.statements);
        self.contexts.pop();
        self.environment.pop_scope();
    }

    fn check_return(&mut self, value: Option<&Expression>, span: SourceSpan) {
        let actual = value
            .map(|expression| self.infer_expression(expression))
            .unwrap_or(Type::Null);
        let Some(expected) = self
            .contexts
            .last()
            .and_then(|context| context.return_type.clone())
        else {
            return;
        };

        if !self.is_compatible(&expected, &actual) {
            self.report_error(
                format!(
                    "Return type mismatch: expected {}, found {}",
                    expected.describe(),
                    actual.describe()
                ),
                Some(value.map(|expression| expression.span).unwrap_or(span)),
            );
        }
    }

    fn check_class(&mut self, class: &ClassStatement) {
        if !self.classes.contains(&class.name) {
            self.register_class(class);
        }
        if let Some(parent) = &class.parent {
            if !self.classes.contains(parent) {
                self.report_error(
                    format!("Unknown parent class '{parent}'"),
                    Some(class.name_span),
                );
            }
        }

        self.class_stack.push(class.name.clone());
        self.environment.push_scope();
        self.environment
            .add_constant("self", Type::Class(class.name.clone()))
            .ok();

        for field in &class.fields {
            let declared = field
                .type_annotation
                .as_ref()
                .map(|annotation| self.resolve_reporting(annotation));
            let initial = field
                .default_value
                .as_ref()
                .map(|value| self.infer_expression(value));

            if let (Some(declared), Some(initial)) = (&declared, &initial) {
                if !declared.is_strictly_compatible_in(initial, &self.classes) {
                    self.report_error(
                        format!(
                            "Type mismatch in field initialization: expected {}, found {}",
                            declared.describe(),
                            initial.describe()
                        ),
                        Some(field.span),
                    );
                }
            }

            let ty = declared.or(initial).unwrap_or(Type::Any);
            if let Err(err) = self.environment.add_variable(&field.name, ty) {
                self.report_error(err.to_string(), Some(field.span));
            }
        }

        for method in &class.methods {
            let signature =
                self.reporting_signature_of(&method.parameters, method.return_type.as_ref());
            let declared_return = method.return_type.as_ref().map(|_| signature.return_type.clone());
            self.check_callable_body(
                &method.parameters,
                &signature.parameters,
                declared_return,
                &method.body,
            );
        }

        self.environment.pop_scope();
        self.class_stack.pop();
    }

    fn check_match(&mut self, statement: &MatchStatement) {
        self.infer_expression(&statement.subject);
        for arm in &statement.arms {
            self.environment.push_scope();
            self.bind_pattern(&arm.pattern);
            self.check_arm_body(&arm.body);
            self.environment.pop_scope();
        }
        if let Some(default) = &statement.default {
            self.environment.push_scope();
            self.check_arm_body(default);
            self.environment.pop_scope();
        }
    }

    fn check_arm_body(&mut self, body: &ArmBody) {
        match body {
            ArmBody::Expression(expression) => {
                self.infer_expression(expression);
            }
            ArmBody::Block(block) => self.check_statements(&block.statements),
        }
    }

    /// Declares the names a pattern captures. Captured values are `Any`.
    fn bind_pattern(&mut self, pattern: &Pattern) {
        match &pattern.kind {
            PatternKind::Binding(name) => {
                // or-patterns may bind the same name in each alternative
                self.environment.add_variable(name, Type::Any).ok();
            }
            PatternKind::Array(elements) => {
                for element in elements {
                    self.bind_pattern(element);
                }
            }
            PatternKind::Object(fields) => {
                for field in fields {
                    self.bind_pattern(&field.pattern);
                }
            }
            PatternKind::Guard { pattern, condition } => {
                self.bind_pattern(pattern);
                self.infer_expression(condition);
            }
            PatternKind::Or(left, right) | PatternKind::And(left, right) => {
                self.bind_pattern(left);
                self.bind_pattern(right);
            }
            PatternKind::Not(inner) => self.bind_pattern(inner),
            PatternKind::Range { start, end, .. } => {
                self.infer_expression(start);
                self.infer_expression(end);
            }
            PatternKind::Expression(expression) => {
                self.infer_expression(expression);
            }
            PatternKind::Type(_) | PatternKind::Wildcard | PatternKind::Regex(_) => {}
        }
    }

    fn check_try(&mut self, statement: &TryStatement) {
        self.check_scoped_block(&statement.body);
        if let Some(catch_body) = &statement.catch_body {
            self.environment.push_scope();
            if let Some(variable) = &statement.catch_variable {
                self.environment.add_variable(variable, Type::Any).ok();
            }
            self.check_statements(&catch_body.statements);
            self.environment.pop_scope();
        }
        if let Some(finally_body) = &statement.finally_body {
            self.check_scoped_block(finally_body);
        }
    }

    fn check_use(&mut self, statement: &UseStatement) {
        let names: Vec<&String> = if statement.items.is_empty() {
            vec![statement.aliases.first().unwrap_or(&statement.library)]
        } else {
            statement
                .items
                .iter()
                .enumerate()
                .map(|(index, item)| statement.aliases.get(index).unwrap_or(item))
                .collect()
        };

        for name in names {
            if let Err(err) = self.environment.add_variable(name, Type::Any) {
                self.report_error(err.to_string(), Some(statement.library_span));
            }
        }
    }

    fn resolve_reporting(&mut self, annotation: &TypeAnnotation) -> Type {
        let mut problems = Vec::new();
        let ty = self.resolve_annotation(annotation, &mut problems);
        self.report_problems(problems);
        ty
    }

    fn report_problems(&mut self, problems: Vec<AnnotationProblem>) {
        for problem in problems {
            self.report_error(problem.message, Some(problem.span));
        }
    }

    /// Invalid annotations resolve to [`Type::Error`] and push a problem.
    fn resolve_annotation(
        &self,
        annotation: &TypeAnnotation,
        problems: &mut Vec<AnnotationProblem>,
    ) -> Type {
        match annotation {
            TypeAnnotation::Named {
                name,
                arguments,
                span,
            } => {
                let arguments: Vec<Type> = arguments
                    .iter()
                    .map(|argument| self.resolve_annotation(argument, problems))
                    .collect();
                match self.resolve_named_type(name, arguments) {
                    Ok(ty) => ty,
                    Err(message) => {
                        problems.push(AnnotationProblem {
                            message,
                            span: *span,
                        });
                        Type::Error
                    }
                }
            }
            TypeAnnotation::Array(element) => {
                Type::array_of(self.resolve_annotation(element, problems))
            }
            TypeAnnotation::Union(members) => {
                let mut resolved = members
                    .iter()
                    .map(|member| self.resolve_annotation(member, problems))
                    .collect::<Vec<_>>()
                    .into_iter();
                match resolved.next() {
                    Some(first) => Type::union(first, resolved),
                    None => Type::Unknown,
                }
            }
            TypeAnnotation::Optional(inner) => {
                Type::optional(self.resolve_annotation(inner, problems))
            }
            TypeAnnotation::Function {
                parameters,
                return_type,
            } => Type::Function(
                parameters
                    .iter()
                    .map(|parameter| self.resolve_annotation(parameter, problems))
                    .collect(),
                Box::new(self.resolve_annotation(return_type, problems)),
            ),
        }
    }

    fn resolve_named_type(&self, name: &str, arguments: Vec<Type>) -> Result<Type, String> {
        if let Some(generic) = self.generics.get(name) {
            return generic
                .instantiate_generic(&arguments)
                .map_err(|err| format!("Invalid use of generic type '{name}': {err}"));
        }

        let expected_arguments = match name {
            "Int" | "Float" | "String" | "Bool" | "Null" | "null" | "Any" => 0,
            "Array" | "Set" => 1,
            "HashMap" | "Map" => 2,
            // user classes ignore type arguments
            _ => arguments.len(),
        };
        let accepted = arguments.len() == expected_arguments
            || (name == "Array" && arguments.is_empty());
        if !accepted {
            return Err(format!(
                "Type '{name}' expects {expected_arguments} type argument(s), found {}",
                arguments.len()
            ));
        }

        let mut arguments = arguments.into_iter().map(Box::new);
        let ty = match name {
            "Int" => Type::Int,
            "Float" => Type::Float,
            "String" => Type::String,
            "Bool" => Type::Bool,
            "Null" | "null" => Type::Null,
            "Any" => Type::Any,
            "Array" => Type::Array(arguments.next()),
            "HashMap" | "Map" => match (arguments.next(), arguments.next()) {
                (Some(key), Some(value)) => Type::HashMap(key, value),
                _ => Type::Error,
            },
            "Set" => arguments.next().map(Type::Set).unwrap_or(Type::Error),
            _ => Type::Class(name.to_string()),
        };
        Ok(ty)
    }

    fn infer_expression(&mut self, expression: &Expression) -> Type {
        match &expression.kind {
            ExpressionKind::Literal(literal) => type_from_literal(literal),
            ExpressionKind::Identifier(name) => self.type_from_identifier(name),
            ExpressionKind::SelfValue => self
                .environment
                .lookup_variable("self")
                .unwrap_or(Type::Unknown),
            ExpressionKind::Super => self
                .class_stack
                .last()
                .and_then(|class| self.classes.classes.get(class))
                .and_then(|info| info.parent.clone())
                .map(Type::Class)
                .unwrap_or(Type::Unknown),
            ExpressionKind::Unary(unary) => self.type_from_unary(unary, expression.span),
            ExpressionKind::Binary(binary) => self.type_from_binary(binary, expression.span),
            ExpressionKind::Range(range) => {
                let start = self.infer_expression(&range.start);
                let end = self.infer_expression(&range.end);
                if let Some(step) = &range.step {
                    self.infer_expression(step);
                }
                if start == Type::Int && end == Type::Int {
                    Type::array_of(Type::Int)
                } else {
                    Type::Array(None)
                }
            }
            ExpressionKind::Assignment(assignment) => {
                self.type_from_assignment(assignment, expression.span)
            }
            ExpressionKind::Array(elements) => {
                let element_types = self.infer_all(elements);
                match merge_element_types(element_types) {
                    Some(element) => Type::array_of(element),
                    None => Type::Array(None),
                }
            }
            ExpressionKind::HashMap(entries) => self.type_from_hash_map(entries),
            ExpressionKind::Set(elements) => {
                let element_types = self.infer_all(elements);
                Type::Set(Box::new(
                    merge_element_types(element_types).unwrap_or(Type::Any),
                ))
            }
            ExpressionKind::Lambda(lambda) => self.type_from_lambda(lambda),
            ExpressionKind::Member(member) => self.type_from_member(member),
            ExpressionKind::Call(call) => self.type_from_call(call, expression.span),
            ExpressionKind::Index(index) => self.type_from_index(index),
            ExpressionKind::Await(inner) | ExpressionKind::Grouping(inner) => {
                self.infer_expression(inner)
            }
        }
    }

    fn infer_all(&mut self, expressions: &[Expression]) -> Vec<Type> {
        expressions
            .iter()
            .map(|expression| self.infer_expression(expression))
            .collect()
    }

    fn type_from_identifier(&self, name: &str) -> Type {
        self.environment
            .lookup_variable(name)
            .or_else(|| self.functions.get(name).map(FunctionSignature::as_type))
            .or_else(|| self.classes.contains(name).then(|| Type::Class(name.to_string())))
            .unwrap_or(Type::Unknown)
    }

    fn type_from_unary(&mut self, unary: &UnaryExpression, span: SourceSpan) -> Type {
        let operand = self.infer_expression(&unary.operand);
        match unary.operator {
            UnaryOperator::Negate => match operand {
                Type::Int | Type::Float | Type::Error => operand,
                Type::Any | Type::Unknown => Type::Unknown,
                other => {
                    self.report_error(
                        format!("Unary '-' requires a numeric operand, found {}", other.describe()),
                        Some(span),
                    );
                    Type::Error
                }
            },
            UnaryOperator::Not => match operand {
                Type::Bool | Type::Any | Type::Unknown => Type::Bool,
                Type::Error => Type::Error,
                other => {
                    self.report_error(
                        format!("'not' requires a Bool operand, found {}", other.describe()),
                        Some(span),
                    );
                    Type::Error
                }
            },
        }
    }

    fn type_from_binary(&mut self, binary: &BinaryExpression, span: SourceSpan) -> Type {
        let left = self.infer_expression(&binary.left);
        let right = self.infer_expression(&binary.right);

        let result = if binary.operator.is_arithmetic() {
            self.arithmetic_result(binary.operator, &left, &right, span)
        } else if binary.operator.is_comparison() {
            Type::Bool
        } else {
            self.logical_result(binary.operator, &left, &right, span)
        };

        self.inference
            .record_binary(binary.operator, &left, &right, &result, span);
        result
    }

    fn arithmetic_result(
        &mut self,
        operator: BinaryOperator,
        left: &Type,
        right: &Type,
        span: SourceSpan,
    ) -> Type {
        match (left, right) {
            (Type::Error, _) | (_, Type::Error) => Type::Error,
            (Type::Int, Type::Int) => Type::Int,
            (left, right) if left.is_numeric() && right.is_numeric() => Type::Float,
            (Type::String, _) | (_, Type::String) => Type::String,
            (left, right) if left.is_dynamic() || right.is_dynamic() => Type::Unknown,
            (left, right) => {
                self.report_error(
                    format!(
                        "Invalid operand types for '{}': {} and {}",
                        operator.symbol(),
                        left.describe(),
                        right.describe()
                    ),
                    Some(span),
                );
                Type::Error
            }
        }
    }

    fn logical_result(
        &mut self,
        operator: BinaryOperator,
        left: &Type,
        right: &Type,
        span: SourceSpan,
    ) -> Type {
        let boolean_like = |ty: &Type| matches!(ty, Type::Bool | Type::Any | Type::Unknown);
        if matches!(left, Type::Error) || matches!(right, Type::Error) {
            return Type::Error;
        }
        if boolean_like(left) && boolean_like(right) {
            return Type::Bool;
        }
        self.report_error(
            format!(
                "Logical operator '{}' requires Bool operands, found {} and {}",
                operator.symbol(),
                left.describe(),
                right.describe()
            ),
            Some(span),
        );
        Type::Error
    }

    fn type_from_assignment(&mut self, assignment: &AssignmentExpression, span: SourceSpan) -> Type {
        let value = self.infer_expression(&assignment.value);

        let ExpressionKind::Identifier(name) = &assignment.target.kind else {
            let target = self.infer_expression(&assignment.target);
            return match assignment.operator {
                Some(operator) => self.arithmetic_result(operator, &target, &value, span),
                None => value,
            };
        };

        let Some(current) = self.environment.lookup_variable(name) else {
            self.report_error(
                format!("Undefined variable '{name}'"),
                Some(assignment.target.span),
            );
            return Type::Error;
        };

        if self.environment.is_constant(name) {
            self.report_error(
                format!("Cannot assign to constant '{name}'"),
                Some(assignment.target.span),
            );
            return current;
        }

        let assigned = match assignment.operator {
            Some(operator) => self.arithmetic_result(operator, &current, &value, span),
            None => value,
        };

        if matches!(current, Type::Unknown | Type::Null) {
            self.environment.update_variable(name, assigned.clone()).ok();
        } else if !self.is_compatible(&current, &assigned) {
            self.report_error(
                format!(
                    "Type mismatch in assignment: expected {}, found {}",
                    current.describe(),
                    assigned.describe()
                ),
                Some(span),
            );
        }
        assigned
    }

    fn type_from_hash_map(&mut self, entries: &[HashMapEntry]) -> Type {
        let mut keys = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for entry in entries {
            keys.push(self.infer_expression(&entry.key));
            values.push(self.infer_expression(&entry.value));
        }
        Type::HashMap(
            Box::new(merge_element_types(keys).unwrap_or(Type::Any)),
            Box::new(merge_element_types(values).unwrap_or(Type::Any)),
        )
    }

    fn type_from_lambda(&mut self, lambda: &LambdaExpression) -> Type {
        let signature =
            self.reporting_signature_of(&lambda.parameters, lambda.return_type.as_ref());
        let declared_return = lambda.return_type.as_ref().map(|_| signature.return_type.clone());
        self.check_callable_body(
            &lambda.parameters,
            &signature.parameters,
            declared_return,
            &lambda.body,
        );
        signature.as_type()
    }

    fn type_from_member(&mut self, member: &MemberExpression) -> Type {
        let object = self.infer_expression(&member.object);
        if let Type::Class(class) = &object {
            if let Some(field) = self.classes.field(class, &member.property) {
                return field;
            }
            if let Some(method) = self.classes.method(class, &member.property) {
                return method.as_type();
            }
        }
        heuristics::member_type(&member.property)
    }

    fn type_from_call(&mut self, call: &CallExpression, span: SourceSpan) -> Type {
        match &call.callee.kind {
            ExpressionKind::Identifier(name) => {
                let arguments = self.infer_all(&call.arguments);
                if let Some(signature) = self.functions.get(name).cloned() {
                    self.verify_call_arguments(name, &signature, &arguments, span);
                    return signature.return_type;
                }
                if self.classes.contains(name) {
                    return Type::Class(name.clone());
                }
                match self.environment.lookup_variable(name) {
                    Some(Type::Function(parameters, return_type)) => {
                        let signature = FunctionSignature {
                            parameters,
                            return_type: *return_type,
                        };
                        self.verify_call_arguments(name, &signature, &arguments, span);
                        signature.return_type
                    }
                    _ => heuristics::member_type(name),
                }
            }
            ExpressionKind::Member(member) => {
                let object = self.infer_expression(&member.object);
                let arguments = self.infer_all(&call.arguments);
                if let Type::Class(class) = &object {
                    if let Some(signature) = self.classes.method(class, &member.property) {
                        self.verify_call_arguments(&member.property, &signature, &arguments, span);
                        return signature.return_type;
                    }
                }
                heuristics::member_type(&member.property)
            }
            _ => {
                let callee = self.infer_expression(&call.callee);
                self.infer_all(&call.arguments);
                match callee {
                    Type::Function(_, return_type) => *return_type,
                    _ => Type::Unknown,
                }
            }
        }
    }

    fn verify_call_arguments(
        &mut self,
        name: &str,
        signature: &FunctionSignature,
        arguments: &[Type],
        span: SourceSpan,
    ) {
        if signature.parameters.len() != arguments.len() {
            self.report_error(
                format!(
                    "Function '{name}' expects {} argument(s), found {}",
                    signature.parameters.len(),
                    arguments.len()
                ),
                Some(span),
            );
            return;
        }

        for (index, (expected, actual)) in signature.parameters.iter().zip(arguments).enumerate() {
            if !self.is_compatible(expected, actual) {
                self.report_error(
                    format!(
                        "Argument {} of '{name}': expected {}, found {}",
                        index + 1,
                        expected.describe(),
                        actual.describe()
                    ),
                    Some(span),
                );
            }
        }
    }

    fn type_from_index(&mut self, index: &IndexExpression) -> Type {
        let object = self.infer_expression(&index.object);
        let index_type = self.infer_expression(&index.index);

        match object {
            Type::Array(element) => {
                if !index_type.is_numeric() && !index_type.is_dynamic() && index_type != Type::Error {
                    self.report_error(
                        format!("Array index must be numeric, found {}", index_type.describe()),
                        Some(index.index.span),
                    );
                }
                element.map(|element| *element).unwrap_or(Type::Any)
            }
            Type::HashMap(_, value) => *value,
            Type::String => Type::String,
            Type::Error => Type::Error,
            _ => Type::Unknown,
        }
    }
}

fn type_from_literal(literal: &Literal) -> Type {
    match literal {
        Literal::Number(value) if value.fract() == 0.0 && value.is_finite() => Type::Int,
        Literal::Number(_) => Type::Float,
        Literal::String(_) => Type::String,
        Literal::Boolean(_) => Type::Bool,
        Literal::Null => Type::Null,
    }
}

/// Common type of collection elements. `None` when there are no elements or
/// they disagree; Int and Float widen to Float.
fn merge_element_types(types: Vec<Type>) -> Option<Type> {
    let mut types = types.into_iter();
    let mut merged = types.next()?;
    for ty in types {
        merged = match (merged, ty) {
            (left, right) if left == right => left,
            (Type::Int, Type::Float) | (Type::Float, Type::Int) => Type::Float,
            _ => return None,
        };
    }
    Some(merged)
}

fn element_type_of(iterable: &Type) -> Type {
    match iterable {
        Type::Array(Some(element)) | Type::Set(element) => element.as_ref().clone(),
        Type::HashMap(key, _) => key.as_ref().clone(),
        Type::String => Type::String,
        _ => Type::Any,
    }
}
