use std::fmt;

use serde::Serialize;

use crate::ast::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Syntax,
    Type,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub level: DiagnosticLevel,
    pub kind: DiagnosticKind,
    pub span: Option<SourceSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, column) = self
            .span
            .map(|span| (span.line, span.column))
            .unwrap_or((0, 0));
        match self.kind {
            DiagnosticKind::Syntax => write!(
                f,
                "Parse Error at Line {}, Column {}: {}",
                line, column, self.message
            ),
            DiagnosticKind::Type => write!(
                f,
                "Type error at line {}, column {}: {}",
                line, column, self.message
            ),
            DiagnosticKind::Internal => write!(f, "{}", self.message),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push_error_with_span<S: Into<String>>(
        &mut self,
        kind: DiagnosticKind,
        message: S,
        span: Option<SourceSpan>,
    ) {
        let message = message.into();
        let suggestion = suggestion_for(kind, &message);
        self.entries.push(Diagnostic {
            message,
            level: DiagnosticLevel::Error,
            kind,
            span,
            suggestion,
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries
            .iter()
            .filter(|diagnostic| diagnostic.kind == kind && diagnostic.level == DiagnosticLevel::Error)
            .count()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}

fn suggestion_for(kind: DiagnosticKind, message: &str) -> Option<String> {
    if kind != DiagnosticKind::Syntax {
        return None;
    }
    let hint = if message.contains("semicolon") {
        "Add a semicolon (;) at the end of this statement."
    } else if message.contains("'end'") {
        "Blocks must be closed with the 'end' keyword."
    } else if message.contains("':'") {
        "Block headers end with a colon, e.g. `if x > 0:`."
    } else if message.contains("')'") {
        "Check for an unbalanced parenthesis."
    } else if message.contains("']'") {
        "Check for an unbalanced bracket."
    } else if message.contains("nesting depth") {
        "Split deeply nested code into smaller functions."
    } else {
        return None;
    };
    Some(hint.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_carry_suggestions() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push_error_with_span(
            DiagnosticKind::Syntax,
            "Expected ';' after expression (missing semicolon)",
            Some(SourceSpan::single_point(3, 7)),
        );
        diagnostics.push_error_with_span(DiagnosticKind::Type, "Undefined variable 'x'", None);

        let entries = diagnostics.entries();
        assert_eq!(
            entries[0].suggestion.as_deref(),
            Some("Add a semicolon (;) at the end of this statement.")
        );
        assert!(entries[1].suggestion.is_none());
        assert_eq!(diagnostics.count_of(DiagnosticKind::Syntax), 1);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn display_includes_location() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push_error_with_span(
            DiagnosticKind::Syntax,
            "Expected ':'",
            Some(SourceSpan::single_point(2, 5)),
        );
        assert_eq!(
            diagnostics.entries()[0].to_string(),
            "Parse Error at Line 2, Column 5: Expected ':'"
        );
    }

    #[test]
    fn serializes_with_lowercase_kinds() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push_error_with_span(
            DiagnosticKind::Type,
            "Undefined variable 'x'",
            Some(SourceSpan::new(1, 1, 1, 1)),
        );
        let value = serde_json::to_value(&diagnostics.entries()[0]).expect("serialize");
        assert_eq!(value["kind"], "type");
        assert_eq!(value["level"], "error");
        assert_eq!(value["span"]["column"], 1);
        assert!(value.get("suggestion").is_none());
    }
}
