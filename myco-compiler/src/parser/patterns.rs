use anyhow::Result;

use super::Parser;
use crate::ast::*;
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    /// A `case` pattern, optionally guarded with `when condition`.
    pub(super) fn parse_pattern(&mut self) -> Result<Pattern> {
        let pattern = self.parse_or_pattern()?;
        if !self.match_keyword(Keyword::When) {
            return Ok(pattern);
        }

        let condition = self.parse_expression()?;
        let span = SourceSpan::union(&pattern.span, &condition.span);
        Ok(Pattern::new(
            PatternKind::Guard {
                pattern: Box::new(pattern),
                condition,
            },
            span,
        ))
    }

    fn parse_or_pattern(&mut self) -> Result<Pattern> {
        let mut left = self.parse_and_pattern()?;
        while self.match_token(&TokenKind::Pipe) {
            let right = self.parse_and_pattern()?;
            let span = SourceSpan::union(&left.span, &right.span);
            left = Pattern::new(PatternKind::Or(Box::new(left), Box::new(right)), span);
        }
        Ok(left)
    }

    fn parse_and_pattern(&mut self) -> Result<Pattern> {
        let mut left = self.parse_not_pattern()?;
        while self.match_token(&TokenKind::Ampersand) {
            let right = self.parse_not_pattern()?;
            let span = SourceSpan::union(&left.span, &right.span);
            left = Pattern::new(PatternKind::And(Box::new(left), Box::new(right)), span);
        }
        Ok(left)
    }

    fn parse_not_pattern(&mut self) -> Result<Pattern> {
        if self.check(&TokenKind::Bang) {
            let start = SourceSpan::from_token(self.advance());
            let inner = self.nested(|parser| parser.parse_not_pattern())?;
            let span = SourceSpan::union(&start, &inner.span);
            return Ok(Pattern::new(PatternKind::Not(Box::new(inner)), span));
        }
        self.nested(|parser| parser.parse_primary_pattern())
    }

    fn parse_primary_pattern(&mut self) -> Result<Pattern> {
        let token = self.peek().clone();
        let start = SourceSpan::from_token(&token);

        match &token.kind {
            TokenKind::Identifier if token.lexeme == "_" => {
                self.advance();
                Ok(Pattern::new(PatternKind::Wildcard, start))
            }
            TokenKind::Identifier
                if starts_uppercase(&token.lexeme)
                    && !matches!(
                        self.peek_kind_at(1),
                        Some(TokenKind::Dot | TokenKind::LParen | TokenKind::LBracket)
                    ) =>
            {
                self.advance();
                Ok(Pattern::new(PatternKind::Type(token.lexeme.clone()), start))
            }
            TokenKind::Number(_) | TokenKind::Minus => self.parse_numeric_pattern(),
            TokenKind::Slash => self.parse_regex_pattern(),
            TokenKind::LBracket => self.parse_array_pattern(),
            TokenKind::LBrace => self.parse_object_pattern(),
            _ => {
                let expression = self.parse_expression()?;
                let span = expression.span;
                let kind = match expression.kind {
                    ExpressionKind::Identifier(name) => PatternKind::Binding(name),
                    _ => PatternKind::Expression(expression),
                };
                Ok(Pattern::new(kind, span))
            }
        }
    }

    /// `1..10` is inclusive, `1...10` exclusive. A lone number is a value.
    fn parse_numeric_pattern(&mut self) -> Result<Pattern> {
        let start = self.parse_additive()?;
        let inclusive = match self.peek_kind() {
            TokenKind::DotDot => true,
            TokenKind::DotDotDot => false,
            _ => {
                let span = start.span;
                return Ok(Pattern::new(PatternKind::Expression(start), span));
            }
        };
        self.advance();

        let end = self.parse_additive()?;
        let span = SourceSpan::union(&start.span, &end.span);
        Ok(Pattern::new(
            PatternKind::Range {
                start,
                end,
                inclusive,
            },
            span,
        ))
    }

    /// `/"regex"/`
    fn parse_regex_pattern(&mut self) -> Result<Pattern> {
        let open = SourceSpan::from_token(self.advance());
        let source = match &self.peek().kind {
            TokenKind::StringLiteral(value) => value.clone(),
            _ => return self.fail("Expected string literal in regex pattern"),
        };
        self.advance();
        self.expect_token(TokenKind::Slash, "Expected '/' to close regex pattern")?;
        Ok(Pattern::new(PatternKind::Regex(source), self.span_since(&open)))
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern> {
        let open = SourceSpan::from_token(self.advance());
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
            elements.push(self.nested(|parser| parser.parse_pattern())?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(TokenKind::RBracket, "Expected ']' after array pattern")?;
        Ok(Pattern::new(PatternKind::Array(elements), self.span_since(&open)))
    }

    /// `{name: pattern, other}`. A bare name binds the field to itself.
    fn parse_object_pattern(&mut self) -> Result<Pattern> {
        let open = SourceSpan::from_token(self.advance());
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let name = self.expect_identifier("Expected field name in object pattern")?;
            let pattern = if self.match_token(&TokenKind::Colon) {
                self.nested(|parser| parser.parse_pattern())?
            } else {
                Pattern::new(
                    PatternKind::Binding(name.lexeme.clone()),
                    SourceSpan::from_token(&name),
                )
            };
            fields.push(ObjectPatternField {
                name: name.lexeme,
                pattern,
            });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(TokenKind::RBrace, "Expected '}' after object pattern")?;
        Ok(Pattern::new(PatternKind::Object(fields), self.span_since(&open)))
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(|ch| ch.is_ascii_uppercase())
}
