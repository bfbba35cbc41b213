use anyhow::Result;

use super::Parser;
use crate::ast::{SourceSpan, TypeAnnotation};
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    /// `Name`, `Name<Args>`, `[T]`, `(A, B) -> R`, `T | U` and a trailing `?`
    /// for optionals. Parentheses without an arrow only group.
    pub(super) fn parse_type_annotation(&mut self) -> Result<TypeAnnotation> {
        let first = self.parse_optional_type()?;
        if !self.check(&TokenKind::Pipe) {
            return Ok(first);
        }

        let mut members = vec![first];
        while self.match_token(&TokenKind::Pipe) {
            members.push(self.parse_optional_type()?);
        }
        Ok(TypeAnnotation::Union(members))
    }

    fn parse_optional_type(&mut self) -> Result<TypeAnnotation> {
        let mut annotation = self.parse_primary_type()?;
        while self.match_token(&TokenKind::Question) {
            annotation = TypeAnnotation::Optional(Box::new(annotation));
        }
        Ok(annotation)
    }

    fn parse_primary_type(&mut self) -> Result<TypeAnnotation> {
        if self.match_token(&TokenKind::LParen) {
            return self.parse_parenthesized_type();
        }

        if self.check(&TokenKind::LBracket) {
            self.advance();
            let element = self.nested(|parser| parser.parse_type_annotation())?;
            self.expect_token(TokenKind::RBracket, "Expected ']' after array element type")?;
            return Ok(TypeAnnotation::Array(Box::new(element)));
        }

        let token = self.peek().clone();
        let is_name = matches!(token.kind, TokenKind::Identifier)
            || matches!(token.kind, TokenKind::Keyword(Keyword::Null));
        if !is_name {
            return self.fail("Expected type name");
        }
        self.advance();

        let mut arguments = Vec::new();
        if self.match_token(&TokenKind::Less) {
            loop {
                arguments.push(self.nested(|parser| parser.parse_type_annotation())?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect_token(TokenKind::Greater, "Expected '>' after type arguments")?;
        }

        Ok(TypeAnnotation::Named {
            name: token.lexeme.clone(),
            arguments,
            span: SourceSpan::from_token(&token),
        })
    }

    fn parse_parenthesized_type(&mut self) -> Result<TypeAnnotation> {
        let mut parameters = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            parameters.push(self.nested(|parser| parser.parse_type_annotation())?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(TokenKind::RParen, "Expected ')' after parameter types")?;

        if !self.match_token(&TokenKind::Arrow) {
            if parameters.len() == 1 {
                return Ok(parameters.remove(0));
            }
            return self.fail("Expected '->' after function parameter types");
        }

        let return_type = self.nested(|parser| parser.parse_type_annotation())?;
        Ok(TypeAnnotation::Function {
            parameters,
            return_type: Box::new(return_type),
        })
    }
}
