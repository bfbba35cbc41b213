use anyhow::Result;

use super::Parser;
use crate::ast::*;
use crate::lexer::{Keyword, Token, TokenKind};

impl<'a> Parser<'a> {
    pub(super) fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression> {
        self.parse_left_associative(Self::parse_and, |kind| match kind {
            TokenKind::Keyword(Keyword::Or) => Some(BinaryOperator::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> Result<Expression> {
        self.parse_left_associative(Self::parse_equality, |kind| match kind {
            TokenKind::Keyword(Keyword::And) => Some(BinaryOperator::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        self.parse_left_associative(Self::parse_relational, |kind| match kind {
            TokenKind::DoubleEqual => Some(BinaryOperator::Equal),
            TokenKind::BangEqual => Some(BinaryOperator::NotEqual),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expression> {
        self.parse_left_associative(Self::parse_range, |kind| match kind {
            TokenKind::Less => Some(BinaryOperator::Less),
            TokenKind::LessEqual => Some(BinaryOperator::LessEqual),
            TokenKind::Greater => Some(BinaryOperator::Greater),
            TokenKind::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        })
    }

    /// `start..end` with an optional `..step`. Ranges do not chain.
    fn parse_range(&mut self) -> Result<Expression> {
        let start = self.parse_additive()?;
        if !self.match_token(&TokenKind::DotDot) {
            return Ok(start);
        }

        let end = self.parse_additive()?;
        let step = if self.match_token(&TokenKind::DotDot) {
            Some(Box::new(self.parse_additive()?))
        } else {
            None
        };

        let span = SourceSpan::union(&start.span, &self.span_since(&end.span));
        Ok(Expression::new(
            ExpressionKind::Range(RangeExpression {
                start: Box::new(start),
                end: Box::new(end),
                step,
            }),
            span,
        ))
    }

    pub(super) fn parse_additive(&mut self) -> Result<Expression> {
        self.parse_left_associative(Self::parse_multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        self.parse_left_associative(Self::parse_power, |kind| match kind {
            TokenKind::Star => Some(BinaryOperator::Multiply),
            TokenKind::Slash => Some(BinaryOperator::Divide),
            TokenKind::Percent => Some(BinaryOperator::Modulo),
            _ => None,
        })
    }

    /// `**` groups to the right: `2 ** 3 ** 2` is `2 ** (3 ** 2)`.
    fn parse_power(&mut self) -> Result<Expression> {
        let base = self.parse_unary()?;
        if !self.match_token(&TokenKind::StarStar) {
            return Ok(base);
        }
        let exponent = self.nested(|parser| parser.parse_power())?;
        Ok(binary(BinaryOperator::Power, base, exponent))
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let operator = match self.peek_kind() {
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Bang | TokenKind::Keyword(Keyword::Not) => UnaryOperator::Not,
            _ => return self.parse_postfix(),
        };
        let operator_span = SourceSpan::from_token(self.advance());
        let operand = self.nested(|parser| parser.parse_unary())?;
        let span = SourceSpan::union(&operator_span, &operand.span);
        Ok(Expression::new(
            ExpressionKind::Unary(UnaryExpression {
                operator,
                operand: Box::new(operand),
            }),
            span,
        ))
    }

    fn parse_left_associative(
        &mut self,
        operand: fn(&mut Self) -> Result<Expression>,
        operator_of: fn(&TokenKind) -> Option<BinaryOperator>,
    ) -> Result<Expression> {
        let mut left = operand(self)?;
        while let Some(operator) = operator_of(self.peek_kind()) {
            self.advance();
            let right = operand(self)?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    /// Member access, calls and indexing, any number of times.
    fn parse_postfix(&mut self) -> Result<Expression> {
        let mut expression = self.parse_primary()?;
        loop {
            expression = match self.peek_kind() {
                TokenKind::Dot => self.finish_member(expression)?,
                TokenKind::LParen => self.finish_call(expression)?,
                TokenKind::LBracket => self.finish_index(expression)?,
                _ => return Ok(expression),
            };
        }
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.peek().clone();
        let span = SourceSpan::from_token(&token);

        let kind = match &token.kind {
            TokenKind::Number(value) => ExpressionKind::Literal(Literal::Number(*value)),
            TokenKind::StringLiteral(value) => {
                ExpressionKind::Literal(Literal::String(value.clone()))
            }
            TokenKind::BooleanLiteral(value) => ExpressionKind::Literal(Literal::Boolean(*value)),
            TokenKind::Keyword(Keyword::Null) => ExpressionKind::Literal(Literal::Null),
            TokenKind::Identifier => ExpressionKind::Identifier(token.lexeme.clone()),
            TokenKind::Keyword(Keyword::SelfValue) => ExpressionKind::SelfValue,
            TokenKind::Keyword(Keyword::Super) => ExpressionKind::Super,
            TokenKind::Keyword(Keyword::Await) => {
                self.advance();
                let operand = self.nested(|parser| parser.parse_unary())?;
                let span = SourceSpan::union(&span, &operand.span);
                return Ok(Expression::new(
                    ExpressionKind::Await(Box::new(operand)),
                    span,
                ));
            }
            TokenKind::LParen => return self.nested(|parser| parser.parse_grouping()),
            TokenKind::LBracket => return self.nested(|parser| parser.parse_array_literal()),
            TokenKind::LBrace => return self.nested(|parser| parser.parse_brace_literal()),
            TokenKind::Keyword(Keyword::Func | Keyword::Function)
                if matches!(self.peek_kind_at(1), Some(TokenKind::LParen)) =>
            {
                return self.nested(|parser| parser.parse_lambda());
            }
            _ => return self.fail("Expected expression"),
        };

        self.advance();
        Ok(Expression::new(kind, span))
    }

    fn parse_grouping(&mut self) -> Result<Expression> {
        let open = self.advance().clone();
        let inner = self.parse_expression()?;
        self.expect_token(TokenKind::RParen, "Expected ')' after expression")?;
        let span = self.span_since(&SourceSpan::from_token(&open));
        Ok(Expression::new(
            ExpressionKind::Grouping(Box::new(inner)),
            span,
        ))
    }

    fn parse_array_literal(&mut self) -> Result<Expression> {
        let open = self.advance().clone();
        let elements =
            self.parse_comma_separated(&TokenKind::RBracket, "Expected ']' after array elements")?;
        let span = self.span_since(&SourceSpan::from_token(&open));
        Ok(Expression::new(ExpressionKind::Array(elements), span))
    }

    /// `{` opens either a hash map or a set. The first element is parsed once;
    /// a `:` after it means hash map. `{}` is an empty set.
    fn parse_brace_literal(&mut self) -> Result<Expression> {
        let open = self.advance().clone();

        if self.match_token(&TokenKind::RBrace) {
            let span = self.span_since(&SourceSpan::from_token(&open));
            return Ok(Expression::new(ExpressionKind::Set(Vec::new()), span));
        }

        if let Some(key) = self.parse_bare_key() {
            self.advance();
            return self.finish_hash_map_literal(&open, key);
        }

        let first = self.parse_expression()?;
        if self.match_token(&TokenKind::Colon) {
            self.finish_hash_map_literal(&open, first)
        } else {
            self.finish_set_literal(&open, first)
        }
    }

    /// `name:` as a hash map key is the string `"name"`. Leaves the `:`
    /// unconsumed.
    fn parse_bare_key(&mut self) -> Option<Expression> {
        if !(self.check(&TokenKind::Identifier)
            && matches!(self.peek_kind_at(1), Some(TokenKind::Colon)))
        {
            return None;
        }
        let name = self.advance().clone();
        Some(Expression::new(
            ExpressionKind::Literal(Literal::String(name.lexeme.clone())),
            SourceSpan::from_token(&name),
        ))
    }

    /// Continues a hash map whose first key and `:` are already consumed.
    fn finish_hash_map_literal(
        &mut self,
        open: &Token,
        first_key: Expression,
    ) -> Result<Expression> {
        let first_value = self.parse_expression()?;
        let mut entries = vec![HashMapEntry {
            key: first_key,
            value: first_value,
        }];

        while self.match_token(&TokenKind::Comma) && !self.check(&TokenKind::RBrace) {
            let key = match self.parse_bare_key() {
                Some(key) => key,
                None => self.parse_expression()?,
            };
            self.expect_token(TokenKind::Colon, "Expected ':' after hash map key")?;
            let value = self.parse_expression()?;
            entries.push(HashMapEntry { key, value });
        }

        self.expect_token(TokenKind::RBrace, "Expected '}' after hash map entries")?;
        let span = self.span_since(&SourceSpan::from_token(open));
        Ok(Expression::new(ExpressionKind::HashMap(entries), span))
    }

    /// Continues a set whose first element is already consumed.
    fn finish_set_literal(&mut self, open: &Token, first: Expression) -> Result<Expression> {
        let mut elements = vec![first];
        while self.match_token(&TokenKind::Comma) && !self.check(&TokenKind::RBrace) {
            elements.push(self.parse_expression()?);
        }

        self.expect_token(TokenKind::RBrace, "Expected '}' after set elements")?;
        let span = self.span_since(&SourceSpan::from_token(open));
        Ok(Expression::new(ExpressionKind::Set(elements), span))
    }

    /// `func (params) [-> Type]: body end`
    fn parse_lambda(&mut self) -> Result<Expression> {
        let keyword = self.advance().clone();
        let parameters = self.parse_parameters()?;
        let return_type = if self.match_token(&TokenKind::Arrow) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        self.expect_token(TokenKind::Colon, "Expected ':' after lambda signature")?;
        let body = self.parse_block_until(&[Keyword::End]);
        self.expect_keyword(Keyword::End, "Expected 'end' to close lambda")?;

        let span = self.span_since(&SourceSpan::from_token(&keyword));
        Ok(Expression::new(
            ExpressionKind::Lambda(LambdaExpression {
                parameters,
                return_type,
                body,
            }),
            span,
        ))
    }

    /// Elements up to `closing`, which is consumed. A trailing comma is allowed.
    fn parse_comma_separated(
        &mut self,
        closing: &TokenKind,
        message: &str,
    ) -> Result<Vec<Expression>> {
        let mut elements = Vec::new();
        while !self.check(closing) && !self.is_at_end() {
            elements.push(self.parse_expression()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(closing.clone(), message)?;
        Ok(elements)
    }

    fn finish_call(&mut self, callee: Expression) -> Result<Expression> {
        self.advance();
        let arguments =
            self.parse_comma_separated(&TokenKind::RParen, "Expected ')' after arguments")?;
        let span = self.span_since(&callee.span);
        Ok(Expression::new(
            ExpressionKind::Call(CallExpression {
                callee: Box::new(callee),
                arguments,
            }),
            span,
        ))
    }

    fn finish_index(&mut self, object: Expression) -> Result<Expression> {
        self.advance();
        let index = self.parse_expression()?;
        self.expect_token(TokenKind::RBracket, "Expected ']' after index expression")?;
        let span = self.span_since(&object.span);
        Ok(Expression::new(
            ExpressionKind::Index(IndexExpression {
                object: Box::new(object),
                index: Box::new(index),
            }),
            span,
        ))
    }

    fn finish_member(&mut self, object: Expression) -> Result<Expression> {
        self.advance();
        let name_token = self.peek().clone();
        let property = match name_token.kind {
            TokenKind::Identifier | TokenKind::Keyword(_) => {
                self.advance();
                name_token.lexeme.clone()
            }
            _ => return self.fail("Expected property name after '.'"),
        };

        let property_span = SourceSpan::from_token(&name_token);
        let span = SourceSpan::union(&object.span, &property_span);
        Ok(Expression::new(
            ExpressionKind::Member(MemberExpression {
                object: Box::new(object),
                property,
                property_span,
            }),
            span,
        ))
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    let span = SourceSpan::union(&left.span, &right.span);
    Expression::new(
        ExpressionKind::Binary(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }),
        span,
    )
}
