use anyhow::Result;

use super::Parser;
use crate::ast::*;
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    pub(super) fn parse_statement(&mut self) -> Result<Statement> {
        self.nested(|parser| parser.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> Result<Statement> {
        let start = SourceSpan::from_token(self.peek());
        let kind = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Let) => self.parse_let(false)?,
            TokenKind::Keyword(Keyword::Const) => self.parse_let(true)?,
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::Func | Keyword::Function)
                if !matches!(self.peek_kind_at(1), Some(TokenKind::LParen)) =>
            {
                StatementKind::Function(self.parse_function(false)?)
            }
            TokenKind::Keyword(Keyword::Async) => {
                self.advance();
                if !matches!(self.peek_keyword(), Some(Keyword::Func | Keyword::Function)) {
                    return self.fail("Expected 'func' after 'async'");
                }
                StatementKind::Function(self.parse_function(true)?)
            }
            TokenKind::Keyword(Keyword::Class) => self.parse_class()?,
            TokenKind::Keyword(Keyword::Match) => self.parse_match(MatchKind::Match)?,
            TokenKind::Keyword(Keyword::Spore) => self.parse_match(MatchKind::Spore)?,
            TokenKind::Keyword(Keyword::Try) => self.parse_try()?,
            TokenKind::Keyword(Keyword::Throw) => {
                self.advance();
                let value = self.parse_expression()?;
                self.finish_simple_statement();
                StatementKind::Throw(value)
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let value = if self.check(&TokenKind::Semicolon)
                    || super::ends_block_implicitly(self.peek_kind())
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.finish_simple_statement();
                StatementKind::Return(value)
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.finish_simple_statement();
                StatementKind::Break
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.finish_simple_statement();
                StatementKind::Continue
            }
            TokenKind::Keyword(Keyword::Use) => self.parse_use()?,
            _ => self.parse_expression_statement()?,
        };

        Ok(Statement {
            span: self.span_since(&start),
            kind,
        })
    }

    /// `let name [: Type] = value` or the `const` form.
    fn parse_let(&mut self, is_const: bool) -> Result<StatementKind> {
        self.advance();
        let name = self.expect_identifier("Expected variable name")?;
        let type_annotation = if self.match_token(&TokenKind::Colon) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        self.expect_token(TokenKind::Equal, "Expected '=' after variable name")?;
        let initializer = self.parse_expression()?;
        self.finish_simple_statement();

        Ok(StatementKind::Let(LetStatement {
            name_span: SourceSpan::from_token(&name),
            name: name.lexeme,
            is_const,
            type_annotation,
            initializer,
        }))
    }

    fn parse_if(&mut self) -> Result<StatementKind> {
        let statement = self.parse_if_chain()?;
        self.close_block("if statement");
        Ok(statement)
    }

    /// `if cond: ...` plus any `else if` / `else` branches, closed by a
    /// single `end`. The chain is collected in a loop so its length does not
    /// count against the nesting limit.
    fn parse_if_chain(&mut self) -> Result<StatementKind> {
        self.advance();
        let condition = self.parse_expression()?;
        self.expect_token(TokenKind::Colon, "Expected ':' after if condition")?;
        let consequent = self.parse_block_until(&[Keyword::Else, Keyword::End]);

        let mut links = Vec::new();
        let mut alternative = None;
        while self.match_keyword(Keyword::Else) {
            if self.check_keyword(Keyword::If) {
                let start = SourceSpan::from_token(self.advance());
                let condition = self.parse_expression()?;
                self.expect_token(TokenKind::Colon, "Expected ':' after if condition")?;
                let consequent = self.parse_block_until(&[Keyword::Else, Keyword::End]);
                links.push((start, condition, consequent));
            } else {
                self.expect_token(TokenKind::Colon, "Expected ':' after else")?;
                alternative = Some(ElseBranch::Else(self.parse_block_until(&[Keyword::End])));
                break;
            }
        }

        for (start, condition, consequent) in links.into_iter().rev() {
            let span = self.span_since(&start);
            let kind = StatementKind::If(IfStatement {
                condition,
                consequent,
                alternative,
            });
            alternative = Some(ElseBranch::ElseIf(Box::new(Statement { span, kind })));
        }

        Ok(StatementKind::If(IfStatement {
            condition,
            consequent,
            alternative,
        }))
    }

    fn parse_while(&mut self) -> Result<StatementKind> {
        self.advance();
        let condition = self.parse_expression()?;
        self.expect_token(TokenKind::Colon, "Expected ':' after while condition")?;
        let body = self.parse_block_until(&[Keyword::End]);
        self.close_block("while loop");
        Ok(StatementKind::While(WhileStatement { condition, body }))
    }

    fn parse_for(&mut self) -> Result<StatementKind> {
        self.advance();
        let variable = self.expect_identifier("Expected loop variable after 'for'")?;
        self.expect_keyword(Keyword::In, "Expected 'in' after loop variable")?;
        let iterable = self.parse_expression()?;
        self.expect_token(TokenKind::Colon, "Expected ':' after for loop header")?;
        let body = self.parse_block_until(&[Keyword::End]);
        self.close_block("for loop");
        Ok(StatementKind::For(ForStatement {
            variable_span: SourceSpan::from_token(&variable),
            variable: variable.lexeme,
            iterable,
            body,
        }))
    }

    /// `func name(params) [-> Type]: body end`. The cursor is on `func`.
    fn parse_function(&mut self, is_async: bool) -> Result<FunctionStatement> {
        self.advance();
        let name = self.expect_identifier("Expected function name")?;
        let parameters = self.parse_parameters()?;
        let return_type = if self.match_token(&TokenKind::Arrow) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        self.expect_token(TokenKind::Colon, "Expected ':' after function signature")?;
        let body = self.parse_block_until(&[Keyword::End]);
        self.close_block("function");

        Ok(FunctionStatement {
            name_span: SourceSpan::from_token(&name),
            name: name.lexeme,
            is_async,
            parameters,
            return_type,
            body,
        })
    }

    pub(super) fn parse_parameters(&mut self) -> Result<Vec<FunctionParameter>> {
        self.expect_token(TokenKind::LParen, "Expected '(' before parameters")?;
        let mut parameters = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            let name = self.expect_identifier("Expected parameter name")?;
            let type_annotation = if self.match_token(&TokenKind::Colon) {
                Some(self.parse_type_annotation()?)
            } else {
                None
            };
            parameters.push(FunctionParameter {
                span: SourceSpan::from_token(&name),
                name: name.lexeme,
                type_annotation,
            });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_token(TokenKind::RParen, "Expected ')' after parameters")?;
        Ok(parameters)
    }

    fn parse_class(&mut self) -> Result<StatementKind> {
        self.advance();
        let name = self.expect_identifier("Expected class name")?;
        let parent = if self.match_keyword(Keyword::Extends) {
            Some(
                self.expect_identifier("Expected parent class name after 'extends'")?
                    .lexeme,
            )
        } else {
            None
        };
        self.expect_token(TokenKind::Colon, "Expected ':' after class name")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        loop {
            self.skip_semicolons();
            if self.is_at_end() || self.check_keyword(Keyword::End) {
                break;
            }

            let member = match self.peek_keyword() {
                Some(Keyword::Let) => self.parse_class_field().map(|field| fields.push(field)),
                Some(Keyword::Func | Keyword::Function) => self
                    .nested(|parser| parser.parse_function(false))
                    .map(|method| methods.push(method)),
                Some(Keyword::Async) => {
                    self.advance();
                    self.nested(|parser| parser.parse_function(true))
                        .map(|method| methods.push(method))
                }
                _ => self.fail("Expected field or method in class body"),
            };
            if member.is_err() {
                self.synchronize();
            }
        }
        self.close_block("class");

        Ok(StatementKind::Class(ClassStatement {
            name_span: SourceSpan::from_token(&name),
            name: name.lexeme,
            parent,
            fields,
            methods,
        }))
    }

    /// `let name: Type`, `let name = value` or both. The `;` is optional.
    fn parse_class_field(&mut self) -> Result<ClassField> {
        self.advance();
        let name = self.expect_identifier("Expected field name")?;
        let type_annotation = if self.match_token(&TokenKind::Colon) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let default_value = if self.match_token(&TokenKind::Equal) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.match_token(&TokenKind::Semicolon);

        Ok(ClassField {
            span: SourceSpan::from_token(&name),
            name: name.lexeme,
            type_annotation,
            default_value,
        })
    }

    /// `match` and `spore` share a body of `case` arms. The default arm is
    /// `else` for match and `root` for spore.
    fn parse_match(&mut self, kind: MatchKind) -> Result<StatementKind> {
        self.advance();
        let subject = self.parse_expression()?;
        let keyword_name = match kind {
            MatchKind::Match => "match",
            MatchKind::Spore => "spore",
        };
        self.expect_token(
            TokenKind::Colon,
            &format!("Expected ':' after {keyword_name} expression"),
        )?;

        let default_keyword = match kind {
            MatchKind::Match => Keyword::Else,
            MatchKind::Spore => Keyword::Root,
        };

        let mut arms = Vec::new();
        let mut default = None;
        loop {
            self.skip_semicolons();
            if self.is_at_end() || self.check_keyword(Keyword::End) {
                break;
            }

            let arm = if self.check_keyword(Keyword::Case) {
                self.parse_case_arm(default_keyword)
                    .map(|arm| arms.push(arm))
            } else if self.match_keyword(default_keyword) {
                self.parse_arm_body(default_keyword)
                    .map(|body| default = Some(body))
            } else {
                let default_name = match kind {
                    MatchKind::Match => "else",
                    MatchKind::Spore => "root",
                };
                self.fail(&format!(
                    "Expected 'case' or '{default_name}' in {keyword_name} body"
                ))
            };
            if arm.is_err() {
                self.synchronize();
            }
        }
        self.close_block(&format!("{keyword_name} statement"));

        Ok(StatementKind::Match(MatchStatement {
            kind,
            subject,
            arms,
            default,
        }))
    }

    fn parse_case_arm(&mut self, default_keyword: Keyword) -> Result<MatchArm> {
        let start = SourceSpan::from_token(self.advance());
        let pattern = self.nested(|parser| parser.parse_pattern())?;
        let body = self.parse_arm_body(default_keyword)?;
        Ok(MatchArm {
            pattern,
            body,
            span: self.span_since(&start),
        })
    }

    /// `=> expression` or `: statements`.
    fn parse_arm_body(&mut self, default_keyword: Keyword) -> Result<ArmBody> {
        if self.match_token(&TokenKind::FatArrow) {
            let value = self.parse_expression()?;
            self.match_token(&TokenKind::Semicolon);
            Ok(ArmBody::Expression(value))
        } else if self.match_token(&TokenKind::Colon) {
            Ok(ArmBody::Block(self.parse_block_until(&[
                Keyword::Case,
                default_keyword,
                Keyword::End,
            ])))
        } else {
            self.fail("Expected '=>' or ':' after case pattern")
        }
    }

    /// `try: ... catch name: ... finally: ... end`
    fn parse_try(&mut self) -> Result<StatementKind> {
        self.advance();
        self.expect_token(TokenKind::Colon, "Expected ':' after 'try'")?;
        let body = self.parse_block_until(&[Keyword::Catch, Keyword::Finally, Keyword::End]);

        let mut catch_variable = None;
        let mut catch_body = None;
        if self.match_keyword(Keyword::Catch) {
            if self.check(&TokenKind::Identifier) {
                catch_variable = Some(self.advance().lexeme.clone());
            }
            self.expect_token(TokenKind::Colon, "Expected ':' after catch clause")?;
            catch_body = Some(self.parse_block_until(&[Keyword::Finally, Keyword::End]));
        }

        let finally_body = if self.match_keyword(Keyword::Finally) {
            self.expect_token(TokenKind::Colon, "Expected ':' after 'finally'")?;
            Some(self.parse_block_until(&[Keyword::End]))
        } else {
            None
        };
        self.close_block("try statement");

        Ok(StatementKind::Try(TryStatement {
            body,
            catch_variable,
            catch_body,
            finally_body,
        }))
    }

    /// `use lib [as alias]` or `use a, b from lib [as x, y]`.
    fn parse_use(&mut self) -> Result<StatementKind> {
        self.advance();
        let first = self.parse_use_name()?;

        let (library, library_span, items) =
            if self.check(&TokenKind::Comma) || self.check_keyword(Keyword::From) {
                let mut items = vec![first.0];
                while self.match_token(&TokenKind::Comma) {
                    items.push(self.parse_use_name()?.0);
                }
                self.expect_keyword(Keyword::From, "Expected 'from' after imported names")?;
                let (library, span) = self.parse_use_name()?;
                (library, span, items)
            } else {
                (first.0, first.1, Vec::new())
            };

        let mut aliases = Vec::new();
        if self.match_keyword(Keyword::As) {
            loop {
                aliases.push(self.expect_identifier("Expected alias after 'as'")?.lexeme);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.finish_simple_statement();

        Ok(StatementKind::Use(UseStatement {
            library,
            library_span,
            items,
            aliases,
        }))
    }

    fn parse_use_name(&mut self) -> Result<(String, SourceSpan)> {
        let token = self.peek().clone();
        let name = match &token.kind {
            TokenKind::Identifier => token.lexeme.clone(),
            TokenKind::StringLiteral(path) => path.clone(),
            _ => return self.fail("Expected library name after 'use'"),
        };
        self.advance();
        Ok((name, SourceSpan::from_token(&token)))
    }

    /// An expression, or an assignment when followed by `=` or `op=`.
    fn parse_expression_statement(&mut self) -> Result<StatementKind> {
        let mut expression = self.parse_expression()?;

        if let Some(operator) = assignment_operator(self.peek_kind()) {
            if !is_assignable(&expression) {
                return self.fail("Invalid assignment target");
            }
            self.advance();
            let value = self.parse_expression()?;
            let span = SourceSpan::union(&expression.span, &value.span);
            expression = Expression::new(
                ExpressionKind::Assignment(AssignmentExpression {
                    target: Box::new(expression),
                    operator,
                    value: Box::new(value),
                }),
                span,
            );
        }

        self.finish_simple_statement();
        Ok(StatementKind::Expression(expression))
    }
}

/// `Some(None)` for plain `=`, `Some(Some(op))` for compound forms.
fn assignment_operator(kind: &TokenKind) -> Option<Option<BinaryOperator>> {
    match kind {
        TokenKind::Equal => Some(None),
        TokenKind::PlusEqual => Some(Some(BinaryOperator::Add)),
        TokenKind::MinusEqual => Some(Some(BinaryOperator::Subtract)),
        TokenKind::StarEqual => Some(Some(BinaryOperator::Multiply)),
        TokenKind::SlashEqual => Some(Some(BinaryOperator::Divide)),
        _ => None,
    }
}

fn is_assignable(expression: &Expression) -> bool {
    matches!(
        expression.kind,
        ExpressionKind::Identifier(_) | ExpressionKind::Member(_) | ExpressionKind::Index(_)
    )
}
