use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::ast::*;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::lexer::{Keyword, Token, TokenKind};
use crate::source::SourceFile;

mod expressions;
mod patterns;
mod statements;
mod types;

/// Failed statements in a row before the parser skips a token on its own.
const MAX_CONSECUTIVE_FAILURES: usize = 10;

pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub max_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Summary of the syntax errors seen so far. `message` is the most recent
/// one, verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseErrorRecord {
    pub count: usize,
    pub message: Option<String>,
    pub line: usize,
    pub column: usize,
}

impl ParseErrorRecord {
    pub fn has_errors(&self) -> bool {
        self.count > 0
    }
}

pub struct Parser<'a> {
    source: &'a SourceFile,
    tokens: Vec<Token>,
    current: usize,
    diagnostics: Diagnostics,
    errors: ParseErrorRecord,
    depth: usize,
    options: ParserOptions,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a SourceFile, tokens: Vec<Token>) -> Self {
        Self::with_options(source, tokens, ParserOptions::default())
    }

    pub fn with_options(source: &'a SourceFile, mut tokens: Vec<Token>, options: ParserOptions) -> Self {
        if !matches!(tokens.last().map(|token| &token.kind), Some(TokenKind::Eof)) {
            let (line, column) = tokens
                .last()
                .map(|token| (token.line, token.column + token.lexeme.chars().count()))
                .unwrap_or((1, 1));
            tokens.push(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                line,
                column,
            });
        }

        Self {
            source,
            tokens,
            current: 0,
            diagnostics: Diagnostics::new(),
            errors: ParseErrorRecord::default(),
            depth: 0,
            options,
        }
    }

    /// Parses the whole token stream. Syntax errors are recorded and skipped
    /// over, so this always yields a block of every statement that parsed.
    pub fn parse_program(&mut self) -> Block {
        debug!(
            path = %self.source.path.display(),
            tokens = self.tokens.len(),
            "parsing program"
        );
        let block = self.parse_block_until(&[]);
        debug!(
            statements = block.len(),
            errors = self.errors.count,
            "finished parsing"
        );
        block
    }

    pub fn error_record(&self) -> &ParseErrorRecord {
        &self.errors
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Statements up to (not including) one of `terminators` or end of input.
    fn parse_block_until(&mut self, terminators: &[Keyword]) -> Block {
        let mut statements = Vec::new();
        let mut failures = 0usize;

        loop {
            self.skip_semicolons();
            if self.is_at_end()
                || self
                    .peek_keyword()
                    .map(|keyword| terminators.contains(&keyword))
                    .unwrap_or(false)
            {
                break;
            }

            match self.parse_statement() {
                Ok(statement) => {
                    statements.push(statement);
                    failures = 0;
                }
                Err(_) => {
                    self.synchronize();
                    failures += 1;
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        warn!(
                            line = self.peek().line,
                            column = self.peek().column,
                            "too many consecutive parse failures; skipping a token"
                        );
                        self.advance();
                        failures = 0;
                    }
                }
            }
        }

        Block::new(statements)
    }

    /// Skips ahead to a likely statement boundary after a syntax error.
    fn synchronize(&mut self) {
        trace!(
            line = self.peek().line,
            column = self.peek().column,
            "synchronizing"
        );
        self.advance();
        while !self.is_at_end() {
            if matches!(
                self.previous().kind,
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket
            ) {
                return;
            }
            if starts_statement(self.peek_kind()) {
                return;
            }
            self.advance();
        }
    }

    /// Handles the `;` that ends a simple statement. The statement is kept
    /// even when the semicolon is missing.
    fn finish_simple_statement(&mut self) {
        if self.match_token(&TokenKind::Semicolon) {
            return;
        }
        if ends_block_implicitly(self.peek_kind()) {
            return;
        }

        let previous_line = self.previous().line;
        let next = self.peek().clone();
        self.report_at(&next, "Missing semicolon (;) at end of statement");

        if next.line > previous_line || starts_statement(&next.kind) {
            return;
        }
        self.synchronize();
    }

    /// Runs `parse` one nesting level deeper, failing once the configured
    /// maximum depth is reached.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.options.max_depth {
            return self.fail("Maximum nesting depth exceeded");
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn report_at(&mut self, token: &Token, message: &str) -> anyhow::Error {
        let found = if matches!(token.kind, TokenKind::Eof) {
            "end of file".to_string()
        } else {
            token.lexeme.clone()
        };
        let message = format!("{message} (found '{found}')");
        let span = SourceSpan::from_token(token);

        self.errors.count += 1;
        self.errors.message = Some(message.clone());
        self.errors.line = token.line;
        self.errors.column = token.column;
        self.diagnostics
            .push_error_with_span(DiagnosticKind::Syntax, message.clone(), Some(span));

        anyhow!(
            "Parse Error at Line {}, Column {}: {}",
            token.line,
            token.column,
            message
        )
    }

    fn fail<T>(&mut self, message: &str) -> Result<T> {
        let token = self.peek().clone();
        Err(self.report_at(&token, message))
    }

    fn expect_token(&mut self, expected: TokenKind, message: &str) -> Result<Token> {
        if std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(&expected) {
            Ok(self.advance().clone())
        } else {
            self.fail(message)
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, message: &str) -> Result<Token> {
        if self.check_keyword(keyword) {
            Ok(self.advance().clone())
        } else {
            self.fail(message)
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<Token> {
        self.expect_token(TokenKind::Identifier, message)
    }

    /// Consumes the `end` that closes a block construct. A missing `end` is
    /// reported and the construct is kept.
    fn close_block(&mut self, construct: &str) {
        if self.check_keyword(Keyword::End) {
            self.advance();
            return;
        }
        let token = self.peek().clone();
        self.report_at(&token, &format!("Expected 'end' to close {construct}"));
        self.synchronize();
    }

    fn span_since(&self, start: &SourceSpan) -> SourceSpan {
        SourceSpan::union(start, &SourceSpan::from_token(self.previous()))
    }

    fn skip_semicolons(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.peek_keyword(), Some(kw) if kw == keyword)
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.peek_kind() {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.current].kind
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens
            .get(self.current + offset)
            .map(|token| &token.kind)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }
}

/// Tokens that may follow a simple statement in place of its `;`.
fn ends_block_implicitly(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Eof
            | TokenKind::Keyword(
                Keyword::End
                    | Keyword::Else
                    | Keyword::Catch
                    | Keyword::Finally
                    | Keyword::Case
                    | Keyword::Root
            )
    )
}

fn starts_statement(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Keyword(
            Keyword::Let
                | Keyword::Const
                | Keyword::If
                | Keyword::Else
                | Keyword::While
                | Keyword::For
                | Keyword::Func
                | Keyword::Function
                | Keyword::Async
                | Keyword::Class
                | Keyword::Return
                | Keyword::Break
                | Keyword::Continue
                | Keyword::Use
                | Keyword::Try
                | Keyword::Match
                | Keyword::Spore
                | Keyword::Throw
                | Keyword::End
        )
    )
}
