use thiserror::Error;

use crate::source::SourceFile;

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Self {
            kind,
            lexeme,
            line,
            column,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.kind, TokenKind::Keyword(found) if found == keyword)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    Number(f64),
    StringLiteral(String),
    BooleanLiteral(bool),
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    DotDot,
    DotDotDot,
    Colon,
    Semicolon,
    Equal,
    DoubleEqual,
    Bang,
    BangEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Plus,
    PlusEqual,
    Minus,
    MinusEqual,
    Star,
    StarStar,
    StarEqual,
    Slash,
    SlashEqual,
    Percent,
    Pipe,
    Ampersand,
    Arrow,    // ->
    FatArrow, // =>
    Question,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Let,
    Const,
    If,
    Else,
    While,
    For,
    In,
    Func,
    Function,
    Class,
    Extends,
    SelfValue,
    Super,
    Return,
    Break,
    Continue,
    Async,
    Await,
    Match,
    Case,
    Spore,
    Root,
    Try,
    Catch,
    Finally,
    Throw,
    End,
    Use,
    From,
    As,
    When,
    And,
    Or,
    Not,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexerError {
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("Invalid number literal '{lexeme}' at line {line}, column {column}")]
    InvalidNumber {
        lexeme: String,
        line: usize,
        column: usize,
    },
}

impl LexerError {
    pub fn line(&self) -> usize {
        match self {
            LexerError::UnexpectedCharacter { line, .. }
            | LexerError::UnterminatedString { line, .. }
            | LexerError::InvalidNumber { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            LexerError::UnexpectedCharacter { column, .. }
            | LexerError::UnterminatedString { column, .. }
            | LexerError::InvalidNumber { column, .. } => *column,
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceFile) -> Self {
        Self::from_text(&source.contents)
    }

    pub fn from_text(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance_char();
                }
                '#' => self.skip_comment(),
                '/' if self.peek_next_char() == Some('/') => self.skip_comment(),
                '"' | '\'' => tokens.push(self.lex_string(ch)?),
                '0'..='9' => tokens.push(self.lex_number()?),
                'a'..='z' | 'A'..='Z' | '_' => tokens.push(self.lex_identifier_or_keyword()),
                '(' => tokens.push(self.simple_token(TokenKind::LParen)),
                ')' => tokens.push(self.simple_token(TokenKind::RParen)),
                '{' => tokens.push(self.simple_token(TokenKind::LBrace)),
                '}' => tokens.push(self.simple_token(TokenKind::RBrace)),
                '[' => tokens.push(self.simple_token(TokenKind::LBracket)),
                ']' => tokens.push(self.simple_token(TokenKind::RBracket)),
                ',' => tokens.push(self.simple_token(TokenKind::Comma)),
                ';' => tokens.push(self.simple_token(TokenKind::Semicolon)),
                ':' => tokens.push(self.simple_token(TokenKind::Colon)),
                '%' => tokens.push(self.simple_token(TokenKind::Percent)),
                '|' => tokens.push(self.simple_token(TokenKind::Pipe)),
                '&' => tokens.push(self.simple_token(TokenKind::Ampersand)),
                '?' => tokens.push(self.simple_token(TokenKind::Question)),
                '.' => tokens.push(self.lex_dot_variants()),
                '=' => tokens.push(self.lex_with_followers(
                    TokenKind::Equal,
                    &[('=', TokenKind::DoubleEqual), ('>', TokenKind::FatArrow)],
                )),
                '!' => tokens.push(
                    self.lex_with_followers(TokenKind::Bang, &[('=', TokenKind::BangEqual)]),
                ),
                '>' => tokens.push(
                    self.lex_with_followers(TokenKind::Greater, &[('=', TokenKind::GreaterEqual)]),
                ),
                '<' => tokens.push(
                    self.lex_with_followers(TokenKind::Less, &[('=', TokenKind::LessEqual)]),
                ),
                '+' => tokens.push(
                    self.lex_with_followers(TokenKind::Plus, &[('=', TokenKind::PlusEqual)]),
                ),
                '-' => tokens.push(self.lex_with_followers(
                    TokenKind::Minus,
                    &[('=', TokenKind::MinusEqual), ('>', TokenKind::Arrow)],
                )),
                '*' => tokens.push(self.lex_with_followers(
                    TokenKind::Star,
                    &[('*', TokenKind::StarStar), ('=', TokenKind::StarEqual)],
                )),
                '/' => tokens.push(
                    self.lex_with_followers(TokenKind::Slash, &[('=', TokenKind::SlashEqual)]),
                ),
                other => {
                    return Err(LexerError::UnexpectedCharacter {
                        character: other,
                        line: self.line,
                        column: self.column,
                    });
                }
            }
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.line,
            self.column,
        ));

        Ok(tokens)
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, LexerError> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char(); // opening quote

        let unterminated = LexerError::UnterminatedString {
            line: start_line,
            column: start_column,
        };

        let mut value = String::new();
        while let Some(ch) = self.peek_char() {
            match ch {
                c if c == quote => {
                    self.advance_char();
                    let lexeme = self.slice(start, self.position).to_string();
                    return Ok(Token::new(
                        TokenKind::StringLiteral(value),
                        lexeme,
                        start_line,
                        start_column,
                    ));
                }
                '\\' => {
                    self.advance_char();
                    let escaped = self.advance_char().ok_or_else(|| unterminated.clone())?;
                    value.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    });
                }
                '\n' => return Err(unterminated),
                _ => {
                    value.push(ch);
                    self.advance_char();
                }
            }
        }

        Err(unterminated)
    }

    fn lex_number(&mut self) -> Result<Token, LexerError> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        let mut seen_dot = false;

        self.advance_char();
        while let Some(ch) = self.peek_char() {
            match ch {
                '0'..='9' | '_' => {
                    self.advance_char();
                }
                // `1..5` is a range, not a float
                '.' if !seen_dot && matches!(self.peek_next_char(), Some('0'..='9')) => {
                    seen_dot = true;
                    self.advance_char();
                }
                _ => break,
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        let value = lexeme
            .replace('_', "")
            .parse::<f64>()
            .map_err(|_| LexerError::InvalidNumber {
                lexeme: lexeme.clone(),
                line: start_line,
                column: start_column,
            })?;

        Ok(Token::new(
            TokenKind::Number(value),
            lexeme,
            start_line,
            start_column,
        ))
    }

    fn lex_identifier_or_keyword(&mut self) -> Token {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char();

        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        let kind = match lexeme.as_str() {
            "true" | "True" => TokenKind::BooleanLiteral(true),
            "false" | "False" => TokenKind::BooleanLiteral(false),
            other => keyword_from_lexeme(other)
                .map(TokenKind::Keyword)
                .unwrap_or(TokenKind::Identifier),
        };
        Token::new(kind, lexeme, start_line, start_column)
    }

    fn lex_dot_variants(&mut self) -> Token {
        let start_line = self.line;
        let start_column = self.column;
        let start = self.position;
        self.advance_char();

        let mut kind = TokenKind::Dot;
        if self.peek_char() == Some('.') {
            self.advance_char();
            kind = TokenKind::DotDot;
            if self.peek_char() == Some('.') {
                self.advance_char();
                kind = TokenKind::DotDotDot;
            }
        }

        Token::new(
            kind,
            self.slice(start, self.position).to_string(),
            start_line,
            start_column,
        )
    }

    /// Lexes a one-character operator that may extend into a two-character
    /// form when followed by one of `followers`.
    fn lex_with_followers(&mut self, single: TokenKind, followers: &[(char, TokenKind)]) -> Token {
        let start_line = self.line;
        let start_column = self.column;
        let start = self.position;
        self.advance_char();

        let next = self.peek_char();
        let kind = match followers.iter().find(|(ch, _)| Some(*ch) == next) {
            Some((_, kind)) => {
                self.advance_char();
                kind.clone()
            }
            None => single,
        };

        Token::new(
            kind,
            self.slice(start, self.position).to_string(),
            start_line,
            start_column,
        )
    }

    fn simple_token(&mut self, kind: TokenKind) -> Token {
        self.lex_with_followers(kind, &[])
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.input[self.position..].chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else if ch != '\r' {
            self.column += 1;
        }
        Some(ch)
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.input[start..end]
    }
}

fn keyword_from_lexeme(lexeme: &str) -> Option<Keyword> {
    match lexeme {
        "let" => Some(Keyword::Let),
        "const" => Some(Keyword::Const),
        "if" => Some(Keyword::If),
        "else" => Some(Keyword::Else),
        "while" => Some(Keyword::While),
        "for" => Some(Keyword::For),
        "in" => Some(Keyword::In),
        "func" => Some(Keyword::Func),
        "function" => Some(Keyword::Function),
        "class" => Some(Keyword::Class),
        "extends" => Some(Keyword::Extends),
        "self" => Some(Keyword::SelfValue),
        "super" => Some(Keyword::Super),
        "return" => Some(Keyword::Return),
        "break" => Some(Keyword::Break),
        "continue" => Some(Keyword::Continue),
        "async" => Some(Keyword::Async),
        "await" => Some(Keyword::Await),
        "match" => Some(Keyword::Match),
        "case" => Some(Keyword::Case),
        "spore" => Some(Keyword::Spore),
        "root" => Some(Keyword::Root),
        "try" => Some(Keyword::Try),
        "catch" => Some(Keyword::Catch),
        "finally" => Some(Keyword::Finally),
        "throw" => Some(Keyword::Throw),
        "end" => Some(Keyword::End),
        "use" => Some(Keyword::Use),
        "from" => Some(Keyword::From),
        "as" => Some(Keyword::As),
        "when" => Some(Keyword::When),
        "and" => Some(Keyword::And),
        "or" => Some(Keyword::Or),
        "not" => Some(Keyword::Not),
        "null" | "Null" => Some(Keyword::Null),
        _ => None,
    }
}
