use std::sync::Arc;

use crate::{ast::Location, error::StaticError};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords.
    Local,
    Function,
    If,
    Then,
    Else,
    ErrorKeyword,
    True,
    False,
    Null,
    // Literals and names.
    Identifier(Arc<str>),
    Number(f64),
    Str(Arc<str>),
    // Operators and punctuation.
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqualEqual,
    BangEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    AmpAmp,
    PipePipe,
    Bang,
    Equal,
    Semicolon,
    Comma,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
}

/// A token plus the 1-based line and column it started at.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

pub struct Tokenizer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    origin: Arc<str>,
    errored: bool,
}

impl Tokenizer {
    pub fn new(source: &str, origin: Arc<str>) -> Self {
        Tokenizer {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            origin,
            errored: false,
        }
    }

    /// Tokenizes the whole input, stopping at the first error.
    pub fn tokenize(source: &str, origin: Arc<str>) -> Result<Vec<PositionedToken>, StaticError> {
        let mut tokens: Vec<PositionedToken> = Vec::new();
        for token in Tokenizer::new(source, origin) {
            tokens.push(token?);
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn here(&self) -> Location {
        Location::new(self.origin.clone(), self.line, self.column)
    }

    fn error_at<T: Into<String>>(&self, message: T, location: Location) -> StaticError {
        StaticError::new(message, location)
    }

    /// Skips whitespace, `#` and `//` line comments, and `/* */` block
    /// comments. Returns an error only for an unterminated block comment.
    fn chomp_insignificant(&mut self) -> Result<(), StaticError> {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('#') => self.chomp_line_comment(),
                Some('/') if self.peek_at(1) == Some('/') => self.chomp_line_comment(),
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.here();
                    self.advance();
                    self.advance();
                    loop {
                        if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        if self.advance().is_none() {
                            return Err(self.error_at("unterminated block comment", start));
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn chomp_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn chomp_number(&mut self) -> Result<Token, StaticError> {
        let start = self.here();
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') {
            if !self.peek_at(1).is_some_and(|ch| ch.is_ascii_digit()) {
                return Err(self.error_at(
                    format!("malformed number \"{}.\"", text),
                    start,
                ));
            }
            text.push('.');
            self.advance();
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() {
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if self.peek() == Some('e') || self.peek() == Some('E') {
            let mut exponent = String::from("e");
            let mut offset = 1;
            if let Some(sign @ ('+' | '-')) = self.peek_at(1) {
                exponent.push(sign);
                offset = 2;
            }
            if self.peek_at(offset).is_some_and(|ch| ch.is_ascii_digit()) {
                for _ in 0..offset {
                    self.advance();
                }
                while let Some(ch) = self.peek() {
                    if ch.is_ascii_digit() {
                        exponent.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
                text.push_str(&exponent);
            }
        }
        match text.parse::<f64>() {
            Ok(number) => Ok(Token::Number(number)),
            Err(_) => Err(self.error_at(format!("malformed number \"{}\"", text), start)),
        }
    }

    fn chomp_string(&mut self) -> Result<Token, StaticError> {
        let start = self.here();
        self.advance(); // Opening quote.
        let mut value = String::new();
        loop {
            match self.advance() {
                None | Some('\n') => {
                    return Err(self.error_at("unterminated string literal", start));
                }
                Some('"') => return Ok(Token::Str(value.into())),
                Some('\\') => match self.advance() {
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => {
                        return Err(self.error_at(
                            format!("invalid escape sequence \\{}", other),
                            start,
                        ));
                    }
                    None => {
                        return Err(self.error_at("unterminated string literal", start));
                    }
                },
                Some(other) => value.push(other),
            }
        }
    }

    fn chomp_word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        match word.as_str() {
            "local" => Token::Local,
            "function" => Token::Function,
            "if" => Token::If,
            "then" => Token::Then,
            "else" => Token::Else,
            "error" => Token::ErrorKeyword,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => Token::Identifier(word.into()),
        }
    }

    fn chomp_operator(&mut self) -> Result<Token, StaticError> {
        let location = self.here();
        let first = self
            .advance()
            .expect("chomp_operator called at end of input");
        let followed_by_equal = self.peek() == Some('=');
        let token = match first {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            '=' if followed_by_equal => {
                self.advance();
                Token::EqualEqual
            }
            '=' => Token::Equal,
            '!' if followed_by_equal => {
                self.advance();
                Token::BangEqual
            }
            '!' => Token::Bang,
            '<' if followed_by_equal => {
                self.advance();
                Token::LessThanOrEqual
            }
            '<' => Token::LessThan,
            '>' if followed_by_equal => {
                self.advance();
                Token::GreaterThanOrEqual
            }
            '>' => Token::GreaterThan,
            '&' if self.peek() == Some('&') => {
                self.advance();
                Token::AmpAmp
            }
            '|' if self.peek() == Some('|') => {
                self.advance();
                Token::PipePipe
            }
            other => {
                return Err(self.error_at(format!("unexpected character '{}'", other), location));
            }
        };
        Ok(token)
    }

    fn chomp_next_token(&mut self) -> Result<PositionedToken, StaticError> {
        let line = self.line;
        let column = self.column;
        let ch = self.peek().expect("chomp_next_token called at end of input");
        let token = if ch.is_ascii_digit() {
            self.chomp_number()?
        } else if ch == '"' {
            self.chomp_string()?
        } else if ch.is_ascii_alphabetic() || ch == '_' {
            self.chomp_word()
        } else {
            self.chomp_operator()?
        };
        Ok(PositionedToken {
            token,
            line,
            column,
        })
    }
}

impl Iterator for Tokenizer {
    type Item = Result<PositionedToken, StaticError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }

        if let Err(err) = self.chomp_insignificant() {
            self.errored = true;
            return Some(Err(err));
        }

        self.peek()?;

        let result = self.chomp_next_token();

        if result.is_err() {
            self.errored = true;
        }

        Some(result)
    }
}
