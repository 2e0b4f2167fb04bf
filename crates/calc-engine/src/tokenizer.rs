//! Expression tokenizer
//!
//! Splits source text into classified tokens. The scan is lazy: the parser pulls
//! one token at a time and may snapshot the tokenizer to look ahead.

use crate::error::{CalcError, CalcResult};
use crate::options::Culture;
use calc_engine_core::Value;

/// Token identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Power,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    /// `(`
    Open,
    /// `)`
    Close,
    /// `[`
    BracketOpen,
    /// `]`
    BracketClose,
    /// `{`
    BraceOpen,
    /// `}`
    BraceClose,
    /// `.`
    Period,
    /// Culture list separator
    Comma,
    /// Literal or identifier
    Atom,
    End,
}

impl TokenKind {
    /// Closing token matching an opening group token
    pub fn closing(self) -> Option<TokenKind> {
        match self {
            TokenKind::Open => Some(TokenKind::Close),
            TokenKind::BracketOpen => Some(TokenKind::BracketClose),
            TokenKind::BraceOpen => Some(TokenKind::BraceClose),
            _ => None,
        }
    }
}

/// Precedence bucket that drives parser branching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCategory {
    Logical,
    Compare,
    AddSub,
    MulDiv,
    Power,
    Group,
    Literal,
    Identifier,
}

/// A classified token with its byte span in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub category: TokenCategory,
    /// Literal value, identifier name or operator symbol
    pub value: Value,
    pub start: usize,
    pub end: usize,
}

impl Token {
    fn new(kind: TokenKind, category: TokenCategory, value: Value, start: usize, end: usize) -> Self {
        Self {
            kind,
            category,
            value,
            start,
            end,
        }
    }

    /// Identifier name, if this is an identifier token
    pub fn identifier(&self) -> Option<&str> {
        match (&self.category, &self.value) {
            (TokenCategory::Identifier, Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

/// Render `consumed[token]remaining` for syntax error messages
pub(crate) fn error_context(source: &str, start: usize, end: usize) -> String {
    let start = start.min(source.len());
    let end = end.clamp(start, source.len());
    format!("{}[{}]{}", &source[..start], &source[start..end], &source[end..])
}

fn operator(c: char) -> Option<(TokenKind, TokenCategory)> {
    use TokenCategory::*;
    let token = match c {
        '+' => (TokenKind::Add, AddSub),
        '-' => (TokenKind::Sub, AddSub),
        '(' => (TokenKind::Open, Group),
        ')' => (TokenKind::Close, Group),
        '{' => (TokenKind::BraceOpen, Group),
        '}' => (TokenKind::BraceClose, Group),
        '[' => (TokenKind::BracketOpen, Group),
        ']' => (TokenKind::BracketClose, Group),
        '*' => (TokenKind::Mul, MulDiv),
        '.' => (TokenKind::Period, Group),
        '/' => (TokenKind::Div, MulDiv),
        '\\' => (TokenKind::IntDiv, MulDiv),
        '=' => (TokenKind::Eq, Compare),
        '>' => (TokenKind::Gt, Compare),
        '<' => (TokenKind::Lt, Compare),
        '^' => (TokenKind::Power, Power),
        _ => return None,
    };
    Some(token)
}

fn double_operator(first: char, second: char) -> Option<(TokenKind, TokenCategory)> {
    use TokenCategory::*;
    let token = match (first, second) {
        ('<', '>') => (TokenKind::Ne, Compare),
        ('=', '=') => (TokenKind::Eq, Compare),
        ('>', '=') => (TokenKind::Ge, Compare),
        ('<', '=') => (TokenKind::Le, Compare),
        ('&', '&') => (TokenKind::And, Logical),
        ('|', '|') => (TokenKind::Or, Logical),
        _ => return None,
    };
    Some(token)
}

/// Lazy tokenizer over an expression string
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
    culture: &'a Culture,
    identifier_chars: &'a str,
    previous: Option<TokenCategory>,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer; a leading `=` is skipped
    pub fn new(source: &'a str, culture: &'a Culture, identifier_chars: &'a str) -> Self {
        Self {
            source,
            pos: usize::from(source.starts_with('=')),
            culture,
            identifier_chars,
            previous: None,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Byte offset of the next unread character
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Scan the next token
    pub fn next_token(&mut self) -> CalcResult<Token> {
        let token = self.scan()?;
        self.previous = Some(token.category);
        Ok(token)
    }

    /// Scan every token up to and including [`TokenKind::End`]
    pub fn tokenize(mut self) -> CalcResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::End;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    // === Character access ===

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.source[self.pos..].chars().nth(1)
    }

    fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c > ' ' {
                break;
            }
            self.bump(c);
        }
    }

    fn error(&self, message: &str, start: usize) -> CalcError {
        CalcError::syntax(message, error_context(self.source, start, self.pos))
    }

    fn is_identifier_start(&self, c: char) -> bool {
        c.is_alphabetic() || c == '_' || self.identifier_chars.contains(c)
    }

    fn is_identifier_char(&self, c: char) -> bool {
        c.is_alphanumeric() || c == '_' || self.identifier_chars.contains(c)
    }

    // === Scanning ===

    fn scan(&mut self) -> CalcResult<Token> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(c) = self.peek() else {
            return Ok(Token::new(
                TokenKind::End,
                TokenCategory::Group,
                Value::Empty,
                start,
                start,
            ));
        };

        let starts_number = c.is_ascii_digit()
            || (c == self.culture.decimal_separator
                && self.peek_second().map_or(false, |n| n.is_ascii_digit()));
        if starts_number {
            return self.scan_number(start);
        }

        if c == self.culture.list_separator {
            self.bump(c);
            return Ok(Token::new(
                TokenKind::Comma,
                TokenCategory::Group,
                Value::from(c.to_string()),
                start,
                self.pos,
            ));
        }

        if let Some((kind, category)) = operator(c) {
            self.bump(c);
            let (kind, category) = match self.peek() {
                Some(next) if matches!(c, '>' | '<' | '=') => match double_operator(c, next) {
                    Some(double) => {
                        self.bump(next);
                        double
                    }
                    None => (kind, category),
                },
                _ => (kind, category),
            };
            let symbol = &self.source[start..self.pos];
            return Ok(Token::new(kind, category, Value::from(symbol), start, self.pos));
        }

        if let Some((kind, category)) = self.peek_second().and_then(|n| double_operator(c, n)) {
            self.bump(c);
            self.bump(c);
            let symbol = &self.source[start..self.pos];
            return Ok(Token::new(kind, category, Value::from(symbol), start, self.pos));
        }

        match c {
            '"' | '\'' => self.scan_string(c, start),
            '#' => self.scan_date(start),
            _ => self.scan_identifier(c, start),
        }
    }

    fn scan_number(&mut self, start: usize) -> CalcResult<Token> {
        let mut text = String::new();
        let mut seen_decimal = false;
        let mut seen_exponent = false;
        let mut percent = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump(c);
            } else if c == self.culture.decimal_separator && !seen_decimal && !seen_exponent {
                seen_decimal = true;
                text.push('.');
                self.bump(c);
            } else if (c == 'e' || c == 'E') && !seen_exponent && self.exponent_follows() {
                seen_exponent = true;
                text.push('e');
                self.bump(c);
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    text.push(sign);
                    self.bump(sign);
                }
            } else if c == self.culture.percent_symbol {
                percent = true;
                self.bump(c);
                break;
            } else {
                break;
            }
        }

        let mut value: f64 = text
            .parse()
            .map_err(|_| self.error("Invalid number literal", start))?;
        if percent {
            value /= 100.0;
        }

        Ok(Token::new(
            TokenKind::Atom,
            TokenCategory::Literal,
            Value::Number(value),
            start,
            self.pos,
        ))
    }

    /// An exponent marker only counts when digits follow it
    fn exponent_follows(&self) -> bool {
        let mut rest = self.source[self.pos..].chars().skip(1);
        match rest.next() {
            Some('+' | '-') => rest.next().map_or(false, |c| c.is_ascii_digit()),
            Some(c) => c.is_ascii_digit(),
            None => false,
        }
    }

    fn scan_string(&mut self, quote: char, start: usize) -> CalcResult<Token> {
        self.bump(quote);
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("Can't find final quote", start)),
                Some(c) if c == quote => {
                    self.bump(c);
                    if self.peek() == Some(quote) {
                        self.bump(quote);
                        text.push('"');
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.bump(c);
                }
            }
        }

        Ok(Token::new(
            TokenKind::Atom,
            TokenCategory::Literal,
            Value::String(text),
            start,
            self.pos,
        ))
    }

    fn scan_date(&mut self, start: usize) -> CalcResult<Token> {
        self.bump('#');
        let body_start = self.pos;
        let Some(len) = self.source[body_start..].find('#') else {
            self.pos = self.source.len();
            return Err(self.error("Can't find final date delimiter ('#')", start));
        };
        let body = &self.source[body_start..body_start + len];
        self.pos = body_start + len + 1;

        let date = self
            .culture
            .parse_date(body)
            .ok_or_else(|| self.error("Invalid date literal", start))?;

        Ok(Token::new(
            TokenKind::Atom,
            TokenCategory::Literal,
            Value::DateTime(date),
            start,
            self.pos,
        ))
    }

    fn scan_identifier(&mut self, c: char, start: usize) -> CalcResult<Token> {
        if !self.is_identifier_start(c) {
            self.bump(c);
            return Err(self.error("Identifier expected", start));
        }

        // `5h` reads as `5 * h`
        if self.previous == Some(TokenCategory::Literal) {
            return Ok(Token::new(
                TokenKind::Mul,
                TokenCategory::MulDiv,
                Value::from("*"),
                start,
                start,
            ));
        }

        self.bump(c);
        while let Some(c) = self.peek() {
            if !self.is_identifier_char(c) {
                break;
            }
            self.bump(c);
        }

        Ok(Token::new(
            TokenKind::Atom,
            TokenCategory::Identifier,
            Value::from(&self.source[start..self.pos]),
            start,
            self.pos,
        ))
    }
}
