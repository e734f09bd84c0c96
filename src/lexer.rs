use thiserror::Error;

use crate::diagnostic::Loc;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at {loc}")]
pub struct LexError {
    pub message: String,
    pub loc: Loc,
}

impl LexError {
    fn new(message: impl Into<String>, loc: Loc) -> Self {
        Self {
            message: message.into(),
            loc,
        }
    }
}

/// Layout-sensitive lexer. Scans bytes, tracks 1-based line/column, and
/// maintains an indentation stack (seeded with 0) from which the virtual
/// Indent/Dedent tokens are derived at the start of each logical line.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    at_line_start: bool,
    indent_stack: Vec<usize>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
            indent_stack: vec![0],
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while !self.at_end() {
            if self.at_line_start {
                self.handle_indentation(&mut tokens)?;
                self.at_line_start = false;
                if self.at_end() {
                    break;
                }
            }

            let c = self.peek();

            // Spaces and tabs inside a line carry no meaning
            if c == b' ' || c == b'\t' {
                self.advance();
                continue;
            }

            if c == b'\n' {
                let loc = self.loc();
                self.advance();
                tokens.push(Token::new(TokenKind::Newline, "\\n", loc));
                self.at_line_start = true;
                continue;
            }

            // Carriage return, alone or as part of \r\n
            if c == b'\r' {
                let loc = self.loc();
                self.advance();
                if !self.at_end() && self.peek() == b'\n' {
                    self.advance();
                } else {
                    self.line += 1;
                    self.column = 1;
                }
                tokens.push(Token::new(TokenKind::Newline, "\\n", loc));
                self.at_line_start = true;
                continue;
            }

            if c == b'#' {
                self.skip_comment();
                continue;
            }

            if c == b'"' || c == b'\'' {
                tokens.push(self.read_string()?);
                continue;
            }

            if c.is_ascii_digit() {
                tokens.push(self.read_number()?);
                continue;
            }

            if c.is_ascii_alphabetic() || c == b'_' {
                tokens.push(self.read_identifier_or_keyword());
                continue;
            }

            tokens.push(self.read_operator_or_delimiter()?);
        }

        // Close the final logical line if the source did not
        if tokens.last().is_some_and(|t| t.kind != TokenKind::Newline) {
            tokens.push(Token::new(TokenKind::Newline, "\\n", self.loc()));
        }

        // Unwind any open indentation levels
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::new(TokenKind::Dedent, "", self.loc()));
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.loc()));
        Ok(tokens)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> u8 {
        self.src[self.pos]
    }

    fn peek_next(&self) -> u8 {
        if self.pos + 1 >= self.src.len() {
            0
        } else {
            self.src[self.pos + 1]
        }
    }

    fn advance(&mut self) -> u8 {
        let c = self.src[self.pos];
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn loc(&self) -> Loc {
        Loc::new(self.line, self.column)
    }

    fn handle_indentation(&mut self, tokens: &mut Vec<Token>) -> Result<(), LexError> {
        let start = self.loc();
        let mut indent = 0usize;

        while !self.at_end() {
            match self.peek() {
                b' ' => {
                    indent += 1;
                    self.advance();
                }
                b'\t' => {
                    // A tab advances the indent count to the next multiple of 8
                    indent = (indent / 8 + 1) * 8;
                    self.advance();
                }
                _ => break,
            }
        }

        // Blank or comment-only lines never change the indentation structure
        if self.at_end() || matches!(self.peek(), b'\n' | b'\r' | b'#') {
            return Ok(());
        }

        let current = *self.indent_stack.last().unwrap();
        if indent > current {
            self.indent_stack.push(indent);
            tokens.push(Token::new(TokenKind::Indent, "", start));
        } else if indent < current {
            while self.indent_stack.len() > 1 && *self.indent_stack.last().unwrap() > indent {
                self.indent_stack.pop();
                tokens.push(Token::new(TokenKind::Dedent, "", start));
            }
            if *self.indent_stack.last().unwrap() != indent {
                return Err(LexError::new(
                    "unindent does not match any outer indentation level",
                    start,
                ));
            }
        }
        Ok(())
    }

    fn skip_comment(&mut self) {
        while !self.at_end() && self.peek() != b'\n' {
            self.advance();
        }
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let start = self.loc();
        let quote = self.advance();
        let mut value = Vec::new();

        while !self.at_end() {
            let c = self.peek();

            if c == b'\n' {
                return Err(LexError::new(
                    "unterminated string literal (newline in string)",
                    start,
                ));
            }

            if c == b'\\' {
                self.advance();
                if self.at_end() {
                    return Err(LexError::new(
                        "unterminated escape sequence at end of input",
                        self.loc(),
                    ));
                }
                let escaped = self.advance();
                match escaped {
                    b'n' => value.push(b'\n'),
                    b't' => value.push(b'\t'),
                    b'r' => value.push(b'\r'),
                    b'\\' => value.push(b'\\'),
                    b'\'' => value.push(b'\''),
                    b'"' => value.push(b'"'),
                    b'0' => value.push(b'\0'),
                    other => {
                        return Err(LexError::new(
                            format!("invalid escape sequence: \\{}", other as char),
                            Loc::new(self.line, self.column - 1),
                        ));
                    }
                }
                continue;
            }

            if c == quote {
                self.advance();
                let text = String::from_utf8_lossy(&value).into_owned();
                return Ok(Token::new(TokenKind::Str, text, start));
            }

            value.push(self.advance());
        }

        Err(LexError::new(
            "unterminated string literal (reached end of input)",
            start,
        ))
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.loc();
        let mut value = String::new();
        let mut is_float = false;

        while !self.at_end() && self.peek().is_ascii_digit() {
            value.push(self.advance() as char);
        }

        if !self.at_end() && self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            value.push(self.advance() as char);
            while !self.at_end() && self.peek().is_ascii_digit() {
                value.push(self.advance() as char);
            }
        }

        if !self.at_end() && matches!(self.peek(), b'e' | b'E') {
            is_float = true;
            value.push(self.advance() as char);
            if !self.at_end() && matches!(self.peek(), b'+' | b'-') {
                value.push(self.advance() as char);
            }
            if self.at_end() || !self.peek().is_ascii_digit() {
                return Err(LexError::new(
                    "invalid numeric literal: expected digit after exponent",
                    self.loc(),
                ));
            }
            while !self.at_end() && self.peek().is_ascii_digit() {
                value.push(self.advance() as char);
            }
        }

        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Int
        };
        Ok(Token::new(kind, value, start))
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let start = self.loc();
        let mut value = String::new();

        while !self.at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_') {
            value.push(self.advance() as char);
        }

        match TokenKind::keyword(&value) {
            Some(kind) => Token::new(kind, value, start),
            None => Token::new(TokenKind::Identifier, value, start),
        }
    }

    fn read_operator_or_delimiter(&mut self) -> Result<Token, LexError> {
        let start = self.loc();
        let c = self.advance();

        let simple = |kind: TokenKind, text: &str| Ok(Token::new(kind, text, start));

        match c {
            b'(' => simple(TokenKind::LParen, "("),
            b')' => simple(TokenKind::RParen, ")"),
            b'[' => simple(TokenKind::LBracket, "["),
            b']' => simple(TokenKind::RBracket, "]"),
            b'{' => simple(TokenKind::LBrace, "{"),
            b'}' => simple(TokenKind::RBrace, "}"),
            b':' => simple(TokenKind::Colon, ":"),
            b',' => simple(TokenKind::Comma, ","),
            b'.' => simple(TokenKind::Dot, "."),
            b'%' => simple(TokenKind::Percent, "%"),
            b'+' => {
                if self.match_eq() {
                    simple(TokenKind::PlusEq, "+=")
                } else {
                    simple(TokenKind::Plus, "+")
                }
            }
            b'-' => {
                if self.match_eq() {
                    simple(TokenKind::MinusEq, "-=")
                } else {
                    simple(TokenKind::Minus, "-")
                }
            }
            b'*' => {
                if !self.at_end() && self.peek() == b'*' {
                    self.advance();
                    simple(TokenKind::DoubleStar, "**")
                } else if self.match_eq() {
                    simple(TokenKind::StarEq, "*=")
                } else {
                    simple(TokenKind::Star, "*")
                }
            }
            b'/' => {
                if self.match_eq() {
                    simple(TokenKind::SlashEq, "/=")
                } else {
                    simple(TokenKind::Slash, "/")
                }
            }
            b'=' => {
                if self.match_eq() {
                    simple(TokenKind::EqEq, "==")
                } else {
                    simple(TokenKind::Eq, "=")
                }
            }
            b'!' => {
                if self.match_eq() {
                    simple(TokenKind::BangEq, "!=")
                } else {
                    Err(LexError::new(
                        "unexpected character '!' (did you mean '!='?)",
                        start,
                    ))
                }
            }
            b'<' => {
                if self.match_eq() {
                    simple(TokenKind::LessEq, "<=")
                } else {
                    simple(TokenKind::Less, "<")
                }
            }
            b'>' => {
                if self.match_eq() {
                    simple(TokenKind::GreaterEq, ">=")
                } else {
                    simple(TokenKind::Greater, ">")
                }
            }
            other => Err(LexError::new(
                format!("unexpected character: '{}'", other as char),
                start,
            )),
        }
    }

    fn match_eq(&mut self) -> bool {
        if !self.at_end() && self.peek() == b'=' {
            self.advance();
            true
        } else {
            false
        }
    }
}
