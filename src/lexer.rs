use thiserror::Error;

use crate::token::{SourceLoc, Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unindent does not match any outer indentation level at line {line}, column {column}")]
    InconsistentDedent { line: usize, column: usize },
    #[error("unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("unexpected character '!' (did you mean '!=') at line {line}, column {column}")]
    LoneBang { line: usize, column: usize },
    #[error("unterminated string literal at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("invalid escape sequence '\\{escape}' at line {line}, column {column}")]
    InvalidEscape {
        escape: char,
        line: usize,
        column: usize,
    },
    #[error("invalid numeric literal: expected digit after exponent at line {line}, column {column}")]
    MalformedExponent { line: usize, column: usize },
}

pub type LexResult<T> = Result<T, LexError>;

/// Width a tab expands to: indentation jumps to the next multiple of this.
const TAB_STOP: usize = 8;

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    at_line_start: bool,
    indent_stack: Vec<usize>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
            indent_stack: vec![0],
        }
    }

    pub fn tokenize(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();

        while !self.at_end() {
            if self.at_line_start {
                self.handle_indentation(&mut tokens)?;
                self.at_line_start = false;
                if self.at_end() {
                    break;
                }
            }

            let c = match self.peek() {
                Some(c) => c,
                None => break,
            };

            match c {
                // Spaces and tabs inside a line separate tokens only.
                ' ' | '\t' => {
                    self.advance();
                }
                '\n' => {
                    let loc = self.loc();
                    self.advance();
                    tokens.push(Token::new(TokenKind::Newline, "", loc));
                    self.at_line_start = true;
                }
                '\r' => {
                    let loc = self.loc();
                    self.advance();
                    if self.peek() == Some('\n') {
                        self.advance();
                    }
                    tokens.push(Token::new(TokenKind::Newline, "", loc));
                    self.at_line_start = true;
                }
                '#' => self.skip_comment(),
                '"' | '\'' => tokens.push(self.read_string()?),
                c if c.is_ascii_digit() => tokens.push(self.read_number()?),
                c if c.is_ascii_alphabetic() || c == '_' => {
                    tokens.push(self.read_identifier_or_keyword());
                }
                _ => tokens.push(self.read_operator_or_delimiter()?),
            }
        }

        // A final physical line without a newline still terminates its
        // statement.
        if tokens
            .last()
            .is_some_and(|token| token.kind != TokenKind::Newline)
        {
            tokens.push(Token::new(TokenKind::Newline, "", self.loc()));
        }

        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::new(TokenKind::Dedent, "", self.loc()));
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.loc()));
        Ok(tokens)
    }

    fn handle_indentation(&mut self, tokens: &mut Vec<Token>) -> LexResult<()> {
        let start = self.loc();
        let mut indent = 0usize;

        while let Some(c) = self.peek() {
            match c {
                ' ' => {
                    indent += 1;
                    self.advance();
                }
                '\t' => {
                    indent = (indent / TAB_STOP + 1) * TAB_STOP;
                    self.advance();
                }
                _ => break,
            }
        }

        // Blank and comment-only lines leave the indentation stack untouched.
        match self.peek() {
            None | Some('\n') | Some('\r') | Some('#') => return Ok(()),
            _ => {}
        }

        let current = self.current_indent();
        if indent > current {
            self.indent_stack.push(indent);
            tokens.push(Token::new(TokenKind::Indent, "", start));
        } else if indent < current {
            while self.indent_stack.len() > 1 && self.current_indent() > indent {
                self.indent_stack.pop();
                tokens.push(Token::new(TokenKind::Dedent, "", start));
            }
            if self.current_indent() != indent {
                return Err(LexError::InconsistentDedent {
                    line: start.line,
                    column: start.column,
                });
            }
        }
        Ok(())
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_string(&mut self) -> LexResult<Token> {
        let start = self.loc();
        let quote = match self.advance() {
            Some(c) => c,
            None => {
                return Err(LexError::UnterminatedString {
                    line: start.line,
                    column: start.column,
                });
            }
        };
        let mut value = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedString {
                        line: start.line,
                        column: start.column,
                    });
                }
                Some('\\') => {
                    self.advance();
                    let escape_loc = self.loc();
                    let escaped = match self.advance() {
                        Some(c) => c,
                        None => {
                            return Err(LexError::UnterminatedString {
                                line: start.line,
                                column: start.column,
                            });
                        }
                    };
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '\\' => value.push('\\'),
                        '\'' => value.push('\''),
                        '"' => value.push('"'),
                        '0' => value.push('\0'),
                        other => {
                            return Err(LexError::InvalidEscape {
                                escape: other,
                                line: escape_loc.line,
                                column: escape_loc.column,
                            });
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(Token::new(TokenKind::String, value, start));
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_number(&mut self) -> LexResult<Token> {
        let start = self.loc();
        let mut value = String::new();
        let mut is_float = false;

        self.consume_digits(&mut value);

        // A dot only belongs to the number when a digit follows; otherwise it
        // is a member access left for the parser.
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            value.push('.');
            self.consume_digits(&mut value);
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            if let Some(e) = self.advance() {
                value.push(e);
            }
            if matches!(self.peek(), Some('+') | Some('-')) {
                if let Some(sign) = self.advance() {
                    value.push(sign);
                }
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(LexError::MalformedExponent {
                    line: self.line,
                    column: self.column,
                });
            }
            self.consume_digits(&mut value);
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
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match value.as_str() {
            "fn" => TokenKind::Fn,
            "imp" => TokenKind::Imp,
            "ret" => TokenKind::Ret,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "while" => TokenKind::While,
            "try" => TokenKind::Try,
            "except" => TokenKind::Except,
            "finally" => TokenKind::Finally,
            "pass" => TokenKind::Pass,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "none" => TokenKind::None,
            "class" => TokenKind::Class,
            _ => TokenKind::Identifier,
        };
        Token::new(kind, value, start)
    }

    fn read_operator_or_delimiter(&mut self) -> LexResult<Token> {
        let start = self.loc();
        let c = match self.advance() {
            Some(c) => c,
            None => {
                return Err(LexError::UnexpectedCharacter {
                    character: '\0',
                    line: start.line,
                    column: start.column,
                });
            }
        };

        let simple = |kind: TokenKind, lexeme: &str| Ok(Token::new(kind, lexeme, start));
        match c {
            '(' => simple(TokenKind::LParen, "("),
            ')' => simple(TokenKind::RParen, ")"),
            '[' => simple(TokenKind::LBracket, "["),
            ']' => simple(TokenKind::RBracket, "]"),
            '{' => simple(TokenKind::LBrace, "{"),
            '}' => simple(TokenKind::RBrace, "}"),
            ':' => simple(TokenKind::Colon, ":"),
            ',' => simple(TokenKind::Comma, ","),
            '.' => simple(TokenKind::Dot, "."),
            '%' => simple(TokenKind::Percent, "%"),
            '+' => {
                if self.eat('=') {
                    simple(TokenKind::PlusEq, "+=")
                } else {
                    simple(TokenKind::Plus, "+")
                }
            }
            '-' => {
                if self.eat('=') {
                    simple(TokenKind::MinusEq, "-=")
                } else {
                    simple(TokenKind::Minus, "-")
                }
            }
            '*' => {
                if self.eat('*') {
                    simple(TokenKind::DoubleStar, "**")
                } else if self.eat('=') {
                    simple(TokenKind::StarEq, "*=")
                } else {
                    simple(TokenKind::Star, "*")
                }
            }
            '/' => {
                if self.eat('=') {
                    simple(TokenKind::SlashEq, "/=")
                } else {
                    simple(TokenKind::Slash, "/")
                }
            }
            '=' => {
                if self.eat('=') {
                    simple(TokenKind::EqEq, "==")
                } else {
                    simple(TokenKind::Eq, "=")
                }
            }
            '!' => {
                if self.eat('=') {
                    simple(TokenKind::BangEq, "!=")
                } else {
                    Err(LexError::LoneBang {
                        line: start.line,
                        column: start.column,
                    })
                }
            }
            '<' => {
                if self.eat('=') {
                    simple(TokenKind::LessEq, "<=")
                } else {
                    simple(TokenKind::Less, "<")
                }
            }
            '>' => {
                if self.eat('=') {
                    simple(TokenKind::GreaterEq, ">=")
                } else {
                    simple(TokenKind::Greater, ">")
                }
            }
            other => Err(LexError::UnexpectedCharacter {
                character: other,
                line: start.line,
                column: start.column,
            }),
        }
    }

    fn consume_digits(&mut self, value: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn current_indent(&self) -> usize {
        self.indent_stack.last().copied().unwrap_or(0)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn loc(&self) -> SourceLoc {
        SourceLoc::new(self.line, self.column)
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    Lexer::new(input).tokenize()
}
