//! Tokenizer for the template expression language.

use std::iter::Peekable;
use std::str::Chars;

use rust_decimal::Decimal;

use super::error::ExprError;

/// Lexical token.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    /// Numeric literal.
    Number(Decimal),
    /// `:name` field reference, stored without the sigil.
    Field(String),
    /// Bare identifier: a function name or a string literal.
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
    Comma,
    /// End of input.
    End,
}

/// Verifies the expression uses only the allowed alphabet.
///
/// Runs before tokenization, so anything outside the closed character set is
/// rejected no matter where it appears.
pub(super) fn check_alphabet(expr: &str) -> Result<(), ExprError> {
    for (position, ch) in expr.chars().enumerate() {
        let allowed = ch.is_ascii_digit()
            || ch.is_ascii_alphabetic()
            || ch.is_ascii_whitespace()
            || matches!(ch, '.' | '+' | '-' | '*' | '/' | '(' | ')' | ',' | ':' | '_');
        if !allowed {
            return Err(ExprError::IllegalCharacter {
                expr: expr.to_string(),
                ch,
                position,
            });
        }
    }
    Ok(())
}

/// Streaming tokenizer over the raw expression text.
pub(super) struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub(super) fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.input.next_if(|ch| ch.is_ascii_whitespace()).is_some() {}
    }

    fn read_number(&mut self, first: char) -> Result<Token, ExprError> {
        let mut text = String::new();
        text.push(first);

        let mut seen_dot = false;
        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.input.next();
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                text.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        text.parse::<Decimal>()
            .map(Token::Number)
            .map_err(|_| ExprError::Parse {
                message: format!("invalid number literal {text:?}"),
            })
    }

    fn read_ident(&mut self, first: char) -> String {
        let mut ident = String::new();
        ident.push(first);
        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }
        ident
    }

    pub(super) fn next_token(&mut self) -> Result<Token, ExprError> {
        self.skip_whitespace();

        let Some(ch) = self.input.next() else {
            return Ok(Token::End);
        };

        match ch {
            '+' => Ok(Token::Plus),
            '-' => Ok(Token::Minus),
            '*' => Ok(Token::Star),
            '/' => Ok(Token::Slash),
            '(' => Ok(Token::LeftParen),
            ')' => Ok(Token::RightParen),
            ',' => Ok(Token::Comma),
            ':' => match self.input.peek().copied() {
                Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                    self.input.next();
                    Ok(Token::Field(self.read_ident(first)))
                }
                _ => Err(ExprError::Parse {
                    message: "expected a field name after ':'".to_string(),
                }),
            },
            ch if ch.is_ascii_digit() => self.read_number(ch),
            ch if ch.is_ascii_alphabetic() || ch == '_' => Ok(Token::Ident(self.read_ident(ch))),
            // The alphabet check runs first, so only '.' can land here.
            other => Err(ExprError::Parse {
                message: format!("unexpected character {other:?}"),
            }),
        }
    }
}
