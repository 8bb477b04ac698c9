use thiserror::Error;

use super::ast::Expression;
use super::scanner::{Scanner, Token, TokenKind};

/// Malformed query text: unexpected token, unbalanced parenthesis,
/// empty primary. Carries the byte position of the offending token.
///
/// During path resolution the projection engine surfaces this as
/// "entry not found"; it never crashes the host.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { position: usize, character: char },

    #[error("unterminated quoted string at position {position}")]
    UnterminatedString { position: usize },

    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { position: usize, token: String },

    #[error("unexpected end of query at position {position}")]
    UnexpectedEnd { position: usize },
}

/// Recursive-descent parser over a [`Scanner`], with one token of
/// lookahead.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    lookahead: Token,
}

impl<'a> Parser<'a> {
    /// Creates a parser, reading the first token from the scanner.
    pub fn new(mut scanner: Scanner<'a>) -> Result<Self, SyntaxError> {
        let lookahead = scanner.next_token()?;
        Ok(Self { scanner, lookahead })
    }

    /// Parses a complete expression, requiring the entire input to be
    /// consumed. Empty input parses to [`Expression::Empty`].
    pub fn parse(mut self) -> Result<Expression, SyntaxError> {
        if self.lookahead.kind == TokenKind::End {
            return Ok(Expression::Empty);
        }

        let expression = self.parse_or()?;

        match &self.lookahead.kind {
            TokenKind::End => Ok(expression),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_or(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_and()?;

        while self.lookahead.kind == TokenKind::Or {
            self.advance()?;
            let right = self.parse_and()?;
            left = Expression::Or {
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_not()?;

        while self.lookahead.kind == TokenKind::And {
            self.advance()?;
            let right = self.parse_not()?;
            left = Expression::And {
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, SyntaxError> {
        if self.lookahead.kind == TokenKind::Not {
            self.advance()?;
            let operand = self.parse_primary()?;
            return Ok(Expression::Not {
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, SyntaxError> {
        match self.lookahead.kind.clone() {
            TokenKind::Name(name) => {
                self.advance()?;

                if let TokenKind::Operator(operator) = self.lookahead.kind {
                    self.advance()?;
                    let value = self.parse_value()?;
                    return Ok(Expression::Comparison {
                        tag: name,
                        operator,
                        value,
                    });
                }

                Ok(Expression::Tag { name })
            }
            TokenKind::OpenParen => {
                self.advance()?;
                let expression = self.parse_or()?;

                match self.lookahead.kind {
                    TokenKind::CloseParen => {
                        self.advance()?;
                        Ok(expression)
                    }
                    _ => Err(self.unexpected()),
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_value(&mut self) -> Result<String, SyntaxError> {
        match self.lookahead.kind.clone() {
            TokenKind::Name(value) | TokenKind::Quoted(value) => {
                self.advance()?;
                Ok(value)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn advance(&mut self) -> Result<(), SyntaxError> {
        self.lookahead = self.scanner.next_token()?;
        Ok(())
    }

    fn unexpected(&self) -> SyntaxError {
        let position = self.lookahead.position;
        match &self.lookahead.kind {
            TokenKind::End => SyntaxError::UnexpectedEnd { position },
            kind => SyntaxError::UnexpectedToken {
                position,
                token: describe(kind),
            },
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Name(name) => name.clone(),
        TokenKind::Quoted(value) => format!("\"{value}\""),
        TokenKind::Operator(operator) => operator.to_string(),
        TokenKind::OpenParen => "(".to_string(),
        TokenKind::CloseParen => ")".to_string(),
        TokenKind::And => "and".to_string(),
        TokenKind::Or => "or".to_string(),
        TokenKind::Not => "not".to_string(),
        TokenKind::End => "end of query".to_string(),
    }
}
