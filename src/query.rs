//! Query expression language: scanner, recursive-descent parser, and
//! the boolean/comparison AST the virtual filesystem evaluates.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! Expr    := OrExpr
//! OrExpr  := AndExpr ( "or" AndExpr )*
//! AndExpr := NotExpr ( "and" NotExpr )*
//! NotExpr := [ "not" ] Primary
//! Primary := TagName [ CompareOp Value ] | "(" Expr ")"
//! ```
//!
//! An empty query parses to [`Expression::Empty`], which matches the
//! entire file universe.

mod ast;
mod parser;
mod scanner;

pub use ast::{ComparisonOperator, Expression};
pub use parser::{Parser, SyntaxError};
pub use scanner::{Scanner, Token, TokenKind};

/// Parses a query string into an [`Expression`].
///
/// # Examples
///
/// ```
/// use tagfs::query::{self, Expression};
///
/// let expr = query::parse("cheese and wine").unwrap();
/// assert_eq!(expr.tag_names(), vec!["cheese", "wine"]);
///
/// assert_eq!(query::parse("").unwrap(), Expression::Empty);
/// assert!(query::parse("cheese and").is_err());
/// ```
pub fn parse(text: &str) -> Result<Expression, SyntaxError> {
    Parser::new(Scanner::new(text))?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_string_gives_empty_expression() {
        assert_eq!(parse("").unwrap(), Expression::Empty);
        assert_eq!(parse("   ").unwrap(), Expression::Empty);
    }

    #[test]
    fn parse_reports_position_of_offending_token() {
        let err = parse("cheese and and wine").unwrap_err();
        match err {
            SyntaxError::UnexpectedToken { position, .. } => assert_eq!(position, 11),
            other => panic!("unexpected error: {other}"),
        }
    }
}
