use super::ComparisonOperator;
use super::parser::SyntaxError;

/// A lexical token together with its byte position in the query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// The kinds of token the scanner produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A bare word: a tag name or an unquoted comparison value.
    Name(String),
    /// A quoted comparison value, quotes stripped.
    Quoted(String),
    /// A comparison operator: `=`, `!=`, `<`, `<=`, `>`, `>=`.
    Operator(ComparisonOperator),
    OpenParen,
    CloseParen,
    And,
    Or,
    Not,
    /// End of input.
    End,
}

/// Tokenizes a query string.
///
/// Bare words run until whitespace, a parenthesis, a quote, or an
/// operator character. The boolean keywords `and`, `or` and `not`
/// match case-insensitively.
pub struct Scanner<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner over the given query text.
    pub fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    /// Produces the next token, or [`TokenKind::End`] once the input
    /// is exhausted.
    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_whitespace();

        let position = self.position;
        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::End,
                position,
            });
        };

        let kind = match c {
            '(' => {
                self.advance(c);
                TokenKind::OpenParen
            }
            ')' => {
                self.advance(c);
                TokenKind::CloseParen
            }
            '=' => {
                self.advance(c);
                TokenKind::Operator(ComparisonOperator::Equal)
            }
            '<' => {
                self.advance(c);
                if self.peek() == Some('=') {
                    self.advance('=');
                    TokenKind::Operator(ComparisonOperator::LessThanOrEqual)
                } else {
                    TokenKind::Operator(ComparisonOperator::LessThan)
                }
            }
            '>' => {
                self.advance(c);
                if self.peek() == Some('=') {
                    self.advance('=');
                    TokenKind::Operator(ComparisonOperator::GreaterThanOrEqual)
                } else {
                    TokenKind::Operator(ComparisonOperator::GreaterThan)
                }
            }
            '!' => {
                self.advance(c);
                if self.peek() == Some('=') {
                    self.advance('=');
                    TokenKind::Operator(ComparisonOperator::NotEqual)
                } else {
                    return Err(SyntaxError::UnexpectedCharacter {
                        position,
                        character: '!',
                    });
                }
            }
            '"' | '\'' => self.scan_quoted(c)?,
            _ => self.scan_word(),
        };

        Ok(Token { kind, position })
    }

    fn peek(&self) -> Option<char> {
        self.text[self.position..].chars().next()
    }

    fn advance(&mut self, c: char) {
        self.position += c.len_utf8();
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.advance(c);
        }
    }

    fn scan_quoted(&mut self, quote: char) -> Result<TokenKind, SyntaxError> {
        let start = self.position;
        self.advance(quote);

        let content_start = self.position;
        while let Some(c) = self.peek() {
            if c == quote {
                let content = self.text[content_start..self.position].to_string();
                self.advance(quote);
                return Ok(TokenKind::Quoted(content));
            }
            self.advance(c);
        }

        Err(SyntaxError::UnterminatedString { position: start })
    }

    fn scan_word(&mut self) -> TokenKind {
        let start = self.position;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '(' | ')' | '=' | '<' | '>' | '!' | '"' | '\'') {
                break;
            }
            self.advance(c);
        }

        let word = &self.text[start..self.position];
        if word.eq_ignore_ascii_case("and") {
            TokenKind::And
        } else if word.eq_ignore_ascii_case("or") {
            TokenKind::Or
        } else if word.eq_ignore_ascii_case("not") {
            TokenKind::Not
        } else {
            TokenKind::Name(word.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::new(text);
        let mut kinds = Vec::new();
        loop {
            let token = scanner.next_token().unwrap();
            let end = token.kind == TokenKind::End;
            kinds.push(token.kind);
            if end {
                break;
            }
        }
        kinds
    }

    #[test]
    fn scans_names_and_keywords() {
        assert_eq!(
            tokens("cheese and wine"),
            vec![
                TokenKind::Name("cheese".into()),
                TokenKind::And,
                TokenKind::Name("wine".into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            tokens("a OR Not b"),
            vec![
                TokenKind::Name("a".into()),
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Name("b".into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn scans_comparison_operators() {
        assert_eq!(
            tokens("rating >= 4"),
            vec![
                TokenKind::Name("rating".into()),
                TokenKind::Operator(ComparisonOperator::GreaterThanOrEqual),
                TokenKind::Name("4".into()),
                TokenKind::End,
            ]
        );
        assert_eq!(
            tokens("year!=2001"),
            vec![
                TokenKind::Name("year".into()),
                TokenKind::Operator(ComparisonOperator::NotEqual),
                TokenKind::Name("2001".into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn scans_quoted_values() {
        assert_eq!(
            tokens("genre = \"science fiction\""),
            vec![
                TokenKind::Name("genre".into()),
                TokenKind::Operator(ComparisonOperator::Equal),
                TokenKind::Quoted("science fiction".into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn scans_parentheses_without_spaces() {
        assert_eq!(
            tokens("(a)or(b)"),
            vec![
                TokenKind::OpenParen,
                TokenKind::Name("a".into()),
                TokenKind::CloseParen,
                TokenKind::Or,
                TokenKind::OpenParen,
                TokenKind::Name("b".into()),
                TokenKind::CloseParen,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn reports_token_positions() {
        let mut scanner = Scanner::new("  cheese");
        let token = scanner.next_token().unwrap();
        assert_eq!(token.position, 2);
    }

    #[test]
    fn rejects_lone_bang() {
        let mut scanner = Scanner::new("a ! b");
        scanner.next_token().unwrap();
        let err = scanner.next_token().unwrap_err();
        assert!(matches!(
            err,
            SyntaxError::UnexpectedCharacter { position: 2, .. }
        ));
    }

    #[test]
    fn rejects_unterminated_string() {
        let mut scanner = Scanner::new("a = \"oops");
        scanner.next_token().unwrap();
        scanner.next_token().unwrap();
        let err = scanner.next_token().unwrap_err();
        assert!(matches!(err, SyntaxError::UnterminatedString { position: 4 }));
    }
}
