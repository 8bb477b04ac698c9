use std::fmt;

/// A boolean/comparison formula over tag names.
///
/// The resolver in the storage layer walks this tree structurally; see
/// `Storage::query_files`. The enum is closed, so there is no
/// "unknown node" case to reject at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// Matches the entire file universe. Produced by parsing an empty
    /// query string.
    Empty,
    /// Files having at least one association with the named tag,
    /// regardless of value.
    Tag { name: String },
    /// Files having an association with the named tag whose value
    /// satisfies the comparison.
    Comparison {
        tag: String,
        operator: ComparisonOperator,
        value: String,
    },
    /// The universe minus the operand's matches.
    Not { operand: Box<Expression> },
    /// Set intersection.
    And {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Set union.
    Or {
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    /// Builds a left-associative conjunction of tag expressions from a
    /// flat name list. An empty list yields [`Expression::Empty`].
    ///
    /// Used for literal `tags/a/b/...` directory paths.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagfs::query::Expression;
    ///
    /// let expr = Expression::has_all(["cheese", "wine"]);
    /// assert_eq!(expr.tag_names(), vec!["cheese", "wine"]);
    /// ```
    pub fn has_all<I, S>(names: I) -> Expression
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = names.into_iter();

        let Some(first) = names.next() else {
            return Expression::Empty;
        };

        let mut expression = Expression::Tag { name: first.into() };
        for name in names {
            expression = Expression::And {
                left: Box::new(expression),
                right: Box::new(Expression::Tag { name: name.into() }),
            };
        }

        expression
    }

    /// Returns every tag name referenced anywhere in the tree, in
    /// order of occurrence and without deduplication.
    pub fn tag_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_tag_names(&mut names);
        names
    }

    fn collect_tag_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Empty => {}
            Expression::Tag { name } => names.push(name),
            Expression::Comparison { tag, .. } => names.push(tag),
            Expression::Not { operand } => operand.collect_tag_names(names),
            Expression::And { left, right } | Expression::Or { left, right } => {
                left.collect_tag_names(names);
                right.collect_tag_names(names);
            }
        }
    }
}

/// The equality/ordering operators usable in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanOrEqual => ">=",
        };
        write!(f, "{symbol}")
    }
}
