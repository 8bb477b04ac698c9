//! Structural resolution of query expressions to file sets.
//!
//! Nothing here is cached: every resolution re-queries the database so
//! the projection always reflects the current tagging state, and
//! resolution never mutates the store.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use anyhow::Result;
use rusqlite::params;

use super::Storage;
use crate::models::{File, FileId, TagId};
use crate::query::{ComparisonOperator, Expression};

impl Storage {
    /// Resolves an expression to the set of matching files, ordered by
    /// ID with duplicates collapsed.
    ///
    /// Tag names with no corresponding tag resolve to the empty set;
    /// the projection engine validates names up front when a
    /// not-found answer is required instead.
    pub fn query_files(&self, expression: &Expression) -> Result<Vec<File>> {
        let resolved = self.resolve(expression)?;
        Ok(resolved.into_values().collect())
    }

    fn resolve(&self, expression: &Expression) -> Result<BTreeMap<FileId, File>> {
        match expression {
            Expression::Empty => Ok(by_id(self.all_files()?)),
            Expression::Tag { name } => match self.tag_by_name(name)? {
                Some(tag) => Ok(by_id(self.files_with_tag(tag.id())?)),
                None => Ok(BTreeMap::new()),
            },
            Expression::Comparison {
                tag,
                operator,
                value,
            } => match self.tag_by_name(tag)? {
                Some(tag) => Ok(by_id(self.files_with_tag_value_compare(
                    tag.id(),
                    *operator,
                    value,
                )?)),
                None => Ok(BTreeMap::new()),
            },
            Expression::Not { operand } => {
                let mut universe = by_id(self.all_files()?);
                let excluded = self.resolve(operand)?;
                universe.retain(|id, _| !excluded.contains_key(id));
                Ok(universe)
            }
            Expression::And { left, right } => {
                let mut left = self.resolve(left)?;
                let right = self.resolve(right)?;
                left.retain(|id, _| right.contains_key(id));
                Ok(left)
            }
            Expression::Or { left, right } => {
                let mut left = self.resolve(left)?;
                left.extend(self.resolve(right)?);
                Ok(left)
            }
        }
    }

    /// Returns the files having an association with the tag whose
    /// value satisfies `operator` against `value`.
    ///
    /// Comparison is attempted numerically first (both sides parsing
    /// as `f64`), falling back to byte-wise string ordering otherwise.
    pub fn files_with_tag_value_compare(
        &self,
        tag_id: TagId,
        operator: ComparisonOperator,
        value: &str,
    ) -> Result<Vec<File>> {
        let conn = self.db.connection();
        let mut statement = conn.prepare(
            "SELECT DISTINCT ft.file_id, v.name
             FROM file_tag ft JOIN value v ON v.id = ft.value_id
             WHERE ft.tag_id = ?1 AND ft.value_id <> 0",
        )?;

        let rows = statement
            .query_map(params![tag_id.get()], |row| {
                Ok((FileId::new(row.get(0)?), row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut files = Vec::new();
        for (file_id, actual) in rows {
            if satisfies(operator, compare_values(&actual, value))
                && let Some(file) = self.file_by_id(file_id)?
            {
                files.push(file);
            }
        }

        Ok(files)
    }
}

fn by_id(files: Vec<File>) -> BTreeMap<FileId, File> {
    files.into_iter().map(|file| (file.id(), file)).collect()
}

/// Orders two value names: numerically when both parse as `f64` and
/// compare cleanly, byte-wise as strings otherwise.
fn compare_values(left: &str, right: &str) -> Ordering {
    if let (Ok(l), Ok(r)) = (left.parse::<f64>(), right.parse::<f64>())
        && let Some(ordering) = l.partial_cmp(&r)
    {
        return ordering;
    }

    left.cmp(right)
}

fn satisfies(operator: ComparisonOperator, ordering: Ordering) -> bool {
    match operator {
        ComparisonOperator::Equal => ordering == Ordering::Equal,
        ComparisonOperator::NotEqual => ordering != Ordering::Equal,
        ComparisonOperator::LessThan => ordering == Ordering::Less,
        ComparisonOperator::LessThanOrEqual => ordering != Ordering::Greater,
        ComparisonOperator::GreaterThan => ordering == Ordering::Greater,
        ComparisonOperator::GreaterThanOrEqual => ordering != Ordering::Less,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::db::Database;
    use crate::models::ValueId;
    use crate::query;

    fn store() -> Storage {
        Storage::new(Database::in_memory().unwrap())
    }

    fn add_file(store: &Storage, path: &str) -> File {
        store.add_file(Path::new(path), None, 0, 0, false).unwrap()
    }

    fn tag_file(store: &Storage, file: &File, tag: &str) {
        let tag = match store.tag_by_name(tag).unwrap() {
            Some(tag) => tag,
            None => store.add_tag(tag).unwrap(),
        };
        store
            .add_file_tag(file.id(), tag.id(), ValueId::NONE)
            .unwrap();
    }

    fn tag_file_value(store: &Storage, file: &File, tag: &str, value: &str) {
        let tag = match store.tag_by_name(tag).unwrap() {
            Some(tag) => tag,
            None => store.add_tag(tag).unwrap(),
        };
        let value = store.get_or_create_value(value).unwrap();
        store
            .add_file_tag(file.id(), tag.id(), value.id())
            .unwrap();
    }

    fn ids(files: &[File]) -> Vec<i64> {
        files.iter().map(|f| f.id().get()).collect()
    }

    fn run(store: &Storage, text: &str) -> Vec<i64> {
        let expression = query::parse(text).unwrap();
        ids(&store.query_files(&expression).unwrap())
    }

    #[test]
    fn empty_expression_matches_the_universe() {
        let store = store();
        let a = add_file(&store, "/a");
        let b = add_file(&store, "/b");

        assert_eq!(run(&store, ""), vec![a.id().get(), b.id().get()]);
    }

    #[test]
    fn and_is_set_intersection() {
        let store = store();
        let both = add_file(&store, "/both");
        let just_cheese = add_file(&store, "/cheese");
        tag_file(&store, &both, "cheese");
        tag_file(&store, &both, "wine");
        tag_file(&store, &just_cheese, "cheese");

        assert_eq!(run(&store, "cheese and wine"), vec![both.id().get()]);
    }

    #[test]
    fn or_is_set_union_deduplicated() {
        let store = store();
        let both = add_file(&store, "/both");
        let just_cheese = add_file(&store, "/cheese");
        add_file(&store, "/neither");
        tag_file(&store, &both, "cheese");
        tag_file(&store, &both, "wine");
        tag_file(&store, &just_cheese, "cheese");

        assert_eq!(
            run(&store, "cheese or wine"),
            vec![both.id().get(), just_cheese.id().get()]
        );
    }

    #[test]
    fn not_is_universe_complement() {
        let store = store();
        let tagged = add_file(&store, "/tagged");
        let untagged = add_file(&store, "/untagged");
        tag_file(&store, &tagged, "cheese");

        assert_eq!(run(&store, "not cheese"), vec![untagged.id().get()]);
    }

    #[test]
    fn unknown_tag_resolves_to_empty_set() {
        let store = store();
        add_file(&store, "/a");

        assert!(run(&store, "nonsense").is_empty());
    }

    #[test]
    fn numeric_comparison_wins_over_lexicographic() {
        let store = store();
        let nine = add_file(&store, "/nine");
        let ten = add_file(&store, "/ten");
        tag_file_value(&store, &nine, "rating", "9");
        tag_file_value(&store, &ten, "rating", "10");

        // lexicographically "10" < "9"; numerically 10 > 9
        assert_eq!(run(&store, "rating > 9"), vec![ten.id().get()]);
        assert_eq!(run(&store, "rating <= 9"), vec![nine.id().get()]);
    }

    #[test]
    fn non_numeric_values_compare_as_strings() {
        let store = store();
        let apple = add_file(&store, "/apple");
        let pear = add_file(&store, "/pear");
        tag_file_value(&store, &apple, "variety", "apple");
        tag_file_value(&store, &pear, "variety", "pear");

        assert_eq!(run(&store, "variety < banana"), vec![apple.id().get()]);
        assert_eq!(run(&store, "variety = pear"), vec![pear.id().get()]);
        assert_eq!(run(&store, "variety != pear"), vec![apple.id().get()]);
    }

    #[test]
    fn valueless_associations_do_not_match_comparisons() {
        let store = store();
        let plain = add_file(&store, "/plain");
        tag_file(&store, &plain, "rating");

        assert!(run(&store, "rating = 5").is_empty());
        assert_eq!(run(&store, "rating"), vec![plain.id().get()]);
    }

    #[test]
    fn compare_values_orders_numerically_then_lexically() {
        assert_eq!(compare_values("10", "9"), Ordering::Greater);
        assert_eq!(compare_values("2.5", "2.50"), Ordering::Equal);
        assert_eq!(compare_values("10", "banana"), Ordering::Less);
        assert_eq!(compare_values("b", "a"), Ordering::Greater);
    }
}
