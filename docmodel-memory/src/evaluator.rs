//! Predicate evaluation for in-memory record filtering and sorting.

use std::{cmp::Ordering, collections::HashMap};

use bson::{datetime::DateTime, Bson, Document};

use docmodel_core::expr::{FilterExpr, FilterOp, SortDirection, SortKey};

/// Type-erased, comparable representation of BSON values.
///
/// Wraps BSON values and provides the comparison operations filters need,
/// normalizing all numeric types to f64.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value (also what an absent field reads as)
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Rank used to totally order values of different types when sorting.
    /// Null sorts before everything, objects after everything.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::DateTime(_) => 3,
            Comparable::String(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Map(_) => 6,
        }
    }
}

/// Totally orders two values for sorting: by type rank first, then by value
/// within the same type. Incomparable same-rank values tie.
fn sort_value_cmp(left: &Comparable<'_>, right: &Comparable<'_>) -> Ordering {
    left.type_rank()
        .cmp(&right.type_rank())
        .then_with(|| left.partial_cmp(right).unwrap_or(Ordering::Equal))
}

/// Evaluates a single flat predicate against a record.
///
/// An absent field reads as null, so `field == null` matches records missing
/// the field. Ordered comparisons across incompatible types are false.
pub(crate) fn matches_filter(record: &Document, filter: &FilterExpr) -> bool {
    let field_value = record.get(&filter.field).unwrap_or(&Bson::Null);
    let operand = Bson::from(&filter.operand);

    let left = Comparable::from(field_value);
    let right = Comparable::from(&operand);

    match filter.op {
        FilterOp::Eq => left == right,
        FilterOp::Ne => left != right,
        FilterOp::Lt | FilterOp::Lte | FilterOp::Gt | FilterOp::Gte => {
            match left.partial_cmp(&right) {
                Some(ordering) => match filter.op {
                    FilterOp::Lt => ordering == Ordering::Less,
                    FilterOp::Lte => ordering != Ordering::Greater,
                    FilterOp::Gt => ordering == Ordering::Greater,
                    FilterOp::Gte => ordering != Ordering::Less,
                    _ => unreachable!(),
                },
                None => false,
            }
        }
        FilterOp::Like => match (left, right) {
            (Comparable::String(text), Comparable::String(pattern)) => {
                like_match(text, pattern)
            }
            _ => false,
        },
    }
}

/// Evaluates every predicate in list order (AND semantics).
pub(crate) fn matches_all(record: &Document, filters: &[FilterExpr]) -> bool {
    filters
        .iter()
        .all(|filter| matches_filter(record, filter))
}

/// Superset match: every field of the example must compare equal on the
/// record. An absent record field reads as null.
pub(crate) fn matches_example(record: &Document, example: &Document) -> bool {
    example.iter().all(|(key, value)| {
        Comparable::from(record.get(key).unwrap_or(&Bson::Null)) == Comparable::from(value)
    })
}

/// Orders two records under a multi-key sort: subsequent keys break ties of
/// prior keys. Use with a stable sort so fully tied records keep their
/// relative order.
pub(crate) fn compare_records(a: &Document, b: &Document, sorts: &[SortKey]) -> Ordering {
    for sort in sorts {
        let left = Comparable::from(a.get(&sort.field).unwrap_or(&Bson::Null));
        let right = Comparable::from(b.get(&sort.field).unwrap_or(&Bson::Null));

        let ordering = match sort.direction {
            SortDirection::Asc => sort_value_cmp(&left, &right),
            SortDirection::Desc => sort_value_cmp(&right, &left),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Case-insensitive wildcard match: `%` matches any sequence, `_` exactly
/// one character. Everything else matches literally.
///
/// Iterative two-pointer scan with single-`%` backtracking: on a mismatch
/// the match resumes one character past where the most recent `%` started
/// absorbing. Linear stack, at most quadratic time.
fn like_match(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase().chars().collect::<Vec<_>>();
    let pattern = pattern
        .to_lowercase()
        .chars()
        .collect::<Vec<_>>();

    let mut t = 0;
    let mut p = 0;
    let mut backtrack = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('_') => {
                t += 1;
                p += 1;
            }
            Some(c) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((bp, bt)) => {
                    backtrack = Some((bp, bt + 1));
                    p = bp + 1;
                    t = bt + 1;
                }
                None => return false,
            },
        }
    }

    // Only trailing wildcards may remain once the text is consumed.
    pattern[p..].iter().all(|c| *c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docmodel_core::expr::parse_filter;

    #[test]
    fn numeric_comparison_crosses_bson_number_types() {
        let record = doc! { "test": 2_i32 };

        assert!(matches_filter(&record, &parse_filter("test == 2").unwrap()));
        assert!(matches_filter(&record, &parse_filter("test >= 2").unwrap()));
        assert!(matches_filter(&record, &parse_filter("test <= 2").unwrap()));
        assert!(!matches_filter(&record, &parse_filter("test > 2").unwrap()));
        assert!(!matches_filter(&record, &parse_filter("test < 2").unwrap()));
        assert!(matches_filter(&record, &parse_filter("test != 3").unwrap()));
    }

    #[test]
    fn absent_field_reads_as_null() {
        let record = doc! { "other": 1 };

        assert!(matches_filter(&record, &parse_filter("test == null").unwrap()));
        assert!(!matches_filter(&record, &parse_filter("test == 2").unwrap()));
        // Ordered comparison against null is false.
        assert!(!matches_filter(&record, &parse_filter("test < 2").unwrap()));
    }

    #[test]
    fn like_matches_wildcards_case_insensitively() {
        let record = doc! { "test": "qwe312" };

        assert!(matches_filter(&record, &parse_filter("test LIKE qwe3%").unwrap()));
        assert!(matches_filter(&record, &parse_filter("test LIKE QWE3%").unwrap()));
        assert!(matches_filter(&record, &parse_filter("test LIKE %312").unwrap()));
        assert!(matches_filter(&record, &parse_filter("test LIKE qwe_12").unwrap()));
        assert!(!matches_filter(&record, &parse_filter("test LIKE qwe1%").unwrap()));
        assert!(!matches_filter(&record, &parse_filter("test LIKE qwe").unwrap()));
    }

    #[test]
    fn like_handles_long_texts_and_repeated_wildcards() {
        let record = doc! { "test": "a".repeat(20_000) };

        assert!(matches_filter(
            &record,
            &parse_filter("test LIKE %a%a%a%a%").unwrap()
        ));
        assert!(!matches_filter(
            &record,
            &parse_filter("test LIKE %a%a%a%b").unwrap()
        ));
    }

    #[test]
    fn like_on_non_string_field_is_false() {
        let record = doc! { "test": 2 };

        assert!(!matches_filter(&record, &parse_filter("test LIKE 2%").unwrap()));
    }

    #[test]
    fn example_match_is_superset_equality() {
        let record = doc! { "a": 1, "b": "x", "c": true };

        assert!(matches_example(&record, &doc! { "a": 1 }));
        assert!(matches_example(&record, &doc! { "a": 1, "b": "x" }));
        assert!(!matches_example(&record, &doc! { "a": 2 }));
        assert!(!matches_example(&record, &doc! { "d": 1 }));
        assert!(matches_example(&record, &doc! {}));
    }

    #[test]
    fn multi_key_sort_breaks_ties_in_order() {
        let a = doc! { "x": 1, "y": 2 };
        let b = doc! { "x": 1, "y": 1 };

        let sorts = [
            docmodel_core::expr::parse_sort("x ASC").unwrap(),
            docmodel_core::expr::parse_sort("y ASC").unwrap(),
        ];

        assert_eq!(compare_records(&a, &b, &sorts), Ordering::Greater);
        assert_eq!(compare_records(&b, &a, &sorts), Ordering::Less);
        assert_eq!(compare_records(&a, &a, &sorts), Ordering::Equal);
    }

    #[test]
    fn nulls_sort_first_ascending() {
        let missing = doc! {};
        let present = doc! { "x": 0 };

        let sorts = [docmodel_core::expr::parse_sort("x ASC").unwrap()];

        assert_eq!(compare_records(&missing, &present, &sorts), Ordering::Less);
    }
}
