//! Query construction and translation for document stores.
//!
//! This module composes parsed filter predicates, sort keys, and a pagination
//! window into a store-agnostic [`QueryExpression`]. The pipeline ordering is
//! fixed: filter, then sort, then window. Sorting occurs before windowing so
//! pagination partitions a stable ordering.
//!
//! A query can also be rendered to an AQL-style text form with
//! [`QueryExpression::to_aql`]. Operand values are never interpolated into
//! the rendered text; each becomes a numbered bind variable. Field and
//! collection names are identifier-validated before they reach the text.
//!
//! # Example
//!
//! ```
//! use docmodel_core::expr::parse_filter;
//! use docmodel_core::query::{build_query, Window};
//!
//! let query = build_query(
//!     "users",
//!     vec![parse_filter("age >= 21").unwrap()],
//!     vec![],
//!     Window::default(),
//! )
//! .unwrap();
//!
//! let aql = query.to_aql();
//! assert_eq!(
//!     aql.text,
//!     "FOR doc IN users FILTER doc.age >= @v0 LIMIT 0, 100 RETURN doc"
//! );
//! ```

use std::collections::HashMap;

use bson::Bson;

use crate::error::ModelResult;
use crate::expr::{validate_identifier, FilterExpr, FilterOp, SortDirection, SortKey};

/// The iteration variable every record is bound to in rendered query text.
const RECORD_ALIAS: &str = "doc";

/// A pagination window: records to skip and the maximum to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Number of records to skip before returning results.
    pub skip: usize,
    /// Maximum number of records to return.
    pub limit: usize,
}

impl Default for Window {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

/// What a query produces: the matching records, or their count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Return the filtered, sorted, windowed records.
    Records,
    /// Return a single scalar: the count of the filtered set.
    /// Sorting and windowing do not apply.
    Count,
}

/// A store-agnostic query over a single collection.
///
/// Filters apply in list order with AND semantics; sort keys apply in list
/// order as a stable multi-key sort. Construct via [`build_query`] or
/// [`build_count_query`], which validate the collection name.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryExpression {
    /// The collection the query iterates over.
    pub collection: String,
    /// Predicates, implicitly ANDed in list order.
    pub filters: Vec<FilterExpr>,
    /// Sort keys in priority order; empty for count queries.
    pub sorts: Vec<SortKey>,
    /// Pagination window; `None` for count queries.
    pub window: Option<Window>,
    /// Record or count projection.
    pub projection: Projection,
}

/// A rendered query: AQL-style text plus its bind variables.
///
/// The text references operands only through `@vN` placeholders; the typed
/// values live in `bind_vars`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    /// The query text.
    pub text: String,
    /// Bind variable name to typed value.
    pub bind_vars: HashMap<String, Bson>,
}

/// Builds a record query scoped to a named collection.
///
/// # Errors
///
/// Returns [`ModelError::InvalidExpression`](crate::error::ModelError) if the
/// collection name is not a valid identifier.
pub fn build_query(
    collection: &str,
    filters: Vec<FilterExpr>,
    sorts: Vec<SortKey>,
    window: Window,
) -> ModelResult<QueryExpression> {
    validate_identifier(collection)?;

    Ok(QueryExpression {
        collection: collection.to_string(),
        filters,
        sorts,
        window: Some(window),
        projection: Projection::Records,
    })
}

/// Builds a count query over the filtered set of a named collection.
///
/// The count aggregates after filtering; sorting and windowing are not part
/// of a count query.
///
/// # Errors
///
/// Returns [`ModelError::InvalidExpression`](crate::error::ModelError) if the
/// collection name is not a valid identifier.
pub fn build_count_query(collection: &str, filters: Vec<FilterExpr>) -> ModelResult<QueryExpression> {
    validate_identifier(collection)?;

    Ok(QueryExpression {
        collection: collection.to_string(),
        filters,
        sorts: Vec::new(),
        window: None,
        projection: Projection::Count,
    })
}

impl QueryExpression {
    /// Renders this query to AQL-style text with bind variables.
    ///
    /// Each filter operand is replaced by a `@vN` placeholder and its typed
    /// value recorded in the bind map, so no operand text can inject into the
    /// query. `LIKE` renders as the case-insensitive call form
    /// `LIKE(doc.field, @vN, true)`.
    pub fn to_aql(&self) -> RenderedQuery {
        let mut text = format!("FOR {RECORD_ALIAS} IN {}", self.collection);
        let mut bind_vars = HashMap::new();

        for (i, filter) in self.filters.iter().enumerate() {
            let var = format!("v{i}");
            let path = format!("{RECORD_ALIAS}.{}", filter.field);

            let clause = match filter.op {
                FilterOp::Eq => format!(" FILTER {path} == @{var}"),
                FilterOp::Ne => format!(" FILTER {path} != @{var}"),
                FilterOp::Lt => format!(" FILTER {path} < @{var}"),
                FilterOp::Lte => format!(" FILTER {path} <= @{var}"),
                FilterOp::Gt => format!(" FILTER {path} > @{var}"),
                FilterOp::Gte => format!(" FILTER {path} >= @{var}"),
                FilterOp::Like => format!(" FILTER LIKE({path}, @{var}, true)"),
            };
            text.push_str(&clause);

            bind_vars.insert(var, Bson::from(&filter.operand));
        }

        for sort in &self.sorts {
            let direction = match sort.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };

            text.push_str(&format!(" SORT {RECORD_ALIAS}.{} {direction}", sort.field));
        }

        if let Some(window) = self.window {
            text.push_str(&format!(" LIMIT {}, {}", window.skip, window.limit));
        }

        match self.projection {
            Projection::Records => text.push_str(&format!(" RETURN {RECORD_ALIAS}")),
            Projection::Count => text.push_str(" COLLECT WITH COUNT INTO total RETURN total"),
        }

        RenderedQuery { text, bind_vars }
    }
}
