//! PostgREST-style query builder.
//!
//! Builds the query string for table requests: column filters such as
//! `status=eq.pending`, `select`, `order`, `limit` and `offset`.

use std::fmt::Display;

/// Sort direction for [`Query::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Query string for a table request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns to return (`*` when never called).
    #[must_use]
    pub fn select(self, columns: &str) -> Self {
        self.set("select", columns.to_string())
    }

    #[must_use]
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    #[must_use]
    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "neq", value)
    }

    #[must_use]
    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gte", value)
    }

    #[must_use]
    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lte", value)
    }

    #[must_use]
    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lt", value)
    }

    /// Case-insensitive substring match.
    #[must_use]
    pub fn ilike(self, column: &str, term: &str) -> Self {
        let escaped = term.replace('*', "");
        self.filter(column, "ilike", format!("*{escaped}*"))
    }

    /// Column value is one of `values`. Each value is quoted so commas and
    /// parentheses inside values survive.
    #[must_use]
    pub fn in_list<I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let quoted: Vec<String> = values
            .into_iter()
            .map(|v| format!("\"{}\"", v.to_string().replace('"', "\\\"")))
            .collect();
        self.filter(column, "in", format!("({})", quoted.join(",")))
    }

    /// Append a sort key. Repeated calls sort by each key in turn.
    #[must_use]
    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        let key = format!("{column}.{}", direction.as_str());
        if let Some((_, existing)) = self.pairs.iter_mut().find(|(k, _)| k == "order") {
            existing.push(',');
            existing.push_str(&key);
            return self;
        }
        self.pairs.push(("order".to_string(), key));
        self
    }

    #[must_use]
    pub fn limit(self, limit: usize) -> Self {
        self.set("limit", limit.to_string())
    }

    #[must_use]
    pub fn offset(self, offset: usize) -> Self {
        self.set("offset", offset.to_string())
    }

    /// Query pairs in insertion order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    fn filter(mut self, column: &str, operator: &str, value: impl Display) -> Self {
        self.pairs
            .push((column.to_string(), format!("{operator}.{value}")));
        self
    }

    fn set(mut self, key: &str, value: String) -> Self {
        self.pairs.retain(|(k, _)| k != key);
        self.pairs.push((key.to_string(), value));
        self
    }
}
