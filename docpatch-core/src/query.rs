//! Query parameters captured when a snapshot is taken.

use std::fmt;

use crate::types::Document;

/// `database.collection` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One sort key. Text form is `field` or `-field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: SortOrder::Ascending }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: SortOrder::Descending }
    }

    /// Parse a comma-separated list such as `-age,name`. Empty items are skipped.
    pub fn parse_list(s: &str) -> Vec<SortKey> {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty() && *item != "-")
            .map(|item| match item.strip_prefix('-') {
                Some(field) => SortKey::descending(field),
                None => SortKey::ascending(item.strip_prefix('+').unwrap_or(item)),
            })
            .collect()
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            SortOrder::Ascending => f.write_str(&self.field),
            SortOrder::Descending => write!(f, "-{}", self.field),
        }
    }
}

/// Everything needed to re-run a query against the same store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryParams {
    /// Connection target understood by the store (a directory for local stores).
    pub target: String,
    pub database: String,
    pub collection: String,
    /// Top-level equality filter; empty matches everything.
    pub filter: Document,
    /// Maximum number of documents; `0` means unlimited.
    pub limit: u64,
    /// Sort keys, most significant first.
    pub sort: Vec<SortKey>,
    /// Field → `1` (include) or `0` (exclude).
    pub projection: Document,
}

impl QueryParams {
    pub fn new(
        target: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            database: database.into(),
            collection: collection.into(),
            ..Self::default()
        }
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.database.clone(), self.collection.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_display() {
        let params = QueryParams::new("/data", "shop", "orders");
        assert_eq!(params.namespace().to_string(), "shop.orders");
        assert_eq!(params.limit, 0);
        assert!(params.filter.is_empty());
    }

    #[test]
    fn sort_list_parsing_keeps_order() {
        let keys = SortKey::parse_list("-age, name,,+city");
        assert_eq!(
            keys,
            vec![
                SortKey::descending("age"),
                SortKey::ascending("name"),
                SortKey::ascending("city"),
            ]
        );
        let text: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(text, vec!["-age", "name", "city"]);
    }
}
