//! Document stores.
//!
//! [`DocumentStore`] is the seam between the engine and whatever holds the
//! documents. Two implementations ship: [`MemoryStore`] and
//! [`crate::local_store::LocalStore`]. Both share the query semantics in
//! [`run_query`]:
//!
//! - filter: equality on top-level fields; numbers compare across widths
//! - sort: by field list, using the total type order of [`compare_values`]
//! - projection: inclusion or exclusion; `_id` is kept unless excluded
//! - limit: `0` means unlimited

use std::cmp::Ordering;
use std::collections::HashMap;

use docpatch_core::{Document, Namespace, QueryParams, SortOrder, Value};

use crate::error::StoreError;

/// Result of an `update_one`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// Minimal CRUD surface the engine needs.
pub trait DocumentStore {
    /// Run `query` against its namespace. Unknown namespaces are empty.
    fn find(&self, query: &QueryParams) -> Result<Vec<Document>, StoreError>;

    /// Fails with [`StoreError::DuplicateKey`] if `_id` is already taken.
    fn insert_one(&mut self, namespace: &Namespace, document: Document) -> Result<(), StoreError>;

    /// Set `fields` on the first document matching `filter`.
    fn update_one(
        &mut self,
        namespace: &Namespace,
        filter: &Document,
        fields: &Document,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Delete the first document matching `filter`, returning the count deleted.
    fn delete_one(&mut self, namespace: &Namespace, filter: &Document) -> Result<u64, StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store; collections keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<Namespace, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `documents` in `namespace`.
    pub fn with_documents(namespace: Namespace, documents: Vec<Document>) -> Self {
        let mut store = Self::new();
        store.collections.insert(namespace, documents);
        store
    }

    pub fn documents(&self, namespace: &Namespace) -> &[Document] {
        self.collections
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl DocumentStore for MemoryStore {
    fn find(&self, query: &QueryParams) -> Result<Vec<Document>, StoreError> {
        run_query(self.documents(&query.namespace()), query)
    }

    fn insert_one(&mut self, namespace: &Namespace, document: Document) -> Result<(), StoreError> {
        let docs = self.collections.entry(namespace.clone()).or_default();
        insert_into(docs, document)
    }

    fn update_one(
        &mut self,
        namespace: &Namespace,
        filter: &Document,
        fields: &Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let docs = self.collections.entry(namespace.clone()).or_default();
        Ok(update_in(docs, filter, fields))
    }

    fn delete_one(&mut self, namespace: &Namespace, filter: &Document) -> Result<u64, StoreError> {
        let docs = self.collections.entry(namespace.clone()).or_default();
        Ok(delete_from(docs, filter))
    }
}

// ---------------------------------------------------------------------------
// Shared collection operations
// ---------------------------------------------------------------------------

pub(crate) fn insert_into(docs: &mut Vec<Document>, document: Document) -> Result<(), StoreError> {
    if let Some(id) = document.get("_id") {
        let taken = docs
            .iter()
            .any(|d| d.get("_id").is_some_and(|existing| values_equal(existing, id)));
        if taken {
            return Err(StoreError::DuplicateKey {
                key: format!("_id {}", docpatch_codec::render_value(id, true, "")),
            });
        }
    }
    docs.push(document);
    Ok(())
}

pub(crate) fn update_in(docs: &mut [Document], filter: &Document, fields: &Document) -> UpdateOutcome {
    let Some(target) = docs.iter_mut().find(|d| matches_filter(d, filter)) else {
        return UpdateOutcome::default();
    };
    let mut modified = false;
    for (key, value) in fields.iter() {
        if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            modified = true;
        }
    }
    UpdateOutcome {
        matched: 1,
        modified: u64::from(modified),
    }
}

pub(crate) fn delete_from(docs: &mut Vec<Document>, filter: &Document) -> u64 {
    match docs.iter().position(|d| matches_filter(d, filter)) {
        Some(index) => {
            docs.remove(index);
            1
        }
        None => 0,
    }
}

// ---------------------------------------------------------------------------
// Query evaluation
// ---------------------------------------------------------------------------

/// Apply filter, sort, limit and projection to `docs`, in that order.
pub fn run_query(docs: &[Document], query: &QueryParams) -> Result<Vec<Document>, StoreError> {
    let projection = Projection::parse(&query.projection)?;

    let mut matched: Vec<&Document> = docs
        .iter()
        .filter(|d| matches_filter(d, &query.filter))
        .collect();

    if !query.sort.is_empty() {
        // Stable, so ties keep natural order.
        matched.sort_by(|a, b| {
            query
                .sort
                .iter()
                .map(|key| {
                    let ord = compare_fields(a.get(&key.field), b.get(&key.field));
                    match key.order {
                        SortOrder::Ascending => ord,
                        SortOrder::Descending => ord.reverse(),
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
    let take = if limit == 0 { usize::MAX } else { limit };

    Ok(matched
        .into_iter()
        .take(take)
        .map(|d| projection.apply(d))
        .collect())
}

/// Top-level equality on every filter field. A `null` filter value also
/// matches an absent field.
pub fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| match doc.get(key) {
        Some(actual) => values_equal(actual, expected),
        None => matches!(expected, Value::Null),
    })
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal
}

/// Missing fields sort like `null`.
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let null = Value::Null;
    compare_values(a.unwrap_or(&null), b.unwrap_or(&null))
}

/// Rank of each type in the cross-type order.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 1,
        Value::Int32(_) | Value::Int64(_) | Value::Double(_) | Value::Decimal128(_) => 2,
        Value::String(_) => 3,
        Value::Document(_) => 4,
        Value::Array(_) => 5,
        Value::Binary(_) => 6,
        Value::ObjectId(_) => 7,
        Value::Boolean(_) => 8,
        Value::DateTime(_) => 9,
        Value::Timestamp(_) => 10,
        Value::Regex(_) => 11,
    }
}

/// Total order over values: first by type rank, then within the type.
/// Numbers of any width compare by value; NaN sorts below every number.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Int32(x), Value::Int32(y)) => x.cmp(y),
        (Value::Int64(x), Value::Int64(y)) => x.cmp(y),
        (Value::Int32(x), Value::Int64(y)) => i64::from(*x).cmp(y),
        (Value::Int64(x), Value::Int32(y)) => x.cmp(&i64::from(*y)),
        _ if a.is_number() => compare_numbers(number(a), number(b)),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Document(x), Value::Document(y)) => {
            for ((ka, va), (kb, vb)) in x.iter().zip(y.iter()) {
                let ord = ka.cmp(kb).then_with(|| compare_values(va, vb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Array(x), Value::Array(y)) => {
            for (va, vb) in x.iter().zip(y.iter()) {
                let ord = compare_values(va, vb);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Binary(x), Value::Binary(y)) => x
            .bytes
            .len()
            .cmp(&y.bytes.len())
            .then(x.subtype.cmp(&y.subtype))
            .then_with(|| x.bytes.cmp(&y.bytes)),
        (Value::ObjectId(x), Value::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        (Value::Timestamp(x), Value::Timestamp(y)) => {
            (x.time, x.increment).cmp(&(y.time, y.increment))
        }
        (Value::Regex(x), Value::Regex(y)) => {
            (&x.pattern, &x.options).cmp(&(&y.pattern, &y.options))
        }
        _ => Ordering::Equal,
    }
}

fn number(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

fn compare_numbers(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

enum Projection {
    All,
    /// Listed fields, plus `_id` when `keep_id`.
    Include { fields: Vec<String>, keep_id: bool },
    Exclude { fields: Vec<String> },
}

impl Projection {
    fn parse(spec: &Document) -> Result<Self, StoreError> {
        if spec.is_empty() {
            return Ok(Projection::All);
        }

        let mut include = Vec::new();
        let mut exclude = Vec::new();
        let mut keep_id = true;
        for (field, flag) in spec.iter() {
            let on = match flag {
                Value::Boolean(b) => *b,
                v if v.is_number() => number(v) != 0.0,
                other => {
                    return Err(StoreError::InvalidQuery(format!(
                        "projection for '{field}' must be 0/1 or a bool, got {}",
                        other.type_name()
                    )))
                }
            };
            match (field.as_str(), on) {
                ("_id", on) => keep_id = on,
                (_, true) => include.push(field.clone()),
                (_, false) => exclude.push(field.clone()),
            }
        }

        match (include.is_empty(), exclude.is_empty()) {
            (false, false) => Err(StoreError::InvalidQuery(
                "projection cannot mix inclusion and exclusion".to_string(),
            )),
            (false, true) => Ok(Projection::Include { fields: include, keep_id }),
            (true, _) => {
                if !keep_id {
                    exclude.push("_id".to_string());
                }
                Ok(Projection::Exclude { fields: exclude })
            }
        }
    }

    fn apply(&self, doc: &Document) -> Document {
        match self {
            Projection::All => doc.clone(),
            Projection::Include { fields, keep_id } => doc
                .iter()
                .filter(|(k, _)| (*keep_id && k.as_str() == "_id") || fields.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Projection::Exclude { fields } => doc
                .iter()
                .filter(|(k, _)| !fields.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpatch_core::SortKey;
    use rstest::rstest;

    fn ns() -> Namespace {
        Namespace::new("shop", "people")
    }

    fn people() -> MemoryStore {
        MemoryStore::with_documents(
            ns(),
            vec![
                Document::new().with("_id", "p1").with("name", "ann").with("age", 31),
                Document::new().with("_id", "p2").with("name", "bob").with("age", 25i64),
                Document::new().with("_id", "p3").with("name", "cid").with("age", 40.0),
                Document::new().with("_id", "p4").with("name", "dee"),
            ],
        )
    }

    fn query() -> QueryParams {
        QueryParams::new("mem", "shop", "people")
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().filter_map(|d| d.get("_id").and_then(Value::as_str)).collect()
    }

    #[test]
    fn empty_query_returns_natural_order() {
        let docs = people().find(&query()).unwrap();
        assert_eq!(ids(&docs), vec!["p1", "p2", "p3", "p4"]);
    }

    #[rstest]
    #[case(Value::Int32(25), vec!["p2"])]
    #[case(Value::Int64(31), vec!["p1"])]
    #[case(Value::Double(40.0), vec!["p3"])]
    #[case(Value::Null, vec!["p4"])]
    fn filter_compares_numbers_across_widths(#[case] age: Value, #[case] expected: Vec<&str>) {
        let q = QueryParams {
            filter: Document::new().with("age", age),
            ..query()
        };
        assert_eq!(ids(&people().find(&q).unwrap()), expected);
    }

    #[test]
    fn sort_descending_puts_missing_last() {
        let q = QueryParams {
            sort: vec![SortKey::descending("age")],
            ..query()
        };
        assert_eq!(ids(&people().find(&q).unwrap()), vec!["p3", "p1", "p2", "p4"]);
    }

    #[test]
    fn limit_applies_after_sort() {
        let q = QueryParams {
            sort: vec![SortKey::ascending("name")],
            limit: 2,
            ..query()
        };
        assert_eq!(ids(&people().find(&q).unwrap()), vec!["p1", "p2"]);
    }

    #[test]
    fn inclusion_projection_keeps_id() {
        let q = QueryParams {
            projection: Document::new().with("name", 1),
            ..query()
        };
        let docs = people().find(&q).unwrap();
        assert_eq!(docs[0], Document::new().with("_id", "p1").with("name", "ann"));
    }

    #[test]
    fn exclusion_projection() {
        let q = QueryParams {
            projection: Document::new().with("age", 0).with("_id", false),
            ..query()
        };
        let docs = people().find(&q).unwrap();
        assert_eq!(docs[1], Document::new().with("name", "bob"));
    }

    #[test]
    fn mixed_projection_is_rejected() {
        let q = QueryParams {
            projection: Document::new().with("age", 0).with("name", 1),
            ..query()
        };
        assert!(matches!(people().find(&q), Err(StoreError::InvalidQuery(_))));
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut store = people();
        let err = store
            .insert_one(&ns(), Document::new().with("_id", "p1"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[test]
    fn update_sets_fields_on_first_match() {
        let mut store = people();
        let outcome = store
            .update_one(
                &ns(),
                &Document::new().with("_id", "p2"),
                &Document::new().with("age", 26),
            )
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });
        assert_eq!(store.documents(&ns())[1].get("age"), Some(&Value::Int32(26)));

        let missing = store
            .update_one(&ns(), &Document::new().with("_id", "zz"), &Document::new())
            .unwrap();
        assert_eq!(missing.matched, 0);
    }

    #[test]
    fn delete_reports_count() {
        let mut store = people();
        assert_eq!(store.delete_one(&ns(), &Document::new().with("_id", "p3")).unwrap(), 1);
        assert_eq!(store.delete_one(&ns(), &Document::new().with("_id", "p3")).unwrap(), 0);
        assert_eq!(store.documents(&ns()).len(), 3);
    }

    #[test]
    fn cross_type_order() {
        let ordered = [
            Value::Null,
            Value::Int32(-1),
            Value::Double(0.5),
            Value::from("a"),
            Value::from(Document::new()),
            Value::from(vec![Value::Int32(1)]),
            Value::Boolean(false),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(compare_values(&pair[0], &pair[1]), Ordering::Less, "{pair:?}");
        }
        assert_eq!(compare_values(&Value::Double(f64::NAN), &Value::Int32(i32::MIN)), Ordering::Less);
    }
}
