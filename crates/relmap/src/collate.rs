//! Folding one-to-many join rows back into aggregates.
//!
//! A join of a parent table with a child table repeats the parent columns on
//! every child row. [`CollatingRowMapper`] keeps one aggregate per distinct
//! parent key, in the order keys are first seen, and hands every row to a
//! child-adder callback that appends the child part.
//!
//! ```ignore
//! let mapper = |row: &Record| api_binding.map_row(row);
//! let mut collator = CollatingRowMapper::new(&["id"], mapper, |api: &mut Api, row: &Record| {
//!     if !row.is_null("tag")? {
//!         api.tags.push(row.get_as("tag")?);
//!     }
//!     Ok(())
//! });
//! collator.process_rows(&rows)?;
//! let apis = collator.into_rows();
//! ```

use crate::error::{OrmError, OrmResult};
use crate::row::{Record, RowMapper};
use crate::value::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Values of the designated key columns of one row.
pub type CollationKey = Vec<Value>;

/// Streams join rows into one aggregate per distinct key.
///
/// Consuming [`into_rows`](Self::into_rows) ends the collation; a new query
/// needs a new mapper.
pub struct CollatingRowMapper<A, M, F> {
    key_columns: Vec<String>,
    mapper: M,
    child_adder: F,
    index: HashMap<CollationKey, usize>,
    aggregates: Vec<A>,
}

impl<A, M, F> CollatingRowMapper<A, M, F>
where
    M: RowMapper<A>,
    F: FnMut(&mut A, &Record) -> OrmResult<()>,
{
    pub fn new(key_columns: &[&str], mapper: M, child_adder: F) -> Self {
        Self {
            key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
            mapper,
            child_adder,
            index: HashMap::new(),
            aggregates: Vec::new(),
        }
    }

    /// Fold one row: map the parent on first sight of its key, then always
    /// run the child adder.
    pub fn process_row(&mut self, row: &Record) -> OrmResult<()> {
        let key = self.key_of(row)?;
        let idx = match self.index.entry(key) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let aggregate = self.mapper.map_row(row)?;
                self.aggregates.push(aggregate);
                *e.insert(self.aggregates.len() - 1)
            }
        };
        (self.child_adder)(&mut self.aggregates[idx], row)
    }

    pub fn process_rows<'r>(
        &mut self,
        rows: impl IntoIterator<Item = &'r Record>,
    ) -> OrmResult<()> {
        for row in rows {
            self.process_row(row)?;
        }
        Ok(())
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }

    /// The assembled aggregates in first-seen key order.
    pub fn into_rows(self) -> Vec<A> {
        self.aggregates
    }

    fn key_of(&self, row: &Record) -> OrmResult<CollationKey> {
        let key = self
            .key_columns
            .iter()
            .map(|c| row.get(c).cloned())
            .collect::<OrmResult<CollationKey>>()?;
        if key.iter().all(Value::is_null) {
            return Err(OrmError::decode(
                self.key_columns.join(","),
                "collation key is NULL",
            ));
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, PartialEq)]
    struct Api {
        id: String,
        name: String,
        properties: BTreeMap<String, String>,
    }

    fn api_mapper(row: &Record) -> OrmResult<Api> {
        Ok(Api {
            id: row.get_as("id")?,
            name: row.get_as("name")?,
            properties: BTreeMap::new(),
        })
    }

    fn add_property(api: &mut Api, row: &Record) -> OrmResult<()> {
        if row.is_null("property_key")? {
            return Ok(());
        }
        api.properties
            .insert(row.get_as("property_key")?, row.get_as("property_value")?);
        Ok(())
    }

    fn row(id: &str, name: &str, key: Option<&str>, value: Option<&str>) -> Record {
        Record::from_pairs([
            ("id", Value::from(id)),
            ("name", Value::from(name)),
            ("property_key", Value::from(key)),
            ("property_value", Value::from(value)),
        ])
    }

    #[test]
    fn folds_rows_by_key_in_first_seen_order() {
        let rows = vec![
            row("b", "B", Some("k1"), Some("v1")),
            row("a", "A", Some("k1"), Some("v1")),
            row("b", "ignored", Some("k2"), Some("v2")),
            row("c", "C", None, None),
        ];
        let mut collator = CollatingRowMapper::new(&["id"], api_mapper, add_property);
        collator.process_rows(&rows).unwrap();
        assert_eq!(collator.len(), 3);

        let apis = collator.into_rows();
        assert_eq!(
            apis.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            ["b", "a", "c"]
        );
        assert_eq!(apis[0].name, "B");
        assert_eq!(apis[0].properties.len(), 2);
        assert_eq!(apis[1].properties.len(), 1);
        assert!(apis[2].properties.is_empty());
    }

    #[test]
    fn cardinality_matches_distinct_keys() {
        let mut rows = Vec::new();
        for i in 0..60 {
            let id = format!("api-{}", i % 7);
            let key = (i % 3 != 0).then(|| format!("k{i}"));
            rows.push(row(&id, &id, key.as_deref(), Some("v")));
        }
        let mut collator = CollatingRowMapper::new(&["id"], api_mapper, add_property);
        collator.process_rows(&rows).unwrap();
        let apis = collator.into_rows();

        assert_eq!(apis.len(), 7);
        let children: usize = apis.iter().map(|a| a.properties.len()).sum();
        assert_eq!(children, (0..60).filter(|i| i % 3 != 0).count());
        for (n, api) in apis.iter().enumerate() {
            assert_eq!(api.id, format!("api-{n}"));
        }
    }

    #[test]
    fn composite_keys_are_supported() {
        let rows = vec![
            Record::from_pairs([("env", "dev"), ("name", "h"), ("v", "1")]),
            Record::from_pairs([("env", "prod"), ("name", "h"), ("v", "2")]),
            Record::from_pairs([("env", "dev"), ("name", "h"), ("v", "3")]),
        ];
        let mapper = |r: &Record| -> OrmResult<Vec<String>> { Ok(vec![r.get_as("env")?]) };
        let adder = |agg: &mut Vec<String>, r: &Record| -> OrmResult<()> {
            agg.push(r.get_as("v")?);
            Ok(())
        };
        let mut collator = CollatingRowMapper::new(&["env", "name"], mapper, adder);
        collator.process_rows(&rows).unwrap();
        assert_eq!(
            collator.into_rows(),
            vec![vec!["dev".to_string(), "1".into(), "3".into()], vec!["prod".into(), "2".into()]]
        );
    }

    #[test]
    fn missing_key_column_fails() {
        let mut collator = CollatingRowMapper::new(&["uuid"], api_mapper, add_property);
        let err = collator.process_row(&row("a", "A", None, None)).unwrap_err();
        assert!(matches!(err, OrmError::Decode { .. }));
    }

    #[test]
    fn empty_input_yields_no_aggregates() {
        let collator = CollatingRowMapper::new(&["id"], api_mapper, add_property);
        assert!(collator.is_empty());
        assert!(collator.into_rows().is_empty());
    }
}
