use crate::types::{CleanedTable, Gender};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// What a cached table is keyed by. One entry per (parameter, gender).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub parameter: String,
    pub gender: Gender,
}

impl TableKey {
    pub fn new(parameter: impl Into<String>, gender: Gender) -> Self {
        TableKey {
            parameter: parameter.into(),
            gender,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    table: Arc<CleanedTable>,
    fetched_at: DateTime<Utc>,
}

/// Process-lifetime memoization of normalized tables. No expiry; entries
/// live until the process exits. Two tasks racing to populate the same key
/// both compute the same value, so last-writer-wins is fine.
#[derive(Default)]
pub struct TableCache {
    entries: Mutex<HashMap<TableKey, CacheEntry>>,
}

impl TableCache {
    pub fn new() -> Self {
        TableCache::default()
    }

    pub fn get(&self, key: &TableKey) -> Option<Arc<CleanedTable>> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).map(|entry| {
            debug!(
                parameter = %key.parameter,
                gender = %key.gender,
                fetched_at = %entry.fetched_at,
                "cache hit"
            );
            Arc::clone(&entry.table)
        })
    }

    pub fn insert(&self, key: TableKey, table: CleanedTable) -> Arc<CleanedTable> {
        let table = Arc::new(table);
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            CacheEntry {
                table: Arc::clone(&table),
                fetched_at: Utc::now(),
            },
        );
        table
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NumericColumns, StatRow};

    fn one_row_table() -> CleanedTable {
        CleanedTable {
            rows: vec![StatRow {
                state: Some("All India".to_string()),
                p5: Some(1.0),
                mean: Some(2.0),
                p95: Some(3.0),
            }],
            numeric_columns: Some(NumericColumns::canonical()),
            state_column: Some("State".to_string()),
        }
    }

    #[test]
    fn get_misses_until_insert() {
        let cache = TableCache::new();
        let key = TableKey::new("STATURE", Gender::Male);

        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), one_row_table());
        let hit = cache.get(&key).expect("inserted entry is retrievable");
        assert_eq!(hit.rows.len(), 1);
    }

    #[test]
    fn keys_are_distinct_per_gender() {
        let cache = TableCache::new();
        cache.insert(TableKey::new("STATURE", Gender::Male), one_row_table());

        assert!(cache
            .get(&TableKey::new("STATURE", Gender::Female))
            .is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn last_writer_wins_on_reinsert() {
        let cache = TableCache::new();
        let key = TableKey::new("SPAN", Gender::Female);

        cache.insert(key.clone(), one_row_table());
        cache.insert(key.clone(), CleanedTable::empty());

        assert!(cache.get(&key).unwrap().rows.is_empty());
        assert_eq!(cache.len(), 1);
    }
}
