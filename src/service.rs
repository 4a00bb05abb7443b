use crate::cache::{TableCache, TableKey};
use crate::error::{DataError, Result};
use crate::fetch::SheetFetcher;
use crate::normalize::clean_table;
use crate::registry::{Parameter, Registry};
use crate::stats::{compare_tables, GenderComparison};
use crate::types::{CleanedTable, Gender};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Request-lifecycle layer: resolves parameters against the registry,
/// fetches and normalizes their sheets, and owns the memoization cache.
pub struct DataService {
    registry: &'static Registry,
    fetcher: Arc<dyn SheetFetcher>,
    cache: TableCache,
}

impl DataService {
    pub fn new(fetcher: Arc<dyn SheetFetcher>) -> Self {
        DataService {
            registry: Registry::global(),
            fetcher,
            cache: TableCache::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    fn parameter(&self, name: &str) -> Result<&Parameter> {
        self.registry
            .get(name)
            .ok_or_else(|| DataError::UnknownParameter(name.to_string()))
    }

    /// Get-or-compute the normalized table for one (parameter, gender) key.
    /// Concurrent requests for the same key may both fetch; both produce the
    /// same table and the cache keeps whichever lands last.
    #[instrument(skip(self))]
    pub async fn table(&self, parameter: &str, gender: Gender) -> Result<Arc<CleanedTable>> {
        let parameter = self.parameter(parameter)?;
        let key = TableKey::new(parameter.name.clone(), gender);

        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let links = parameter
            .links(gender)
            .ok_or_else(|| DataError::MissingSheet {
                parameter: parameter.name.clone(),
                gender,
            })?;

        let raw = self.fetcher.fetch_table(&links.sheet).await?;
        let cleaned = clean_table(&raw);

        if !cleaned.has_numeric_data() {
            warn!(
                parameter = %parameter.name,
                %gender,
                "sheet yielded no usable numeric data"
            );
        } else {
            info!(
                parameter = %parameter.name,
                %gender,
                rows = cleaned.rows.len(),
                "normalized sheet"
            );
        }

        Ok(self.cache.insert(key, cleaned))
    }

    /// Load both genders of a parameter and compare their across-region
    /// averages.
    pub async fn compare(&self, parameter: &str) -> Result<GenderComparison> {
        let name = self.parameter(parameter)?.name.clone();
        let male = self.table(&name, Gender::Male).await?;
        let female = self.table(&name, Gender::Female).await?;
        Ok(compare_tables(&name, &male, &female))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::parse_csv;
    use crate::types::RawTable;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a canned CSV body and counts how often it is asked to.
    struct StubFetcher {
        body: &'static str,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(body: &'static str) -> Self {
            StubFetcher {
                body,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SheetFetcher for StubFetcher {
        async fn fetch_table(&self, _share_url: &str) -> Result<RawTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            parse_csv(self.body)
        }
    }

    const BODY: &str = "State,5th Percentile,Mean,95th Percentile\n\
                        All India,45.0,55.3,70.2\n\
                        Punjab,48.1,57.0,73.5\n";

    #[tokio::test]
    async fn table_is_fetched_once_per_key() {
        let fetcher = Arc::new(StubFetcher::new(BODY));
        let service = DataService::new(fetcher.clone());

        let first = service.table("WEIGHT", Gender::Male).await.unwrap();
        let second = service.table("WEIGHT", Gender::Male).await.unwrap();
        assert_eq!(first.rows, second.rows);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        // A different gender is a different key.
        service.table("WEIGHT", Gender::Female).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_parameter_is_a_typed_error() {
        let service = DataService::new(Arc::new(StubFetcher::new(BODY)));
        let err = service
            .table("BEARD LENGTH", Gender::Male)
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::UnknownParameter(_)));
    }

    #[tokio::test]
    async fn comparison_uses_both_gender_tables() {
        let service = DataService::new(Arc::new(StubFetcher::new(BODY)));
        let comparison = service.compare("stature").await.unwrap();

        assert_eq!(comparison.parameter, "STATURE");
        // Same stub body on both sides, so every difference is zero.
        assert_eq!(comparison.mean.difference, Some(0.0));
    }
}
