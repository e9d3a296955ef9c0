use crate::{BianzhengError, Record, RecordSource, Result};
use futures::future::join_all;
use tracing::{info, warn};

/// A document that could not be turned into a record.
#[derive(Debug)]
pub struct SkippedRecord {
    pub name: String,
    pub error: BianzhengError,
}

/// Outcome of a bulk load: every record that parsed, in request order, plus
/// what was skipped.
#[derive(Debug)]
pub struct LoadReport<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRecord>,
}

impl<T> LoadReport<T> {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

impl<T> Default for LoadReport<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Split `"indexes/evolution_graph.json"` into `("indexes", "evolution_graph.json")`.
pub fn split_document_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((collection, name)) => (collection, name),
        None => ("", path),
    }
}

/// Fetch and parse one document.
pub async fn fetch_json<T, S>(source: &S, collection: &str, name: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    S: RecordSource + ?Sized,
{
    let body = source.fetch(collection, name).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Load every named record of `collection` concurrently and wait for all of
/// them to settle. When `names` is empty the collection is listed first.
///
/// A failure on one document never aborts the others; it lands in
/// [`LoadReport::skipped`].
pub async fn load_records<T, S>(source: &S, collection: &str, names: &[String]) -> LoadReport<T>
where
    T: Record,
    S: RecordSource + ?Sized,
{
    let names: Vec<String> = if names.is_empty() {
        match source.list(collection).await {
            Ok(listed) => listed,
            Err(e) => {
                warn!("Could not list collection '{}': {}", collection, e);
                return LoadReport::default();
            }
        }
    } else {
        names.to_vec()
    };

    let fetches = names
        .iter()
        .map(|name| async move { (name.clone(), fetch_json::<T, S>(source, collection, name).await) });
    let results = join_all(fetches).await;

    let mut report = LoadReport::default();
    for (name, result) in results {
        match result {
            Ok(record) => report.records.push(record),
            Err(error) => {
                warn!("Skipping {}/{}: {}", collection, name, error);
                report.skipped.push(SkippedRecord { name, error });
            }
        }
    }

    info!(
        "Loaded {} {} records ({} skipped)",
        report.records.len(),
        collection,
        report.skipped.len()
    );
    report
}
