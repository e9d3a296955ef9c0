use crate::{BianzhengError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Where raw JSON documents come from. Collections are directories (or
/// directory-like groupings); names are file names inside them.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Every loadable document name in `collection`, sorted.
    async fn list(&self, collection: &str) -> Result<Vec<String>>;

    async fn fetch(&self, collection: &str, name: &str) -> Result<String>;
}

fn is_loadable(name: &str) -> bool {
    name.ends_with(".json") && !name.starts_with('_')
}

/// Rejects absolute paths and `..` components.
fn ensure_relative(part: &str) -> Result<()> {
    let escapes = Path::new(part)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(BianzhengError::Source(format!(
            "refusing to read outside the data root: {}",
            part
        )));
    }
    Ok(())
}

/// Reads documents from a directory tree with `tokio::fs`.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of `collection` under the root.
    fn collection_dir(&self, collection: &str) -> Result<PathBuf> {
        ensure_relative(collection)?;
        Ok(if collection.is_empty() {
            self.root.clone()
        } else {
            self.root.join(collection)
        })
    }

    fn path_for(&self, collection: &str, name: &str) -> Result<PathBuf> {
        ensure_relative(name)?;
        Ok(self.collection_dir(collection)?.join(name))
    }
}

#[async_trait]
impl RecordSource for FsSource {
    async fn list(&self, collection: &str) -> Result<Vec<String>> {
        let dir = self.collection_dir(collection)?;
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_loadable(&name) {
                names.push(name);
            }
        }
        names.sort();
        debug!("Listed {} documents in {:?}", names.len(), dir);
        Ok(names)
    }

    async fn fetch(&self, collection: &str, name: &str) -> Result<String> {
        let path = self.path_for(collection, name)?;
        Ok(tokio::fs::read_to_string(&path).await?)
    }
}

/// In-memory documents, for embedded fixtures and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: BTreeMap<(String, String), String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(
        mut self,
        collection: impl Into<String>,
        name: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        self.insert(collection, name, body);
        self
    }

    pub fn insert(
        &mut self,
        collection: impl Into<String>,
        name: impl Into<String>,
        body: impl Into<String>,
    ) {
        self.documents
            .insert((collection.into(), name.into()), body.into());
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn list(&self, collection: &str) -> Result<Vec<String>> {
        Ok(self
            .documents
            .keys()
            .filter(|(c, n)| c == collection && is_loadable(n))
            .map(|(_, n)| n.clone())
            .collect())
    }

    async fn fetch(&self, collection: &str, name: &str) -> Result<String> {
        self.documents
            .get(&(collection.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| BianzhengError::Source(format!("{}/{} not found", collection, name)))
    }
}
