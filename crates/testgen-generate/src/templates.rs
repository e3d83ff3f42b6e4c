use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::errors::GenerationError;

/// Source of external template text.
pub trait TemplateReader {
    /// Fetch the template named by `reference`, trying `search_paths` in
    /// order.
    fn read(&self, reference: &str, search_paths: &[PathBuf]) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
enum CacheEntry {
    Text(String),
    Missing,
}

/// Reads templates from the filesystem.
///
/// Each resolved file is read at most once per reader.
#[derive(Debug, Default)]
pub struct FsTemplateReader {
    cache: RwLock<BTreeMap<PathBuf, CacheEntry>>,
}

impl FsTemplateReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn candidates(reference: &str, search_paths: &[PathBuf]) -> Vec<PathBuf> {
        let direct = Path::new(reference);
        if direct.is_absolute() {
            return vec![direct.to_path_buf()];
        }
        search_paths.iter().map(|dir| dir.join(reference)).collect()
    }

    fn load(&self, path: &Path) -> Result<Option<String>, GenerationError> {
        if let Some(entry) = self.cached(path) {
            return Ok(match entry {
                CacheEntry::Text(text) => Some(text),
                CacheEntry::Missing => None,
            });
        }

        let entry = if path.is_file() {
            let text = fs::read_to_string(path).map_err(|source| GenerationError::TemplateRead {
                path: path.to_path_buf(),
                source,
            })?;
            CacheEntry::Text(text)
        } else {
            CacheEntry::Missing
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(path.to_path_buf(), entry.clone());
        }

        Ok(match entry {
            CacheEntry::Text(text) => Some(text),
            CacheEntry::Missing => None,
        })
    }

    fn cached(&self, path: &Path) -> Option<CacheEntry> {
        let cache = self.cache.read().ok()?;
        cache.get(path).cloned()
    }
}

impl TemplateReader for FsTemplateReader {
    fn read(&self, reference: &str, search_paths: &[PathBuf]) -> Result<String, GenerationError> {
        let candidates = Self::candidates(reference, search_paths);
        for candidate in &candidates {
            if let Some(text) = self.load(candidate)? {
                debug!(reference, path = %candidate.display(), "template loaded");
                return Ok(text);
            }
        }

        Err(GenerationError::TemplateNotFound {
            reference: reference.to_string(),
            searched: candidates
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// In-memory templates keyed by reference; search paths are ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplates {
    templates: BTreeMap<String, String>,
}

impl StaticTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reference: &str, text: &str) -> Self {
        self.insert(reference, text);
        self
    }

    pub fn insert(&mut self, reference: &str, text: &str) {
        self.templates.insert(reference.to_string(), text.to_string());
    }
}

impl TemplateReader for StaticTemplates {
    fn read(&self, reference: &str, _search_paths: &[PathBuf]) -> Result<String, GenerationError> {
        self.templates
            .get(reference)
            .cloned()
            .ok_or_else(|| GenerationError::TemplateNotFound {
                reference: reference.to_string(),
                searched: "memory".to_string(),
            })
    }
}
