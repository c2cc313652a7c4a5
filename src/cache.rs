use std::fs;
use std::path::PathBuf;

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::config::config_directory;
use crate::error::{AppError, AppResult};
use crate::services::SummarySection;

const CACHE_FILE_NAME: &str = "summary_cache.json";
const CACHE_LIMIT: usize = 256;

#[derive(Default, Serialize, Deserialize)]
struct CacheFile {
    entries: Vec<CacheEntry>,
}

#[derive(Serialize, Deserialize, Clone)]
struct CacheEntry {
    key: String,
    summary: String,
}

/// Summaries of previously seen diff content, keyed by a hash of that content.
pub struct SummaryCache {
    file_path: PathBuf,
    file: CacheFile,
}

impl SummaryCache {
    pub fn load() -> AppResult<Self> {
        let dir = config_directory()?;
        Self::load_from(dir.join(CACHE_FILE_NAME))
    }

    pub fn load_from(path: PathBuf) -> AppResult<Self> {
        let file = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<CacheFile>(&contents)
                .map_err(|err| AppError::Configuration(format!("invalid cache file: {err}")))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => CacheFile::default(),
            Err(err) => return Err(AppError::Io(err)),
        };

        Ok(Self {
            file_path: path,
            file,
        })
    }

    #[cfg(test)]
    pub fn empty(path: PathBuf) -> Self {
        Self {
            file_path: path,
            file: CacheFile::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.file
            .entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.summary.clone())
    }

    pub fn insert(&mut self, key: String, summary: &str) {
        self.file.entries.retain(|entry| entry.key != key);
        self.file.entries.push(CacheEntry {
            key,
            summary: summary.to_string(),
        });

        if self.file.entries.len() > CACHE_LIMIT {
            let overflow = self.file.entries.len() - CACHE_LIMIT;
            self.file.entries.drain(0..overflow);
        }
    }

    pub fn save(&self) -> AppResult<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.file)
            .map_err(|err| AppError::Configuration(format!("failed to write cache: {err}")))?;
        fs::write(&self.file_path, data)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.file.entries.len()
    }

    pub fn compute_key(instructions: &str, model: &str, sections: &[SummarySection]) -> String {
        let mut hasher = Hasher::new();
        hasher.update(instructions.as_bytes());
        hasher.update(b"\0");
        hasher.update(model.as_bytes());
        for section in sections {
            hasher.update(b"\0");
            hasher.update(section.file.as_bytes());
            hasher.update(b"\0");
            hasher.update(section.content.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
