use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Result;
use log::warn;

enum Backend {
    Disk(PathBuf),
    Memory(HashMap<String, String>),
}

/// One prefetched sentence per word count, kept across restarts.
pub struct SentenceCache {
    backend: Backend,
}

impl SentenceCache {
    /// Disk-backed cache under the user data dir, or an in-memory one when
    /// that directory is unavailable.
    pub fn new() -> Self {
        let disk = dirs::data_dir()
            .map(|dir| dir.join("swiftype").join("sentences"))
            .ok_or_else(|| anyhow::anyhow!("no data directory"))
            .and_then(Self::with_base_dir);
        match disk {
            Ok(cache) => cache,
            Err(e) => {
                warn!("sentence cache falling back to memory: {e}");
                Self::in_memory()
            }
        }
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            backend: Backend::Disk(base_dir),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(HashMap::new()),
        }
    }

    pub fn get(&self, word_count: usize) -> Option<String> {
        let key = Self::key(word_count);
        match &self.backend {
            Backend::Disk(dir) => fs::read_to_string(dir.join(&key))
                .ok()
                .filter(|s| !s.is_empty()),
            Backend::Memory(entries) => entries.get(&key).cloned(),
        }
    }

    /// Overwrite the entry for `word_count`.
    pub fn store(&mut self, word_count: usize, sentence: &str) -> Result<()> {
        let key = Self::key(word_count);
        match &mut self.backend {
            Backend::Disk(dir) => {
                let path = dir.join(&key);
                let tmp_path = path.with_extension("tmp");
                fs::write(&tmp_path, sentence)?;
                fs::rename(&tmp_path, &path)?;
            }
            Backend::Memory(entries) => {
                entries.insert(key, sentence.to_string());
            }
        }
        Ok(())
    }

    pub fn clear(&mut self, word_count: usize) -> Result<()> {
        let key = Self::key(word_count);
        match &mut self.backend {
            Backend::Disk(dir) => match fs::remove_file(dir.join(&key)) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            },
            Backend::Memory(entries) => {
                entries.remove(&key);
            }
        }
        Ok(())
    }

    /// Take the cached sentence, leaving the slot empty.
    pub fn consume(&mut self, word_count: usize) -> Option<String> {
        let sentence = self.get(word_count)?;
        if let Err(e) = self.clear(word_count) {
            warn!("failed to clear cached sentence for {word_count} words: {e}");
        }
        Some(sentence)
    }

    fn key(word_count: usize) -> String {
        Self::sanitize_key(&format!("next_sentence_{word_count}.txt"))
    }

    fn sanitize_key(key: &str) -> String {
        key.chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}
