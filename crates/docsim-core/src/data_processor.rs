use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::Document;

/// Walks a directory tree and loads every file with the configured extension as one document.
#[derive(Debug, Clone)]
pub struct DataProcessor {
    extension: String,
}

impl Default for DataProcessor {
    fn default() -> Self { Self { extension: "txt".to_string() } }
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_extension(extension: impl AsRef<str>) -> Self {
        Self { extension: extension.as_ref().trim_start_matches('.').to_string() }
    }

    /// Any walk or read error aborts the whole pass.
    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<Document>> {
        let files = self.list_files(data_dir)?;
        if files.is_empty() {
            info!(dir = %data_dir.display(), ext = %self.extension, "no matching files found");
            return Ok(vec![]);
        }
        let mut documents = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.into_iter().enumerate() {
            debug!("Reading file {}: {}", file_index + 1, file_path.display());
            let bytes = fs::read(&file_path).map_err(|source| Error::Read { path: file_path.clone(), source })?;
            documents.push(Document::from_file(file_path, bytes));
        }
        info!("Read {} documents from {}", documents.len(), data_dir.display());
        Ok(documents)
    }

    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() { continue; }
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some(self.extension.as_str()) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }
}
