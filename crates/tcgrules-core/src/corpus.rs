//! Corpus reader: a root directory with one subdirectory per category.
//!
//! ```text
//! <root>/rules/*.txt         -> Category::Rule
//! <root>/judge-calls/*.txt   -> Category::JudgeCall
//! ```
//!
//! Each `.txt` file is one document, identified as `"<category dir>/<path>"`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{Category, Document};

#[derive(Debug, Clone)]
pub struct Corpus {
    root: PathBuf,
    documents: Vec<Document>,
}

impl Corpus {
    /// Reads every category directory under `root`. A missing category
    /// directory counts as empty; the root itself must exist.
    pub fn load(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::NotFound(format!("corpus directory {}", root.display())));
        }
        let mut documents = Vec::new();
        for category in Category::ALL {
            let dir = root.join(category.dir_name());
            if !dir.is_dir() {
                warn!(dir = %dir.display(), "category directory missing, treating as empty");
                continue;
            }
            let files = list_txt_files(&dir)?;
            info!(category = %category, files = files.len(), "reading corpus files");
            for file_path in files {
                let text = read_file_content(&file_path)?;
                let source_id = source_id_for(category, &dir, &file_path);
                debug!(source_id = %source_id, chars = text.chars().count(), "read document");
                documents.push(Document { source_id, category, text });
            }
        }
        documents.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Ok(Self { root: root.to_path_buf(), documents })
    }

    pub fn from_documents(root: impl Into<PathBuf>, mut documents: Vec<Document>) -> Self {
        documents.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Self { root: root.into(), documents }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn source_id_for(category: Category, dir: &Path, file_path: &Path) -> String {
    let relative = file_path.strip_prefix(dir).unwrap_or(file_path);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    format!("{}/{}", category.dir_name(), parts.join("/"))
}

/// An unreadable entry, such as a dangling link, fails the whole listing.
fn list_txt_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut txt_files = Vec::new();
    for entry in walkdir::WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("txt") {
            txt_files.push(path.to_path_buf());
        }
    }
    txt_files.sort();
    Ok(txt_files)
}
