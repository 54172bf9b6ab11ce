//! Flat-file index store.
//!
//! An [`Index`] is an ordered list of [`DocumentRecord`]s backed by one JSON
//! file named after the index id (`{id}.json`). Every mutation rewrites the
//! whole file: the new contents go to a temporary file in the same directory
//! which is then renamed over the old one, so readers only ever see a
//! complete snapshot.
//!
//! There is no locking. Two processes adding to the same file race, and the
//! later sync wins.

use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::document::{DocumentRecord, random_id};
use crate::error::{DocIndexError, Result};

/// Extension of persisted index files.
pub const INDEX_EXTENSION: &str = "json";

/// A persisted collection of document records.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    id: String,
    path: PathBuf,
    documents: Vec<DocumentRecord>,
}

impl Index {
    /// Load the index at `path` if it exists, otherwise create a fresh empty
    /// index in `index_dir`.
    ///
    /// A fresh index gets a new random id and is written to disk before this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::Io`] or [`DocIndexError::Serialization`] if
    /// the file cannot be read, decoded or written.
    pub fn open(path: Option<&Path>, index_dir: impl AsRef<Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                warn!(path = %path.display(), "index file not found, creating a new index");
                Self::create(index_dir)
            }
            None => Self::create(index_dir),
        }
    }

    /// Create and persist an empty index with an id not yet used in `index_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::Io`] if the directory or file cannot be written.
    pub fn create(index_dir: impl AsRef<Path>) -> Result<Self> {
        let index_dir = index_dir.as_ref();
        std::fs::create_dir_all(index_dir).map_err(|e| DocIndexError::io(index_dir, e))?;

        let (id, path) = loop {
            let id = random_id();
            let path = index_dir.join(format!("{id}.{INDEX_EXTENSION}"));
            if !path.exists() {
                break (id, path);
            }
            debug!(id, "index id already taken, drawing another");
        };

        let index = Self { id, path, documents: Vec::new() };
        index.sync()?;
        info!(index.id = %index.id, path = %index.path.display(), "created index");
        Ok(index)
    }

    /// Load an existing index file, taking the id from the file name.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::NotFound`] if the file is missing,
    /// [`DocIndexError::InvalidInput`] if the file name yields no id, and
    /// [`DocIndexError::Io`] or [`DocIndexError::Serialization`] on read or
    /// decode failure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocIndexError::NotFound(path.to_path_buf()));
        }
        let id = id_from_path(path)?;
        let raw = std::fs::read(path).map_err(|e| DocIndexError::io(path, e))?;
        let documents: Vec<DocumentRecord> = serde_json::from_slice(&raw)
            .map_err(|source| DocIndexError::Serialization { path: path.to_path_buf(), source })?;

        info!(index.id = %id, document_count = documents.len(), "loaded index");
        Ok(Self { id, path: path.to_path_buf(), documents })
    }

    /// The index id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records in insertion order.
    pub fn documents(&self) -> &[DocumentRecord] {
        &self.documents
    }

    /// Look up a record by id.
    pub fn get(&self, document_id: &str) -> Option<&DocumentRecord> {
        self.documents.iter().find(|d| d.id == document_id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Total number of chunks across all records.
    pub fn chunk_count(&self) -> usize {
        self.documents.iter().map(|d| d.data.len()).sum()
    }

    /// Append a record and sync. Returns the id the record was stored under.
    ///
    /// A record whose id is already present is re-keyed, chunk ids included.
    ///
    /// # Errors
    ///
    /// Returns the [`sync`](Index::sync) error. The record stays in memory.
    pub fn add(&mut self, mut record: DocumentRecord) -> Result<String> {
        let taken: HashSet<&str> = self.documents.iter().map(|d| d.id.as_str()).collect();
        if taken.contains(record.id.as_str()) {
            let fresh = loop {
                let id = random_id();
                if !taken.contains(id.as_str()) {
                    break id;
                }
            };
            warn!(old_id = %record.id, new_id = %fresh, "document id collision, re-keying");
            record.rekey(fresh);
        }

        let id = record.id.clone();
        let chunk_count = record.data.len();
        self.documents.push(record);
        self.sync()?;

        info!(index.id = %self.id, document.id = %id, chunk_count, "document added");
        Ok(id)
    }

    /// Remove a record by id and sync. Returns `None`, without syncing, if no
    /// record has that id.
    ///
    /// # Errors
    ///
    /// Returns the [`sync`](Index::sync) error.
    pub fn remove(&mut self, document_id: &str) -> Result<Option<DocumentRecord>> {
        let Some(position) = self.documents.iter().position(|d| d.id == document_id) else {
            return Ok(None);
        };
        let removed = self.documents.remove(position);
        self.sync()?;

        info!(index.id = %self.id, document.id = %document_id, "document removed");
        Ok(Some(removed))
    }

    /// Overwrite the backing file with the in-memory records.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::Io`] if the file cannot be written and
    /// [`DocIndexError::Serialization`] if encoding fails.
    pub fn sync(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| DocIndexError::io(dir, e))?;
        let tmp_path = tmp.path().to_path_buf();
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, &self.documents).map_err(|source| {
                DocIndexError::Serialization { path: self.path.clone(), source }
            })?;
            writer.flush().map_err(|e| DocIndexError::io(&tmp_path, e))?;
        }
        tmp.as_file().sync_all().map_err(|e| DocIndexError::io(&tmp_path, e))?;
        tmp.persist(&self.path).map_err(|e| DocIndexError::io(&self.path, e.error))?;

        debug!(index.id = %self.id, document_count = self.documents.len(), "index synced");
        Ok(())
    }

    /// Discard in-memory state and re-read the backing file.
    ///
    /// # Errors
    ///
    /// See [`Index::load`].
    pub fn reload(&mut self) -> Result<()> {
        *self = Self::load(&self.path)?;
        Ok(())
    }
}

/// Index id from a file name: everything before the first dot.
fn id_from_path(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            DocIndexError::InvalidInput(format!("cannot derive an index id from {}", path.display()))
        })
}
