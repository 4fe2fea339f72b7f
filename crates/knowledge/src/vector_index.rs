//! Persistent vector index over normalized documents.
//!
//! On disk an index is a directory holding three files:
//!
//! - `manifest.json`: format version, embedding signature, counts, content
//!   hash, store revision, build time
//! - `documents.jsonl`: one document per line, in insertion order
//! - `vectors.bin`: little-endian `f32` vectors in document order
//!
//! `persist` writes into a sibling temporary directory and renames it into
//! place, so readers only ever see a complete artifact or none.

use crate::embeddings::{embed_texts, EmbeddingProvider, EmbeddingSignature};
use crate::record::Document;
use assistant_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// On-disk format version.
pub const FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const DOCUMENTS_FILE: &str = "documents.jsonl";
const VECTORS_FILE: &str = "vectors.bin";

/// Describes a persisted index generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: u32,
    pub build_id: Uuid,
    pub embedding: EmbeddingSignature,
    pub document_count: usize,
    pub content_hash: String,
    #[serde(default)]
    pub store_revision: Option<String>,
    pub built_at: DateTime<Utc>,
}

/// Summary for `index status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub dimensions: usize,
    pub provider: String,
    pub model: String,
    pub built_at: DateTime<Utc>,
    pub store_revision: Option<String>,
    pub placeholder: bool,
    pub size_bytes: u64,
}

/// Immutable set of (vector, document) pairs.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    manifest: IndexManifest,
    documents: Vec<Document>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Embed `documents` and build a new index generation.
    ///
    /// An empty input yields a single placeholder document so the index is
    /// never empty. Fails with `AppError::Knowledge` on duplicate
    /// `(source_kind, record_id)` pairs and propagates embedding errors.
    pub async fn build(
        documents: Vec<Document>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> AppResult<Self> {
        let documents = if documents.is_empty() {
            tracing::info!("No records to index; building placeholder index");
            vec![Document::placeholder()]
        } else {
            documents
        };

        let mut seen = HashSet::with_capacity(documents.len());
        for doc in &documents {
            if !seen.insert(doc.provenance()) {
                return Err(AppError::Knowledge(format!(
                    "Duplicate document for {} #{}",
                    doc.source_kind, doc.record_id
                )));
            }
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = embed_texts(embedder, &texts, batch_size).await?;

        let manifest = IndexManifest {
            version: FORMAT_VERSION,
            build_id: Uuid::new_v4(),
            embedding: EmbeddingSignature::of(embedder),
            document_count: documents.len(),
            content_hash: content_hash(&documents),
            store_revision: None,
            built_at: Utc::now(),
        };

        tracing::info!(
            "Built index {} with {} documents ({} dimensions)",
            manifest.build_id,
            manifest.document_count,
            manifest.embedding.dimensions
        );

        Ok(Self {
            manifest,
            documents,
            vectors,
        })
    }

    /// Record the store revision this generation reflects.
    pub fn with_store_revision(mut self, revision: Option<String>) -> Self {
        self.manifest.store_revision = revision;
        self
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
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

    pub fn dimensions(&self) -> usize {
        self.manifest.embedding.dimensions
    }

    /// Whether this is the index of an empty store.
    pub fn is_placeholder(&self) -> bool {
        self.documents.len() == 1 && self.documents[0] == Document::placeholder()
    }

    /// Atomically write the index to `location`, replacing any previous artifact.
    pub fn persist(&self, location: &Path) -> AppResult<()> {
        let (parent, name) = split_location(location)?;
        fs::create_dir_all(&parent).map_err(|e| {
            AppError::Knowledge(format!("Failed to create index parent {:?}: {}", parent, e))
        })?;

        let staging = parent.join(format!(".{}.tmp-{}", name, Uuid::new_v4()));
        if let Err(e) = fs::create_dir(&staging).and_then(|_| self.write_files(&staging)) {
            remove_quietly(&staging);
            return Err(AppError::Knowledge(format!(
                "Failed to write index to {:?}: {}",
                staging, e
            )));
        }

        let retired = if location.exists() {
            let retired = parent.join(format!(".{}.old-{}", name, Uuid::new_v4()));
            if let Err(e) = fs::rename(location, &retired) {
                remove_quietly(&staging);
                return Err(AppError::Knowledge(format!(
                    "Failed to move previous index aside: {}",
                    e
                )));
            }
            Some(retired)
        } else {
            None
        };

        if let Err(e) = fs::rename(&staging, location) {
            if let Some(retired) = &retired {
                if let Err(restore) = fs::rename(retired, location) {
                    tracing::error!("Failed to restore previous index: {}", restore);
                }
            }
            remove_quietly(&staging);
            return Err(AppError::Knowledge(format!(
                "Failed to move index into place at {:?}: {}",
                location, e
            )));
        }

        if let Err(e) = sync_dir(&parent) {
            tracing::warn!("Failed to sync index parent {:?}: {}", parent, e);
        }

        if let Some(retired) = retired {
            if let Err(e) = fs::remove_dir_all(&retired) {
                tracing::warn!("Failed to delete previous index {:?}: {}", retired, e);
            }
        }

        tracing::info!(
            "Persisted index {} to {:?}",
            self.manifest.build_id,
            location
        );
        Ok(())
    }

    fn write_files(&self, dir: &Path) -> std::io::Result<()> {
        write_synced(&dir.join(DOCUMENTS_FILE), |out| {
            for doc in &self.documents {
                serde_json::to_writer(&mut *out, doc)?;
                out.write_all(b"\n")?;
            }
            Ok(())
        })?;

        write_synced(&dir.join(VECTORS_FILE), |out| {
            for vector in &self.vectors {
                out.write_all(&embedding_to_bytes(vector))?;
            }
            Ok(())
        })?;

        // Manifest last: a directory without one is never a valid artifact.
        write_synced(&dir.join(MANIFEST_FILE), |out| {
            serde_json::to_writer_pretty(&mut *out, &self.manifest)?;
            Ok(())
        })?;

        sync_dir(dir)
    }

    /// Load a persisted index.
    ///
    /// Returns `Ok(None)` when `location` is absent, not a directory, empty,
    /// or holds an incomplete or inconsistent artifact; such a location must
    /// be rebuilt. Unreadable files are errors.
    pub fn load(location: &Path) -> AppResult<Option<Self>> {
        if !location.exists() {
            tracing::debug!("No index at {:?}", location);
            return Ok(None);
        }
        if !location.is_dir() {
            tracing::warn!("Index location {:?} is not a directory", location);
            return Ok(None);
        }
        if fs::read_dir(location)?.next().is_none() {
            tracing::debug!("Index directory {:?} is empty", location);
            return Ok(None);
        }

        let Some(manifest_bytes) = read_optional(&location.join(MANIFEST_FILE))? else {
            tracing::warn!("Index at {:?} has no manifest", location);
            return Ok(None);
        };
        let manifest: IndexManifest = match serde_json::from_slice(&manifest_bytes) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!("Unreadable index manifest at {:?}: {}", location, e);
                return Ok(None);
            }
        };
        if manifest.version != FORMAT_VERSION {
            tracing::warn!(
                "Index format version {} is not supported (expected {})",
                manifest.version,
                FORMAT_VERSION
            );
            return Ok(None);
        }

        let Some(documents) = read_documents(&location.join(DOCUMENTS_FILE))? else {
            tracing::warn!("Index documents missing or malformed at {:?}", location);
            return Ok(None);
        };
        if documents.len() != manifest.document_count {
            tracing::warn!(
                "Index lists {} documents but manifest expects {}",
                documents.len(),
                manifest.document_count
            );
            return Ok(None);
        }

        let Some(vector_bytes) = read_optional(&location.join(VECTORS_FILE))? else {
            tracing::warn!("Index vectors missing at {:?}", location);
            return Ok(None);
        };
        let dimensions = manifest.embedding.dimensions;
        if dimensions == 0 || vector_bytes.len() != documents.len() * dimensions * 4 {
            tracing::warn!(
                "Index vectors hold {} bytes, expected {} documents x {} dimensions",
                vector_bytes.len(),
                documents.len(),
                dimensions
            );
            return Ok(None);
        }

        if content_hash(&documents) != manifest.content_hash {
            tracing::warn!("Index content hash mismatch at {:?}", location);
            return Ok(None);
        }

        let vectors = bytes_to_embeddings(&vector_bytes, dimensions);

        tracing::info!(
            "Loaded index {} with {} documents from {:?}",
            manifest.build_id,
            documents.len(),
            location
        );

        Ok(Some(Self {
            manifest,
            documents,
            vectors,
        }))
    }

    /// The `k` documents nearest to `query_text`, best first.
    pub async fn similarity_query(
        &self,
        embedder: &dyn EmbeddingProvider,
        query_text: &str,
        k: usize,
    ) -> AppResult<Vec<(Document, f32)>> {
        if k == 0 {
            return Err(AppError::InvalidInput(
                "k must be at least 1".to_string(),
            ));
        }

        let query = embedder.embed(query_text).await?;
        self.search(&query, k)
    }

    /// Rank documents by cosine similarity to `query_embedding`.
    ///
    /// Equal scores keep insertion order.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> AppResult<Vec<(Document, f32)>> {
        if k == 0 {
            return Err(AppError::InvalidInput(
                "k must be at least 1".to_string(),
            ));
        }
        if query_embedding.len() != self.dimensions() {
            return Err(AppError::Embedding(format!(
                "Query embedding has {} dimensions, index has {}",
                query_embedding.len(),
                self.dimensions()
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, rank_score(cosine_similarity(query_embedding, v))))
            .collect();

        // `sort_by` is stable
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        tracing::debug!(
            "Retrieved {} documents (requested top-{})",
            scored.len(),
            k
        );

        Ok(scored
            .into_iter()
            .map(|(i, score)| (self.documents[i].clone(), score))
            .collect())
    }

    /// Statistics, including the artifact's size at `location`.
    pub fn stats(&self, location: &Path) -> AppResult<IndexStats> {
        let mut size_bytes = 0;
        if location.is_dir() {
            for entry in fs::read_dir(location)? {
                let metadata = entry?.metadata()?;
                if metadata.is_file() {
                    size_bytes += metadata.len();
                }
            }
        }

        Ok(IndexStats {
            document_count: self.manifest.document_count,
            dimensions: self.manifest.embedding.dimensions,
            provider: self.manifest.embedding.provider.clone(),
            model: self.manifest.embedding.model.clone(),
            built_at: self.manifest.built_at,
            store_revision: self.manifest.store_revision.clone(),
            placeholder: self.is_placeholder(),
            size_bytes,
        })
    }
}

fn split_location(location: &Path) -> AppResult<(PathBuf, String)> {
    let name = location
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            AppError::Knowledge(format!("Invalid index location: {:?}", location))
        })?
        .to_string();
    let parent = match location.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((parent, name))
}

fn remove_quietly(dir: &Path) {
    if dir.exists() {
        if let Err(e) = fs::remove_dir_all(dir) {
            tracing::warn!("Failed to remove staging directory {:?}: {}", dir, e);
        }
    }
}

/// Write a file through `write` and flush it to stable storage.
fn write_synced<F>(path: &Path, write: F) -> std::io::Result<()>
where
    F: FnOnce(&mut BufWriter<fs::File>) -> std::io::Result<()>,
{
    let mut out = BufWriter::new(fs::File::create(path)?);
    write(&mut out)?;
    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

/// Persist a directory's entries. Directory handles cannot be synced on Windows.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn read_optional(path: &Path) -> AppResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_documents(path: &Path) -> AppResult<Option<Vec<Document>>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut documents = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Document>(&line) {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                tracing::warn!("Malformed document line in {:?}: {}", path, e);
                return Ok(None);
            }
        }
    }
    Ok(Some(documents))
}

/// SHA-256 over every document's provenance and text, in order.
fn content_hash(documents: &[Document]) -> String {
    let mut hasher = Sha256::new();
    for doc in documents {
        hasher.update(doc.source_kind.as_str());
        hasher.update(doc.record_id.to_le_bytes());
        hasher.update(doc.text.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Split concatenated little-endian vectors of `dimensions` floats.
fn bytes_to_embeddings(bytes: &[u8], dimensions: usize) -> Vec<Vec<f32>> {
    bytes
        .chunks_exact(dimensions * 4)
        .map(|vector| {
            vector
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect()
}

/// NaN scores rank below every real score.
fn rank_score(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
