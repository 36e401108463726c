//! HNSW vector index adapter.
//!
//! Wraps the `hnsw_rs` crate behind the small surface the indexing and
//! retrieval paths need: append vectors, search by similarity, persist to
//! paired sidecar files. Every stored vector is L2-normalized before
//! insertion, so the dot-product distance doubles as cosine similarity.
//!
//! Ids are positional: the vector appended at position `i` has id `i`,
//! matching its chunk record in the metadata list. The index does not
//! support deletion; rebuilds start from an empty index.

use std::path::{Path, PathBuf};

use hnsw_rs::prelude::*;
use tracing::{debug, warn};

use crate::utils::{AppError, AppResult};

/// HNSW tuning parameters.
const MAX_NB_CONNECTION: usize = 24;
const MAX_LAYER: usize = 16;
const EF_CONSTRUCTION: usize = 200;
const EF_SEARCH: usize = 64;

/// Element capacity the graph is sized for at creation. It can grow past
/// this, at some cost to recall.
const MAX_ELEMENTS: usize = 100_000;

/// Newtype wrapper so the graph can cross thread boundaries.
struct HnswStore {
    hnsw: Hnsw<'static, f32, DistDot>,
}

// SAFETY: hnsw_rs keeps its point store behind Arc internally. The 'static
// lifetime holds both for graphs built in memory (owned data) and for
// graphs loaded from disk, where the loader is leaked so its buffers
// outlive the graph.
unsafe impl Send for HnswStore {}
unsafe impl Sync for HnswStore {}

/// Append-only approximate nearest neighbor index over embedding vectors.
pub struct VectorIndex {
    store: HnswStore,
    dimension: usize,
    len: usize,
}

impl VectorIndex {
    /// Create an empty index for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        let hnsw = Hnsw::<f32, DistDot>::new(
            MAX_NB_CONNECTION,
            MAX_ELEMENTS,
            MAX_LAYER,
            EF_CONSTRUCTION,
            DistDot,
        );
        Self {
            store: HnswStore { hnsw },
            dimension,
            len: 0,
        }
    }

    /// Append vectors to the index.
    ///
    /// Ids are assigned sequentially in append order, so the vector at
    /// position `i` of this call becomes id `len() + i`. No vector is
    /// inserted unless every vector in the batch has the index dimension.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> AppResult<()> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(AppError::validation(format!(
                    "vector dimension {} does not match index dimension {}",
                    vector.len(),
                    self.dimension
                )));
            }
        }
        for (offset, vector) in vectors.iter().enumerate() {
            self.store
                .hnsw
                .insert_slice((vector.as_slice(), self.len + offset));
        }
        self.len += vectors.len();
        Ok(())
    }

    /// Nearest neighbors of `query` as `(id, similarity)` pairs ordered by
    /// decreasing similarity.
    ///
    /// Similarity is the dot product, recovered from the dot-product
    /// distance as `1.0 - distance`; with normalized vectors on both sides
    /// this is cosine similarity. Empty when the index holds no vectors,
    /// `k` is zero, or the query dimension does not match.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.len == 0 || k == 0 {
            return Vec::new();
        }
        if query.len() != self.dimension {
            warn!(
                query_dim = query.len(),
                index_dim = self.dimension,
                "query dimension does not match index, returning no results"
            );
            return Vec::new();
        }

        let ef = EF_SEARCH.max(k);
        let neighbours = self.store.hnsw.search(query, k, ef);

        let mut results: Vec<(usize, f32)> = neighbours
            .into_iter()
            .map(|n| (n.d_id, 1.0 - n.distance))
            .collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        results
    }

    /// Number of vectors in the index.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no vectors have been added.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dimension the index was created for.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Persist the graph as `<index_path>.hnsw.graph` plus
    /// `<index_path>.hnsw.data`, creating the parent directory if needed.
    pub fn save(&self, index_path: &Path) -> AppResult<()> {
        let (dir, basename) = sidecar_parts(index_path);
        std::fs::create_dir_all(&dir)?;
        self.store
            .hnsw
            .file_dump(&dir, &basename)
            .map_err(|e| AppError::internal(format!("HNSW file_dump failed: {}", e)))?;
        Ok(())
    }

    /// Load a previously saved index.
    ///
    /// Returns `None` when the sidecar files are missing or unreadable so
    /// callers can treat an absent index as "not ready" rather than an
    /// error. Corrupt sidecars are removed so the next rebuild starts
    /// clean.
    pub fn load(index_path: &Path, dimension: usize) -> Option<Self> {
        let (graph_file, data_file) = sidecar_paths(index_path);
        if !graph_file.exists() || !data_file.exists() {
            debug!(path = %index_path.display(), "vector index sidecars not found");
            return None;
        }

        let graph_ok = std::fs::metadata(&graph_file)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        let data_ok = std::fs::metadata(&data_file)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !graph_ok || !data_ok {
            warn!(
                path = %index_path.display(),
                "vector index sidecars exist but are empty or unreadable"
            );
            return None;
        }

        let (dir, basename) = sidecar_parts(index_path);

        // hnsw_rs can panic on corrupt files instead of returning an error,
        // and the loader must outlive the graph it returns, hence the leak
        // (one small struct per load).
        let load_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let io = Box::leak(Box::new(HnswIo::new(&dir, &basename)));
            let result: Result<Hnsw<'static, f32, DistDot>, _> = io.load_hnsw_with_dist(DistDot);
            result
        }));

        match load_result {
            Ok(Ok(hnsw)) => {
                let len = hnsw.get_nb_point();
                debug!(path = %index_path.display(), points = len, "vector index loaded");
                Some(Self {
                    store: HnswStore { hnsw },
                    dimension,
                    len,
                })
            }
            Ok(Err(e)) => {
                warn!(path = %index_path.display(), error = %e, "vector index load failed");
                None
            }
            Err(_panic) => {
                warn!(
                    path = %index_path.display(),
                    "vector index load panicked on corrupt files, removing them"
                );
                let _ = std::fs::remove_file(&graph_file);
                let _ = std::fs::remove_file(&data_file);
                None
            }
        }
    }
}

/// Paths of the two persisted sidecar files for a given index path.
pub fn sidecar_paths(index_path: &Path) -> (PathBuf, PathBuf) {
    let (dir, basename) = sidecar_parts(index_path);
    (
        dir.join(format!("{}.hnsw.graph", basename)),
        dir.join(format!("{}.hnsw.data", basename)),
    )
}

/// Split an index path into the directory and basename `hnsw_rs` expects.
fn sidecar_parts(index_path: &Path) -> (PathBuf, String) {
    let dir = index_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let basename = index_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("index")
        .to_string();
    (dir, basename)
}

/// L2-normalize a vector in place. Zero vectors stay zero.
pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
