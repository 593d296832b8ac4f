//! Exact nearest-neighbor index over squared Euclidean distance
//!
//! Vectors are stored row-major in insertion order; row `i` belongs to the
//! fragment with id `i`. Search is a brute-force scan, which is exact and
//! adequate for single-corpus workloads.

use crate::embed::{embed_in_batches, Embedder};
use crate::error::{Error, Result};
use crate::models::Fragment;
use std::cmp::Ordering;
use tracing::{debug, info};

const MAGIC: &[u8; 8] = b"DQAIDX01";
const HEADER_LEN: usize = 8 + 4 + 8;

/// One search result slot. `label` is `None` for padding slots returned when
/// the index holds fewer than `k` vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub label: Option<usize>,
    pub distance: f32,
}

impl Neighbor {
    fn missing() -> Self {
        Self {
            label: None,
            distance: f32::MAX,
        }
    }
}

/// Flat (brute-force) L2 index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors, preserving order.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for (i, vector) in vectors.iter().enumerate() {
            if vector.len() != self.dimension {
                return Err(Error::Index(format!(
                    "vector {} has dimension {}, index expects {}",
                    i,
                    vector.len(),
                    self.dimension
                )));
            }
        }
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Return exactly `k` slots ordered by ascending squared L2 distance.
    /// Ties keep insertion order. Slots beyond the stored count are padded
    /// with [`Neighbor`]s whose label is `None`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(Error::Index(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension.max(1))
            .map(|row| squared_l2(query, row))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });

        let mut neighbors: Vec<Neighbor> = scored
            .into_iter()
            .take(k)
            .map(|(row, distance)| Neighbor {
                label: Some(row),
                distance,
            })
            .collect();
        neighbors.resize(k, Neighbor::missing());
        Ok(neighbors)
    }

    /// Serialize as magic, dimension (u32 LE), count (u64 LE), then f32 LE rows.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for &v in &self.data {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
            return Err(Error::Index("not a docqa index file".to_string()));
        }
        let dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        let mut count = [0u8; 8];
        count.copy_from_slice(&bytes[12..20]);
        let count = u64::from_le_bytes(count) as usize;

        let body = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| Error::Index("index header overflows".to_string()))?;
        if body.len() != expected {
            return Err(Error::Index(format!(
                "index body is {} bytes, header declares {}",
                body.len(),
                expected
            )));
        }

        let data = body
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { dimension, data })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Embed every fragment and load the vectors into a new index.
///
/// Returns `None` when there are no fragments. Row `i` of the index is the
/// embedding of `fragments[i]`.
pub async fn build_index(
    fragments: &[Fragment],
    embedder: &dyn Embedder,
    batch_size: usize,
) -> Result<Option<FlatIndex>> {
    if fragments.is_empty() {
        info!("No fragments to index");
        return Ok(None);
    }

    let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
    let vectors = embed_in_batches(embedder, texts, batch_size).await?;
    if vectors.len() != fragments.len() {
        return Err(Error::Embedding(format!(
            "embedder returned {} vectors for {} fragments",
            vectors.len(),
            fragments.len()
        )));
    }

    let dimension = vectors.first().map(Vec::len).unwrap_or(0);
    if dimension == 0 {
        return Err(Error::Embedding("embedder returned empty vectors".to_string()));
    }
    let mut index = FlatIndex::new(dimension);
    index.add(&vectors)?;

    debug!("Built index: {} vectors of dimension {}", index.len(), dimension);
    Ok(Some(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::testing::HashEmbedder;

    fn index_with(rows: &[[f32; 2]]) -> FlatIndex {
        let mut index = FlatIndex::new(2);
        let vectors: Vec<Vec<f32>> = rows.iter().map(|r| r.to_vec()).collect();
        index.add(&vectors).unwrap();
        index
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = index_with(&[[5.0, 5.0], [1.0, 0.0], [0.0, 0.0]]);
        let hits = index.search(&[0.0, 0.0], 3).unwrap();

        let labels: Vec<_> = hits.iter().map(|n| n.label).collect();
        assert_eq!(labels, vec![Some(2), Some(1), Some(0)]);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[1].distance, 1.0);
        assert_eq!(hits[2].distance, 50.0);
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let index = index_with(&[[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]]);
        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let labels: Vec<_> = hits.iter().map(|n| n.label).collect();
        assert_eq!(labels, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_search_pads_with_sentinel() {
        let index = index_with(&[[1.0, 1.0]]);
        let hits = index.search(&[0.0, 0.0], 5).unwrap();

        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].label, Some(0));
        assert!(hits[1..].iter().all(|n| n.label.is_none()));
    }

    #[test]
    fn test_add_rejects_wrong_dimension() {
        let mut index = FlatIndex::new(3);
        assert!(index.add(&[vec![1.0, 2.0]]).is_err());
        assert!(index.is_empty());
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_index_bytes_round_trip() {
        let index = index_with(&[[0.5, -1.25], [3.0, 4.0]]);
        let restored = FlatIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(restored, index);
        assert_eq!(restored.vector(1), Some(&[3.0, 4.0][..]));
    }

    #[test]
    fn test_from_bytes_rejects_truncated() {
        let index = index_with(&[[0.5, -1.25], [3.0, 4.0]]);
        let bytes = index.to_bytes();
        assert!(FlatIndex::from_bytes(&bytes[..bytes.len() - 2]).is_err());
        assert!(FlatIndex::from_bytes(b"garbage").is_err());
    }

    #[tokio::test]
    async fn test_build_index_empty() {
        let embedder = HashEmbedder::new(8);
        assert!(build_index(&[], &embedder, 4).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_build_index_aligns_rows() {
        let embedder = HashEmbedder::new(8);
        let fragments: Vec<Fragment> = (0..5)
            .map(|i| Fragment {
                text: format!("fragment number {}", i),
                source: "doc.pdf".to_string(),
                page: 1,
                id: i,
            })
            .collect();

        let index = build_index(&fragments, &embedder, 2).await.unwrap().unwrap();
        assert_eq!(index.len(), fragments.len());

        let expected = embedder
            .embed(vec![fragments[3].text.clone()])
            .await
            .unwrap();
        assert_eq!(index.vector(3), Some(expected[0].as_slice()));
    }
}
