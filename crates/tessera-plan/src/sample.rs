//! The sampler seam used by the sampling policy.
//!
//! The aggregation engine owns the heavy lifting: it draws a random
//! sample of documents, sorts them by the shard key, and projects them
//! to key-only shape (hashed fields pre-hashed, missing values
//! normalized to null). The planner consumes the result through the
//! pull-based [`SampleSource`] seam and describes the wanted pipeline
//! with a [`SampleQuery`].

use serde::{Deserialize, Serialize};

use tessera_core::{BoundKey, FieldKind, KeyPattern};

use crate::PlanError;

/// Default number of samples drawn per wanted chunk.
pub const DEFAULT_SAMPLES_PER_CHUNK: usize = 10;

/// Pull-based source of sampled shard keys.
///
/// Finite and non-restartable; yields key-shaped documents in ascending
/// shard-key order. Each pull may block on remote I/O.
pub trait SampleSource {
    /// The next sampled key, or `None` once exhausted.
    fn next(&mut self) -> Result<Option<BoundKey>, PlanError>;
}

impl<'a> SampleSource for Box<dyn SampleSource + 'a> {
    fn next(&mut self) -> Result<Option<BoundKey>, PlanError> {
        (**self).next()
    }
}

/// Wraps a [`SampleSource`], yielding every `samples_per_chunk`-th
/// sample.
///
/// Between yields, `samples_per_chunk - 1` samples are skipped; when the
/// underlying source runs dry mid-skip, the last observed sample is
/// returned instead.
pub struct SkippingSampleSource<S> {
    inner: S,
    skip: usize,
}

impl<S: SampleSource> SkippingSampleSource<S> {
    /// Validates `samples_per_chunk > 0` and wraps the source.
    pub fn new(inner: S, samples_per_chunk: usize) -> Result<Self, PlanError> {
        if samples_per_chunk == 0 {
            return Err(PlanError::SamplesPerChunkTooSmall);
        }
        Ok(Self {
            inner,
            skip: samples_per_chunk - 1,
        })
    }
}

impl<S: SampleSource> SampleSource for SkippingSampleSource<S> {
    fn next(&mut self) -> Result<Option<BoundKey>, PlanError> {
        let Some(mut key) = self.inner.next()? else {
            return Ok(None);
        };
        for _ in 0..self.skip {
            match self.inner.next()? {
                Some(next_key) => key = next_key,
                // Not enough samples left: settle for the last one seen.
                None => break,
            }
        }
        Ok(Some(key))
    }
}

/// How one shard-key field is projected by the sampler pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyProjection {
    /// Document field name.
    pub field: String,
    /// True when the engine must emit the field's 64-bit hash instead of
    /// its raw value; otherwise missing values normalize to explicit
    /// null.
    pub hashed: bool,
}

/// Typed description of the sampler pipeline handed to the aggregation
/// engine: sample, sort ascending by the key fields, project to
/// key-only shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleQuery {
    /// Number of documents to sample.
    pub sample_size: usize,
    /// Sort fields, ascending, in pattern order.
    pub sort_fields: Vec<String>,
    /// Per-field key-shape projection, in pattern order.
    pub projection: Vec<KeyProjection>,
}

impl SampleQuery {
    /// Builds the pipeline description for a shard-key pattern.
    pub fn for_pattern(
        pattern: &KeyPattern,
        num_initial_chunks: usize,
        samples_per_chunk: usize,
    ) -> Self {
        let projection = pattern
            .fields()
            .iter()
            .map(|f| KeyProjection {
                field: f.name.clone(),
                hashed: f.kind == FieldKind::Hashed,
            })
            .collect();
        Self {
            sample_size: num_initial_chunks * samples_per_chunk,
            sort_fields: pattern.field_names().map(str::to_owned).collect(),
            projection,
        }
    }
}
