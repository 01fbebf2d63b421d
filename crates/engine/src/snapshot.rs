//! Model snapshot codec and durable persistence
//!
//! Serializes the full model aggregate (both registries, both factor stores,
//! hyperparameters, RNG state) to a gzip-compressed bincode blob and back.
//! File writes go to a temporary sibling first and are atomically renamed
//! over the canonical path, so a reader never observes a partial snapshot.
//! Decoding re-checks the model invariants and fails as `CorruptSnapshot`
//! rather than silently substituting a default model.

use crate::model::{EntityId, FactorStore, Hyperparams, IdentityRegistry, Model};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand_chacha::ChaCha8Rng;
use reco_core::{RecoError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

/// Serializable mirror of the model aggregate.
///
/// Registries are stored as ID lists in index order; the dense index space is
/// implicit in the ordering, which makes gaps unrepresentable and duplicate
/// detection cheap on load.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    hyperparams: Hyperparams,
    user_ids: Vec<EntityId>,
    item_ids: Vec<EntityId>,
    user_factors: Vec<f32>,
    item_factors: Vec<f32>,
    rng: ChaCha8Rng,
}

impl Snapshot {
    fn from_model(model: &Model) -> Self {
        Self {
            hyperparams: model.hyperparams.clone(),
            user_ids: model.users.ids().to_vec(),
            item_ids: model.items.ids().to_vec(),
            user_factors: model.user_factors.as_slice().to_vec(),
            item_factors: model.item_factors.as_slice().to_vec(),
            rng: model.rng.clone(),
        }
    }

    fn into_model(self) -> Result<Model> {
        let k = self.hyperparams.factors;
        if k == 0 {
            return Err(RecoError::CorruptSnapshot(
                "snapshot has a zero latent dimension".to_string(),
            ));
        }

        let users = rebuild_registry(&self.user_ids, "user")?;
        let items = rebuild_registry(&self.item_ids, "item")?;

        let user_factors = rebuild_store(self.user_factors, k, self.user_ids.len(), "user")?;
        let item_factors = rebuild_store(self.item_factors, k, self.item_ids.len(), "item")?;

        Ok(Model {
            hyperparams: self.hyperparams,
            users,
            items,
            user_factors,
            item_factors,
            rng: self.rng,
        })
    }
}

fn rebuild_registry(ids: &[EntityId], entity: &str) -> Result<IdentityRegistry> {
    let mut registry = IdentityRegistry::new();
    for (expected, &id) in ids.iter().enumerate() {
        if registry.ensure(id) != expected {
            return Err(RecoError::CorruptSnapshot(format!(
                "duplicate {entity} id {id} in snapshot registry"
            )));
        }
    }
    Ok(registry)
}

fn rebuild_store(data: Vec<f32>, factors: usize, rows: usize, entity: &str) -> Result<FactorStore> {
    if data.len() != rows * factors {
        return Err(RecoError::CorruptSnapshot(format!(
            "{entity} factor matrix has {} values, expected {} ({} rows x {} factors)",
            data.len(),
            rows * factors,
            rows,
            factors
        )));
    }
    let mut store = FactorStore::new(factors);
    for row in data.chunks_exact(factors) {
        store.push_row(row);
    }
    Ok(store)
}

/// Snapshot blob codec plus crash-safe file persistence.
pub struct SnapshotStore;

impl SnapshotStore {
    /// Serialize a model to a gzip-compressed bincode blob.
    pub fn encode(model: &Model) -> Result<Vec<u8>> {
        let raw = bincode::serialize(&Snapshot::from_model(model))
            .map_err(|e| RecoError::Serialization(format!("failed to encode snapshot: {e}")))?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        Ok(encoder.finish()?)
    }

    /// Deserialize a snapshot blob, re-checking model invariants.
    pub fn decode(bytes: &[u8]) -> Result<Model> {
        let mut raw = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut raw)
            .map_err(|e| RecoError::CorruptSnapshot(format!("decompression failed: {e}")))?;
        let snapshot: Snapshot = bincode::deserialize(&raw)
            .map_err(|e| RecoError::CorruptSnapshot(format!("deserialization failed: {e}")))?;
        snapshot.into_model()
    }

    /// Write the snapshot to `path`: temporary sibling file, then atomic
    /// rename over the canonical location.
    pub fn save_file(model: &Model, path: &Path) -> Result<()> {
        let blob = Self::encode(model)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &blob)?;
        fs::rename(&tmp, path)?;
        tracing::debug!(
            path = %path.display(),
            bytes = blob.len(),
            users = model.user_count(),
            items = model.item_count(),
            "saved model snapshot"
        );
        Ok(())
    }

    /// Load a snapshot from `path`. A missing file is `Ok(None)`; an
    /// unreadable or invalid one is an error.
    pub fn load_file(path: &Path) -> Result<Option<Model>> {
        let blob = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::decode(&blob).map(Some)
    }
}
