//! Consistency coordinators
//!
//! Two deployment modes govern who may mutate the model and when snapshots
//! are taken:
//!
//! - [`LocalCoordinator`]: one long-lived in-process model behind a mutex.
//!   The whole score + ensure + update sequence for an interaction runs under
//!   one lock guard, and reads take the same lock, so no caller ever observes
//!   a torn vector write.
//! - [`SharedCoordinator`]: no in-process model state. Every mutation is a
//!   load → update → save round trip against the Redis snapshot, bracketed by
//!   a cluster-wide lock with a bounded acquisition timeout. Both load and
//!   save happen inside the critical section; a stale read-modify-write would
//!   silently discard concurrent updates.
//!
//! Both modes produce the same final model state for the same ordered
//! interaction sequence.

use crate::model::{EntityId, Model};
use crate::scoring::Interaction;
use crate::snapshot::SnapshotStore;
use futures_util::future::BoxFuture;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use reco_core::{validate_top_n, ModelConfig, RecoError, RedisConfig, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Result of applying one interaction to the model.
#[derive(Debug, Clone, Serialize)]
pub struct Applied {
    pub user_id: EntityId,
    pub item_id: EntityId,
    pub score: f32,
}

/// In-process coordinator: one mutex-guarded model plus a local snapshot
/// file. Constructed once at the composition point and shared by handle.
pub struct LocalCoordinator {
    model: Mutex<Model>,
    snapshot_path: PathBuf,
}

impl LocalCoordinator {
    pub fn new(model: Model, snapshot_path: PathBuf) -> Self {
        Self {
            model: Mutex::new(model),
            snapshot_path,
        }
    }

    /// Load the model from the configured snapshot file, or start fresh when
    /// none exists. A corrupt snapshot is fatal, not silently replaced.
    pub fn open(config: &ModelConfig) -> Result<Self> {
        let model = match SnapshotStore::load_file(&config.snapshot_path)? {
            Some(model) => {
                tracing::info!(
                    users = model.user_count(),
                    items = model.item_count(),
                    path = %config.snapshot_path.display(),
                    "loaded model snapshot"
                );
                model
            }
            None => {
                tracing::info!(
                    path = %config.snapshot_path.display(),
                    "no snapshot found, starting with a fresh model"
                );
                Model::new(config.into())
            }
        };
        Ok(Self::new(model, config.snapshot_path.clone()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Model> {
        self.model.lock().expect("model lock poisoned")
    }

    /// Score and apply one interaction under a single lock guard.
    pub fn apply(&self, interaction: &Interaction) -> Result<Applied> {
        interaction.validate()?;
        let score = interaction.reward();
        let mut model = self.lock();
        model.update(interaction.user_id, interaction.item_id, score);
        Ok(Applied {
            user_id: interaction.user_id,
            item_id: interaction.item_id,
            score,
        })
    }

    pub fn recommend(
        &self,
        user_id: EntityId,
        top_n: usize,
        exclude: &HashSet<EntityId>,
    ) -> Result<Vec<(EntityId, f32)>> {
        validate_top_n(top_n)?;
        Ok(self.lock().recommend(user_id, top_n, exclude))
    }

    /// Persist the current model to the snapshot file.
    pub fn save(&self) -> Result<()> {
        let model = self.lock();
        SnapshotStore::save_file(&model, &self.snapshot_path)
    }

    /// Discard the durable snapshot. The in-memory model is untouched;
    /// reconciling the two is the caller's explicit decision.
    pub fn reset(&self) -> Result<()> {
        match fs::remove_file(&self.snapshot_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

const RELEASE_SCRIPT: &str =
    r#"if redis.call("get", KEYS[1]) == ARGV[1] then return redis.call("del", KEYS[1]) else return 0 end"#;

/// Distributed coordinator: stateless handle over the shared Redis snapshot,
/// guarded by a cluster-wide lock keyed to the model identity.
pub struct SharedCoordinator {
    client: redis::Client,
    model_key: String,
    lock_key: String,
    lock_timeout: Duration,
    lock_retry: Duration,
    lock_ttl_ms: u64,
    fresh: crate::model::Hyperparams,
}

impl SharedCoordinator {
    pub fn new(redis_config: &RedisConfig, model_config: &ModelConfig) -> Result<Self> {
        let client = redis::Client::open(redis_config.url.as_str()).map_err(RecoError::redis)?;
        Ok(Self {
            client,
            model_key: model_config.model_key.clone(),
            lock_key: format!("{}:lock", model_config.model_key),
            lock_timeout: Duration::from_millis(redis_config.lock_timeout_ms),
            lock_retry: Duration::from_millis(redis_config.lock_retry_ms),
            lock_ttl_ms: redis_config.lock_ttl_ms,
            fresh: model_config.into(),
        })
    }

    async fn connect(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(RecoError::redis)
    }

    /// Run `f` inside the cluster-wide model lock.
    ///
    /// Acquisition polls with a bounded deadline and fails as `LockTimeout`
    /// on expiry. The lock is released on every exit path, success or error;
    /// the TTL covers a crashed holder.
    pub async fn with_model_lock<'a, T>(
        &'a self,
        f: impl FnOnce(MultiplexedConnection) -> BoxFuture<'a, Result<T>>,
    ) -> Result<T> {
        let mut conn = self.connect().await?;
        let token = Uuid::new_v4().to_string();
        self.acquire(&mut conn, &token).await?;
        let result = f(conn.clone()).await;
        self.release(&mut conn, &token).await;
        result
    }

    async fn acquire(&self, conn: &mut MultiplexedConnection, token: &str) -> Result<()> {
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            let acquired: Option<String> = redis::cmd("SET")
                .arg(&self.lock_key)
                .arg(token)
                .arg("NX")
                .arg("PX")
                .arg(self.lock_ttl_ms)
                .query_async(conn)
                .await
                .map_err(RecoError::redis)?;
            if acquired.is_some() {
                return Ok(());
            }
            if Instant::now() + self.lock_retry >= deadline {
                return Err(RecoError::LockTimeout {
                    key: self.lock_key.clone(),
                    waited_ms: self.lock_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.lock_retry).await;
        }
    }

    /// Delete the lock only if we still hold it (token check), so an expired
    /// lock taken over by another worker is never clobbered.
    async fn release(&self, conn: &mut MultiplexedConnection, token: &str) {
        let released: std::result::Result<i64, _> = redis::cmd("EVAL")
            .arg(RELEASE_SCRIPT)
            .arg(1)
            .arg(&self.lock_key)
            .arg(token)
            .query_async(conn)
            .await;
        if let Err(e) = released {
            tracing::warn!(lock = %self.lock_key, error = %e, "failed to release model lock");
        }
    }

    /// Process one interaction: load the shared snapshot (or start fresh when
    /// absent), score and update, save back — all inside the lock.
    pub async fn process(&self, interaction: &Interaction) -> Result<Applied> {
        interaction.validate()?;
        let interaction = interaction.clone();
        let model_key = self.model_key.clone();
        let fresh = self.fresh.clone();

        self.with_model_lock(move |mut conn| {
            Box::pin(async move {
                let blob: Option<Vec<u8>> =
                    conn.get(&model_key).await.map_err(RecoError::redis)?;
                let mut model = match blob {
                    Some(blob) => SnapshotStore::decode(&blob)?,
                    None => Model::new(fresh),
                };

                let score = interaction.reward();
                model.update(interaction.user_id, interaction.item_id, score);

                let blob = SnapshotStore::encode(&model)?;
                conn.set::<_, _, ()>(&model_key, blob)
                    .await
                    .map_err(RecoError::redis)?;

                Ok(Applied {
                    user_id: interaction.user_id,
                    item_id: interaction.item_id,
                    score,
                })
            })
        })
        .await
    }

    /// Answer a query from the shared snapshot. Snapshots are replaced
    /// wholesale, so a plain read is always self-consistent and the lock is
    /// not needed. An absent snapshot is `NotReady`, distinct from an
    /// unknown user (which yields an empty list).
    pub async fn recommend(
        &self,
        user_id: EntityId,
        top_n: usize,
        exclude: &HashSet<EntityId>,
    ) -> Result<Vec<(EntityId, f32)>> {
        validate_top_n(top_n)?;
        let mut conn = self.connect().await?;
        let blob: Option<Vec<u8>> = conn.get(&self.model_key).await.map_err(RecoError::redis)?;
        let model = match blob {
            Some(blob) => SnapshotStore::decode(&blob)?,
            None => return Err(RecoError::NotReady),
        };
        Ok(model.recommend(user_id, top_n, exclude))
    }

    /// Discard the shared snapshot. Workers that hold no state simply see an
    /// absent model on their next job; serving processes elsewhere are not
    /// reconciled.
    pub async fn reset(&self) -> Result<()> {
        let mut conn = self.connect().await?;
        conn.del::<_, ()>(&self.model_key)
            .await
            .map_err(RecoError::redis)?;
        tracing::info!(key = %self.model_key, "deleted shared model snapshot");
        Ok(())
    }
}
