//! Application state
//!
//! Built once in `main` and handed to every request handler by handle; the
//! model instance is owned here, never by an ambient global.

use reco_core::{ModelConfig, RedisConfig, Result, ServiceConfig, ServingMode};
use reco_engine::{
    Applied, EntityId, Interaction, InteractionQueue, LocalCoordinator, SharedCoordinator,
};
use std::collections::HashSet;
use std::sync::Arc;

/// The consistency coordinator this deployment serves from. Exactly one mode
/// per deployment; both must never run against the same logical model.
pub enum Coordinator {
    Local(Arc<LocalCoordinator>),
    Shared(Arc<SharedCoordinator>),
}

pub struct AppState {
    coordinator: Coordinator,
    queue: InteractionQueue,
}

impl AppState {
    pub fn build(
        model_config: &ModelConfig,
        redis_config: &RedisConfig,
        service_config: &ServiceConfig,
    ) -> Result<Self> {
        let coordinator = match service_config.mode {
            ServingMode::Local => Coordinator::Local(Arc::new(LocalCoordinator::open(model_config)?)),
            ServingMode::Shared => {
                Coordinator::Shared(Arc::new(SharedCoordinator::new(redis_config, model_config)?))
            }
        };
        let queue = InteractionQueue::new(&redis_config.url, redis_config.queue_key.clone())?;
        Ok(Self { coordinator, queue })
    }

    pub fn with_coordinator(coordinator: Coordinator, queue: InteractionQueue) -> Self {
        Self { coordinator, queue }
    }

    pub fn queue(&self) -> &InteractionQueue {
        &self.queue
    }

    pub async fn apply(&self, interaction: &Interaction) -> Result<Applied> {
        match &self.coordinator {
            Coordinator::Local(local) => local.apply(interaction),
            Coordinator::Shared(shared) => shared.process(interaction).await,
        }
    }

    pub async fn recommend(
        &self,
        user_id: EntityId,
        top_n: usize,
        exclude: &HashSet<EntityId>,
    ) -> Result<Vec<(EntityId, f32)>> {
        match &self.coordinator {
            Coordinator::Local(local) => local.recommend(user_id, top_n, exclude),
            Coordinator::Shared(shared) => shared.recommend(user_id, top_n, exclude).await,
        }
    }

    /// Discard the durable snapshot for this deployment's model.
    pub async fn reset(&self) -> Result<()> {
        match &self.coordinator {
            Coordinator::Local(local) => local.reset(),
            Coordinator::Shared(shared) => shared.reset().await,
        }
    }

    /// Persist the in-process model, if this deployment holds one.
    pub fn save_if_local(&self) -> Result<()> {
        match &self.coordinator {
            Coordinator::Local(local) => local.save(),
            Coordinator::Shared(_) => Ok(()),
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match &self.coordinator {
            Coordinator::Local(_) => "local",
            Coordinator::Shared(_) => "shared",
        }
    }
}
