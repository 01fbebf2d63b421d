//! # Reco Engine
//!
//! Online, incrementally-trained latent-factor recommender: per-entity latent
//! vectors updated in place by a stream of scored interaction events, with
//! low-latency top-N ranking over the item space.
//!
//! ## Modules
//!
//! - `scoring`: pure interaction-signal → bounded-reward transform
//! - `model`: identity registries, factor stores, SGD update, ranking
//! - `snapshot`: snapshot codec and crash-safe persistence
//! - `coordinator`: in-process and distributed consistency modes
//! - `queue`: Redis-backed interaction job queue

pub mod coordinator;
pub mod model;
pub mod queue;
pub mod scoring;
pub mod snapshot;

pub use coordinator::{Applied, LocalCoordinator, SharedCoordinator};
pub use model::{EntityId, FactorStore, Hyperparams, IdentityRegistry, Model, INIT_STD};
pub use queue::{InteractionQueue, Job};
pub use scoring::{interaction_score, Interaction, ScoreWeights, NEAR_FULL_WATCH};
pub use snapshot::SnapshotStore;
