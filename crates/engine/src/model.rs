//! Latent-factor model
//!
//! Holds one growable latent vector per user and per item, indexed through
//! dense identity registries, and applies online SGD updates from scored
//! interactions. Decomposes predicted affinity as the dot product of the two
//! vectors.
//!
//! The model itself is not synchronized; the coordinators in
//! [`crate::coordinator`] own the locking discipline.

use ndarray::ArrayView1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Externally-supplied opaque entity identifier (user or item).
pub type EntityId = u64;

/// Standard deviation of cold-start vectors.
pub const INIT_STD: f32 = 0.01;

/// Model hyperparameters. Part of the snapshot aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparams {
    /// Latent dimension k
    pub factors: usize,
    pub learning_rate: f32,
    pub regularization: f32,
    /// Seed for the cold-start vector RNG
    pub seed: u64,
}

impl Default for Hyperparams {
    fn default() -> Self {
        Self {
            factors: 32,
            learning_rate: 0.01,
            regularization: 0.02,
            seed: 1,
        }
    }
}

impl From<&reco_core::ModelConfig> for Hyperparams {
    fn from(config: &reco_core::ModelConfig) -> Self {
        Self {
            factors: config.factors,
            learning_rate: config.learning_rate,
            regularization: config.regularization,
            seed: config.seed,
        }
    }
}

/// Bidirectional mapping between entity IDs and dense indices.
///
/// Indices are 0-based, contiguous, assigned in first-seen order, and never
/// reused or reassigned. The user and item registries are independent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityRegistry {
    index_of: HashMap<EntityId, usize>,
    id_of: Vec<EntityId>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the existing index for `id`, or assign the next sequential one.
    pub fn ensure(&mut self, id: EntityId) -> usize {
        if let Some(&idx) = self.index_of.get(&id) {
            return idx;
        }
        let idx = self.id_of.len();
        self.index_of.insert(id, idx);
        self.id_of.push(id);
        idx
    }

    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.index_of.get(&id).copied()
    }

    /// The entity at a dense index. Indices come from this registry, so a
    /// miss is an internal invariant violation.
    pub fn id_at(&self, idx: usize) -> EntityId {
        self.id_of[idx]
    }

    /// Entity IDs in index order.
    pub fn ids(&self) -> &[EntityId] {
        &self.id_of
    }

    pub fn len(&self) -> usize {
        self.id_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_of.is_empty()
    }
}

/// Dense row-major matrix of latent vectors with amortized growth.
///
/// Rows are appended one at a time as entities materialize; the backing `Vec`
/// grows geometrically, so appends never reallocate per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorStore {
    factors: usize,
    data: Vec<f32>,
}

impl FactorStore {
    pub fn new(factors: usize) -> Self {
        Self {
            factors,
            data: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.factors
    }

    pub fn push_row(&mut self, row: &[f32]) {
        debug_assert_eq!(row.len(), self.factors);
        self.data.extend_from_slice(row);
    }

    pub fn row(&self, idx: usize) -> &[f32] {
        let start = idx * self.factors;
        &self.data[start..start + self.factors]
    }

    pub fn row_mut(&mut self, idx: usize) -> &mut [f32] {
        let start = idx * self.factors;
        &mut self.data[start..start + self.factors]
    }

    pub fn view(&self, idx: usize) -> ArrayView1<'_, f32> {
        ArrayView1::from(self.row(idx))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// The full model aggregate: both registries, both factor stores, the
/// hyperparameters, and the cold-start RNG state. This is the unit of
/// snapshotting.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub(crate) hyperparams: Hyperparams,
    pub(crate) users: IdentityRegistry,
    pub(crate) items: IdentityRegistry,
    pub(crate) user_factors: FactorStore,
    pub(crate) item_factors: FactorStore,
    pub(crate) rng: ChaCha8Rng,
}

impl Model {
    pub fn new(hyperparams: Hyperparams) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(hyperparams.seed);
        let factors = hyperparams.factors;
        Self {
            hyperparams,
            users: IdentityRegistry::new(),
            items: IdentityRegistry::new(),
            user_factors: FactorStore::new(factors),
            item_factors: FactorStore::new(factors),
            rng,
        }
    }

    pub fn hyperparams(&self) -> &Hyperparams {
        &self.hyperparams
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Index of `user_id`, materializing a cold-start vector if unseen.
    pub fn ensure_user(&mut self, user_id: EntityId) -> usize {
        if let Some(idx) = self.users.index_of(user_id) {
            return idx;
        }
        let vector = init_vector(&mut self.rng, self.hyperparams.factors);
        let idx = self.users.ensure(user_id);
        self.user_factors.push_row(&vector);
        idx
    }

    /// Index of `item_id`, materializing a cold-start vector if unseen.
    pub fn ensure_item(&mut self, item_id: EntityId) -> usize {
        if let Some(idx) = self.items.index_of(item_id) {
            return idx;
        }
        let vector = init_vector(&mut self.rng, self.hyperparams.factors);
        let idx = self.items.ensure(item_id);
        self.item_factors.push_row(&vector);
        idx
    }

    /// Predicted affinity for a known user/item pair.
    pub fn predict(&self, user_id: EntityId, item_id: EntityId) -> Option<f32> {
        let u = self.users.index_of(user_id)?;
        let i = self.items.index_of(item_id)?;
        Some(self.user_factors.view(u).dot(&self.item_factors.view(i)))
    }

    /// Apply one online SGD step for `(user, item, reward)`.
    ///
    /// Both gradients are computed from the pre-update copies of the two
    /// vectors, so neither side sees a partially-updated counterpart.
    pub fn update(&mut self, user_id: EntityId, item_id: EntityId, reward: f32) {
        let u = self.ensure_user(user_id);
        let i = self.ensure_item(item_id);

        let pu = self.user_factors.row(u).to_vec();
        let qi = self.item_factors.row(i).to_vec();
        let predicted = ArrayView1::from(&pu[..]).dot(&ArrayView1::from(&qi[..]));
        let err = reward - predicted;

        let lr = self.hyperparams.learning_rate;
        let reg = self.hyperparams.regularization;

        for (w, (&p, &q)) in self
            .user_factors
            .row_mut(u)
            .iter_mut()
            .zip(pu.iter().zip(qi.iter()))
        {
            *w = p + lr * (err * q - reg * p);
        }
        for (w, (&p, &q)) in self
            .item_factors
            .row_mut(i)
            .iter_mut()
            .zip(pu.iter().zip(qi.iter()))
        {
            *w = q + lr * (err * p - reg * q);
        }
    }

    /// Top-N items for a user by predicted affinity, descending, ties broken
    /// by ascending item index. Items in `exclude` are skipped. An unknown
    /// user yields an empty list: "no model yet for this user" is a normal
    /// state, not a failure.
    pub fn recommend(
        &self,
        user_id: EntityId,
        top_n: usize,
        exclude: &HashSet<EntityId>,
    ) -> Vec<(EntityId, f32)> {
        if top_n == 0 {
            return Vec::new();
        }
        let Some(u) = self.users.index_of(user_id) else {
            return Vec::new();
        };

        let user_vec = self.user_factors.view(u);
        let mut scored: Vec<(usize, f32)> = (0..self.item_factors.rows())
            .map(|i| (i, user_vec.dot(&self.item_factors.view(i))))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut out = Vec::with_capacity(top_n.min(scored.len()));
        for (idx, score) in scored {
            let item_id = self.items.id_at(idx);
            if exclude.contains(&item_id) {
                continue;
            }
            out.push((item_id, score));
            if out.len() >= top_n {
                break;
            }
        }
        out
    }
}

fn init_vector(rng: &mut ChaCha8Rng, factors: usize) -> Vec<f32> {
    let normal = Normal::new(0.0_f32, INIT_STD).expect("valid cold-start distribution parameters");
    (0..factors).map(|_| normal.sample(rng)).collect()
}
