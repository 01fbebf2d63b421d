//! Interaction job queue
//!
//! Redis-list-backed queue between the ingest API and the update workers.
//! Producers LPUSH a JSON job envelope and return immediately with the job
//! id; workers BRPOP with a timeout. Delivery is at-least-once: a worker that
//! fails a job loudly (e.g. on lock timeout) may re-enqueue it, and the
//! update step tolerates replays.

use crate::scoring::Interaction;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use reco_core::{RecoError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// One queued interaction with its delivery bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub interaction: Interaction,
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

/// Producer/consumer handle for the interaction queue.
#[derive(Clone)]
pub struct InteractionQueue {
    client: redis::Client,
    queue_key: String,
}

impl InteractionQueue {
    pub fn new(redis_url: &str, queue_key: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(RecoError::redis)?;
        Ok(Self {
            client,
            queue_key: queue_key.into(),
        })
    }

    async fn connect(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(RecoError::redis)
    }

    /// Enqueue one interaction, returning the acceptance job id.
    pub async fn enqueue(&self, interaction: &Interaction) -> Result<Uuid> {
        let job = Job {
            id: Uuid::new_v4(),
            interaction: interaction.clone(),
            attempts: 0,
            enqueued_at: Utc::now(),
        };
        self.push(&job).await?;
        tracing::debug!(job_id = %job.id, user_id = job.interaction.user_id, "enqueued interaction");
        Ok(job.id)
    }

    /// Put a failed job back on the queue with its attempt count bumped.
    pub async fn requeue(&self, mut job: Job) -> Result<()> {
        job.attempts += 1;
        self.push(&job).await
    }

    async fn push(&self, job: &Job) -> Result<()> {
        let payload = serde_json::to_string(job)
            .map_err(|e| RecoError::Serialization(format!("failed to encode job: {e}")))?;
        let mut conn = self.connect().await?;
        conn.lpush::<_, _, ()>(&self.queue_key, payload)
            .await
            .map_err(RecoError::redis)
    }

    /// Block for up to `timeout` waiting for the next job. `Ok(None)` on
    /// timeout.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<Job>> {
        let mut conn = self.connect().await?;
        let popped: Option<(String, String)> = conn
            .brpop(&self.queue_key, timeout.as_secs_f64())
            .await
            .map_err(RecoError::redis)?;
        match popped {
            Some((_, payload)) => {
                let job = serde_json::from_str(&payload).map_err(|e| {
                    RecoError::Serialization(format!("failed to decode job: {e}"))
                })?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_envelope_round_trip() {
        let job = Job {
            id: Uuid::new_v4(),
            interaction: Interaction {
                user_id: 101,
                item_id: 201,
                like: true,
                watch_time: 600.0,
                duration: Some(600.0),
                dont_suggest: false,
                comment: None,
                weights: None,
            },
            attempts: 1,
            enqueued_at: Utc::now(),
        };
        let payload = serde_json::to_string(&job).unwrap();
        let decoded: Job = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded.id, job.id);
        assert_eq!(decoded.attempts, 1);
        assert_eq!(decoded.interaction.user_id, 101);
        assert_eq!(decoded.interaction.item_id, 201);
    }

    #[test]
    fn test_job_decodes_sparse_payload() {
        // producers may omit optional signal fields entirely
        let payload = r#"{
            "id": "e4b1e7a0-9f46-4c87-9f41-0e29a1d6f7aa",
            "interaction": {"user_id": 1, "item_id": 2, "watch_time": 30.0},
            "attempts": 0,
            "enqueued_at": "2026-08-01T00:00:00Z"
        }"#;
        let job: Job = serde_json::from_str(payload).unwrap();
        assert!(!job.interaction.like);
        assert!(job.interaction.duration.is_none());
        assert!(job.interaction.weights.is_none());
    }
}
