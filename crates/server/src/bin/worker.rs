//! Interaction update worker
//!
//! Pulls interaction jobs off the shared Redis queue and applies each one as
//! a lock-guarded load → update → save round trip against the shared model
//! snapshot. Holds no model state of its own, so any number of workers can
//! run side by side.
//!
//! A job that cannot acquire the model lock fails loudly: it is re-enqueued
//! once and dropped with an error after that, never silently skipped.

use reco_core::{load_dotenv, ConfigLoader, ModelConfig, RecoError, RedisConfig};
use reco_engine::{InteractionQueue, Job, SharedCoordinator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .json()
        .init();

    let model_config = ModelConfig::from_env()?;
    model_config.validate()?;
    let redis_config = RedisConfig::from_env()?;
    redis_config.validate()?;

    let coordinator = SharedCoordinator::new(&redis_config, &model_config)?;
    let queue = InteractionQueue::new(&redis_config.url, redis_config.queue_key.clone())?;

    info!(
        queue = %redis_config.queue_key,
        model_key = %model_config.model_key,
        "interaction worker started"
    );

    // The shutdown signal only sets a flag; the in-flight BRPOP is never
    // cancelled, so a job already popped server-side still gets handled.
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            flag.store(true, Ordering::Relaxed);
        }
    });

    while !shutdown.load(Ordering::Relaxed) {
        match queue.dequeue(DEQUEUE_TIMEOUT).await {
            Ok(Some(job)) => handle_job(&coordinator, &queue, job).await,
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "failed to dequeue job");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }

    info!("shutdown complete");
    Ok(())
}

async fn handle_job(coordinator: &SharedCoordinator, queue: &InteractionQueue, job: Job) {
    match coordinator.process(&job.interaction).await {
        Ok(applied) => {
            info!(
                job_id = %job.id,
                user_id = applied.user_id,
                item_id = applied.item_id,
                score = applied.score,
                "applied interaction"
            );
        }
        Err(RecoError::LockTimeout { key, waited_ms }) if job.attempts == 0 => {
            warn!(job_id = %job.id, lock = %key, waited_ms, "lock timeout, re-enqueueing job");
            if let Err(e) = queue.requeue(job).await {
                error!(error = %e, "failed to re-enqueue job after lock timeout");
            }
        }
        Err(e) => {
            error!(
                job_id = %job.id,
                attempts = job.attempts,
                error = %e,
                "dropping failed job"
            );
        }
    }
}
