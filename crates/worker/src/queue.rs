use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use common::AppConfig;

use crate::memory::MemoryQueue;
use crate::redis::RedisQueue;

/// A pull request to review; the ingress creates one per accepted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub repo: String,
    pub pr: u64,
}

/// FIFO handoff between the webhook ingress and the processor.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Blocks until the job is accepted; callers bound the wait with a
    /// deadline.
    async fn push(&self, job: Job) -> Result<()>;
    /// Blocks until a job is available; a dropped future releases the slot.
    async fn pop(&self) -> Result<Job>;
}

const MEMORY_QUEUE_CAPACITY: usize = 100;

pub async fn build_queue(config: &AppConfig) -> Result<Arc<dyn JobQueue>> {
    match config.queue_type.as_str() {
        "redis" => {
            let queue = RedisQueue::connect(&config.redis_addr, RedisQueue::JOB_LIST).await?;
            Ok(Arc::new(queue))
        }
        _ => Ok(Arc::new(MemoryQueue::new(MEMORY_QUEUE_CAPACITY))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_round_trips_through_json() {
        let job = Job {
            repo: "acme/repo".to_string(),
            pr: 7,
        };
        let payload = serde_json::to_string(&job).expect("encode");
        let decoded: Job = serde_json::from_str(&payload).expect("decode");
        assert_eq!(decoded, job);
    }
}
