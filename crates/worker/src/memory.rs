use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::queue::{Job, JobQueue};

/// In-process queue over a bounded channel; push blocks while full.
pub struct MemoryQueue {
    tx: mpsc::Sender<Job>,
    rx: Mutex<mpsc::Receiver<Job>>,
}

impl MemoryQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn push(&self, job: Job) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| anyhow!("queue receiver dropped"))
    }

    async fn pop(&self) -> Result<Job> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or_else(|| anyhow!("queue closed"))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    fn job(pr: u64) -> Job {
        Job {
            repo: "acme/repo".to_string(),
            pr,
        }
    }

    #[tokio::test]
    async fn delivers_jobs_in_fifo_order() {
        let queue = MemoryQueue::new(10);
        queue.push(job(1)).await.expect("push");
        queue.push(job(2)).await.expect("push");

        assert_eq!(queue.pop().await.expect("pop").pr, 1);
        assert_eq!(queue.pop().await.expect("pop").pr, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn push_blocks_until_deadline_when_full() {
        let queue = MemoryQueue::new(1);
        queue.push(job(1)).await.expect("push");

        let result = timeout(Duration::from_secs(3), queue.push(job(2))).await;
        assert!(result.is_err(), "push into a full queue must time out");
    }

    #[tokio::test(start_paused = true)]
    async fn pop_blocks_until_deadline_when_empty() {
        let queue = MemoryQueue::new(1);
        let result = timeout(Duration::from_secs(1), queue.pop()).await;
        assert!(result.is_err(), "pop from an empty queue must time out");
    }
}
