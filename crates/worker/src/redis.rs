use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::queue::{Job, JobQueue};

/// Shared queue over a redis list; jobs are JSON payloads pushed to the head
/// and blocking-popped from the tail.
pub struct RedisQueue {
    conn: ConnectionManager,
    key: String,
}

/// Tail-pop block, kept short so a cancelled pop is observed promptly.
const POP_BLOCK_SECS: u64 = 5;

impl RedisQueue {
    pub const JOB_LIST: &'static str = "ai_reviewer_jobs";

    pub async fn connect(addr: &str, key: &str) -> Result<Self> {
        let client =
            redis::Client::open(format!("redis://{addr}")).context("parsing redis address")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("connecting to redis")?;
        Ok(Self {
            conn,
            key: key.to_string(),
        })
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn push(&self, job: Job) -> Result<()> {
        let payload = serde_json::to_string(&job).context("encoding job")?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&self.key, payload)
            .await
            .context("pushing job to redis")?;
        Ok(())
    }

    async fn pop(&self) -> Result<Job> {
        let mut conn = self.conn.clone();
        loop {
            let entry: Option<(String, String)> = redis::cmd("BRPOP")
                .arg(&self.key)
                .arg(POP_BLOCK_SECS)
                .query_async(&mut conn)
                .await
                .context("popping job from redis")?;
            let Some((_, payload)) = entry else {
                continue;
            };
            return serde_json::from_str(&payload).context("decoding job");
        }
    }
}
