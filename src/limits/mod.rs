use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{ Deserialize, Serialize };
use tokio::sync::Mutex;

use crate::error::{ AppError, Result };
use crate::storage::KvStore;

pub mod period;

const SPEND_PREFIX: &str = "autoswap_spend_";

/// Rolling spend counters for one (wallet, mint) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendRecord {
    pub day_key: String,
    pub day_spent: f64,
    pub month_key: String,
    pub month_spent: f64,
}

impl SpendRecord {
    fn current() -> Self {
        let now = Utc::now();
        Self {
            day_key: period::day_key(now),
            day_spent: 0.0,
            month_key: period::month_key(now),
            month_spent: 0.0,
        }
    }
}

/// Tracks per-wallet, per-token spend against daily and monthly caps.
///
/// The orchestrator evaluates a wallet's rules sequentially, which already
/// makes check-then-record race-free for one wallet. The per-wallet mutex
/// here additionally serializes callers that bypass the orchestrator (the
/// manual activation path), so two concurrent checks can never both pass and
/// jointly exceed a cap.
pub struct LimitTracker {
    storage: Arc<dyn KvStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LimitTracker {
    pub fn new(storage: Arc<dyn KvStore>) -> Self {
        Self {
            storage,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn storage_key(wallet: &str, mint: &str) -> String {
        format!("{}{}_{}", SPEND_PREFIX, wallet, mint)
    }

    async fn wallet_lock(&self, wallet: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // An entry held only by the map belongs to an idle wallet; prune it
        // so the map does not grow with every wallet ever seen.
        locks.retain(|key, lock| key == wallet || Arc::strong_count(lock) > 1);
        locks.entry(wallet.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    async fn load(&self, wallet: &str, mint: &str) -> Result<SpendRecord> {
        match self.storage.get(&Self::storage_key(wallet, mint)).await? {
            Some(raw) =>
                serde_json
                    ::from_str(&raw)
                    .map_err(|e|
                        AppError::Storage(format!("Corrupt spend record for {}: {}", wallet, e))
                    ),
            None => Ok(SpendRecord::current()),
        }
    }

    async fn persist(&self, wallet: &str, mint: &str, record: &SpendRecord) -> Result<()> {
        let raw = serde_json
            ::to_string(record)
            .map_err(|e| AppError::Internal(format!("Failed to serialize spend record: {}", e)))?;
        self.storage.put(&Self::storage_key(wallet, mint), raw).await
    }

    /// Would spending `proposed` stay within both caps for the current
    /// periods?
    pub async fn check_limit(
        &self,
        wallet: &str,
        mint: &str,
        proposed: f64,
        daily_cap: f64,
        monthly_cap: f64
    ) -> Result<bool> {
        let lock = self.wallet_lock(wallet).await;
        let _guard = lock.lock().await;

        let record = period::rolled_over(self.load(wallet, mint).await?, Utc::now());

        Ok(
            record.day_spent + proposed <= daily_cap &&
                record.month_spent + proposed <= monthly_cap
        )
    }

    /// Add a completed swap's amount to the rolling counters. Only called
    /// after a terminal Success outcome; failed attempts never reach here.
    pub async fn record_spend(&self, wallet: &str, mint: &str, amount: f64) -> Result<()> {
        let lock = self.wallet_lock(wallet).await;
        let _guard = lock.lock().await;

        let mut record = period::rolled_over(self.load(wallet, mint).await?, Utc::now());
        record.day_spent += amount;
        record.month_spent += amount;

        self.persist(wallet, mint, &record).await
    }

    /// Current counters, rolled over to the present periods. Read-only.
    pub async fn current_spend(&self, wallet: &str, mint: &str) -> Result<SpendRecord> {
        Ok(period::rolled_over(self.load(wallet, mint).await?, Utc::now()))
    }
}
