use std::sync::Arc;

use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use tokio::sync::broadcast;
use tracing::{ info, warn };
use uuid::Uuid;

use crate::enums::{ NotificationKind, SwapStatus };
use crate::error::{ AppError, Result };
use crate::storage::KvStore;

const HISTORY_PREFIX: &str = "swap_history_";

/// One completed or failed swap as shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapHistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub wallet: String,
    #[serde(rename = "fromToken")]
    pub from_token: String,
    #[serde(rename = "toToken")]
    pub to_token: String,
    #[serde(rename = "fromAmount")]
    pub from_amount: f64,
    #[serde(rename = "toAmount")]
    pub to_amount: Option<f64>,
    pub status: SwapStatus,
    pub aggregator: Option<String>,
    pub signature: Option<String>,
    pub error: Option<String>,
}

/// User-facing event emitted alongside history writes. Subscribers (the API
/// event stream, log output) receive these over a broadcast channel.
#[derive(Debug, Clone, Serialize)]
pub struct SwapEvent {
    pub kind: NotificationKind,
    pub wallet: String,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl SwapEvent {
    pub fn new(kind: NotificationKind, wallet: &str, title: &str, message: String) -> Self {
        Self {
            kind,
            wallet: wallet.to_string(),
            title: title.to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Bounded per-wallet swap history, newest first.
pub struct HistoryStore {
    storage: Arc<dyn KvStore>,
    cap: usize,
}

impl HistoryStore {
    pub fn new(storage: Arc<dyn KvStore>, cap: usize) -> Self {
        Self { storage, cap }
    }

    fn storage_key(wallet: &str) -> String {
        format!("{}{}", HISTORY_PREFIX, wallet)
    }

    /// Newest-first list of recorded swaps for the wallet.
    pub async fn list(&self, wallet: &str) -> Result<Vec<SwapHistoryEntry>> {
        match self.storage.get(&Self::storage_key(wallet)).await? {
            Some(raw) =>
                serde_json
                    ::from_str(&raw)
                    .map_err(|e|
                        AppError::Storage(format!("Corrupt history for {}: {}", wallet, e))
                    ),
            None => Ok(Vec::new()),
        }
    }

    /// Prepend an entry, dropping the oldest ones beyond the cap.
    pub async fn record(&self, entry: SwapHistoryEntry) -> Result<()> {
        let wallet = entry.wallet.clone();
        let mut entries = self.list(&wallet).await?;

        entries.insert(0, entry);
        entries.truncate(self.cap);

        let raw = serde_json
            ::to_string(&entries)
            .map_err(|e| AppError::Internal(format!("Failed to serialize history: {}", e)))?;

        self.storage.put(&Self::storage_key(&wallet), raw).await
    }
}

/// Fan-out for swap events. Publishing never fails: a lagging or absent
/// subscriber must not stall the swap pipeline.
pub struct Notifier {
    sender: broadcast::Sender<SwapEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SwapEvent) {
        match event.kind {
            NotificationKind::Warning | NotificationKind::Error => {
                warn!("[{}] {}: {}", event.wallet, event.title, event.message);
            }
            _ => {
                info!("[{}] {}: {}", event.wallet, event.title, event.message);
            }
        }

        // Err here only means nobody is subscribed right now.
        let _ = self.sender.send(event);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    fn entry(from_amount: f64, status: SwapStatus) -> SwapHistoryEntry {
        SwapHistoryEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            wallet: WALLET.to_string(),
            from_token: "SOL".to_string(),
            to_token: "USDC".to_string(),
            from_amount,
            to_amount: Some(from_amount * 100.0),
            status,
            aggregator: Some("Jupiter".to_string()),
            signature: Some("sig".to_string()),
            error: None,
        }
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let history = HistoryStore::new(Arc::new(MemoryStore::new()), 50);

        history.record(entry(1.0, SwapStatus::Success)).await.unwrap();
        history.record(entry(2.0, SwapStatus::Success)).await.unwrap();

        let entries = history.list(WALLET).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].from_amount, 2.0);
        assert_eq!(entries[1].from_amount, 1.0);
    }

    #[tokio::test]
    async fn history_drops_oldest_beyond_the_cap() {
        let history = HistoryStore::new(Arc::new(MemoryStore::new()), 3);

        for i in 1..=5 {
            history.record(entry(i as f64, SwapStatus::Success)).await.unwrap();
        }

        let entries = history.list(WALLET).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].from_amount, 5.0);
        assert_eq!(entries[2].from_amount, 3.0);
    }

    #[tokio::test]
    async fn empty_history_lists_as_empty() {
        let history = HistoryStore::new(Arc::new(MemoryStore::new()), 50);
        assert!(history.list(WALLET).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_swaps_are_recorded_with_their_error() {
        let history = HistoryStore::new(Arc::new(MemoryStore::new()), 50);

        let mut failed = entry(1.0, SwapStatus::Failed);
        failed.to_amount = None;
        failed.signature = None;
        failed.error = Some("Blockhash expired".to_string());
        history.record(failed).await.unwrap();

        let entries = history.list(WALLET).await.unwrap();
        assert_eq!(entries[0].status, SwapStatus::Failed);
        assert_eq!(entries[0].error.as_deref(), Some("Blockhash expired"));
    }

    #[tokio::test]
    async fn publish_reaches_subscribers_and_never_fails_without_them() {
        let notifier = Notifier::default();

        // No subscriber yet.
        notifier.publish(SwapEvent::new(NotificationKind::Info, WALLET, "Swap", "ok".to_string()));

        let mut receiver = notifier.subscribe();
        notifier.publish(
            SwapEvent::new(NotificationKind::Success, WALLET, "Swap", "done".to_string())
        );

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.kind, NotificationKind::Success);
        assert_eq!(event.wallet, WALLET);
    }
}
