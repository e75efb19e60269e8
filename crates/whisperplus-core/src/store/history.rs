//! Capped, newest-first list of past transcriptions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::{Mutex, broadcast, watch};

use super::KeyValueStore;
use crate::error::StoreError;

pub const HISTORY_KEY: &str = "history";
pub const MAX_HISTORY: usize = 50;

const EVENT_CAPACITY: usize = 64;

fn is_false(value: &bool) -> bool {
    !*value
}

/// One finished cycle. `timestamp` is the primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    /// Creation time in ms since the epoch
    pub timestamp: i64,

    /// Transcript, the SRT file name, or the error message
    #[serde(default)]
    pub text: String,

    /// Recording length in ms; 0 for file imports
    #[serde(default)]
    pub duration: u64,

    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,

    /// Engine label, e.g. "Local (CPU)"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<u64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_srt: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srt_path: Option<String>,
}

impl HistoryItem {
    pub fn new(timestamp: i64, text: impl Into<String>, duration: u64) -> Self {
        Self {
            timestamp,
            text: text.into(),
            duration,
            error: false,
            backend: None,
            processing_time: None,
            is_srt: false,
            srt_path: None,
        }
    }

    pub fn failure(timestamp: i64, message: impl Into<String>, duration: u64) -> Self {
        Self {
            error: true,
            ..Self::new(timestamp, message, duration)
        }
    }

    pub fn with_backend(mut self, backend: impl Into<String>, processing_time: u64) -> Self {
        self.backend = Some(backend.into());
        self.processing_time = Some(processing_time);
        self
    }

    /// No speech was found
    pub fn is_silence(&self) -> bool {
        !self.error && !self.is_srt && self.text.trim().is_empty()
    }

    /// What "copy" puts on the clipboard: the file path for subtitles, the text otherwise
    pub fn copy_text(&self) -> Option<&str> {
        if self.error {
            return None;
        }
        if self.is_srt {
            return self.srt_path.as_deref();
        }
        (!self.text.trim().is_empty()).then_some(self.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
    Added(HistoryItem),
    Removed(i64),
    Cleared,
}

pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    items: Mutex<Vec<HistoryItem>>,
    events: broadcast::Sender<HistoryEvent>,
    /// Whole list after the latest mutation
    snapshot: watch::Sender<Vec<HistoryItem>>,
    last_id: AtomicI64,
}

impl HistoryStore {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let items = match store.get(HISTORY_KEY).await? {
            Some(Value::Array(values)) => parse_items(values),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                log::warn!("Stored history is not a list ({other}), starting empty");
                Vec::new()
            }
        };
        let last_id = items.iter().map(|item| item.timestamp).max().unwrap_or(0);
        log::debug!("Loaded {} history entries", items.len());

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            store,
            snapshot: watch::Sender::new(items.clone()),
            items: Mutex::new(items),
            events,
            last_id: AtomicI64::new(last_id),
        })
    }

    /// A fresh primary key: wall-clock ms, bumped past the last one issued
    pub fn next_id(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.last_id.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last_id
                .compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }

    /// Per-mutation events. A receiver that falls more than 64 events behind
    /// gets `RecvError::Lagged` and should reread the list, or use
    /// [`watch`](Self::watch) instead.
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.events.subscribe()
    }

    /// The current list, refreshed after every mutation. Never lags: a slow
    /// reader skips straight to the latest list.
    pub fn watch(&self) -> watch::Receiver<Vec<HistoryItem>> {
        self.snapshot.subscribe()
    }

    pub async fn list(&self) -> Vec<HistoryItem> {
        self.items.lock().await.clone()
    }

    /// Case-insensitive substring match on the text. An empty filter matches everything.
    pub async fn search(&self, filter: &str) -> Vec<HistoryItem> {
        let filter = filter.trim().to_lowercase();
        let items = self.items.lock().await;
        if filter.is_empty() {
            return items.clone();
        }
        items
            .iter()
            .filter(|item| item.text.to_lowercase().contains(&filter))
            .cloned()
            .collect()
    }

    pub async fn get(&self, timestamp: i64) -> Option<HistoryItem> {
        self.items
            .lock()
            .await
            .iter()
            .find(|item| item.timestamp == timestamp)
            .cloned()
    }

    /// Insert at the front. An entry with the same timestamp is replaced and
    /// the oldest entry is evicted past [`MAX_HISTORY`].
    pub async fn add(&self, item: HistoryItem) -> Result<(), StoreError> {
        {
            let mut items = self.items.lock().await;
            let mut next = items.clone();
            next.retain(|existing| existing.timestamp != item.timestamp);
            next.insert(0, item.clone());
            next.truncate(MAX_HISTORY);
            self.persist(&next).await?;
            *items = next;
            self.snapshot.send_replace(items.clone());
        }
        self.last_id.fetch_max(item.timestamp, Ordering::Relaxed);
        log::debug!("History entry {} added", item.timestamp);
        self.notify(HistoryEvent::Added(item));
        Ok(())
    }

    /// Returns whether an entry was removed
    pub async fn remove(&self, timestamp: i64) -> Result<bool, StoreError> {
        {
            let mut items = self.items.lock().await;
            let mut next = items.clone();
            next.retain(|existing| existing.timestamp != timestamp);
            if next.len() == items.len() {
                return Ok(false);
            }
            self.persist(&next).await?;
            *items = next;
            self.snapshot.send_replace(items.clone());
        }
        self.notify(HistoryEvent::Removed(timestamp));
        Ok(true)
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        {
            let mut items = self.items.lock().await;
            self.persist(&[]).await?;
            items.clear();
            self.snapshot.send_replace(Vec::new());
        }
        log::info!("History cleared");
        self.notify(HistoryEvent::Cleared);
        Ok(())
    }

    async fn persist(&self, items: &[HistoryItem]) -> Result<(), StoreError> {
        self.store
            .set(HISTORY_KEY, serde_json::to_value(items)?)
            .await?;
        self.store.save().await
    }

    fn notify(&self, event: HistoryEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn parse_items(values: Vec<Value>) -> Vec<HistoryItem> {
    let mut items: Vec<HistoryItem> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                log::warn!("Skipping malformed history entry: {e}");
                None
            }
        })
        .collect();
    items.truncate(MAX_HISTORY);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, MemoryStore};
    use serde_json::json;

    async fn empty_history() -> (Arc<MemoryStore>, HistoryStore) {
        let backing = Arc::new(MemoryStore::new());
        let history = HistoryStore::load(backing.clone()).await.unwrap();
        (backing, history)
    }

    #[tokio::test]
    async fn newest_first_and_capped() {
        let (backing, history) = empty_history().await;

        for ts in 1..=(MAX_HISTORY as i64 + 1) {
            history.add(HistoryItem::new(ts, format!("item {ts}"), 1000)).await.unwrap();
        }

        let items = history.list().await;
        assert_eq!(items.len(), MAX_HISTORY);
        assert_eq!(items[0].timestamp, MAX_HISTORY as i64 + 1);
        // The oldest entry (timestamp 1) was evicted
        assert_eq!(items.last().unwrap().timestamp, 2);

        let stored = backing.get(HISTORY_KEY).await.unwrap().unwrap();
        assert_eq!(stored.as_array().unwrap().len(), MAX_HISTORY);
    }

    #[tokio::test]
    async fn same_timestamp_replaces_and_moves_to_front() {
        let (_, history) = empty_history().await;
        history.add(HistoryItem::new(10, "placeholder", 0)).await.unwrap();
        history.add(HistoryItem::new(20, "other", 0)).await.unwrap();

        history.add(HistoryItem::new(10, "final", 0)).await.unwrap();

        let items = history.list().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].timestamp, 10);
        assert_eq!(items[0].text, "final");
    }

    #[tokio::test]
    async fn every_subscriber_is_notified() {
        let (_, history) = empty_history().await;
        let mut list_view = history.subscribe();
        let mut ticker = history.subscribe();

        history.add(HistoryItem::new(1, "hi", 0)).await.unwrap();
        assert!(history.remove(1).await.unwrap());
        history.clear().await.unwrap();

        for rx in [&mut list_view, &mut ticker] {
            assert!(matches!(rx.recv().await.unwrap(), HistoryEvent::Added(_)));
            assert_eq!(rx.recv().await.unwrap(), HistoryEvent::Removed(1));
            assert_eq!(rx.recv().await.unwrap(), HistoryEvent::Cleared);
        }
    }

    #[tokio::test]
    async fn slow_subscribers_can_catch_up_from_the_list_watch() {
        let (_, history) = empty_history().await;
        let mut events = history.subscribe();
        let mut list = history.watch();

        for ts in 1..=(EVENT_CAPACITY as i64 + 10) {
            history.add(HistoryItem::new(ts, format!("note {ts}"), 0)).await.unwrap();
        }

        assert!(matches!(
            events.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert!(list.has_changed().unwrap());
        let latest = list.borrow_and_update().clone();
        assert_eq!(latest.len(), MAX_HISTORY);
        assert_eq!(latest[0].timestamp, EVENT_CAPACITY as i64 + 10);
        assert_eq!(latest, history.list().await);

        history.clear().await.unwrap();
        list.changed().await.unwrap();
        assert!(list.borrow().is_empty());
    }

    #[tokio::test]
    async fn removing_unknown_entry_is_quiet() {
        let (_, history) = empty_history().await;
        let mut rx = history.subscribe();
        assert!(!history.remove(99).await.unwrap());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn search_ignores_case() {
        let (_, history) = empty_history().await;
        history.add(HistoryItem::new(1, "Hello World", 0)).await.unwrap();
        history.add(HistoryItem::new(2, "goodbye", 0)).await.unwrap();

        let found = history.search("WORLD").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].timestamp, 1);
        assert_eq!(history.search("").await.len(), 2);
    }

    #[tokio::test]
    async fn load_skips_malformed_entries() {
        let backing = Arc::new(MemoryStore::new());
        backing
            .set(
                HISTORY_KEY,
                json!([
                    { "timestamp": 5, "text": "ok", "duration": 1200 },
                    { "text": "no timestamp" },
                    { "timestamp": 3, "text": "", "error": true },
                ]),
            )
            .await
            .unwrap();

        let history = HistoryStore::load(backing).await.unwrap();
        let items = history.list().await;
        assert_eq!(items.len(), 2);
        assert!(items[1].error);
        assert!(history.next_id() > 5);
    }

    #[tokio::test]
    async fn persists_through_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        {
            let store = Arc::new(JsonFileStore::open(&path).await.unwrap());
            let history = HistoryStore::load(store).await.unwrap();
            let item = HistoryItem::new(42, "saved", 900).with_backend("Local (CPU)", 350);
            history.add(item).await.unwrap();
        }

        let store = Arc::new(JsonFileStore::open(&path).await.unwrap());
        let history = HistoryStore::load(store).await.unwrap();
        let item = history.get(42).await.unwrap();
        assert_eq!(item.backend.as_deref(), Some("Local (CPU)"));
        assert_eq!(item.processing_time, Some(350));
        assert!(!item.error);
    }

    #[test]
    fn serializes_optional_fields_sparsely() {
        let value = serde_json::to_value(HistoryItem::new(1, "", 600)).unwrap();
        assert_eq!(value, json!({ "timestamp": 1, "text": "", "duration": 600 }));

        let mut srt = HistoryItem::new(2, "talk.srt", 0);
        srt.is_srt = true;
        srt.srt_path = Some("/out/talk.srt".into());
        let value = serde_json::to_value(&srt).unwrap();
        assert_eq!(value["isSrt"], json!(true));
        assert_eq!(srt.copy_text(), Some("/out/talk.srt"));
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let history = HistoryStore {
            store: Arc::new(MemoryStore::new()),
            items: Mutex::new(Vec::new()),
            snapshot: watch::Sender::new(Vec::new()),
            events: broadcast::channel(1).0,
            last_id: AtomicI64::new(i64::MAX - 10),
        };
        let a = history.next_id();
        let b = history.next_id();
        assert!(b > a);
    }
}
