//! Shared fixtures for reconciler and scheduler tests
//!
//! `FakeSource` keeps an in-process remote state that tests mutate between
//! passes; `Harness` wires a reconciler to an in-memory SQLite mirror.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::mpsc;

use kbsync_cache::{DatabasePool, SqliteMirrorStore, SqliteNotificationLog};
use kbsync_core::domain::{ParentKind, Provider, RemoteId, RemoteItem, SyncFile, UserId};
use kbsync_core::ports::{
    IMirrorStore, IRemoteSource, IngestionRecord, MirrorScope, RemotePage, SourceError,
};
use kbsync_sync::handoff::ChannelIngestionSink;
use kbsync_sync::Reconciler;

// ============================================================================
// Item helpers
// ============================================================================

pub fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
}

pub fn rid(id: &str) -> RemoteId {
    RemoteId::new(id).unwrap()
}

/// Top-level Notion page
pub fn root_page(id: &str, day: u32) -> RemoteItem {
    RemoteItem::new(rid(id), ParentKind::Workspace, ts(day))
        .with_name(id)
        .with_mime_type("md")
        .with_content_ref(format!("https://www.notion.so/{id}"))
}

/// Notion page nested under `parent`
pub fn child_page(id: &str, parent: &str, day: u32) -> RemoteItem {
    RemoteItem::new(rid(id), ParentKind::Page, ts(day))
        .with_parent(rid(parent))
        .with_name(id)
        .with_mime_type("md")
        .with_content_ref(format!("https://www.notion.so/{id}"))
}

// ============================================================================
// FakeSource
// ============================================================================

#[derive(Default)]
struct FakeState {
    items: BTreeMap<RemoteId, RemoteItem>,
    unavailable: HashSet<RemoteId>,
    listing_error: Option<String>,
    fetch_delay: Option<Duration>,
    list_delay: Option<Duration>,
    panic_on_list: bool,
}

/// Scriptable remote source listing its items newest first
pub struct FakeSource {
    provider: Provider,
    supported: &'static [ParentKind],
    page_size: usize,
    state: Mutex<FakeState>,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeSource {
    /// A Notion-like source (pages and workspaces are first-class)
    pub fn notion() -> Self {
        Self::new(Provider::Notion, &[ParentKind::Page, ParentKind::Workspace])
    }

    pub fn new(provider: Provider, supported: &'static [ParentKind]) -> Self {
        Self {
            provider,
            supported,
            page_size: 100,
            state: Mutex::new(FakeState::default()),
            list_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Adds or replaces an item at the remote
    pub fn put(&self, item: RemoteItem) -> &Self {
        self.state.lock().unwrap().items.insert(item.id.clone(), item);
        self
    }

    /// Deletes an item at the remote so fetches report it gone
    pub fn remove(&self, id: &str) {
        self.state.lock().unwrap().items.remove(&rid(id));
    }

    /// Makes fetches of `id` fail as unavailable
    pub fn set_unavailable(&self, id: &str) {
        self.state.lock().unwrap().unavailable.insert(rid(id));
    }

    pub fn fail_listing(&self, message: &str) {
        self.state.lock().unwrap().listing_error = Some(message.to_string());
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        self.state.lock().unwrap().fetch_delay = Some(delay);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.state.lock().unwrap().list_delay = Some(delay);
    }

    pub fn panic_on_list(&self) {
        self.state.lock().unwrap().panic_on_list = true;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.list_calls.store(0, Ordering::SeqCst);
        self.fetch_calls.store(0, Ordering::SeqCst);
    }

    /// Highest number of listing calls observed in flight at once
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IRemoteSource for FakeSource {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn supported_parent_kinds(&self) -> &'static [ParentKind] {
        self.supported
    }

    async fn list_changed_since(
        &self,
        cursor: Option<&str>,
        _low_water_mark: DateTime<Utc>,
    ) -> Result<RemotePage, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let (items, delay) = {
            let state = self.state.lock().unwrap();
            if state.panic_on_list {
                panic!("listing exploded");
            }
            if let Some(message) = &state.listing_error {
                return Err(SourceError::RemoteUnavailable(message.clone()));
            }
            let mut items: Vec<RemoteItem> = state.items.values().cloned().collect();
            items.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
            (items, state.list_delay)
        };

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let offset: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (offset + self.page_size).min(items.len());
        let page: Vec<RemoteItem> = items[offset.min(end)..end].to_vec();

        Ok(if end < items.len() {
            RemotePage::with_next(page, end.to_string())
        } else {
            RemotePage::last(page)
        })
    }

    async fn fetch_item(&self, remote_id: &RemoteId) -> Result<RemoteItem, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let (result, delay) = {
            let state = self.state.lock().unwrap();
            let result = if state.unavailable.contains(remote_id) {
                Err(SourceError::RemoteUnavailable(format!("{remote_id}: 503")))
            } else {
                state
                    .items
                    .get(remote_id)
                    .cloned()
                    .ok_or_else(|| SourceError::RemoteItemGone(remote_id.clone()))
            };
            (result, state.fetch_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub db: DatabasePool,
    pub store: Arc<SqliteMirrorStore>,
    pub notifications: Arc<SqliteNotificationLog>,
    pub reconciler: Arc<Reconciler>,
    pub ingested: mpsc::Receiver<IngestionRecord>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30)).await
    }

    pub async fn with_timeout(session_timeout: Duration) -> Self {
        let db = DatabasePool::in_memory()
            .await
            .expect("Failed to create in-memory database");
        Self::with_database(db, session_timeout)
    }

    /// Wires the reconciler to an already opened database
    pub fn with_database(db: DatabasePool, session_timeout: Duration) -> Self {
        let store = Arc::new(SqliteMirrorStore::new(db.pool().clone()));
        let notifications = Arc::new(SqliteNotificationLog::new(db.pool().clone()));
        let (sink, ingested) = ChannelIngestionSink::new(1024);

        let reconciler = Reconciler::new(store.clone(), Arc::new(sink), notifications.clone())
            .with_session_timeout(session_timeout);

        Self {
            db,
            store,
            notifications,
            reconciler: Arc::new(reconciler),
            ingested,
        }
    }

    /// All mirror rows of a scope, ordered by remote id
    pub async fn rows(&self, provider: Provider, user: UserId) -> Vec<SyncFile> {
        let mut session = self
            .store
            .begin(MirrorScope::new(provider, user))
            .await
            .unwrap();
        let mut rows = session.get_all().await.unwrap();
        session.rollback().await.unwrap();
        rows.sort_by(|a, b| a.remote_id().as_str().cmp(b.remote_id().as_str()));
        rows
    }

    pub async fn row_ids(&self, provider: Provider, user: UserId) -> Vec<String> {
        self.rows(provider, user)
            .await
            .iter()
            .map(|f| f.remote_id().as_str().to_string())
            .collect()
    }

    pub async fn low_water_mark(&self, provider: Provider, user: UserId) -> DateTime<Utc> {
        let mut session = self
            .store
            .begin(MirrorScope::new(provider, user))
            .await
            .unwrap();
        let mark = session.low_water_mark().await.unwrap();
        session.rollback().await.unwrap();
        mark
    }

    /// Ingestion records delivered so far
    pub fn drain_ingested(&mut self) -> Vec<IngestionRecord> {
        let mut records = Vec::new();
        while let Ok(record) = self.ingested.try_recv() {
            records.push(record);
        }
        records
    }
}
