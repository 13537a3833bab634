// src/repository.rs

//! Access to the cached forum catalog, and the rebuild coordinator.
//!
//! The repository owns the "rebuild in progress" flag - one atomic
//! compare-and-set decides the single winner when concurrent callers trigger
//! an update, and everyone else coalesces into a no-op. Start/completion
//! notifications go out on a typed broadcast channel so subscribers never
//! couple to the crawl's threading.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::crawler::{PageFetcher, RefreshTask};
use crate::error::Result;
use crate::models::{BOOKMARKS_ID, Config, Forum, ForumKind, ForumRecord, TOP_LEVEL_PARENT_ID};
use crate::storage::ForumStore;
use crate::structure::{ForumStructure, ListFormat};

/// Notifications published around catalog rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEvent {
    /// A rebuild has started
    Started,
    /// A rebuild has finished - the catalog may or may not have changed
    Completed,
}

/// How a call to [`ForumRepository::update_forums`] resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// This caller ran the rebuild to a successful finish
    Refreshed,
    /// A rebuild was already in flight; this call was a no-op
    AlreadyRunning,
}

/// Provides access to current forum state and forces updates.
pub struct ForumRepository {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn ForumStore>,
    update_active: AtomicBool,
    events: broadcast::Sender<UpdateEvent>,
}

impl ForumRepository {
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn ForumStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            config,
            fetcher,
            store,
            update_active: AtomicBool::new(false),
            events,
        }
    }

    /// Subscribe to rebuild start/completion notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.events.subscribe()
    }

    /// Check if a forums data update is in progress.
    pub fn is_updating(&self) -> bool {
        self.update_active.load(Ordering::Acquire)
    }

    /// Rebuild the catalog in the background.
    ///
    /// Fire-and-forget variant of [`update_forums`](Self::update_forums) for
    /// callers that follow progress through [`subscribe`](Self::subscribe).
    pub fn trigger_update(repo: &Arc<Self>) {
        let repo = Arc::clone(repo);
        tokio::spawn(async move {
            if let Err(e) = repo.update_forums().await {
                log::warn!("Background catalog update failed: {}", e);
            }
        });
    }

    /// Rebuild the current forum catalog by crawling the board.
    ///
    /// At most one rebuild runs at a time; a caller that loses the race gets
    /// [`UpdateOutcome::AlreadyRunning`] without touching the catalog. On
    /// success the crawled hierarchy fully replaces the stored record set;
    /// on failure the previous catalog stays visible to readers.
    pub async fn update_forums(&self) -> Result<UpdateOutcome> {
        // only one initiator may win the race to start a run
        if self.update_active.swap(true, Ordering::AcqRel) {
            log::warn!("Tried to refresh forums while an update was already running!");
            return Ok(UpdateOutcome::AlreadyRunning);
        }

        let _ = self.events.send(UpdateEvent::Started);
        let result = self.run_update().await;
        self.update_active.store(false, Ordering::Release);
        let _ = self.events.send(UpdateEvent::Completed);

        result.map(|_| UpdateOutcome::Refreshed)
    }

    async fn run_update(&self) -> Result<()> {
        let timeout = Duration::from_secs(self.config.refresh.refresh_timeout_secs);
        let task = RefreshTask::new(
            Arc::clone(&self.fetcher),
            self.config.crawler.base_url.clone(),
            timeout,
        );
        let tree = task.run().await?;

        // treat the crawled subforum links as ground truth and de-alias the
        // tree before anything downstream holds onto it
        let structure = ForumStructure::build_from_tree(&tree, TOP_LEVEL_PARENT_ID);
        self.store_forum_data(&structure).await
    }

    /// Get the current catalog as a hierarchy, rebuilt from stored records.
    pub async fn forum_structure(&self) -> Result<ForumStructure> {
        let forums = self.load_forum_data().await?;
        Ok(ForumStructure::build_from_ordered_list(
            &forums,
            TOP_LEVEL_PARENT_ID,
        ))
    }

    /// Remove all cached forum data.
    pub async fn clear_forum_data(&self) -> Result<()> {
        self.store.clear_all().await
    }

    /// Load all stored forums in index order, with their kinds assigned.
    async fn load_forum_data(&self) -> Result<Vec<Forum>> {
        let records = self.store.load_all_ordered().await?;
        let forums = records
            .iter()
            .map(|record| {
                let mut forum = record.to_forum();
                // the kind drives list formatting downstream
                forum.kind = if forum.id == BOOKMARKS_ID {
                    ForumKind::Bookmarks
                } else if forum.parent_id == TOP_LEVEL_PARENT_ID {
                    ForumKind::Section
                } else {
                    ForumKind::Forum
                };
                forum
            })
            .collect();
        Ok(forums)
    }

    /// Store a hierarchy as flat records, indexed in display order.
    async fn store_forum_data(&self, structure: &ForumStructure) -> Result<()> {
        let updated_at = Utc::now();
        let mut records = Vec::with_capacity(structure.node_count() + 1);

        // special entries not on the crawled hierarchy come first
        let bookmarks = Forum::new(BOOKMARKS_ID, TOP_LEVEL_PARENT_ID, "Bookmarks", "");
        add_record(&mut records, &bookmarks, updated_at);

        let flattened = structure
            .as_list()
            .include_sections(true)
            .format(ListFormat::Flat)
            .build();
        for forum in &flattened {
            add_record(&mut records, forum, updated_at);
        }

        self.store.replace_all(&records).await
    }
}

/// Append a record for a forum, indexed by its position in the list.
fn add_record(records: &mut Vec<ForumRecord>, forum: &Forum, updated_at: DateTime<Utc>) {
    let index = records.len();
    records.push(ForumRecord::from_forum(index, forum, updated_at));
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use async_trait::async_trait;

    use crate::error::AppError;
    use crate::storage::MemoryStore;

    const INDEX_URL: &str = "https://board.test/index.php";

    /// Serves canned HTML bodies; any url not in the map is a fetch error.
    struct StubFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| AppError::crawl(url, "connection refused"))
        }
    }

    /// Never resolves; used to hold an update open.
    struct HangingFetcher;

    #[async_trait]
    impl PageFetcher for HangingFetcher {
        async fn fetch(&self, _url: &str) -> Result<String> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    fn test_config() -> Arc<Config> {
        let mut config = Config::default();
        config.crawler.base_url = INDEX_URL.to_string();
        config.refresh.refresh_timeout_secs = 30;
        Arc::new(config)
    }

    /// One section (id 1) with one subforum (id 10).
    fn small_site() -> Arc<StubFetcher> {
        let mut pages = HashMap::new();
        pages.insert(
            INDEX_URL.to_string(),
            r#"<html><body>
                <div class="category"><a href="forumdisplay.php?forumid=1">Main</a></div>
            </body></html>"#
                .to_string(),
        );
        pages.insert(
            "https://board.test/forumdisplay.php?forumid=1".to_string(),
            r#"<html><body><table>
                <tr class="subforum"><td><a href="forumdisplay.php?forumid=10">GBS</a><dd>- chat</dd></td></tr>
            </table></body></html>"#
                .to_string(),
        );
        pages.insert(
            "https://board.test/forumdisplay.php?forumid=10".to_string(),
            "<html><body></body></html>".to_string(),
        );
        Arc::new(StubFetcher { pages })
    }

    fn repository(fetcher: Arc<dyn PageFetcher>, store: Arc<dyn ForumStore>) -> ForumRepository {
        ForumRepository::new(test_config(), fetcher, store)
    }

    #[tokio::test]
    async fn test_update_stores_bookmarks_and_indexed_records() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(small_site(), Arc::clone(&store) as Arc<dyn ForumStore>);

        let outcome = repo.update_forums().await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Refreshed);

        let records = store.load_all_ordered().await.unwrap();
        let ids: Vec<i32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![BOOKMARKS_ID, 1, 10]);
        let indexes: Vec<usize> = records.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(records[2].parent_id, 1);
        assert_eq!(records[2].subtitle, "chat");
    }

    #[tokio::test]
    async fn test_forum_structure_rebuilds_hierarchy_with_kinds() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(small_site(), Arc::clone(&store) as Arc<dyn ForumStore>);
        repo.update_forums().await.unwrap();

        let structure = repo.forum_structure().await.unwrap();
        let tree = structure.tree();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, BOOKMARKS_ID);
        assert_eq!(tree[0].kind, ForumKind::Bookmarks);
        assert_eq!(tree[1].id, 1);
        assert_eq!(tree[1].kind, ForumKind::Section);
        assert_eq!(tree[1].subforums[0].id, 10);
        assert_eq!(tree[1].subforums[0].kind, ForumKind::Forum);
    }

    #[tokio::test]
    async fn test_concurrent_update_is_coalesced() {
        let store = Arc::new(MemoryStore::new());
        let repo = Arc::new(repository(Arc::new(HangingFetcher), store));

        let background = Arc::clone(&repo);
        tokio::spawn(async move {
            let _ = background.update_forums().await;
        });
        // let the background update claim the flag
        tokio::task::yield_now().await;

        assert!(repo.is_updating());
        let outcome = repo.update_forums().await.unwrap();
        assert_eq!(outcome, UpdateOutcome::AlreadyRunning);
    }

    #[tokio::test]
    async fn test_trigger_update_runs_in_the_background() {
        let store = Arc::new(MemoryStore::new());
        let repo = Arc::new(repository(
            small_site(),
            Arc::clone(&store) as Arc<dyn ForumStore>,
        ));
        let mut events = repo.subscribe();

        ForumRepository::trigger_update(&repo);

        assert_eq!(events.recv().await.unwrap(), UpdateEvent::Started);
        assert_eq!(events.recv().await.unwrap(), UpdateEvent::Completed);
        assert_eq!(store.load_all_ordered().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_events_fire_around_an_update() {
        let repo = repository(small_site(), Arc::new(MemoryStore::new()));
        let mut events = repo.subscribe();

        repo.update_forums().await.unwrap();

        assert_eq!(events.try_recv().unwrap(), UpdateEvent::Started);
        assert_eq!(events.try_recv().unwrap(), UpdateEvent::Completed);
        assert!(!repo.is_updating());
    }

    #[tokio::test]
    async fn test_failed_update_leaves_previous_catalog_intact() {
        let store = Arc::new(MemoryStore::new());
        let good = repository(small_site(), Arc::clone(&store) as Arc<dyn ForumStore>);
        good.update_forums().await.unwrap();

        // a fetcher with no pages fails every crawl
        let bad = repository(
            Arc::new(StubFetcher {
                pages: HashMap::new(),
            }),
            Arc::clone(&store) as Arc<dyn ForumStore>,
        );
        let mut events = bad.subscribe();
        assert!(bad.update_forums().await.is_err());

        // completion is still published, and the old records survive
        assert_eq!(events.try_recv().unwrap(), UpdateEvent::Started);
        assert_eq!(events.try_recv().unwrap(), UpdateEvent::Completed);
        let records = store.load_all_ordered().await.unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_clear_forum_data() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(small_site(), Arc::clone(&store) as Arc<dyn ForumStore>);
        repo.update_forums().await.unwrap();

        repo.clear_forum_data().await.unwrap();
        assert!(store.load_all_ordered().await.unwrap().is_empty());
        assert!(repo.forum_structure().await.unwrap().is_empty());
    }
}
