// src/crawler/refresh.rs

//! Concurrent forum refresh task.
//!
//! A refresh starts from the board's index page and spiders every discovered
//! section and subforum link. The total number of pages is unknown until the
//! crawl finishes: each fetched page may spawn further fetches, so completion
//! is tracked with an outstanding-job count that is bumped before every
//! dispatch and dropped exactly once per job. The run ends at the first of
//! three events: the count reaching zero (success), any job failing
//! (fail-fast, no partial results), or the wall-clock deadline elapsing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scraper::Html;
use tokio::sync::Notify;
use url::Url;

use crate::crawler::fetch::PageFetcher;
use crate::crawler::parse::{self, ForumLink};
use crate::error::{AppError, Result};
use crate::models::{Forum, ForumKind, TOP_LEVEL_PARENT_ID};

/// A single page fetch scheduled during a refresh run.
struct CrawlJob {
    url: String,
    kind: JobKind,
}

/// What a fetched page will populate.
enum JobKind {
    /// The board's index page, which must yield the section list
    Index,
    /// A section or forum page, which may yield subforums for this node
    Subforums(Arc<CrawlNode>),
}

/// A forum being assembled during the crawl.
///
/// The child list receives appends from whichever worker tasks complete the
/// fetches spawned directly under this node, so it is lock-protected. It is
/// frozen into plain [`Forum`] values once the run reaches a terminal state.
struct CrawlNode {
    id: i32,
    parent_id: i32,
    title: String,
    subtitle: String,
    children: Mutex<Vec<Arc<CrawlNode>>>,
}

/// Single-use task that rebuilds the forum hierarchy by crawling the board.
///
/// `run` may be called once per instance; calling it again is a contract
/// violation reported as [`AppError::State`]. A failed or timed-out run stops
/// scheduling new fetches but does not cancel in-flight ones - their results
/// are discarded when they land.
pub struct RefreshTask {
    index_url: String,
    timeout: Duration,
    executed: AtomicBool,
    state: Arc<RunState>,
}

/// State shared between the waiting caller and the worker tasks.
struct RunState {
    fetcher: Arc<dyn PageFetcher>,
    open_jobs: AtomicUsize,
    failed: AtomicBool,
    finished: Notify,
    sections: Mutex<Vec<Arc<CrawlNode>>>,
}

impl RefreshTask {
    /// Create a refresh task rooted at the board's index page.
    pub fn new(fetcher: Arc<dyn PageFetcher>, index_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            index_url: index_url.into(),
            timeout,
            executed: AtomicBool::new(false),
            state: Arc::new(RunState {
                fetcher,
                open_jobs: AtomicUsize::new(0),
                failed: AtomicBool::new(false),
                finished: Notify::new(),
                sections: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Crawl the board and return the parsed section hierarchy.
    ///
    /// Blocks the caller until the run is terminal, at most for the
    /// configured timeout. Exactly one outcome is ever observed: success,
    /// failure, or timeout, whichever triggers first.
    pub async fn run(&self) -> Result<Vec<Forum>> {
        if self.executed.swap(true, Ordering::AcqRel) {
            return Err(AppError::state(
                "refresh task already executed - create a new one",
            ));
        }

        log::info!("Running forum refresh task against {}", self.index_url);
        RunState::schedule(
            &self.state,
            CrawlJob {
                url: self.index_url.clone(),
                kind: JobKind::Index,
            },
        );

        let wait = self.state.finished.notified();
        if tokio::time::timeout(self.timeout, wait).await.is_err() {
            // abandon outstanding jobs in place; their late results are no-ops
            self.state.failed.store(true, Ordering::Release);
            log::warn!(
                "Refresh timed out with {} jobs in flight",
                self.state.open_jobs.load(Ordering::Acquire)
            );
            return Err(AppError::Timeout(self.timeout));
        }

        if self.state.failed.load(Ordering::Acquire) {
            log::warn!("Refresh failed - discarding partial results");
            return Err(AppError::crawl(
                &self.index_url,
                "a page fetch or parse failed during the refresh",
            ));
        }

        let tree = self.state.freeze();
        log::info!(
            "Forums parsed - {} sections found",
            tree.len()
        );
        Ok(tree)
    }
}

impl RunState {
    /// Dispatch a new fetch job, incrementing the outstanding count.
    ///
    /// Ignored once the run has failed, so it can wind down without
    /// generating pointless work. The increment happens before the spawn so
    /// the count can never reach zero while a parent is still scheduling
    /// its children.
    fn schedule(state: &Arc<Self>, job: CrawlJob) {
        if state.failed.load(Ordering::Acquire) {
            return;
        }
        state.open_jobs.fetch_add(1, Ordering::AcqRel);

        let worker = Arc::clone(state);
        tokio::spawn(async move {
            let ok = match Self::process(&worker, &job).await {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Failed to load page {}: {}", job.url, e);
                    false
                }
            };
            worker.finish(ok);
        });
    }

    /// Fetch and parse one page, scheduling fetches for what it links to.
    async fn process(state: &Arc<Self>, job: &CrawlJob) -> Result<()> {
        let body = state.fetcher.fetch(&job.url).await?;
        let base = Url::parse(&job.url)?;
        let document = Html::parse_document(&body);

        match &job.kind {
            JobKind::Index => {
                log::info!("Parsing index page");
                let links = parse::parse_index_sections(&document, &base)?;
                drop(document);
                for link in links {
                    Self::add_forum(state, &state.sections, TOP_LEVEL_PARENT_ID, link);
                }
            }
            JobKind::Subforums(node) => {
                let links = parse::parse_subforum_links(&document, &base);
                log::debug!(
                    "Parsed forum ({}) - found {} subforums",
                    node.title,
                    links.len()
                );
                drop(document);
                for link in links {
                    Self::add_forum(state, &node.children, node.id, link);
                }
            }
        }
        Ok(())
    }

    /// Create a crawl node for a discovered link and schedule its own fetch.
    ///
    /// The node's child list is allocated before the fetch is dispatched, so
    /// concurrently-completing grandchildren always have a safe target to
    /// append to.
    fn add_forum(
        state: &Arc<Self>,
        list: &Mutex<Vec<Arc<CrawlNode>>>,
        parent_id: i32,
        link: ForumLink,
    ) {
        let node = Arc::new(CrawlNode {
            id: link.id,
            parent_id,
            title: link.title,
            subtitle: link.subtitle,
            children: Mutex::new(Vec::new()),
        });
        list.lock().unwrap().push(Arc::clone(&node));

        if !link.url.is_empty() {
            Self::schedule(
                state,
                CrawlJob {
                    url: link.url,
                    kind: JobKind::Subforums(node),
                },
            );
        }
    }

    /// Retire a finished job and fire the terminal signal when warranted.
    ///
    /// Called exactly once per scheduled job. A failed job flags the whole
    /// run and signals immediately, regardless of jobs still in flight;
    /// otherwise the signal fires when the outstanding count reaches zero.
    fn finish(&self, ok: bool) {
        let remaining = self.open_jobs.fetch_sub(1, Ordering::AcqRel) - 1;
        if !ok {
            self.failed.store(true, Ordering::Release);
            self.finished.notify_one();
            return;
        }
        if remaining == 0 {
            self.finished.notify_one();
        }
    }

    /// Snapshot the working set into plain, independently owned forums.
    fn freeze(&self) -> Vec<Forum> {
        let sections = self.sections.lock().unwrap();
        sections
            .iter()
            .map(|node| Self::freeze_node(node, ForumKind::Section))
            .collect()
    }

    fn freeze_node(node: &CrawlNode, kind: ForumKind) -> Forum {
        let mut forum = Forum::new(node.id, node.parent_id, node.title.clone(), node.subtitle.clone());
        forum.kind = kind;
        let children = node.children.lock().unwrap();
        forum.subforums = children
            .iter()
            .map(|child| Self::freeze_node(child, ForumKind::Forum))
            .collect();
        forum
    }
}
