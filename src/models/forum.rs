// src/models/forum.rs

//! Forum hierarchy node.

use serde::{Deserialize, Serialize};

/// Parent ID marking the root of the hierarchy - any forum with this
/// parent ID is a top-level entry.
pub const TOP_LEVEL_PARENT_ID: i32 = 0;

/// Synthetic ID for the bookmarks shortcut stored alongside the crawled
/// forums. Negative so it can never collide with a real forum ID.
pub const BOOKMARKS_ID: i32 = -1;

/// What a catalog entry represents, mainly so list consumers can format
/// entries differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForumKind {
    /// A top-level category heading (Main, Discussion etc.) - not navigable
    Section,
    /// A regular forum or subforum
    Forum,
    /// The user's bookmarks shortcut
    Bookmarks,
}

/// One entry in the forum hierarchy.
///
/// Subforums are kept in discovery/display order; every transformation in
/// [`crate::structure`] preserves that order. Projections always copy nodes,
/// so mutating one projection never affects another or the source tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forum {
    /// Unique forum ID (from the `forumid` url parameter)
    pub id: i32,

    /// ID of the containing forum, or [`TOP_LEVEL_PARENT_ID`] for roots
    pub parent_id: i32,

    /// Display title
    pub title: String,

    /// Display subtitle (may be empty)
    #[serde(default)]
    pub subtitle: String,

    /// Optional tag image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_url: Option<String>,

    /// Entry kind, assigned when loading from storage
    #[serde(default)]
    pub kind: ForumKind,

    /// Child forums in display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subforums: Vec<Forum>,
}

impl Default for ForumKind {
    fn default() -> Self {
        ForumKind::Forum
    }
}

impl Forum {
    /// Create a forum with no subforums, tag or special kind.
    pub fn new(id: i32, parent_id: i32, title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            title: title.into(),
            subtitle: subtitle.into(),
            tag_url: None,
            kind: ForumKind::Forum,
            subforums: Vec::new(),
        }
    }

    /// Copy this forum's own fields with a freshly allocated, empty
    /// subforum list.
    pub fn detached_copy(&self) -> Self {
        Self {
            id: self.id,
            parent_id: self.parent_id,
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            tag_url: self.tag_url.clone(),
            kind: self.kind,
            subforums: Vec::new(),
        }
    }

    /// Total number of nodes in this forum's subtree, itself included.
    pub fn subtree_len(&self) -> usize {
        1 + self.subforums.iter().map(Forum::subtree_len).sum::<usize>()
    }
}
