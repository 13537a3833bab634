// src/models/record.rs

//! Storage-facing flat forum record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Forum;

/// The flat shape a forum is persisted as.
///
/// `index` is the record's position within the last successful rebuild and is
/// what reconstructs display order on load; the hierarchy itself is recovered
/// from `parent_id` by [`crate::structure::ForumStructure::build_from_ordered_list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumRecord {
    /// Position in the stored set, in display order
    pub index: usize,

    /// Unique forum ID
    pub id: i32,

    /// Containing forum ID, or the top-level sentinel
    pub parent_id: i32,

    /// Display title
    pub title: String,

    /// Display subtitle (may be empty)
    #[serde(default)]
    pub subtitle: String,

    /// Optional tag image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_url: Option<String>,

    /// When the record set containing this record was written
    pub updated_at: DateTime<Utc>,
}

impl ForumRecord {
    /// Flatten a forum's own fields into a record at the given position.
    pub fn from_forum(index: usize, forum: &Forum, updated_at: DateTime<Utc>) -> Self {
        Self {
            index,
            id: forum.id,
            parent_id: forum.parent_id,
            title: forum.title.clone(),
            subtitle: forum.subtitle.clone(),
            tag_url: forum.tag_url.clone(),
            updated_at,
        }
    }

    /// Rebuild a childless forum node from this record.
    ///
    /// The kind is left at its default; the repository reassigns kinds when
    /// loading a full record set.
    pub fn to_forum(&self) -> Forum {
        let mut forum = Forum::new(self.id, self.parent_id, self.title.clone(), self.subtitle.clone());
        forum.tag_url = self.tag_url.clone();
        forum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TOP_LEVEL_PARENT_ID;

    #[test]
    fn test_round_trip_preserves_fields() {
        let mut forum = Forum::new(12, TOP_LEVEL_PARENT_ID, "General", "the general forum");
        forum.tag_url = Some("tags/general.png".to_string());

        let record = ForumRecord::from_forum(3, &forum, Utc::now());
        assert_eq!(record.index, 3);
        assert_eq!(record.id, 12);

        let rebuilt = record.to_forum();
        assert_eq!(rebuilt.id, forum.id);
        assert_eq!(rebuilt.parent_id, forum.parent_id);
        assert_eq!(rebuilt.title, forum.title);
        assert_eq!(rebuilt.subtitle, forum.subtitle);
        assert_eq!(rebuilt.tag_url, forum.tag_url);
        assert!(rebuilt.subforums.is_empty());
    }
}
