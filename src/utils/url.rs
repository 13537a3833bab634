// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Query parameter carrying a forum's ID on board pages.
const FORUM_ID_KEY: &str = "forumid";

/// Extract a forum ID from a board page URL.
///
/// Board links carry their target in the `forumid` query parameter
/// (e.g. `forumdisplay.php?forumid=273`). Returns `None` when the parameter
/// is missing or not an integer; callers drop such links rather than failing
/// the whole crawl.
pub fn extract_forum_id(url: &str) -> Option<i32> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == FORUM_ID_KEY)
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_forum_id() {
        assert_eq!(
            extract_forum_id("https://board.example.com/forumdisplay.php?forumid=273"),
            Some(273)
        );
        assert_eq!(
            extract_forum_id("https://board.example.com/forumdisplay.php?s=&forumid=1&pagenumber=2"),
            Some(1)
        );
    }

    #[test]
    fn test_extract_forum_id_missing_key() {
        assert_eq!(
            extract_forum_id("https://board.example.com/showthread.php?threadid=99"),
            None
        );
    }

    #[test]
    fn test_extract_forum_id_not_numeric() {
        assert_eq!(
            extract_forum_id("https://board.example.com/forumdisplay.php?forumid=gbs"),
            None
        );
    }

    #[test]
    fn test_extract_forum_id_invalid_url() {
        assert_eq!(extract_forum_id("not a url"), None);
    }
}
