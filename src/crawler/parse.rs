// src/crawler/parse.rs

//! Board page parsing.
//!
//! Extracts section links from the index page and subforum links from
//! section/forum pages using the board's known markup. A link that doesn't
//! resolve to a forum ID is logged and dropped; only the index page yielding
//! zero sections is fatal.

use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::utils::{resolve_url, url::extract_forum_id};

/// A forum link discovered on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ForumLink {
    /// Forum ID extracted from the link's url
    pub id: i32,
    /// Absolute url of the forum's own page
    pub url: String,
    /// Link text
    pub title: String,
    /// Subtitle text (subforum rows only, may be empty)
    pub subtitle: String,
}

/// Parse the section links on the board's index page (Main, Discussion etc).
///
/// Zero section elements means the markup changed or the wrong page came
/// back, which fails the whole refresh. Individual links without a forum ID
/// are dropped with a diagnostic.
pub fn parse_index_sections(document: &Html, base: &Url) -> Result<Vec<ForumLink>> {
    let section_selector = Selector::parse(".category").unwrap();
    let link_selector = Selector::parse("a").unwrap();

    let sections: Vec<_> = document.select(&section_selector).collect();
    if sections.is_empty() {
        return Err(AppError::parse(
            base.as_str(),
            "unable to parse index page - 0 section links found",
        ));
    }

    let mut links = Vec::new();
    for section in sections {
        let Some(anchor) = section.select(&link_selector).next() else {
            log::warn!("Section element without a link on {}", base);
            continue;
        };
        let title: String = anchor.text().collect::<String>().trim().to_string();
        let href = anchor.value().attr("href").unwrap_or("");
        let url = resolve_url(base, href);

        match extract_forum_id(&url) {
            Some(id) => links.push(ForumLink {
                id,
                url,
                title,
                subtitle: String::new(),
            }),
            None => log::warn!("Unable to find forum ID in url ({})", url),
        }
    }
    Ok(links)
}

/// Parse a section or forum page for subforum links.
///
/// Subforums are optional; a page without them just yields an empty list.
pub fn parse_subforum_links(document: &Html, base: &Url) -> Vec<ForumLink> {
    let row_selector = Selector::parse("tr.subforum").unwrap();
    let link_selector = Selector::parse("a").unwrap();
    let subtitle_selector = Selector::parse("dd").unwrap();

    let mut links = Vec::new();
    for row in document.select(&row_selector) {
        let Some(anchor) = row.select(&link_selector).next() else {
            log::warn!("Subforum row without a link on {}", base);
            continue;
        };
        let title: String = anchor.text().collect::<String>().trim().to_string();
        let href = anchor.value().attr("href").unwrap_or("");
        let url = resolve_url(base, href);

        let mut subtitle: String = row
            .select(&subtitle_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        // strip leading junk on subtitles
        const GARBAGE: &str = "- ";
        if let Some(stripped) = subtitle.strip_prefix(GARBAGE) {
            subtitle = stripped.to_string();
        }

        match extract_forum_id(&url) {
            Some(id) => links.push(ForumLink {
                id,
                url,
                title,
                subtitle,
            }),
            None => log::warn!("Unable to find forum ID in url ({})", url),
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://board.example.com/index.php").unwrap()
    }

    #[test]
    fn test_parse_index_sections() {
        let html = Html::parse_document(
            r#"<html><body>
                <div class="category"><a href="forumdisplay.php?forumid=48">Main</a></div>
                <div class="category"><a href="forumdisplay.php?forumid=51">Discussion</a></div>
            </body></html>"#,
        );

        let links = parse_index_sections(&html, &base()).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].id, 48);
        assert_eq!(links[0].title, "Main");
        assert_eq!(
            links[0].url,
            "https://board.example.com/forumdisplay.php?forumid=48"
        );
        assert_eq!(links[1].id, 51);
    }

    #[test]
    fn test_parse_index_with_no_sections_is_an_error() {
        let html = Html::parse_document("<html><body><p>maintenance</p></body></html>");
        assert!(parse_index_sections(&html, &base()).is_err());
    }

    #[test]
    fn test_parse_index_drops_links_without_forum_id() {
        let html = Html::parse_document(
            r#"<html><body>
                <div class="category"><a href="forumdisplay.php?forumid=48">Main</a></div>
                <div class="category"><a href="banlist.php">Leper's Colony</a></div>
            </body></html>"#,
        );

        let links = parse_index_sections(&html, &base()).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, 48);
    }

    #[test]
    fn test_parse_subforum_links() {
        let html = Html::parse_document(
            r#"<html><body><table>
                <tr class="subforum">
                    <td><a href="forumdisplay.php?forumid=273">GBS</a><dd>- General Bullshit</dd></td>
                </tr>
                <tr class="subforum">
                    <td><a href="/forumdisplay.php?forumid=44">Games</a><dd>Games chat</dd></td>
                </tr>
            </table></body></html>"#,
        );

        let links = parse_subforum_links(&html, &base());
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].id, 273);
        assert_eq!(links[0].title, "GBS");
        // the "- " prefix is stripped
        assert_eq!(links[0].subtitle, "General Bullshit");
        assert_eq!(links[1].subtitle, "Games chat");
        assert_eq!(
            links[1].url,
            "https://board.example.com/forumdisplay.php?forumid=44"
        );
    }

    #[test]
    fn test_parse_subforums_absent_is_empty() {
        let html = Html::parse_document("<html><body><p>no subforums here</p></body></html>");
        assert!(parse_subforum_links(&html, &base()).is_empty());
    }

    #[test]
    fn test_parse_subforums_drops_unresolvable_rows() {
        let html = Html::parse_document(
            r#"<html><body><table>
                <tr class="subforum"><td><a href="forumdisplay.php?forumid=1">Kept</a></td></tr>
                <tr class="subforum"><td><a href="showthread.php?threadid=9">Dropped</a></td></tr>
            </table></body></html>"#,
        );

        let links = parse_subforum_links(&html, &base());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "Kept");
        assert_eq!(links[0].subtitle, "");
    }
}
