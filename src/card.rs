use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::browser::ItemHandle;
use crate::error::CardError;
use crate::stats::{parse_stats, Stats};

/// One article as listed in the creator-center feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ArticleCard {
    pub title: String,
    /// Unique per article; the dedup and upsert key.
    pub link: String,
    pub description: String,
    /// As displayed, e.g. "发布于 2024-03-01 10:12". Not parsed.
    pub published_time: String,
    pub stats: Stats,
}

/// Structural anchors of the feed markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSelectors {
    pub list_container: String,
    pub card: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_time: String,
    pub stats_fragment: String,
}

impl Default for FeedSelectors {
    fn default() -> Self {
        Self {
            list_container: "div[role='list']".to_string(),
            card: ".CreationManage-CreationCard".to_string(),
            title: ".CreationCardTitle-wrapper".to_string(),
            link: "a.css-959ia8".to_string(),
            description: ".CreationCardContent-text span".to_string(),
            published_time: ".css-zzavo4".to_string(),
            stats_fragment: ".css-150duks div".to_string(),
        }
    }
}

/// Extracts one card. Fails on the first anchor that is missing or unreadable;
/// a card is never returned half filled.
pub fn parse_card<H: ItemHandle>(card: &H, selectors: &FeedSelectors) -> Result<ArticleCard, CardError> {
    let title = read_text(card, &selectors.title)?;
    let link = read_attribute(card, &selectors.link, "href")?;
    let description = read_text(card, &selectors.description)?;
    let published_time = read_text(card, &selectors.published_time)?;
    let stats = read_stats(card, &selectors.stats_fragment)?;

    Ok(ArticleCard {
        title,
        link,
        description,
        published_time,
        stats,
    })
}

fn find_anchor<H: ItemHandle>(card: &H, selector: &str) -> Result<H, CardError> {
    card.query_selector(selector)
        .map_err(|e| CardError::Read {
            selector: selector.to_string(),
            source: e.into(),
        })?
        .ok_or_else(|| CardError::MissingAnchor {
            selector: selector.to_string(),
        })
}

fn read_text<H: ItemHandle>(card: &H, selector: &str) -> Result<String, CardError> {
    find_anchor(card, selector)?
        .inner_text()
        .map_err(|e| CardError::Read {
            selector: selector.to_string(),
            source: e.into(),
        })
}

fn read_attribute<H: ItemHandle>(card: &H, selector: &str, attribute: &str) -> Result<String, CardError> {
    find_anchor(card, selector)?
        .attribute(attribute)
        .map_err(|e| CardError::Read {
            selector: selector.to_string(),
            source: e.into(),
        })?
        .ok_or_else(|| CardError::MissingAttribute {
            selector: selector.to_string(),
            attribute: attribute.to_string(),
        })
}

fn read_stats<H: ItemHandle>(card: &H, selector: &str) -> Result<Stats, CardError> {
    let nodes = card.query_selector_all(selector).map_err(|e| CardError::Read {
        selector: selector.to_string(),
        source: e.into(),
    })?;

    let mut fragments = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        match node.inner_text() {
            Ok(text) => fragments.push(text.trim().to_string()),
            Err(e) => tracing::warn!(index, error = %e, "unreadable stats fragment, skipping"),
        }
    }

    Ok(parse_stats(&fragments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{card_node, FakeNode};

    fn selectors() -> FeedSelectors {
        FeedSelectors::default()
    }

    #[test]
    fn test_parse_full_card() {
        let node = card_node("Rust 所有权", "/p/100", "借用检查器入门", "2024-03-01", &["12", "阅读", "3", "赞同"]);
        let card = parse_card(&node, &selectors()).unwrap();

        assert_eq!(card.title, "Rust 所有权");
        assert_eq!(card.link, "/p/100");
        assert_eq!(card.description, "借用检查器入门");
        assert_eq!(card.published_time, "2024-03-01");
        assert_eq!(card.stats, Stats { reads: 12, upvotes: 3, ..Stats::default() });
    }

    #[test]
    fn test_missing_description_fails_card() {
        let node = card_node("t", "/p/1", "d", "time", &[]).without(&selectors().description);
        let err = parse_card(&node, &selectors()).unwrap_err();
        assert!(matches!(err, CardError::MissingAnchor { ref selector } if *selector == selectors().description));
    }

    #[test]
    fn test_link_without_href_fails_card() {
        let sel = selectors();
        let node = card_node("t", "/p/1", "d", "time", &[])
            .without(&sel.link)
            .with_child(&sel.link, FakeNode::text("阅读全文"));
        let err = parse_card(&node, &sel).unwrap_err();
        assert!(matches!(err, CardError::MissingAttribute { ref attribute, .. } if attribute == "href"));
    }

    #[test]
    fn test_unreadable_title_fails_card() {
        let sel = selectors();
        let node = card_node("t", "/p/1", "d", "time", &[])
            .without(&sel.title)
            .with_child(&sel.title, FakeNode::broken());
        let err = parse_card(&node, &sel).unwrap_err();
        assert!(matches!(err, CardError::Read { .. }));
    }

    #[test]
    fn test_unreadable_stats_fragment_is_skipped() {
        let sel = selectors();
        let node = card_node("t", "/p/1", "d", "time", &["5"])
            .with_child(&sel.stats_fragment, FakeNode::broken())
            .with_child(&sel.stats_fragment, FakeNode::text("收藏"));
        let card = parse_card(&node, &sel).unwrap();
        assert_eq!(card.stats.bookmarks, 5);
    }

    #[test]
    fn test_missing_stats_region_yields_zero_stats() {
        let node = card_node("t", "/p/1", "d", "time", &[]);
        let card = parse_card(&node, &selectors()).unwrap();
        assert_eq!(card.stats, Stats::default());
    }

    #[test]
    fn test_reparse_is_identical() {
        let node = card_node("t", "/p/9", "d", "time", &["1", "喜欢", "2", "评论"]);
        let first = parse_card(&node, &selectors()).unwrap();
        let second = parse_card(&node, &selectors()).unwrap();
        assert_eq!(first, second);
        assert_eq!(serde_json::to_vec(&first).unwrap(), serde_json::to_vec(&second).unwrap());
    }
}
