use std::fmt;

use {
    relay_common::{ChatId, TopicId},
    serde::{Deserialize, Serialize},
};

/// A relay source or destination: a chat, optionally narrowed to one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub chat_id: ChatId,
    /// `None` addresses the whole chat.
    #[serde(default)]
    pub topic_id: Option<TopicId>,
}

impl Route {
    pub fn chat(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            topic_id: None,
        }
    }

    pub fn topic(chat_id: ChatId, topic_id: TopicId) -> Self {
        Self {
            chat_id,
            topic_id: Some(topic_id),
        }
    }

    /// Whether a message in `chat_id` (already normalized) and `thread_id`
    /// falls under this source route.
    pub fn matches(&self, chat_id: ChatId, thread_id: Option<TopicId>) -> bool {
        self.chat_id == chat_id && self.topic_id.is_none_or(|t| Some(t) == thread_id)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.topic_id {
            Some(topic) => write!(f, "{} (topic {topic})", self.chat_id),
            None => write!(f, "{}", self.chat_id),
        }
    }
}

/// The complete routing table. Order is preserved and duplicates are legal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    pub sources: Vec<Route>,
    pub dests: Vec<Route>,
}

impl RoutingTable {
    /// Sources that match a message in `chat_id` (normalized) and
    /// `thread_id`, in table order.
    pub fn matching_sources(
        &self,
        chat_id: ChatId,
        thread_id: Option<TopicId>,
    ) -> impl Iterator<Item = &Route> {
        self.sources
            .iter()
            .filter(move |s| s.matches(chat_id, thread_id))
    }
}

/// Strip the `-100` prefix Telegram puts on channel and supergroup ids.
///
/// `-1001234567` becomes `1234567`. Any other id is returned unchanged, so the
/// function is idempotent.
pub fn normalize_chat_id(chat_id: ChatId) -> ChatId {
    let text = chat_id.to_string();
    match text.strip_prefix("-100") {
        Some(rest) if !rest.is_empty() => rest.parse().unwrap_or(chat_id),
        _ => chat_id,
    }
}

/// Remove every route with `chat_id`, regardless of topic. Returns the count.
pub(crate) fn remove_chat(routes: &mut Vec<Route>, chat_id: ChatId) -> usize {
    let before = routes.len();
    routes.retain(|r| r.chat_id != chat_id);
    before - routes.len()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(-1001234567, 1234567)]
    #[case(1234567, 1234567)]
    #[case(-42, -42)]
    #[case(-100, -100)]
    #[case(-1000042, 42)]
    #[case(0, 0)]
    fn normalize(#[case] input: ChatId, #[case] expected: ChatId) {
        assert_eq!(normalize_chat_id(input), expected);
    }

    #[rstest]
    #[case(-1001234567)]
    #[case(-1001001001)]
    #[case(1001)]
    #[case(-5)]
    #[case(i64::MIN)]
    fn normalize_is_idempotent(#[case] input: ChatId) {
        let once = normalize_chat_id(input);
        assert_eq!(normalize_chat_id(once), once);
    }

    #[test]
    fn whole_chat_source_matches_any_thread() {
        let route = Route::chat(1001);
        assert!(route.matches(1001, None));
        assert!(route.matches(1001, Some(7)));
        assert!(!route.matches(1002, None));
    }

    #[test]
    fn topic_source_matches_only_its_thread() {
        let route = Route::topic(1001, 5);
        assert!(route.matches(1001, Some(5)));
        assert!(!route.matches(1001, Some(7)));
        assert!(!route.matches(1001, None));
    }

    #[test]
    fn canonical_route_matches_prefixed_inbound_id() {
        let route = Route::chat(1234567);
        assert!(route.matches(normalize_chat_id(-1001234567), None));
    }

    #[test]
    fn matching_sources_keeps_duplicates() {
        let table = RoutingTable {
            sources: vec![Route::chat(2002), Route::chat(2002), Route::chat(9)],
            dests: vec![Route::chat(3003)],
        };
        assert_eq!(table.matching_sources(2002, None).count(), 2);
    }

    #[test]
    fn remove_chat_ignores_topic() {
        let mut routes = vec![
            Route::chat(10),
            Route::topic(10, 1),
            Route::topic(11, 1),
            Route::topic(10, 2),
        ];
        assert_eq!(remove_chat(&mut routes, 10), 3);
        assert_eq!(routes, vec![Route::topic(11, 1)]);
        assert_eq!(remove_chat(&mut routes, 99), 0);
        assert_eq!(routes.len(), 1);
    }

    #[test]
    fn display_formats() {
        assert_eq!(Route::chat(10).to_string(), "10");
        assert_eq!(Route::topic(20, 99).to_string(), "20 (topic 99)");
    }

    #[test]
    fn deserialize_legacy_layout() {
        let json = r#"{
            "sources": [{"chat_id": 1001, "topic_id": null}, {"chat_id": 1002}],
            "dests": [{"chat_id": -1003003, "topic_id": 5}]
        }"#;
        let table: RoutingTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.sources, vec![Route::chat(1001), Route::chat(1002)]);
        assert_eq!(table.dests, vec![Route::topic(-1003003, 5)]);
    }

    #[test]
    fn deserialize_rejects_missing_dests() {
        let json = r#"{"sources": []}"#;
        assert!(serde_json::from_str::<RoutingTable>(json).is_err());
    }
}
