//! Subscription filters and the options that build them.

use landscape_types::{BoardId, LandscapeEvent};
use std::collections::HashSet;

/// Option accepted by [`crate::SubscriptionManager::subscribe`].
///
/// Options compose: boards from several options accumulate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOption {
    /// Restrict the subscription to these boards.
    Boards(Vec<BoardId>),
}

/// Only deliver events concerning the given boards.
pub fn with_boards<I, B>(boards: I) -> SubscriptionOption
where
    I: IntoIterator<Item = B>,
    B: Into<BoardId>,
{
    SubscriptionOption::Boards(boards.into_iter().map(Into::into).collect())
}

/// Boards a subscription is interested in. Empty means every board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    boards: HashSet<BoardId>,
}

impl SubscriptionFilter {
    /// Accept every event.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept events for the given boards only.
    pub fn boards<I, B>(boards: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<BoardId>,
    {
        Self {
            boards: boards.into_iter().map(Into::into).collect(),
        }
    }

    /// Fold options into a filter.
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = SubscriptionOption>,
    {
        let mut filter = Self::default();
        for option in options {
            filter.apply(option);
        }
        filter
    }

    pub fn apply(&mut self, option: SubscriptionOption) {
        match option {
            SubscriptionOption::Boards(boards) => self.boards.extend(boards),
        }
    }

    #[must_use]
    pub fn matches(&self, event: &LandscapeEvent) -> bool {
        self.boards.is_empty() || self.boards.contains(event.board_id())
    }

    /// True when the filter accepts every board.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn board_ids(&self) -> impl Iterator<Item = &BoardId> {
        self.boards.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landscape_types::{PeerId, PEER_ID_LEN};

    fn event(board: &str) -> LandscapeEvent {
        LandscapeEvent::SourceDiscovered {
            board: BoardId::from(board),
            peer: PeerId::from_digest([1; PEER_ID_LEN]),
        }
    }

    #[test]
    fn test_filter_all() {
        let filter = SubscriptionFilter::all();
        assert!(filter.is_all());
        assert!(filter.matches(&event("P1")));
        assert!(filter.matches(&event("anything")));
    }

    #[test]
    fn test_filter_by_board() {
        let filter = SubscriptionFilter::boards(["P2"]);
        assert!(!filter.matches(&event("P1")));
        assert!(filter.matches(&event("P2")));
    }

    #[test]
    fn test_options_accumulate() {
        let filter =
            SubscriptionFilter::from_options([with_boards(["P1"]), with_boards(["P2", "P1"])]);
        assert!(filter.matches(&event("P1")));
        assert!(filter.matches(&event("P2")));
        assert!(!filter.matches(&event("P3")));
        assert_eq!(filter.board_ids().count(), 2);
    }

    #[test]
    fn test_empty_option_keeps_everything() {
        let filter = SubscriptionFilter::from_options([with_boards(Vec::<BoardId>::new())]);
        assert!(filter.is_all());
        assert!(filter.matches(&event("P9")));
    }
}
