use crate::config::CardConfig;
use crate::dropdown::{Dropdown, PointerHub};
use crate::fixture::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Share,
    CopyLink,
    NotInterested,
    Report,
}

impl CardAction {
    pub const ALL: [CardAction; 4] = [
        CardAction::Share,
        CardAction::CopyLink,
        CardAction::NotInterested,
        CardAction::Report,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CardAction::Share => "Compartilhar",
            CardAction::CopyLink => "Copiar link",
            CardAction::NotInterested => "Não tenho interesse",
            CardAction::Report => "Denunciar publicação",
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, CardAction::Report)
    }
}

/// Tags split into the chips shown and the size of the "+K" remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagStrip<'a> {
    pub shown: &'a [String],
    pub hidden: usize,
}

impl TagStrip<'_> {
    pub fn indicator(&self) -> Option<String> {
        (self.hidden > 0).then(|| format!("+{}", self.hidden))
    }
}

pub fn tag_strip(tags: &[String], cap: usize) -> TagStrip<'_> {
    let shown = &tags[..tags.len().min(cap)];
    TagStrip {
        shown,
        hidden: tags.len() - shown.len(),
    }
}

/// Whether the "Ler mais" toggle is offered. Counted in characters.
pub fn is_long_text(content: &str, threshold: usize) -> bool {
    content.chars().count() > threshold
}

/// Per-card UI state. Lives as long as the card is mounted.
#[derive(Default)]
pub struct CardState {
    bookmarked: bool,
    expanded: bool,
    menu: Dropdown,
    menu_selected: usize,
    focused_tile: usize,
}

impl CardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bookmarked(&self) -> bool {
        self.bookmarked
    }

    pub fn toggle_bookmark(&mut self) -> bool {
        self.bookmarked = !self.bookmarked;
        self.bookmarked
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Flips the expanded view. Ignored for short posts, which have no
    /// toggle to press.
    pub fn toggle_expanded(&mut self, post: &Post, cfg: &CardConfig) -> bool {
        if is_long_text(&post.content, cfg.truncate_threshold) {
            self.expanded = !self.expanded;
        }
        self.expanded
    }

    pub fn menu(&self) -> &Dropdown {
        &self.menu
    }

    pub fn menu_mut(&mut self) -> &mut Dropdown {
        &mut self.menu
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu.is_open()
    }

    pub fn toggle_menu(&mut self, hub: &PointerHub) {
        self.menu.toggle(hub);
        self.menu_selected = 0;
    }

    pub fn close_menu(&mut self) {
        self.menu.close();
    }

    pub fn menu_selected(&self) -> usize {
        self.menu_selected
    }

    pub fn move_menu_selection(&mut self, delta: isize) {
        let len = CardAction::ALL.len() as isize;
        let next = (self.menu_selected as isize + delta).rem_euclid(len);
        self.menu_selected = next as usize;
    }

    /// Selecting an action always closes the menu.
    pub fn select_action(&mut self, index: usize) -> Option<CardAction> {
        let action = CardAction::ALL.get(index).copied()?;
        self.menu.close();
        Some(action)
    }

    pub fn select_highlighted(&mut self) -> Option<CardAction> {
        self.select_action(self.menu_selected)
    }

    pub fn focused_tile(&self) -> usize {
        self.focused_tile
    }

    /// Cycles keyboard focus over the collage's activatable tiles.
    pub fn cycle_tile(&mut self, tiles: &[usize]) -> Option<usize> {
        if tiles.is_empty() {
            return None;
        }
        let position = tiles
            .iter()
            .position(|index| *index == self.focused_tile)
            .map(|pos| (pos + 1) % tiles.len())
            .unwrap_or(0);
        self.focused_tile = tiles[position];
        Some(self.focused_tile)
    }

    pub fn focus_tile(&mut self, index: usize) {
        self.focused_tile = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Feed;

    fn tags(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("tag{i}")).collect()
    }

    #[test]
    fn tag_overflow_shows_cap_and_indicator() {
        let all = tags(7);
        let strip = tag_strip(&all, 5);
        assert_eq!(strip.shown.len(), 5);
        assert_eq!(strip.indicator().as_deref(), Some("+2"));
    }

    #[test]
    fn tags_under_cap_have_no_indicator() {
        let all = tags(3);
        let strip = tag_strip(&all, 5);
        assert_eq!(strip.shown.len(), 3);
        assert_eq!(strip.indicator(), None);
        assert_eq!(tag_strip(&[], 5).shown.len(), 0);
    }

    #[test]
    fn bookmark_toggle_is_idempotent_in_pairs() {
        let mut card = CardState::new();
        let before = card.is_bookmarked();
        card.toggle_bookmark();
        card.toggle_bookmark();
        assert_eq!(card.is_bookmarked(), before);
    }

    #[test]
    fn expand_toggle_returns_to_clamped() {
        let feed = Feed::embedded().unwrap();
        let long = &feed.posts()[0];
        let cfg = CardConfig::default();
        assert!(is_long_text(&long.content, cfg.truncate_threshold));

        let mut card = CardState::new();
        assert!(card.toggle_expanded(long, &cfg));
        assert!(!card.toggle_expanded(long, &cfg));
    }

    #[test]
    fn short_posts_never_expand() {
        let feed = Feed::embedded().unwrap();
        let short = &feed.posts()[2];
        let cfg = CardConfig::default();
        let mut card = CardState::new();
        assert!(!card.toggle_expanded(short, &cfg));
    }

    #[test]
    fn threshold_counts_characters_not_bytes() {
        let text = "ã".repeat(130);
        assert!(!is_long_text(&text, 130));
        assert!(is_long_text(&format!("{text}a"), 130));
    }

    #[test]
    fn selecting_action_closes_menu() {
        let hub = PointerHub::new();
        let mut card = CardState::new();
        card.toggle_menu(&hub);
        assert!(card.is_menu_open());
        card.move_menu_selection(1);
        assert_eq!(card.select_highlighted(), Some(CardAction::CopyLink));
        assert!(!card.is_menu_open());
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn menu_selection_wraps() {
        let mut card = CardState::new();
        card.move_menu_selection(-1);
        assert_eq!(card.menu_selected(), CardAction::ALL.len() - 1);
        card.move_menu_selection(1);
        assert_eq!(card.menu_selected(), 0);
    }

    #[test]
    fn tile_focus_cycles_over_real_tiles() {
        let mut card = CardState::new();
        let tiles = [0, 1, 2];
        assert_eq!(card.cycle_tile(&tiles), Some(1));
        assert_eq!(card.cycle_tile(&tiles), Some(2));
        assert_eq!(card.cycle_tile(&tiles), Some(0));
        assert_eq!(card.cycle_tile(&[]), None);
    }
}
