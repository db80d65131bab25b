use std::ops::Range;

use crate::card::CardState;
use crate::config::FeedConfig;
use crate::fixture::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Left,
    Right,
}

/// Horizontal snap scroller. The offset is measured in columns and is
/// always a whole number of steps.
#[derive(Debug, Clone)]
pub struct Scroller {
    step: u16,
    card_width: u16,
    count: usize,
    offset: u32,
    viewport: u16,
}

impl Scroller {
    pub fn new(cfg: &FeedConfig, count: usize) -> Self {
        Self {
            step: cfg.scroll_step(),
            card_width: cfg.card_width.max(1),
            count,
            offset: 0,
            viewport: 0,
        }
    }

    pub fn step(&self) -> u16 {
        self.step
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn set_viewport(&mut self, width: u16) {
        self.viewport = width;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Total row width: every card plus the gaps between them.
    pub fn content_width(&self) -> u32 {
        if self.count == 0 {
            return 0;
        }
        (self.count as u32 - 1) * self.step as u32 + self.card_width as u32
    }

    /// Largest snapped offset that still reaches the last card.
    pub fn max_offset(&self) -> u32 {
        let overflow = self.content_width().saturating_sub(self.viewport as u32);
        let step = self.step as u32;
        overflow.div_ceil(step) * step
    }

    pub fn scroll(&mut self, direction: ScrollDirection) -> bool {
        let before = self.offset;
        let step = self.step as u32;
        self.offset = match direction {
            ScrollDirection::Left => self.offset.saturating_sub(step),
            ScrollDirection::Right => (self.offset + step).min(self.max_offset()),
        };
        before != self.offset
    }

    pub fn scroll_left(&mut self) -> bool {
        self.scroll(ScrollDirection::Left)
    }

    pub fn scroll_right(&mut self) -> bool {
        self.scroll(ScrollDirection::Right)
    }

    pub fn can_scroll(&self, direction: ScrollDirection) -> bool {
        match direction {
            ScrollDirection::Left => self.offset > 0,
            ScrollDirection::Right => self.offset < self.max_offset(),
        }
    }

    /// Left column of card `index` in content coordinates.
    pub fn card_start(&self, index: usize) -> u32 {
        index as u32 * self.step as u32
    }

    /// Cards intersecting the viewport, including partially visible ones.
    pub fn visible(&self) -> Range<usize> {
        if self.count == 0 || self.viewport == 0 {
            return 0..0;
        }
        let step = self.step as u32;
        let first = (self.offset / step) as usize;
        let end_col = self.offset + self.viewport as u32;
        let last = end_col.div_ceil(step) as usize;
        first.min(self.count)..last.min(self.count)
    }

    /// Snaps so that card `index` is fully in view when it fits.
    pub fn reveal(&mut self, index: usize) {
        let step = self.step as u32;
        let start = self.card_start(index);
        let end = start + self.card_width as u32;
        if start < self.offset {
            self.offset = start;
        } else if end > self.offset + self.viewport as u32 {
            let needed = end.saturating_sub(self.viewport as u32);
            self.offset = (needed.div_ceil(step) * step).min(start);
        }
        self.offset = self.offset.min(self.max_offset());
    }
}

/// A mounted card: the post and its UI-local state.
pub struct MountedCard {
    pub post: Post,
    pub state: CardState,
}

/// The feed section: a capped list of mounted cards and their scroller.
pub struct FeedView {
    pub title: String,
    cards: Vec<MountedCard>,
    scroller: Scroller,
    selected: usize,
}

impl FeedView {
    pub fn new(title: impl Into<String>, posts: Vec<Post>, cfg: &FeedConfig) -> Self {
        let cards: Vec<MountedCard> = posts
            .into_iter()
            .take(cfg.max_posts)
            .map(|post| MountedCard {
                post,
                state: CardState::new(),
            })
            .collect();
        let scroller = Scroller::new(cfg, cards.len());
        Self {
            title: title.into(),
            cards,
            scroller,
            selected: 0,
        }
    }

    pub fn cards(&self) -> &[MountedCard] {
        &self.cards
    }

    pub fn cards_mut(&mut self) -> &mut [MountedCard] {
        &mut self.cards
    }

    pub fn card_mut(&mut self, index: usize) -> Option<&mut MountedCard> {
        self.cards.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn scroller(&self) -> &Scroller {
        &self.scroller
    }

    pub fn scroller_mut(&mut self) -> &mut Scroller {
        &mut self.scroller
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_card(&self) -> Option<&MountedCard> {
        self.cards.get(self.selected)
    }

    pub fn selected_card_mut(&mut self) -> Option<&mut MountedCard> {
        self.cards.get_mut(self.selected)
    }

    pub fn select(&mut self, index: usize) {
        if self.cards.is_empty() {
            return;
        }
        let index = index.min(self.cards.len() - 1);
        if index != self.selected {
            if let Some(card) = self.cards.get_mut(self.selected) {
                card.state.close_menu();
            }
            self.selected = index;
        }
        self.scroller.reveal(index);
    }

    pub fn select_next(&mut self) {
        self.select(self.selected.saturating_add(1));
    }

    pub fn select_previous(&mut self) {
        self.select(self.selected.saturating_sub(1));
    }

    /// Scroll by one step. The selection follows when it leaves the view.
    pub fn scroll(&mut self, direction: ScrollDirection) -> bool {
        let moved = self.scroller.scroll(direction);
        if moved {
            let visible = self.scroller.visible();
            if !visible.contains(&self.selected) && !visible.is_empty() {
                let target = match direction {
                    ScrollDirection::Left => visible.end - 1,
                    ScrollDirection::Right => visible.start,
                };
                if let Some(card) = self.cards.get_mut(self.selected) {
                    card.state.close_menu();
                }
                self.selected = target;
            }
        }
        moved
    }

    /// Lets every card drop subscriptions closed by an outside click.
    pub fn sync_menus(&mut self) -> bool {
        let mut changed = false;
        for card in &mut self.cards {
            changed |= card.state.menu_mut().sync();
        }
        changed
    }

    pub fn open_menu_index(&self) -> Option<usize> {
        self.cards.iter().position(|card| card.state.is_menu_open())
    }
}
