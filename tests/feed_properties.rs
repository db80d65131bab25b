use thoth::card::{self, CardState};
use thoth::collage::{Cell, Collage};
use thoth::config::{CardConfig, FeedConfig};
use thoth::dropdown::{Point, PointerHub};
use thoth::feed::{FeedView, ScrollDirection};
use thoth::fixture::Feed;
use ratatui::layout::Rect;

fn urls(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("https://img.example/{i}.jpg"))
        .collect()
}

fn grid_cells(count: usize) -> [Cell; 4] {
    match Collage::plan(&urls(count)) {
        Collage::Grid { cells } => cells,
        other => panic!("expected grid for {count}, got {other:?}"),
    }
}

#[test]
fn collage_shapes_by_count() {
    assert_eq!(Collage::plan(&urls(0)), Collage::Empty);
    assert_eq!(Collage::plan(&urls(1)), Collage::Single);

    let two = grid_cells(2);
    assert_eq!(two[0], Cell::Image { index: 1, badge: None });
    assert_eq!(two[1..].iter().filter(|c| **c == Cell::Placeholder).count(), 3);

    let three = grid_cells(3);
    assert_eq!(three.iter().filter(|c| **c == Cell::Placeholder).count(), 2);

    let five = grid_cells(5);
    assert!(five.iter().all(|c| matches!(c, Cell::Image { badge: None, .. })));

    let seven = grid_cells(7);
    assert_eq!(seven[3], Cell::Image { index: 4, badge: Some(3) });
}

#[test]
fn modal_pages_the_full_sequence() {
    let images = urls(7);
    let collage = Collage::plan(&images);
    assert!(collage.activate(&images, 6).is_none(), "hidden images are not tiles");

    let mut modal = collage.activate(&images, 4).unwrap();
    assert_eq!(modal.len(), 7);
    assert!(modal.next());
    assert!(modal.next());
    assert_eq!(modal.current(), Some("https://img.example/6.jpg"));
    assert!(!modal.next());
    assert_eq!(modal.current_index(), 6);
}

#[test]
fn placeholders_do_not_open_anything() {
    let images = urls(2);
    let collage = Collage::plan(&images);
    assert!(collage.activate(&images, 2).is_none());
    assert_eq!(collage.tiles(), vec![0, 1]);
}

#[test]
fn tags_capped_with_indicator() {
    let tags: Vec<String> = (0..7).map(|i| format!("t{i}")).collect();
    let strip = card::tag_strip(&tags, 5);
    assert_eq!(strip.shown.len(), 5);
    assert_eq!(strip.indicator().as_deref(), Some("+2"));
    assert!(card::tag_strip(&tags[..5], 5).indicator().is_none());
}

#[test]
fn expansion_only_for_long_text() {
    let cfg = CardConfig::default();
    let feed = Feed::embedded().unwrap();
    for post in feed.posts() {
        let mut state = CardState::new();
        let long = card::is_long_text(&post.content, cfg.truncate_threshold);
        state.toggle_expanded(post, &cfg);
        assert_eq!(state.is_expanded(), long, "post {}", post.id);
    }
}

#[test]
fn scrolling_snaps_to_card_steps() {
    let cfg = FeedConfig::default();
    let feed = Feed::embedded().unwrap();
    let mut view = FeedView::new("Feed", feed.take(10), &cfg);
    view.scroller_mut().set_viewport(cfg.card_width + 10);

    assert!(!view.scroller().can_scroll(ScrollDirection::Left));
    assert!(view.scroll(ScrollDirection::Right));
    let step = u32::from(view.scroller().step());
    assert_eq!(view.scroller().offset() % step, 0);

    while view.scroll(ScrollDirection::Right) {}
    let end = view.scroller().offset();
    assert_eq!(end, view.scroller().max_offset());
    assert!(!view.scroller().can_scroll(ScrollDirection::Right));
    assert!(view.scroll(ScrollDirection::Left));
    assert_eq!(view.scroller().offset(), end - step);
}

#[test]
fn outside_press_closes_card_menu() {
    let cfg = FeedConfig::default();
    let hub = PointerHub::new();
    let mut view = FeedView::new("Feed", Feed::embedded().unwrap().take(2), &cfg);

    let card = view.card_mut(0).unwrap();
    card.state.toggle_menu(&hub);
    card.state.menu().set_regions(vec![Rect::new(0, 0, 10, 5)]);

    hub.dispatch(Point::new(3, 3));
    view.sync_menus();
    assert_eq!(view.open_menu_index(), Some(0));

    hub.dispatch(Point::new(50, 20));
    view.sync_menus();
    assert_eq!(view.open_menu_index(), None);
    assert_eq!(hub.listener_count(), 0);
}
