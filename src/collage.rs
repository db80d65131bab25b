//! Adaptive media collage.
//!
//! An ordered image list maps to one of three shapes: nothing, a single
//! tile, or a primary tile beside a 2x2 thumbnail grid. Slot assignment is
//! positional: thumbnail slot `i` (1..=4) always shows `images[i]`.

/// Number of thumbnail cells beside the primary tile.
pub const THUMBNAIL_SLOTS: usize = 4;

/// Collages with more images than this carry an overflow badge.
pub const BADGE_THRESHOLD: usize = THUMBNAIL_SLOTS + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// A real image; `index` points into the post's full image list.
    Image { index: usize, badge: Option<usize> },
    /// Neutral filler for an empty grid cell. Never activatable.
    Placeholder,
}

impl Cell {
    pub fn index(&self) -> Option<usize> {
        match self {
            Cell::Image { index, .. } => Some(*index),
            Cell::Placeholder => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collage {
    Empty,
    Single,
    Grid {
        /// Thumbnail cells in reading order: top-left, top-right,
        /// bottom-left, bottom-right.
        cells: [Cell; THUMBNAIL_SLOTS],
    },
}

impl Collage {
    pub fn plan<S: AsRef<str>>(images: &[S]) -> Self {
        Self::for_count(images.len())
    }

    pub fn for_count(count: usize) -> Self {
        match count {
            0 => Collage::Empty,
            1 => Collage::Single,
            _ => {
                let mut cells = [Cell::Placeholder; THUMBNAIL_SLOTS];
                for (slot, cell) in cells.iter_mut().enumerate() {
                    let index = slot + 1;
                    if index < count {
                        let badge = (slot == THUMBNAIL_SLOTS - 1)
                            .then(|| overflow_badge(count))
                            .flatten();
                        *cell = Cell::Image { index, badge };
                    }
                }
                Collage::Grid { cells }
            }
        }
    }

    /// Indices of every activatable tile, primary first.
    pub fn tiles(&self) -> Vec<usize> {
        match self {
            Collage::Empty => Vec::new(),
            Collage::Single => vec![0],
            Collage::Grid { cells } => std::iter::once(0)
                .chain(cells.iter().filter_map(Cell::index))
                .collect(),
        }
    }

    pub fn placeholders(&self) -> usize {
        match self {
            Collage::Grid { cells } => cells
                .iter()
                .filter(|cell| matches!(cell, Cell::Placeholder))
                .count(),
            _ => 0,
        }
    }

    pub fn badge(&self) -> Option<usize> {
        match self {
            Collage::Grid { cells } => cells.iter().find_map(|cell| match cell {
                Cell::Image { badge, .. } => *badge,
                Cell::Placeholder => None,
            }),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Collage::Empty)
    }

    /// Activating a tile opens the modal over the full sequence, not only
    /// the images visible in the collage.
    pub fn activate<S: AsRef<str>>(&self, images: &[S], index: usize) -> Option<ModalRequest> {
        if !self.tiles().contains(&index) {
            return None;
        }
        Some(ModalRequest {
            images: images.iter().map(|s| s.as_ref().to_string()).collect(),
            start_index: index,
            current: index,
        })
    }
}

/// Badge value for the last thumbnail, `None` when nothing overflows.
pub fn overflow_badge(count: usize) -> Option<usize> {
    (count > BADGE_THRESHOLD).then(|| count.saturating_sub(THUMBNAIL_SLOTS))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalRequest {
    pub images: Vec<String>,
    pub start_index: usize,
    current: usize,
}

impl ModalRequest {
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&str> {
        self.images.get(self.current).map(String::as_str)
    }

    pub fn next(&mut self) -> bool {
        if self.current + 1 < self.images.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    pub fn previous(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("img{i}")).collect()
    }

    #[test]
    fn empty_sequence_has_no_tiles() {
        let collage = Collage::plan(&images(0));
        assert!(collage.is_empty());
        assert!(collage.tiles().is_empty());
        assert!(collage.activate(&images(0), 0).is_none());
    }

    #[test]
    fn single_image_opens_at_zero() {
        let imgs = images(1);
        let collage = Collage::plan(&imgs);
        assert_eq!(collage, Collage::Single);
        assert_eq!(collage.tiles(), vec![0]);
        let modal = collage.activate(&imgs, 0).unwrap();
        assert_eq!(modal.start_index, 0);
        assert_eq!(modal.images.len(), 1);
    }

    #[test]
    fn three_images_fill_with_one_placeholder() {
        let collage = Collage::plan(&images(3));
        let Collage::Grid { cells } = collage else {
            panic!("expected grid");
        };
        assert_eq!(cells[0], Cell::Image { index: 1, badge: None });
        assert_eq!(cells[1], Cell::Image { index: 2, badge: None });
        assert_eq!(cells[2], Cell::Placeholder);
        assert_eq!(cells[3], Cell::Placeholder);
        assert_eq!(collage.badge(), None);
    }

    #[test]
    fn four_images_leave_one_placeholder() {
        let collage = Collage::plan(&images(4));
        let Collage::Grid { cells } = collage else {
            panic!("expected grid");
        };
        let shown: Vec<usize> = cells.iter().filter_map(Cell::index).collect();
        assert_eq!(shown, vec![1, 2, 3]);
        assert_eq!(cells[3], Cell::Placeholder);
        assert_eq!(collage.placeholders(), 1);
    }

    #[test]
    fn two_images_fill_three_placeholders() {
        assert_eq!(Collage::for_count(2).placeholders(), 3);
    }

    #[test]
    fn five_images_show_no_badge() {
        let collage = Collage::for_count(5);
        assert_eq!(collage.badge(), None);
        assert_eq!(collage.placeholders(), 0);
        assert_eq!(collage.tiles(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn seven_images_badge_last_thumbnail() {
        let imgs = images(7);
        let collage = Collage::plan(&imgs);
        let Collage::Grid { cells } = collage else {
            panic!("expected grid");
        };
        assert_eq!(cells[3], Cell::Image { index: 4, badge: Some(3) });
        assert!(cells[..3].iter().all(|cell| matches!(cell, Cell::Image { badge: None, .. })));

        let modal = collage.activate(&imgs, 4).unwrap();
        assert_eq!(modal.start_index, 4);
        assert_eq!(modal.images, imgs);
    }

    #[test]
    fn hidden_images_are_not_tiles() {
        let imgs = images(7);
        let collage = Collage::plan(&imgs);
        assert!(collage.activate(&imgs, 5).is_none());
        assert!(collage.activate(&imgs, 6).is_none());
    }

    #[test]
    fn badge_never_renders_up_to_five() {
        for n in 0..=5 {
            assert_eq!(overflow_badge(n), None, "n = {n}");
        }
        assert_eq!(overflow_badge(6), Some(2));
    }

    #[test]
    fn modal_pages_through_everything() {
        let imgs = images(7);
        let mut modal = Collage::plan(&imgs).activate(&imgs, 4).unwrap();
        assert!(modal.next());
        assert!(modal.next());
        assert_eq!(modal.current(), Some("img6"));
        assert!(!modal.next());
        for _ in 0..6 {
            modal.previous();
        }
        assert_eq!(modal.current_index(), 0);
        assert!(!modal.previous());
    }

    #[test]
    fn plan_is_stable_across_recomputation() {
        let imgs = images(6);
        assert_eq!(Collage::plan(&imgs), Collage::plan(&imgs));
    }
}
