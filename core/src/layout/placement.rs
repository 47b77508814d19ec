//! Placement — find a free spot for a new pane at each breakpoint.
//!
//! The search packs top-left first. The top-left-most free spot always
//! rests against the grid origin or against an edge of an existing item, so
//! only rows at `0` or at some item's bottom edge, and columns at `0` or at
//! some item's right edge, are tried. Candidates are taken lowest row first,
//! then leftmost column. If no gap is large enough the pane goes on a fresh
//! row below everything, which can never overlap.

use std::collections::{BTreeMap, BTreeSet};

use crate::grid::{self, Breakpoint, ItemSize, MIN_SIZE};
use crate::types::layout::{rects_overlap, GridLayout, LayoutItem};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}


/// Top-left-most position where a `size` rectangle fits without overlap.
///
/// Widths wider than the breakpoint are clamped to its column count, so the
/// result always satisfies `x + w <= columns`.
pub fn find_position(bp: Breakpoint, existing: &[LayoutItem], size: ItemSize) -> Position {
    if existing.is_empty() {
        return Position { x: 0, y: 0 };
    }
    let size = grid::fit_to(bp, size);
    let max_x = bp.columns() - size.w;
    let floor = existing.iter().map(LayoutItem::bottom).max().unwrap_or(0);

    let rows = edges(existing.iter().map(LayoutItem::bottom));
    let columns: Vec<u32> = edges(existing.iter().map(LayoutItem::right))
        .into_iter()
        .filter(|&x| x <= max_x)
        .collect();
    for &y in rows.iter().take_while(|&&y| y < floor) {
        for &x in &columns {
            if is_free(existing, x, y, size) {
                return Position { x, y };
            }
        }
    }
    Position { x: 0, y: floor }
}


/// `0` plus every given edge, sorted and de-duplicated.
fn edges(values: impl Iterator<Item = u32>) -> BTreeSet<u32> {
    std::iter::once(0).chain(values).collect()
}


fn is_free(existing: &[LayoutItem], x: u32, y: u32, size: ItemSize) -> bool {
    existing
        .iter()
        .all(|item| !rects_overlap((x, y, size.w, size.h), (item.x, item.y, item.w, item.h)))
}


/// A new item for one breakpoint, sized for its module type.
pub fn create_layout_item(
    bp: Breakpoint,
    id: &str,
    module_type: &str,
    static_identifier: &str,
    existing: &[LayoutItem],
) -> LayoutItem {
    let size = grid::fit_to(bp, grid::default_size(module_type));
    let pos = find_position(bp, existing, size);
    let mut item = LayoutItem::new(id, pos.x, pos.y, size.w, size.h);
    item.min_w = Some(MIN_SIZE.w.min(size.w));
    item.min_h = Some(MIN_SIZE.h.min(size.h));
    item.module_type = Some(module_type.to_string());
    item.static_identifier = Some(static_identifier.to_string());
    item
}


/// One new item per breakpoint, each placed against that breakpoint's items.
pub fn create_layout_item_for_all_breakpoints(
    id: &str,
    module_type: &str,
    static_identifier: &str,
    current: &GridLayout,
) -> BTreeMap<Breakpoint, LayoutItem> {
    Breakpoint::ALL
        .into_iter()
        .map(|bp| {
            let item = create_layout_item(bp, id, module_type, static_identifier, current.get(bp));
            (bp, item)
        })
        .collect()
}


/// Insert an item for `id` at every breakpoint that lacks one.
///
/// Returns the breakpoints that received a new item.
pub fn place_missing(
    layout: &mut GridLayout,
    id: &str,
    module_type: &str,
    static_identifier: &str,
) -> Vec<Breakpoint> {
    let mut placed = Vec::new();
    for bp in Breakpoint::ALL {
        if layout.contains_at(bp, id) {
            continue;
        }
        let item = create_layout_item(bp, id, module_type, static_identifier, layout.get(bp));
        layout.get_mut(bp).push(item);
        placed.push(bp);
    }
    placed
}


#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(id: &str, x: u32, y: u32, w: u32, h: u32) -> LayoutItem {
        LayoutItem::new(id, x, y, w, h)
    }

    fn assert_no_overlap(items: &[LayoutItem]) {
        for (i, a) in items.iter().enumerate() {
            for b in &items[i + 1..] {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn empty_layout_places_at_origin() {
        let pos = find_position(Breakpoint::Lg, &[], ItemSize { w: 12, h: 8 });
        assert_eq!(pos, Position { x: 0, y: 0 });
    }

    #[test]
    fn fills_gap_to_the_right_on_first_row() {
        let existing = vec![item("a", 0, 0, 12, 8)];
        let pos = find_position(Breakpoint::Lg, &existing, ItemSize { w: 12, h: 8 });
        assert_eq!(pos, Position { x: 12, y: 0 });
    }

    #[test]
    fn full_row_pushes_to_fresh_row() {
        let existing = vec![item("a", 0, 0, 6, 4)];
        let pos = find_position(Breakpoint::Xs, &existing, ItemSize { w: 6, h: 4 });
        assert_eq!(pos, Position { x: 0, y: 4 });
    }

    #[test]
    fn finds_hole_above_the_bottom_edge() {
        // lg: a wide pane on the left, a tall pane on the right, hole in the middle
        let existing = vec![
            item("left", 0, 0, 12, 20),
            item("right", 36, 0, 12, 20),
            item("top-mid", 12, 0, 24, 4),
        ];
        let pos = find_position(Breakpoint::Lg, &existing, ItemSize { w: 12, h: 8 });
        assert_eq!(pos, Position { x: 12, y: 4 });
    }

    #[test]
    fn very_tall_item_does_not_slow_the_search() {
        let existing = vec![item("tower", 0, 0, 48, u32::MAX - 10)];
        let pos = find_position(Breakpoint::Lg, &existing, ItemSize { w: 12, h: 8 });
        assert_eq!(pos, Position { x: 0, y: u32::MAX - 10 });

        let existing = vec![item("half", 0, 0, 24, 4_000_000_000)];
        let pos = find_position(Breakpoint::Lg, &existing, ItemSize { w: 12, h: 8 });
        assert_eq!(pos, Position { x: 24, y: 0 });
    }

    #[test]
    fn gap_below_a_short_item_is_found() {
        let existing = vec![
            item("a", 0, 0, 24, 3),
            item("b", 24, 0, 24, 40),
            item("c", 0, 20, 24, 4),
        ];
        let pos = find_position(Breakpoint::Lg, &existing, ItemSize { w: 24, h: 10 });
        assert_eq!(pos, Position { x: 0, y: 3 });
    }

    #[test]
    fn oversized_width_is_clamped() {
        let existing = vec![item("a", 0, 0, 2, 3)];
        let pos = find_position(Breakpoint::Xxs, &existing, ItemSize { w: 12, h: 8 });
        assert_eq!(pos, Position { x: 0, y: 3 });
    }

    #[test]
    fn item_for_all_breakpoints_uses_type_size() {
        let items = create_layout_item_for_all_breakpoints(
            "SERVICE-NvidiaPane-1",
            "SERVICE",
            "NvidiaPane",
            &GridLayout::default(),
        );
        assert_eq!(items.len(), 5);
        let lg = &items[&Breakpoint::Lg];
        assert_eq!((lg.x, lg.y, lg.w, lg.h), (0, 0, 12, 8));
        assert_eq!(lg.min_w, Some(4));
        assert_eq!(lg.static_identifier.as_deref(), Some("NvidiaPane"));
        let xxs = &items[&Breakpoint::Xxs];
        assert_eq!((xxs.w, xxs.h), (2, 8));
        assert_eq!(xxs.min_w, Some(2));
    }

    #[test]
    fn unknown_type_uses_fallback_size() {
        let items = create_layout_item_for_all_breakpoints("x", "WIDGET", "Clock", &GridLayout::default());
        let lg = &items[&Breakpoint::Lg];
        assert_eq!((lg.w, lg.h), (12, 8));
    }

    #[test]
    fn place_missing_only_fills_holes() {
        let mut layout = GridLayout::default();
        layout.lg.push(item("USER-NotesPane-a", 4, 4, 12, 6));
        let placed = place_missing(&mut layout, "USER-NotesPane-a", "USER", "NotesPane");
        assert_eq!(
            placed,
            vec![Breakpoint::Md, Breakpoint::Sm, Breakpoint::Xs, Breakpoint::Xxs]
        );
        assert_eq!(layout.lg.len(), 1);
        assert_eq!((layout.lg[0].x, layout.lg[0].y), (4, 4));
        assert!(place_missing(&mut layout, "USER-NotesPane-a", "USER", "NotesPane").is_empty());
    }

    proptest! {
        #[test]
        fn repeated_placement_never_overlaps(
            sizes in proptest::collection::vec((1u32..60, 1u32..12), 1..25),
            bp_index in 0usize..5,
        ) {
            let bp = Breakpoint::ALL[bp_index];
            let mut items: Vec<LayoutItem> = Vec::new();
            for (i, (w, h)) in sizes.into_iter().enumerate() {
                let size = grid::fit_to(bp, ItemSize { w, h });
                let pos = find_position(bp, &items, size);
                prop_assert!(pos.x + size.w <= bp.columns());
                items.push(item(&format!("p{}", i), pos.x, pos.y, size.w, size.h));
            }
            assert_no_overlap(&items);
        }

        #[test]
        fn placement_in_every_breakpoint_never_overlaps(count in 1usize..12) {
            let mut layout = GridLayout::default();
            for i in 0..count {
                let module_type = ["SYSTEM", "SERVICE", "USER", "OTHER"][i % 4];
                place_missing(&mut layout, &format!("USER-P{}-x", i), module_type, "P");
            }
            for (bp, items) in layout.iter() {
                prop_assert_eq!(items.len(), count);
                for it in items {
                    prop_assert!(it.right() <= bp.columns());
                }
                assert_no_overlap(items);
            }
        }
    }
}
