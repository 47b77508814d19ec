//! Layout items and the five-breakpoint grid layout.
//!
//! `GridLayout` has one field per breakpoint, so a value of this type always
//! carries all five keys, each a (possibly empty) list. Untrusted payloads go
//! through `layout::transform` to become one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::grid::Breakpoint;


/// One pane's rectangle at one breakpoint.
///
/// `extra` holds transient fields a UI layer may attach (`moved`, `static`,
/// drag flags). They survive normalization and are dropped by sanitization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_identifier: Option<String>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}


impl LayoutItem {
    pub fn new(id: impl Into<String>, x: u32, y: u32, w: u32, h: u32) -> Self {
        LayoutItem {
            id: id.into(),
            x,
            y,
            w,
            h,
            min_w: None,
            min_h: None,
            module_type: None,
            static_identifier: None,
            extra: Map::new(),
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    /// True when the half-open rectangles intersect.
    pub fn overlaps(&self, other: &LayoutItem) -> bool {
        rects_overlap(
            (self.x, self.y, self.w, self.h),
            (other.x, other.y, other.w, other.h),
        )
    }
}


/// Half-open rectangle intersection on `(x, y, w, h)` tuples.
pub fn rects_overlap(a: (u32, u32, u32, u32), b: (u32, u32, u32, u32)) -> bool {
    let (ax, ay, aw, ah) = a;
    let (bx, by, bw, bh) = b;
    if aw == 0 || ah == 0 || bw == 0 || bh == 0 {
        return false;
    }
    ax < bx.saturating_add(bw)
        && bx < ax.saturating_add(aw)
        && ay < by.saturating_add(bh)
        && by < ay.saturating_add(ah)
}


/// Items for every breakpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    pub lg: Vec<LayoutItem>,
    pub md: Vec<LayoutItem>,
    pub sm: Vec<LayoutItem>,
    pub xs: Vec<LayoutItem>,
    pub xxs: Vec<LayoutItem>,
}


impl GridLayout {
    pub fn get(&self, bp: Breakpoint) -> &[LayoutItem] {
        match bp {
            Breakpoint::Lg => &self.lg,
            Breakpoint::Md => &self.md,
            Breakpoint::Sm => &self.sm,
            Breakpoint::Xs => &self.xs,
            Breakpoint::Xxs => &self.xxs,
        }
    }

    pub fn get_mut(&mut self, bp: Breakpoint) -> &mut Vec<LayoutItem> {
        match bp {
            Breakpoint::Lg => &mut self.lg,
            Breakpoint::Md => &mut self.md,
            Breakpoint::Sm => &mut self.sm,
            Breakpoint::Xs => &mut self.xs,
            Breakpoint::Xxs => &mut self.xxs,
        }
    }

    /// `(breakpoint, items)` pairs, widest breakpoint first.
    pub fn iter(&self) -> impl Iterator<Item = (Breakpoint, &[LayoutItem])> {
        Breakpoint::ALL.into_iter().map(move |bp| (bp, self.get(bp)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, items)| items.is_empty())
    }

    /// Whether `id` has an item at `bp`.
    pub fn contains_at(&self, bp: Breakpoint, id: &str) -> bool {
        self.get(bp).iter().any(|item| item.id == id)
    }

    /// Whether `id` has an item at any breakpoint.
    pub fn contains_anywhere(&self, id: &str) -> bool {
        Breakpoint::ALL.into_iter().any(|bp| self.contains_at(bp, id))
    }

    /// Remove every item with `id`. Returns how many were removed.
    pub fn remove_id(&mut self, id: &str) -> usize {
        let mut removed = 0;
        for bp in Breakpoint::ALL {
            let items = self.get_mut(bp);
            let before = items.len();
            items.retain(|item| item.id != id);
            removed += before - items.len();
        }
        removed
    }

    /// Total number of items across breakpoints.
    pub fn item_count(&self) -> usize {
        self.iter().map(|(_, items)| items.len()).sum()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_rects_do_not_overlap() {
        let a = LayoutItem::new("a", 0, 0, 4, 4);
        let b = LayoutItem::new("b", 4, 0, 4, 4);
        let c = LayoutItem::new("c", 0, 4, 4, 4);
        assert!(!a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn intersecting_rects_overlap() {
        let a = LayoutItem::new("a", 0, 0, 4, 4);
        let b = LayoutItem::new("b", 3, 3, 4, 4);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn zero_sized_rect_never_overlaps() {
        let a = LayoutItem::new("a", 0, 0, 0, 4);
        let b = LayoutItem::new("b", 0, 0, 4, 4);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn default_layout_serializes_all_breakpoints() {
        let json = serde_json::to_value(GridLayout::default()).unwrap();
        let obj = json.as_object().unwrap();
        for bp in Breakpoint::ALL {
            assert_eq!(obj[bp.as_str()], serde_json::json!([]));
        }
    }

    #[test]
    fn remove_id_clears_every_breakpoint() {
        let mut layout = GridLayout::default();
        for bp in Breakpoint::ALL {
            layout.get_mut(bp).push(LayoutItem::new("x", 0, 0, 1, 1));
            layout.get_mut(bp).push(LayoutItem::new("y", 1, 0, 1, 1));
        }
        assert_eq!(layout.remove_id("x"), 5);
        assert!(!layout.contains_anywhere("x"));
        assert_eq!(layout.item_count(), 5);
    }

    #[test]
    fn item_serializes_camel_case_and_skips_empty_extras() {
        let mut item = LayoutItem::new("USER-NotesPane-a", 1, 2, 3, 4);
        item.min_w = Some(2);
        item.static_identifier = Some("NotesPane".into());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["minW"], 2);
        assert_eq!(json["staticIdentifier"], "NotesPane");
        assert!(json.get("extra").is_none());
        assert!(json.get("minH").is_none());
    }
}
