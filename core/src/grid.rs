//! Grid geometry — breakpoints, column counts, and default item sizes.
//!
//! Every breakpoint has its own coordinate space: the same logical pane sits
//! at different absolute coordinates at `lg` (48 columns) and at `xxs`
//! (2 columns). Nothing in here holds state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::identity::ModuleType;


/// A named responsive screen-size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Lg,
    Md,
    Sm,
    Xs,
    Xxs,
}


impl Breakpoint {
    /// All breakpoints, widest first.
    pub const ALL: [Breakpoint; 5] = [
        Breakpoint::Lg,
        Breakpoint::Md,
        Breakpoint::Sm,
        Breakpoint::Xs,
        Breakpoint::Xxs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Breakpoint::Lg => "lg",
            Breakpoint::Md => "md",
            Breakpoint::Sm => "sm",
            Breakpoint::Xs => "xs",
            Breakpoint::Xxs => "xxs",
        }
    }

    pub fn parse(s: &str) -> Option<Breakpoint> {
        let s = s.trim();
        Breakpoint::ALL
            .into_iter()
            .find(|bp| bp.as_str().eq_ignore_ascii_case(s))
    }

    /// Minimum viewport width in pixels at which this breakpoint applies.
    pub fn width_px(self) -> u32 {
        match self {
            Breakpoint::Lg => 1200,
            Breakpoint::Md => 996,
            Breakpoint::Sm => 768,
            Breakpoint::Xs => 480,
            Breakpoint::Xxs => 0,
        }
    }

    /// Number of grid columns at this breakpoint.
    pub fn columns(self) -> u32 {
        match self {
            Breakpoint::Lg => 48,
            Breakpoint::Md => 36,
            Breakpoint::Sm => 24,
            Breakpoint::Xs => 6,
            Breakpoint::Xxs => 2,
        }
    }

    /// The widest breakpoint whose minimum width fits `px`.
    pub fn for_width(px: u32) -> Breakpoint {
        Breakpoint::ALL
            .into_iter()
            .find(|bp| px >= bp.width_px())
            .unwrap_or(Breakpoint::Xxs)
    }
}


impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Width and height of a grid item, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSize {
    pub w: u32,
    pub h: u32,
}


/// Size used when the module type is not recognised.
pub const FALLBACK_SIZE: ItemSize = ItemSize { w: 12, h: 8 };

/// Smallest size a user may resize any pane to.
pub const MIN_SIZE: ItemSize = ItemSize { w: 4, h: 3 };


/// Default size for a freshly placed pane of the given module type.
pub fn default_size(module_type: &str) -> ItemSize {
    match ModuleType::parse(module_type) {
        Some(ModuleType::System) => ItemSize { w: 16, h: 10 },
        Some(ModuleType::Service) => ItemSize { w: 12, h: 8 },
        Some(ModuleType::User) => ItemSize { w: 12, h: 6 },
        None => FALLBACK_SIZE,
    }
}


/// Clamp a size so it fits the breakpoint's column count.
pub fn fit_to(bp: Breakpoint, size: ItemSize) -> ItemSize {
    ItemSize {
        w: size.w.clamp(1, bp.columns()),
        h: size.h.max(1),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_shrink_with_breakpoint() {
        let cols: Vec<u32> = Breakpoint::ALL.iter().map(|bp| bp.columns()).collect();
        assert_eq!(cols, vec![48, 36, 24, 6, 2]);
    }

    #[test]
    fn for_width_picks_widest_fitting() {
        assert_eq!(Breakpoint::for_width(1920), Breakpoint::Lg);
        assert_eq!(Breakpoint::for_width(1200), Breakpoint::Lg);
        assert_eq!(Breakpoint::for_width(1199), Breakpoint::Md);
        assert_eq!(Breakpoint::for_width(800), Breakpoint::Sm);
        assert_eq!(Breakpoint::for_width(480), Breakpoint::Xs);
        assert_eq!(Breakpoint::for_width(10), Breakpoint::Xxs);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Breakpoint::parse("LG"), Some(Breakpoint::Lg));
        assert_eq!(Breakpoint::parse(" xxs "), Some(Breakpoint::Xxs));
        assert_eq!(Breakpoint::parse("xl"), None);
    }

    #[test]
    fn unknown_type_gets_fallback_size() {
        assert_eq!(default_size("widget"), FALLBACK_SIZE);
        assert_eq!(default_size("service"), ItemSize { w: 12, h: 8 });
        assert_eq!(default_size("SYSTEM"), ItemSize { w: 16, h: 10 });
    }

    #[test]
    fn fit_clamps_width_to_columns() {
        let fitted = fit_to(Breakpoint::Xxs, ItemSize { w: 12, h: 8 });
        assert_eq!(fitted, ItemSize { w: 2, h: 8 });
        let untouched = fit_to(Breakpoint::Lg, ItemSize { w: 12, h: 8 });
        assert_eq!(untouched, ItemSize { w: 12, h: 8 });
    }
}
