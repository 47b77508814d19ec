//! Session snapshot — active modules plus grid layout, replaced wholesale.

use serde::{Deserialize, Serialize};

use crate::types::layout::GridLayout;


/// The last-known `{activeModules, gridLayout}` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub active_modules: Vec<String>,
    #[serde(default)]
    pub grid_layout: GridLayout,
}


impl SessionSnapshot {
    pub fn new(active_modules: Vec<String>, grid_layout: GridLayout) -> Self {
        SessionSnapshot {
            active_modules,
            grid_layout,
        }
    }

    /// Active modules with no item at some breakpoint.
    pub fn dangling(&self) -> Vec<&str> {
        self.active_modules
            .iter()
            .filter(|id| {
                crate::grid::Breakpoint::ALL
                    .into_iter()
                    .any(|bp| !self.grid_layout.contains_at(bp, id))
            })
            .map(|s| s.as_str())
            .collect()
    }
}
