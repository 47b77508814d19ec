//! Layout — placement, transformation, and persistence of grid layouts.
//!
//! `placement` finds free coordinates for a new item at each breakpoint.
//! `transform` converts layouts between their in-memory, stored, and legacy
//! wire shapes. `timer` coalesces bursts of remote writes, and `manager`
//! persists layouts to local storage and to the session backend.

pub mod manager;
pub mod placement;
pub mod timer;
pub mod transform;
