//! Paneboard core — placement, layout transforms, and session reconciliation
//! for a multi-pane dashboard grid.
//!
//! The crate is organised leaves first:
//!
//! - `grid` — breakpoint geometry (pixel widths, column counts, default sizes).
//! - `types` — module identities, layout items, grid layouts, session snapshots,
//!   and settings.
//! - `registry` — the component registry that resolves module keys to pane
//!   components and tracks live instances.
//! - `layout` — the placement algorithm, the layout transformer, the debounce
//!   timer, and the layout manager that persists layouts locally and remotely.
//! - `session` — the backend seam, browser-style storage, socket events, and
//!   the reconciler that keeps the three sources of truth converged.
//! - `sys` — the command dispatcher that ties UI actions to all of the above.

pub mod command;
pub mod error;
pub mod grid;
pub mod help;
pub mod layout;
pub mod registry;
pub mod response;
pub mod session;
pub mod sys;
pub mod types;
