//! Session layer — the remote store, browser-style storage, socket events,
//! and the reconciler that merges them.

pub mod backend;
pub mod events;
pub mod reconciler;
pub mod storage;
