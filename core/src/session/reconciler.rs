//! Session reconciler — converges the active-module list and the grid layout
//! after a load or an external change.
//!
//! A pass fetches the session, falls back to stored layouts when the fetch
//! fails, repairs the pair so every active module has an item at every
//! breakpoint, persists any repair, and publishes the result as one
//! `SessionSnapshot` through a `watch` channel. Every pass and every local
//! publish takes a new generation number; a pass that finishes after a newer
//! one has started is discarded instead of published.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::layout::manager::LayoutManager;
use crate::layout::placement;
use crate::layout::transform;
use crate::registry::{ComponentRegistry, PaneKind};
use crate::session::events::PaneEventKind;
use crate::types::identity::{ModuleIdentity, ModuleType};
use crate::types::layout::GridLayout;
use crate::types::session::SessionSnapshot;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileState {
    Uninitialized,
    Loading,
    Reconciled,
    Stale,
}


impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcileState::Uninitialized => "uninitialized",
            ReconcileState::Loading => "loading",
            ReconcileState::Reconciled => "reconciled",
            ReconcileState::Stale => "stale",
        };
        f.write_str(name)
    }
}


/// Where the layout of a pass came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    Remote,
    Local,
    Session,
    Default,
}


/// What one reconciliation pass did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub source: SnapshotSource,
    /// Modules that received new layout items.
    pub placed: Vec<String>,
    /// Legacy entries rewritten as `(old, new)`.
    pub upgraded: Vec<(String, String)>,
    /// Duplicate or extra singleton entries removed from the active list.
    pub dropped: Vec<String>,
    /// False when a newer pass superseded this one.
    pub published: bool,
}


// ---------------------------------------------------------------------------
// Repair
// ---------------------------------------------------------------------------

/// Result of repairing an active list against a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Repair {
    pub active_modules: Vec<String>,
    pub grid_layout: GridLayout,
    pub placed: Vec<String>,
    pub upgraded: Vec<(String, String)>,
    pub dropped: Vec<String>,
}


impl Repair {
    pub fn layout_changed(&self) -> bool {
        !self.placed.is_empty() || !self.dropped.is_empty()
    }

    pub fn modules_changed(&self) -> bool {
        !self.upgraded.is_empty() || !self.dropped.is_empty()
    }
}


/// Make every active module appear exactly once, with an item at every
/// breakpoint.
///
/// Entries that already have layout items keep their ID. Legacy entries
/// without the three-part form are upgraded to a generated identity. Only
/// the first SYSTEM SupervisorPane survives.
pub fn repair(active: &[String], layout: GridLayout, registry: &ComponentRegistry) -> Repair {
    let mut out = Repair {
        active_modules: Vec::new(),
        grid_layout: layout,
        placed: Vec::new(),
        upgraded: Vec::new(),
        dropped: Vec::new(),
    };
    let mut seen: HashSet<String> = HashSet::new();
    let mut singleton_seen = false;

    for raw in active {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let id = match resolve_entry(raw, &out.grid_layout, registry) {
            Some(id) => id,
            None => raw.to_string(),
        };
        if id != raw {
            out.upgraded.push((raw.to_string(), id.clone()));
        }

        let identity = ModuleIdentity::parse(&id).ok();
        let is_singleton = identity.as_ref().is_some_and(ModuleIdentity::is_singleton);
        if !seen.insert(id.clone()) || (is_singleton && singleton_seen) {
            if is_singleton && !out.active_modules.contains(&id) {
                out.grid_layout.remove_id(&id);
            }
            out.dropped.push(id);
            continue;
        }
        singleton_seen |= is_singleton;

        let (module_type, static_identifier) = describe(&id, identity.as_ref(), &out.grid_layout);
        let filled = placement::place_missing(&mut out.grid_layout, &id, &module_type, &static_identifier);
        if !filled.is_empty() {
            debug!(id = %id, breakpoints = filled.len(), "placed missing layout items");
            out.placed.push(id.clone());
        }
        out.active_modules.push(id);
    }
    out
}


/// The ID an active entry should have, or `None` to keep it unchanged.
fn resolve_entry(raw: &str, layout: &GridLayout, registry: &ComponentRegistry) -> Option<String> {
    if ModuleIdentity::parse(raw).is_ok() || layout.contains_anywhere(raw) {
        return None;
    }
    let parts: Vec<&str> = raw.split('-').collect();
    match parts.as_slice() {
        [module_type, static_identifier] if !static_identifier.is_empty() => {
            let module_type = ModuleType::parse(module_type)?;
            Some(ModuleIdentity::generate(module_type, *static_identifier).to_string())
        }
        [static_identifier] => {
            let module_type = registry
                .get_category_for_module(static_identifier)
                .or_else(|| PaneKind::lookup(static_identifier).map(PaneKind::default_category))
                .unwrap_or(ModuleType::User);
            Some(ModuleIdentity::generate(module_type, *static_identifier).to_string())
        }
        _ => None,
    }
}


/// Module type and static identifier for sizing and tagging new items.
fn describe(id: &str, identity: Option<&ModuleIdentity>, layout: &GridLayout) -> (String, String) {
    if let Some(identity) = identity {
        return (
            identity.module_type.as_str().to_string(),
            identity.static_identifier.clone(),
        );
    }
    let existing = layout
        .iter()
        .flat_map(|(_, items)| items.iter())
        .find(|item| item.id == id);
    let module_type = existing
        .and_then(|item| item.module_type.clone())
        .unwrap_or_else(|| id.split('-').next().unwrap_or_default().to_string());
    let static_identifier = existing
        .and_then(|item| item.static_identifier.clone())
        .unwrap_or_else(|| id.to_string());
    (module_type, static_identifier)
}


// ---------------------------------------------------------------------------
// SessionReconciler
// ---------------------------------------------------------------------------

pub struct SessionReconciler {
    manager: Arc<LayoutManager>,
    registry: Arc<ComponentRegistry>,
    default_modules: Vec<String>,
    state: Mutex<ReconcileState>,
    generation: AtomicU64,
    published: watch::Sender<SessionSnapshot>,
}


impl SessionReconciler {
    pub fn new(
        manager: Arc<LayoutManager>,
        registry: Arc<ComponentRegistry>,
        default_modules: Vec<String>,
    ) -> SessionReconciler {
        let (published, _) = watch::channel(SessionSnapshot::default());
        SessionReconciler {
            manager,
            registry,
            default_modules,
            state: Mutex::new(ReconcileState::Uninitialized),
            generation: AtomicU64::new(0),
            published,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ReconcileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ReconcileState {
        *self.lock_state()
    }

    /// The last published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.published.borrow().clone()
    }

    /// A receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.published.subscribe()
    }

    /// Note that another client changed the session.
    pub fn mark_stale(&self) {
        *self.lock_state() = ReconcileState::Stale;
    }

    /// Publish a locally produced snapshot. Any pass still running is
    /// superseded by it.
    pub fn publish(&self, snapshot: SessionSnapshot) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.apply(snapshot);
    }

    fn apply(&self, snapshot: SessionSnapshot) {
        let live: Vec<ModuleIdentity> = snapshot
            .active_modules
            .iter()
            .filter_map(|id| ModuleIdentity::parse(id).ok())
            .collect();
        self.registry.sync_instances(&live);
        self.published.send_replace(snapshot);
        *self.lock_state() = ReconcileState::Reconciled;
    }

    /// React to a socket event. Unknown event names are ignored.
    pub async fn handle_event(&self, name: &str) -> Option<ReconcileReport> {
        let Some(kind) = PaneEventKind::parse(name) else {
            debug!(event = name, "ignoring unknown session event");
            return None;
        };
        debug!(event = %kind, "session changed elsewhere");
        self.mark_stale();
        Some(self.reconcile().await)
    }

    /// Run one full pass. Always ends with a renderable snapshot published,
    /// unless a newer pass or local publish overtook this one.
    pub async fn reconcile(&self) -> ReconcileReport {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.lock_state() = ReconcileState::Loading;

        // A queued layout write is newer than anything the backend holds.
        if self.manager.has_pending_remote() {
            self.manager.flush_remote().await;
        }
        let loaded = self.load().await;
        let source = loaded.source;
        let repaired = repair(&loaded.active, loaded.layout, &self.registry);

        if self.is_current(generation) {
            self.persist(source, loaded.defaulted, &repaired).await;
        }
        let published = self.is_current(generation);
        if published {
            self.apply(SessionSnapshot::new(
                repaired.active_modules.clone(),
                repaired.grid_layout.clone(),
            ));
        } else {
            debug!(generation, "discarding superseded reconciliation");
        }
        ReconcileReport {
            source,
            placed: repaired.placed,
            upgraded: repaired.upgraded,
            dropped: repaired.dropped,
            published,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Save repairs so they survive the next load. Remote truth is also
    /// mirrored to local storage.
    async fn persist(&self, source: SnapshotSource, defaulted: bool, repaired: &Repair) {
        if repaired.layout_changed() {
            info!(placed = ?repaired.placed, "persisting repaired layout");
            self.manager.save_local(&repaired.grid_layout);
            self.manager.save_remote(&repaired.grid_layout).await;
        } else if source == SnapshotSource::Remote {
            self.manager.save_local(&repaired.grid_layout);
        }
        // An empty remote session seeded from defaults needs its module list too.
        if repaired.modules_changed() || (source == SnapshotSource::Remote && defaulted) {
            self.manager.save_modules(&repaired.active_modules).await;
        }
    }

    async fn load(&self) -> Loaded {
        match self.manager.fetch_remote().await {
            Ok(raw) => {
                let layout = transform::hydrate(&raw.grid_layout);
                let active = raw.active_module_ids();
                if active.is_empty() && layout.is_empty() {
                    debug!("remote session is empty; starting from defaults");
                    return Loaded::defaults(SnapshotSource::Remote, &self.default_modules, layout);
                }
                Loaded {
                    source: SnapshotSource::Remote,
                    active,
                    layout,
                    defaulted: false,
                }
            }
            Err(e) => {
                warn!(error = %e, "session fetch failed; using stored layout");
                let (source, layout) = if let Some(layout) = self.manager.load_local() {
                    (SnapshotSource::Local, layout)
                } else if let Some(layout) = self.manager.load_session() {
                    (SnapshotSource::Session, layout)
                } else {
                    (SnapshotSource::Default, GridLayout::default())
                };
                Loaded::defaults(source, &self.default_modules, layout)
            }
        }
    }
}


/// Input of one pass, before repair.
struct Loaded {
    source: SnapshotSource,
    active: Vec<String>,
    layout: GridLayout,
    /// The active list is the default set, not one read from a store.
    defaulted: bool,
}


impl Loaded {
    fn defaults(source: SnapshotSource, modules: &[String], layout: GridLayout) -> Loaded {
        Loaded {
            source,
            active: modules.to_vec(),
            layout,
            defaulted: true,
        }
    }
}
