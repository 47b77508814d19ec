//! Component registry — resolves module keys to pane components and tracks
//! live instances.
//!
//! One registry is built per dashboard session and shared by `Arc`. Entries
//! are created lazily on first reference and never removed. Loads are
//! coalesced: while a load for a key is in flight, every caller for that key
//! awaits the same shared future, so the component source sees at most one
//! request per key at a time. Failures are recorded in the entry and never
//! returned as errors.

pub mod catalog;

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::session::backend::{ModuleDescriptor, SessionBackend};
use crate::types::identity::{canonical_key, ModuleIdentity, ModuleType};

pub use catalog::{Catalog, ComponentRef, ComponentSource, PaneComponent, PaneKind};


type LoadResult = Result<ComponentRef, LoadError>;
type PendingLoad = Shared<BoxFuture<'static, LoadResult>>;


/// Everything the registry knows about one canonical key.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub canonical_key: String,
    pub component: Option<ComponentRef>,
    /// Explicit component name announced by the backend catalog.
    pub component_name: Option<String>,
    pub instances: BTreeSet<String>,
    pub category: Option<ModuleType>,
    pub logo_url: Option<String>,
    pub last_error: Option<LoadError>,
}


impl RegistryEntry {
    fn new(key: &str) -> Self {
        RegistryEntry {
            canonical_key: key.to_string(),
            component: None,
            component_name: None,
            instances: BTreeSet::new(),
            category: None,
            logo_url: None,
            last_error: None,
        }
    }
}


#[derive(Default)]
struct RegistryState {
    entries: HashMap<String, RegistryEntry>,
    in_flight: HashMap<String, PendingLoad>,
    categories: HashMap<ModuleType, BTreeSet<String>>,
}


impl RegistryState {
    fn entry(&mut self, key: &str) -> &mut RegistryEntry {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| RegistryEntry::new(key))
    }
}


pub struct ComponentRegistry {
    source: Arc<dyn ComponentSource>,
    state: Mutex<RegistryState>,
    initialized: AtomicBool,
}


impl ComponentRegistry {
    pub fn new(source: Arc<dyn ComponentSource>) -> ComponentRegistry {
        ComponentRegistry {
            source,
            state: Mutex::new(RegistryState::default()),
            initialized: AtomicBool::new(false),
        }
    }

    /// A registry backed by the built-in pane catalog.
    pub fn builtin() -> ComponentRegistry {
        Self::new(Arc::new(Catalog::builtin()))
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    /// Insert or replace the component for `key`. Last writer wins.
    pub fn register(&self, key: &str, component: ComponentRef) {
        let key = canonical_key(key);
        if key.is_empty() {
            return;
        }
        let mut state = self.lock();
        let entry = state.entry(&key);
        entry.component = Some(component);
        entry.last_error = None;
    }

    /// The loaded component for `key`, without triggering a load.
    pub fn component(&self, key: &str) -> Option<ComponentRef> {
        let key = canonical_key(key);
        self.lock().entries.get(&key).and_then(|e| e.component.clone())
    }

    /// Resolve the component for `key`, loading it if needed.
    ///
    /// Already-loaded components return immediately. Concurrent callers for
    /// the same key share one in-flight load. Once the registry is
    /// initialized a recorded failure is terminal and returns `None` without
    /// another attempt; before that, a later call retries.
    pub async fn load_component(
        &self,
        key: &str,
        explicit_name: Option<&str>,
    ) -> Option<ComponentRef> {
        let key = canonical_key(key);
        if key.is_empty() {
            return None;
        }
        let initialized = self.is_initialized();

        let pending = {
            let mut state = self.lock();
            let hint = {
                let entry = state.entry(&key);
                if let Some(component) = &entry.component {
                    return Some(Arc::clone(component));
                }
                if initialized && entry.last_error.is_some() {
                    return None;
                }
                explicit_name
                    .map(str::to_string)
                    .or_else(|| entry.component_name.clone())
            };
            match state.in_flight.get(&key) {
                Some(pending) => pending.clone(),
                None => {
                    let pending = self.start_load(&key, hint);
                    state.in_flight.insert(key.clone(), pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        let mut state = self.lock();
        if state
            .in_flight
            .get(&key)
            .is_some_and(|current| current.ptr_eq(&pending))
        {
            state.in_flight.remove(&key);
        }
        let entry = state.entry(&key);
        match result {
            Ok(component) => {
                entry.component = Some(Arc::clone(&component));
                entry.last_error = None;
                Some(component)
            }
            Err(err) => {
                if entry.last_error.as_ref() != Some(&err) {
                    warn!(key = %key, error = %err, "component load failed");
                }
                entry.last_error = Some(err);
                None
            }
        }
    }

    fn start_load(&self, key: &str, hint: Option<String>) -> PendingLoad {
        let source = Arc::clone(&self.source);
        let key = key.to_string();
        let candidates = candidate_names(&key, hint.as_deref());
        debug!(key = %key, ?candidates, "registry.load");
        async move { resolve_first(source.as_ref(), &key, &candidates).await }
            .boxed()
            .shared()
    }

    /// Whether a load is currently in flight for `key`.
    pub fn is_loading(&self, key: &str) -> bool {
        let key = canonical_key(key);
        self.lock().in_flight.contains_key(&key)
    }

    // -----------------------------------------------------------------------
    // Instances
    // -----------------------------------------------------------------------

    /// Record a live instance. Returns `false` if it was already recorded.
    pub fn register_instance(&self, key: &str, instance_id: &str) -> bool {
        let key = canonical_key(key);
        if key.is_empty() || instance_id.is_empty() {
            return false;
        }
        self.lock().entry(&key).instances.insert(instance_id.to_string())
    }

    /// Forget a live instance. Returns `false` if it was not recorded.
    pub fn unregister_instance(&self, key: &str, instance_id: &str) -> bool {
        let key = canonical_key(key);
        match self.lock().entries.get_mut(&key) {
            Some(entry) => entry.instances.remove(instance_id),
            None => false,
        }
    }

    /// Live instance IDs for `key`, sorted.
    pub fn get_instances(&self, key: &str) -> Vec<String> {
        let key = canonical_key(key);
        self.lock()
            .entries
            .get(&key)
            .map(|e| e.instances.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Replace all instance sets with exactly the given live identities.
    pub fn sync_instances(&self, live: &[ModuleIdentity]) {
        let mut state = self.lock();
        for entry in state.entries.values_mut() {
            entry.instances.clear();
        }
        for identity in live {
            state
                .entry(&identity.component_key())
                .instances
                .insert(identity.instance_id.clone());
        }
    }

    // -----------------------------------------------------------------------
    // Categories and metadata
    // -----------------------------------------------------------------------

    /// Put `module` in `category`, removing it from every other category.
    pub fn set_category_for_module(&self, module: &str, category: ModuleType) {
        let key = canonical_key(module);
        if key.is_empty() {
            return;
        }
        let mut state = self.lock();
        for members in state.categories.values_mut() {
            members.remove(&key);
        }
        state.categories.entry(category).or_default().insert(key.clone());
        state.entry(&key).category = Some(category);
    }

    pub fn get_category_for_module(&self, module: &str) -> Option<ModuleType> {
        let key = canonical_key(module);
        self.lock().entries.get(&key).and_then(|e| e.category)
    }

    /// Modules in `category`, sorted.
    pub fn modules_in_category(&self, category: ModuleType) -> Vec<String> {
        self.lock()
            .categories
            .get(&category)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_logo_url(&self, module: &str, url: &str) {
        let key = canonical_key(module);
        if key.is_empty() {
            return;
        }
        self.lock().entry(&key).logo_url = Some(url.to_string());
    }

    pub fn logo_url(&self, module: &str) -> Option<String> {
        let key = canonical_key(module);
        self.lock().entries.get(&key).and_then(|e| e.logo_url.clone())
    }

    /// Name to try first when loading `module`.
    pub fn set_component_name(&self, module: &str, name: &str) {
        let key = canonical_key(module);
        if key.is_empty() {
            return;
        }
        self.lock().entry(&key).component_name = Some(name.to_string());
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    pub fn last_error(&self, key: &str) -> Option<LoadError> {
        let key = canonical_key(key);
        self.lock().entries.get(&key).and_then(|e| e.last_error.clone())
    }

    /// Every key whose last load failed, sorted by key.
    pub fn failures(&self) -> Vec<(String, LoadError)> {
        let mut out: Vec<(String, LoadError)> = self
            .lock()
            .entries
            .values()
            .filter_map(|e| e.last_error.clone().map(|err| (e.canonical_key.clone(), err)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn entry(&self, key: &str) -> Option<RegistryEntry> {
        let key = canonical_key(key);
        self.lock().entries.get(&key).cloned()
    }

    /// Snapshot of all entries, sorted by key.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        let mut out: Vec<RegistryEntry> = self.lock().entries.values().cloned().collect();
        out.sort_by(|a, b| a.canonical_key.cmp(&b.canonical_key));
        out
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn set_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    /// Bulk-populate categories, logos, and component names from the
    /// backend's module catalog, then latch `initialized`.
    ///
    /// The latch is only set if at least one module type could be listed.
    /// Returns the number of descriptors applied.
    pub async fn populate(&self, backend: &dyn SessionBackend) -> usize {
        let mut applied = 0;
        let mut reachable = false;
        for module_type in ModuleType::ALL {
            match backend.list_modules(module_type).await {
                Ok(descriptors) => {
                    reachable = true;
                    for descriptor in &descriptors {
                        if self.apply_descriptor(descriptor, module_type) {
                            applied += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(module_type = %module_type, error = %e, "module catalog fetch failed");
                }
            }
        }
        if reachable {
            self.set_initialized();
            info!(applied, "component registry initialized");
        }
        applied
    }

    fn apply_descriptor(&self, descriptor: &ModuleDescriptor, listed_as: ModuleType) -> bool {
        let name = descriptor
            .pane_component
            .as_deref()
            .unwrap_or(descriptor.name.as_str());
        let key = canonical_key(name);
        if key.is_empty() {
            return false;
        }
        let category = descriptor
            .module_type
            .as_deref()
            .and_then(ModuleType::parse)
            .unwrap_or(listed_as);
        self.set_category_for_module(&key, category);
        if let Some(component) = &descriptor.pane_component {
            self.set_component_name(&key, component);
        }
        if let Some(url) = &descriptor.logo_url {
            self.set_logo_url(&key, url);
        }
        true
    }
}


/// Names to try for `key`: the explicit name, then `<key>pane`, then `key`.
fn candidate_names(key: &str, explicit: Option<&str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !name.is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            names.push(name);
        }
    };
    if let Some(explicit) = explicit {
        push(explicit.trim().to_string());
    }
    if !key.ends_with("pane") {
        push(format!("{}pane", key));
    }
    push(key.to_string());
    names
}


async fn resolve_first(
    source: &dyn ComponentSource,
    key: &str,
    candidates: &[String],
) -> LoadResult {
    let mut failure = None;
    for name in candidates {
        match source.resolve(name).await {
            Ok(component) => return Ok(component),
            Err(LoadError::NotFound { .. }) => {}
            Err(err) => failure = Some(err),
        }
    }
    Err(failure.unwrap_or_else(|| LoadError::NotFound {
        key: key.to_string(),
        tried: candidates.join(", "),
    }))
}
