//! Sys — the dashboard runtime. Dispatches pane, layout, and session commands.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::command::Command;
use crate::grid::Breakpoint;
use crate::layout::manager::LayoutManager;
use crate::layout::{placement, transform};
use crate::registry::{ComponentRegistry, PaneKind};
use crate::response::Response;
use crate::session::backend::SessionBackend;
use crate::session::events::{PaneEvent, PaneEventKind};
use crate::session::reconciler::{ReconcileReport, SessionReconciler};
use crate::session::storage::KeyValueStore;
use crate::types::config::DashboardSettings;
use crate::types::identity::{canonical_key, ModuleIdentity, ModuleType};
use crate::types::layout::GridLayout;
use crate::types::session::SessionSnapshot;


/// Central runtime for the dashboard. Owns the registry, the layout manager,
/// and the reconciler, and turns UI actions into consistent session updates.
pub struct Sys {
    settings: DashboardSettings,
    registry: Arc<ComponentRegistry>,
    manager: Arc<LayoutManager>,
    reconciler: SessionReconciler,
    actions: Vec<PaneEvent>,
}


impl Sys {
    pub fn new(
        settings: DashboardSettings,
        registry: Arc<ComponentRegistry>,
        backend: Arc<dyn SessionBackend>,
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
    ) -> Sys {
        let manager = Arc::new(LayoutManager::new(local, session, backend, settings.debounce_ms));
        let reconciler = SessionReconciler::new(
            Arc::clone(&manager),
            Arc::clone(&registry),
            settings.default_modules.clone(),
        );
        Sys {
            settings,
            registry,
            manager,
            reconciler,
            actions: Vec::new(),
        }
    }

    /// Return a reference to the current settings.
    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Populate the registry from the backend catalog, then run the first
    /// reconciliation pass.
    pub async fn start(&mut self) -> ReconcileReport {
        self.registry.populate(self.manager.backend()).await;
        let report = self.reconciler.reconcile().await;
        info!(
            source = ?report.source,
            modules = self.reconciler.snapshot().active_modules.len(),
            "dashboard ready"
        );
        report
    }

    /// The snapshot the render layer should show.
    pub fn ui_state(&self) -> SessionSnapshot {
        self.reconciler.snapshot()
    }

    /// Send any layout write still waiting out its debounce window.
    pub async fn shutdown(&self) {
        if self.manager.flush_remote().await.is_some() {
            debug!("pending layout flushed on shutdown");
        }
    }

    /// The single dispatch method.
    pub async fn execute(&mut self, cmd: Command) -> Response {
        self.actions.clear();
        match cmd {
            Command::Status => self.cmd_status(),
            Command::SessionShow => json_response(&self.reconciler.snapshot()),
            Command::SessionReload => self.cmd_session_reload().await,
            Command::PaneLaunch { component, module_type } => {
                self.cmd_pane_launch(&component, module_type.as_deref()).await
            }
            Command::PaneRemove { id } => self.cmd_pane_remove(&id).await,
            Command::LayoutShow { breakpoint } => self.cmd_layout_show(breakpoint.as_deref()),
            Command::LayoutUpdate { layout } => self.cmd_layout_update(&layout),
            Command::LayoutReset => self.cmd_layout_reset().await,
            Command::ModulesList => self.cmd_modules_list(),
            Command::RegistryFailures => self.cmd_registry_failures(),
            Command::Event { name } => self.cmd_event(&name).await,
            Command::Help { topic } => self.cmd_help(topic),
        }
    }

    /// Events emitted during the last execute() call.
    pub fn pending_actions(&self) -> &[PaneEvent] {
        &self.actions
    }

    /// Take and clear accumulated events.
    pub fn drain_actions(&mut self) -> Vec<PaneEvent> {
        std::mem::take(&mut self.actions)
    }

    // -----------------------------------------------------------------------
    // Status / Session
    // -----------------------------------------------------------------------

    fn cmd_status(&self) -> Response {
        let snapshot = self.reconciler.snapshot();
        json_response(&json!({
            "state": self.reconciler.state(),
            "active_modules": snapshot.active_modules.len(),
            "layout_items": snapshot.grid_layout.item_count(),
            "dangling": snapshot.dangling(),
            "registry_initialized": self.registry.is_initialized(),
            "load_failures": self.registry.failures().len(),
            "remote_write_pending": self.manager.has_pending_remote(),
        }))
    }

    async fn cmd_session_reload(&mut self) -> Response {
        let report = self.reconciler.reconcile().await;
        json_response(&report)
    }

    // -----------------------------------------------------------------------
    // Pane commands
    // -----------------------------------------------------------------------

    async fn cmd_pane_launch(&mut self, component: &str, module_type: Option<&str>) -> Response {
        let key = canonical_key(component);
        if key.is_empty() {
            return Response::error("No component given");
        }
        let requested = match module_type {
            Some(raw) => match ModuleType::parse(raw) {
                Some(t) => Some(t),
                None => return Response::error(format!("Unknown module type '{}'", raw)),
            },
            None => None,
        };
        let Some(loaded) = self.registry.load_component(&key, Some(component)).await else {
            let reason = self
                .registry
                .last_error(&key)
                .map(|e| e.to_string())
                .unwrap_or_else(|| "not available".into());
            return Response::error(format!("Cannot launch '{}': {}", component, reason));
        };
        let module_type = requested
            .or_else(|| self.registry.get_category_for_module(&key))
            .unwrap_or_else(|| loaded.kind.default_category());

        let identity = ModuleIdentity::generate(module_type, loaded.name.clone());
        if identity.is_singleton() && !self.registry.get_instances(&identity.component_key()).is_empty() {
            return Response::error(format!("{} is already running", loaded.name));
        }
        self.registry
            .register_instance(&identity.component_key(), &identity.instance_id);

        let id = identity.to_string();
        let mut snapshot = self.reconciler.snapshot();
        snapshot.active_modules.push(id.clone());
        placement::place_missing(
            &mut snapshot.grid_layout,
            &id,
            module_type.as_str(),
            &identity.static_identifier,
        );
        self.commit(snapshot).await;

        info!(id = %id, "pane launched");
        self.actions.push(PaneEvent::new(
            PaneEventKind::Launched,
            Some(module_type.as_str().to_string()),
            vec![identity.instance_id.clone()],
        ));
        Response::ok(id)
    }

    async fn cmd_pane_remove(&mut self, id: &str) -> Response {
        let mut snapshot = self.reconciler.snapshot();
        let before = snapshot.active_modules.len();
        snapshot.active_modules.retain(|m| m != id);
        let removed_items = snapshot.grid_layout.remove_id(id);
        if before == snapshot.active_modules.len() && removed_items == 0 {
            return Response::error(format!("No pane '{}'", id));
        }

        let identity = ModuleIdentity::parse(id).ok();
        if let Some(identity) = &identity {
            self.registry
                .unregister_instance(&identity.component_key(), &identity.instance_id);
        }
        self.commit(snapshot).await;

        info!(id, "pane removed");
        let (module_type, instance) = match identity {
            Some(identity) => (
                Some(identity.module_type.as_str().to_string()),
                identity.instance_id,
            ),
            None => (None, id.to_string()),
        };
        self.actions
            .push(PaneEvent::new(PaneEventKind::Removed, module_type, vec![instance]));
        Response::ok(format!("Removed {}", id))
    }

    /// Publish the snapshot and persist it: layout locally and (debounced)
    /// remotely, module list remotely.
    async fn commit(&self, snapshot: SessionSnapshot) {
        self.manager.save_local(&snapshot.grid_layout);
        self.manager
            .debounced_save_remote(snapshot.grid_layout.clone());
        let modules = snapshot.active_modules.clone();
        self.reconciler.publish(snapshot);
        self.manager.save_modules(&modules).await;
    }

    // -----------------------------------------------------------------------
    // Layout commands
    // -----------------------------------------------------------------------

    fn cmd_layout_show(&self, breakpoint: Option<&str>) -> Response {
        let layout = self.reconciler.snapshot().grid_layout;
        match breakpoint {
            None => json_response(&layout),
            Some(raw) => match Breakpoint::parse(raw) {
                Some(bp) => json_response(&layout.get(bp)),
                None => Response::error(format!(
                    "Unknown breakpoint '{}'. Expected one of: lg, md, sm, xs, xxs",
                    raw
                )),
            },
        }
    }

    /// Apply a layout change from the grid (drag or resize). Breakpoints
    /// missing from the payload keep their current items.
    fn cmd_layout_update(&mut self, payload: &Value) -> Response {
        let Value::Object(map) = payload else {
            return Response::error("Layout must be a JSON object keyed by breakpoint");
        };
        let incoming = transform::hydrate(payload);
        let mut snapshot = self.reconciler.snapshot();
        let mut next: GridLayout = snapshot.grid_layout.clone();
        for bp in Breakpoint::ALL {
            if map.contains_key(bp.as_str()) {
                *next.get_mut(bp) = incoming.get(bp).to_vec();
            }
        }
        for id in &snapshot.active_modules {
            if let Ok(identity) = ModuleIdentity::parse(id) {
                placement::place_missing(
                    &mut next,
                    id,
                    identity.module_type.as_str(),
                    &identity.static_identifier,
                );
            }
        }
        if !transform::is_changed(&snapshot.grid_layout, &next) {
            return Response::ok("Layout unchanged");
        }

        snapshot.grid_layout = next;
        self.manager.save_local(&snapshot.grid_layout);
        self.manager
            .debounced_save_remote(snapshot.grid_layout.clone());
        self.reconciler.publish(snapshot);
        self.actions
            .push(PaneEvent::new(PaneEventKind::LayoutsUpdated, None, Vec::new()));
        Response::ok("Layout updated")
    }

    /// Drop every stored layout and regenerate positions for the active modules.
    async fn cmd_layout_reset(&mut self) -> Response {
        self.manager.clear_remote().await;
        self.manager.clear_local();
        let report = self.reconciler.reconcile().await;
        self.actions
            .push(PaneEvent::new(PaneEventKind::LayoutsUpdated, None, Vec::new()));
        json_response(&report)
    }

    // -----------------------------------------------------------------------
    // Registry / Events
    // -----------------------------------------------------------------------

    fn cmd_modules_list(&self) -> Response {
        let mut keys: BTreeSet<String> = PaneKind::ALL
            .into_iter()
            .map(|kind| canonical_key(kind.component_name()))
            .collect();
        keys.extend(self.registry.entries().into_iter().map(|e| e.canonical_key));

        let modules: Vec<Value> = keys
            .iter()
            .map(|key| {
                let entry = self.registry.entry(key);
                let kind = PaneKind::lookup(key);
                let category = self
                    .registry
                    .get_category_for_module(key)
                    .or_else(|| kind.map(PaneKind::default_category));
                json!({
                    "key": key,
                    "component": kind.map(PaneKind::component_name),
                    "category": category,
                    "instances": self.registry.get_instances(key),
                    "logo_url": self.registry.logo_url(key),
                    "loaded": entry.as_ref().is_some_and(|e| e.component.is_some()),
                })
            })
            .collect();
        json_response(&modules)
    }

    fn cmd_registry_failures(&self) -> Response {
        let failures: Vec<Value> = self
            .registry
            .failures()
            .into_iter()
            .map(|(key, err)| json!({ "key": key, "error": err.to_string() }))
            .collect();
        json_response(&failures)
    }

    async fn cmd_event(&mut self, name: &str) -> Response {
        match self.reconciler.handle_event(name).await {
            Some(report) => json_response(&report),
            None => Response::error(format!("Unknown event '{}'", name)),
        }
    }

    // -----------------------------------------------------------------------
    // Help
    // -----------------------------------------------------------------------

    fn cmd_help(&self, topic: Option<String>) -> Response {
        Response::ok(crate::help::help_text(topic.as_deref()))
    }
}


fn json_response<T: Serialize + ?Sized>(value: &T) -> Response {
    match serde_json::to_string(value) {
        Ok(output) => Response::ok(output),
        Err(e) => Response::error(format!("Cannot encode output: {}", e)),
    }
}
