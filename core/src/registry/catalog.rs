//! Static registration table — known pane kinds and their factories.
//!
//! Components are resolved by explicit lookup into this table. Names match
//! case-insensitively, so `supervisorpane`, `SupervisorPane`, and the alias
//! `Supervisor` all resolve to the same kind.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LoadError;
use crate::types::identity::ModuleType;


/// Every pane kind this build knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaneKind {
    Supervisor,
    Status,
    Nvidia,
    Docker,
    Logs,
    Notes,
    Terminal,
}


impl PaneKind {
    pub const ALL: [PaneKind; 7] = [
        PaneKind::Supervisor,
        PaneKind::Status,
        PaneKind::Nvidia,
        PaneKind::Docker,
        PaneKind::Logs,
        PaneKind::Notes,
        PaneKind::Terminal,
    ];

    /// Canonical component class name.
    pub fn component_name(self) -> &'static str {
        match self {
            PaneKind::Supervisor => "SupervisorPane",
            PaneKind::Status => "StatusPane",
            PaneKind::Nvidia => "NvidiaPane",
            PaneKind::Docker => "DockerPane",
            PaneKind::Logs => "LogsPane",
            PaneKind::Notes => "NotesPane",
            PaneKind::Terminal => "TerminalPane",
        }
    }

    /// Category the pane belongs to unless the backend says otherwise.
    pub fn default_category(self) -> ModuleType {
        match self {
            PaneKind::Supervisor | PaneKind::Status => ModuleType::System,
            PaneKind::Nvidia | PaneKind::Docker | PaneKind::Logs => ModuleType::Service,
            PaneKind::Notes | PaneKind::Terminal => ModuleType::User,
        }
    }

    /// Look up a kind by component name or its short alias (`Nvidia`).
    pub fn lookup(name: &str) -> Option<PaneKind> {
        let name = name.trim();
        PaneKind::ALL.into_iter().find(|kind| {
            let full = kind.component_name();
            let short = full.strip_suffix("Pane").unwrap_or(full);
            full.eq_ignore_ascii_case(name) || short.eq_ignore_ascii_case(name)
        })
    }

    pub fn build(self) -> PaneComponent {
        PaneComponent {
            name: self.component_name().to_string(),
            kind: self,
        }
    }
}


/// A resolved, renderable pane component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneComponent {
    pub name: String,
    pub kind: PaneKind,
}


pub type ComponentRef = Arc<PaneComponent>;


/// Anything that can turn a component name into a component.
#[async_trait]
pub trait ComponentSource: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<ComponentRef, LoadError>;
}


/// The built-in table of pane kinds.
#[derive(Debug, Default, Clone, Copy)]
pub struct Catalog;


impl Catalog {
    pub fn builtin() -> Catalog {
        Catalog
    }
}


#[async_trait]
impl ComponentSource for Catalog {
    async fn resolve(&self, name: &str) -> Result<ComponentRef, LoadError> {
        PaneKind::lookup(name)
            .map(|kind| Arc::new(kind.build()))
            .ok_or_else(|| LoadError::NotFound {
                key: name.to_string(),
                tried: name.to_string(),
            })
    }
}
