//! Command — the typed interface for every dashboard operation.
//!
//! UI actions (launching, removing, and rearranging panes) and diagnostic
//! queries all arrive as a `Command` and are answered with a `Response`.

use serde::{Deserialize, Serialize};
use serde_json::Value;


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command")]
pub enum Command {
    // -----------------------------------------------------------------
    // Top-level commands
    // -----------------------------------------------------------------

    #[serde(rename = "status")]
    Status,

    #[serde(rename = "session.show")]
    SessionShow,

    #[serde(rename = "session.reload")]
    SessionReload,

    // -----------------------------------------------------------------
    // Pane commands
    // -----------------------------------------------------------------

    #[serde(rename = "pane.launch")]
    PaneLaunch {
        component: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module_type: Option<String>,
    },

    #[serde(rename = "pane.remove")]
    PaneRemove {
        id: String,
    },

    // -----------------------------------------------------------------
    // Layout commands
    // -----------------------------------------------------------------

    #[serde(rename = "layout.show")]
    LayoutShow {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        breakpoint: Option<String>,
    },

    #[serde(rename = "layout.update")]
    LayoutUpdate {
        layout: Value,
    },

    #[serde(rename = "layout.reset")]
    LayoutReset,

    // -----------------------------------------------------------------
    // Registry / Events / Help
    // -----------------------------------------------------------------

    #[serde(rename = "modules.list")]
    ModulesList,

    #[serde(rename = "registry.failures")]
    RegistryFailures,

    #[serde(rename = "event")]
    Event {
        name: String,
    },

    #[serde(rename = "help")]
    Help {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
    },
}
