//! Help system for paneboard commands.

pub fn help_text(topic: Option<&str>) -> String {
    match topic {
        None => overview(),
        Some(t) => {
            if let Some(text) = command_help(t) {
                return text;
            }
            if let Some(text) = group_help(t) {
                return text;
            }
            format!("Unknown help topic: '{}'. Run 'paneboard help' for a list of commands.", t)
        }
    }
}


fn overview() -> String {
    "\
paneboard — dashboard layout and session command-line interface

Usage: paneboard <command> [args...]

Commands:
  status                     Show reconciliation state and counts
  help [topic]               Show help

Session commands:
  session show               Print active modules and grid layout
  session reload             Fetch the session again and repair it

Pane commands:
  pane launch <component> [--type <TYPE>]  Launch a new pane instance
  pane remove <id>                         Remove a pane instance

Layout commands:
  layout show [--breakpoint <bp>]  Print the grid layout
  layout update <json>             Apply a layout change
  layout reset                     Discard stored layouts and re-place panes

Registry commands:
  modules list               List known modules, categories, and instances
  registry failures          List components that failed to load

Event command:
  event <name>               Handle pane:launched, pane:removed, or layouts:updated

Run 'paneboard help <command>' for detailed help on a specific command."
        .into()
}


fn group_help(group: &str) -> Option<String> {
    let text = match group {
        "session" => "\
Session commands — inspect and refresh the session

  session show
    Print the current {active_modules, grid_layout} snapshot as JSON.

  session reload
    Fetch the session from the backend (falling back to stored layouts),
    place any module that lacks a layout item, and publish the result.",

        "pane" => "\
Pane commands — launch and remove panes

  pane launch <component> [--type <TYPE>]
    Load the component, create a new instance, and place it at every
    breakpoint. TYPE is SYSTEM, SERVICE, or USER; by default it comes from
    the module catalog. Only one SYSTEM SupervisorPane may run.

  pane remove <id>
    Remove the instance with the given MODULETYPE-Static-instance ID.",

        "layout" => "\
Layout commands — view and change the grid

  layout show [--breakpoint <bp>]
    Print the whole layout, or only one of lg, md, sm, xs, xxs.

  layout update <json>
    Replace the items of each breakpoint present in the JSON object.
    Breakpoints left out keep their items. No-op if nothing moved.

  layout reset
    Clear the local and remote layouts and place every active pane again.",

        "modules" | "registry" => "\
Registry commands — inspect the component registry

  modules list
    List every known module with its category, logo, and live instances.

  registry failures
    List modules whose component failed to load, with the last error.",

        _ => return None,
    };
    Some(text.into())
}


fn command_help(command: &str) -> Option<String> {
    let text = match command {
        "status" => "paneboard status — show reconciliation state\n\nUsage: paneboard status",
        "help" => "paneboard help — show help\n\nUsage: paneboard help [topic]",
        "session.show" => "paneboard session show — print the session snapshot\n\nUsage: paneboard session show",
        "session.reload" => "paneboard session reload — reconcile again\n\nUsage: paneboard session reload",
        "pane.launch" => "paneboard pane launch — launch a pane\n\nUsage: paneboard pane launch <component> [--type <TYPE>]",
        "pane.remove" => "paneboard pane remove — remove a pane\n\nUsage: paneboard pane remove <id>",
        "layout.show" => "paneboard layout show — print the layout\n\nUsage: paneboard layout show [--breakpoint <bp>]",
        "layout.update" => "paneboard layout update — apply a layout change\n\nUsage: paneboard layout update <json>",
        "layout.reset" => "paneboard layout reset — regenerate the layout\n\nUsage: paneboard layout reset",
        "modules.list" => "paneboard modules list — list modules\n\nUsage: paneboard modules list",
        "registry.failures" => "paneboard registry failures — list load failures\n\nUsage: paneboard registry failures",
        "event" => "paneboard event — handle a session event\n\nUsage: paneboard event <pane:launched|pane:removed|layouts:updated>",
        _ => return None,
    };
    Some(text.into())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overview_lists_groups() {
        let text = help_text(None);
        assert!(text.contains("Pane commands:"));
        assert!(text.contains("Layout commands:"));
    }

    #[test]
    fn group_help_pane() {
        let text = help_text(Some("pane"));
        assert!(text.contains("pane launch"));
        assert!(text.contains("SupervisorPane"));
    }

    #[test]
    fn command_help_layout_show() {
        let text = help_text(Some("layout.show"));
        assert!(text.contains("Usage:"));
        assert!(text.contains("--breakpoint"));
    }

    #[test]
    fn unknown_topic() {
        let text = help_text(Some("bogus"));
        assert!(text.contains("Unknown help topic"));
    }
}
