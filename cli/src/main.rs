//! paneboard CLI — the command-line entry point for the dashboard core.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use paneboard_core::command::Command;
use paneboard_core::registry::ComponentRegistry;
use paneboard_core::response::Response;
use paneboard_core::session::backend::{HttpBackend, SessionBackend, StoreBackend};
use paneboard_core::session::storage::{FileStore, MemoryStore};
use paneboard_core::sys::Sys;
use paneboard_core::types::config::DashboardSettings;
use tracing::{debug, warn};


fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let arg_refs: Vec<&str> = args[1..].iter().map(|s| s.as_str()).collect();

    let cmd = match parse_args(&arg_refs) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("paneboard: {}", e);
            process::exit(1);
        }
    };

    let config_dir = resolve_config_dir();
    let settings = DashboardSettings::load(&config_dir);
    debug!(config_dir = %config_dir.display(), "settings loaded");

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("paneboard: cannot start runtime: {}", e);
            process::exit(1);
        }
    };
    let response = runtime.block_on(run(settings, cmd));

    match response {
        Response::Ok { output } => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Response::Error { message } => {
            eprintln!("paneboard error: {}", message);
            process::exit(1);
        }
    }
}


async fn run(settings: DashboardSettings, cmd: Command) -> Response {
    let storage_dir = settings.storage_path();
    let local = Arc::new(FileStore::new(storage_dir.join("local")));
    let backend = build_backend(&settings, storage_dir);

    let mut sys = Sys::new(
        settings,
        Arc::new(ComponentRegistry::builtin()),
        backend,
        local,
        Arc::new(MemoryStore::new()),
    );
    sys.start().await;
    let response = sys.execute(cmd).await;
    for event in sys.drain_actions() {
        let (name, payload) = event.to_wire();
        debug!(event = %name, %payload, "session event");
    }
    sys.shutdown().await;
    response
}


/// HTTP backend when a base URL is configured, on-disk session otherwise.
fn build_backend(settings: &DashboardSettings, storage_dir: PathBuf) -> Arc<dyn SessionBackend> {
    let on_disk = || -> Arc<dyn SessionBackend> {
        Arc::new(StoreBackend::new(Arc::new(FileStore::new(storage_dir.join("session")))))
    };
    match &settings.api_base_url {
        Some(url) => {
            let timeout = Duration::from_millis(settings.request_timeout_ms);
            match HttpBackend::new(url, timeout) {
                Ok(backend) => Arc::new(backend),
                Err(e) => {
                    warn!(url = %url, error = %e, "cannot build HTTP client; using on-disk session");
                    on_disk()
                }
            }
        }
        None => on_disk(),
    }
}


fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("PANEBOARD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}


fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PANEBOARD_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("paneboard")
}


fn parse_args(args: &[&str]) -> Result<Command, String> {
    if args.is_empty() {
        return Err("No command specified. Run 'paneboard help' for usage.".into());
    }

    match args[0] {
        "status" => Ok(Command::Status),
        "help" => Ok(Command::Help {
            topic: args.get(1).map(|s| s.to_string()),
        }),
        "session" => parse_session(args),
        "pane" => parse_pane(args),
        "layout" => parse_layout(args),
        "modules" => match args.get(1) {
            Some(&"list") => Ok(Command::ModulesList),
            _ => Err("Usage: paneboard modules list".into()),
        },
        "registry" => match args.get(1) {
            Some(&"failures") => Ok(Command::RegistryFailures),
            _ => Err("Usage: paneboard registry failures".into()),
        },
        "event" => {
            if args.len() < 2 {
                return Err("Usage: paneboard event <name>".into());
            }
            Ok(Command::Event { name: args[1].into() })
        }
        _ => Err(format!("Unknown command: '{}'. Run 'paneboard help' for usage.", args[0])),
    }
}


fn parse_session(args: &[&str]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err("Usage: paneboard session <show|reload>".into());
    }
    match args[1] {
        "show" => Ok(Command::SessionShow),
        "reload" => Ok(Command::SessionReload),
        _ => Err(format!("Unknown session subcommand: '{}'", args[1])),
    }
}


fn parse_pane(args: &[&str]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err("Usage: paneboard pane <launch|remove> ...".into());
    }
    match args[1] {
        "launch" => {
            if args.len() < 3 {
                return Err("Usage: paneboard pane launch <component> [--type <TYPE>]".into());
            }
            Ok(Command::PaneLaunch {
                component: args[2].into(),
                module_type: find_flag(args, "--type"),
            })
        }
        "remove" => {
            if args.len() < 3 {
                return Err("Usage: paneboard pane remove <id>".into());
            }
            Ok(Command::PaneRemove { id: args[2].into() })
        }
        _ => Err(format!("Unknown pane subcommand: '{}'", args[1])),
    }
}


fn parse_layout(args: &[&str]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err("Usage: paneboard layout <show|update|reset> ...".into());
    }
    match args[1] {
        "show" => Ok(Command::LayoutShow {
            breakpoint: find_flag(args, "--breakpoint"),
        }),
        "update" => {
            if args.len() < 3 {
                return Err("Usage: paneboard layout update <json>".into());
            }
            let layout = serde_json::from_str(args[2])
                .map_err(|e| format!("Layout is not valid JSON: {}", e))?;
            Ok(Command::LayoutUpdate { layout })
        }
        "reset" => Ok(Command::LayoutReset),
        _ => Err(format!("Unknown layout subcommand: '{}'", args[1])),
    }
}


fn find_flag(args: &[&str], flag: &str) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        if *arg == flag {
            return args.get(i + 1).map(|s| s.to_string());
        }
    }
    None
}
