//! Session backend — the remote source of truth for layouts and active modules.
//!
//! Endpoints:
//!
//! - `GET    /api/user/session`          → `{ grid_layout, active_modules }`
//! - `PUT    /api/user/session/grid`     ← sanitized grid layout
//! - `PUT    /api/user/session/modules`  ← array of module identity strings
//! - `DELETE /api/user/session/grid`
//! - `GET    /api/modules?module_type=…` → module descriptors
//!
//! `HttpBackend` talks to a real server. `StoreBackend` keeps the same data
//! in a `KeyValueStore` and is used when no server is configured.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{FetchError, PersistenceError};
use crate::session::storage::KeyValueStore;
use crate::types::identity::ModuleType;
use crate::types::layout::GridLayout;


const SESSION_PATH: &str = "/api/user/session";
const GRID_PATH: &str = "/api/user/session/grid";
const MODULES_PATH: &str = "/api/user/session/modules";
const CATALOG_PATH: &str = "/api/modules";


/// Session payload exactly as the backend returned it. The grid layout is
/// left untyped so the transformer can hydrate legacy shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSession {
    #[serde(default)]
    pub grid_layout: Value,
    #[serde(default)]
    pub active_modules: Value,
}


impl RawSession {
    /// Active module strings, skipping anything that is not a non-empty string.
    pub fn active_module_ids(&self) -> Vec<String> {
        match &self.active_modules {
            Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}


/// Acknowledgement of a successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub status: u16,
    pub body: Value,
}


/// One entry of the backend's module catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    #[serde(alias = "module")]
    pub name: String,
    #[serde(rename = "paneComponent", default, skip_serializing_if = "Option::is_none")]
    pub pane_component: Option<String>,
    #[serde(rename = "logoUrl", alias = "logo_url", default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_type: Option<String>,
}


#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn fetch_session(&self) -> Result<RawSession, FetchError>;
    async fn put_grid(&self, layout: &GridLayout) -> Result<Ack, PersistenceError>;
    async fn put_modules(&self, modules: &[String]) -> Result<Ack, PersistenceError>;
    async fn delete_grid(&self) -> Result<Ack, PersistenceError>;
    async fn list_modules(&self, module_type: ModuleType) -> Result<Vec<ModuleDescriptor>, FetchError>;
}


// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}


impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<HttpBackend, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(HttpBackend {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_read<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn send_write(&self, request: RequestBuilder) -> Result<Ack, PersistenceError> {
        let response = request
            .send()
            .await
            .map_err(|e| PersistenceError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        // Acks may have an empty body.
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok(Ack {
            status: status.as_u16(),
            body,
        })
    }
}


#[async_trait]
impl SessionBackend for HttpBackend {
    async fn fetch_session(&self) -> Result<RawSession, FetchError> {
        debug!(url = %self.url(SESSION_PATH), "session.fetch");
        self.send_read(self.client.get(self.url(SESSION_PATH))).await
    }

    async fn put_grid(&self, layout: &GridLayout) -> Result<Ack, PersistenceError> {
        let request = self
            .client
            .put(self.url(GRID_PATH))
            .header(CONTENT_TYPE, "application/json")
            .json(layout);
        self.send_write(request).await
    }

    async fn put_modules(&self, modules: &[String]) -> Result<Ack, PersistenceError> {
        let request = self
            .client
            .put(self.url(MODULES_PATH))
            .header(CONTENT_TYPE, "application/json")
            .json(modules);
        self.send_write(request).await
    }

    async fn delete_grid(&self) -> Result<Ack, PersistenceError> {
        self.send_write(self.client.delete(self.url(GRID_PATH))).await
    }

    async fn list_modules(&self, module_type: ModuleType) -> Result<Vec<ModuleDescriptor>, FetchError> {
        let request = self
            .client
            .get(self.url(CATALOG_PATH))
            .query(&[("module_type", module_type.as_str())]);
        self.send_read(request).await
    }
}


// ---------------------------------------------------------------------------
// StoreBackend
// ---------------------------------------------------------------------------

const STORE_GRID_KEY: &str = "session.grid_layout";
const STORE_MODULES_KEY: &str = "session.active_modules";


/// The backend contract served from a key-value store.
///
/// `set_offline(true)` makes every call fail as if the server were down.
pub struct StoreBackend {
    store: Arc<dyn KeyValueStore>,
    catalog: Mutex<HashMap<ModuleType, Vec<ModuleDescriptor>>>,
    offline: AtomicBool,
    grid_writes: AtomicUsize,
}


impl StoreBackend {
    pub fn new(store: Arc<dyn KeyValueStore>) -> StoreBackend {
        StoreBackend {
            store,
            catalog: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            grid_writes: AtomicUsize::new(0),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Replace the module catalog served for `module_type`.
    pub fn set_catalog(&self, module_type: ModuleType, descriptors: Vec<ModuleDescriptor>) {
        self.catalog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(module_type, descriptors);
    }

    /// Seed the stored session directly.
    pub fn seed(&self, grid_layout: &Value, active_modules: &[String]) -> Result<(), PersistenceError> {
        self.store.set(STORE_GRID_KEY, &grid_layout.to_string())?;
        let modules = serde_json::to_string(active_modules)
            .map_err(|e| PersistenceError::Serialize(e.to_string()))?;
        self.store.set(STORE_MODULES_KEY, &modules)
    }

    /// Number of successful grid writes since construction.
    pub fn grid_writes(&self) -> usize {
        self.grid_writes.load(Ordering::SeqCst)
    }

    fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    fn ack() -> Ack {
        Ack {
            status: 200,
            body: serde_json::json!({ "ok": true }),
        }
    }

    fn read_json(&self, key: &str) -> Result<Value, FetchError> {
        let text = self
            .store
            .get(key)
            .map_err(|e| FetchError::Network(e.to_string()))?;
        match text {
            Some(text) => serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string())),
            None => Ok(Value::Null),
        }
    }
}


#[async_trait]
impl SessionBackend for StoreBackend {
    async fn fetch_session(&self) -> Result<RawSession, FetchError> {
        if self.is_offline() {
            return Err(FetchError::Unavailable);
        }
        Ok(RawSession {
            grid_layout: self.read_json(STORE_GRID_KEY)?,
            active_modules: self.read_json(STORE_MODULES_KEY)?,
        })
    }

    async fn put_grid(&self, layout: &GridLayout) -> Result<Ack, PersistenceError> {
        if self.is_offline() {
            return Err(PersistenceError::Unavailable);
        }
        let text = serde_json::to_string(layout)
            .map_err(|e| PersistenceError::Serialize(e.to_string()))?;
        self.store.set(STORE_GRID_KEY, &text)?;
        self.grid_writes.fetch_add(1, Ordering::SeqCst);
        Ok(Self::ack())
    }

    async fn put_modules(&self, modules: &[String]) -> Result<Ack, PersistenceError> {
        if self.is_offline() {
            return Err(PersistenceError::Unavailable);
        }
        let text = serde_json::to_string(modules)
            .map_err(|e| PersistenceError::Serialize(e.to_string()))?;
        self.store.set(STORE_MODULES_KEY, &text)?;
        Ok(Self::ack())
    }

    async fn delete_grid(&self) -> Result<Ack, PersistenceError> {
        if self.is_offline() {
            return Err(PersistenceError::Unavailable);
        }
        self.store.remove(STORE_GRID_KEY)?;
        Ok(Self::ack())
    }

    async fn list_modules(&self, module_type: ModuleType) -> Result<Vec<ModuleDescriptor>, FetchError> {
        if self.is_offline() {
            return Err(FetchError::Unavailable);
        }
        Ok(self
            .catalog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&module_type)
            .cloned()
            .unwrap_or_default())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryStore;
    use crate::types::layout::LayoutItem;

    fn backend() -> StoreBackend {
        StoreBackend::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn raw_session_filters_non_string_modules() {
        let raw = RawSession {
            grid_layout: Value::Null,
            active_modules: serde_json::json!(["USER-NotesPane-a", 7, "", null, " SYSTEM-Status-b "]),
        };
        assert_eq!(
            raw.active_module_ids(),
            vec!["USER-NotesPane-a", "SYSTEM-Status-b"]
        );
    }

    #[test]
    fn descriptor_accepts_module_alias_and_camel_case() {
        let d: ModuleDescriptor = serde_json::from_str(
            r#"{"module":"nvidia","paneComponent":"NvidiaPane","logoUrl":"/n.svg","module_type":"SERVICE"}"#,
        )
        .unwrap();
        assert_eq!(d.name, "nvidia");
        assert_eq!(d.pane_component.as_deref(), Some("NvidiaPane"));
        assert_eq!(d.logo_url.as_deref(), Some("/n.svg"));
        assert_eq!(d.module_type.as_deref(), Some("SERVICE"));
    }

    #[tokio::test]
    async fn empty_store_fetches_null_payloads() {
        let raw = backend().fetch_session().await.unwrap();
        assert_eq!(raw.grid_layout, Value::Null);
        assert!(raw.active_module_ids().is_empty());
    }

    #[tokio::test]
    async fn writes_are_visible_to_fetch() {
        let backend = backend();
        let mut layout = GridLayout::default();
        layout.lg.push(LayoutItem::new("USER-NotesPane-a", 0, 0, 12, 6));
        backend.put_grid(&layout).await.unwrap();
        backend.put_modules(&["USER-NotesPane-a".to_string()]).await.unwrap();

        let raw = backend.fetch_session().await.unwrap();
        assert_eq!(raw.grid_layout["lg"][0]["id"], "USER-NotesPane-a");
        assert_eq!(raw.active_module_ids(), vec!["USER-NotesPane-a"]);
        assert_eq!(backend.grid_writes(), 1);

        backend.delete_grid().await.unwrap();
        assert_eq!(backend.fetch_session().await.unwrap().grid_layout, Value::Null);
    }

    #[tokio::test]
    async fn offline_backend_fails_every_call() {
        let backend = backend();
        backend.set_offline(true);
        assert_eq!(backend.fetch_session().await, Err(FetchError::Unavailable));
        assert_eq!(
            backend.put_grid(&GridLayout::default()).await,
            Err(PersistenceError::Unavailable)
        );
        assert!(backend.list_modules(ModuleType::User).await.is_err());
    }

    #[test]
    fn http_backend_trims_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.url(GRID_PATH), "http://localhost:8080/api/user/session/grid");
    }
}
