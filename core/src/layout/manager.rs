//! Layout manager — reads and writes layouts to local storage and to the
//! remote session store.
//!
//! Local writes go to both the local and the session store. Remote writes can
//! be immediate (`save_remote`) or coalesced (`debounced_save_remote`), in
//! which case a background task owned by the manager sends only the last
//! layout of a burst once the quiet window has passed. Local and remote
//! writes are independent: either may fail while the other succeeds.
//! Nothing here returns an error; failures are logged and reported as
//! `None` or `false`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::layout::timer::DebounceTimer;
use crate::layout::transform;
use crate::session::backend::{Ack, RawSession, SessionBackend};
use crate::session::storage::{KeyValueStore, LOCAL_LAYOUT_KEY, SESSION_LAYOUT_KEY};
use crate::types::layout::GridLayout;


pub struct LayoutManager {
    local: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    backend: Arc<dyn SessionBackend>,
    writer: Arc<RemoteWriter>,
}


impl LayoutManager {
    pub fn new(
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        backend: Arc<dyn SessionBackend>,
        debounce_ms: u64,
    ) -> LayoutManager {
        let writer = Arc::new(RemoteWriter::new(Arc::clone(&backend), debounce_ms));
        LayoutManager {
            local,
            session,
            backend,
            writer,
        }
    }

    pub fn backend(&self) -> &dyn SessionBackend {
        self.backend.as_ref()
    }

    // -----------------------------------------------------------------------
    // Local
    // -----------------------------------------------------------------------

    /// Write the sanitized layout to local and session storage.
    /// Returns whether the local write succeeded.
    pub fn save_local(&self, layout: &GridLayout) -> bool {
        let text = match transform::to_storage_json(layout) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "layout not saved locally");
                return false;
            }
        };
        if let Err(e) = self.session.set(SESSION_LAYOUT_KEY, &text) {
            warn!(error = %e, "session storage write failed");
        }
        match self.local.set(LOCAL_LAYOUT_KEY, &text) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "local storage write failed");
                false
            }
        }
    }

    /// The layout in local storage, or `None` if absent or unreadable.
    pub fn load_local(&self) -> Option<GridLayout> {
        read_layout(self.local.as_ref(), LOCAL_LAYOUT_KEY)
    }

    /// The layout in session storage, or `None` if absent or unreadable.
    pub fn load_session(&self) -> Option<GridLayout> {
        read_layout(self.session.as_ref(), SESSION_LAYOUT_KEY)
    }

    pub fn clear_local(&self) {
        for (store, key) in [
            (self.local.as_ref(), LOCAL_LAYOUT_KEY),
            (self.session.as_ref(), SESSION_LAYOUT_KEY),
        ] {
            if let Err(e) = store.remove(key) {
                warn!(key, error = %e, "failed to clear stored layout");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Remote
    // -----------------------------------------------------------------------

    pub async fn fetch_remote(&self) -> Result<RawSession, FetchError> {
        self.backend.fetch_session().await
    }

    /// Send the sanitized layout now. `None` means it was not persisted.
    pub async fn save_remote(&self, layout: &GridLayout) -> Option<Ack> {
        self.writer.write(layout).await
    }

    /// Send the layout once no further call has arrived for the debounce window.
    pub fn debounced_save_remote(&self, layout: GridLayout) {
        self.writer.schedule(layout);
    }

    /// Send any pending debounced layout immediately.
    pub async fn flush_remote(&self) -> Option<Ack> {
        self.writer.flush().await
    }

    pub fn has_pending_remote(&self) -> bool {
        self.writer.lock().timer.has_pending()
    }

    /// Persist the active module list.
    pub async fn save_modules(&self, modules: &[String]) -> Option<Ack> {
        match self.backend.put_modules(modules).await {
            Ok(ack) => Some(ack),
            Err(e) => {
                warn!(error = %e, "active modules not persisted remotely");
                None
            }
        }
    }

    /// Delete the remote layout so the next load regenerates it.
    pub async fn clear_remote(&self) -> Option<Ack> {
        // A pending debounced write would resurrect the layout.
        self.writer.lock().timer.take();
        match self.backend.delete_grid().await {
            Ok(ack) => Some(ack),
            Err(e) => {
                warn!(error = %e, "remote layout not cleared");
                None
            }
        }
    }
}


fn read_layout(store: &dyn KeyValueStore, key: &str) -> Option<GridLayout> {
    let text = match store.get(key) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "storage read failed");
            return None;
        }
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(value @ (Value::Object(_) | Value::String(_))) => Some(transform::hydrate(&value)),
        Ok(_) | Err(_) => {
            warn!(key, "ignoring corrupt stored layout");
            None
        }
    }
}


// ---------------------------------------------------------------------------
// RemoteWriter
// ---------------------------------------------------------------------------

struct WriterState {
    timer: DebounceTimer<GridLayout>,
    running: bool,
}


enum Step {
    Write(GridLayout),
    Wait(u64),
    Done,
}


/// Owns the debounce timer and the task that drains it.
struct RemoteWriter {
    backend: Arc<dyn SessionBackend>,
    state: Mutex<WriterState>,
    epoch: Instant,
}


impl RemoteWriter {
    fn new(backend: Arc<dyn SessionBackend>, window_ms: u64) -> RemoteWriter {
        RemoteWriter {
            backend,
            state: Mutex::new(WriterState {
                timer: DebounceTimer::new(window_ms),
                running: false,
            }),
            epoch: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn schedule(self: &Arc<Self>, layout: GridLayout) {
        let start = {
            let mut state = self.lock();
            state.timer.request(layout, self.now_ms());
            !std::mem::replace(&mut state.running, true)
        };
        if !start {
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                let writer = Arc::clone(self);
                handle.spawn(async move { writer.run().await });
            }
            Err(_) => {
                warn!("no async runtime; layout write stays pending until flushed");
                self.lock().running = false;
            }
        }
    }

    async fn run(&self) {
        loop {
            let step = {
                let mut state = self.lock();
                let now = self.now_ms();
                if let Some(layout) = state.timer.take_due(now) {
                    Step::Write(layout)
                } else if let Some(ms) = state.timer.remaining_ms(now) {
                    Step::Wait(ms)
                } else {
                    state.running = false;
                    Step::Done
                }
            };
            match step {
                Step::Write(layout) => {
                    self.write(&layout).await;
                }
                Step::Wait(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                Step::Done => break,
            }
        }
    }

    async fn write(&self, layout: &GridLayout) -> Option<Ack> {
        let clean = transform::sanitize_for_storage(layout);
        match self.backend.put_grid(&clean).await {
            Ok(ack) => {
                debug!(items = clean.item_count(), "layout persisted remotely");
                Some(ack)
            }
            Err(e) => {
                warn!(error = %e, "layout not persisted remotely");
                None
            }
        }
    }

    async fn flush(&self) -> Option<Ack> {
        let pending = self.lock().timer.take();
        match pending {
            Some(layout) => self.write(&layout).await,
            None => None,
        }
    }
}
