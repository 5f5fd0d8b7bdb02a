//! Serial session multiplexer.
//!
//! [`SerialSessionManager`] owns at most one open link per device id. The
//! first viewer to attach opens the device (and fixes its baud rate); later
//! viewers share it. When the last viewer detaches the link stays open for a
//! grace period so a reconnecting viewer picks up where it left off.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::frame::ServerFrame;
use crate::link::{LinkEvent, LinkWriter, PortInfo, SerialError, SerialOpener};
use crate::replay::{ReplayBuffer, DEFAULT_REPLAY_BYTES};

/// Channel on which a viewer receives its frames.
pub type ViewerSender = mpsc::UnboundedSender<ServerFrame>;

/// Lifecycle parameters.
#[derive(Debug, Clone, Copy)]
pub struct SerialConfig {
    /// How long an idle session outlives its last viewer.
    pub grace_period: Duration,
    /// Replay history budget in bytes.
    pub replay_bytes: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
            replay_bytes: DEFAULT_REPLAY_BYTES,
        }
    }
}

/// Proof of attachment, returned by [`SerialSessionManager::attach`] and
/// consumed by [`SerialSessionManager::detach`].
#[derive(Debug)]
pub struct ViewerHandle {
    device_id: String,
    session_id: u64,
    viewer_id: u64,
}

impl ViewerHandle {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

struct Session {
    id: u64,
    baud_rate: u32,
    state: Mutex<SessionState>,
    /// Cancelled when the session is torn down; stops the pump task.
    closed: CancellationToken,
}

struct SessionState {
    viewers: HashMap<u64, ViewerSender>,
    history: ReplayBuffer,
    writer: Box<dyn LinkWriter>,
    /// Pending idle close, if the session has no viewers.
    grace: Option<CancellationToken>,
}

impl SessionState {
    fn broadcast(&self, frame: &ServerFrame) {
        for tx in self.viewers.values() {
            // A closed receiver is a viewer on its way out; detach cleans up.
            let _ = tx.send(frame.clone());
        }
    }
}

struct Inner {
    opener: Arc<dyn SerialOpener>,
    config: SerialConfig,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    /// Serializes opens of the same device.
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    next_id: AtomicU64,
}

/// Shared handle to the serial sessions. Cheap to clone.
#[derive(Clone)]
pub struct SerialSessionManager {
    inner: Arc<Inner>,
}

impl SerialSessionManager {
    pub fn new(opener: Arc<dyn SerialOpener>, config: SerialConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                opener,
                config,
                sessions: Mutex::new(HashMap::new()),
                gates: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Attach a viewer to `device_id`, opening the device if needed.
    ///
    /// The viewer first receives the replay history (if any), then a
    /// `connected` frame, then live data. `baud_rate` only matters when this
    /// call opens the device. Opening one device never holds up calls for
    /// another.
    pub async fn attach(&self, device_id: &str, baud_rate: u32, viewer: ViewerSender) -> Result<ViewerHandle, SerialError> {
        loop {
            let session = self.open_session(device_id, baud_rate).await?;

            let mut state = session.state.lock().await;
            // Torn down by an idle close between lookup and here.
            if session.closed.is_cancelled() {
                continue;
            }
            if let Some(grace) = state.grace.take() {
                grace.cancel();
                tracing::debug!(device = device_id, "Pending serial close cancelled");
            }
            if !state.history.is_empty() {
                let _ = viewer.send(ServerFrame::History {
                    data: state.history.as_str().to_string(),
                });
            }
            let _ = viewer.send(ServerFrame::Connected {
                serial_id: device_id.to_string(),
            });
            let viewer_id = self.next_id();
            state.viewers.insert(viewer_id, viewer);

            return Ok(ViewerHandle {
                device_id: device_id.to_string(),
                session_id: session.id,
                viewer_id,
            });
        }
    }

    /// Detach a viewer. The last one out starts the grace timer.
    pub async fn detach(&self, handle: ViewerHandle) {
        let Some(session) = self.session(&handle.device_id, handle.session_id).await else {
            return;
        };

        let mut state = session.state.lock().await;
        state.viewers.remove(&handle.viewer_id);
        if !state.viewers.is_empty() || state.grace.is_some() {
            return;
        }

        let grace = CancellationToken::new();
        state.grace = Some(grace.clone());
        drop(state);

        let this = self.clone();
        let period = self.inner.config.grace_period;
        tokio::spawn(async move {
            tokio::select! {
                _ = grace.cancelled() => {}
                _ = tokio::time::sleep(period) => {
                    this.close_if_idle(&handle.device_id, handle.session_id).await;
                }
            }
        });
    }

    /// Write to the device. Returns `false` when it is not open or the
    /// write failed.
    pub async fn write(&self, device_id: &str, data: &str) -> bool {
        let session = {
            let sessions = self.inner.sessions.lock().await;
            match sessions.get(device_id) {
                Some(session) => Arc::clone(session),
                None => return false,
            }
        };

        let mut state = session.state.lock().await;
        match state.writer.write(data.as_bytes()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(device = device_id, error = %e, "Serial write failed");
                false
            }
        }
    }

    pub async fn is_connected(&self, device_id: &str) -> bool {
        self.inner.sessions.lock().await.contains_key(device_id)
    }

    pub async fn viewer_count(&self, device_id: &str) -> usize {
        let session = self.inner.sessions.lock().await.get(device_id).cloned();
        match session {
            Some(session) => session.state.lock().await.viewers.len(),
            None => 0,
        }
    }

    pub async fn list_ports(&self) -> Result<Vec<PortInfo>, SerialError> {
        self.inner.opener.list_ports().await
    }

    /// Close every session, telling attached viewers. Used at shutdown.
    pub async fn close_all(&self) {
        let sessions: Vec<(String, Arc<Session>)> = self.inner.sessions.lock().await.drain().collect();
        for (device_id, session) in sessions {
            let mut state = session.state.lock().await;
            state.broadcast(&ServerFrame::Disconnected);
            teardown(&session, &mut state);
            tracing::info!(device = %device_id, "Serial session closed at shutdown");
        }
    }

    // ---- private helpers ----

    /// The live session for `device_id`, opening the device if there is none.
    ///
    /// The open runs under the device's own gate, not the session map lock,
    /// so concurrent attaches to one device share a single open while other
    /// devices stay usable.
    async fn open_session(&self, device_id: &str, baud_rate: u32) -> Result<Arc<Session>, SerialError> {
        if let Some(session) = self.live_session(device_id, baud_rate).await {
            return Ok(session);
        }

        let gate = Arc::clone(self.inner.gates.lock().await.entry(device_id.to_string()).or_default());
        let _opening = gate.lock().await;

        // Someone else may have opened it while we waited for the gate.
        if let Some(session) = self.live_session(device_id, baud_rate).await {
            return Ok(session);
        }

        let link = self.inner.opener.open(device_id, baud_rate).await?;
        let session = Arc::new(Session {
            id: self.next_id(),
            baud_rate,
            state: Mutex::new(SessionState {
                viewers: HashMap::new(),
                history: ReplayBuffer::new(self.inner.config.replay_bytes),
                writer: link.writer,
                grace: None,
            }),
            closed: CancellationToken::new(),
        });
        // Registered before the pump starts, so a device that closes at once
        // is removed again rather than left behind.
        self.inner
            .sessions
            .lock()
            .await
            .insert(device_id.to_string(), Arc::clone(&session));
        tokio::spawn(pump(
            Arc::clone(&self.inner),
            device_id.to_string(),
            Arc::clone(&session),
            link.incoming,
        ));
        tracing::info!(device = device_id, baud_rate, "Serial session opened");
        Ok(session)
    }

    async fn live_session(&self, device_id: &str, baud_rate: u32) -> Option<Arc<Session>> {
        let session = self.inner.sessions.lock().await.get(device_id).cloned()?;
        if session.baud_rate != baud_rate {
            tracing::debug!(
                device = device_id,
                open_baud = session.baud_rate,
                requested_baud = baud_rate,
                "Reusing open serial session at its original baud rate",
            );
        }
        Some(session)
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn session(&self, device_id: &str, session_id: u64) -> Option<Arc<Session>> {
        self.inner
            .sessions
            .lock()
            .await
            .get(device_id)
            .filter(|session| session.id == session_id)
            .cloned()
    }

    async fn close_if_idle(&self, device_id: &str, session_id: u64) {
        let mut sessions = self.inner.sessions.lock().await;
        let Some(session) = sessions.get(device_id).filter(|s| s.id == session_id).cloned() else {
            return;
        };

        let mut state = session.state.lock().await;
        if !state.viewers.is_empty() {
            return;
        }
        sessions.remove(device_id);
        teardown(&session, &mut state);
        tracing::info!(device = device_id, "Idle serial session closed");
    }
}

fn teardown(session: &Session, state: &mut SessionState) {
    if let Some(grace) = state.grace.take() {
        grace.cancel();
    }
    state.viewers.clear();
    state.writer.close();
    session.closed.cancel();
}

/// Forward device events to the session's viewers until the session is
/// torn down or the device closes.
async fn pump(inner: Arc<Inner>, device_id: String, session: Arc<Session>, mut incoming: mpsc::Receiver<LinkEvent>) {
    loop {
        let event = tokio::select! {
            _ = session.closed.cancelled() => return,
            event = incoming.recv() => event,
        };

        match event {
            Some(LinkEvent::Data(data)) => {
                let mut state = session.state.lock().await;
                state.history.push(&data);
                state.broadcast(&ServerFrame::Data { data });
            }
            Some(LinkEvent::Error(error)) => {
                tracing::warn!(device = %device_id, %error, "Serial read error");
                session.state.lock().await.broadcast(&ServerFrame::Error { error });
            }
            Some(LinkEvent::Closed) | None => break,
        }
    }

    // The device went away on its own.
    let mut sessions = inner.sessions.lock().await;
    if sessions.get(&device_id).is_some_and(|s| s.id == session.id) {
        sessions.remove(&device_id);
    }
    drop(sessions);

    let mut state = session.state.lock().await;
    state.broadcast(&ServerFrame::Disconnected);
    teardown(&session, &mut state);
    tracing::info!(device = %device_id, "Serial device closed");
}
