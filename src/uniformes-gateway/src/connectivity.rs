//! Process-wide reachability tracking.
//!
//! Every gateway call reports exactly once: `true` whenever any HTTP status
//! came back, `false` when no response was obtained. The online flag is
//! edge-triggered, so subscribers only wake when it flips; the check
//! timestamp is refreshed on every report.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::constants::HEALTH_PATH;

/// Snapshot of reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityState {
    pub is_online: bool,
    /// When the last report arrived; `None` until the first one.
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            is_online: true,
            last_checked_at: None,
        }
    }
}

/// Reachability flag shared by every gateway call.
#[derive(Debug)]
pub struct ConnectivityTracker {
    state: watch::Sender<ConnectivityState>,
    reports: AtomicU64,
}

impl Default for ConnectivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityTracker {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectivityState::default());
        Self {
            state,
            reports: AtomicU64::new(0),
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().is_online
    }

    /// Number of reports received so far.
    pub fn report_count(&self) -> u64 {
        self.reports.load(Ordering::SeqCst)
    }

    /// Receiver that is notified only when `is_online` flips.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    /// Record the outcome of a network attempt. Returns true if the online
    /// flag changed.
    pub fn report(&self, success: bool) -> bool {
        self.reports.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let changed = self.state.send_if_modified(|state| {
            let changed = state.is_online != success;
            *state = ConnectivityState {
                is_online: success,
                last_checked_at: Some(now),
            };
            changed
        });

        if changed {
            if success {
                info!("Backend reachable again");
            } else {
                warn!("Backend unreachable, switching to offline");
            }
        }
        changed
    }

    /// Probe `GET <base>/health` and report the outcome. Only a 2xx counts
    /// as reachable.
    pub async fn probe(&self, http: &reqwest::Client, base_url: &str) -> bool {
        let url = format!("{}{}", base_url.trim_end_matches('/'), HEALTH_PATH);
        let reachable = match http.get(&url).send().await {
            Ok(resp) => {
                debug!(status = %resp.status(), "Health probe answered");
                resp.status().is_success()
            }
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                false
            }
        };
        self.report(reachable);
        reachable
    }
}
