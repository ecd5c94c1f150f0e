// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network condition monitor.
//!
//! Turns flapping connectivity signals into a debounced status:
//!
//! - a negative signal (host offline event, failed or timed-out probe)
//!   moves to `unstable` and arms a one-shot grace timer
//! - the timer firing without recovery moves to `offline`
//! - any positive signal moves straight to `online` and disarms the timer
//!
//! Probes never overlap: a probe requested while one is in flight is
//! skipped. Listener delivery is serialized, so subscribers observe
//! transitions in order and exactly once. Listeners may read the monitor
//! but must not feed signals back into it synchronously.

mod probe;

pub use probe::{HttpProbe, Probe, ProbeError};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bs_core::{NetworkDecision, NetworkQuality, NetworkStatus};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::notify::{Listeners, Subscription};
use crate::runtime;

/// Timing knobs for the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Interval between periodic probes.
    pub check_interval: Duration,
    /// Upper bound on a single probe.
    pub probe_timeout: Duration,
    /// Time spent `unstable` before declaring `offline`.
    pub grace_period: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            check_interval: Duration::from_secs(3),
            probe_timeout: Duration::from_secs(7),
            grace_period: Duration::from_secs(12),
        }
    }
}

struct MonitorState {
    status: NetworkStatus,
    /// Bumped by every positive signal; a grace timer only fires for the
    /// epoch it was armed in.
    grace_epoch: u64,
    grace_armed: bool,
    last_rtt: Option<Duration>,
}

struct Inner {
    config: MonitorConfig,
    probe: Arc<dyn Probe>,
    state: Mutex<MonitorState>,
    /// Held across transition + delivery.
    emit: Mutex<()>,
    listeners: Listeners<NetworkStatus>,
    probe_in_flight: AtomicBool,
    started: AtomicBool,
    cancel: CancellationToken,
}

/// Debounced connectivity monitor. Cloning shares the same instance.
#[derive(Clone)]
pub struct NetworkMonitor {
    inner: Arc<Inner>,
}

/// Clears the in-flight flag even if the probe future is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl NetworkMonitor {
    /// Creates a monitor in the `checking` state. Nothing runs until `init`.
    pub fn new(config: MonitorConfig, probe: Arc<dyn Probe>) -> Self {
        NetworkMonitor {
            inner: Arc::new(Inner {
                config,
                probe,
                state: Mutex::new(MonitorState {
                    status: NetworkStatus::Checking,
                    grace_epoch: 0,
                    grace_armed: false,
                    last_rtt: None,
                }),
                emit: Mutex::new(()),
                listeners: Listeners::new(),
                probe_in_flight: AtomicBool::new(false),
                started: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Starts periodic probing; the first probe runs immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(&self) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            warn!("network monitor already initialized");
            return;
        }
        info!(
            check_interval_ms = self.inner.config.check_interval.as_millis() as u64,
            grace_period_ms = self.inner.config.grace_period.as_millis() as u64,
            "starting network monitor"
        );
        let monitor = self.clone();
        runtime::spawn("network-monitor", async move { monitor.run().await });
    }

    /// Stops periodic probing and any pending grace timer.
    pub fn cleanup(&self) {
        debug!("stopping network monitor");
        self.inner.cancel.cancel();
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.inner.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.inner.cancel.cancelled() => break,
                _ = ticker.tick() => self.force_check(),
            }
        }
    }

    pub fn status(&self) -> NetworkStatus {
        self.lock_state().status
    }

    /// Blocking decision derived from one status read.
    pub fn decision(&self) -> NetworkDecision {
        NetworkDecision::from_status(self.status())
    }

    /// Quality of the link as of the last successful probe.
    pub fn quality(&self) -> NetworkQuality {
        self.lock_state().last_rtt.map(NetworkQuality::from_rtt).unwrap_or(NetworkQuality::Unknown)
    }

    /// Registers `listener`, delivering the current status right away.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&NetworkStatus) + Send + Sync + 'static,
    {
        let _serial = self.inner.emit.lock().unwrap_or_else(|e| e.into_inner());
        listener(&self.status());
        self.inner.listeners.subscribe(listener)
    }

    /// Host reported connectivity.
    pub fn handle_online(&self) {
        self.positive_signal(None);
    }

    /// Host reported loss of connectivity.
    pub fn handle_offline(&self) {
        self.negative_signal("host offline event");
    }

    /// Probes in the background, bypassing the timer.
    pub fn force_check(&self) {
        let monitor = self.clone();
        runtime::spawn("network-probe", async move {
            monitor.check_now().await;
        });
    }

    /// Runs one probe inline and returns the resulting status.
    ///
    /// Skipped (returning the current status) if a probe is already running.
    /// Probe errors and timeouts become negative signals and never surface.
    pub async fn check_now(&self) -> NetworkStatus {
        if self.inner.probe_in_flight.swap(true, Ordering::AcqRel) {
            debug!("probe already in flight, skipping");
            return self.status();
        }
        let _guard = InFlightGuard(&self.inner.probe_in_flight);

        let started = Instant::now();
        let timeout = self.inner.config.probe_timeout;
        let outcome = tokio::time::timeout(timeout, self.inner.probe.probe()).await;
        match outcome {
            Ok(Ok(())) => self.positive_signal(Some(started.elapsed())),
            Ok(Err(e)) => self.negative_signal(&format!("probe failed: {}", e)),
            Err(_) => self.negative_signal("probe timed out"),
        }
        self.status()
    }

    fn positive_signal(&self, rtt: Option<Duration>) {
        let _serial = self.inner.emit.lock().unwrap_or_else(|e| e.into_inner());
        let previous = {
            let mut state = self.lock_state();
            state.grace_epoch += 1;
            state.grace_armed = false;
            if rtt.is_some() {
                state.last_rtt = rtt;
            }
            std::mem::replace(&mut state.status, NetworkStatus::Online)
        };
        if previous != NetworkStatus::Online {
            info!(from = %previous, "network online");
            self.inner.listeners.emit(&NetworkStatus::Online);
        }
    }

    fn negative_signal(&self, reason: &str) {
        let _serial = self.inner.emit.lock().unwrap_or_else(|e| e.into_inner());
        let (previous, arm_epoch) = {
            let mut state = self.lock_state();
            if state.status == NetworkStatus::Offline {
                debug!(reason, "negative signal while offline");
                return;
            }
            let arm_epoch = if state.grace_armed {
                None
            } else {
                state.grace_armed = true;
                Some(state.grace_epoch)
            };
            (std::mem::replace(&mut state.status, NetworkStatus::Unstable), arm_epoch)
        };
        if let Some(epoch) = arm_epoch {
            self.arm_grace_timer(epoch);
        }
        if previous != NetworkStatus::Unstable {
            warn!(reason, from = %previous, "network unstable");
            self.inner.listeners.emit(&NetworkStatus::Unstable);
        }
    }

    fn arm_grace_timer(&self, epoch: u64) {
        let monitor = self.clone();
        let grace = self.inner.config.grace_period;
        runtime::spawn("network-grace-timer", async move {
            tokio::select! {
                _ = monitor.inner.cancel.cancelled() => {}
                _ = tokio::time::sleep(grace) => monitor.grace_elapsed(epoch),
            }
        });
    }

    fn grace_elapsed(&self, epoch: u64) {
        let _serial = self.inner.emit.lock().unwrap_or_else(|e| e.into_inner());
        {
            let mut state = self.lock_state();
            if state.grace_epoch != epoch || state.status != NetworkStatus::Unstable {
                return;
            }
            state.status = NetworkStatus::Offline;
            state.grace_armed = false;
        }
        let grace_period_ms = self.inner.config.grace_period.as_millis() as u64;
        warn!(grace_period_ms, "network offline");
        self.inner.listeners.emit(&NetworkStatus::Offline);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
