//! Sliding-window spend accounting.
//!
//! Each agent's approved spend is kept as timestamped entries and summed over
//! the trailing window, so there is no fixed-clock reset to game.

use aegis_core::normalize_address;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

/// Slack for floating-point accumulation when comparing against a limit.
const LIMIT_EPSILON: f64 = 1e-9;

/// One agent's approved spend within the window.
#[derive(Debug, Default)]
pub struct SpendWindow {
    entries: VecDeque<(DateTime<Utc>, f64)>,
}

impl SpendWindow {
    fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        let cutoff = now - window;
        while self.entries.front().is_some_and(|(at, _)| *at <= cutoff) {
            self.entries.pop_front();
        }
    }

    /// Approved value in the trailing `window` ending at `now`.
    pub fn total(&mut self, now: DateTime<Utc>, window: Duration) -> f64 {
        self.prune(now, window);
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// Whether `value` more stays within `limit`.
    pub fn fits(&mut self, value: f64, limit: f64, now: DateTime<Utc>, window: Duration) -> bool {
        self.total(now, window) + value <= limit + LIMIT_EPSILON
    }

    /// No spend left inside the window.
    fn is_idle(&mut self, now: DateTime<Utc>, window: Duration) -> bool {
        self.prune(now, window);
        self.entries.is_empty()
    }

    /// Reserve `value` at `now`. Zero-value entries are not kept.
    pub fn record(&mut self, value: f64, now: DateTime<Utc>) {
        if value > 0.0 {
            self.entries.push_back((now, value));
        }
    }
}

/// Per-agent spend windows.
///
/// Callers lock an agent's window for the whole read-compare-add sequence,
/// which serializes evaluations of the same agent without blocking others.
#[derive(Debug)]
pub struct SpendLedger {
    window: Duration,
    agents: RwLock<HashMap<String, Arc<Mutex<SpendWindow>>>>,
}

impl SpendLedger {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            agents: RwLock::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// The agent's window, created empty on first use.
    ///
    /// Creating a window also sweeps windows that have gone idle, so the
    /// map only holds agents with spend inside the window.
    pub fn window_for(&self, agent: &str) -> Arc<Mutex<SpendWindow>> {
        let agent = normalize_address(agent);
        if let Some(w) = self.agents.read().unwrap().get(&agent) {
            return w.clone();
        }
        let mut agents = self.agents.write().unwrap();
        Self::retain_active(&mut agents, Utc::now(), self.window);
        agents.entry(agent).or_default().clone()
    }

    /// Drop windows with no spend left at `now`. Returns how many went.
    pub fn sweep_idle(&self, now: DateTime<Utc>) -> usize {
        let mut agents = self.agents.write().unwrap();
        let before = agents.len();
        Self::retain_active(&mut agents, now, self.window);
        before - agents.len()
    }

    fn retain_active(
        agents: &mut HashMap<String, Arc<Mutex<SpendWindow>>>,
        now: DateTime<Utc>,
        window: Duration,
    ) {
        // A window someone else holds may be mid-evaluation; keep it.
        agents.retain(|_, w| {
            Arc::strong_count(w) > 1
                || w.try_lock().map_or(true, |mut w| !w.is_idle(now, window))
        });
    }

    /// Number of agents currently tracked.
    pub fn len(&self) -> usize {
        self.agents.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approved value for `agent` in the window ending at `now`.
    pub fn spent(&self, agent: &str, now: DateTime<Utc>) -> f64 {
        let agent = normalize_address(agent);
        let handle = self.agents.read().unwrap().get(&agent).cloned();
        handle.map_or(0.0, |w| w.lock().unwrap().total(now, self.window))
    }
}

impl Default for SpendLedger {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}
