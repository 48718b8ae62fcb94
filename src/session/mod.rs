//! Per-conversation session state — whitelist and sliding-window counters.
//!
//! A `SessionContext` is constructed per conversation and threaded
//! explicitly through every protocol call; nothing is process-global.
//! Unlocking is one-way: a tool stays whitelisted until the session is
//! dropped. Call counters prune lazily on every read and write, so an
//! entry never outlives its window by more than one access.

use crate::types::SessionId;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Mutable state for one conversation.
#[derive(Debug)]
pub struct SessionContext {
    session_id: SessionId,
    whitelisted_tools: HashSet<String>,
    viewed_tools: HashSet<String>,
    viewed_tags: HashSet<String>,
    /// counter key (e.g. `details:solve_kreis_umfang`) → call timestamps
    call_log: HashMap<String, VecDeque<Instant>>,
    window: Duration,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(60))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            session_id: SessionId::new(),
            whitelisted_tools: HashSet::new(),
            viewed_tools: HashSet::new(),
            viewed_tags: HashSet::new(),
            call_log: HashMap::new(),
            window,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Unlock a tool for execution. Idempotent; there is no revoke.
    pub fn unlock(&mut self, tool_name: &str) {
        if self.whitelisted_tools.insert(tool_name.to_string()) {
            tracing::debug!(session = %self.session_id, tool = tool_name, "tool unlocked");
        }
    }

    pub fn is_unlocked(&self, tool_name: &str) -> bool {
        self.whitelisted_tools.contains(tool_name)
    }

    /// Tools unlocked so far, sorted.
    pub fn whitelisted(&self) -> Vec<String> {
        let mut names: Vec<String> = self.whitelisted_tools.iter().cloned().collect();
        names.sort();
        names
    }

    pub fn mark_viewed_tool(&mut self, tool_name: &str) {
        self.viewed_tools.insert(tool_name.to_string());
    }

    pub fn mark_viewed_tags(&mut self, tags: &[String]) {
        for tag in tags {
            self.viewed_tags.insert(tag.clone());
        }
    }

    pub fn viewed_tools(&self) -> &HashSet<String> {
        &self.viewed_tools
    }

    /// Record a call under a counter key and return the call count within
    /// the trailing window, including this one.
    pub fn record_call(&mut self, key: &str) -> usize {
        self.record_call_at(key, Instant::now())
    }

    /// Calls within the trailing window, without recording one.
    pub fn count_in_window(&mut self, key: &str) -> usize {
        self.count_in_window_at(key, Instant::now())
    }

    // Instant-injected variants so tests can step time deterministically.

    pub(crate) fn record_call_at(&mut self, key: &str, now: Instant) -> usize {
        let window = self.window;
        let log = self.call_log.entry(key.to_string()).or_default();
        prune(log, now, window);
        log.push_back(now);
        log.len()
    }

    pub(crate) fn count_in_window_at(&mut self, key: &str, now: Instant) -> usize {
        let window = self.window;
        match self.call_log.get_mut(key) {
            Some(log) => {
                prune(log, now, window);
                log.len()
            }
            None => 0,
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

fn prune(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = log.front() {
        if now.duration_since(oldest) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}
