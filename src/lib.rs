use log::{debug, info};
use serde::Serialize;
use std::fmt;
use wasm_bindgen::prelude::*;

pub mod config;
pub mod controller;
pub mod countdown;
pub mod dom;
pub mod replay;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;

use config::{COOLDOWN_SCHEDULE_SECS, RESET_THRESHOLD_MS};

/// Persisted per-form cooldown counters.
///
/// `until` is epoch milliseconds; `0` means no cooldown has ever been set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CooldownState {
    pub attempts: u64,
    pub until: u64,
}

/// Escalation schedule plus the idle time after which escalation is forgotten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownPolicy {
    schedule_secs: Vec<u32>,
    reset_threshold_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    EmptySchedule,
    /// Step at the given index is zero seconds long
    ZeroStep(usize),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::EmptySchedule => write!(f, "Cooldown schedule cannot be empty"),
            PolicyError::ZeroStep(idx) => {
                write!(f, "Cooldown schedule step {} must be at least 1 second", idx)
            }
        }
    }
}

impl std::error::Error for PolicyError {}

/// Outcome of registering one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    /// Whether the idle threshold wiped the previous attempt count.
    pub reset: bool,
    pub wait_secs: u32,
    pub state: CooldownState,
}

impl CooldownPolicy {
    pub fn new(schedule_secs: Vec<u32>, reset_threshold_ms: u64) -> Result<Self, PolicyError> {
        if schedule_secs.is_empty() {
            return Err(PolicyError::EmptySchedule);
        }
        if let Some(idx) = schedule_secs.iter().position(|&s| s == 0) {
            return Err(PolicyError::ZeroStep(idx));
        }
        Ok(Self {
            schedule_secs,
            reset_threshold_ms,
        })
    }

    pub fn schedule_secs(&self) -> &[u32] {
        &self.schedule_secs
    }

    pub fn reset_threshold_ms(&self) -> u64 {
        self.reset_threshold_ms
    }

    /// Wait applied after a submission made with `attempts` prior attempts.
    /// Holds at the last step once the schedule is exhausted.
    pub fn wait_secs(&self, attempts: u64) -> u32 {
        let last = self.schedule_secs.len() - 1;
        let idx = usize::try_from(attempts).map_or(last, |a| a.min(last));
        self.schedule_secs[idx]
    }

    /// True when a cooldown was recorded and ended longer ago than the threshold.
    pub fn should_reset(&self, last_until: u64, now: u64) -> bool {
        last_until > 0 && now.saturating_sub(last_until) > self.reset_threshold_ms
    }

    /// Apply the reset policy and the schedule to produce the next state.
    pub fn register_submission(&self, prev: CooldownState, now: u64) -> Submission {
        let reset = self.should_reset(prev.until, now);
        let attempts = if reset { 0 } else { prev.attempts };

        let wait_secs = self.wait_secs(attempts);
        let until = now.saturating_add(u64::from(wait_secs) * 1000);

        Submission {
            reset,
            wait_secs,
            state: CooldownState {
                attempts: attempts.saturating_add(1),
                until,
            },
        }
    }
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            schedule_secs: COOLDOWN_SCHEDULE_SECS.to_vec(),
            reset_threshold_ms: RESET_THRESHOLD_MS,
        }
    }
}

/// Whole seconds left until `until`, rounded up. Zero or negative once expired.
pub fn remaining_secs(until: u64, now: u64) -> i64 {
    let diff = i128::from(until) - i128::from(now);
    let secs = if diff > 0 {
        (diff + 999) / 1000
    } else {
        // truncation toward zero is the ceiling for non-positive values
        diff / 1000
    };
    secs.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Read-only view of a form's cooldown, handed to JavaScript for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownSnapshot {
    pub attempts: u64,
    pub until: u64,
    pub remaining_secs: i64,
    pub next_wait_secs: u32,
}

impl CooldownSnapshot {
    pub fn new(policy: &CooldownPolicy, state: CooldownState, now: u64) -> Self {
        let next_attempts = if policy.should_reset(state.until, now) {
            0
        } else {
            state.attempts
        };
        Self {
            attempts: state.attempts,
            until: state.until,
            remaining_secs: remaining_secs(state.until, now).max(0),
            next_wait_secs: policy.wait_secs(next_attempts),
        }
    }
}

/// Attach the cooldown controller to the first qualifying form on the page.
///
/// Safe to call on any page: without a `.form-box` form the call only logs.
#[wasm_bindgen]
pub fn install_cooldown() {
    match dom::install_cooldown() {
        Ok(()) => debug!("Cooldown controller installed"),
        Err(e) => info!("{}", e),
    }
}

/// Wire the replay button to its media element, if both exist on the page.
#[wasm_bindgen]
pub fn install_replay() {
    if let Err(e) = replay::install(config::REPLAY_MEDIA_ID, config::REPLAY_BUTTON_ID) {
        debug!("Replay handler not installed: {}", e);
    }
}

/// Current cooldown state for the given page path and form action.
///
/// # Returns
/// `{ attempts, until, remainingSecs, nextWaitSecs }`, or `null` if
/// serialization fails
#[wasm_bindgen]
pub fn cooldown_snapshot(page_path: &str, form_action: &str) -> JsValue {
    let keys = utils::CooldownKeys::new(page_path, form_action);
    let store = storage::browser_store();
    let state = storage::load_state(store.as_ref(), &keys);
    let now = countdown::Clock::now_ms(&countdown::BrowserClock);
    let snapshot = CooldownSnapshot::new(&CooldownPolicy::default(), state, now);
    serde_wasm_bindgen::to_value(&snapshot).unwrap_or(JsValue::NULL)
}
