//! Application-level configuration constants.

// Cooldown escalation
pub const COOLDOWN_SCHEDULE_SECS: [u32; 4] = [30, 60, 180, 300];
pub const RESET_THRESHOLD_MS: u64 = 60 * 60 * 1000;
pub const TICK_MS: u32 = 1000;

// Persisted state keys
pub const KEY_PREFIX: &str = "cooldown";
pub const ATTEMPTS_SUFFIX: &str = "attempts";
pub const UNTIL_SUFFIX: &str = "until";

// DOM contract
pub const CONTAINER_SELECTOR: &str = ".form-box";
pub const SUBMIT_SELECTOR: &str = "button:not([type=button]):not([type=reset])";
pub const DEFAULT_LABEL: &str = "Submit";

// Media replay
pub const REPLAY_MEDIA_ID: &str = "gif";
pub const REPLAY_BUTTON_ID: &str = "replay-btn";
