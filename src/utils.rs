use crate::config::{ATTEMPTS_SUFFIX, KEY_PREFIX, UNTIL_SUFFIX};

/// Coerce a raw stored value into a non-negative integer.
///
/// Stored values are plain strings that anything on the page may have
/// touched, so parsing never fails:
/// - Absent, empty or non-numeric input: `0`
/// - Decimal integers: the value itself (negatives become `0`)
/// - Finite floats such as "1.5" or "2e3": truncated toward zero
///
/// # Examples
/// ```
/// use submit_cooldown::utils::parse_stored_int;
/// assert_eq!(parse_stored_int(Some("42")), 42);
/// assert_eq!(parse_stored_int(Some(" 7 ")), 7);
/// assert_eq!(parse_stored_int(Some("abc")), 0);
/// assert_eq!(parse_stored_int(None), 0);
/// ```
pub fn parse_stored_int(raw: Option<&str>) -> u64 {
    let trimmed = match raw {
        Some(s) => s.trim(),
        None => return 0,
    };
    if trimmed.is_empty() {
        return 0;
    }

    if let Ok(n) = trimmed.parse::<i64>() {
        return u64::try_from(n).unwrap_or(0);
    }

    match trimmed.parse::<f64>() {
        // `as` saturates for values past u64::MAX
        Ok(f) if f.is_finite() && f > 0.0 => f.trunc() as u64,
        _ => 0,
    }
}

/// Storage keys for one form's cooldown state.
///
/// The key-base is `cooldown_<pagePath>_<formAction>`, so two forms only share
/// state when they live on the same path and post to the same destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownKeys {
    pub attempts: String,
    pub until: String,
}

impl CooldownKeys {
    pub fn new(page_path: &str, form_action: &str) -> Self {
        let base = format!("{}_{}_{}", KEY_PREFIX, page_path, form_action);
        Self {
            attempts: format!("{}_{}", base, ATTEMPTS_SUFFIX),
            until: format!("{}_{}", base, UNTIL_SUFFIX),
        }
    }
}

/// Label shown on the control while a cooldown is running.
pub fn wait_label(remaining_secs: i64) -> String {
    format!("Wait {}s", remaining_secs)
}
