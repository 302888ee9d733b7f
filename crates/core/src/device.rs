//! User-agent device classification.

use regex::Regex;
use std::sync::LazyLock;

/// Pattern for the analytics device-type bucket. Note that iPad matches
/// this alternation before the Tablet check ever runs, so iPads are
/// recorded as Mobile; downstream reporting relies on that bucketing.
static MOBILE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Mobile|Android|iPhone|iPad").expect("invalid mobile pattern"));

static TABLET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Tablet|iPad").expect("invalid tablet pattern"));

/// Coarse device label stored on the session row.
///
/// Plain substring checks; anything that does not self-identify is Unknown.
pub fn device_info(user_agent: Option<&str>) -> String {
    let Some(ua) = user_agent else {
        return "Unknown".to_string();
    };

    if ua.contains("Mobile") {
        "Mobile".to_string()
    } else if ua.contains("Tablet") {
        "Tablet".to_string()
    } else if ua.contains("Desktop") {
        "Desktop".to_string()
    } else {
        "Unknown".to_string()
    }
}

/// Device-type bucket stored on the analytics row.
pub fn device_type(user_agent: Option<&str>) -> String {
    let Some(ua) = user_agent else {
        return "Unknown".to_string();
    };

    if MOBILE_REGEX.is_match(ua) {
        "Mobile".to_string()
    } else if TABLET_REGEX.is_match(ua) {
        "Tablet".to_string()
    } else {
        "Desktop".to_string()
    }
}
