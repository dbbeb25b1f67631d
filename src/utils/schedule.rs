//! Translation of human-friendly schedules into systemd `OnCalendar` expressions

use crate::error::{BackupError, Result};

/// Convert a schedule such as `daily 02:00` or `weekly sun 03:00` into a
/// systemd calendar expression.
///
/// The input is trimmed and lowercased first. Anything containing `*` or `:`
/// that is not a recognised phrase is assumed to already be calendar syntax
/// and is returned as-is.
pub fn parse_schedule(schedule: &str) -> Result<String> {
    let normalized = schedule.trim().to_lowercase();

    let fixed = match normalized.as_str() {
        "hourly" => Some("*-*-* *:00:00"),
        "daily" | "daily 02:00" => Some("*-*-* 02:00:00"),
        "weekly" => Some("Mon *-*-* 02:00:00"),
        "weekly sun 03:00" => Some("Sun *-*-* 03:00:00"),
        "monthly" => Some("*-*-01 02:00:00"),
        _ => None,
    };
    if let Some(calendar) = fixed {
        return Ok(calendar.to_string());
    }

    if let Some(time) = normalized.strip_prefix("daily ") {
        return Ok(format!("*-*-* {}:00", time));
    }

    if let Some(rest) = normalized.strip_prefix("weekly ") {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        if let [day, time] = parts.as_slice() {
            return Ok(format!("{} *-*-* {}:00", title_case(day), time));
        }
    }

    if normalized.contains('*') || normalized.contains(':') {
        return Ok(normalized);
    }

    Err(BackupError::Validation(format!(
        "invalid schedule format: {}",
        normalized
    )))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
