// libs/notification-cell/src/services/windows.rs
//
// Pure delivery-window rules. All functions take the moment under test as a
// parameter; nothing here reads the wall clock.
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};

use crate::models::{Channel, NotificationPreference};

/// Whether `at` falls inside the recipient's quiet hours. A window whose
/// start is later than its end wraps past midnight.
pub fn is_within_quiet_hours(pref: &NotificationPreference, at: DateTime<Utc>) -> bool {
    let (start, end) = match (pref.quiet_hours_start, pref.quiet_hours_end) {
        (Some(start), Some(end)) => (start, end),
        _ => return false,
    };
    let t = at.time();
    if start <= end {
        t >= start && t < end
    } else {
        t >= start || t < end
    }
}

pub fn is_active_day(pref: &NotificationPreference, at: DateTime<Utc>) -> bool {
    let day = at.weekday().number_from_monday() as u8;
    pref.active_days.contains(&day)
}

/// A channel is open when it is enabled, the weekday is active, and the
/// moment is outside quiet hours.
pub fn channel_is_open(pref: &NotificationPreference, channel: Channel, at: DateTime<Utc>) -> bool {
    pref.channel_enabled(channel) && is_active_day(pref, at) && !is_within_quiet_hours(pref, at)
}

/// First channel in priority order that is open right now.
pub fn first_open_channel(
    pref: &NotificationPreference,
    priority: &[Channel],
    at: DateTime<Utc>,
) -> Option<Channel> {
    priority
        .iter()
        .copied()
        .find(|channel| channel_is_open(pref, *channel, at))
}

/// Earliest instant at or after `from` at which some enabled channel is open.
/// Returns `None` when no window exists within a week's scan, which callers
/// treat as "no deliverable channel, ever".
pub fn next_open_time(
    pref: &NotificationPreference,
    priority: &[Channel],
    from: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if !pref.any_channel_enabled(priority) {
        return None;
    }
    if first_open_channel(pref, priority, from).is_some() {
        return Some(from);
    }

    // Delivery legality only changes at day boundaries and quiet-hour edges,
    // so scanning those boundary instants over the next week is exhaustive.
    let mut boundaries = Vec::new();
    for offset in 0..=7 {
        let date = (from + Duration::days(offset)).date_naive();
        boundaries.push(date.and_time(NaiveTime::MIN).and_utc());
        if let Some(end) = pref.quiet_hours_end {
            boundaries.push(date.and_time(end).and_utc());
        }
    }
    boundaries.sort();

    boundaries
        .into_iter()
        .filter(|t| *t > from)
        .find(|t| first_open_channel(pref, priority, *t).is_some())
}
