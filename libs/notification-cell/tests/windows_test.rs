// libs/notification-cell/tests/windows_test.rs
use chrono::{NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use notification_cell::models::{Channel, NotificationPreference};
use notification_cell::services::windows::{
    channel_is_open, first_open_channel, is_within_quiet_hours, next_open_time,
};

const PRIORITY: [Channel; 4] = [Channel::Sms, Channel::Email, Channel::InApp, Channel::Push];

fn pref() -> NotificationPreference {
    NotificationPreference::default_for(Uuid::new_v4())
}

fn sms_only_with_quiet_hours() -> NotificationPreference {
    let mut pref = pref();
    pref.email_enabled = false;
    pref.in_app_enabled = false;
    pref.push_enabled = false;
    pref.quiet_hours_start = Some(NaiveTime::from_hms_opt(22, 0, 0).unwrap());
    pref.quiet_hours_end = Some(NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    pref
}

// 2025-06-18 is a Wednesday
fn at(day: u32, hour: u32, minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, minute, 0).unwrap()
}

#[test]
fn quiet_hours_wrap_past_midnight() {
    let pref = sms_only_with_quiet_hours();

    assert!(is_within_quiet_hours(&pref, at(18, 23, 0)));
    assert!(is_within_quiet_hours(&pref, at(18, 7, 59)));
    assert!(!is_within_quiet_hours(&pref, at(18, 8, 0)));
    assert!(!is_within_quiet_hours(&pref, at(18, 12, 0)));
    assert!(is_within_quiet_hours(&pref, at(18, 22, 0)));
}

#[test]
fn non_wrapping_quiet_hours_cover_only_the_window() {
    let mut pref = pref();
    pref.quiet_hours_start = Some(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    pref.quiet_hours_end = Some(NaiveTime::from_hms_opt(14, 0, 0).unwrap());

    assert!(is_within_quiet_hours(&pref, at(18, 13, 0)));
    assert!(!is_within_quiet_hours(&pref, at(18, 11, 0)));
    assert!(!is_within_quiet_hours(&pref, at(18, 14, 0)));
}

#[test]
fn disabled_channels_are_never_open() {
    let mut pref = pref();
    pref.sms_enabled = false;

    assert!(!channel_is_open(&pref, Channel::Sms, at(18, 12, 0)));
    assert!(channel_is_open(&pref, Channel::Email, at(18, 12, 0)));
}

#[test]
fn first_open_channel_follows_priority_order() {
    let pref = pref();
    assert_eq!(first_open_channel(&pref, &PRIORITY, at(18, 12, 0)), Some(Channel::Sms));

    let mut no_sms = self::pref();
    no_sms.sms_enabled = false;
    assert_eq!(
        first_open_channel(&no_sms, &PRIORITY, at(18, 12, 0)),
        Some(Channel::Email)
    );
}

#[test]
fn quiet_hours_defer_to_the_morning_boundary() {
    let pref = sms_only_with_quiet_hours();
    let late_evening = at(18, 23, 0);

    assert_eq!(first_open_channel(&pref, &PRIORITY, late_evening), None);

    let next = next_open_time(&pref, &PRIORITY, late_evening).unwrap();
    assert_eq!(next, at(19, 8, 0));
}

#[test]
fn open_moments_return_immediately() {
    let pref = sms_only_with_quiet_hours();
    let midday = at(18, 12, 0);

    assert_eq!(next_open_time(&pref, &PRIORITY, midday), Some(midday));
}

#[test]
fn inactive_days_push_delivery_to_the_next_active_day() {
    let mut pref = pref();
    pref.active_days = vec![4]; // Thursday only

    let wednesday_noon = at(18, 12, 0);
    assert_eq!(first_open_channel(&pref, &PRIORITY, wednesday_noon), None);

    let next = next_open_time(&pref, &PRIORITY, wednesday_noon).unwrap();
    assert_eq!(next, at(19, 0, 0));
}

#[test]
fn fully_disabled_preferences_have_no_window() {
    let mut pref = pref();
    pref.sms_enabled = false;
    pref.email_enabled = false;
    pref.in_app_enabled = false;
    pref.push_enabled = false;

    assert_eq!(next_open_time(&pref, &PRIORITY, at(18, 12, 0)), None);

    let mut no_days = self::pref();
    no_days.active_days = vec![];
    assert_eq!(next_open_time(&no_days, &PRIORITY, at(18, 12, 0)), None);
}
