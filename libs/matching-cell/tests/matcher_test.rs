// libs/matching-cell/tests/matcher_test.rs
use std::collections::HashSet;

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use cancellation_cell::models::{CancellationEvent, CancellationReason, FillStatus, SlotDetails};
use matching_cell::models::{MatchingError, ScoringWeights};
use matching_cell::services::matcher::MatcherService;
use matching_cell::services::scoring;
use shared_config::AppConfig;
use shared_models::appointment::AppointmentType;
use waitlist_cell::models::{RequestedSlot, Urgency, WaitlistEntry, WaitlistStatus};

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 18, 10, 0, 0).unwrap()
}

fn entry(urgency: Urgency, added_days_ago: i64, provider_id: Option<Uuid>) -> WaitlistEntry {
    WaitlistEntry {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        requested: RequestedSlot {
            date: NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            window_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            window_end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            appointment_type: AppointmentType::Consultation,
            provider_id,
        },
        urgency,
        added_at: now() - Duration::days(added_days_ago),
        status: WaitlistStatus::Waiting,
        contact_attempts: 0,
        last_contact_at: None,
        last_declined_at: None,
        notes: None,
        insurance: None,
        no_show_rate: None,
    }
}

fn slot(provider_id: Uuid) -> CancellationEvent {
    CancellationEvent {
        id: Uuid::new_v4(),
        appointment_id: Uuid::new_v4(),
        original_slot: SlotDetails {
            starts_at: Utc.with_ymd_and_hms(2025, 6, 20, 9, 30, 0).unwrap(),
            duration_minutes: 30,
            appointment_type: AppointmentType::Consultation,
            provider_id,
            accepted_insurance: vec![],
        },
        cancelled_at: now(),
        reason: CancellationReason::PatientCancelled,
        fill_status: FillStatus::Open,
    }
}

fn matcher() -> MatcherService {
    MatcherService::new(&AppConfig::default()).unwrap()
}

// ==============================================================================
// SCORING PROPERTIES
// ==============================================================================

#[test]
fn scoring_is_deterministic() {
    let provider = Uuid::new_v4();
    let slot = slot(provider);
    let entry = entry(Urgency::Routine, 5, Some(provider));
    let weights = ScoringWeights::default().validated().unwrap();

    let first = scoring::score(&slot.original_slot, &entry, &weights, Duration::days(14), now());
    let second = scoring::score(&slot.original_slot, &entry, &weights, Duration::days(14), now());

    assert_eq!(first, second);
    assert!((0.0..=1.0).contains(&first));
}

#[test]
fn longer_wait_never_scores_lower() {
    let provider = Uuid::new_v4();
    let slot = slot(provider);
    let weights = ScoringWeights::default().validated().unwrap();

    let mut previous = -1.0;
    for days in [0, 1, 7, 14, 30] {
        let entry = entry(Urgency::Routine, days, Some(provider));
        let score =
            scoring::score(&slot.original_slot, &entry, &weights, Duration::days(14), now());
        assert!(
            score >= previous,
            "score decreased as wait grew: {} days scored {}",
            days,
            score
        );
        previous = score;
    }
}

#[test]
fn missing_history_sits_at_the_neutral_midpoint() {
    assert_eq!(scoring::history_component(None), 0.5);
    assert_eq!(scoring::history_component(Some(0.0)), 1.0);
    assert_eq!(scoring::history_component(Some(1.0)), 0.0);
    assert!(scoring::history_component(None) > scoring::history_component(Some(0.9)));
}

#[test]
fn insurance_compatibility_is_graded() {
    let provider = Uuid::new_v4();
    let mut restricted = slot(provider);
    restricted.original_slot.accepted_insurance = vec!["Acme Health".to_string()];

    let mut covered = entry(Urgency::Routine, 1, None);
    covered.insurance = Some("acme health".to_string());
    let mut uncovered = entry(Urgency::Routine, 1, None);
    uncovered.insurance = Some("Other Mutual".to_string());
    let unknown = entry(Urgency::Routine, 1, None);

    assert_eq!(scoring::insurance_component(&restricted.original_slot, &covered), 1.0);
    assert_eq!(scoring::insurance_component(&restricted.original_slot, &uncovered), 0.0);
    assert_eq!(scoring::insurance_component(&restricted.original_slot, &unknown), 0.5);

    let open = slot(provider);
    assert_eq!(scoring::insurance_component(&open.original_slot, &uncovered), 1.0);
}

// ==============================================================================
// WEIGHT VALIDATION
// ==============================================================================

#[test]
fn weights_not_summing_to_one_are_renormalized() {
    let weights = ScoringWeights {
        urgency: 0.6,
        wait_time: 0.45,
        history: 0.3,
        insurance: 0.15,
    }
    .validated()
    .unwrap();

    let sum = weights.urgency + weights.wait_time + weights.history + weights.insurance;
    assert!((sum - 1.0).abs() < 1e-9);
    assert!((weights.urgency - 0.4).abs() < 1e-9);
}

#[test]
fn out_of_range_weights_are_rejected() {
    let negative = ScoringWeights {
        urgency: -0.1,
        wait_time: 0.5,
        history: 0.3,
        insurance: 0.3,
    };
    assert_matches!(negative.validated(), Err(MatchingError::InvalidWeights(_)));

    let all_zero = ScoringWeights {
        urgency: 0.0,
        wait_time: 0.0,
        history: 0.0,
        insurance: 0.0,
    };
    assert_matches!(all_zero.validated(), Err(MatchingError::InvalidWeights(_)));
}

// ==============================================================================
// MATCHER BEHAVIOR
// ==============================================================================

#[test]
fn urgent_long_waiting_entry_wins_the_slot() {
    let provider_p1 = Uuid::new_v4();
    let provider_p2 = Uuid::new_v4();
    let slot = slot(provider_p1);

    let e1 = entry(Urgency::Urgent, 10, Some(provider_p1));
    let e2 = entry(Urgency::Routine, 1, Some(provider_p1));
    let e3 = entry(Urgency::Routine, 1, Some(provider_p2));
    let pool = vec![e1.clone(), e2.clone(), e3.clone()];

    let matched = matcher()
        .match_slot(&slot, &pool, &HashSet::new(), now())
        .expect("expected a match");

    assert_eq!(matched.entry.id, e1.id);
    assert!(matched.match_reasons.contains(&"Urgent request".to_string()));
}

#[test]
fn excluded_entries_are_skipped() {
    let provider = Uuid::new_v4();
    let slot = slot(provider);

    let e1 = entry(Urgency::Urgent, 10, Some(provider));
    let e2 = entry(Urgency::Routine, 1, Some(provider));
    let pool = vec![e1.clone(), e2.clone()];

    let mut excluded = HashSet::new();
    excluded.insert(e1.id);

    let matched = matcher()
        .match_slot(&slot, &pool, &excluded, now())
        .expect("expected a match");
    assert_eq!(matched.entry.id, e2.id);
}

#[test]
fn empty_filtered_pool_yields_none() {
    let provider = Uuid::new_v4();
    let other = Uuid::new_v4();
    let slot = slot(provider);

    // Wrong provider, wrong type, exhausted attempts: nothing survives
    let wrong_provider = entry(Urgency::Urgent, 3, Some(other));
    let mut wrong_type = entry(Urgency::Urgent, 3, None);
    wrong_type.requested.appointment_type = AppointmentType::Procedure;
    let mut exhausted = entry(Urgency::Urgent, 3, None);
    exhausted.contact_attempts = 3;

    let pool = vec![wrong_provider, wrong_type, exhausted];
    assert!(matcher().match_slot(&slot, &pool, &HashSet::new(), now()).is_none());
}

#[test]
fn equal_scores_break_ties_by_added_at() {
    let provider = Uuid::new_v4();
    let slot = slot(provider);

    // Wait-time weight zeroed so the two entries score identically
    let mut config = AppConfig::default();
    config.urgency_weight = 1.0;
    config.wait_time_weight = 0.0;
    config.history_weight = 0.0;
    config.insurance_weight = 0.0;
    let matcher = MatcherService::new(&config).unwrap();

    let older = entry(Urgency::Routine, 9, Some(provider));
    let newer = entry(Urgency::Routine, 2, Some(provider));

    for pool in [
        vec![older.clone(), newer.clone()],
        vec![newer.clone(), older.clone()],
    ] {
        let ranked = matcher.rank_slot(&slot, &pool, &HashSet::new(), now());
        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[0].entry.id, older.id);
        assert_eq!(ranked[1].entry.id, newer.id);
    }
}

#[test]
fn recently_declined_entries_rest_before_new_offers() {
    let provider = Uuid::new_v4();
    let slot = slot(provider);

    let mut declined = entry(Urgency::Urgent, 10, Some(provider));
    declined.last_declined_at = Some(now() - Duration::hours(2));
    let fresh = entry(Urgency::Routine, 1, Some(provider));
    let pool = vec![declined.clone(), fresh.clone()];

    let matched = matcher()
        .match_slot(&slot, &pool, &HashSet::new(), now())
        .expect("expected a match");
    assert_eq!(matched.entry.id, fresh.id);

    // After the contact interval the declined entry competes again
    let later = now() + Duration::hours(23);
    let matched = matcher()
        .match_slot(&slot, &pool, &HashSet::new(), later)
        .expect("expected a match");
    assert_eq!(matched.entry.id, declined.id);
}

#[test]
fn matcher_does_not_mutate_its_inputs() {
    let provider = Uuid::new_v4();
    let slot = slot(provider);
    let e1 = entry(Urgency::Urgent, 10, Some(provider));
    let pool = vec![e1.clone()];

    let _ = matcher().match_slot(&slot, &pool, &HashSet::new(), now());

    assert_eq!(pool[0].status, WaitlistStatus::Waiting);
    assert_eq!(pool[0].contact_attempts, 0);
}
