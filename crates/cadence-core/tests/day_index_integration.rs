//! Integration tests for day-index computation through the engine.

use cadence_core::calendar::{date_for_day_index, days_between};
use cadence_core::{
    current_day_index, Clock, DurationType, EngineConfig, Enrollment, EnrollmentStatus,
    FixedClock, InMemoryStore, IntegrityWarning, Program, ProgramEngine,
};
use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

fn program(length_days: u32, include_weekends: bool, duration_type: DurationType) -> Program {
    Program {
        id: "p".into(),
        name: "Daily".into(),
        length_days,
        include_weekends,
        duration_type,
        daily_focus_slots: 1,
        task_distribution: None,
    }
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

#[test]
fn monday_start_weekdays_only_after_seven_days_is_day_six() {
    let p = program(30, false, DurationType::Fixed);
    let mut e = Enrollment::new("e1", "u1", "p");
    e.activate(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()).unwrap();
    let as_of = Utc.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap();
    assert_eq!(current_day_index(&e, &p, as_of, utc()).day_index, 6);
}

#[test]
fn evergreen_restart_ten_days_ago_is_cycle_two_day_eleven() {
    let p = program(30, true, DurationType::Evergreen);
    let now = Utc.with_ymd_and_hms(2024, 6, 20, 12, 0, 0).unwrap();
    let mut e = Enrollment::new("e1", "u1", "p");
    e.activate(now - Duration::days(40)).unwrap();
    e.restart_cycle(&p, now - Duration::days(10)).unwrap();

    let result = current_day_index(&e, &p, now, utc());
    assert_eq!(result.day_index, 11);
    assert_eq!(result.cycle.map(|c| c.number), Some(2));
    assert!(!result.cycle_overrun);
}

#[test]
fn reference_zone_decides_the_calendar_day() {
    let p = program(30, true, DurationType::Fixed);
    let mut e = Enrollment::new("e1", "u1", "p");
    // 23:30 UTC on March 1st is already March 2nd in UTC+9.
    e.activate(Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap()).unwrap();
    let as_of = Utc.with_ymd_and_hms(2024, 3, 2, 1, 0, 0).unwrap();

    assert_eq!(current_day_index(&e, &p, as_of, utc()).day_index, 2);
    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    assert_eq!(current_day_index(&e, &p, as_of, tokyo).day_index, 1);
}

#[test]
fn engine_reads_through_the_clock_and_store() {
    let store = InMemoryStore::new();
    store.insert_program(program(10, true, DurationType::Fixed)).unwrap();
    let mut e = Enrollment::new("e1", "u1", "p");
    e.activate(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()).unwrap();
    store.upsert_enrollment(e.clone()).unwrap();

    let mut broken = Enrollment::new("e2", "u1", "p");
    broken.status = EnrollmentStatus::Active;
    store.upsert_enrollment(broken).unwrap();

    let engine = ProgramEngine::new(store, EngineConfig::default());
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap());
    assert_eq!(engine.current_day_index("e1", &clock).unwrap().day_index, 3);

    clock.advance(Duration::days(30));
    assert_eq!(engine.current_day_index("e1", &clock).unwrap().day_index, 10);

    let result = engine.current_day_index("e2", &clock).unwrap();
    assert_eq!(result.day_index, 0);
    assert!(matches!(
        result.warning,
        Some(IntegrityWarning::InconsistentEnrollment { .. })
    ));
    assert!(engine.current_day_index("missing", &clock).is_err());
    assert!(clock.now() > e.started_at.unwrap());
}

proptest! {
    #[test]
    fn active_index_is_monotone_and_bounded(
        start_offset in 0i64..3650,
        length_days in 1u32..200,
        include_weekends in any::<bool>(),
        evergreen in any::<bool>(),
        a in 0i64..400,
        b in 0i64..400,
        hour in 0u32..24,
    ) {
        let duration_type = if evergreen { DurationType::Evergreen } else { DurationType::Fixed };
        let p = program(length_days, include_weekends, duration_type);
        let start = Utc.with_ymd_and_hms(2015, 1, 1, hour, 0, 0).unwrap()
            + Duration::days(start_offset);
        let mut e = Enrollment::new("e1", "u1", "p");
        e.activate(start).unwrap();

        let (early, late) = (a.min(b), a.max(b));
        let first = current_day_index(&e, &p, start + Duration::days(early), utc());
        let second = current_day_index(&e, &p, start + Duration::days(late), utc());
        prop_assert!(first.day_index >= 1 && first.day_index <= length_days);
        prop_assert!(second.day_index >= 1 && second.day_index <= length_days);
        prop_assert!(first.day_index <= second.day_index);

        for status in [EnrollmentStatus::Completed, EnrollmentStatus::Stopped] {
            let mut done = e.clone();
            done.status = status;
            let expected = if status == EnrollmentStatus::Completed { length_days } else { 0 };
            prop_assert_eq!(current_day_index(&done, &p, start, utc()).day_index, expected);
        }
    }

    #[test]
    fn day_index_dates_round_trip(
        start_offset in 0i64..2000,
        day in 1u32..400,
        include_weekends in any::<bool>(),
    ) {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(start_offset);
        let date = date_for_day_index(start, day, include_weekends);
        let first = date_for_day_index(start, 1, include_weekends);
        prop_assert_eq!(days_between(first, date, include_weekends) + 1, day);
    }
}
