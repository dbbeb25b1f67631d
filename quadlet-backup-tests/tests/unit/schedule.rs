//! Tests for schedule translation into systemd OnCalendar expressions

use quadlet_backup::error::BackupError;
use quadlet_backup::utils::schedule::parse_schedule;
use rstest::rstest;

#[rstest]
#[case("hourly", "*-*-* *:00:00")]
#[case("daily", "*-*-* 02:00:00")]
#[case("daily 14:30", "*-*-* 14:30:00")]
#[case("  Daily 14:30  ", "*-*-* 14:30:00")]
#[case("weekly", "Mon *-*-* 02:00:00")]
#[case("weekly sun 03:00", "Sun *-*-* 03:00:00")]
#[case("weekly fri 10:00", "Fri *-*-* 10:00:00")]
#[case("monthly", "*-*-01 02:00:00")]
fn test_known_schedules(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(parse_schedule(input).unwrap(), expected);
}

#[rstest]
#[case("*-*-* 05:00:00")]
#[case("mon..fri *-*-* 22:00:00")]
fn test_calendar_syntax_passes_through(#[case] input: &str) {
    assert_eq!(parse_schedule(input).unwrap(), input);
}

#[test]
fn test_weekday_is_not_checked() {
    // Only title-cased, never validated
    assert_eq!(parse_schedule("weekly someday 01:00").unwrap(), "Someday *-*-* 01:00:00");
}

#[rstest]
#[case("garbage")]
#[case("every tuesday")]
#[case("")]
fn test_invalid_schedules(#[case] input: &str) {
    match parse_schedule(input) {
        Err(BackupError::Validation(msg)) => assert!(msg.contains("invalid schedule format")),
        other => panic!("expected a format error for {:?}, got {:?}", input, other),
    }
}
