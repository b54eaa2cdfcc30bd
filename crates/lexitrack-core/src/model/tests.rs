use crate::model::*;
use chrono::NaiveDate;
use uuid::Uuid;

#[test]
fn test_severity_roundtrip() {
    for severity in Severity::ALL {
        let s = severity.to_string();
        let parsed: Severity = s.parse().unwrap();
        assert_eq!(parsed, severity);
    }
    assert!("extreme".parse::<Severity>().is_err());
    assert_eq!(" Moderate ".parse::<Severity>().unwrap(), Severity::Moderate);
}

#[test]
fn test_profile_unknown_severity_loads_as_unselected() {
    let json = r#"{"email":"kid@example.com","name":"Sam","severity":"extreme"}"#;
    let profile: UserProfile = serde_json::from_str(json).unwrap();
    assert_eq!(profile.email, "kid@example.com");
    assert!(profile.severity.is_none());
}

#[test]
fn test_profile_missing_fields_default() {
    let profile: UserProfile = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
    assert!(profile.name.is_empty());
    assert!(profile.age.is_none());
    assert!(profile.severity.is_none());
}

#[test]
fn test_profile_camel_case_wire_names() {
    let profile = UserProfile::new("a@b.c").with_severity(Severity::Severe);
    let mut profile = profile;
    profile.school_grade = Some("4".into());
    let json = serde_json::to_value(&profile).unwrap();
    assert_eq!(json["schoolGrade"], "4");
    assert_eq!(json["severity"], "severe");
}

#[test]
fn test_set_field_updates_values() {
    let mut profile = UserProfile::new("a@b.c");
    profile.set_field("name", "  Robin ").unwrap();
    profile.set_field("age", "11").unwrap();
    profile.set_field("severity", "moderate").unwrap();
    assert_eq!(profile.name, "Robin");
    assert_eq!(profile.age, Some(11));
    assert_eq!(profile.severity, Some(Severity::Moderate));
    assert_eq!(profile.field("age").as_deref(), Some("11"));
}

#[test]
fn test_set_field_empty_clears_optional() {
    let mut profile = UserProfile::new("a@b.c").with_severity(Severity::Mild);
    profile.set_field("severity", "").unwrap();
    assert!(profile.severity.is_none());
    profile.set_field("guardian_phone", "555-0100").unwrap();
    profile.set_field("guardian_phone", "").unwrap();
    assert!(profile.guardian_phone.is_none());
}

#[test]
fn test_set_field_rejects_identity_and_bad_values() {
    let mut profile = UserProfile::new("a@b.c");
    assert!(profile.set_field("email", "other@b.c").is_err());
    assert!(profile.set_field("age", "eleven").is_err());
    assert!(profile.set_field("age", "400").is_err());
    assert!(profile.set_field("severity", "extreme").is_err());
    assert!(profile.set_field("favourite_colour", "blue").is_err());
    assert_eq!(profile.email, "a@b.c");
}

#[test]
fn test_every_descriptor_is_readable() {
    let mut profile = UserProfile::new("a@b.c");
    for descriptor in PROFILE_FIELDS {
        if descriptor.editable {
            let value = match descriptor.kind {
                FieldKind::Number => "9",
                FieldKind::Choice(options) => options[0],
                FieldKind::Text => "x",
            };
            profile.set_field(descriptor.key, value).unwrap();
        }
        assert!(
            profile.field(descriptor.key).is_some(),
            "field {} should be readable",
            descriptor.key
        );
    }
}

#[test]
fn test_validate_time() {
    assert!(validate_time("07:30").is_ok());
    assert!(validate_time("23:59").is_ok());
    assert!(validate_time("24:00").is_err());
    assert!(validate_time("7.30").is_err());
    assert!(validate_time("").is_err());
}

#[test]
fn test_validate_activity() {
    assert!(validate_activity("Read aloud for 10 minutes").is_ok());
    assert!(validate_activity("   ").is_err());
    assert!(validate_activity(&"x".repeat(MAX_ACTIVITY_LENGTH + 1)).is_err());
}

#[test]
fn test_custom_task_keeps_persisted_id() {
    let id = Uuid::now_v7();
    let activity = ScheduleActivity {
        id: Some(id),
        time: "16:00".into(),
        activity: "Flashcards".into(),
    };
    let task = TaskWithStatus::from_custom(&activity);
    assert_eq!(task.id, id);
    assert!(task.is_custom);
    assert!(!task.completed);
}

#[test]
fn test_baseline_tasks_get_fresh_ids() {
    let activity = ScheduleActivity::new("08:00", "Phonics warm-up");
    let a = TaskWithStatus::baseline(&activity);
    let b = TaskWithStatus::baseline(&activity);
    assert_ne!(a.id, b.id);
    assert!(!a.is_custom);
}

#[test]
fn test_baseline_task_id_is_stable_within_a_day() {
    let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
    let next = day.succ_opt().unwrap();
    let id = baseline_task_id("kid@example.com", Severity::Mild, day, 0);
    assert_eq!(id, baseline_task_id("kid@example.com", Severity::Mild, day, 0));
    assert_ne!(id, baseline_task_id("kid@example.com", Severity::Mild, day, 1));
    assert_ne!(id, baseline_task_id("kid@example.com", Severity::Mild, next, 0));
    assert_ne!(id, baseline_task_id("kid@example.com", Severity::Severe, day, 0));
    assert_ne!(id, baseline_task_id("other@example.com", Severity::Mild, day, 0));
}

#[test]
fn test_progress_bundle_coerces_bad_fields() {
    let json = r#"{
        "milestonePoints": 40,
        "milestoneTasks": [],
        "currentMilestoneIndex": -1,
        "currentMilestoneLevel": "unknown",
        "trackingStartedDate": "2024-01-01T08:00:00.000Z",
        "dailyLogs": [
            {"date": "2024-01-01", "completedTasks": ["not-a-uuid", "0190f5e4-5b8e-7c3a-9f00-000000000001"]}
        ]
    }"#;
    let bundle: ProgressBundle = serde_json::from_str(json).unwrap();
    assert_eq!(bundle.milestone_points, 40);
    assert!(bundle.current_milestone_index.is_none());
    assert!(bundle.current_milestone_level.is_none());
    assert_eq!(
        bundle.tracking_started_date,
        NaiveDate::from_ymd_opt(2024, 1, 1)
    );
    assert_eq!(bundle.daily_logs[0].completed_tasks.len(), 1);
}

#[test]
fn test_milestone_task_accepts_timestamp_completion_date() {
    let json = r#"{"id":"mild-1","task":"Read","points":50,"completed":true,"completionDate":"2024-02-10T10:00:00Z"}"#;
    let task: MilestoneTask = serde_json::from_str(json).unwrap();
    assert!(task.completed);
    assert_eq!(task.completion_date, NaiveDate::from_ymd_opt(2024, 2, 10));
}

#[test]
fn test_contact_validation() {
    assert!(EmergencyContact::new("Mum", "parent", "555 0100").validate().is_ok());
    assert!(EmergencyContact::new("", "parent", "555 0100").validate().is_err());
    assert!(EmergencyContact::new("Mum", "parent", "n/a").validate().is_err());
}

#[test]
fn test_checkup_validation() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    assert!(CheckupLog::new(date, "Dr. Ada").with_score(80).validate().is_ok());
    assert!(CheckupLog::new(date, " ").validate().is_err());
    assert!(CheckupLog::new(date, "Dr. Ada").with_score(120).validate().is_err());
}

#[test]
fn test_dedup_records_keeps_first() {
    let a = EmergencyContact::new("A", "x", "111");
    let mut dup = a.clone();
    dup.name = "A (copy)".into();
    let b = EmergencyContact::new("B", "y", "222");
    let out = dedup_records(vec![a.clone(), dup, b.clone()]);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].name, "A");
    assert_eq!(out[1].id, b.id);
}
