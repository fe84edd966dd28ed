use uuid::Uuid;

use super::common::*;
use crate::domain::DomainError;
use crate::tracker::domain::{ReminderChannel, SelectionStageStatus};
use crate::tracker::service::{CreateReminderInput, CreateStageInput, TrackerError, UpdateStageInput};

fn stage(name: &str, scheduled_at: Option<&str>) -> CreateStageInput {
    CreateStageInput {
        name: name.to_string(),
        scheduled_at: scheduled_at.map(str::to_string),
        notes: None,
    }
}

fn reminder(target_at: &str, channel: Option<&str>, message: &str) -> CreateReminderInput {
    CreateReminderInput {
        target_at: target_at.to_string(),
        channel: channel.map(str::to_string),
        message: message.to_string(),
    }
}

#[tokio::test]
async fn stages_list_scheduled_first() {
    let harness = harness();
    let user_id = Uuid::new_v4();
    let company_id = harness.company("Acme").await;
    let app = harness.apply(user_id, company_id, "main").await.application.id;

    for input in [
        stage("Offer call", None),
        stage("Final interview", Some("2025-05-20T10:00:00Z")),
        stage("Document screening", Some("2025-05-01T10:00:00Z")),
    ] {
        harness
            .applications
            .add_stage(user_id, app, input)
            .await
            .expect("stage added");
    }

    let stages = harness.applications.stages(user_id, app).await.expect("stages");
    let names: Vec<_> = stages.iter().map(|stage| stage.name.as_str()).collect();
    assert_eq!(names, ["Document screening", "Final interview", "Offer call"]);
    assert!(stages
        .iter()
        .all(|stage| stage.status == SelectionStageStatus::Pending));

    assert!(matches!(
        harness.applications.add_stage(user_id, app, stage("  ", None)).await,
        Err(TrackerError::Domain(DomainError::InvalidStageName))
    ));
}

#[tokio::test]
async fn stage_updates_stay_inside_their_application() {
    let harness = harness();
    let user_id = Uuid::new_v4();
    let company_id = harness.company("Acme").await;
    let main = harness.apply(user_id, company_id, "main").await.application.id;
    let intern = harness.apply(user_id, company_id, "intern").await.application.id;

    let interview = harness
        .applications
        .add_stage(user_id, main, stage("First interview", Some("2025-05-01T10:00:00Z")))
        .await
        .expect("stage added");

    let updated = harness
        .applications
        .update_stage(
            user_id,
            main,
            interview.id,
            UpdateStageInput {
                status: Some("passed".to_string()),
                scheduled_at: Some(String::new()),
                notes: Some("Went well".to_string()),
            },
        )
        .await
        .expect("stage updated");
    assert_eq!(updated.status, SelectionStageStatus::Passed);
    assert_eq!(updated.scheduled_at, None);
    assert_eq!(updated.notes.as_deref(), Some("Went well"));

    assert!(matches!(
        harness
            .applications
            .update_stage(user_id, intern, interview.id, UpdateStageInput::default())
            .await,
        Err(TrackerError::StageNotFound)
    ));
    assert!(matches!(
        harness
            .applications
            .update_stage(Uuid::new_v4(), main, interview.id, UpdateStageInput::default())
            .await,
        Err(TrackerError::Domain(DomainError::Forbidden))
    ));
}

#[tokio::test]
async fn reminders_default_to_in_app_and_sort_by_target() {
    let harness = harness();
    let user_id = Uuid::new_v4();
    let company_id = harness.company("Acme").await;
    let app = harness.apply(user_id, company_id, "main").await.application.id;

    let later = harness
        .applications
        .schedule_reminder(
            user_id,
            app,
            reminder("2025-06-10T09:00:00+09:00", None, "Send thank-you note"),
        )
        .await
        .expect("reminder scheduled");
    assert_eq!(later.channel, ReminderChannel::InApp);

    harness
        .applications
        .schedule_reminder(
            user_id,
            app,
            reminder("2025-06-01T09:00:00Z", Some("email"), "Prepare portfolio"),
        )
        .await
        .expect("reminder scheduled");

    let reminders = harness
        .applications
        .reminders(user_id, app)
        .await
        .expect("reminders");
    let messages: Vec<_> = reminders.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, ["Prepare portfolio", "Send thank-you note"]);
    assert_eq!(reminders[0].channel, ReminderChannel::Email);
}

#[tokio::test]
async fn reminders_validate_their_input() {
    let harness = harness();
    let user_id = Uuid::new_v4();
    let company_id = harness.company("Acme").await;
    let app = harness.apply(user_id, company_id, "main").await.application.id;

    assert!(matches!(
        harness
            .applications
            .schedule_reminder(user_id, app, reminder("", None, "Call recruiter"))
            .await,
        Err(TrackerError::InvalidTimestamp { field: "target_at" })
    ));
    assert!(matches!(
        harness
            .applications
            .schedule_reminder(user_id, app, reminder("2025-06-01T09:00:00Z", None, "   "))
            .await,
        Err(TrackerError::Domain(DomainError::InvalidReminderMessage))
    ));
    assert!(matches!(
        harness
            .applications
            .schedule_reminder(user_id, app, reminder("2025-06-01T09:00:00Z", Some("pigeon"), "Hi"))
            .await,
        Err(TrackerError::Domain(DomainError::UnknownVariant { .. }))
    ));
}
