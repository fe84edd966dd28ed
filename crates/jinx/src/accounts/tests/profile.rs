use super::common::*;
use crate::accounts::service::{AccountError, UpdateProfileInput};
use crate::domain::DomainError;
use crate::feed::service::CreatePostInput;

#[tokio::test]
async fn profile_reports_style_and_post_stats() {
    let harness = harness();
    let registered = harness
        .auth
        .register(register_input("kaori@example.com"))
        .await
        .expect("registration");
    let user_id = registered.user.id;

    for content in ["First curse of the day.", "Second curse of the day."] {
        harness
            .posts
            .create(
                user_id,
                CreatePostInput {
                    content: content.to_string(),
                    is_anonymous: false,
                },
            )
            .await
            .expect("post created");
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let profile = harness.profiles.profile(user_id).await.expect("profile");
    assert_eq!(profile.curse_style.name_en, "Infernal Rite");
    assert_eq!(profile.stats.posts, 2);
    assert_eq!(profile.stats.curses, 0);
    assert_eq!(profile.stats.days, 1);

    let mine = harness.profiles.my_posts(user_id).await.expect("my posts");
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].content, "Second curse of the day.");
}

#[tokio::test]
async fn update_profile_validates_and_switches_style() {
    let harness = harness();
    let registered = harness
        .auth
        .register(register_input("kaori@example.com"))
        .await
        .expect("registration");
    let user_id = registered.user.id;

    let frozen = harness
        .repos
        .curse_styles
        .find_by_name_prefix("frozen")
        .await
        .expect("lookup")
        .expect("seeded style");

    let updated = harness
        .profiles
        .update_profile(
            user_id,
            UpdateProfileInput {
                username: "  Kaori K  ".to_string(),
                age: 23,
                gender: "unknown".to_string(),
                curse_style_id: Some(frozen.id),
            },
        )
        .await
        .expect("profile updated");
    assert_eq!(updated.username, "Kaori K");
    assert_eq!(updated.age, 23);
    assert_eq!(updated.curse_style.id, frozen.id);

    let bad_age = harness
        .profiles
        .update_profile(
            user_id,
            UpdateProfileInput {
                username: "Kaori".to_string(),
                age: 151,
                gender: "female".to_string(),
                curse_style_id: None,
            },
        )
        .await;
    assert!(matches!(
        bad_age,
        Err(AccountError::Domain(DomainError::InvalidAge))
    ));

    let missing_style = harness
        .profiles
        .update_profile(
            user_id,
            UpdateProfileInput {
                username: "Kaori".to_string(),
                age: 23,
                gender: "female".to_string(),
                curse_style_id: Some(uuid::Uuid::new_v4()),
            },
        )
        .await;
    assert!(matches!(missing_style, Err(AccountError::UnknownCurseStyle(_))));
}

#[tokio::test]
async fn unknown_user_has_no_profile() {
    let harness = harness();
    assert!(matches!(
        harness.profiles.profile(uuid::Uuid::new_v4()).await,
        Err(AccountError::UserNotFound)
    ));
}
