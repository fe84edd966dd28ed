use uuid::Uuid;

use super::common::*;
use crate::domain::DomainError;
use crate::tracker::domain::ApplicationStatus;
use crate::tracker::service::{CompanyListParams, CreateCompanyInput, TrackerError, UpdateApplicationInput};

async fn seeded_catalog(harness: &Harness, user_id: Uuid) -> Uuid {
    harness.company("Initech").await;
    harness.company("Acme").await;
    let globex = harness.company("Globex").await;

    let application = harness.apply(user_id, globex, "main").await;
    harness
        .applications
        .update(
            user_id,
            application.application.id,
            UpdateApplicationInput {
                status: Some("in_progress".to_string()),
                ..UpdateApplicationInput::default()
            },
        )
        .await
        .expect("status updated");
    globex
}

#[tokio::test]
async fn create_trims_and_drops_blank_fields() {
    let harness = harness();

    let company = harness
        .companies
        .create(CreateCompanyInput {
            name: "  Umbrella Corp ".to_string(),
            recruitment_url: Some("https://umbrella.example/careers".to_string()),
            industry: Some("   ".to_string()),
            location: None,
        })
        .await
        .expect("company created");

    assert_eq!(company.name, "Umbrella Corp");
    assert_eq!(
        company.recruitment_url.as_deref(),
        Some("https://umbrella.example/careers")
    );
    assert_eq!(company.industry, None);

    let blank = harness
        .companies
        .create(CreateCompanyInput {
            name: " ".to_string(),
            recruitment_url: None,
            industry: None,
            location: None,
        })
        .await;
    assert!(matches!(
        blank,
        Err(TrackerError::Domain(DomainError::InvalidCompanyName))
    ));
}

#[tokio::test]
async fn listing_attaches_the_requesters_application() {
    let harness = harness();
    let user_id = Uuid::new_v4();
    let globex = seeded_catalog(&harness, user_id).await;

    let page = harness
        .companies
        .list(user_id, CompanyListParams::default())
        .await
        .expect("listing");
    let names: Vec<_> = page.data.iter().map(|row| row.company.name.as_str()).collect();
    assert_eq!(names, ["Acme", "Globex", "Initech"]);
    assert_eq!(page.pagination.limit, 20);
    assert_eq!(page.pagination.offset, 0);

    let attached = page
        .data
        .iter()
        .find(|row| row.company.id == globex)
        .and_then(|row| row.my_application.as_ref())
        .expect("application attached");
    assert_eq!(attached.status, ApplicationStatus::InProgress);

    let stranger = harness
        .companies
        .list(Uuid::new_v4(), CompanyListParams::default())
        .await
        .expect("listing");
    assert!(stranger.data.iter().all(|row| row.my_application.is_none()));
}

#[tokio::test]
async fn my_filter_and_search_narrow_the_listing() {
    let harness = harness();
    let user_id = Uuid::new_v4();
    seeded_catalog(&harness, user_id).await;

    let mine = harness
        .companies
        .list(
            user_id,
            CompanyListParams {
                filter: Some("MY".to_string()),
                ..CompanyListParams::default()
            },
        )
        .await
        .expect("listing");
    assert_eq!(mine.data.len(), 1);
    assert_eq!(mine.data[0].company.name, "Globex");

    let wrong_category = harness
        .companies
        .list(
            user_id,
            CompanyListParams {
                filter: Some("my".to_string()),
                category: Some("intern".to_string()),
                ..CompanyListParams::default()
            },
        )
        .await
        .expect("listing");
    assert!(wrong_category.data.is_empty());

    let search = harness
        .companies
        .list(
            user_id,
            CompanyListParams {
                search: Some("ACM".to_string()),
                ..CompanyListParams::default()
            },
        )
        .await
        .expect("listing");
    assert_eq!(search.data.len(), 1);
    assert_eq!(search.data[0].company.name, "Acme");

    let paged = harness
        .companies
        .list(
            user_id,
            CompanyListParams {
                limit: Some(2),
                offset: Some(2),
                ..CompanyListParams::default()
            },
        )
        .await
        .expect("listing");
    assert_eq!(paged.data.len(), 1);
    assert_eq!(paged.pagination.limit, 2);
    assert_eq!(paged.pagination.offset, 2);
}

#[tokio::test]
async fn unknown_status_filter_is_rejected() {
    let harness = harness();

    let result = harness
        .companies
        .list(
            Uuid::new_v4(),
            CompanyListParams {
                status: Some("bogus".to_string()),
                ..CompanyListParams::default()
            },
        )
        .await;
    match result {
        Err(TrackerError::Domain(DomainError::UnknownVariant { kind: "status", .. })) => {}
        other => panic!("expected unknown status, got {other:?}"),
    }
}
