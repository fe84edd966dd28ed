use chrono::{TimeZone, Utc};
use uuid::Uuid;

use super::common::*;
use crate::domain::DomainError;
use crate::rituals::domain::RankingPeriod;
use crate::rituals::service::RankingEntry;

fn week(day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0)
        .single()
        .expect("valid instant")
}

fn entry(user_id: Uuid, curse_count: i32) -> RankingEntry {
    RankingEntry {
        user_id,
        curse_count,
        post_count: 1,
    }
}

#[tokio::test]
async fn publish_ranks_by_position_and_rewrites_existing_rows() {
    let harness = harness();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    let first = harness
        .rankings
        .publish(RankingPeriod::Weekly, week(10), &[entry(alice, 9), entry(bob, 4)])
        .await
        .expect("published");
    assert_eq!(first[0].rank, 1);
    assert_eq!(first[1].rank, 2);

    let second = harness
        .rankings
        .publish(RankingPeriod::Weekly, week(10), &[entry(bob, 12), entry(alice, 9)])
        .await
        .expect("republished");
    assert_eq!(second[0].id, first[1].id);
    assert_eq!(second[0].rank, 1);
    assert_eq!(second[0].curse_count, 12);

    let rows = harness
        .repos
        .rankings
        .list_period(RankingPeriod::Weekly, week(10))
        .await
        .expect("rows");
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn leaderboard_shows_the_latest_window_only() {
    let harness = harness();
    let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    harness
        .rankings
        .publish(RankingPeriod::Weekly, week(3), &[entry(alice, 30)])
        .await
        .expect("old week");
    harness
        .rankings
        .publish(
            RankingPeriod::Weekly,
            week(10),
            &[entry(carol, 7), entry(bob, 5), entry(alice, 1)],
        )
        .await
        .expect("new week");
    harness
        .rankings
        .publish(RankingPeriod::Monthly, week(1), &[entry(alice, 99)])
        .await
        .expect("month");

    let board = harness
        .rankings
        .leaderboard(RankingPeriod::Weekly, Some(2))
        .await
        .expect("leaderboard");
    assert_eq!(board.period, RankingPeriod::Weekly);
    let users: Vec<_> = board.rankings.iter().map(|r| r.user_id).collect();
    assert_eq!(users, [carol, bob]);
    assert!(board.rankings.iter().all(|r| r.period_start == week(10)));

    let empty = harness
        .rankings
        .leaderboard(RankingPeriod::AllTime, None)
        .await
        .expect("leaderboard");
    assert!(empty.rankings.is_empty());
}

#[tokio::test]
async fn closing_a_period_stamps_every_row() {
    let harness = harness();
    harness
        .rankings
        .publish(
            RankingPeriod::Weekly,
            week(3),
            &[entry(Uuid::new_v4(), 2), entry(Uuid::new_v4(), 1)],
        )
        .await
        .expect("published");

    let closed = harness
        .rankings
        .close_period(RankingPeriod::Weekly, week(3), week(10))
        .await
        .expect("closed");
    assert_eq!(closed, 2);

    let board = harness
        .rankings
        .leaderboard(RankingPeriod::Weekly, None)
        .await
        .expect("leaderboard");
    assert!(board
        .rankings
        .iter()
        .all(|r| r.period_end == Some(week(10))));
}

#[test]
fn unknown_period_names_are_rejected() {
    assert_eq!("ALL_TIME".parse::<RankingPeriod>(), Ok(RankingPeriod::AllTime));
    assert!(matches!(
        "daily".parse::<RankingPeriod>(),
        Err(DomainError::UnknownVariant { .. })
    ));
}
