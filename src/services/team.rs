use uuid::Uuid;

use crate::dto::TeammateResponse;
use crate::error::{AppError, AppResult};
use crate::models::team::AggregateSource;
use crate::models::user::UserRole;
use crate::services::assistant::TeamState;
use crate::services::metrics::{self, TeamTrends};
use crate::services::recognition::display_name;
use crate::store::GardenStore;

pub const DEFAULT_DASHBOARD_DAYS: i64 = 30;
/// The week-ago comparison needs at least eight rows to have a chance.
pub const MIN_DASHBOARD_DAYS: i64 = 8;
pub const MAX_DASHBOARD_DAYS: i64 = 90;

pub fn clamp_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_DASHBOARD_DAYS)
        .clamp(MIN_DASHBOARD_DAYS, MAX_DASHBOARD_DAYS)
}

/// Only leaders may read team-level data.
pub async fn require_leader(store: &dyn GardenStore, user_id: Uuid) -> AppResult<()> {
    let role = store
        .profile(user_id)
        .await?
        .map(|p| p.role)
        .unwrap_or_default();
    if role != UserRole::Leader {
        return Err(AppError::Forbidden(
            "Team dashboard is available to team leaders only".into(),
        ));
    }
    Ok(())
}

pub async fn dashboard(
    store: &dyn GardenStore,
    leader_id: Uuid,
    source: AggregateSource,
    days: i64,
) -> AppResult<TeamTrends> {
    let rows = store.team_aggregates(leader_id, source, days).await?;
    tracing::debug!(
        leader_id = %leader_id,
        source = ?source,
        rows = rows.len(),
        "Team aggregates loaded"
    );
    Ok(metrics::team_trends(rows))
}

/// Team state for the assistant, built from the most recent live aggregate.
pub async fn latest_team_state(
    store: &dyn GardenStore,
    leader_id: Uuid,
) -> AppResult<Option<TeamState>> {
    let rows = store
        .team_aggregates(leader_id, AggregateSource::Live, 1)
        .await?;
    Ok(rows.first().map(TeamState::from_aggregate))
}

pub async fn teammates(
    store: &dyn GardenStore,
    user_id: Uuid,
) -> AppResult<Vec<TeammateResponse>> {
    let mates = store.teammates(user_id).await?;
    Ok(mates
        .into_iter()
        .map(|m| TeammateResponse {
            user_id: m.user_id,
            display_name: display_name(m.display_name),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::models::checkin::CheckInMetrics;
    use crate::models::weather::Weather;
    use crate::services::assistant::ClimateTrend;
    use crate::store::memory::MemoryStore;

    #[test]
    fn days_are_clamped() {
        assert_eq!(clamp_days(None), 30);
        assert_eq!(clamp_days(Some(1)), 8);
        assert_eq!(clamp_days(Some(365)), 90);
        assert_eq!(clamp_days(Some(14)), 14);
    }

    #[tokio::test]
    async fn members_and_unknown_users_are_not_leaders() {
        let store = MemoryStore::new();
        let (leader, member) = (Uuid::new_v4(), Uuid::new_v4());
        store.upsert_profile(leader, Some("Lea"), UserRole::Leader).await;
        store.upsert_profile(member, Some("Mo"), UserRole::Member).await;

        assert!(require_leader(&store, leader).await.is_ok());
        assert!(matches!(
            require_leader(&store, member).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            require_leader(&store, Uuid::new_v4()).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn demo_dashboard_has_week_ago_comparison() {
        let store = MemoryStore::new();
        let trends = dashboard(&store, Uuid::new_v4(), AggregateSource::Demo, 30)
            .await
            .unwrap();
        assert_eq!(trends.history.len(), 14);
        assert_eq!(trends.latest.as_ref().map(|r| r.date), Some(Utc::now().date_naive()));
        assert!(trends.week_ago.is_some());
        assert!(trends.deltas.energy.is_some());
    }

    #[tokio::test]
    async fn empty_team_has_no_state() {
        let store = MemoryStore::new();
        let leader = Uuid::new_v4();
        let trends = dashboard(&store, leader, AggregateSource::Live, 30).await.unwrap();
        assert!(trends.latest.is_none());
        assert!(trends.alerts.is_empty());
        assert!(latest_team_state(&store, leader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_team_state_uses_newest_day() {
        let store = MemoryStore::new();
        let (leader, member) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_team_member(leader, member).await;

        let checkin = |energy, mental_pressure| CheckInMetrics {
            energy,
            mental_pressure,
            personal_concerns: 3,
            achievements: 6,
            exceptional_day: 0,
            weather: Weather::Sunny,
        };
        let old = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let new = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        store.insert_check_in(member, old, &checkin(2, 9)).await.unwrap();
        store.insert_check_in(member, new, &checkin(8, 2)).await.unwrap();

        let state = latest_team_state(&store, leader).await.unwrap().unwrap();
        assert_eq!(state.energy_avg, 8.0);
        assert_eq!(state.pressure_avg, 2.0);
        assert_eq!(state.climate_trend, ClimateTrend::Positive);
        assert!(state.recent_alerts.is_empty());
    }

    #[tokio::test]
    async fn teammates_fall_back_to_placeholder_name() {
        let store = MemoryStore::new();
        let (leader, me, peer) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.upsert_profile(leader, Some("Lea"), UserRole::Leader).await;
        store.upsert_profile(me, Some("Mo"), UserRole::Member).await;
        store.upsert_profile(peer, None, UserRole::Member).await;
        store.add_team_member(leader, me).await;
        store.add_team_member(leader, peer).await;

        let names: Vec<_> = teammates(&store, me)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.display_name)
            .collect();
        assert_eq!(names, vec!["Lea".to_string(), "Teammate".to_string()]);
    }
}
