//! In-process store.
//!
//! Mirrors the Postgres schema closely enough for local runs and tests:
//! same uniqueness rules, same newest-first orderings, and the team view is
//! recomputed from check-ins on every read.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{GardenStore, StoreError, StoreResult};
use crate::models::checkin::{CheckIn, CheckInMetrics};
use crate::models::recognition::{
    NewRecognition, Recognition, RecognitionCategory, RecognitionListing,
};
use crate::models::team::{AggregateSource, TeamDailyAggregate, Teammate};
use crate::models::user::{UserProfile, UserRole};
use crate::models::weather::{Weather, WeatherEmotion};

const DAILY_RECOGNITION_CONSTRAINT: &str = "emotional_recognitions_daily_unique";
const DEMO_DAYS: i64 = 14;
const DEMO_MEMBER_COUNT: i64 = 8;

#[derive(Default)]
struct MemoryData {
    profiles: HashMap<Uuid, UserProfile>,
    /// (leader_id, member_id)
    team_links: Vec<(Uuid, Uuid)>,
    check_ins: HashMap<(Uuid, NaiveDate), CheckIn>,
    weather_emotions: HashMap<Uuid, Vec<WeatherEmotion>>,
    categories: Vec<RecognitionCategory>,
    recognitions: Vec<Recognition>,
}

#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    profiles: Vec<SeedProfile>,
    #[serde(default)]
    team_members: Vec<SeedTeamLink>,
}

#[derive(Debug, Deserialize)]
struct SeedProfile {
    user_id: Uuid,
    display_name: Option<String>,
    #[serde(default)]
    role: UserRole,
}

#[derive(Debug, Deserialize)]
struct SeedTeamLink {
    leader_id: Uuid,
    member_id: Uuid,
}

impl MemoryStore {
    /// Empty store with the default recognition categories.
    pub fn new() -> Self {
        let data = MemoryData {
            categories: default_categories(),
            ..Default::default()
        };
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    pub async fn upsert_profile(&self, user_id: Uuid, display_name: Option<&str>, role: UserRole) {
        let mut data = self.data.write().await;
        let created_at = data
            .profiles
            .get(&user_id)
            .map(|p| p.created_at)
            .unwrap_or_else(Utc::now);
        data.profiles.insert(
            user_id,
            UserProfile {
                user_id,
                display_name: display_name.map(str::to_string),
                role,
                created_at,
            },
        );
    }

    pub async fn add_team_member(&self, leader_id: Uuid, member_id: Uuid) {
        let mut data = self.data.write().await;
        if !data.team_links.contains(&(leader_id, member_id)) {
            data.team_links.push((leader_id, member_id));
        }
    }

    /// Loads profiles and team links from a JSON seed file.
    pub async fn load_seed(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading seed file {}", path.display()))?;
        let seed: SeedFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing seed file {}", path.display()))?;

        for profile in &seed.profiles {
            self.upsert_profile(profile.user_id, profile.display_name.as_deref(), profile.role)
                .await;
        }
        for link in &seed.team_members {
            self.add_team_member(link.leader_id, link.member_id).await;
        }

        tracing::info!(
            profiles = seed.profiles.len(),
            team_links = seed.team_members.len(),
            "Memory store seeded"
        );
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn default_categories() -> Vec<RecognitionCategory> {
    [
        (1, "Teamwork", "🤝"),
        (2, "Support", "💪"),
        (3, "Creativity", "💡"),
        (4, "Positivity", "🌞"),
        (5, "Growth", "🌱"),
    ]
    .into_iter()
    .map(|(id, name, emoji)| RecognitionCategory {
        id,
        name: name.into(),
        emoji: emoji.into(),
    })
    .collect()
}

/// Deterministic two-week sample used by the demo dashboard.
pub fn demo_aggregates(today: NaiveDate) -> Vec<TeamDailyAggregate> {
    (0..DEMO_DAYS)
        .map(|i| TeamDailyAggregate {
            date: today - Duration::days(i),
            role: Some("demo".into()),
            member_count: DEMO_MEMBER_COUNT,
            avg_energy: 6.0 + (i % 4) as f64 * 0.5,
            avg_mental_pressure: 5.0 + (i % 3) as f64 * 0.75,
            avg_personal_concerns: 4.0 + (i % 5) as f64 * 0.4,
            avg_achievements: 5.5 + (i % 2) as f64,
            avg_exceptional_day: 0.125 * (i % 3) as f64,
            most_common_weather: Some(Weather::ALL[(i % 3) as usize]),
        })
        .collect()
}

fn aggregate_day(date: NaiveDate, rows: &[&CheckIn]) -> TeamDailyAggregate {
    let n = rows.len() as f64;
    let avg = |f: fn(&CheckIn) -> i32| rows.iter().map(|c| f(c) as f64).sum::<f64>() / n;

    let mut weather_counts: BTreeMap<Weather, usize> = BTreeMap::new();
    for c in rows {
        *weather_counts.entry(c.weather).or_default() += 1;
    }
    // Ties resolve to the lowest enum value, like Postgres `mode()` over an ordered enum.
    let most_common_weather = weather_counts
        .iter()
        .fold(None::<(Weather, usize)>, |best, (w, count)| match best {
            Some((_, best_count)) if best_count >= *count => best,
            _ => Some((*w, *count)),
        })
        .map(|(w, _)| w);

    TeamDailyAggregate {
        date,
        role: Some("team".into()),
        member_count: rows.len() as i64,
        avg_energy: avg(|c| c.energy),
        avg_mental_pressure: avg(|c| c.mental_pressure),
        avg_personal_concerns: avg(|c| c.personal_concerns),
        avg_achievements: avg(|c| c.achievements),
        avg_exceptional_day: avg(|c| c.exceptional_day),
        most_common_weather,
    }
}

fn listing(data: &MemoryData, r: &Recognition) -> RecognitionListing {
    let name_of = |id: &Uuid| data.profiles.get(id).and_then(|p| p.display_name.clone());
    let category = data.categories.iter().find(|c| c.id == r.category_id);
    RecognitionListing {
        id: r.id,
        sender_id: r.sender_id,
        sender_name: name_of(&r.sender_id),
        receiver_id: r.receiver_id,
        receiver_name: name_of(&r.receiver_id),
        message: r.message.clone(),
        category_id: r.category_id,
        category_name: category.map(|c| c.name.clone()),
        category_emoji: category.map(|c| c.emoji.clone()),
        recognition_date: r.recognition_date,
        is_read: r.is_read,
        created_at: r.created_at,
    }
}

/// Newest first; rows created within the same instant keep reverse insertion order.
fn newest_first(
    data: &MemoryData,
    keep: impl Fn(&Recognition) -> bool,
) -> Vec<RecognitionListing> {
    let mut rows: Vec<RecognitionListing> = data
        .recognitions
        .iter()
        .rev()
        .filter(|r| keep(r))
        .map(|r| listing(data, r))
        .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}

fn apply_metrics(row: &mut CheckIn, metrics: &CheckInMetrics) {
    row.energy = metrics.energy;
    row.mental_pressure = metrics.mental_pressure;
    row.personal_concerns = metrics.personal_concerns;
    row.achievements = metrics.achievements;
    row.exceptional_day = metrics.exceptional_day;
    row.weather = metrics.weather;
    row.updated_at = Utc::now();
}

#[async_trait]
impl GardenStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(self.data.read().await.profiles.get(&user_id).cloned())
    }

    async fn teammates(&self, user_id: Uuid) -> StoreResult<Vec<Teammate>> {
        let data = self.data.read().await;
        let mut leaders: Vec<Uuid> = data
            .team_links
            .iter()
            .filter(|(_, member)| *member == user_id)
            .map(|(leader, _)| *leader)
            .collect();
        let own_leaders = leaders.clone();
        leaders.push(user_id);

        let mut ids: Vec<Uuid> = data
            .team_links
            .iter()
            .filter(|(leader, _)| leaders.contains(leader))
            .map(|(_, member)| *member)
            .chain(own_leaders)
            .filter(|id| *id != user_id && data.profiles.contains_key(id))
            .collect();
        ids.sort();
        ids.dedup();

        let mut mates: Vec<Teammate> = ids
            .into_iter()
            .map(|id| Teammate {
                user_id: id,
                display_name: data.profiles.get(&id).and_then(|p| p.display_name.clone()),
            })
            .collect();
        mates.sort_by(|a, b| match (&a.display_name, &b.display_name) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.user_id.cmp(&b.user_id),
        });
        Ok(mates)
    }

    async fn find_check_in(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<CheckIn>> {
        Ok(self.data.read().await.check_ins.get(&(user_id, date)).cloned())
    }

    async fn insert_check_in(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        metrics: &CheckInMetrics,
    ) -> StoreResult<CheckIn> {
        let mut data = self.data.write().await;
        let now = Utc::now();
        let row = data
            .check_ins
            .entry((user_id, date))
            .and_modify(|existing| apply_metrics(existing, metrics))
            .or_insert_with(|| CheckIn {
                id: Uuid::new_v4(),
                user_id,
                checkin_date: date,
                energy: metrics.energy,
                mental_pressure: metrics.mental_pressure,
                personal_concerns: metrics.personal_concerns,
                achievements: metrics.achievements,
                exceptional_day: metrics.exceptional_day,
                weather: metrics.weather,
                created_at: now,
                updated_at: now,
            });
        Ok(row.clone())
    }

    async fn update_check_in(&self, id: Uuid, metrics: &CheckInMetrics) -> StoreResult<CheckIn> {
        let mut data = self.data.write().await;
        let row = data
            .check_ins
            .values_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        apply_metrics(row, metrics);
        Ok(row.clone())
    }

    async fn list_check_ins(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<CheckIn>> {
        let data = self.data.read().await;
        let mut rows: Vec<CheckIn> = data
            .check_ins
            .values()
            .filter(|c| c.user_id == user_id && c.checkin_date >= start && c.checkin_date <= end)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.checkin_date.cmp(&a.checkin_date));
        Ok(rows)
    }

    async fn weather_emotions(&self, user_id: Uuid) -> StoreResult<Vec<WeatherEmotion>> {
        let data = self.data.read().await;
        let mut rows = data.weather_emotions.get(&user_id).cloned().unwrap_or_default();
        rows.sort_by_key(|r| r.weather);
        Ok(rows)
    }

    async fn replace_weather_emotions(
        &self,
        user_id: Uuid,
        rows: &[(Weather, String)],
    ) -> StoreResult<()> {
        let fresh = rows
            .iter()
            .map(|(weather, emotion)| WeatherEmotion {
                user_id,
                weather: *weather,
                emotion: emotion.clone(),
            })
            .collect();
        self.data.write().await.weather_emotions.insert(user_id, fresh);
        Ok(())
    }

    async fn team_aggregates(
        &self,
        leader_id: Uuid,
        source: AggregateSource,
        limit: i64,
    ) -> StoreResult<Vec<TeamDailyAggregate>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        if source == AggregateSource::Demo {
            let mut rows = demo_aggregates(Utc::now().date_naive());
            rows.truncate(limit);
            return Ok(rows);
        }

        let data = self.data.read().await;
        let members: Vec<Uuid> = data
            .team_links
            .iter()
            .filter(|(leader, _)| *leader == leader_id)
            .map(|(_, member)| *member)
            .collect();

        let mut by_date: BTreeMap<NaiveDate, Vec<&CheckIn>> = BTreeMap::new();
        for c in data.check_ins.values().filter(|c| members.contains(&c.user_id)) {
            by_date.entry(c.checkin_date).or_default().push(c);
        }

        Ok(by_date
            .iter()
            .rev()
            .take(limit)
            .map(|(date, rows)| aggregate_day(*date, rows))
            .collect())
    }

    async fn recognition_categories(&self) -> StoreResult<Vec<RecognitionCategory>> {
        Ok(self.data.read().await.categories.clone())
    }

    async fn insert_recognition(&self, new: &NewRecognition) -> StoreResult<Recognition> {
        let mut data = self.data.write().await;
        let duplicate = data.recognitions.iter().any(|r| {
            r.sender_id == new.sender_id
                && r.receiver_id == new.receiver_id
                && r.recognition_date == new.recognition_date
        });
        if duplicate {
            return Err(StoreError::UniqueViolation(DAILY_RECOGNITION_CONSTRAINT.into()));
        }

        let row = Recognition {
            id: Uuid::new_v4(),
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            message: new.message.clone(),
            category_id: new.category_id,
            recognition_date: new.recognition_date,
            is_read: false,
            created_at: Utc::now(),
        };
        data.recognitions.push(row.clone());
        Ok(row)
    }

    async fn mark_recognition_read(&self, id: Uuid, receiver_id: Uuid) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        match data
            .recognitions
            .iter_mut()
            .find(|r| r.id == id && r.receiver_id == receiver_id)
        {
            Some(row) => {
                row.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn received_recognitions(
        &self,
        receiver_id: Uuid,
    ) -> StoreResult<Vec<RecognitionListing>> {
        let data = self.data.read().await;
        Ok(newest_first(&data, |r| r.receiver_id == receiver_id))
    }

    async fn sent_recognitions(&self, sender_id: Uuid) -> StoreResult<Vec<RecognitionListing>> {
        let data = self.data.read().await;
        Ok(newest_first(&data, |r| r.sender_id == sender_id))
    }

    async fn unread_recognitions(&self, receiver_id: Uuid) -> StoreResult<i64> {
        let data = self.data.read().await;
        Ok(data
            .recognitions
            .iter()
            .filter(|r| r.receiver_id == receiver_id && !r.is_read)
            .count() as i64)
    }
}
