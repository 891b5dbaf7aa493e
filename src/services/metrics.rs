//! Derived team metrics.
//!
//! Everything here is pure and works on aggregate rows ordered newest first,
//! the order the store returns them in.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::team::TeamDailyAggregate;
use crate::models::weather::Weather;

/// Minimum distance, in days, between the latest row and its comparison row.
pub const WEEK_AGO_MIN_DAYS: i64 = 7;

const ALERT_WINDOW: usize = 3;
const ALERT_MIN_DAYS: usize = 2;
const HIGH_PRESSURE_ABOVE: f64 = 7.0;
const LOW_ENERGY_BELOW: f64 = 4.0;
const ACHIEVEMENT_GROWTH_FACTOR: f64 = 1.2;
const WEATHER_WINDOW: usize = 5;
const DOMINANT_WEATHER_MIN_DAYS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Delta {
    pub percent: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighPressure,
    LowEnergy,
    AchievementIncrease,
    DominantWeather,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Positive,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamAlert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricDeltas {
    pub energy: Option<Delta>,
    pub mental_pressure: Option<Delta>,
    pub personal_concerns: Option<Delta>,
    pub achievements: Option<Delta>,
    pub wellbeing_index: Option<Delta>,
}

/// Everything the leader dashboard derives from the team's aggregate history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamTrends {
    pub latest: Option<TeamDailyAggregate>,
    pub week_ago: Option<TeamDailyAggregate>,
    pub wellbeing_index: Option<f64>,
    pub previous_wellbeing_index: Option<f64>,
    pub deltas: MetricDeltas,
    pub alerts: Vec<TeamAlert>,
    pub history: Vec<TeamDailyAggregate>,
}

/// First row, scanning newest to oldest, at least a week older than the
/// latest row. Missing days are tolerated: the match may be 8+ days back.
pub fn week_ago(rows: &[TeamDailyAggregate]) -> Option<&TeamDailyAggregate> {
    let latest = rows.first()?;
    rows.iter()
        .skip(1)
        .find(|row| (latest.date - row.date).num_days() >= WEEK_AGO_MIN_DAYS)
}

/// `|current - previous| / previous * 100`, absent without a usable baseline.
pub fn percent_delta(current: f64, previous: Option<f64>) -> Option<Delta> {
    let previous = previous.filter(|p| *p != 0.0)?;
    let percent = (current - previous).abs() / previous * 100.0;
    let direction = if current > previous {
        Direction::Up
    } else if current < previous {
        Direction::Down
    } else {
        Direction::Flat
    };
    Some(Delta { percent, direction })
}

/// `((energy + achievements) - (pressure + concerns) / 2) / 2`
pub fn wellbeing_index(agg: &TeamDailyAggregate) -> f64 {
    ((agg.avg_energy + agg.avg_achievements)
        - (agg.avg_mental_pressure + agg.avg_personal_concerns) / 2.0)
        / 2.0
}

pub fn derive_alerts(
    rows: &[TeamDailyAggregate],
    week_ago: Option<&TeamDailyAggregate>,
) -> Vec<TeamAlert> {
    let mut alerts = Vec::new();
    let recent = &rows[..rows.len().min(ALERT_WINDOW)];

    let pressured_days = recent
        .iter()
        .filter(|r| r.avg_mental_pressure > HIGH_PRESSURE_ABOVE)
        .count();
    if pressured_days >= ALERT_MIN_DAYS {
        alerts.push(TeamAlert {
            kind: AlertKind::HighPressure,
            severity: Severity::Warning,
            message: format!(
                "Mental pressure was above {HIGH_PRESSURE_ABOVE} on {pressured_days} of the last {} days",
                recent.len()
            ),
        });
    }

    let tired_days = recent
        .iter()
        .filter(|r| r.avg_energy < LOW_ENERGY_BELOW)
        .count();
    if tired_days >= ALERT_MIN_DAYS {
        alerts.push(TeamAlert {
            kind: AlertKind::LowEnergy,
            severity: Severity::Warning,
            message: format!(
                "Energy was below {LOW_ENERGY_BELOW} on {tired_days} of the last {} days",
                recent.len()
            ),
        });
    }

    if let (Some(latest), Some(previous)) = (rows.first(), week_ago) {
        if latest.avg_achievements > previous.avg_achievements * ACHIEVEMENT_GROWTH_FACTOR {
            alerts.push(TeamAlert {
                kind: AlertKind::AchievementIncrease,
                severity: Severity::Positive,
                message: format!(
                    "Achievements rose from {:.1} to {:.1} compared with a week ago",
                    previous.avg_achievements, latest.avg_achievements
                ),
            });
        }
    }

    if let Some((weather, days)) = dominant_weather(rows) {
        alerts.push(TeamAlert {
            kind: AlertKind::DominantWeather,
            severity: Severity::Info,
            message: format!(
                "The team's mood has been mostly {} ({days} of the last {} days)",
                weather.as_str(),
                rows.len().min(WEATHER_WINDOW)
            ),
        });
    }

    alerts
}

fn dominant_weather(rows: &[TeamDailyAggregate]) -> Option<(Weather, usize)> {
    let mut counts: BTreeMap<Weather, usize> = BTreeMap::new();
    for weather in rows
        .iter()
        .take(WEATHER_WINDOW)
        .filter_map(|r| r.most_common_weather)
    {
        *counts.entry(weather).or_default() += 1;
    }
    counts
        .into_iter()
        .find(|(_, days)| *days >= DOMINANT_WEATHER_MIN_DAYS)
}

pub fn team_trends(rows: Vec<TeamDailyAggregate>) -> TeamTrends {
    let previous = week_ago(&rows).cloned();
    let latest = rows.first().cloned();
    let alerts = derive_alerts(&rows, previous.as_ref());

    let wellbeing = latest.as_ref().map(wellbeing_index);
    let previous_wellbeing = previous.as_ref().map(wellbeing_index);

    let deltas = match &latest {
        Some(cur) => {
            let prev = previous.as_ref();
            MetricDeltas {
                energy: percent_delta(cur.avg_energy, prev.map(|p| p.avg_energy)),
                mental_pressure: percent_delta(
                    cur.avg_mental_pressure,
                    prev.map(|p| p.avg_mental_pressure),
                ),
                personal_concerns: percent_delta(
                    cur.avg_personal_concerns,
                    prev.map(|p| p.avg_personal_concerns),
                ),
                achievements: percent_delta(
                    cur.avg_achievements,
                    prev.map(|p| p.avg_achievements),
                ),
                wellbeing_index: wellbeing
                    .and_then(|now| percent_delta(now, previous_wellbeing)),
            }
        }
        None => MetricDeltas::default(),
    };

    TeamTrends {
        latest,
        week_ago: previous,
        wellbeing_index: wellbeing,
        previous_wellbeing_index: previous_wellbeing,
        deltas,
        alerts,
        history: rows,
    }
}
