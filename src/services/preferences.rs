use std::collections::BTreeMap;

use uuid::Uuid;

use crate::dto::{PreferencesResponse, ToggleEmotionResponse};
use crate::error::{AppError, AppResult};
use crate::models::weather::Weather;
use crate::store::GardenStore;

pub const MAX_TAGS_PER_WEATHER: usize = 3;
const MAX_TAG_LEN: usize = 40;

/// Onboarding selection: up to three emotion tags per weather.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmotionSelection {
    tags: BTreeMap<Weather, Vec<String>>,
}

impl EmotionSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a selection from a submitted mapping, applying the same rules
    /// as interactive selection. Duplicate tags collapse.
    pub fn from_mapping(mapping: &BTreeMap<Weather, Vec<String>>) -> AppResult<Self> {
        let mut selection = Self::new();
        for (weather, tags) in mapping {
            for tag in tags {
                selection.select(*weather, tag)?;
            }
        }
        Ok(selection)
    }

    /// Adds `tag` under `weather`. Already selected tags are a no-op; a 4th
    /// distinct tag is rejected and leaves the selection untouched.
    pub fn select(&mut self, weather: Weather, tag: &str) -> AppResult<()> {
        let tag = normalize_tag(tag)?;
        let current = self.tags.entry(weather).or_default();
        if current.contains(&tag) {
            return Ok(());
        }
        if current.len() >= MAX_TAGS_PER_WEATHER {
            return Err(AppError::Validation(format!(
                "Maximum of {MAX_TAGS_PER_WEATHER} emotions reached for {} weather",
                weather.as_str()
            )));
        }
        current.push(tag);
        Ok(())
    }

    /// Selects or deselects `tag`; returns whether it is selected afterwards.
    pub fn toggle(&mut self, weather: Weather, tag: &str) -> AppResult<bool> {
        let normalized = normalize_tag(tag)?;
        if let Some(current) = self.tags.get_mut(&weather) {
            if let Some(pos) = current.iter().position(|t| *t == normalized) {
                current.remove(pos);
                return Ok(false);
            }
        }
        self.select(weather, &normalized)?;
        Ok(true)
    }

    pub fn tags(&self, weather: Weather) -> &[String] {
        self.tags.get(&weather).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every weather carries at least one tag.
    pub fn is_complete(&self) -> bool {
        Weather::ALL.iter().all(|w| !self.tags(*w).is_empty())
    }

    fn rows(&self) -> Vec<(Weather, String)> {
        self.tags
            .iter()
            .flat_map(|(weather, tags)| tags.iter().map(move |t| (*weather, t.clone())))
            .collect()
    }

    fn into_mapping(self) -> BTreeMap<Weather, Vec<String>> {
        self.tags.into_iter().filter(|(_, tags)| !tags.is_empty()).collect()
    }
}

fn normalize_tag(tag: &str) -> AppResult<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(AppError::Validation("Emotion tags cannot be blank".into()));
    }
    if tag.chars().count() > MAX_TAG_LEN {
        return Err(AppError::Validation(format!(
            "Emotion tags must be at most {MAX_TAG_LEN} characters"
        )));
    }
    Ok(tag.to_string())
}

async fn load_selection(store: &dyn GardenStore, user_id: Uuid) -> AppResult<EmotionSelection> {
    let mut selection = EmotionSelection::new();
    for row in store.weather_emotions(user_id).await? {
        // Stored rows predate any rule change; keep what fits.
        if let Err(e) = selection.select(row.weather, &row.emotion) {
            tracing::warn!(user_id = %user_id, error = %e, "Skipping stored weather emotion");
        }
    }
    Ok(selection)
}

pub async fn get_preferences(
    store: &dyn GardenStore,
    user_id: Uuid,
) -> AppResult<PreferencesResponse> {
    let selection = load_selection(store, user_id).await?;
    let onboarding_complete = selection.is_complete();
    Ok(PreferencesResponse {
        emotions: selection.into_mapping(),
        onboarding_complete,
    })
}

/// Replaces the user's whole weather → emotions mapping. The save completes
/// onboarding, so each weather needs at least one tag.
pub async fn replace_preferences(
    store: &dyn GardenStore,
    user_id: Uuid,
    mapping: &BTreeMap<Weather, Vec<String>>,
) -> AppResult<PreferencesResponse> {
    let selection = EmotionSelection::from_mapping(mapping)?;
    if !selection.is_complete() {
        return Err(AppError::Validation(
            "Choose at least one emotion for each weather".into(),
        ));
    }

    store
        .replace_weather_emotions(user_id, &selection.rows())
        .await?;

    tracing::info!(user_id = %user_id, tags = selection.rows().len(), "Weather emotions replaced");
    Ok(PreferencesResponse {
        emotions: selection.into_mapping(),
        onboarding_complete: true,
    })
}

/// Interactive onboarding step: selects or deselects one tag and persists the
/// result. Partial sets are fine here; onboarding is complete once every
/// weather has a tag.
pub async fn toggle_preference(
    store: &dyn GardenStore,
    user_id: Uuid,
    weather: Weather,
    tag: &str,
) -> AppResult<ToggleEmotionResponse> {
    let mut selection = load_selection(store, user_id).await?;
    let selected = selection.toggle(weather, tag)?;
    store
        .replace_weather_emotions(user_id, &selection.rows())
        .await?;

    tracing::debug!(user_id = %user_id, weather = weather.as_str(), selected, "Weather emotion toggled");
    let onboarding_complete = selection.is_complete();
    Ok(ToggleEmotionResponse {
        selected,
        preferences: PreferencesResponse {
            emotions: selection.into_mapping(),
            onboarding_complete,
        },
    })
}
