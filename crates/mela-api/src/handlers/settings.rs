//! `/api/settings` handlers. Settings are keyed by their unique `key`.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use mela_core::epoch_secs;
use mela_state::input::SettingInput;
use mela_state::{Setting, SettingValue, StateStore};

use crate::ApiState;
use crate::error::{ApiError, Context};
use crate::extract::ApiJson;
use crate::response::{ApiResponse, BulkOutcome};

const NOT_FOUND: &str = "Setting not found";

#[derive(Debug, Default, Deserialize)]
pub struct SettingsQuery {
    pub category: Option<String>,
    /// `keyvalue` groups values by category instead of listing documents.
    pub format: Option<String>,
}

/// `{category: {key: value}}`
pub type GroupedSettings = BTreeMap<String, BTreeMap<String, SettingValue>>;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SettingsListing {
    Documents(Vec<Setting>),
    Grouped(GroupedSettings),
}

pub fn group_by_category(settings: Vec<Setting>) -> GroupedSettings {
    let mut grouped = GroupedSettings::new();
    for s in settings {
        grouped.entry(s.category).or_default().insert(s.key, s.value);
    }
    grouped
}

/// GET /api/settings
pub async fn list_settings(
    State(state): State<ApiState>,
    Query(query): Query<SettingsQuery>,
) -> Result<ApiResponse<SettingsListing>, ApiError> {
    let mut settings = state
        .store
        .list_where(|s: &Setting| query.category.as_deref().is_none_or(|c| s.category == c))
        .context("Error fetching settings")?;
    settings.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.key.cmp(&b.key)));
    let count = settings.len();

    let listing = if query.format.as_deref() == Some("keyvalue") {
        SettingsListing::Grouped(group_by_category(settings))
    } else {
        SettingsListing::Documents(settings)
    };
    Ok(ApiResponse::ok(listing).count(count))
}

/// POST /api/settings
pub async fn create_setting(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<SettingInput>,
) -> Result<ApiResponse<Setting>, ApiError> {
    let setting = input.create(epoch_secs())?;
    let inserted = state
        .store
        .insert_new(&setting)
        .context("Error creating setting")?;
    if !inserted {
        return Err(ApiError::Conflict(format!(
            "Setting with key '{}' already exists",
            setting.key
        )));
    }
    tracing::info!(key = %setting.key, category = %setting.category, "setting created");
    Ok(ApiResponse::created(setting).message("Setting created successfully"))
}

/// Insert or merge one setting.
fn upsert(store: &StateStore, input: SettingInput, now: u64) -> Result<Setting, ApiError> {
    let existing = match input.key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => store
            .get::<Setting>(key)
            .context("Error updating settings")?,
        _ => None,
    };
    let setting = match existing {
        Some(mut setting) => {
            input.apply(&mut setting, now)?;
            setting
        }
        None => input.create(now)?,
    };
    store.put(&setting).context("Error updating settings")?;
    Ok(setting)
}

#[derive(Debug, Deserialize)]
pub struct BulkSettingsRequest {
    pub settings: Vec<serde_json::Value>,
}

/// PUT /api/settings/bulk
pub async fn bulk_upsert_settings(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<BulkSettingsRequest>,
) -> Result<ApiResponse<BulkOutcome<Setting>>, ApiError> {
    let now = epoch_secs();
    let mut outcome = BulkOutcome::new();
    for (index, raw) in request.settings.into_iter().enumerate() {
        let input: SettingInput = match serde_json::from_value(raw.clone()) {
            Ok(input) => input,
            Err(e) => {
                outcome.fail(index, raw, e);
                continue;
            }
        };
        match upsert(&state.store, input, now) {
            Ok(setting) => outcome.succeeded.push(setting),
            Err(e @ ApiError::Internal { .. }) => return Err(e),
            Err(ApiError::Validation(errors)) => outcome.fail(index, raw, errors.join("; ")),
            Err(e) => outcome.fail(index, raw, e),
        }
    }
    let message = outcome.summary("settings");
    Ok(ApiResponse::ok(outcome).message(message))
}

/// GET /api/settings/{key}
pub async fn get_setting(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> Result<ApiResponse<Setting>, ApiError> {
    state
        .store
        .get::<Setting>(&key)
        .context("Error fetching setting")?
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// PUT /api/settings/{key}
pub async fn update_setting(
    State(state): State<ApiState>,
    Path(key): Path<String>,
    ApiJson(input): ApiJson<SettingInput>,
) -> Result<ApiResponse<Setting>, ApiError> {
    let mut setting = state
        .store
        .get::<Setting>(&key)
        .context("Error updating setting")?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    input.apply(&mut setting, epoch_secs())?;
    state.store.put(&setting).context("Error updating setting")?;
    Ok(ApiResponse::ok(setting).message("Setting updated successfully"))
}

/// DELETE /api/settings/{key}
pub async fn delete_setting(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> Result<ApiResponse<Setting>, ApiError> {
    state
        .store
        .delete::<Setting>(&key)
        .context("Error deleting setting")?
        .map(|s| ApiResponse::ok(s).message("Setting deleted successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setting(key: &str, category: &str, value: SettingValue) -> Setting {
        Setting {
            key: key.to_string(),
            value,
            category: category.to_string(),
            description: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn keyvalue_groups_by_category() {
        let grouped = group_by_category(vec![
            setting("maxCapacity", "crowd", SettingValue::Number(5000.0)),
            setting("alertsEnabled", "general", SettingValue::Bool(true)),
            setting("threshold", "crowd", SettingValue::Number(0.8)),
        ]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["crowd"].len(), 2);
        assert_eq!(grouped["general"]["alertsEnabled"], SettingValue::Bool(true));
    }

    #[test]
    fn upsert_creates_then_merges() {
        let store = StateStore::open_in_memory().unwrap();
        let first: SettingInput =
            serde_json::from_value(serde_json::json!({"key": "theme", "value": "saffron"})).unwrap();
        let created = upsert(&store, first, 1).unwrap();
        assert_eq!(created.category, "general");

        let second: SettingInput = serde_json::from_value(
            serde_json::json!({"key": "theme", "value": "white", "category": "ui"}),
        )
        .unwrap();
        let merged = upsert(&store, second, 2).unwrap();
        assert_eq!(merged.value, SettingValue::Text("white".to_string()));
        assert_eq!(merged.category, "ui");
        assert_eq!(merged.created_at, 1);
        assert_eq!(store.list::<Setting>().unwrap().len(), 1);
    }

    #[test]
    fn upsert_without_key_is_validation_error() {
        let store = StateStore::open_in_memory().unwrap();
        let input: SettingInput =
            serde_json::from_value(serde_json::json!({"value": 1})).unwrap();
        assert!(matches!(upsert(&store, input, 1), Err(ApiError::Validation(_))));
    }
}
