//! `/api/lost-found` handlers.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use mela_core::epoch_secs;
use mela_insight::{MatchCandidate, find_matches};
use mela_state::input::{ClaimInput, LostFoundInput};
use mela_state::{ItemKind, ItemStatus, LostFound};

use crate::ApiState;
use crate::error::{ApiError, Context};
use crate::extract::ApiJson;
use crate::response::ApiResponse;

const NOT_FOUND: &str = "Item not found";
const UNCATEGORIZED: &str = "uncategorized";
const RECENT_ACTIVITY: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct LostFoundQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring of item, description or reporter.
    pub search: Option<String>,
}

fn matches_search(entry: &LostFound, needle: &str) -> bool {
    [
        Some(entry.item.as_str()),
        entry.description.as_deref(),
        entry.reporter.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

/// GET /api/lost-found
pub async fn list_items(
    State(state): State<ApiState>,
    Query(query): Query<LostFoundQuery>,
) -> Result<ApiResponse<Vec<LostFound>>, ApiError> {
    let needle = query.search.as_deref().map(|s| s.trim().to_lowercase());
    let mut items = state
        .store
        .list_where(|e: &LostFound| {
            query.kind.as_deref().is_none_or(|k| e.kind.as_str() == k)
                && query.status.as_deref().is_none_or(|s| e.status.as_str() == s)
                && query
                    .category
                    .as_deref()
                    .is_none_or(|c| e.category.as_deref() == Some(c))
                && needle.as_deref().is_none_or(|n| matches_search(e, n))
        })
        .context("Error fetching lost and found items")?;
    items.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));

    let count = items.len();
    Ok(ApiResponse::ok(items).count(count))
}

/// POST /api/lost-found and POST /api/lost-found/report
pub async fn report_item(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<LostFoundInput>,
) -> Result<ApiResponse<LostFound>, ApiError> {
    let entry = input.create(epoch_secs())?;
    state.store.put(&entry).context("Error reporting item")?;
    tracing::info!(id = %entry.id, kind = %entry.kind, item = %entry.item, "item reported");
    Ok(ApiResponse::created(entry).message("Item reported successfully"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub item: String,
    pub status: ItemStatus,
    pub reported_at: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LostFoundStats {
    pub total_reports: usize,
    pub lost_items: usize,
    pub found_items: usize,
    pub open: usize,
    pub claimed: usize,
    pub resolved: usize,
    pub by_category: BTreeMap<String, usize>,
    pub recent_activity: Vec<RecentActivity>,
}

impl LostFoundStats {
    pub fn of(mut items: Vec<LostFound>) -> Self {
        let count_kind = |k: ItemKind| items.iter().filter(|e| e.kind == k).count();
        let count_status = |s: ItemStatus| items.iter().filter(|e| e.status == s).count();
        let lost_items = count_kind(ItemKind::Lost);
        let found_items = count_kind(ItemKind::Found);
        let open = count_status(ItemStatus::Open);
        let claimed = count_status(ItemStatus::Claimed);
        let resolved = count_status(ItemStatus::Resolved);

        let mut by_category = BTreeMap::new();
        for e in &items {
            let category = e.category.as_deref().unwrap_or(UNCATEGORIZED);
            *by_category.entry(category.to_string()).or_insert(0) += 1;
        }

        items.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));
        let total_reports = items.len();
        let recent_activity = items
            .into_iter()
            .take(RECENT_ACTIVITY)
            .map(|e| RecentActivity {
                id: e.id,
                kind: e.kind,
                item: e.item,
                status: e.status,
                reported_at: e.reported_at,
            })
            .collect();

        Self {
            total_reports,
            lost_items,
            found_items,
            open,
            claimed,
            resolved,
            by_category,
            recent_activity,
        }
    }
}

/// GET /api/lost-found/stats
pub async fn item_stats(State(state): State<ApiState>) -> Result<ApiResponse<LostFoundStats>, ApiError> {
    let items = state
        .store
        .list::<LostFound>()
        .context("Error fetching lost and found statistics")?;
    Ok(ApiResponse::ok(LostFoundStats::of(items)))
}

/// GET /api/lost-found/matches
pub async fn item_matches(
    State(state): State<ApiState>,
) -> Result<ApiResponse<Vec<MatchCandidate>>, ApiError> {
    let items = state
        .store
        .list::<LostFound>()
        .context("Error finding matches")?;
    let matches = find_matches(&items);
    let count = matches.len();
    Ok(ApiResponse::ok(matches)
        .count(count)
        .message("Potential matches found"))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub reporter: Option<String>,
}

/// GET /api/lost-found/history?reporter=
pub async fn reporter_history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> Result<ApiResponse<Vec<LostFound>>, ApiError> {
    let reporter = query
        .reporter
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("reporter is required"))?;
    let mut items = state
        .store
        .list_where(|e: &LostFound| e.reporter.as_deref() == Some(reporter.trim()))
        .context("Error fetching report history")?;
    items.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));
    let count = items.len();
    Ok(ApiResponse::ok(items).count(count))
}

/// GET /api/lost-found/{id}
pub async fn get_item(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<LostFound>, ApiError> {
    state
        .store
        .get::<LostFound>(&id)
        .context("Error fetching item")?
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// PUT /api/lost-found/{id}
pub async fn update_item(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<LostFoundInput>,
) -> Result<ApiResponse<LostFound>, ApiError> {
    let mut entry = state
        .store
        .get::<LostFound>(&id)
        .context("Error updating item")?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    input.apply(&mut entry, epoch_secs())?;
    state.store.put(&entry).context("Error updating item")?;
    Ok(ApiResponse::ok(entry).message("Item updated successfully"))
}

/// DELETE /api/lost-found/{id}
pub async fn delete_item(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<LostFound>, ApiError> {
    state
        .store
        .delete::<LostFound>(&id)
        .context("Error deleting item")?
        .map(|e| ApiResponse::ok(e).message("Item deleted successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// PATCH /api/lost-found/{id}/claim
pub async fn claim_item(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<LostFound>, ApiError> {
    // The claimant is optional, so an empty body is accepted.
    let claim: ClaimInput = if body.is_empty() {
        ClaimInput::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?
    };
    let claimed_by = claim.claimed_by;
    let now = epoch_secs();
    state
        .store
        .modify::<LostFound>(&id, |e| e.claim(claimed_by, now))
        .context("Error claiming item")?
        .map(|e| ApiResponse::ok(e).message("Item claimed successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// PATCH /api/lost-found/{id}/resolve
pub async fn resolve_item(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<LostFound>, ApiError> {
    let now = epoch_secs();
    state
        .store
        .modify::<LostFound>(&id, |e| e.resolve(now))
        .context("Error resolving item")?
        .map(|e| ApiResponse::ok(e).message("Item resolved successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mela_state::GeoPoint;

    fn entry(kind: ItemKind, item: &str, category: Option<&str>, reported_at: u64) -> LostFound {
        LostFound {
            id: format!("{item}-{reported_at}"),
            kind,
            item: item.to_string(),
            description: None,
            category: category.map(str::to_string),
            status: ItemStatus::Open,
            reported_at,
            location: "Gate 1".to_string(),
            coordinates: GeoPoint::new(25.43, 81.88),
            reporter: Some("Asha".to_string()),
            image_url: None,
            claimed_by: None,
            claimed_at: None,
            created_at: reported_at,
            updated_at: reported_at,
        }
    }

    #[test]
    fn stats_count_kinds_and_categories() {
        let mut claimed = entry(ItemKind::Found, "Phone", Some("electronics"), 30);
        claimed.status = ItemStatus::Claimed;
        let stats = LostFoundStats::of(vec![
            entry(ItemKind::Lost, "Wallet", Some("accessories"), 10),
            entry(ItemKind::Lost, "Bag", None, 20),
            claimed,
        ]);
        assert_eq!(stats.total_reports, 3);
        assert_eq!(stats.lost_items, 2);
        assert_eq!(stats.found_items, 1);
        assert_eq!(stats.open, 2);
        assert_eq!(stats.claimed, 1);
        assert_eq!(stats.by_category[UNCATEGORIZED], 1);
        assert_eq!(stats.recent_activity[0].item, "Phone");
    }

    #[test]
    fn search_covers_reporter_and_description() {
        let mut e = entry(ItemKind::Lost, "Umbrella", None, 1);
        e.description = Some("Blue with white dots".to_string());
        assert!(matches_search(&e, "white"));
        assert!(matches_search(&e, "asha"));
        assert!(matches_search(&e, "umbr"));
        assert!(!matches_search(&e, "wallet"));
    }
}
