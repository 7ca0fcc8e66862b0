//! Lost/found pair scoring.
//!
//! Every (lost, found) pair is scored with fixed points:
//! - **Name**: one item name contains the other, case-insensitively (40)
//! - **Category**: both items carry the same category (30)
//! - **Location**: identical location strings (20)
//! - **Recency**: reported within seven days of each other (10)
//!
//! Pairs below [`MIN_SCORE`] are dropped. The scan is brute force, O(n·m).

use serde::Serialize;

use mela_state::{ItemKind, ItemStatus, LostFound};

pub const NAME_POINTS: u32 = 40;
pub const CATEGORY_POINTS: u32 = 30;
pub const LOCATION_POINTS: u32 = 20;
pub const RECENCY_POINTS: u32 = 10;

/// Smallest score reported as a match.
pub const MIN_SCORE: u32 = 50;

const RECENCY_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_score(score: u32) -> Self {
        if score >= 80 {
            Self::High
        } else if score >= 60 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Individual score components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub name: u32,
    pub category: u32,
    pub location: u32,
    pub recency: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.name + self.category + self.location + self.recency
    }
}

/// One side of a proposed match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSide {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<String>,
}

impl From<&LostFound> for MatchSide {
    fn from(item: &LostFound) -> Self {
        Self {
            id: item.id.clone(),
            name: item.item.clone(),
            location: item.location.clone(),
            reported_by: item.reporter.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub lost_item: MatchSide,
    pub found_item: MatchSide,
    pub match_score: u32,
    pub confidence: Confidence,
    pub breakdown: ScoreBreakdown,
}

/// Score a single pair.
pub fn score_pair(lost: &LostFound, found: &LostFound) -> ScoreBreakdown {
    let lost_name = lost.item.to_lowercase();
    let found_name = found.item.to_lowercase();
    let name = if lost_name.contains(&found_name) || found_name.contains(&lost_name) {
        NAME_POINTS
    } else {
        0
    };

    // Items without a category never match on it.
    let category = match (&lost.category, &found.category) {
        (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => CATEGORY_POINTS,
        _ => 0,
    };

    let location = if lost.location == found.location {
        LOCATION_POINTS
    } else {
        0
    };

    let recency = if lost.reported_at.abs_diff(found.reported_at) <= RECENCY_WINDOW_SECS {
        RECENCY_POINTS
    } else {
        0
    };

    ScoreBreakdown {
        name,
        category,
        location,
        recency,
    }
}

/// Pair every open lost item with every open found item and return the
/// matches, best first.
pub fn find_matches(items: &[LostFound]) -> Vec<MatchCandidate> {
    let open = |kind: ItemKind| {
        items
            .iter()
            .filter(move |i| i.kind == kind && i.status == ItemStatus::Open)
    };

    let mut matches: Vec<MatchCandidate> = open(ItemKind::Lost)
        .flat_map(|lost| open(ItemKind::Found).map(move |found| (lost, found)))
        .filter_map(|(lost, found)| {
            let breakdown = score_pair(lost, found);
            let score = breakdown.total();
            (score >= MIN_SCORE).then(|| MatchCandidate {
                lost_item: lost.into(),
                found_item: found.into(),
                match_score: score,
                confidence: Confidence::from_score(score),
                breakdown,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use mela_state::GeoPoint;

    const DAY: u64 = 24 * 60 * 60;

    fn item(id: &str, kind: ItemKind, name: &str, location: &str, reported_at: u64) -> LostFound {
        LostFound {
            id: id.to_string(),
            kind,
            item: name.to_string(),
            description: None,
            category: None,
            status: ItemStatus::Open,
            reported_at,
            location: location.to_string(),
            coordinates: GeoPoint::new(25.43, 81.84),
            reporter: None,
            image_url: None,
            claimed_by: None,
            claimed_at: None,
            created_at: reported_at,
            updated_at: reported_at,
        }
    }

    #[test]
    fn wallet_matches_black_wallet() {
        let lost = item("l1", ItemKind::Lost, "Wallet", "Ghat 5", 10 * DAY);
        let found = item("f1", ItemKind::Found, "Black Wallet", "Ghat 5", 12 * DAY);

        let breakdown = score_pair(&lost, &found);
        assert_eq!(breakdown.total(), 70);
        assert!(Confidence::from_score(breakdown.total()) >= Confidence::Medium);

        let matches = find_matches(&[lost, found]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].lost_item.id, "l1");
        assert_eq!(matches[0].found_item.name, "Black Wallet");
        assert_eq!(matches[0].confidence, Confidence::Medium);
    }

    #[test]
    fn category_needs_both_sides() {
        let mut lost = item("l1", ItemKind::Lost, "Bag", "A", 0);
        let mut found = item("f1", ItemKind::Found, "Bag", "B", 0);
        assert_eq!(score_pair(&lost, &found).category, 0);

        lost.category = Some("Bags".to_string());
        found.category = Some("bags".to_string());
        let breakdown = score_pair(&lost, &found);
        assert_eq!(breakdown.category, CATEGORY_POINTS);
        assert_eq!(breakdown.total(), 80);
        assert_eq!(Confidence::from_score(breakdown.total()), Confidence::High);
    }

    #[test]
    fn old_reports_lose_recency_points() {
        let lost = item("l1", ItemKind::Lost, "Phone", "Gate", 0);
        let found = item("f1", ItemKind::Found, "Phone", "Gate", 8 * DAY);
        assert_eq!(score_pair(&lost, &found).recency, 0);
        assert_eq!(score_pair(&lost, &found).total(), 60);
    }

    #[test]
    fn weak_and_closed_pairs_are_skipped() {
        let lost = item("l1", ItemKind::Lost, "Umbrella", "Gate", 0);
        let unrelated = item("f1", ItemKind::Found, "Spectacles", "Gate", 0);
        let mut claimed = item("f2", ItemKind::Found, "Umbrella", "Gate", 0);
        claimed.status = ItemStatus::Claimed;

        assert!(find_matches(&[lost, unrelated, claimed]).is_empty());
    }

    #[test]
    fn matches_sorted_best_first() {
        let lost = item("l1", ItemKind::Lost, "Watch", "Ghat 1", 0);
        let near = item("f1", ItemKind::Found, "watch", "Ghat 1", DAY);
        let far = item("f2", ItemKind::Found, "Gold Watch", "Ghat 9", DAY);

        let matches = find_matches(&[far, lost, near]);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].found_item.id, "f1");
        assert_eq!(matches[0].match_score, 70);
        assert_eq!(matches[1].match_score, 50);
        assert_eq!(matches[1].confidence, Confidence::Low);
    }
}
