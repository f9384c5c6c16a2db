//! Position arithmetic for dense per-lane ordering.
//!
//! Everything here is pure: storage reads the current lane layout, asks this
//! module where each card should go, and writes the resulting placements
//! inside its own transaction.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

use crate::domain::{card::CardId, lane::Lane};
use crate::error::BoardError;

pub const DUPLICATE_IDS: &str = "Duplicate card ids are not allowed.";
pub const UNKNOWN_IDS: &str = "One or more card ids do not exist.";
pub const DUPLICATE_LANES: &str = "Duplicate lanes are not allowed.";

/// Position for a card appended to a lane whose highest position is `max`
pub fn next_position(max: Option<i64>) -> Result<i64, BoardError> {
    match max {
        None => Ok(0),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| BoardError::validation("Lane has no free position.")),
    }
}

/// Returns true when `positions` is exactly `0..len` in some order
pub fn is_dense(positions: &[i64]) -> bool {
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(index, position)| *position == index as i64)
}

/// Where a card must end up after a renumbering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub id: CardId,
    pub lane: Lane,
    pub position: i64,
}

/// Lays out one lane: `ordered` first, in the caller's order, then every
/// resident not in `claimed`, keeping the residents' relative order.
///
/// `residents` must already be sorted by `(position, id)`. `claimed` holds
/// every id the caller placed explicitly anywhere, so a card moved to another
/// lane in the same batch is not counted as resident here.
pub fn plan_lane(
    lane: Lane,
    ordered: &[CardId],
    residents: &[CardId],
    claimed: &HashSet<CardId>,
) -> Vec<Placement> {
    ordered
        .iter()
        .chain(residents.iter().filter(|id| !claimed.contains(*id)))
        .enumerate()
        .map(|(index, id)| Placement {
            id: *id,
            lane,
            position: index as i64,
        })
        .collect()
}

/// Renumbers a lane to `0..n` in its current `(position, id)` order, returning
/// only the cards whose position actually changes.
pub fn compact(lane: Lane, residents: &[(CardId, i64)]) -> Vec<Placement> {
    let mut sorted = residents.to_vec();
    sorted.sort_by_key(|(id, position)| (*position, *id));
    sorted
        .into_iter()
        .enumerate()
        .filter(|(index, (_, position))| *position != *index as i64)
        .map(|(index, (id, _))| Placement {
            id,
            lane,
            position: index as i64,
        })
        .collect()
}

/// Body of a single-lane reorder request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    #[serde(default, alias = "status")]
    pub lane: Option<String>,
    #[serde(default)]
    pub ordered_ids: Vec<i64>,
}

impl ReorderRequest {
    pub fn new(lane: Lane, ordered_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            lane: Some(lane.as_str().to_string()),
            ordered_ids: ordered_ids.into_iter().collect(),
        }
    }

    pub fn validate(self) -> Result<LaneOrder, BoardError> {
        let lane: Lane = self.lane.as_deref().unwrap_or_default().parse()?;
        let ids = checked_ids(&self.ordered_ids, &mut HashSet::new())?;
        Ok(LaneOrder { lane, ids })
    }
}

/// Caller's requested front-to-back order for one lane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneOrder {
    pub lane: Lane,
    pub ids: Vec<CardId>,
}

/// Body of a multi-lane reorder request, e.g.
/// `{"lanes": {"todo": [3, 1], "doing": [2]}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchReorderRequest {
    #[serde(default)]
    pub lanes: BTreeMap<String, Vec<i64>>,
}

impl BatchReorderRequest {
    pub fn validate(self) -> Result<ReorderBatch, BoardError> {
        if self.lanes.is_empty() {
            return Err(BoardError::validation("No lanes provided."));
        }

        let mut seen = HashSet::new();
        let mut lanes = BTreeMap::new();
        for (lane, ids) in self.lanes {
            let lane: Lane = lane.parse()?;
            // "done" and " done" name the same lane
            if lanes.insert(lane, checked_ids(&ids, &mut seen)?).is_some() {
                return Err(BoardError::validation(DUPLICATE_LANES));
            }
        }
        Ok(ReorderBatch { lanes })
    }
}

/// Validated set of lane orders committed together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderBatch {
    pub lanes: BTreeMap<Lane, Vec<CardId>>,
}

impl ReorderBatch {
    pub fn single(order: LaneOrder) -> Self {
        let mut lanes = BTreeMap::new();
        lanes.insert(order.lane, order.ids);
        Self { lanes }
    }

    /// Every id named in the batch, across all lanes
    pub fn claimed(&self) -> HashSet<CardId> {
        self.lanes.values().flatten().copied().collect()
    }
}

fn checked_ids(raw: &[i64], seen: &mut HashSet<i64>) -> Result<Vec<CardId>, BoardError> {
    for id in raw {
        if !seen.insert(*id) {
            return Err(BoardError::validation(DUPLICATE_IDS));
        }
    }
    // Non-positive ids can never have been assigned
    if raw.iter().any(|id| *id <= 0) {
        return Err(BoardError::validation(UNKNOWN_IDS));
    }
    Ok(raw.iter().copied().map(CardId::new).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i64]) -> Vec<CardId> {
        raw.iter().copied().map(CardId::new).collect()
    }

    #[test]
    fn test_next_position() {
        assert_eq!(next_position(None).unwrap(), 0);
        assert_eq!(next_position(Some(0)).unwrap(), 1);
        assert_eq!(next_position(Some(7)).unwrap(), 8);
    }

    #[test]
    fn test_next_position_at_integer_limit() {
        assert!(next_position(Some(i64::MAX)).is_err());
        assert_eq!(next_position(Some(i64::MAX - 1)).unwrap(), i64::MAX);
    }

    #[test]
    fn test_is_dense() {
        assert!(is_dense(&[]));
        assert!(is_dense(&[0]));
        assert!(is_dense(&[2, 0, 1]));
        assert!(!is_dense(&[0, 0, 1]));
        assert!(!is_dense(&[0, 2]));
        assert!(!is_dense(&[1]));
    }

    #[test]
    fn test_plan_lane_appends_unmentioned_residents() {
        let ordered = ids(&[3, 1]);
        let claimed: HashSet<CardId> = ordered.iter().copied().collect();
        let plan = plan_lane(Lane::Todo, &ordered, &ids(&[1, 2, 3]), &claimed);

        let layout: Vec<(i64, i64)> = plan.iter().map(|p| (p.id.get(), p.position)).collect();
        assert_eq!(layout, vec![(3, 0), (1, 1), (2, 2)]);
        assert!(plan.iter().all(|p| p.lane == Lane::Todo));
    }

    #[test]
    fn test_plan_lane_with_empty_order_keeps_residents() {
        let plan = plan_lane(Lane::Done, &[], &ids(&[5, 4, 9]), &HashSet::new());
        let layout: Vec<(i64, i64)> = plan.iter().map(|p| (p.id.get(), p.position)).collect();
        assert_eq!(layout, vec![(5, 0), (4, 1), (9, 2)]);
    }

    #[test]
    fn test_plan_lane_skips_ids_claimed_elsewhere() {
        // Card 2 is being moved to another lane in the same batch
        let claimed: HashSet<CardId> = ids(&[2]).into_iter().collect();
        let plan = plan_lane(Lane::Todo, &[], &ids(&[1, 2, 3]), &claimed);
        let layout: Vec<(i64, i64)> = plan.iter().map(|p| (p.id.get(), p.position)).collect();
        assert_eq!(layout, vec![(1, 0), (3, 1)]);
    }

    #[test]
    fn test_compact_returns_only_moved_cards() {
        let residents = vec![
            (CardId::new(1), 0),
            (CardId::new(3), 2),
            (CardId::new(4), 3),
        ];
        let moves = compact(Lane::Doing, &residents);
        let layout: Vec<(i64, i64)> = moves.iter().map(|p| (p.id.get(), p.position)).collect();
        assert_eq!(layout, vec![(3, 1), (4, 2)]);
    }

    #[test]
    fn test_compact_breaks_position_ties_by_id() {
        let residents = vec![(CardId::new(9), 0), (CardId::new(2), 0)];
        let moves = compact(Lane::Todo, &residents);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].id, CardId::new(9));
        assert_eq!(moves[0].position, 1);
    }

    #[test]
    fn test_reorder_request_validation() {
        let order = ReorderRequest::new(Lane::Doing, [4, 2]).validate().unwrap();
        assert_eq!(order.lane, Lane::Doing);
        assert_eq!(order.ids, ids(&[4, 2]));

        let err = ReorderRequest::new(Lane::Todo, [1, 2, 1])
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), DUPLICATE_IDS);

        let err = ReorderRequest::new(Lane::Todo, [0]).validate().unwrap_err();
        assert_eq!(err.to_string(), UNKNOWN_IDS);

        let err = ReorderRequest::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid lane.");
    }

    #[test]
    fn test_reorder_request_deserializes_source_shape() {
        let request: ReorderRequest =
            serde_json::from_str(r#"{"status":"done","orderedIds":[2,1]}"#).unwrap();
        let order = request.validate().unwrap();
        assert_eq!(order.lane, Lane::Done);
        assert_eq!(order.ids, ids(&[2, 1]));
    }

    #[test]
    fn test_batch_rejects_ids_repeated_across_lanes() {
        let request: BatchReorderRequest =
            serde_json::from_str(r#"{"lanes":{"todo":[1,2],"doing":[2]}}"#).unwrap();
        assert_eq!(request.validate().unwrap_err().to_string(), DUPLICATE_IDS);
    }

    #[test]
    fn test_batch_validation() {
        let err = BatchReorderRequest::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "No lanes provided.");

        let request: BatchReorderRequest =
            serde_json::from_str(r#"{"lanes":{"later":[1]}}"#).unwrap();
        assert_eq!(request.validate().unwrap_err().to_string(), "Invalid lane.");

        let request: BatchReorderRequest =
            serde_json::from_str(r#"{"lanes":{"todo":[3],"done":[1,2]}}"#).unwrap();
        let batch = request.validate().unwrap();
        assert_eq!(batch.lanes.len(), 2);
        assert_eq!(batch.claimed().len(), 3);
    }

    #[test]
    fn test_batch_rejects_keys_naming_the_same_lane() {
        let request: BatchReorderRequest =
            serde_json::from_str(r#"{"lanes":{"done":[1],"done ":[2]}}"#).unwrap();
        assert_eq!(request.validate().unwrap_err().to_string(), DUPLICATE_LANES);

        let request: BatchReorderRequest =
            serde_json::from_str(r#"{"lanes":{" todo":[],"todo":[]}}"#).unwrap();
        assert_eq!(request.validate().unwrap_err().to_string(), DUPLICATE_LANES);
    }
}
