//! The ordering engine's public face.
//!
//! [`Board`] validates caller input and hands checked values to a
//! [`Storage`] backend, which owns every write. It keeps no state of its own
//! between calls.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    domain::{
        is_dense, BatchReorderRequest, Card, CardId, CardPatch, CreateCard, Lane,
        ReorderRequest,
    },
    error::Result,
    storage::Storage,
};

/// Density status of one lane
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneReport {
    pub lane: Lane,
    pub count: usize,
    pub dense: bool,
}

#[derive(Clone)]
pub struct Board {
    storage: Arc<dyn Storage>,
}

impl Board {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Creates a card at the end of its lane (the first lane when no hint is
    /// given).
    pub async fn create(&self, request: CreateCard) -> Result<Card> {
        let card = request.validate()?;
        let card = self.storage.create_card(card).await?;
        info!(card_id = %card.id, lane = %card.lane, "card created");
        Ok(card)
    }

    pub async fn get(&self, id: CardId) -> Result<Card> {
        self.storage.load_card(id).await
    }

    /// Every card ordered by (lane, position, id)
    pub async fn list(&self) -> Result<Vec<Card>> {
        self.storage.list_cards().await
    }

    pub async fn list_lane(&self, lane: Lane) -> Result<Vec<Card>> {
        self.storage.list_lane(lane).await
    }

    /// Applies the provided fields only.
    ///
    /// A lane or position change here does not renumber the card's old or new
    /// siblings; callers that need a dense lane follow up with
    /// [`Board::reorder`].
    pub async fn patch(&self, id: CardId, patch: CardPatch) -> Result<Card> {
        let changes = patch.validate()?;
        self.storage.update_card(id, changes).await
    }

    /// Deletes a card; the rest of its lane shifts up to stay dense
    pub async fn delete(&self, id: CardId) -> Result<()> {
        self.storage.delete_card(id).await?;
        info!(card_id = %id, "card deleted");
        Ok(())
    }

    pub async fn reorder(&self, request: ReorderRequest) -> Result<()> {
        let order = request.validate()?;
        self.storage.reorder(order).await
    }

    /// Lays out several lanes atomically, so a move between lanes is a single
    /// commit
    pub async fn reorder_batch(&self, request: BatchReorderRequest) -> Result<()> {
        let batch = request.validate()?;
        self.storage.reorder_batch(batch).await
    }

    pub async fn is_healthy(&self) -> bool {
        self.storage.is_healthy().await
    }

    /// Reports, for every lane, whether its positions are exactly `0..n`
    pub async fn lane_reports(&self) -> Result<Vec<LaneReport>> {
        let mut reports = Vec::with_capacity(Lane::ALL.len());
        for lane in Lane::ALL {
            let positions: Vec<i64> = self
                .storage
                .list_lane(lane)
                .await?
                .iter()
                .map(|card| card.position)
                .collect();
            let dense = is_dense(&positions);
            if !dense {
                warn!(lane = %lane, "lane positions are not dense");
            }
            reports.push(LaneReport {
                lane,
                count: positions.len(),
                dense,
            });
        }
        Ok(reports)
    }
}
