use crate::{
    domain::{Card, CardChanges, CardId, Lane, LaneOrder, NewCard, ReorderBatch},
    error::Result,
};
use async_trait::async_trait;

pub mod db;
pub mod migration;
pub mod sqlite_storage;

pub use db::Database;
pub use sqlite_storage::SqliteStorage;

/// Persistence for cards. Implementations are the only writers of card state
/// and run every mutation inside a single storage transaction.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Prepares the backend (schema creation, migrations)
    async fn initialize(&self) -> Result<()>;

    /// Appends a card at the end of its lane and returns it with its
    /// assigned id and position
    async fn create_card(&self, card: NewCard) -> Result<Card>;

    /// Loads a card by ID
    async fn load_card(&self, id: CardId) -> Result<Card>;

    /// Lists every card ordered by (lane, position, id)
    async fn list_cards(&self) -> Result<Vec<Card>>;

    /// Lists one lane ordered by (position, id)
    async fn list_lane(&self, lane: Lane) -> Result<Vec<Card>>;

    /// Applies field changes to a card. Siblings are never renumbered.
    async fn update_card(&self, id: CardId, changes: CardChanges) -> Result<Card>;

    /// Deletes a card and closes the gap it leaves in its lane
    async fn delete_card(&self, id: CardId) -> Result<()>;

    /// Moves the listed cards into `order.lane` at positions `0..n`, then
    /// appends the lane's other residents in their prior order. The lanes the
    /// cards came from are left as they are.
    async fn reorder(&self, order: LaneOrder) -> Result<()>;

    /// Lays out several lanes in one transaction. Lanes outside the batch
    /// that lost a card to it are compacted in the same transaction.
    async fn reorder_batch(&self, batch: ReorderBatch) -> Result<()>;

    /// Checks whether the backend is reachable
    async fn is_healthy(&self) -> bool;
}
