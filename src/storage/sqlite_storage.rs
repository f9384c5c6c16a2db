use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::{debug, info, instrument};

use crate::{
    domain::{
        ordering::{self, Placement, UNKNOWN_IDS},
        Card, CardChanges, CardId, Lane, LaneOrder, NewCard, ReorderBatch,
    },
    error::{BoardError, Result},
    storage::{Database, Storage},
};

const CARD_COLUMNS: &str = "id, title, description, lane, position, created_at, updated_at";

/// SQLite-backed card storage.
///
/// Every write opens a `BEGIN IMMEDIATE` transaction, which takes SQLite's
/// write lock up front. Two reorders of the same lane therefore never read
/// the same resident set, whether they come from this process or another one
/// sharing the file.
#[derive(Clone)]
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the database file and brings its schema up to date
    pub async fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::open_and_migrate(path, busy_timeout).await?;
        Ok(Self::new(db))
    }

    /// Migrated in-memory storage
    pub async fn in_memory() -> Result<Self> {
        let storage = Self::new(Database::open_in_memory()?);
        storage.initialize().await?;
        Ok(storage)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        self.db.run_migrations().await
    }

    #[instrument(skip(self))]
    async fn create_card(&self, card: NewCard) -> Result<Card> {
        let created = self
            .db
            .write(move |tx| {
                let max: Option<i64> = tx.query_row(
                    "SELECT MAX(position) FROM cards WHERE lane = ?1",
                    params![card.lane],
                    |row| row.get(0),
                )?;
                let position = ordering::next_position(max)?;
                let now = Utc::now();

                tx.execute(
                    "INSERT INTO cards (title, description, lane, position, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![card.title, card.description, card.lane, position, now],
                )?;
                let id = CardId::new(tx.last_insert_rowid());

                Ok(Card {
                    id,
                    title: card.title,
                    description: card.description,
                    lane: card.lane,
                    position,
                    created_at: now,
                    updated_at: now,
                })
            })
            .await?;

        debug!(card_id = %created.id, lane = %created.lane, position = created.position, "card created");
        Ok(created)
    }

    async fn load_card(&self, id: CardId) -> Result<Card> {
        self.db.execute(move |conn| fetch_card(conn, id)).await
    }

    async fn list_cards(&self) -> Result<Vec<Card>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CARD_COLUMNS} FROM cards ORDER BY lane, position, id"
                ))?;
                let cards = stmt
                    .query_map([], map_card)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(cards)
            })
            .await
    }

    async fn list_lane(&self, lane: Lane) -> Result<Vec<Card>> {
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CARD_COLUMNS} FROM cards WHERE lane = ?1 ORDER BY position, id"
                ))?;
                let cards = stmt
                    .query_map(params![lane], map_card)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(cards)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn update_card(&self, id: CardId, changes: CardChanges) -> Result<Card> {
        let updated = self
            .db
            .write(move |tx| {
                let mut card = fetch_card(tx, id)?;
                card.apply(changes);
                tx.execute(
                    "UPDATE cards SET title = ?1, description = ?2, lane = ?3, position = ?4, \
                     updated_at = ?5 WHERE id = ?6",
                    params![
                        card.title,
                        card.description,
                        card.lane,
                        card.position,
                        card.updated_at,
                        card.id
                    ],
                )?;
                Ok(card)
            })
            .await?;

        debug!(card_id = %updated.id, "card updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_card(&self, id: CardId) -> Result<()> {
        let (lane, shifted) = self
            .db
            .write(move |tx| {
                let lane: Lane = tx
                    .query_row("SELECT lane FROM cards WHERE id = ?1", params![id], |row| {
                        row.get(0)
                    })
                    .optional()?
                    .ok_or(BoardError::CardNotFound(id))?;

                tx.execute("DELETE FROM cards WHERE id = ?1", params![id])?;

                let moves = ordering::compact(lane, &lane_residents(tx, lane)?);
                write_placements(tx, &moves, Utc::now())?;
                Ok((lane, moves.len()))
            })
            .await?;

        debug!(card_id = %id, lane = %lane, shifted, "card deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(lane = %order.lane, count = order.ids.len()))]
    async fn reorder(&self, order: LaneOrder) -> Result<()> {
        let batch = ReorderBatch::single(order);
        self.db
            .write(move |tx| apply_batch(tx, &batch, false))
            .await?;
        debug!("lane reordered");
        Ok(())
    }

    #[instrument(skip(self), fields(lanes = batch.lanes.len()))]
    async fn reorder_batch(&self, batch: ReorderBatch) -> Result<()> {
        let compacted = self
            .db
            .write(move |tx| apply_batch(tx, &batch, true))
            .await?;
        info!(compacted = ?compacted, "batch reorder committed");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.db.ping().await
    }
}

/// Applies a reorder batch inside the caller's immediate transaction.
/// Returns the lanes outside the batch that were compacted.
fn apply_batch(
    tx: &Transaction<'_>,
    batch: &ReorderBatch,
    compact_sources: bool,
) -> Result<Vec<Lane>> {
    let claimed = batch.claimed();

    // Existence is checked under the write lock, before any mutation.
    let mut sources = BTreeSet::new();
    for id in &claimed {
        let lane: Option<Lane> = tx
            .query_row("SELECT lane FROM cards WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        match lane {
            Some(lane) => {
                sources.insert(lane);
            }
            None => return Err(BoardError::validation(UNKNOWN_IDS)),
        }
    }

    let mut placements = Vec::new();
    for (lane, ordered) in &batch.lanes {
        let residents: Vec<CardId> = lane_residents(tx, *lane)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        placements.extend(ordering::plan_lane(*lane, ordered, &residents, &claimed));
    }

    let now = Utc::now();
    write_placements(tx, &placements, now)?;

    let mut compacted = Vec::new();
    if compact_sources {
        for lane in sources.into_iter().filter(|l| !batch.lanes.contains_key(l)) {
            let moves = ordering::compact(lane, &lane_residents(tx, lane)?);
            write_placements(tx, &moves, now)?;
            compacted.push(lane);
        }
    }

    Ok(compacted)
}

fn fetch_card(conn: &Connection, id: CardId) -> Result<Card> {
    conn.query_row(
        &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"),
        params![id],
        map_card,
    )
    .optional()?
    .ok_or(BoardError::CardNotFound(id))
}

/// Cards of one lane with their positions, in (position, id) order
fn lane_residents(conn: &Connection, lane: Lane) -> Result<Vec<(CardId, i64)>> {
    let mut stmt =
        conn.prepare_cached("SELECT id, position FROM cards WHERE lane = ?1 ORDER BY position, id")?;
    let residents = stmt
        .query_map(params![lane], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(residents)
}

fn write_placements(conn: &Connection, placements: &[Placement], now: DateTime<Utc>) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "UPDATE cards SET lane = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
    )?;
    for placement in placements {
        stmt.execute(params![placement.lane, placement.position, now, placement.id])?;
    }
    Ok(())
}

fn map_card(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        lane: row.get(3)?,
        position: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl ToSql for Lane {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Lane {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: BoardError| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for CardId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.get()))
    }
}

impl FromSql for CardId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_i64().map(CardId::new)
    }
}
