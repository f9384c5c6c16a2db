//! # Laneboard
//!
//! Ordering engine for a three-lane card board.
//!
//! Cards live in one of a fixed set of lanes and carry a zero-based position
//! that is kept dense (`0..n`, no gaps, no duplicates) by the reorder and
//! delete operations. All state lives in SQLite; every mutation is a single
//! write-locking transaction, so concurrent callers never observe a half
//! renumbered lane.
//!
//! The [`web`] module exposes the engine over HTTP + JSON.

pub mod board;
pub mod config;
pub mod domain;
pub mod error;
pub mod storage;
pub mod web;

// Re-export commonly used types
pub use board::{Board, LaneReport};
pub use config::Config;
pub use domain::{
    card::{Card, CardId, CardPatch, CreateCard},
    lane::Lane,
    ordering::{BatchReorderRequest, ReorderRequest},
};
pub use error::{BoardError, ErrorKind, Result};
pub use storage::{SqliteStorage, Storage};
