//! Shared state handed to every Axum handler.

use crate::board::Board;

#[derive(Clone)]
pub struct AppState {
    /// The ordering engine; the only path to persisted cards.
    pub board: Board,
}
