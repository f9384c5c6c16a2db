//! HTTP + JSON surface of the board.
//!
//! - `GET/POST /records`, `GET/PATCH/DELETE /records/{id}` for card CRUD.
//! - `POST /reorder` and `POST /reorder/batch` for renumbering lanes.
//! - `GET /health` for readiness.

pub mod api;
pub mod server;
pub mod state;

pub use server::WebServer;
pub use state::AppState;
