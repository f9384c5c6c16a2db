pub mod card;
pub mod lane;
pub mod ordering;

pub use card::{Card, CardChanges, CardId, CardPatch, CreateCard, NewCard};
pub use lane::Lane;
pub use ordering::{
    is_dense, BatchReorderRequest, LaneOrder, Placement, ReorderBatch, ReorderRequest,
};
