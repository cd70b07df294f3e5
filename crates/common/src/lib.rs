//! Identifier types shared by every layer of the stock transfer engine.

mod ids;

pub use ids::{ActorId, ItemId, ParseIdError, TransferId, WarehouseId};
