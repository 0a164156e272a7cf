pub mod alert;
pub mod audit;
pub mod dispatch;
pub mod estimate;
pub mod import;
pub mod merge;
pub mod offer;
pub mod offer_item;
pub mod project;
pub mod reconcile;
pub mod schema;
pub mod shared;
