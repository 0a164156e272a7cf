//! Repository modules, one per entity.
//!
//! Public reads and single-entity mutations are `impl TenderService` blocks.
//! The `pub(crate)` functions taking a `&libsql::Connection` are the building
//! blocks the multi-step operations call on their open transaction.

pub mod alert;
pub mod audit;
pub mod estimate;
pub mod estimate_item;
pub mod offer;
pub mod offer_item;
pub mod price_list;
pub mod project;
pub mod wbs_node;

pub use alert::{AlertFilter, AlertSummary, SummaryGroup};
pub use audit::AuditFilter;
