//! Entity structs for all domain objects.
//!
//! Each entity maps to a table in the libSQL database (see
//! `tender-db/migrations/001_initial.sql`). All structs derive `Serialize`,
//! `Deserialize`, and `JsonSchema` for JSON output and schema export.

mod alert;
mod audit;
mod estimate;
mod offer;
mod price_list;
mod project;
mod wbs_node;

pub use alert::OfferAlert;
pub use audit::AuditEntry;
pub use estimate::{Estimate, EstimateItem, WbsLevels};
pub use offer::{Offer, OfferItem};
pub use price_list::PriceListItem;
pub use project::Project;
pub use wbs_node::WbsNodeRecord;
