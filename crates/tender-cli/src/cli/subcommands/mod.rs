mod alert;
mod estimate;
mod import;
mod offer;
mod project;

pub use alert::AlertCommands;
pub use estimate::EstimateCommands;
pub use import::ImportCommands;
pub use offer::{OfferCommands, OfferItemCommands};
pub use project::ProjectCommands;
