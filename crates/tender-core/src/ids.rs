//! ID prefix constants.
//!
//! Every persisted entity gets a `{prefix}-{8 hex}` identifier generated by
//! the store (e.g. `alr-3f9a02bc`).

pub const PREFIX_PROJECT: &str = "prj";
pub const PREFIX_ESTIMATE: &str = "est";
pub const PREFIX_PRICE_LIST_ITEM: &str = "pli";
pub const PREFIX_ESTIMATE_ITEM: &str = "eit";
pub const PREFIX_WBS_NODE: &str = "wbs";
pub const PREFIX_OFFER: &str = "off";
pub const PREFIX_OFFER_ITEM: &str = "oit";
pub const PREFIX_ALERT: &str = "alr";
pub const PREFIX_AUDIT: &str = "aud";

pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_PROJECT,
    PREFIX_ESTIMATE,
    PREFIX_PRICE_LIST_ITEM,
    PREFIX_ESTIMATE_ITEM,
    PREFIX_WBS_NODE,
    PREFIX_OFFER,
    PREFIX_OFFER_ITEM,
    PREFIX_ALERT,
    PREFIX_AUDIT,
];
