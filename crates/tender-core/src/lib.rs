//! # tender-core
//!
//! Core types, ID prefixes, and error types for the bid reconciliation engine.
//!
//! This crate provides the foundational types shared across all tender crates:
//! - Entity structs for projects, estimates, price lists, offers and alerts
//! - Status enums with state machine transitions
//! - ID prefix constants
//! - Cross-cutting error types
//! - Typed item filters validated at the boundary
//! - Import and request payloads consumed by the service layer
//! - Audit detail sub-types

pub mod audit_detail;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod filter;
pub mod ids;
pub mod requests;
