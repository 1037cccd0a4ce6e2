//! # FoodX Core Domain Models
//!
//! Domain models shared by every FoodX service. All models serialize with serde and the
//! request-side types validate with the validator crate.
//!
//! ## Key Models
//!
//! - **ProductBrief**: buyer-authored specification request that seeds the sourcing workflow
//! - **Rfq**: request for quote derived one-to-one from a product brief
//! - **Project**: sourcing engagement derived from an RFQ
//! - **Product**, **Supplier**, **Buyer**, **Order**: the trading catalog
//! - **Email**, **EmailThread**, **EmailAttachment**: persisted correspondence
//!
//! Relations between models are plain foreign-key ids. Nothing holds a live reference to
//! its parent or children; related records are looked up through the repositories.

pub mod product_brief;
pub mod rfq;
pub mod project;
pub mod product;
pub mod party;
pub mod order;
pub mod email;
pub mod lookups;

#[cfg(test)]
pub mod property_tests;

pub use product_brief::*;
pub use rfq::*;
pub use project::*;
pub use product::*;
pub use party::*;
pub use order::*;
pub use email::*;
pub use lookups::*;
