//! # zkid-eligibility — Can This Document Be Proven?
//!
//! Answers the questions the orchestrator asks while validating a document:
//!
//! - **Which circuit?** (`circuits.rs`) The register, DSC and disclosure
//!   circuit names derived from document metadata.
//! - **Is it supported?** (`support.rs`) Whether those circuits are deployed.
//! - **Is it registered?** (`registration.rs`) Whether the holder's
//!   commitment is already in the identity tree, either under the document's
//!   own CSCA or under one of the alternative CSCAs published for its
//!   category, and whether its DSC is already in the DSC tree.
//!
//! Everything here is synchronous and pure over its inputs; remote data is
//! fetched by the caller.

pub mod circuits;
pub mod error;
pub mod registration;
pub mod support;

pub use circuits::{circuit_name, disclose_circuit_name, dsc_circuit_name, register_circuit_name};
pub use error::EligibilityError;
pub use registration::{
    is_dsc_in_tree, is_registered, is_registered_with_alternative_csca, AlternativeCscaMatch,
};
pub use support::{check_supported, SupportReport, SupportStatus};
