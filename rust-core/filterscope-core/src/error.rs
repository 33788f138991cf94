// SPDX-License-Identifier: PMPL-1.0-or-later
//! Scope compiler error types.
//!
//! Unknown filters and rejected values are not errors: they are dropped or
//! reported as [`crate::sanitize::Rejected`] data. These variants cover
//! startup configuration faults and the single request-time failure.

use thiserror::Error;

use crate::dispatch::{Condition, Topic};
use crate::Domain;

#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("unknown domain: {0}")]
    UnknownDomain(String),

    #[error("unknown filter name: {0}")]
    UnknownFilter(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("duplicate registration for {domain} {topic}.{condition}")]
    DuplicateRegistration {
        domain: Domain,
        topic: Topic,
        condition: Condition,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("mandatory filter {key} was rejected")]
    MandatoryFilterRejected { key: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
