//! ESL Types - value types for the economic simulation ownership core
//!
//! Leaf types shared by every ESL crate:
//!
//! - **CurrencyCode**: canonical ISO 4217 denomination tag (never an amount)
//! - **Identifiers**: agents, property instances, property kinds, contexts
//! - **Extent**: non-negative quantity held by an agent
//! - **EslError**: the root of every failure the library raises
//! - **EslConfig**: ownership and dispatch configuration

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod currency;
pub mod error;
pub mod extent;
pub mod ids;

pub use config::{DispatchConfig, EslConfig, OwnershipConfig};
pub use currency::{CurrencyCode, Iso4217Entry};
pub use error::{EslError, EslResult};
pub use extent::Extent;
pub use ids::{AgentId, Context, PropertyId, PropertyTypeId};
