//! ESL Law - property ownership and context-specific type dispatch
//!
//! Every economic agent in a simulation owns an [`OwnershipRegistry`] of
//! heterogeneous property: cash, bonds, deeds, shares of a house. The set
//! of property kinds is open. A kind is registered in the
//! [`PropertyCatalog`] at runtime and receives a stable tag; behaviour for
//! the kind is registered in a [`DispatchTable`] per processing context
//! (settle, appraise, ...).
//!
//! ```text
//! Kernel ──add/remove/transfer/query──► OwnershipLedger ──► OwnershipRegistry (per agent)
//!    │                                        │
//!    └──────process(context)────────► DispatchTable ──► PropertyHandler
//! ```
//!
//! Transfers lock both registries in ascending agent order and are all or
//! nothing. Queries return snapshots that later mutations do not affect.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod catalog;
pub mod checkpoint;
pub mod dispatch;
pub mod journal;
pub mod ledger;
pub mod property;
pub mod record;
pub mod registry;

pub use catalog::PropertyCatalog;
pub use checkpoint::{LedgerCheckpoint, CHECKPOINT_VERSION};
pub use dispatch::{DispatchTable, HandlerRef, PropertyHandler, Registration};
pub use journal::{OwnershipAction, OwnershipEvent, OwnershipJournal};
pub use ledger::OwnershipLedger;
pub use property::{OwnershipMode, Property, PropertyKind};
pub use record::{OwnershipQuery, OwnershipRecord, Tenure};
pub use registry::{transfer, OwnershipRegistry, TransferOutcome};

pub use esl_types::{
    AgentId, Context, CurrencyCode, DispatchConfig, EslConfig, EslError, EslResult, Extent,
    OwnershipConfig, PropertyId, PropertyTypeId,
};
