//! Error taxonomy for the ownership core
//!
//! Every failure raised by ESL is an [`EslError`]. Callers may match a
//! specific variant or treat the enum as a whole as "a library failure",
//! which keeps library errors distinguishable from host errors at a module
//! boundary.

use crate::extent::Extent;
use crate::ids::{AgentId, Context, PropertyId, PropertyTypeId};
use thiserror::Error;

/// Errors that can occur in ESL operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EslError {
    // =========================================================================
    // Currency Errors
    // =========================================================================
    /// The code is not a well-formed, issued ISO 4217 code
    #[error("Invalid currency code '{code}': {reason}")]
    InvalidCurrencyCode {
        /// The rejected input
        code: String,
        /// Why it was rejected
        reason: String,
    },

    // =========================================================================
    // Ownership Errors
    // =========================================================================
    /// A non-mergeable property is already held
    #[error("Duplicate ownership: agent '{agent}' cannot take property {property}, already held by '{holder}'")]
    DuplicateOwnership {
        /// Agent the property was being added to
        agent: AgentId,
        /// The property instance
        property: PropertyId,
        /// Agent currently holding the instance
        holder: AgentId,
    },

    /// More extent was requested than is held
    #[error("Insufficient extent: agent '{agent}' holds {available} of property {property}, requested {requested}")]
    InsufficientExtent {
        /// The agent whose holdings were short
        agent: AgentId,
        /// The property instance
        property: PropertyId,
        /// Extent requested by the caller
        requested: Extent,
        /// Extent actually held
        available: Extent,
    },

    /// Extent argument is not acceptable for the operation
    #[error("Invalid extent for property {property}: {reason}")]
    InvalidExtent {
        /// The property instance
        property: PropertyId,
        /// Why the extent was rejected
        reason: String,
    },

    /// Merging extents would overflow
    #[error("Extent overflow: agent '{agent}' holds {held} of property {property}, adding {added}")]
    ExtentOverflow {
        /// Agent whose holding would overflow
        agent: AgentId,
        /// The property instance
        property: PropertyId,
        /// Extent already held
        held: Extent,
        /// Extent being merged in
        added: Extent,
    },

    /// Two records of one instance disagree on its state and cannot merge
    #[error("State conflict: agent '{agent}' holds property {property} with a different state")]
    StateConflict {
        /// Agent holding the existing record
        agent: AgentId,
        /// The property instance
        property: PropertyId,
    },

    /// The agent has no registry in this ledger
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    // =========================================================================
    // Property Kind Errors
    // =========================================================================
    /// The property's type identifier was never registered
    #[error("Unknown property kind: {0}")]
    UnknownPropertyKind(PropertyTypeId),

    /// A kind name was registered twice with different semantics
    #[error("Property kind conflict for '{name}': {reason}")]
    PropertyKindConflict {
        /// Kind name, or the instance id when an instance changes kind
        name: String,
        /// What conflicted
        reason: String,
    },

    // =========================================================================
    // Dispatch Errors
    // =========================================================================
    /// No handler is registered for the (type, context) pair
    #[error("Unhandled property type {type_id} in context '{context}'")]
    UnhandledPropertyType {
        /// Kind tag of the dispatched property
        type_id: PropertyTypeId,
        /// Context the handler was looked up in
        context: Context,
    },

    /// A handler reported a failure of its own
    #[error("Handler failed in context '{context}': {message}")]
    Handler {
        /// Context the handler ran in
        context: Context,
        /// Handler-supplied description
        message: String,
    },

    // =========================================================================
    // Persistence and Configuration Errors
    // =========================================================================
    /// A checkpoint could not be encoded, decoded, or restored
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong with the configuration
        reason: String,
    },
}

impl EslError {
    /// Create a handler error for use inside dispatch handlers
    pub fn handler(context: &Context, message: impl Into<String>) -> Self {
        Self::Handler {
            context: context.clone(),
            message: message.into(),
        }
    }

    /// Whether this failure indicates missing or inconsistent setup rather
    /// than bad input for a single operation.
    ///
    /// A kernel normally aborts the run on these.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            EslError::UnhandledPropertyType { .. }
                | EslError::UnknownPropertyKind(_)
                | EslError::PropertyKindConflict { .. }
                | EslError::InvalidConfiguration { .. }
        )
    }

    /// Whether retrying the same call could succeed without the caller
    /// changing anything. Nothing in the core fails transiently.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Result type for ESL operations
pub type EslResult<T> = Result<T, EslError>;
