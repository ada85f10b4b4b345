//! # relay-helpers
//!
//! Relay server conventions for `async-graphql` dynamic schemas.
//!
//! ## Features
//!
//! - **Object Identification** - opaque global ids, the `Node` interface and
//!   the `node` root field backed by a kind registry
//! - **Cursor Connections** - edges + page info over any ordered sequence,
//!   with `first`/`after`/`last`/`before` windowing
//! - **Client Mutation Ids** - input/payload wrapping that echoes
//!   `clientMutationID` back to the client
//!
//! ## Usage
//!
//! ```rust
//! use relay_helpers::pagination::{connection_from_array, PaginationInput};
//!
//! let input = PaginationInput { first: Some(2), ..Default::default() };
//! let connection = connection_from_array(vec!["a", "b", "c"], &input).unwrap();
//! assert!(connection.page_info.has_next_page);
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod mutation;
pub mod node;
pub mod pagination;

pub use codec::{from_global_id, to_global_id, CursorCodec, GlobalId};
pub use config::RelayConfig;
pub use connection::{connection_args, page_info_type, ConnectionDefinitions};
pub use mutation::{MutateAndGetPayload, MutationConfig, MutationDefinition, MutationPayload};
pub use node::{
    fetch_fn, global_id_field, KindMap, NodeDefinitions, NodeFetcher, NodeInstance, NodeRegistry,
    TypeResolver,
};
pub use pagination::{
    connection_from_array, connection_from_array_slice, Connection, Edge, PageInfo,
    PaginationInput, SliceInfo,
};

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// Relay helper errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid global id: {0}")]
    InvalidGlobalId(String),

    #[error("Pagination error: {0}")]
    Pagination(String),

    #[error("Invalid kind name '{0}'")]
    InvalidKind(String),

    #[error("Kind '{0}' is already registered")]
    DuplicateKind(String),

    #[error("Type resolver cannot classify instance of {0}")]
    UnresolvedType(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// Machine-readable code attached to GraphQL errors
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidCursor(_)
            | RelayError::InvalidGlobalId(_)
            | RelayError::Pagination(_) => "BAD_USER_INPUT",
            RelayError::InvalidKind(_)
            | RelayError::DuplicateKind(_)
            | RelayError::UnresolvedType(_)
            | RelayError::Config(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl ErrorExtensions for RelayError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

/// Result type for relay helper operations
pub type Result<T> = std::result::Result<T, RelayError>;
