//! #opencti
//!
//! A client library for the [OpenCTI](https://www.opencti.io) threat-intelligence knowledge base.
//!
//! Every kind of object (courses of action, identities, locations, labels, marking definitions, kill-chain phases,
//! external references and the generic STIX domain and core objects) is served by a single generic repository driven by
//! per-kind policy records. The repository renders GraphQL documents, sends them through a [`transport::Transport`]
//! and normalizes the responses into [`entity::Entity`] records, which the [`stix2`] mapper converts to and from
//! STIX 2.1 objects.

pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod json;
pub mod registry;
pub mod relationships;
pub mod repository;
pub mod stix2;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{EntityApi, OpenCtiClient};
pub use config::ClientConfig;
pub use entity::{Entity, Page};
pub use error::ClientError;
pub use types::{EdgeType, EntityKind};
