//! Boot content resolution engine
//!
//! Selects a boot profile for a network-booting machine and renders its iPXE
//! script. A profile's auxiliary content is fetched by pluggable resolvers
//! (inline text, fields of other Kubernetes objects, remote webhooks) and
//! post-processed by a chain of transformers (Butane to Ignition, remote
//! webhooks).
//!
//! Records are read through the [`store::BootRecordStore`] and
//! [`store::ObjectStore`] traits. Kubernetes implementations live in
//! [`store::kubernetes`]; an in-memory mock is available under the
//! `test-util` feature.

pub mod content;
pub mod error;
pub mod ipxe;
pub mod mux;
pub mod path_query;
pub mod resolver;
pub mod service;
pub mod store;
pub mod transformer;
pub mod types;
pub mod webhook;

pub use content::ContentEngine;
pub use error::{EngineError, ErrorClass, Stage, StoreError};
pub use ipxe::{IpxeEngine, MatchedBy};
pub use mux::{BatchMode, Multiplexer};
pub use service::BootService;
pub use types::{Assignment, ContentItem, ContentSource, Profile, ResolverKind, Selector, Transformation};
pub use webhook::WebhookOptions;
