//! iPXE Boot Server
//!
//! HTTP front end for the boot engine. iPXE firmware first fetches
//! `/boot.ipxe`, which chains into `/ipxe` with the machine's UUID and build
//! architecture; the rendered script may in turn reference exposed content
//! under `/content/{id}`.
//!
//! Profiles and Assignments are read from the namespace named by
//! `WATCH_NAMESPACE`; see [`config::ServerConfig`] for all settings.

pub mod config;
pub mod error;
pub mod http;
pub mod server;

pub use config::ServerConfig;
pub use error::*;
pub use server::PxeServer;
