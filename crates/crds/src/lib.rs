//! DCops boot CRD Definitions
//!
//! Kubernetes Custom Resource Definitions read by the iPXE boot server:
//! `Profile` (boot template plus auxiliary content) and `Assignment`
//! (machine selector to profile binding).

pub mod assignment;
pub mod build_arch;
pub mod labels;
pub mod profile;
pub mod references;

pub use assignment::*;
pub use build_arch::*;
pub use profile::*;
pub use references::*;
