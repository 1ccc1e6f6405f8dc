//! Spacereg Testing Infrastructure
//!
//! Provider fakes and fixture builders shared by the registry test suites,
//! so no test needs a network.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! spacereg-testkit = { workspace = true }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod fixtures;
pub mod providers;

pub use fixtures::*;
pub use providers::*;
