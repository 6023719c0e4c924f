//! Common test utilities and helpers
//!
//! Shared infrastructure for the integration tests: identity fixtures,
//! organization payload factories, a scriptable identity provider, and a
//! wiremock-backed core harness.

pub mod factories;
pub mod fixtures;
pub mod test_app;

pub use factories::*;
pub use fixtures::*;
pub use mocks::*;
pub use test_app::*;
