//! Integration test modules

mod lifecycle_tests;
mod organization_tests;
