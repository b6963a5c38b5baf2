//! Node integration tests
//!
//! Covers leaf assignment rules, validators, composite construction,
//! serialization and tree cloning.

mod composite;
mod leaf;
