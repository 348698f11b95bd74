//! Test utilities and helpers for hearth
//!
//! Fixtures for members and communities, roster invariant assertions and
//! async timeout helpers shared by the unit test modules.

pub mod assertions;
pub mod async_helpers;
pub mod fixtures;

pub use assertions::*;
pub use async_helpers::*;
pub use fixtures::*;
