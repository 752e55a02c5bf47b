//! Common types, traits, and error definitions for vector_mcl
//!
//! This module provides the foundational building blocks shared by the
//! map, the sensor simulator, and the localizers.

pub mod angle;
pub mod types;
pub mod traits;
pub mod error;

pub use angle::*;
pub use types::*;
pub use traits::*;
pub use error::*;
