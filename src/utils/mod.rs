// Utility functions
pub mod error;
pub mod tags;

pub use error::*;
