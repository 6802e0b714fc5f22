//! Utility modules and shared functionality

pub mod errors;
pub mod fs;
pub mod process;
pub mod resilience;
