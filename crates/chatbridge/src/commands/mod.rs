//! Command implementations for the chatbridge CLI.

pub mod doctor;
pub mod history;
pub mod send;
