//! Process-level helpers shared by the job components.

pub mod bootstrap;
pub mod retry;
