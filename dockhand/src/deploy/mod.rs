//! Deployment module

pub mod compose;
pub mod docker;
pub mod executor;
pub mod fsm;
pub mod git;
pub mod manifest;
pub mod runner;
