//! Operator-facing application layer

pub mod configure;
pub mod lock;
pub mod menu;
pub mod options;
pub mod output;
pub mod preflight;
pub mod prompt;
pub mod run;
