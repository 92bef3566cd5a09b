//! Project storage

pub mod layout;
