//! Boot-time service registration

pub mod service;
