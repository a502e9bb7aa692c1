//! Data models for platform entities

mod account;
mod profile;

pub use account::*;
pub use profile::*;
