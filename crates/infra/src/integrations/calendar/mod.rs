//! Calendar provider adapters.

pub mod providers;
