//! Core domain types and logic.

pub mod bar;
pub mod params;
pub mod position;
pub mod entry;
pub mod simulator;
pub mod metrics;
pub mod selection;
pub mod universe;
pub mod profile;
pub mod screen;
pub mod order;
pub mod config_validation;
pub mod error;
