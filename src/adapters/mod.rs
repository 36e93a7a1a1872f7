//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod json_bar_adapter;
pub mod session_calendar;
pub mod json_report_adapter;
pub mod fix_encoder;
pub mod positions_adapter;
pub mod file_config_adapter;
