//! Result persistence port trait.

use crate::domain::error::LftError;
use crate::domain::selection::SelectionReport;
use std::path::Path;

/// Port for writing selection results.
pub trait ResultWriter {
    fn write(&self, report: &SelectionReport, output_path: &Path) -> Result<(), LftError>;
}
