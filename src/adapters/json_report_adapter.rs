//! JSON result writer implementing ResultWriter.

use crate::domain::error::LftError;
use crate::domain::selection::SelectionReport;
use crate::ports::report_port::ResultWriter;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportAdapter {
    pub pretty: bool,
}

impl JsonReportAdapter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn render<T: Serialize>(&self, value: &T) -> Result<String, LftError> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.map_err(|e| LftError::Encode {
            reason: e.to_string(),
        })
    }
}

impl ResultWriter for JsonReportAdapter {
    fn write(&self, report: &SelectionReport, output_path: &Path) -> Result<(), LftError> {
        let body = self.render(report)?;
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output_path, body + "\n")?;
        info!(
            path = %output_path.display(),
            results = report.results.len(),
            "wrote selection report"
        );
        Ok(())
    }
}
