//! `[output]`: how `action-dispatch` prints envelopes, transcripts and
//! the tool surface.

use dispatch_domain::OutputFormat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// `text` or `json`; unset means text unless `--format` says otherwise.
    pub format: Option<OutputFormat>,
    /// Colored text output and confirmation prompts.
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}

impl FileOutputConfig {
    /// `--format` wins over the file; text when neither is set.
    pub fn resolve_format(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.or(self.format).unwrap_or_default()
    }

    /// Color stays off with `--no-color`, and for JSON, which is meant for
    /// machines.
    pub fn use_color(&self, no_color_flag: bool, format: OutputFormat) -> bool {
        self.color && !no_color_flag && format != OutputFormat::Json
    }
}
