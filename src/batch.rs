//! Batch conversion
//!
//! Converts every MusicXML file of a directory, keeps going past failures,
//! and reports which chord qualities were missing from the table.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ConvertOptions;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchReport {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
    pub converted_percent: f64,
    pub failed_percent: f64,
    /// Unsupported chord quality -> first file it was found in
    pub unsupported_qualities: BTreeMap<String, String>,
}

impl BatchReport {
    fn record_failure(&mut self, file_name: &str, quality: Option<&str>) {
        self.failed += 1;
        if let Some(quality) = quality {
            self.unsupported_qualities
                .entry(quality.to_string())
                .or_insert_with(|| file_name.to_string());
        }
    }

    fn finish(&mut self) {
        self.total = self.converted + self.failed;
        if self.total > 0 {
            self.converted_percent = round2(self.converted as f64 * 100.0 / self.total as f64);
            self.failed_percent = round2(self.failed as f64 * 100.0 / self.total as f64);
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// MusicXML files (`.xml`, `.musicxml`, `.mxl`) directly inside `dir`,
/// sorted by name
pub fn musicxml_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let ext = path.extension()?.to_str()?.to_ascii_lowercase();
            (path.is_file() && matches!(ext.as_str(), "xml" | "musicxml" | "mxl")).then_some(path)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Convert every MusicXML file in `input` to `<stem>.mid` in `output`.
///
/// The chord table is loaded once for the whole batch. Only invalid
/// options, an unreadable chord table, listing the input directory or
/// creating the output directory can fail the batch; a file that fails to
/// convert is logged and counted.
pub fn convert_dir(input: impl AsRef<Path>, output: impl AsRef<Path>, options: &ConvertOptions) -> Result<BatchReport> {
    options.validate()?;
    let table = options.load_chord_table()?;
    let output = output.as_ref();
    fs::create_dir_all(output)?;
    let files = musicxml_files(input)?;

    let mut report = BatchReport::default();
    for (i, path) in files.iter().enumerate() {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let out_path = output.join(format!("{}.mid", stem));

        log::info!("[{}/{}] {}", i + 1, files.len(), file_name);
        match crate::convert_file_with_table(path, &out_path, options, &table) {
            Ok(_) => report.converted += 1,
            Err(e) => {
                log::warn!("{}: {}", file_name, e);
                report.record_failure(&file_name, e.unsupported_quality());
            }
        }
    }

    report.finish();
    Ok(report)
}
