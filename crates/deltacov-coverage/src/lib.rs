//! Coverage report providers.
//!
//! Reads JaCoCo CSV (class totals only) and JaCoCo XML (class totals plus
//! per-line and per-method detail) into [`RawCoverageData`] records. Other
//! report formats plug in by implementing [`RawCoverageDataProvider`].

mod csv;
mod error;
mod jacoco;
mod merge;
mod model;

use std::path::Path;

pub use csv::CsvCoverageProvider;
pub use error::CoverageParseError;
pub use jacoco::JacocoXmlProvider;
pub use merge::merge_coverage;
pub use model::{
    ClassDetail, LineCounters, MethodCoverage, RawCoverageData, RawCoverageDataProvider,
};

/// Supported on-disk report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverageFormat {
    Csv,
    JacocoXml,
}

impl CoverageFormat {
    /// Infer the format from a file extension (`.csv`, `.xml`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(CoverageFormat::Csv),
            "xml" => Some(CoverageFormat::JacocoXml),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CoverageFormat::Csv => "csv",
            CoverageFormat::JacocoXml => "jacoco-xml",
        }
    }
}

/// Parse one report with the provider for `format`.
pub fn load_coverage(
    format: CoverageFormat,
    bytes: &[u8],
) -> Result<Vec<RawCoverageData>, CoverageParseError> {
    match format {
        CoverageFormat::Csv => CsvCoverageProvider::new(bytes).obtain_data(),
        CoverageFormat::JacocoXml => JacocoXmlProvider::new(bytes).obtain_data(),
    }
}
