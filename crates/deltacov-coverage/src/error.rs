/// Failure to read a coverage artifact. Always fatal: no partial records.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoverageParseError {
    #[error("coverage report is not valid UTF-8")]
    InvalidUtf8,

    #[error("coverage report is empty: no header row")]
    EmptyReport,

    #[error("coverage report is missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: expected {expected} columns, found {found}")]
    TruncatedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, column {column}: invalid counter value '{value}'")]
    InvalidCounter {
        row: usize,
        column: String,
        value: String,
    },

    #[error("XML error at byte {position}: {message}")]
    Xml { position: usize, message: String },

    #[error("malformed JaCoCo XML: {0}")]
    MalformedXml(String),
}
