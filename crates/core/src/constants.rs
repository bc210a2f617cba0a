//! Constants used throughout the Perisentez core crate.
//!
//! Path and filename constants live here so storage layout stays consistent.

/// Default directory for application data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "perisentez_data";

/// Filename of the local credential store, relative to the data directory.
pub const USERS_FILENAME: &str = "users.yaml";

/// Directory name for patient records, relative to the data directory.
pub const RECORDS_DIR_NAME: &str = "records";

/// Filename of a stored patient record.
pub const RECORD_FILENAME: &str = "record.yaml";

/// Filename of the PDF report stored next to a record.
pub const REPORT_FILENAME: &str = "report.pdf";

/// Title printed at the top of every prediction report.
pub const REPORT_TITLE: &str = "Perisentez Tahmin Raporu";

/// Date format used in reports and record listings.
pub const DISPLAY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Extra points available to every syndrome on top of its structural findings
/// (one per numeric channel: NT, PAPP-A/β-hCG, FL).
pub const NUMERIC_HEADROOM_POINTS: u32 = 3;

/// Gestational week range accepted by the input form.
pub const MIN_GESTATIONAL_WEEK: u32 = 10;
pub const MAX_GESTATIONAL_WEEK: u32 = 40;
