pub mod clean;
pub mod context;
pub mod generate;
pub mod init;
pub mod plugins;

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓
