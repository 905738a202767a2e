// Version info surfaced in the table title and the startup log line

/// Crate version, baked in at build time. Also what `--version` prints.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Binary name ("dtop").
pub const NAME: &str = env!("CARGO_PKG_NAME");
