//! Helpers shared by commands.

use std::path::Path;

use anyhow::Context;
use cadence_config::GraphConfig;

/// Loads a description, attaching the path to any error.
pub fn load_description(path: &Path) -> anyhow::Result<GraphConfig> {
    GraphConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

/// Formats a byte count for humans.
pub fn format_bytes(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_units() {
        assert_eq!(format_bytes(8), "8 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
