use std::fs;
use std::path::Path;

/// Shortest text that reads back to the same value, keeping a `.0` on
/// integral values (`250.0`, `42.5`, `-73.8`).
pub fn format_control_float(value: f64) -> String {
    format!("{value:?}")
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

#[cfg(test)]
mod tests {
    use super::{format_control_float, normalize_text_artifact, write_text_artifact};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn control_floats_keep_a_fractional_digit() {
        assert_eq!(format_control_float(250.0), "250.0");
        assert_eq!(format_control_float(42.5), "42.5");
        assert_eq!(format_control_float(-73.8), "-73.8");
        assert_eq!(format_control_float(0.0), "0.0");
    }

    #[test]
    fn normalize_text_artifact_uses_canonical_line_endings() {
        let normalized = normalize_text_artifact("alpha\r\nbeta\rgamma");
        assert_eq!(normalized, "alpha\nbeta\ngamma\n");
    }

    #[test]
    fn repeated_text_writes_produce_identical_bytes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("CONTROL");
        let input = "24 01 01 00\r\n1\r\n42.5 -73.8 250.0";

        write_text_artifact(&path, input).expect("first write should succeed");
        let first = fs::read(&path).expect("artifact should be readable");

        write_text_artifact(&path, input).expect("second write should succeed");
        let second = fs::read(&path).expect("artifact should be readable");

        assert_eq!(first, second);
        assert_eq!(second, b"24 01 01 00\n1\n42.5 -73.8 250.0\n");
    }
}
