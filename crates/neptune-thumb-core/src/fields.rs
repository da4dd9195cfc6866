//! Extraction of `key = value` / `key: value` fields from G-code comment lines.

/// Returns the value part of a comment line of the form `key = value` or
/// `key: value`, trimmed of surrounding whitespace.
///
/// The first separator occurrence wins; everything after it is the value.
pub fn extract_value(line: &str) -> Option<&str> {
    let idx = line.find(['=', ':'])?;
    Some(line[idx + 1..].trim())
}

/// Like [`extract_value`] but parses the value as an `f64`.
pub fn extract_number(line: &str) -> Option<f64> {
    extract_value(line)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_equals_form() {
        assert_eq!(
            extract_value("; estimated printing time (normal mode) = 1h 32m 12s"),
            Some("1h 32m 12s")
        );
    }

    #[test]
    fn test_extract_colon_form() {
        assert_eq!(extract_value(";Z:12.45"), Some("12.45"));
    }

    #[test]
    fn test_extract_number() {
        assert_eq!(extract_number("; total filament used [g] = 13.37"), Some(13.37));
        assert_eq!(extract_number("; total filament used [g] = n/a"), None);
    }

    #[test]
    fn test_no_separator() {
        assert_eq!(extract_value("; just a comment"), None);
    }
}
