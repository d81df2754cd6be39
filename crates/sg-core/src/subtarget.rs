//! Dynamic sub-target discovery.
//!
//! Some plugins enumerate a variable number of sub-targets at run time
//! (storage volumes, service processors) from a list command's output,
//! then repeat a fixed battery of per-target commands. Extraction is a
//! prefix line scan: the remainder of a matching line, with only the
//! line terminator trimmed, is the identifier, verbatim. Identifiers are
//! only ever used as single argv elements (see `exec`), so no character
//! filtering is applied here.

/// Extract identifiers from `output`: for every line starting with
/// `prefix`, the rest of the line (minus the terminator) in input order.
pub fn extract_identifiers(output: &str, prefix: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix(prefix))
        .map(|rest| rest.trim_end_matches('\r').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_matching_lines_in_order() {
        let out = "Volume Name: vol1\nOther: x\nVolume Name: vol2\n";
        assert_eq!(
            extract_identifiers(out, "Volume Name: "),
            vec!["vol1", "vol2"]
        );
    }

    #[test]
    fn non_matching_lines_are_ignored() {
        let out = "Status: Started\nBricks:\n";
        assert!(extract_identifiers(out, "Volume Name: ").is_empty());
    }

    #[test]
    fn identifier_is_verbatim() {
        let out = "Volume Name: vol-1.2_weird name\n";
        assert_eq!(
            extract_identifiers(out, "Volume Name: "),
            vec!["vol-1.2_weird name"]
        );
    }

    #[test]
    fn crlf_terminators_are_trimmed() {
        let out = "Volume Name: vol1\r\n";
        assert_eq!(extract_identifiers(out, "Volume Name: "), vec!["vol1"]);
    }

    #[test]
    fn empty_output_yields_nothing() {
        assert!(extract_identifiers("", "Volume Name: ").is_empty());
    }
}
