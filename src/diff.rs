/// Compares the solution's captured output against the user's. Returns
/// `None` on a match, or a human-readable description of the first
/// difference.
///
/// Exact equality is checked first. Otherwise both outputs are split into
/// lines and scanned in parallel for the first differing index; if one side
/// is a strict prefix of the other the difference is reported as missing or
/// extra lines. If the scan finds every compared line equal and the counts
/// agree (e.g. the outputs differ only in a trailing newline), the outputs
/// are treated as a match after all.
pub fn compare_outputs(solution: &str, user: &str) -> Option<String> {
    if solution == user {
        return None;
    }

    let solution_lines: Vec<&str> = solution.lines().collect();
    let user_lines: Vec<&str> = user.lines().collect();

    for (i, (expected, got)) in solution_lines.iter().zip(user_lines.iter()).enumerate() {
        if expected != got {
            return Some(format!("First mismatch on line {}", i + 1));
        }
    }

    if solution_lines.len() > user_lines.len() {
        Some("Output is missing lines at end".to_string())
    } else if user_lines.len() > solution_lines.len() {
        Some("Output has extra lines at end".to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_outputs_match() {
        assert_eq!(compare_outputs("a\nb\nc\n", "a\nb\nc\n"), None);
        assert_eq!(compare_outputs("", ""), None);
    }

    #[test]
    fn first_differing_line_is_reported_one_based() {
        assert_eq!(
            compare_outputs("a\nb\nc\n", "a\nx\nc\n"),
            Some("First mismatch on line 2".to_string())
        );
        assert_eq!(
            compare_outputs("a\n", "x\n"),
            Some("First mismatch on line 1".to_string())
        );
    }

    #[test]
    fn shorter_user_output_is_missing_lines() {
        assert_eq!(
            compare_outputs("a\nb\nc\n", "a\nb\n"),
            Some("Output is missing lines at end".to_string())
        );
    }

    #[test]
    fn longer_user_output_has_extra_lines() {
        assert_eq!(
            compare_outputs("a\nb\n", "a\nb\nc\n"),
            Some("Output has extra lines at end".to_string())
        );
    }

    #[test]
    fn trailing_newline_only_difference_matches() {
        // Not byte-equal, but the line scan finds no difference and the
        // counts agree, so it counts as a match.
        assert_eq!(compare_outputs("a\nb\n", "a\nb"), None);
    }

    #[test]
    fn mismatch_beats_length_difference() {
        assert_eq!(
            compare_outputs("a\nb\n", "x\n"),
            Some("First mismatch on line 1".to_string())
        );
    }
}
