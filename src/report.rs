use serde::{Serialize, Serializer};

// Verdict codes are ordinal: lower means worse, and the overall verdict for
// a run is the minimum over all per-test verdicts. Unset (10) is only ever
// the initial reduction value; it survives only when zero tests run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verdict {
    /// Syntax error in an author fragment (pre/solution/post/vars): -2.
    AuthorSyntax,
    /// Runtime exception in an author fragment during a test: -1.
    AuthorRuntime,
    /// Syntax error in the user's fragment: 0.
    UserSyntax,
    /// Runtime exception in the user's fragment: 1.
    UserRuntime,
    /// Ran to completion but output differed from the solution's: 2.
    Mismatch,
    /// Output matched the solution's exactly: 3.
    Correct,
    /// Sentinel "no test has failed yet": 10.
    Unset,
}

impl Verdict {
    pub fn code(self) -> i8 {
        match self {
            Verdict::AuthorSyntax => -2,
            Verdict::AuthorRuntime => -1,
            Verdict::UserSyntax => 0,
            Verdict::UserRuntime => 1,
            Verdict::Mismatch => 2,
            Verdict::Correct => 3,
            Verdict::Unset => 10,
        }
    }
}

impl Serialize for Verdict {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i8(self.code())
    }
}

/// Result of one test iteration. Which optional fields are present depends
/// on the step that ended the iteration: failures carry only a message,
/// completed comparisons carry both captured outputs.
#[derive(Debug, Serialize)]
pub struct TestOutcome {
    pub verdict: Verdict,
    pub test: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestOutcome {
    pub fn failed(verdict: Verdict, test: String, message: String) -> Self {
        TestOutcome {
            verdict,
            test,
            result: None,
            solution: None,
            message: Some(message),
        }
    }

    pub fn matched(test: String, result: String, solution: String) -> Self {
        TestOutcome {
            verdict: Verdict::Correct,
            test,
            result: Some(result),
            solution: Some(solution),
            message: None,
        }
    }

    pub fn mismatched(test: String, result: String, solution: String, message: String) -> Self {
        TestOutcome {
            verdict: Verdict::Mismatch,
            test,
            result: Some(result),
            solution: Some(solution),
            message: Some(message),
        }
    }
}

/// Emitted instead of a run report when an author fragment fails to compile.
/// No tests run in that case.
#[derive(Debug, Serialize)]
pub struct FatalReport {
    pub ok: bool,
    pub verdict: Verdict,
    pub file: &'static str,
    pub line: u32,
    pub offset: u32,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub ok: bool,
    pub verdict: Verdict,
    pub correct: usize,
    pub tests: Vec<TestOutcome>,
}

/// The single JSON document written to real stdout.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Fatal(FatalReport),
    Completed(RunReport),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verdict_codes_match_table() {
        assert_eq!(Verdict::AuthorSyntax.code(), -2);
        assert_eq!(Verdict::AuthorRuntime.code(), -1);
        assert_eq!(Verdict::UserSyntax.code(), 0);
        assert_eq!(Verdict::UserRuntime.code(), 1);
        assert_eq!(Verdict::Mismatch.code(), 2);
        assert_eq!(Verdict::Correct.code(), 3);
        assert_eq!(Verdict::Unset.code(), 10);
    }

    #[test]
    fn verdict_ordering_follows_codes() {
        assert!(Verdict::AuthorSyntax < Verdict::AuthorRuntime);
        assert!(Verdict::AuthorRuntime < Verdict::UserSyntax);
        assert!(Verdict::UserSyntax < Verdict::UserRuntime);
        assert!(Verdict::UserRuntime < Verdict::Mismatch);
        assert!(Verdict::Mismatch < Verdict::Correct);
        assert!(Verdict::Correct < Verdict::Unset);
        assert_eq!(Verdict::Unset.min(Verdict::Mismatch), Verdict::Mismatch);
    }

    #[test]
    fn failed_outcome_skips_absent_fields() {
        let outcome = TestOutcome::failed(
            Verdict::UserRuntime,
            "7\n".to_string(),
            "ValueError: bad".to_string(),
        );
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({ "verdict": 1, "test": "7\n", "message": "ValueError: bad" })
        );
    }

    #[test]
    fn matched_outcome_carries_both_outputs() {
        let outcome = TestOutcome::matched("1\n".into(), "2\n".into(), "2\n".into());
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({ "verdict": 3, "test": "1\n", "result": "2\n", "solution": "2\n" })
        );
    }

    #[test]
    fn reports_serialize_flat() {
        let fatal = Report::Fatal(FatalReport {
            ok: true,
            verdict: Verdict::AuthorSyntax,
            file: "solution",
            line: 2,
            offset: 5,
            message: "Error in solution: invalid syntax".to_string(),
        });
        let value = serde_json::to_value(&fatal).unwrap();
        assert_eq!(value["ok"], json!(true));
        assert_eq!(value["verdict"], json!(-2));
        assert_eq!(value["file"], json!("solution"));
        assert!(value.get("tests").is_none());

        let run = Report::Completed(RunReport {
            ok: true,
            verdict: Verdict::Unset,
            correct: 0,
            tests: vec![],
        });
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value, json!({ "ok": true, "verdict": 10, "correct": 0, "tests": [] }));
    }
}
