use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One checking job: the five resolved source fragments plus the iteration
/// count. The template renderer has already substituted these; the harness
/// treats them as opaque Python source text.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub user_code: String,
    /// Comma-separated assignable names (a Python assignment target list),
    /// or the empty string for "no variable transfer".
    #[serde(default)]
    pub used_vars: String,
    pub pre_code: String,
    pub solution_code: String,
    pub post_code: String,
    pub num_iters: u32,
}

impl Job {
    /// Reads a job document from `path`, or from stdin when `path` is `-`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = if path == Path::new("-") {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read job from stdin")?;
            buf
        } else {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read job file {}", path.display()))?
        };

        serde_json::from_str(&text).context("Job document is not valid JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_keys() {
        let job: Job = serde_json::from_str(
            r#"{
                "userCode": "print(1)",
                "usedVars": "x, y",
                "preCode": "x = 1",
                "solutionCode": "print(1)",
                "postCode": "",
                "numIters": 4
            }"#,
        )
        .unwrap();
        assert_eq!(job.user_code, "print(1)");
        assert_eq!(job.used_vars, "x, y");
        assert_eq!(job.num_iters, 4);
    }

    #[test]
    fn used_vars_defaults_to_empty() {
        let job: Job = serde_json::from_str(
            r#"{
                "userCode": "",
                "preCode": "",
                "solutionCode": "",
                "postCode": "",
                "numIters": 0
            }"#,
        )
        .unwrap();
        assert!(job.used_vars.is_empty());
    }
}
