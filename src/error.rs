/// Field-level problems found while validating a request body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn single(path: &str, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue {
                path: path.to_string(),
                message: message.into(),
            }],
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.path, issue.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failures of a code generation run before its stream is handed out.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("model provider returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("model provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model returned no image description")]
    EmptyDescription,

    #[error("prompt rendering failed: {0}")]
    Prompt(#[from] anyhow::Error),
}

/// Failures of the screenshot endpoint that are not capture results.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("no URL provided")]
    MissingUrl,

    #[error("capture service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("capture service returned an unreadable response ({status}): {detail}")]
    InvalidResponse { status: u16, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_one_issue_per_line() {
        let mut err = ValidationError::single("model", "Required");
        err.issues.push(ValidationIssue {
            path: "imageUrl".into(),
            message: "Required".into(),
        });
        assert_eq!(err.to_string(), "model: Required\nimageUrl: Required");
    }
}
