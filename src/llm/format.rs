//! Turn a raw completion into a subject/body commit message.

use super::error::LlmError;

/// Hard cap on the subject, in Unicode code points.
pub const MAX_SUBJECT_CHARS: usize = 72;

/// A generated commit message, ready for preview or COMMIT_EDITMSG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub subject: String,
    pub body: String,
}

impl CommitMessage {
    /// The canonical git form: subject, blank line, body.
    pub fn render(&self) -> String {
        if self.body.is_empty() {
            self.subject.clone()
        } else {
            format!("{}\n\n{}", self.subject, self.body)
        }
    }
}

/// Split a completion into subject and body.
///
/// The first line becomes the subject (truncated to 72 code points, no
/// ellipsis); everything after the first line break becomes the body. Both
/// halves are trimmed independently. An all-whitespace completion is an
/// error, not an empty message.
pub fn format_commit_message(raw: &str) -> Result<CommitMessage, LlmError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LlmError::EmptyCompletion);
    }

    let normalized = trimmed.replace("\r\n", "\n").replace('\r', "\n");
    let (subject_line, body_lines) = match normalized.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (normalized.as_str(), ""),
    };

    let subject_line = subject_line.trim();
    let subject = if subject_line.chars().count() > MAX_SUBJECT_CHARS {
        subject_line.chars().take(MAX_SUBJECT_CHARS).collect()
    } else {
        subject_line.to_string()
    };

    Ok(CommitMessage {
        subject,
        body: body_lines.trim().to_string(),
    })
}
