//! Status messages for the CLI
//!
//! Everything here goes to stderr; stdout carries the container's
//! output only.

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

use ks_protocol::Status;

fn print_marked(color: Color, mark: &str, msg: &str) {
    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(color),
        Print(mark),
        ResetColor,
        Print(msg),
        Print("\r\n")
    );
}

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    print_marked(Color::Red, "✗ ", msg);
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    print_marked(Color::Cyan, "ℹ ", msg);
}

/// Human-readable summary of a failed remote process, if it failed
pub fn describe_failure(status: &Status) -> Option<String> {
    if status.is_success() {
        return None;
    }
    match (status.exit_code(), status.message.as_deref()) {
        (Some(code), _) => Some(format!("command terminated with exit code {}", code)),
        (None, Some(message)) => Some(message.to_string()),
        (None, None) => Some("command failed".to_string()),
    }
}

/// Process exit code for the final status of a session
///
/// A session that ends without a status frame counts as success.
pub fn exit_code(status: Option<&Status>) -> i32 {
    match status {
        None => 0,
        Some(status) => status
            .exit_code()
            .unwrap_or(if status.is_success() { 0 } else { 1 }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(json: &str) -> Status {
        Status::decode(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_exit_code_from_status() {
        let failed = status(
            r#"{"status":"Failure","reason":"NonZeroExitCode","details":{"causes":[{"reason":"ExitCode","message":"42"}]}}"#,
        );
        assert_eq!(exit_code(Some(&failed)), 42);
        assert_eq!(exit_code(Some(&status(r#"{"status":"Success"}"#))), 0);
        assert_eq!(
            exit_code(Some(&status(r#"{"status":"Failure","message":"boom"}"#))),
            1
        );
        assert_eq!(exit_code(None), 0);
    }

    #[test]
    fn test_describe_failure() {
        assert_eq!(describe_failure(&status(r#"{"status":"Success"}"#)), None);
        assert_eq!(
            describe_failure(&status(r#"{"status":"Failure","message":"pod not found"}"#)),
            Some("pod not found".to_string())
        );
    }
}
