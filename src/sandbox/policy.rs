//! Execution policy: what candidate code may import and how it must look.

use crate::lang::Program;

/// Modules a candidate script may `use`. Everything else is blocked before
/// any code runs.
pub const ALLOWED_IMPORTS: &[&str] = &["math", "random"];

/// Name of the scoring entry point every candidate must define.
pub const ENTRY_POINT: &str = "score_bin";

/// Required parameter count for the entry point:
/// `(item_size, remaining_capacity, bin_index, step)`.
pub const ENTRY_ARITY: usize = 4;

/// Failure messages are truncated to this many bytes before leaving the
/// worker, so a hostile script cannot flood the parent with output.
pub const MAX_MESSAGE_LEN: usize = 240;

/// Hidden argv flag that switches the binary into worker mode.
pub const WORKER_FLAG: &str = "__worker";

/// Return the first import outside the allow-list, if any.
pub fn blocked_import(program: &Program) -> Option<&str> {
    program
        .imports
        .iter()
        .map(String::as_str)
        .find(|module| !ALLOWED_IMPORTS.contains(module))
}

/// Clamp a failure message to [`MAX_MESSAGE_LEN`] on a char boundary.
pub fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_MESSAGE_LEN {
        return message.to_string();
    }
    let mut end = MAX_MESSAGE_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::parse;

    #[test]
    fn test_blocked_import_detection() {
        let ok = parse("use math; fn score_bin(a, b, c, d) { return a; }").unwrap();
        assert_eq!(blocked_import(&ok), None);

        let bad = parse("use os; fn score_bin(a, b, c, d) { return a; }").unwrap();
        assert_eq!(blocked_import(&bad), Some("os"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "é".repeat(MAX_MESSAGE_LEN);
        let truncated = truncate_message(&long);
        assert!(truncated.len() <= MAX_MESSAGE_LEN);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
