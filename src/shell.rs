//! POSIX shell quoting for commands sent to hypervisor hosts.
//!
//! Every identifier interpolated into an `xe` command script passes through
//! [`shell_escape`], so values reaching the remote shell are always inert.

/// Escapes a value for safe inclusion in a POSIX shell command.
///
/// Uses single-quote wrapping and the standard `'\''` sequence for embedded
/// quotes.
#[must_use]
pub fn shell_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}

/// Renders a `key=value` command argument with the value shell-escaped.
#[must_use]
pub fn shell_arg(key: &str, value: &str) -> String {
    format!("{key}={}", shell_escape(value))
}
