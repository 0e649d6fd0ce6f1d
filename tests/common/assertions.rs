/// Compiled command line assertion utilities
#[allow(dead_code)]
pub fn assert_cmd_contains(cmd: &str, flag: &str) {
    assert!(
        cmd.contains(flag),
        "Expected FFmpeg command to contain '{}' but it didn't.\nCommand: {}",
        flag,
        cmd
    );
}

/// Check if a command string does NOT contain a specific flag
#[allow(dead_code)]
pub fn assert_cmd_not_contains(cmd: &str, flag: &str) {
    assert!(
        !cmd.contains(flag),
        "Expected FFmpeg command to NOT contain '{}' but it did.\nCommand: {}",
        flag,
        cmd
    );
}

/// Check if a command contains a flag with a specific value
#[allow(dead_code)]
pub fn assert_cmd_has_flag_value(cmd: &str, flag: &str, value: &str) {
    let pattern = format!("{} {}", flag, value);
    assert!(
        cmd.contains(&pattern),
        "Expected FFmpeg command to contain '{} {}' but it didn't.\nCommand: {}",
        flag,
        value,
        cmd
    );
}

/// Check if a command contains any of the given flags
#[allow(dead_code)]
pub fn assert_cmd_contains_any(cmd: &str, flags: &[&str]) {
    let found = flags.iter().any(|flag| cmd.contains(flag));
    assert!(
        found,
        "Expected FFmpeg command to contain at least one of {:?} but none were found.\nCommand: {}",
        flags, cmd
    );
}

/// Check if a command contains all of the given flags
#[allow(dead_code)]
pub fn assert_cmd_contains_all(cmd: &str, flags: &[&str]) {
    for flag in flags {
        assert_cmd_contains(cmd, flag);
    }
}

/// Parse a flag value from the command (e.g., get "30" from "-crf 30")
#[allow(dead_code)]
pub fn get_flag_value<'a>(cmd: &'a str, flag: &str) -> Option<&'a str> {
    let pattern = format!("{} ", flag);
    cmd.find(&pattern).and_then(|pos| {
        let after_flag = &cmd[pos + pattern.len()..];
        after_flag.split_whitespace().next()
    })
}

/// Assert that `first` appears before `second` in the command
#[allow(dead_code)]
pub fn assert_cmd_order(cmd: &str, first: &str, second: &str) {
    let a = cmd
        .find(first)
        .unwrap_or_else(|| panic!("'{}' not found in command: {}", first, cmd));
    let b = cmd
        .find(second)
        .unwrap_or_else(|| panic!("'{}' not found in command: {}", second, cmd));
    assert!(
        a < b,
        "Expected '{}' before '{}' in command: {}",
        first,
        second,
        cmd
    );
}

/// Number of non-overlapping occurrences of `needle`
#[allow(dead_code)]
pub fn count_occurrences(cmd: &str, needle: &str) -> usize {
    cmd.matches(needle).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_flag_value() {
        let cmd = "-hide_banner -i \"in.mp4\" -crf 30 -b:v 2000k \"out.mp4\"";
        assert_eq!(get_flag_value(cmd, "-crf"), Some("30"));
        assert_eq!(get_flag_value(cmd, "-b:v"), Some("2000k"));
        assert_eq!(get_flag_value(cmd, "-nonexistent"), None);
    }

    #[test]
    fn test_assert_cmd_contains() {
        let cmd = "-i \"in.mp4\" -c:v libx264";
        assert_cmd_contains(cmd, "-c:v");
        assert_cmd_contains(cmd, "libx264");
        assert_cmd_order(cmd, "-i", "-c:v");
    }

    #[test]
    #[should_panic(expected = "Expected FFmpeg command to contain")]
    fn test_assert_cmd_contains_fails() {
        let cmd = "-i \"in.mp4\"";
        assert_cmd_contains(cmd, "-nonexistent");
    }
}
