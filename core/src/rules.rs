//! Rule matching: resolving a caller's (command, subcommand) pair against
//! an ordered policy table.

use remctld_protocol::ALL;
use remctld_protocol::EMPTY;
use remctld_protocol::PolicyRule;
use remctld_protocol::PolicyTable;

/// Whether `rule`'s `command`/`subcommand` fields match the request's
/// `(command, subcommand)` pair, honoring the `ALL`/`EMPTY` wildcards.
///
/// `command`/`subcommand` are raw bytes rather than `&str`: the caller's
/// tokens are only checked for embedded nul bytes before reaching here, not
/// validated as UTF-8, so a non-UTF-8 token must still be comparable (it
/// simply won't byte-for-byte equal any rule's `String` field, short of
/// matching `ALL`/`EMPTY`). `command` is never absent for a real request —
/// the dispatcher rejects that earlier — but this handles the `None` case
/// symmetrically for both fields regardless.
pub fn line_matches(rule: &PolicyRule, command: Option<&[u8]>, subcommand: Option<&[u8]>) -> bool {
    let command_ok = rule.command == ALL
        || command.is_some_and(|c| rule.command.as_bytes() == c)
        || (command.is_none() && rule.command == EMPTY);
    if !command_ok {
        return false;
    }
    rule.subcommand == ALL
        || subcommand.is_some_and(|s| rule.subcommand.as_bytes() == s)
        || (subcommand.is_none() && rule.subcommand == EMPTY)
}

/// Scan `policy` in declaration order and return the first rule matching
/// `(command, subcommand)`.
pub fn find<'a>(
    policy: &'a PolicyTable,
    command: Option<&[u8]>,
    subcommand: Option<&[u8]>,
) -> Option<&'a PolicyRule> {
    policy
        .rules()
        .iter()
        .find(|rule| line_matches(rule, command, subcommand))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(command: &str, subcommand: &str) -> PolicyRule {
        PolicyRule::new(command, subcommand, "/bin/true")
    }

    #[test]
    fn all_matches_any_command() {
        let r = rule(ALL, "list");
        assert!(line_matches(&r, Some(b"anything"), Some(b"list")));
        assert!(!line_matches(&r, Some(b"anything"), Some(b"other")));
    }

    #[test]
    fn empty_matches_absent_command() {
        let r = rule(EMPTY, "list");
        assert!(line_matches(&r, None, Some(b"list")));
        assert!(!line_matches(&r, Some(b"foo"), Some(b"list")));
    }

    #[test]
    fn literal_match_both_fields() {
        let r = rule("cat", "ALL");
        assert!(line_matches(&r, Some(b"cat"), Some(b"anything")));
        assert!(line_matches(&r, Some(b"cat"), None));
        assert!(!line_matches(&r, Some(b"dog"), Some(b"anything")));
    }

    #[test]
    fn find_is_order_preserving() {
        let policy = PolicyTable::new(vec![
            rule("cat", "ALL"),
            rule("cat", "feed"),
            rule(ALL, ALL),
        ]);
        let found = find(&policy, Some(b"cat"), Some(b"feed")).expect("a rule should match");
        // The "cat ALL" row comes first in declaration order and also
        // matches, so it wins even though "cat feed" is a more specific
        // literal match further down.
        assert_eq!(found.subcommand, "ALL");
    }

    #[test]
    fn wildcard_monotonicity() {
        // If a rule matches with a literal field, it still matches when that
        // field is widened to ALL.
        let literal = rule("cat", "feed");
        assert!(line_matches(&literal, Some(b"cat"), Some(b"feed")));
        let widened = PolicyRule {
            subcommand: ALL.to_string(),
            ..literal
        };
        assert!(line_matches(&widened, Some(b"cat"), Some(b"feed")));
    }

    #[test]
    fn no_match_returns_none() {
        let policy = PolicyTable::new(vec![rule("cat", "feed")]);
        assert!(find(&policy, Some(b"dog"), Some(b"feed")).is_none());
    }

    #[test]
    fn non_utf8_command_does_not_match_a_literal_rule_but_can_match_all() {
        // A request token only needs to be nul-free, not valid UTF-8; it
        // simply can't byte-for-byte equal a rule's `String` field.
        let policy = PolicyTable::new(vec![rule("cat", "ALL"), rule(ALL, ALL)]);
        let non_utf8: &[u8] = &[0xFF, 0xFE];
        assert!(find(&policy, Some(non_utf8), None).is_some_and(|r| r.command == ALL));
    }
}
