use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Wildcard token that matches any command or subcommand.
pub const ALL: &str = "ALL";

/// Wildcard token that matches the *absence* of a command or subcommand.
pub const EMPTY: &str = "EMPTY";

/// A single policy row.
///
/// `acl` is deliberately opaque: this crate never evaluates it. It is handed
/// verbatim to whatever `AclEvaluator` the caller supplies, which owns ACL
/// file syntax and interpretation. `Serialize`/`Deserialize` let test
/// fixtures and an eventual config loader build a `PolicyRule` from a
/// declarative source rather than Rust struct literals; this crate still
/// does not parse any particular policy file syntax itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub command: String,
    pub subcommand: String,
    pub program: PathBuf,
    pub user: Option<String>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    /// `-1` = last argument, `0` = none, positive `n` = the n-th argument
    /// (1-based).
    pub stdin_arg: i32,
    pub summary: Option<String>,
    pub help: Option<String>,
    pub acl: Vec<String>,
}

impl PolicyRule {
    /// Convenience constructor for the common case of no identity change and
    /// no summary/help tokens; callers override fields with struct update
    /// syntax.
    pub fn new(command: impl Into<String>, subcommand: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        PolicyRule {
            command: command.into(),
            subcommand: subcommand.into(),
            program: program.into(),
            user: None,
            uid: None,
            gid: None,
            stdin_arg: 0,
            summary: None,
            help: None,
            acl: Vec::new(),
        }
    }

    /// Whether this rule names a non-root target identity to drop privileges
    /// to.
    pub fn drops_privileges(&self) -> bool {
        self.user.is_some() && self.uid.is_some_and(|uid| uid > 0)
    }
}

/// Ordered sequence of `PolicyRule`; first match wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyTable {
    rules: Vec<PolicyRule>,
}

impl PolicyTable {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        PolicyTable { rules }
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }
}

impl FromIterator<PolicyRule> for PolicyTable {
    fn from_iter<T: IntoIterator<Item = PolicyRule>>(iter: T) -> Self {
        PolicyTable {
            rules: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn drops_privileges_requires_both_user_and_a_nonzero_uid() {
        let base = PolicyRule::new("cat", "ALL", "/bin/cat");
        assert!(!base.drops_privileges(), "no user/uid configured");

        let root_target = PolicyRule {
            user: Some("root".to_string()),
            uid: Some(0),
            ..PolicyRule::new("cat", "ALL", "/bin/cat")
        };
        assert!(!root_target.drops_privileges(), "uid 0 is not a privilege drop");

        let non_root = PolicyRule {
            user: Some("nobody".to_string()),
            uid: Some(65534),
            ..PolicyRule::new("cat", "ALL", "/bin/cat")
        };
        assert!(non_root.drops_privileges());
    }

    #[test]
    fn table_preserves_declaration_order() {
        let table: PolicyTable = vec![
            PolicyRule::new("a", "ALL", "/bin/true"),
            PolicyRule::new("b", "ALL", "/bin/true"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            table.rules().iter().map(|r| r.command.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }
}
