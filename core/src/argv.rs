//! Building the child process's argument vector from a matched policy rule
//! and the caller's argument vector.

use std::path::Path;

use remctld_protocol::PolicyRule;

/// The child argv plus, if the rule designates one of the caller's
/// arguments as the stdin payload, the bytes to feed on the child's standard
/// input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArgv {
    pub argv: Vec<Vec<u8>>,
    pub stdin: Option<Vec<u8>>,
}

/// Basename of `program`: the final path segment after the last `/`, or the
/// whole string if there is none.
pub fn basename(program: &Path) -> Vec<u8> {
    program
        .file_name()
        .map(|name| name.as_encoded_bytes().to_vec())
        .unwrap_or_else(|| program.as_os_str().as_encoded_bytes().to_vec())
}

/// Resolve `rule.stdin_arg` against `caller_argv_len` (the length of the
/// caller's full argument vector, including argv[0]) into a concrete 0-based
/// index into that vector, or `None` if no argument is stdin.
fn resolve_stdin_index(stdin_arg: i32, caller_argv_len: usize) -> Option<usize> {
    match stdin_arg {
        0 => None,
        -1 => caller_argv_len.checked_sub(1),
        n if n > 0 => Some(n as usize),
        _ => None,
    }
}

/// Build the child argv from `rule` and the caller's argument vector
/// `caller_argv` (`caller_argv[0]` is the command, `caller_argv[1]` the
/// optional subcommand).
///
/// A caller argument may contain embedded nul bytes only if it ends up as
/// the stdin payload; the dispatcher is responsible for rejecting any other
/// nul-containing argument before this is called, so this function does not
/// re-check that invariant.
pub fn build_command_argv(rule: &PolicyRule, caller_argv: &[Vec<u8>]) -> BuiltArgv {
    let stdin_index = resolve_stdin_index(rule.stdin_arg, caller_argv.len());
    let mut argv = Vec::with_capacity(caller_argv.len());
    argv.push(basename(&rule.program));

    let mut stdin = None;
    for (i, arg) in caller_argv.iter().enumerate().skip(1) {
        if Some(i) == stdin_index {
            stdin = Some(arg.clone());
            continue;
        }
        argv.push(arg.clone());
    }
    BuiltArgv { argv, stdin }
}

/// Build the argv for a help invocation: `[basename(program), command,
/// subcommand?]`.
pub fn build_help_argv(program: &Path, command: &[u8], subcommand: Option<&[u8]>) -> Vec<Vec<u8>> {
    let mut argv = vec![basename(program), command.to_vec()];
    if let Some(sub) = subcommand {
        argv.push(sub.to_vec());
    }
    argv
}
