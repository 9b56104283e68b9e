//! Process launching: fork/exec the program a matched policy rule names,
//! under that rule's configured identity, with its stdio wired to
//! connected socket pairs shared with the caller's session.
//!
//! Socket topology: protocol 1 gets one `AF_UNIX`/`SOCK_STREAM` pair whose
//! child end is duplicated onto the child's stdin (if there is input),
//! stdout, and stderr alike, so the three streams interleave on the wire
//! exactly as the child wrote them. Protocol ≥2 gets a second, read-only
//! pair for stderr so the two streams stay distinguishable.
//! `tokio::net::UnixStream::pair` gives connected-socketpair semantics
//! equivalent to `socketpair(AF_UNIX, SOCK_STREAM, 0, ...)`, and is
//! pollable by `tokio::select!` without any extra non-blocking setup.
//!
//! Identity transition (initgroups → setgid → setuid, in that order) runs
//! in a `pre_exec` hook — the standard library's documented mechanism for
//! child-side setup that must happen after fork and before exec. This
//! deliberately avoids `Command::uid`/`Command::gid`: those skip
//! `initgroups`, and std does not document the relative order of its
//! internal setgid/setuid against a user `pre_exec` hook, which is exactly
//! the kind of reordering hazard a privilege-dropping identity switch needs
//! to avoid. Manually closing descriptors 3-15 to defend against legacy
//! libraries that leak fds across exec is intentionally *not* reproduced:
//! every fd the Rust standard library and tokio create is `O_CLOEXEC` by
//! default, and std's own child-side plumbing uses an internal `CLOEXEC`
//! pipe in that same descriptor range to report `pre_exec`/`exec` failures
//! back to the parent — blindly closing that range would silently break
//! failure reporting for a problem the Rust default already prevents from
//! the other direction (see DESIGN.md).

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::process::CommandExt;
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;

use remctld_protocol::PolicyRule;
use remctld_protocol::Session;
use tokio::net::UnixStream;
use tokio::process::Child;
use tokio::process::Command;

use crate::argv::BuiltArgv;
use crate::error::DispatchError;
use crate::error::Result;

/// The open communication channels and child handle handed off to the I/O
/// multiplexing loop.
pub struct Launched {
    pub child: Child,
    pub stdio: UnixStream,
    pub stderr: Option<UnixStream>,
}

struct Credentials {
    user: CString,
    gid: libc::gid_t,
    uid: libc::uid_t,
}

fn resolve_credentials(rule: &PolicyRule) -> Result<Option<Credentials>> {
    match (&rule.user, rule.uid) {
        (Some(user), Some(uid)) if uid > 0 => {
            let user = CString::new(user.as_str())
                .map_err(|_| DispatchError::Internal("target user contains a nul byte".into()))?;
            Ok(Some(Credentials {
                user,
                gid: rule.gid.unwrap_or(0) as libc::gid_t,
                uid: uid as libc::uid_t,
            }))
        }
        _ => Ok(None),
    }
}

/// Translate a raw child exit status into the exit code the transport sees:
/// the low 8 bits on a normal exit, or -1 on death by signal.
pub fn translate_exit_status(status: std::process::ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => -1,
    }
}

/// Fork/exec the rule's program under its configured identity, with
/// stdin/stdout/stderr wired to socket pairs appropriate for `protocol`.
pub async fn spawn_child(
    rule: &PolicyRule,
    built: &BuiltArgv,
    session: &Session,
    logical_command: &[u8],
    protocol: u32,
) -> Result<Launched> {
    let credentials = resolve_credentials(rule)?;

    let (parent_stdio, child_stdio) =
        UnixStream::pair().map_err(DispatchError::SocketPair)?;
    let child_stdio_std = child_stdio
        .into_std()
        .map_err(DispatchError::SocketPair)?;

    let (parent_stderr, child_stderr_std) = if protocol >= 2 {
        let (parent, child) = UnixStream::pair().map_err(DispatchError::SocketPair)?;
        let child_std = child.into_std().map_err(DispatchError::SocketPair)?;
        (Some(parent), Some(child_std))
    } else {
        (None, None)
    };

    let mut cmd = Command::new(&rule.program);
    cmd.arg0(std::ffi::OsStr::from_bytes(&built.argv[0]));
    cmd.args(built.argv[1..].iter().map(|a| std::ffi::OsStr::from_bytes(a)));

    cmd.env("REMUSER", &session.user);
    cmd.env("REMOTE_USER", &session.user);
    cmd.env("REMOTE_ADDR", &session.ip_address);
    if let Some(hostname) = &session.hostname {
        cmd.env("REMOTE_HOST", hostname);
    }
    cmd.env(
        "REMCTL_COMMAND",
        std::ffi::OsStr::from_bytes(logical_command),
    );

    if built.stdin.is_some() {
        cmd.stdin(Stdio::from(
            child_stdio_std.try_clone().map_err(DispatchError::Spawn)?,
        ));
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::from(
        child_stdio_std.try_clone().map_err(DispatchError::Spawn)?,
    ));
    match &child_stderr_std {
        Some(stderr_std) => {
            cmd.stderr(Stdio::from(
                stderr_std.try_clone().map_err(DispatchError::Spawn)?,
            ));
        }
        None => {
            cmd.stderr(Stdio::from(child_stdio_std));
        }
    }

    // SAFETY: the closure only calls async-signal-safe libc functions
    // (initgroups/setgid/setuid) on data prepared before the fork; it
    // allocates nothing and touches no Rust runtime state.
    unsafe {
        cmd.pre_exec(move || {
            if let Some(creds) = &credentials {
                if libc::initgroups(creds.user.as_ptr(), creds.gid) != 0 {
                    return Err(io::Error::last_os_error());
                }
                if libc::setgid(creds.gid) != 0 {
                    return Err(io::Error::last_os_error());
                }
                if libc::setuid(creds.uid) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }
            Ok(())
        });
    }

    cmd.kill_on_drop(true);
    let child = cmd.spawn().map_err(DispatchError::Spawn)?;

    Ok(Launched {
        child,
        stdio: parent_stdio,
        stderr: parent_stderr,
    })
}
