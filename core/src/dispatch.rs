//! Command dispatcher: the end-to-end path from a caller's argument vector
//! to a terminal frame on the transport.
//!
//! The sequence mirrors a conventional remctl-style server: validate the
//! argv shape, resolve it against the policy table (falling back to help
//! dispatch when nothing matches and the command is literally `help`),
//! reject embedded nul bytes everywhere except the one argument a rule
//! designates as the stdin payload, log the attempt, check authorization,
//! assemble the child's argv, launch it, and drain its output. Any error
//! along the way is reported through `Transport::send_error` and stops the
//! sequence; a natural exit always results in a single `v1_send_output` or
//! `v2_send_status` call.

use remctld_protocol::AclEvaluator;
use remctld_protocol::CommandLogger;
use remctld_protocol::PolicyRule;
use remctld_protocol::PolicyTable;
use remctld_protocol::Session;
use remctld_protocol::Transport;

use crate::argv::build_command_argv;
use crate::argv::build_help_argv;
use crate::argv::BuiltArgv;
use crate::error::Result;
use crate::launch::spawn_child;
use crate::multiplex;
use crate::rules::find;

const HELP_COMMAND: &[u8] = b"help";

fn token_has_nul(token: &[u8]) -> bool {
    token.contains(&0)
}

/// Lossily render a caller-supplied token for a log message. Request tokens
/// are only required to be nul-free, not valid UTF-8 (see spec.md §4.E step
/// 2), so this is for display only — it must never be used to decide
/// control flow.
fn display_token(token: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(token)
}

/// Whether argument `index` (1-based position in `argv`, i.e. `argv[index]`)
/// is allowed to carry a nul byte: it must be exactly the argument the rule
/// designates as the stdin payload, and only outside help dispatch.
fn argument_may_contain_nul(rule: Option<&PolicyRule>, help: bool, index: usize, argv_len: usize) -> bool {
    let Some(rule) = rule else {
        return false;
    };
    if !help && index as i32 == rule.stdin_arg {
        return true;
    }
    if rule.stdin_arg == -1 && index + 1 == argv_len {
        return true;
    }
    false
}

/// Run one fully-resolved command: assemble its argv, launch it, and drain
/// its output, emitting exactly one terminal frame.
async fn run_one(
    rule: &PolicyRule,
    built: &BuiltArgv,
    session: &Session,
    transport: &dyn Transport,
    logical_command: &[u8],
    emit_terminal_frame: bool,
) -> Result<multiplex::MultiplexOutcome> {
    let launched = spawn_child(rule, built, session, logical_command, session.protocol).await?;
    let outcome = multiplex::run(launched, session, transport, session.protocol, built.stdin.clone()).await?;
    if emit_terminal_frame {
        if outcome.io_error {
            transport.send_error(session, remctld_protocol::ErrorCode::Internal, "I/O error communicating with command");
        } else {
            match session.protocol {
                1 => {
                    let output = outcome.v1_output.clone().unwrap_or_default();
                    transport.v1_send_output(session, &output, outcome.exit_code);
                }
                _ => transport.v2_send_status(session, outcome.exit_code),
            }
        }
    }
    Ok(outcome)
}

/// Run the summary sweep: every rule whose subcommand is the `ALL` wildcard,
/// that `acl` permits, and that names a `summary` token, is invoked with
/// `[basename(program), summary]` as its argv. Protocol 1 concatenates every
/// sub-invocation's output into one buffer; the aggregate status is 0 unless
/// some sub-invocation exited nonzero, in which case it is the last nonzero
/// status seen. If no rule qualifies, this is reported as an unknown
/// command.
async fn run_summary(
    policy: &PolicyTable,
    session: &Session,
    transport: &dyn Transport,
    acl: &dyn AclEvaluator,
) -> Result<()> {
    let mut ok_any = false;
    let mut status_all = 0;
    let mut v1_output = Vec::new();

    for rule in policy.rules() {
        if rule.subcommand != remctld_protocol::ALL {
            continue;
        }
        if !acl.permit(rule, &session.user) {
            continue;
        }
        let Some(summary) = &rule.summary else {
            continue;
        };
        ok_any = true;

        let built = BuiltArgv {
            argv: vec![crate::argv::basename(&rule.program), summary.clone().into_bytes()],
            stdin: None,
        };
        let outcome = run_one(rule, &built, session, transport, summary.as_bytes(), false).await?;
        if outcome.io_error {
            transport.send_error(session, remctld_protocol::ErrorCode::Internal, "I/O error communicating with command");
            return Ok(());
        }
        if let Some(bytes) = outcome.v1_output {
            v1_output.extend_from_slice(&bytes);
        }
        if outcome.exit_code != 0 {
            status_all = outcome.exit_code;
        }
    }

    if ok_any {
        match session.protocol {
            1 => transport.v1_send_output(session, &v1_output, status_all),
            _ => transport.v2_send_status(session, status_all),
        }
    } else {
        transport.send_error(session, remctld_protocol::ErrorCode::UnknownCommand, "Unknown command");
    }
    Ok(())
}

/// Dispatch a single request: `argv[0]` is the command, `argv[1]` the
/// optional subcommand, the rest are arguments. Errors are reported through
/// `transport.send_error` and this returns `Ok(())` regardless — the
/// `Result` only surfaces failures the transport has no vocabulary for
/// (launch/IO failures), which the caller should treat as fatal for the
/// session.
pub async fn dispatch(
    argv: &[Vec<u8>],
    session: &Session,
    policy: &PolicyTable,
    transport: &dyn Transport,
    acl: &dyn AclEvaluator,
    logger: &dyn CommandLogger,
) -> Result<()> {
    let Some(command_bytes) = argv.first() else {
        transport.send_error(session, remctld_protocol::ErrorCode::BadCommand, "Invalid command token");
        return Ok(());
    };

    // Only a nul byte is forbidden here (spec.md §4.E step 2); the command
    // and subcommand are otherwise passed through as raw bytes and never
    // required to be valid UTF-8. A token that isn't valid UTF-8 simply
    // won't match any rule's literal `command`/`subcommand` field (unless a
    // rule names `ALL`/`EMPTY`), falling through to ERROR_UNKNOWN_COMMAND
    // rather than being rejected up front.
    for (i, token) in argv.iter().take(2).enumerate() {
        if token_has_nul(token) {
            tracing::info!(user = %session.user, field = if i == 0 { "command" } else { "subcommand" }, "nul octet in command token");
            transport.send_error(session, remctld_protocol::ErrorCode::BadCommand, "Invalid command token");
            return Ok(());
        }
    }

    let subcommand_bytes = argv.get(1).cloned();

    let mut rule = find(policy, Some(command_bytes.as_slice()), subcommand_bytes.as_deref()).cloned();
    let mut help = false;
    let mut help_subcommand_bytes: Option<Vec<u8>> = None;
    let mut effective_subcommand = subcommand_bytes.clone();

    if rule.is_none() && command_bytes.as_slice() == HELP_COMMAND {
        if argv.len() > 3 {
            tracing::info!(user = %session.user, "help command has more than three arguments");
            transport.send_error(
                session,
                remctld_protocol::ErrorCode::TooManyArgs,
                "Too many arguments for help command",
            );
        }
        match &subcommand_bytes {
            None => {
                run_summary(policy, session, transport, acl).await?;
                return Ok(());
            }
            Some(sub) => {
                help = true;
                help_subcommand_bytes = argv.get(2).cloned();
                rule = find(policy, Some(sub.as_slice()), help_subcommand_bytes.as_deref()).cloned();
                effective_subcommand = Some(sub.clone());
            }
        }
    }

    for (i, token) in argv.iter().enumerate().skip(1) {
        if argument_may_contain_nul(rule.as_ref(), help, i, argv.len()) {
            continue;
        }
        if token_has_nul(token) {
            tracing::info!(user = %session.user, index = i, "nul octet in command argument");
            transport.send_error(session, remctld_protocol::ErrorCode::BadCommand, "Invalid command token");
            return Ok(());
        }
    }

    logger.log_command(argv, rule.as_ref(), &session.user);

    let Some(rule) = rule else {
        tracing::info!(
            user = %session.user,
            command = %display_token(command_bytes),
            subcommand = ?effective_subcommand.as_deref().map(display_token),
            "unknown command"
        );
        transport.send_error(session, remctld_protocol::ErrorCode::UnknownCommand, "Unknown command");
        return Ok(());
    };

    if !acl.permit(&rule, &session.user) {
        tracing::info!(user = %session.user, command = %display_token(command_bytes), "access denied");
        transport.send_error(session, remctld_protocol::ErrorCode::Access, "Access denied");
        return Ok(());
    }

    let help_target_bytes = if help {
        match &rule.help {
            Some(h) => h.clone().into_bytes(),
            None => {
                tracing::info!(user = %session.user, command = %display_token(command_bytes), "no help defined for command");
                transport.send_error(
                    session,
                    remctld_protocol::ErrorCode::NoHelp,
                    "No help defined for command",
                );
                return Ok(());
            }
        }
    } else {
        Vec::new()
    };

    let built = if help {
        let argv = build_help_argv(
            &rule.program,
            &help_target_bytes,
            help_subcommand_bytes.as_deref(),
        );
        BuiltArgv { argv, stdin: None }
    } else {
        build_command_argv(&rule, argv)
    };

    let logical_command = if help { &help_target_bytes } else { command_bytes };

    run_one(&rule, &built, session, transport, logical_command, true).await?;
    Ok(())
}
