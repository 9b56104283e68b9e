use std::io;

use remctld_protocol::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Everything that can go wrong while dispatching a single command. Every
/// variant maps to exactly one `ErrorCode` the transport understands via
/// [`DispatchError::code`], so that mapping stays exhaustive and reviewable
/// instead of a miscellaneous catch-all.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("empty command")]
    EmptyArgv,

    #[error("no matching policy rule")]
    UnknownCommand,

    #[error("too many arguments for help command")]
    TooManyHelpArgs,

    #[error("access denied")]
    AccessDenied,

    #[error("no help defined for command")]
    NoHelp,

    #[error("cannot create socket pair: {0}")]
    SocketPair(#[source] io::Error),

    #[error("cannot spawn child process: {0}")]
    Spawn(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// The `ErrorCode` this error surfaces to the transport.
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::EmptyArgv => ErrorCode::BadCommand,
            DispatchError::UnknownCommand => ErrorCode::UnknownCommand,
            DispatchError::TooManyHelpArgs => ErrorCode::TooManyArgs,
            DispatchError::AccessDenied => ErrorCode::Access,
            DispatchError::NoHelp => ErrorCode::NoHelp,
            DispatchError::SocketPair(_)
            | DispatchError::Spawn(_)
            | DispatchError::Io(_)
            | DispatchError::Internal(_) => ErrorCode::Internal,
        }
    }
}
