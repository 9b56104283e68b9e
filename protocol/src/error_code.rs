use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;

/// Error vocabulary the external transport understands.
///
/// Each variant is user-visible to the remote caller; none of them carry a
/// backtrace or cause chain on purpose — the transport only ever renders the
/// code and a short message, rather than a structured error.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    #[strum(to_string = "ERROR_INTERNAL")]
    Internal,
    #[strum(to_string = "ERROR_BAD_COMMAND")]
    BadCommand,
    #[strum(to_string = "ERROR_UNKNOWN_COMMAND")]
    UnknownCommand,
    #[strum(to_string = "ERROR_TOOMANY_ARGS")]
    TooManyArgs,
    #[strum(to_string = "ERROR_ACCESS")]
    Access,
    #[strum(to_string = "ERROR_NO_HELP")]
    NoHelp,
}

impl ErrorCode {
    /// The default message used when the caller of `Transport::send_error`
    /// does not have anything more specific to say.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::Internal => "Internal failure",
            ErrorCode::BadCommand => "Invalid command token",
            ErrorCode::UnknownCommand => "Unknown command",
            ErrorCode::TooManyArgs => "Too many arguments for help command",
            ErrorCode::Access => "Access denied",
            ErrorCode::NoHelp => "No help defined for command",
        }
    }
}
