use crate::ErrorCode;
use crate::PolicyRule;
use crate::Session;

/// Which child stream a protocol-≥2 `MESSAGE_OUTPUT` chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamId {
    Stdout = 1,
    Stderr = 2,
}

/// The framed output channel a `Session` emits frames on.
///
/// This is the transport layer's seam: a production implementation encodes
/// these calls as remctl wire tokens over a GSS-API channel, which this
/// crate does not implement. Tests in this workspace use an in-memory
/// recorder instead.
pub trait Transport: Send + Sync {
    fn send_error(&self, session: &Session, code: ErrorCode, message: &str);

    /// Protocol-1 terminal frame: the full accumulated buffer plus status.
    fn v1_send_output(&self, session: &Session, buffer: &[u8], status: i32);

    /// Protocol-≥2 chunk frame. Returns `false` if the peer is gone and the
    /// caller should stop trying to deliver further output.
    fn v2_send_output(&self, session: &Session, stream: StreamId, chunk: &[u8]) -> bool;

    /// Protocol-≥2 terminal frame.
    fn v2_send_status(&self, session: &Session, status: i32);
}

/// External ACL predicate evaluator. ACL file syntax and evaluation are not
/// implemented by this crate.
pub trait AclEvaluator: Send + Sync {
    fn permit(&self, rule: &PolicyRule, user: &str) -> bool;
}

/// External structured audit log. Log-mask application and formatting are
/// not implemented by this crate; this trait only carries the data a real
/// implementation would need.
pub trait CommandLogger: Send + Sync {
    fn log_command(&self, argv: &[Vec<u8>], rule: Option<&PolicyRule>, user: &str);
}
