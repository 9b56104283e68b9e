#![allow(clippy::expect_used)]

// Helpers shared by the integration tests. Located under `tests/` so they
// never leak into the crate's public API surface.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use remctld_protocol::AclEvaluator;
use remctld_protocol::CommandLogger;
use remctld_protocol::ErrorCode;
use remctld_protocol::PolicyRule;
use remctld_protocol::Session;
use remctld_protocol::StreamId;
use remctld_protocol::Transport;
use tempfile::TempDir;

/// One frame captured by a [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Error { code: ErrorCode, message: String },
    V1Output { buffer: Vec<u8>, status: i32 },
    V2Output { stream: StreamId, chunk: Vec<u8> },
    V2Status { status: i32 },
}

/// In-memory [`Transport`] double: records every frame emitted to it instead
/// of encoding wire tokens over a GSS-API channel.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    frames: Mutex<Vec<Frame>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().expect("frames lock poisoned").clone()
    }

    /// Concatenation of every stream-tagged chunk recorded for `stream`, in
    /// emission order.
    pub fn stream_bytes(&self, stream: StreamId) -> Vec<u8> {
        let mut out = Vec::new();
        for frame in self.frames() {
            if let Frame::V2Output { stream: s, chunk } = frame {
                if s == stream {
                    out.extend_from_slice(&chunk);
                }
            }
        }
        out
    }

    pub fn terminal_frame_count(&self) -> usize {
        self.frames()
            .iter()
            .filter(|f| {
                matches!(
                    f,
                    Frame::Error { .. } | Frame::V1Output { .. } | Frame::V2Status { .. }
                )
            })
            .count()
    }
}

impl Transport for RecordingTransport {
    fn send_error(&self, _session: &Session, code: ErrorCode, message: &str) {
        self.frames.lock().expect("frames lock poisoned").push(Frame::Error {
            code,
            message: message.to_string(),
        });
    }

    fn v1_send_output(&self, _session: &Session, buffer: &[u8], status: i32) {
        self.frames.lock().expect("frames lock poisoned").push(Frame::V1Output {
            buffer: buffer.to_vec(),
            status,
        });
    }

    fn v2_send_output(&self, _session: &Session, stream: StreamId, chunk: &[u8]) -> bool {
        self.frames.lock().expect("frames lock poisoned").push(Frame::V2Output {
            stream,
            chunk: chunk.to_vec(),
        });
        true
    }

    fn v2_send_status(&self, _session: &Session, status: i32) {
        self.frames.lock().expect("frames lock poisoned").push(Frame::V2Status { status });
    }
}

/// ACL double: permits everyone except the users named in `denied_users`.
#[derive(Debug, Default)]
pub struct AllowAllExcept {
    pub denied_users: Vec<String>,
}

impl AclEvaluator for AllowAllExcept {
    fn permit(&self, _rule: &PolicyRule, user: &str) -> bool {
        !self.denied_users.iter().any(|u| u == user)
    }
}

/// Audit log double that records nothing; dispatch's call into it is part of
/// the path under test even when the test doesn't inspect the log itself.
#[derive(Debug, Default)]
pub struct NullLogger;

impl CommandLogger for NullLogger {
    fn log_command(&self, _argv: &[Vec<u8>], _rule: Option<&PolicyRule>, _user: &str) {}
}

pub fn session(protocol: u32) -> Session {
    Session::new("test-user", "127.0.0.1", protocol)
}

pub fn argv(parts: &[&str]) -> Vec<Vec<u8>> {
    parts.iter().map(|s| s.as_bytes().to_vec()).collect()
}

/// Writes an executable shell script to `dir/name` and returns its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = fs::metadata(&path).expect("stat script").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod script");
    path
}

/// Count of open file descriptors for the current process, used to assert
/// that a dispatch invocation leaks no descriptors.
pub fn open_fd_count() -> usize {
    fs::read_dir("/proc/self/fd")
        .expect("read /proc/self/fd")
        .count()
}

#[allow(dead_code)]
pub fn tempdir() -> TempDir {
    TempDir::new().expect("create tempdir")
}
