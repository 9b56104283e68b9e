use env_flags::env_flags;

env_flags! {
    /// Hard cap on protocol-1 delivered output bytes. Overflow beyond this
    /// is silently drained and discarded.
    pub REMCTLD_TOKEN_MAX_OUTPUT_V1: usize = 1024 * 1024;

    /// Maximum single-chunk size for protocol-≥2 `MESSAGE_OUTPUT` frames.
    /// Total bytes delivered per invocation is unbounded; only the chunk
    /// size read per loop iteration is capped.
    pub REMCTLD_TOKEN_MAX_OUTPUT: usize = 64 * 1024;
}
