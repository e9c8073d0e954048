//! Server-side version CAS.
//!
//! The compare-and-swap runs entirely inside Redis so two writers can never
//! both observe a stale version and both win. The script text is pinned
//! together with its SHA-1; execution is by checksum, with one transparent
//! reload on `NOSCRIPT`.

use byteorder::{BigEndian, ByteOrder};
use redis::{Connection, ErrorKind, RedisResult};

/// Length of the version prefix on versioned blobs.
pub const VERSION_PREFIX_LEN: usize = 8;

/// Lua source of the version-guarded SET.
pub const VERSIONED_SET_SCRIPT: &str = include_str!("versioned_set.lua");

/// SHA-1 of [`VERSIONED_SET_SCRIPT`] as Redis computes it.
pub const VERSIONED_SET_SHA: &str = "e72226e2faad8e6c4cd49353b8c0cd5d4b18a653";

/// Build `version (u64 BE) ‖ payload`.
pub fn frame_versioned(version: u64, payload: &[u8]) -> Vec<u8> {
    let mut blob = vec![0u8; VERSION_PREFIX_LEN + payload.len()];
    BigEndian::write_u64(&mut blob[..VERSION_PREFIX_LEN], version);
    blob[VERSION_PREFIX_LEN..].copy_from_slice(payload);
    blob
}

/// Split a framed blob into version and payload; `None` if too short.
pub fn split_versioned(blob: &[u8]) -> Option<(u64, &[u8])> {
    if blob.len() < VERSION_PREFIX_LEN {
        return None;
    }
    let version = BigEndian::read_u64(&blob[..VERSION_PREFIX_LEN]);
    Some((version, &blob[VERSION_PREFIX_LEN..]))
}

/// Arguments of one script invocation.
pub(crate) struct VersionedSet<'a> {
    pub key: &'a [u8],
    pub payload: &'a [u8],
    pub version: u64,
    pub ttl_secs: u64,
}

impl VersionedSet<'_> {
    fn version_bytes(&self) -> [u8; VERSION_PREFIX_LEN] {
        let mut buf = [0u8; VERSION_PREFIX_LEN];
        BigEndian::write_u64(&mut buf, self.version);
        buf
    }

    fn eval_by_sha(&self, conn: &mut Connection) -> RedisResult<bool> {
        let applied: i64 = redis::cmd("EVALSHA")
            .arg(VERSIONED_SET_SHA)
            .arg(1)
            .arg(self.key)
            .arg(self.payload)
            .arg(&self.version_bytes()[..])
            .arg(self.ttl_secs)
            .query(conn)?;
        Ok(applied == 1)
    }

    fn eval_source(&self, conn: &mut Connection) -> RedisResult<bool> {
        let applied: i64 = redis::cmd("EVAL")
            .arg(VERSIONED_SET_SCRIPT)
            .arg(1)
            .arg(self.key)
            .arg(self.payload)
            .arg(&self.version_bytes()[..])
            .arg(self.ttl_secs)
            .query(conn)?;
        Ok(applied == 1)
    }

    /// Run the CAS. Returns `true` when the write was applied, `false` when
    /// a newer version is stored.
    pub fn execute(&self, conn: &mut Connection) -> RedisResult<bool> {
        match self.eval_by_sha(conn) {
            Err(err) if err.kind() == ErrorKind::NoScriptError => {
                tracing::warn!(sha = VERSIONED_SET_SHA, "versioned set script not loaded, loading");
                let loaded: String = redis::cmd("SCRIPT")
                    .arg("LOAD")
                    .arg(VERSIONED_SET_SCRIPT)
                    .query(conn)?;
                if loaded.eq_ignore_ascii_case(VERSIONED_SET_SHA) {
                    match self.eval_by_sha(conn) {
                        Err(err) if err.kind() == ErrorKind::NoScriptError => {}
                        other => return other,
                    }
                } else {
                    tracing::warn!(
                        expected = VERSIONED_SET_SHA,
                        actual = %loaded,
                        "versioned set script checksum mismatch"
                    );
                }
                tracing::warn!("falling back to uncached script evaluation");
                self.eval_source(conn)
            }
            other => other,
        }
    }
}
