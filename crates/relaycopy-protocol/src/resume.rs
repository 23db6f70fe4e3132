//! The resume protocol: the receiver's disclosure of already-present
//! bytes, and the sender's append/overwrite/skip decision.

use crate::error::TransferError;
use crate::wire::messages::ResumeEntry;
use relaycopy_crypto::ChainedHash;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

type Result<T> = std::result::Result<T, TransferError>;

/// A parsed resume hint: how many bytes the receiver already has for a
/// path, and the chained hash it computed over exactly those bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeHint {
    pub recv_size: u64,
    pub recv_chain: [u8; 32],
}

/// Parse the wire's `entries` list into a lookup by path. Absence of a
/// key means "nothing present", per the spec.
pub fn hints_from_entries(entries: &[ResumeEntry]) -> Result<HashMap<String, ResumeHint>> {
    let mut map = HashMap::with_capacity(entries.len());
    for entry in entries {
        let bytes = hex::decode(&entry.chain_hex)
            .map_err(|e| TransferError::Compression(format!("bad chain_hex: {e}")))?;
        let mut recv_chain = [0u8; 32];
        if bytes.len() != 32 {
            return Err(TransferError::Compression(
                "chain_hex must decode to 32 bytes".into(),
            ));
        }
        recv_chain.copy_from_slice(&bytes);
        map.insert(
            entry.path.clone(),
            ResumeHint {
                recv_size: entry.size,
                recv_chain,
            },
        );
    }
    Ok(map)
}

/// The sender's resume decision for one file, per §4.2.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeDecision {
    pub append_from: u64,
    /// True when `append_from == declared_size`: the file is fully
    /// present and must not be retransmitted at all.
    pub skip: bool,
}

/// Decide how to resume `local_path` (the sender's source file) given
/// an optional receiver hint and the manifest's declared size.
///
/// Recomputes the chained hash over the first `recv_size` bytes of the
/// local file and compares it against the receiver's claim; a mismatch
/// (corrupt or divergent prefix) falls back to a full retransmit.
pub fn decide(
    local_path: &Path,
    declared_size: u64,
    hint: Option<&ResumeHint>,
) -> std::io::Result<ResumeDecision> {
    let hint = match hint {
        Some(h) if h.recv_size > 0 && h.recv_size <= declared_size => h,
        _ => {
            return Ok(ResumeDecision {
                append_from: 0,
                skip: false,
            })
        }
    };

    let recomputed = chained_hash_prefix(local_path, hint.recv_size)?;
    if recomputed == hint.recv_chain {
        Ok(ResumeDecision {
            append_from: hint.recv_size,
            skip: hint.recv_size == declared_size,
        })
    } else {
        Ok(ResumeDecision {
            append_from: 0,
            skip: false,
        })
    }
}

/// Compute the chained hash over the full contents of `path`, used by
/// the receiver to build its resume disclosure for an existing file.
pub fn chained_hash_whole_file(path: &Path) -> std::io::Result<[u8; 32]> {
    chained_hash_prefix(path, u64::MAX)
}

/// Compute the chained hash over the first `limit` bytes of `path`
/// (or the whole file if shorter), advancing in fixed-size reads the
/// same way the streaming transfer would.
fn chained_hash_prefix(path: &Path, limit: u64) -> std::io::Result<[u8; 32]> {
    const READ_BUF: usize = 1024 * 1024;
    let mut file = std::fs::File::open(path)?;
    let mut chain = ChainedHash::new();
    let mut remaining = limit;
    let mut buf = vec![0u8; READ_BUF];
    let mut last = [0u8; 32];
    loop {
        if remaining == 0 {
            break;
        }
        let want = buf.len().min(remaining as usize);
        let n = file.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        last = chain.advance(&buf[..n]);
        remaining = remaining.saturating_sub(n as u64);
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_hint_means_full_transfer() {
        let decision = decide(Path::new("/does/not/matter"), 100, None).unwrap();
        assert_eq!(decision.append_from, 0);
        assert!(!decision.skip);
    }

    #[test]
    fn matching_prefix_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let recv_chain = chained_hash_prefix(&path, 5).unwrap();
        let hint = ResumeHint {
            recv_size: 5,
            recv_chain,
        };
        let decision = decide(&path, 10, Some(&hint)).unwrap();
        assert_eq!(decision.append_from, 5);
        assert!(!decision.skip);
    }

    #[test]
    fn full_match_skips_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let recv_chain = chained_hash_prefix(&path, 10).unwrap();
        let hint = ResumeHint {
            recv_size: 10,
            recv_chain,
        };
        let decision = decide(&path, 10, Some(&hint)).unwrap();
        assert_eq!(decision.append_from, 10);
        assert!(decision.skip);
    }

    #[test]
    fn mismatched_prefix_forces_full_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let hint = ResumeHint {
            recv_size: 5,
            recv_chain: [0xAB; 32],
        };
        let decision = decide(&path, 10, Some(&hint)).unwrap();
        assert_eq!(decision.append_from, 0);
        assert!(!decision.skip);
    }

    #[test]
    fn hint_larger_than_declared_size_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let hint = ResumeHint {
            recv_size: 999,
            recv_chain: [0u8; 32],
        };
        let decision = decide(&path, 10, Some(&hint)).unwrap();
        assert_eq!(decision.append_from, 0);
        assert!(!decision.skip);
    }

    #[test]
    fn entries_round_trip_through_hex() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello world").unwrap();
        let chain = chained_hash_whole_file(f.path()).unwrap();

        let entries = vec![ResumeEntry {
            path: "f".into(),
            size: 11,
            chain_hex: hex::encode(chain),
        }];
        let hints = hints_from_entries(&entries).unwrap();
        assert_eq!(hints["f"].recv_size, 11);
        assert_eq!(hints["f"].recv_chain, chain);
    }
}
