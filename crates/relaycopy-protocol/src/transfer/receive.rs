//! The receiver pipeline: §4.3's frame dispatch table.

use crate::compression;
use crate::error::{ProtocolError, TransferError};
use crate::resume;
use crate::transfer::crypto_session::Encryption;
use crate::transfer::progress::{ProgressDriver, ProgressSink};
use crate::wire::channel::{Channel, Frame};
use crate::wire::chunk::ChunkFrame;
use crate::wire::messages::{CompressionTag, FileHeader, ManifestBody, Message, ReceiverManifestBody, ResumeEntry, Role};
use relaycopy_crypto::{kdf, sha256, ChainedHash};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, TransferError>;

/// Options controlling one receive session.
#[derive(Debug, Clone)]
pub struct ReceiveOptions {
    pub code: String,
    pub encrypt: bool,
    pub out: PathBuf,
    /// Whether to disclose locally-present files when the sender
    /// requests resume. When `false`, a reply is still sent if the
    /// sender asked for one (so it never hangs waiting), but it always
    /// claims nothing is present, forcing a full retransmit.
    pub resume: bool,
}

/// The state of the file currently open for writing, if any (§3 "File
/// transfer state").
struct OpenFile {
    dest: PathBuf,
    file: std::fs::File,
    expected_seq: u64,
    bytes_written: u64,
    expected_remaining: u64,
    compression: CompressionTag,
    chain: ChainedHash,
}

/// Run a full receive session over `channel`: pairing handshake, then
/// dispatch control and chunk frames until `eof`. `progress`, when
/// given, is notified once the manifest discloses the session's total
/// size and again as each file opens and each chunk is written.
pub async fn receive(
    channel: &mut dyn Channel,
    options: &ReceiveOptions,
    progress: Option<&mut dyn ProgressSink>,
) -> Result<()> {
    let mut progress = ProgressDriver::new(0, progress);
    tracing::info!(encrypt = options.encrypt, out = %options.out.display(), "starting receive session");
    let code_hash_hex = if options.encrypt {
        hex::encode(kdf::code_fingerprint(&options.code)?)
    } else {
        hex::encode(sha256(options.code.as_bytes()))
    };

    channel
        .send_message(&Message::Hello {
            code_hash_hex,
            role: Role::Receiver,
        })
        .await?;
    channel.send_message(&Message::Ready).await?;
    tracing::debug!("hello and ready sent");

    let mut encryption = Encryption::Plain;
    let content_key = if options.encrypt {
        Some(kdf::content_key(&options.code)?)
    } else {
        None
    };

    let mut open_file: Option<OpenFile> = None;

    loop {
        let frame = channel
            .recv_frame()
            .await?
            .ok_or(ProtocolError::ChannelClosed)?;

        match frame {
            Frame::Binary(bytes) => {
                let state = open_file.as_mut().ok_or_else(|| ProtocolError::UnexpectedMessage {
                    got: "binary chunk".into(),
                    expected: "a file to be open".into(),
                })?;
                let written = receive_chunk(&mut encryption, state, &bytes)?;
                progress.add_bytes(written);
            }

            Frame::Text(text) => {
                let message: Message = serde_json::from_str(&text).map_err(ProtocolError::from)?;
                match message {
                    Message::Hello { .. } => {}

                    Message::EncManifest { nonce, hidden_manifest } if open_file.is_none() => {
                        let key = content_key.ok_or(TransferError::EncryptionMismatch {
                            sender: true,
                            receiver: false,
                        })?;
                        let start = decode_nonce(&nonce)?;
                        encryption = Encryption::from_start_nonce(key, start);
                        let ciphertext = decode_hex(&hidden_manifest)?;
                        let plaintext = encryption.decrypt(&ciphertext)?;
                        let body: ManifestBody =
                            serde_json::from_slice(&plaintext).map_err(ProtocolError::from)?;
                        progress.set_total(body.entries.iter().map(|e| e.size).sum());
                        tracing::debug!(files = body.entries.len(), resume = body.resume, "encrypted manifest received");
                        handle_manifest(channel, &mut encryption, &options.out, options.resume, &body).await?;
                    }

                    // Only accepted when the session is not encrypted: an
                    // `--encrypt` receiver fed a plaintext manifest must not
                    // silently fall back to plaintext mode (§4.3, "any other
                    // unexpected frame type in the current state is fatal";
                    // the plaintext-tolerance carve-out covers `hello` only).
                    Message::Manifest { resume, entries } if open_file.is_none() && !options.encrypt => {
                        progress.set_total(entries.iter().map(|e| e.size).sum());
                        tracing::debug!(files = entries.len(), resume, "plaintext manifest received");
                        let body = ManifestBody { resume, entries };
                        handle_manifest(channel, &mut encryption, &options.out, options.resume, &body).await?;
                    }

                    Message::EncFile { hidden_file } if open_file.is_none() => {
                        let ciphertext = decode_hex(&hidden_file)?;
                        let plaintext = encryption.decrypt(&ciphertext)?;
                        let header: FileHeader =
                            serde_json::from_slice(&plaintext).map_err(ProtocolError::from)?;
                        tracing::debug!(path = %header.path, size = header.size, "encrypted file header received");
                        progress.start_file(&header.path);
                        progress.add_bytes(header.append_from);
                        open_file = Some(open_destination(&options.out, &header)?);
                    }

                    // Same reasoning as the plaintext `Manifest` arm above:
                    // an encrypted session must reject a plaintext `file`
                    // header rather than open a destination for it.
                    Message::File {
                        path,
                        size,
                        compression,
                        append_from,
                    } if open_file.is_none() && !options.encrypt => {
                        let header = FileHeader {
                            path,
                            size,
                            compression,
                            append_from,
                        };
                        tracing::debug!(path = %header.path, size = header.size, "file header received");
                        progress.start_file(&header.path);
                        progress.add_bytes(header.append_from);
                        open_file = Some(open_destination(&options.out, &header)?);
                    }

                    Message::FileEof if open_file.is_some() => {
                        let state = open_file.take().expect("checked is_some");
                        if state.bytes_written != state.expected_remaining {
                            tracing::warn!(
                                path = %state.dest.display(),
                                got = state.bytes_written,
                                expected = state.expected_remaining,
                                "file size mismatch at file_eof"
                            );
                            return Err(TransferError::SizeMismatch {
                                path: state.dest.display().to_string(),
                                got: state.bytes_written,
                                expected: state.expected_remaining,
                            });
                        }
                        tracing::debug!(path = %state.dest.display(), "file complete");
                    }

                    Message::Eof if open_file.is_none() => {
                        progress.finish();
                        tracing::info!("receive session complete");
                        return Ok(());
                    }

                    other => {
                        return Err(ProtocolError::UnexpectedMessage {
                            got: other.kind().to_string(),
                            expected: "a frame valid in the current state".into(),
                        }
                        .into())
                    }
                }
            }
        }
    }
}

fn receive_chunk(encryption: &mut Encryption, state: &mut OpenFile, frame: &[u8]) -> Result<u64> {
    let parsed = ChunkFrame::decode(frame)?;
    if parsed.seq != state.expected_seq {
        return Err(ProtocolError::UnexpectedMessage {
            got: format!("seq {}", parsed.seq),
            expected: format!("seq {}", state.expected_seq),
        }
        .into());
    }

    let decrypted = if encryption.enabled() {
        encryption.decrypt(parsed.payload)?
    } else {
        parsed.payload.to_vec()
    };

    let recomputed = state.chain.advance(&decrypted);
    if recomputed != parsed.chain {
        return Err(TransferError::IntegrityMismatch {
            offset: state.bytes_written,
        });
    }

    let plain = match state.compression {
        CompressionTag::None => decrypted,
        CompressionTag::Zstd => {
            let remaining = (state.expected_remaining - state.bytes_written) as usize;
            compression::decompress(&decrypted, remaining.max(decrypted.len()))?
        }
    };

    state.file.write_all(&plain)?;
    let written = plain.len() as u64;
    state.bytes_written += written;
    state.expected_seq += 1;
    Ok(written)
}

async fn handle_manifest(
    channel: &mut dyn Channel,
    encryption: &mut Encryption,
    out: &Path,
    resume_allowed: bool,
    body: &ManifestBody,
) -> Result<()> {
    if !body.resume {
        return Ok(());
    }

    // A receiver that opted out of resume still answers (the sender is
    // waiting on a reply whenever it asked for one) but never discloses
    // what it already has, forcing a full retransmit.
    let mut disclosures = Vec::new();
    if resume_allowed {
        for entry in &body.entries {
            let local = match safe_join(out, &entry.path) {
                Some(path) => path,
                None => continue,
            };
            if let Ok(metadata) = std::fs::metadata(&local) {
                if metadata.is_file() && metadata.len() > 0 {
                    let chain = resume::chained_hash_whole_file(&local)?;
                    disclosures.push(ResumeEntry {
                        path: entry.path.clone(),
                        size: metadata.len(),
                        chain_hex: hex::encode(chain),
                    });
                }
            }
        }
    }

    if encryption.enabled() {
        let plaintext = serde_json::to_vec(&ReceiverManifestBody { entries: disclosures })
            .map_err(ProtocolError::from)?;
        let ciphertext = encryption.encrypt(&plaintext)?;
        channel
            .send_message(&Message::EncReceiverManifest {
                hidden_manifest: hex::encode(ciphertext),
            })
            .await?;
    } else {
        channel
            .send_message(&Message::ReceiverManifest { entries: disclosures })
            .await?;
    }
    Ok(())
}

/// Join `path` beneath `root`, refusing any component that would
/// escape it (`..`, an absolute prefix, or a root/prefix component).
/// Per §6: "the receiver resolves paths beneath `out` and refuses to
/// traverse above it." A rejected path can't simply be an `Err` at
/// the manifest-disclosure call site (one bad entry shouldn't abort
/// the whole resume reply), so this returns `Option` and callers that
/// must fail hard (`file` headers) turn `None` into an error.
fn safe_join(root: &Path, path: &str) -> Option<PathBuf> {
    use std::path::Component;

    let mut out = root.to_path_buf();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Apply the open-destination rule on a `file` header: §4.3.
fn open_destination(out: &Path, header: &FileHeader) -> Result<OpenFile> {
    let dest = safe_join(out, &header.path).ok_or_else(|| {
        ProtocolError::Handshake(format!("path escapes output directory: {}", header.path))
    })?;
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let (file, expected_remaining) = if header.append_from > 0
        && dest
            .metadata()
            .map(|m| m.is_file() && m.len() == header.append_from)
            .unwrap_or(false)
    {
        let mut file = std::fs::OpenOptions::new().write(true).open(&dest)?;
        file.seek(SeekFrom::End(0))?;
        (file, header.size - header.append_from)
    } else {
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&dest)?;
        (file, header.size)
    };

    Ok(OpenFile {
        dest,
        file,
        expected_seq: 0,
        bytes_written: 0,
        expected_remaining,
        compression: header.compression,
        chain: ChainedHash::new(),
    })
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| ProtocolError::Handshake(format!("bad hex: {e}")).into())
}

fn decode_nonce(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = decode_hex(hex_str)?;
    if bytes.len() != 32 {
        return Err(ProtocolError::Handshake("nonce must be 32 bytes".into()).into());
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_join_accepts_nested_relative_paths() {
        let root = Path::new("/out");
        assert_eq!(
            safe_join(root, "project/src/main.rs"),
            Some(PathBuf::from("/out/project/src/main.rs"))
        );
    }

    #[test]
    fn safe_join_rejects_parent_dir_components() {
        let root = Path::new("/out");
        assert_eq!(safe_join(root, "../../etc/passwd"), None);
        assert_eq!(safe_join(root, "project/../../etc/passwd"), None);
    }

    #[test]
    fn safe_join_rejects_absolute_paths() {
        let root = Path::new("/out");
        assert_eq!(safe_join(root, "/etc/passwd"), None);
    }
}
