//! The sender pipeline: §4.2 and §4.2.1 of the transfer protocol.

use crate::compression::{self, CompressMode};
use crate::error::{ProtocolError, TransferError};
use crate::manifest::SourceEntry;
use crate::resume::{self, ResumeHint};
use crate::transfer::crypto_session::Encryption;
use crate::transfer::progress::{ProgressDriver, ProgressSink};
use crate::transfer::{CHUNK_SIZE, HANDSHAKE_TIMEOUT};
use crate::wire::channel::Channel;
use crate::wire::chunk::ChunkFrame;
use crate::wire::messages::{FileHeader, ManifestBody, Message, ReceiverManifestBody, Role};
use relaycopy_crypto::{kdf, sha256, ChainedHash};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use tokio::time::timeout;

type Result<T> = std::result::Result<T, TransferError>;

/// Options controlling one send session. `server` and `files` are
/// CLI-level concerns; this layer works from already-built manifest
/// entries plus their local source paths.
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub code: String,
    pub encrypt: bool,
    pub compress: CompressMode,
    pub resume: bool,
}

/// Run a full send session over `channel`: pairing handshake,
/// manifest exchange, optional resume negotiation, then every file in
/// `entries` in order, followed by `eof`. `progress`, when given, is
/// notified as each file starts and each chunk is written to the wire.
pub async fn send(
    channel: &mut dyn Channel,
    options: &SendOptions,
    entries: &[SourceEntry],
    progress: Option<&mut dyn ProgressSink>,
) -> Result<()> {
    if entries.is_empty() {
        return Err(TransferError::NoFiles);
    }

    let total_bytes = entries.iter().map(|e| e.entry.size).sum();
    tracing::info!(files = entries.len(), total_bytes, encrypt = options.encrypt, "starting send session");
    let mut progress = ProgressDriver::new(total_bytes, progress);

    let code_hash_hex = if options.encrypt {
        hex::encode(kdf::code_fingerprint(&options.code)?)
    } else {
        hex::encode(sha256(options.code.as_bytes()))
    };

    channel
        .send_message(&Message::Hello {
            code_hash_hex,
            role: Role::Sender,
        })
        .await?;
    tracing::debug!("hello sent, waiting for ready");

    await_ready(channel).await?;
    tracing::debug!("ready received, sending manifest");

    let mut encryption = send_manifest(channel, options, entries).await?;

    let hints = if options.resume {
        tracing::debug!("resume requested, awaiting receiver manifest");
        let hints = await_resume_manifest(channel, &mut encryption).await?;
        tracing::debug!(known_files = hints.len(), "resume manifest received");
        hints
    } else {
        HashMap::new()
    };

    for source in entries {
        tracing::debug!(path = %source.entry.path, size = source.entry.size, "transferring file");
        send_file(
            channel,
            &mut encryption,
            options.compress,
            source,
            hints.get(&source.entry.path),
            &mut progress,
        )
        .await
        .inspect_err(|e| tracing::warn!(path = %source.entry.path, error = %e, "file transfer failed"))?;
    }

    channel.send_message(&Message::Eof).await?;
    progress.finish();
    tracing::info!("send session complete");
    Ok(())
}

async fn send_manifest(
    channel: &mut dyn Channel,
    options: &SendOptions,
    entries: &[SourceEntry],
) -> Result<Encryption> {
    let body = ManifestBody {
        resume: options.resume,
        entries: entries.iter().map(|e| e.entry.clone()).collect(),
    };

    if !options.encrypt {
        channel
            .send_message(&Message::Manifest {
                resume: body.resume,
                entries: body.entries,
            })
            .await?;
        tracing::debug!("plaintext manifest sent");
        return Ok(Encryption::Plain);
    }

    let key = kdf::content_key(&options.code)?;
    let (mut encryption, start_nonce) = Encryption::generate(key);
    let plaintext = serde_json::to_vec(&body).map_err(ProtocolError::from)?;
    let ciphertext = encryption.encrypt(&plaintext)?;
    channel
        .send_message(&Message::EncManifest {
            nonce: hex::encode(start_nonce),
            hidden_manifest: hex::encode(ciphertext),
        })
        .await?;
    tracing::debug!("encrypted manifest sent");
    Ok(encryption)
}

/// Wait up to [`HANDSHAKE_TIMEOUT`] for `ready`. A stray `hello` is
/// ignorable "at any" state per the receiver's own dispatch table
/// (§4.3); the relay normally swallows the peer's pairing `hello`
/// before forwarding anything, but tolerating one here costs nothing
/// and matches that same rule on the sender side.
async fn await_ready(channel: &mut dyn Channel) -> Result<()> {
    match timeout(HANDSHAKE_TIMEOUT, wait_for_ready(channel)).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout("ready").into()),
    }
}

async fn wait_for_ready(channel: &mut dyn Channel) -> Result<()> {
    loop {
        match channel.recv_message().await? {
            Message::Ready => return Ok(()),
            Message::Hello { .. } => continue,
            other => {
                return Err(
                    ProtocolError::Handshake(format!("expected ready, got {}", other.kind())).into(),
                )
            }
        }
    }
}

async fn await_resume_manifest(
    channel: &mut dyn Channel,
    encryption: &mut Encryption,
) -> Result<HashMap<String, ResumeHint>> {
    let message = match timeout(HANDSHAKE_TIMEOUT, channel.recv_message()).await {
        Ok(Ok(m)) => m,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(ProtocolError::Timeout("resume manifest").into()),
    };

    let body = match message {
        Message::ReceiverManifest { entries } => ReceiverManifestBody { entries },
        Message::EncReceiverManifest { hidden_manifest } if encryption.enabled() => {
            let ciphertext =
                hex::decode(hidden_manifest).map_err(|e| ProtocolError::Handshake(format!("bad hex: {e}")))?;
            let plaintext = encryption.decrypt(&ciphertext)?;
            serde_json::from_slice(&plaintext).map_err(ProtocolError::from)?
        }
        other => {
            return Err(ProtocolError::Handshake(format!(
                "expected receiver manifest, got {}",
                other.kind()
            ))
            .into())
        }
    };

    Ok(resume::hints_from_entries(&body.entries)?)
}

async fn send_file(
    channel: &mut dyn Channel,
    encryption: &mut Encryption,
    compress_mode: CompressMode,
    source: &SourceEntry,
    hint: Option<&ResumeHint>,
    progress: &mut ProgressDriver<'_>,
) -> Result<()> {
    progress.start_file(&source.entry.path);

    let decision = resume::decide(&source.source, source.entry.size, hint)?;
    if decision.skip {
        progress.add_bytes(source.entry.size);
        return Ok(());
    }
    if decision.append_from > 0 {
        progress.add_bytes(decision.append_from);
    }

    let mut file = std::fs::File::open(&source.source)?;
    file.seek(SeekFrom::Start(decision.append_from))?;

    let first_chunk = read_chunk(&mut file)?;
    let (compression_decision, first_payload) = compression::decide(compress_mode, &first_chunk)?;

    let header = FileHeader {
        path: source.entry.path.clone(),
        size: source.entry.size,
        compression: compression_decision.tag,
        append_from: decision.append_from,
    };
    send_header(channel, encryption, &header).await?;

    let mut chain = ChainedHash::new();
    let mut seq: u64 = 0;

    if !first_chunk.is_empty() {
        progress.add_bytes(first_chunk.len() as u64);
        send_chunk(channel, encryption, &mut chain, &mut seq, first_payload).await?;

        loop {
            let raw = read_chunk(&mut file)?;
            if raw.is_empty() {
                break;
            }
            let plain_len = raw.len() as u64;
            let payload = if compression_decision.use_compression {
                compression::compress(&raw)?
            } else {
                raw
            };
            send_chunk(channel, encryption, &mut chain, &mut seq, payload).await?;
            progress.add_bytes(plain_len);
        }
    }

    channel.send_message(&Message::FileEof).await?;
    Ok(())
}

async fn send_chunk(
    channel: &mut dyn Channel,
    encryption: &mut Encryption,
    chain: &mut ChainedHash,
    seq: &mut u64,
    payload: Vec<u8>,
) -> Result<()> {
    let chain_value = chain.advance(&payload);
    let wire_payload = if encryption.enabled() {
        encryption.encrypt(&payload)?
    } else {
        payload
    };
    channel
        .send_binary(ChunkFrame::encode(*seq, &chain_value, &wire_payload))
        .await?;
    *seq += 1;
    Ok(())
}

async fn send_header(channel: &mut dyn Channel, encryption: &mut Encryption, header: &FileHeader) -> Result<()> {
    if encryption.enabled() {
        let plaintext = serde_json::to_vec(header).map_err(ProtocolError::from)?;
        let ciphertext = encryption.encrypt(&plaintext)?;
        channel
            .send_message(&Message::EncFile {
                hidden_file: hex::encode(ciphertext),
            })
            .await?;
    } else {
        channel
            .send_message(&Message::File {
                path: header.path.clone(),
                size: header.size,
                compression: header.compression,
                append_from: header.append_from,
            })
            .await?;
    }
    Ok(())
}

/// Read up to one fixed-size chunk from `file`, returning fewer bytes
/// only at end of file (possibly zero).
fn read_chunk(file: &mut std::fs::File) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    buf.truncate(total);
    Ok(buf)
}
