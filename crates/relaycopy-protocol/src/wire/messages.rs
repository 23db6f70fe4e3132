//! The text-frame message taxonomy (UTF-8 JSON, compact).
//!
//! Every text frame on the wire deserializes to exactly one [`Message`]
//! variant via its `type` tag. Binary chunk frames are handled
//! separately; see [`crate::wire::chunk`].

use serde::{Deserialize, Serialize};

/// One entry in a sender's manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub size: u64,
}

/// One entry in a receiver's resume disclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeEntry {
    pub path: String,
    pub size: u64,
    pub chain_hex: String,
}

/// Compression tag carried on a `file` / `enc_file` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionTag {
    None,
    Zstd,
}

/// A file header, carried either plaintext (`file`) or, once decrypted,
/// as the payload of `enc_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub path: String,
    pub size: u64,
    pub compression: CompressionTag,
    pub append_from: u64,
}

/// The plaintext manifest body, carried either directly (`manifest`) or,
/// once decrypted, as the payload of `enc_manifest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestBody {
    pub resume: bool,
    pub entries: Vec<ManifestEntry>,
}

/// The plaintext resume-manifest body, carried either directly
/// (`receiver_manifest`) or, once decrypted, as the payload of
/// `enc_receiver_manifest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverManifestBody {
    pub entries: Vec<ResumeEntry>,
}

/// Every recognized text-frame message, tagged by its `type` field.
///
/// `rename_all = "snake_case"` maps each variant to the wire's
/// `snake_case` type strings (`EncManifest` -> `"enc_manifest"`, etc.)
/// without needing per-variant renames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Hello {
        code_hash_hex: String,
        role: Role,
    },
    Manifest {
        resume: bool,
        entries: Vec<ManifestEntry>,
    },
    EncManifest {
        nonce: String,
        hidden_manifest: String,
    },
    ReceiverManifest {
        entries: Vec<ResumeEntry>,
    },
    EncReceiverManifest {
        hidden_manifest: String,
    },
    File {
        path: String,
        size: u64,
        compression: CompressionTag,
        append_from: u64,
    },
    EncFile {
        hidden_file: String,
    },
    Ready,
    FileEof,
    Eof,
}

/// The role an endpoint declares in its `hello` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Sender,
    Receiver,
}

impl Message {
    /// A short name for this variant, for error messages and logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "hello",
            Message::Manifest { .. } => "manifest",
            Message::EncManifest { .. } => "enc_manifest",
            Message::ReceiverManifest { .. } => "receiver_manifest",
            Message::EncReceiverManifest { .. } => "enc_receiver_manifest",
            Message::File { .. } => "file",
            Message::EncFile { .. } => "enc_file",
            Message::Ready => "ready",
            Message::FileEof => "file_eof",
            Message::Eof => "eof",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_round_trips_with_expected_tag() {
        let msg = Message::Hello {
            code_hash_hex: "ab".repeat(32),
            role: Role::Sender,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"hello\""));
        assert!(json.contains("\"role\":\"sender\""));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn no_payload_variants_serialize_with_only_a_tag() {
        let json = serde_json::to_string(&Message::Ready).unwrap();
        assert_eq!(json, r#"{"type":"ready"}"#);
        let json = serde_json::to_string(&Message::FileEof).unwrap();
        assert_eq!(json, r#"{"type":"file_eof"}"#);
        let json = serde_json::to_string(&Message::Eof).unwrap();
        assert_eq!(json, r#"{"type":"eof"}"#);
    }

    #[test]
    fn file_header_compression_tags_match_wire_strings() {
        let json = serde_json::to_string(&CompressionTag::Zstd).unwrap();
        assert_eq!(json, "\"zstd\"");
        let json = serde_json::to_string(&CompressionTag::None).unwrap();
        assert_eq!(json, "\"none\"");
    }

    #[test]
    fn unknown_type_tag_fails_to_parse() {
        let raw = r#"{"type":"bogus"}"#;
        assert!(serde_json::from_str::<Message>(raw).is_err());
    }
}
