//! Wire-level framing: the text message taxonomy, the binary chunk
//! frame layout, and the channel abstraction both are carried over.

pub mod channel;
pub mod chunk;
pub mod messages;

pub use channel::{Channel, Frame};
pub use chunk::ChunkFrame;
pub use messages::{
    CompressionTag, FileHeader, ManifestBody, ManifestEntry, Message, ReceiverManifestBody,
    ResumeEntry, Role,
};
