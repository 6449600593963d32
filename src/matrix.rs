//! Matrix adapters: the client-server HTTP client, the public room directory
//! source and the report room sink.

pub mod client;
pub mod directory;
pub mod room_sink;

pub use client::{MatrixClient, MessageContent, PublicRoomChunk, PublicRoomsResponse, SendRetry};
pub use directory::MatrixDirectorySource;
pub use room_sink::MatrixRoomSink;
