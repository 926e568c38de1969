pub mod client;
pub mod logging;
pub mod stream;

pub use client::{AgentClient, ByteStream};
pub use stream::StreamParser;

#[cfg(test)]
pub mod mock_client;
