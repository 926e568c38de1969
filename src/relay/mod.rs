pub mod server;
pub mod session;
pub mod sse;

pub use server::{router, AppState};
pub use session::{AgentSession, SessionStore};
pub use sse::StreamFrame;
