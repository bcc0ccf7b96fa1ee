//! Protocol layer for the graph-rewrite backend: request framing,
//! transport, and the serialized command session.
pub mod error;
pub mod protocol;
pub mod request_writer;
pub mod session;
pub mod stdio_transport;
pub mod transport;
pub mod types;

pub use error::CoreError;
pub use request_writer::RequestWriter;
pub use session::{CoreSession, SessionConfig};
pub use types::{CommandArg, VertexKind};
