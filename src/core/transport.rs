//! Backend transport abstraction (line out, sentinel-terminated text in).
use crate::core::error::CoreError;
use async_trait::async_trait;

/// Minimal async trait for talking to the backend.
/// - `send_line` takes a complete command line (no terminator), appends the
///   line ending, and flushes.
/// - `receive` returns one response payload with the sentinel stripped.
#[async_trait]
pub trait CoreTransport: Send + Sync {
    async fn send_line(&mut self, line: &str) -> Result<(), CoreError>;
    async fn receive(&mut self) -> Result<String, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::CoreTransport;
    use crate::core::error::CoreError;
    use crate::core::stdio_transport::{read_response_from, write_line_to};
    use async_trait::async_trait;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    struct InMemoryTransport {
        stream: DuplexStream,
    }

    #[async_trait]
    impl CoreTransport for InMemoryTransport {
        async fn send_line(&mut self, line: &str) -> Result<(), CoreError> {
            write_line_to(&mut self.stream, line).await
        }

        async fn receive(&mut self) -> Result<String, CoreError> {
            read_response_from(&mut self.stream).await
        }
    }

    #[tokio::test]
    async fn send_line_appends_newline() {
        let (a, mut b) = duplex(256);
        let mut transport = InMemoryTransport { stream: a };
        transport.send_line("new_graph;").await.unwrap();

        let mut buf = vec![0u8; "new_graph;\n".len()];
        b.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, b"new_graph;\n");
    }

    #[tokio::test]
    async fn receive_strips_sentinel() {
        let (a, mut b) = duplex(256);
        let mut transport = InMemoryTransport { stream: a };

        let writer = tokio::spawn(async move {
            b.write_all(b"graph1 \x08").await.unwrap();
            b.flush().await.unwrap();
        });

        let payload = transport.receive().await.unwrap();
        assert_eq!(payload, "graph1");
        writer.await.unwrap();
    }
}
