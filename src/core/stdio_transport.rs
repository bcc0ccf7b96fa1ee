// low-level stdio transport: child process pipes, line writes, sentinel reads
use crate::core::error::CoreError;
use crate::core::protocol::{RESPONSE_END, RESPONSE_END_PAD};
use crate::core::transport::CoreTransport;
use anyhow::anyhow;
use std::process::Stdio;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::warn;

pub struct StdioTransport {
    writer: ChildStdin,
    reader: BufReader<ChildStdout>,
    _child: Child, // keeps the backend alive for the session's lifetime
}

#[async_trait::async_trait]
impl CoreTransport for StdioTransport {
    async fn send_line(&mut self, line: &str) -> Result<(), CoreError> {
        write_line_to(&mut self.writer, line).await
    }

    async fn receive(&mut self) -> Result<String, CoreError> {
        read_response_from(&mut self.reader).await
    }
}

impl StdioTransport {
    /// Spawn the backend executable and wire up its pipes. Stderr is
    /// drained by a background task into the log so it never blocks the
    /// child or mixes with protocol traffic.
    pub fn spawn(program: &str, args: &[String]) -> anyhow::Result<Self> {
        let (child, writer, reader, stderr) = start_backend(program, args)?;
        tokio::spawn(drain_stderr(stderr));
        Ok(StdioTransport {
            writer,
            reader,
            _child: child,
        })
    }
}

/// Write one command line followed by the line terminator, then flush.
pub(crate) async fn write_line_to<W>(writer: &mut W, line: &str) -> Result<(), CoreError>
where
    W: AsyncWrite + Unpin + Send,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Read a single response from an async reader.
///
/// Accumulates bytes until the two-byte sentinel (`' '` then 0x08) is
/// seen, drops the padding space and decodes the rest as UTF-8. A missing
/// padding byte or end-of-stream is a fatal transport error.
pub(crate) async fn read_response_from<R>(reader: &mut R) -> Result<String, CoreError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut payload = Vec::new();

    loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte).await?;
        if byte[0] == RESPONSE_END {
            break;
        }
        payload.push(byte[0]);
    }

    if payload.pop() != Some(RESPONSE_END_PAD) {
        return Err(CoreError::MalformedResponse);
    }

    Ok(String::from_utf8(payload)?)
}

async fn drain_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        warn!(target: "backend", "{}", line);
    }
}

fn start_backend(
    program: &str,
    args: &[String],
) -> anyhow::Result<(Child, ChildStdin, BufReader<ChildStdout>, ChildStderr)> {
    let mut cmd = Command::new(program);
    for a in args {
        cmd.arg(a);
    }

    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| anyhow!("cannot execute {:?}, check it is in the path: {}", program, e))?;

    let writer = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("failed to take child stdin"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("failed to take child stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("failed to take child stderr"))?;
    let reader = BufReader::new(stdout);

    Ok((child, writer, reader, stderr))
}

#[cfg(test)]
mod tests {
    use super::{read_response_from, write_line_to};
    use crate::core::error::CoreError;
    use crate::core::protocol::RESPONSE_END;
    use tokio::io::{duplex, AsyncWriteExt};

    #[tokio::test]
    async fn reads_payload_up_to_sentinel() {
        let (mut a, mut b) = duplex(1024);

        let writer = tokio::spawn(async move {
            a.write_all(b"first \x08second \x08").await.unwrap();
            a.flush().await.unwrap();
        });

        assert_eq!(read_response_from(&mut b).await.unwrap(), "first");
        assert_eq!(read_response_from(&mut b).await.unwrap(), "second");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn payload_may_contain_sentinel_pad_bytes() {
        let (mut a, mut b) = duplex(1024);

        let writer = tokio::spawn(async move {
            a.write_all(b"two words \x08").await.unwrap();
            a.flush().await.unwrap();
        });

        assert_eq!(read_response_from(&mut b).await.unwrap(), "two words");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn missing_pad_before_sentinel_is_malformed() {
        let (mut a, mut b) = duplex(64);

        let writer = tokio::spawn(async move {
            a.write_all(&[b'x', RESPONSE_END]).await.unwrap();
            a.flush().await.unwrap();
        });

        assert!(matches!(
            read_response_from(&mut b).await,
            Err(CoreError::MalformedResponse)
        ));
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn closed_stream_is_an_io_error() {
        let (a, mut b) = duplex(64);
        drop(a);

        assert!(matches!(
            read_response_from(&mut b).await,
            Err(CoreError::Io(_))
        ));
    }

    #[tokio::test]
    async fn write_line_terminates_and_flushes() {
        let (mut a, mut b) = duplex(64);
        write_line_to(&mut a, "HELO;").await.unwrap();
        drop(a);

        let mut received = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut b, &mut received)
            .await
            .unwrap();
        assert_eq!(received, b"HELO;\n");
    }
}
