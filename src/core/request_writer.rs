// Escape-framed request encoder. One message at a time:
// ESC '<' code ESC ':' requestId ESC '|' arg (ESC ';' arg)* ESC '>'
use crate::core::error::CoreError;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Reserved escape byte; prefixes every structural marker on the wire.
pub const ESC: u8 = 0x1b;

/// Builds escape-framed request messages over an output sink.
///
/// Exactly one message may be under construction at a time: `add_header`
/// opens it, `close_message` closes and flushes it. Argument separators
/// (`ESC ';'`) are deferred and only emitted when a following element
/// materializes, so no separator ever precedes the first argument or
/// trails the last.
pub struct RequestWriter<W> {
    output: W,
    in_message: bool,
    arg_pending: bool,
}

impl<W: AsyncWrite + Unpin + Send> RequestWriter<W> {
    pub fn new(output: W) -> Self {
        RequestWriter {
            output,
            in_message: false,
            arg_pending: false,
        }
    }

    /// Recover the underlying sink, e.g. to inspect an encoded buffer.
    pub fn into_inner(self) -> W {
        self.output
    }

    /// Opens a message: `ESC '<' code ESC ':' request_id ESC '|'`.
    ///
    /// `code` must be pure ASCII; `request_id` is arbitrary UTF-8 text the
    /// caller uses to correlate the response.
    pub async fn add_header(&mut self, code: &str, request_id: &str) -> Result<(), CoreError> {
        if self.in_message {
            return Err(CoreError::Contract("add_header while a message is open"));
        }
        if !code.is_ascii() {
            return Err(CoreError::Contract("command code must be ASCII"));
        }
        self.in_message = true;
        self.write_marker(b'<').await?;
        self.output.write_all(code.as_bytes()).await?;
        self.write_marker(b':').await?;
        self.output.write_all(request_id.as_bytes()).await?;
        self.write_marker(b'|').await?;
        Ok(())
    }

    /// An argument slot with no content; only its separator will appear.
    pub fn add_empty_arg(&mut self) -> Result<(), CoreError> {
        self.check_open()?;
        self.arg_pending = true;
        Ok(())
    }

    /// Verbatim UTF-8 bytes. Only safe for values the caller knows are
    /// free of protocol metacharacters (simple names).
    pub async fn add_string_arg(&mut self, value: &str) -> Result<(), CoreError> {
        self.check_open()?;
        self.close_arg().await?;
        self.output.write_all(value.as_bytes()).await?;
        self.arg_pending = true;
        Ok(())
    }

    /// Length-prefixed chunk: `ESC '[' len ESC '|' bytes ESC ']'`.
    ///
    /// The reader consumes exactly `len` bytes, so this is the only
    /// argument form safe for payloads containing arbitrary bytes,
    /// including the escape byte itself.
    pub async fn add_data_chunk_arg(&mut self, data: &[u8]) -> Result<(), CoreError> {
        self.check_open()?;
        self.close_arg().await?;
        self.write_chunk(data).await?;
        self.arg_pending = true;
        Ok(())
    }

    /// A one-character escaped tag followed by a data chunk.
    pub async fn add_tagged_data_chunk_arg(
        &mut self,
        tag: char,
        data: &[u8],
    ) -> Result<(), CoreError> {
        self.check_open()?;
        if !tag.is_ascii() {
            return Err(CoreError::NonAsciiMarker(tag));
        }
        self.close_arg().await?;
        self.write_marker(tag as u8).await?;
        self.write_chunk(data).await?;
        self.arg_pending = true;
        Ok(())
    }

    /// Counted list: `count ESC ':' item (ESC ',' item)*`. Order is
    /// preserved; no trailing item separator.
    pub async fn add_string_list_arg<S: AsRef<str>>(
        &mut self,
        items: &[S],
    ) -> Result<(), CoreError> {
        self.check_open()?;
        self.close_arg().await?;
        self.write_decimal(items.len() as i64).await?;
        self.write_marker(b':').await?;
        let mut first = true;
        for item in items {
            if !first {
                self.write_marker(b',').await?;
            }
            self.output.write_all(item.as_ref().as_bytes()).await?;
            first = false;
        }
        self.arg_pending = true;
        Ok(())
    }

    /// Canonical signed-decimal text, e.g. `-7`, `0`, `42`.
    pub async fn add_int_arg(&mut self, value: i32) -> Result<(), CoreError> {
        self.check_open()?;
        self.close_arg().await?;
        self.write_decimal(i64::from(value)).await?;
        self.arg_pending = true;
        Ok(())
    }

    /// Emits `ESC '>'` (with no separator before it), clears the message
    /// state and flushes so the peer sees the whole message promptly.
    pub async fn close_message(&mut self) -> Result<(), CoreError> {
        self.check_open()?;
        self.arg_pending = false;
        self.write_marker(b'>').await?;
        self.in_message = false;
        self.output.flush().await?;
        Ok(())
    }

    fn check_open(&self) -> Result<(), CoreError> {
        if !self.in_message {
            return Err(CoreError::Contract("no message open; call add_header first"));
        }
        Ok(())
    }

    // Emits the deferred argument separator, if one is owed.
    async fn close_arg(&mut self) -> Result<(), CoreError> {
        if self.arg_pending {
            self.arg_pending = false;
            self.write_marker(b';').await?;
        }
        Ok(())
    }

    async fn write_marker(&mut self, marker: u8) -> Result<(), CoreError> {
        if marker >= 128 {
            return Err(CoreError::NonAsciiMarker(marker as char));
        }
        self.output.write_all(&[ESC, marker]).await?;
        Ok(())
    }

    async fn write_chunk(&mut self, data: &[u8]) -> Result<(), CoreError> {
        self.write_marker(b'[').await?;
        self.write_decimal(data.len() as i64).await?;
        self.write_marker(b'|').await?;
        self.output.write_all(data).await?;
        self.write_marker(b']').await?;
        Ok(())
    }

    async fn write_decimal(&mut self, value: i64) -> Result<(), CoreError> {
        self.output
            .write_all(value.to_string().as_bytes())
            .await?;
        Ok(())
    }
}
