//! Backend session: owns the subprocess transport, serializes command
//! traffic through one gate, and exposes the typed command surface.
//!
//! Every request/response cycle (send, receive payload, receive trailing
//! prompt) runs under a single mutex owning the transport, so two callers
//! can never interleave bytes on the shared stream. A transport failure
//! leaves the stream at an unknown position; there is no way to
//! resynchronize after startup, so the session poisons itself and all
//! later commands fail fast.

use crate::core::error::CoreError;
use crate::core::protocol::{chomp, classify};
use crate::core::stdio_transport::StdioTransport;
use crate::core::transport::CoreTransport;
use crate::core::types::{CommandArg, VertexKind};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Session parameters. The synchronization token and identification
/// marker are arbitrary protocol constants inherited from the backend;
/// they are configurable rather than load-bearing.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Backend executable, resolved on the search path.
    pub program: String,
    pub args: Vec<String>,
    /// Throwaway line sent first, distinguishable from any real command.
    pub sync_token: String,
    /// No-op command whose reply identifies a clean stream boundary.
    pub ident_command: String,
    /// Substring that marks the identification reply.
    pub ident_marker: String,
    /// Bound on each receive; `None` blocks forever.
    pub command_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            program: "graph-core".to_string(),
            args: Vec::new(),
            sync_token: "garbage_2039483945;".to_string(),
            ident_command: "HELO;".to_string(),
            ident_marker: "HELO".to_string(),
            command_timeout: Some(Duration::from_secs(30)),
        }
    }
}

struct Inner {
    transport: Box<dyn CoreTransport>,
    /// Set on quit or any fatal transport error.
    unusable: bool,
}

pub struct CoreSession {
    inner: Mutex<Inner>,
    config: SessionConfig,
}

impl CoreSession {
    /// Spawn the backend and synchronize the stream. Failure here is
    /// fatal initialization; the session is never retried automatically.
    pub async fn connect(config: SessionConfig) -> anyhow::Result<Self> {
        info!(program = %config.program, "starting backend");
        let transport = StdioTransport::spawn(&config.program, &config.args)?;
        let session = CoreSession::with_transport(Box::new(transport), config);
        session.synchronize().await?;
        info!("backend session ready");
        Ok(session)
    }

    /// Build a session over an existing transport without handshaking.
    pub fn with_transport(transport: Box<dyn CoreTransport>, config: SessionConfig) -> Self {
        CoreSession {
            inner: Mutex::new(Inner {
                transport,
                unusable: false,
            }),
            config,
        }
    }

    /// Startup handshake: a backend that was already running may have
    /// stale buffered output. Send the garbage token, then the
    /// identification command, and discard replies until the marker is
    /// seen; then eat the identification command's trailing prompt so the
    /// stream sits at a clean boundary for the first real command.
    pub async fn synchronize(&self) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().await;
        debug!("synchronizing backend stream");
        let result: Result<(), CoreError> = async {
            inner.transport.send_line(&self.config.sync_token).await?;
            inner.transport.send_line(&self.config.ident_command).await?;
            loop {
                let reply = receive(&mut inner, self.config.command_timeout).await?;
                if reply.contains(&self.config.ident_marker) {
                    break;
                }
                debug!(discarded = %reply, "stale backend output");
            }
            receive(&mut inner, self.config.command_timeout).await?;
            Ok(())
        }
        .await;

        if let Err(e) = &result {
            inner.unusable = true;
            return Err(CoreError::Handshake(e.to_string()));
        }
        result
    }

    /// The generic primitive every typed operation builds on: resolve the
    /// argument names, build the command line, run one exchange under the
    /// gate.
    pub async fn command(&self, name: &str, args: &[CommandArg]) -> Result<String, CoreError> {
        let mut line = String::from(name);
        for arg in args {
            let text = arg.resolve()?;
            line.push(' ');
            line.push_str(&text);
        }
        line.push(';');
        self.raw_command(&line).await
    }

    /// Run an already-formed command line through the session gate.
    /// Used directly by the interactive console.
    pub async fn raw_command(&self, line: &str) -> Result<String, CoreError> {
        let mut inner = self.inner.lock().await;
        if inner.unusable {
            return Err(CoreError::Poisoned);
        }
        debug!(command = line, "sending");
        let result = exchange(&mut inner, line, self.config.command_timeout).await;
        if let Err(e) = &result {
            if e.is_fatal() {
                warn!(error = %e, "transport failure, poisoning session");
                inner.unusable = true;
            }
        }
        result
    }

    /// Ask the backend to exit. The session is unusable afterwards.
    pub async fn quit(&self) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().await;
        if inner.unusable {
            return Ok(());
        }
        info!("shutting down backend");
        let result = inner.transport.send_line("quit").await;
        inner.unusable = true;
        result
    }

    /*
     * Below here are the operations implemented by the backend.
     */

    pub async fn graph_xml(&self, graph: &str) -> Result<String, CoreError> {
        self.command("graph_xml", &[CommandArg::name(graph)]).await
    }

    /// Returns the fresh graph's name.
    pub async fn new_graph(&self) -> Result<String, CoreError> {
        Ok(chomp(&self.command("new_graph", &[]).await?))
    }

    pub async fn add_vertex(&self, graph: &str, kind: VertexKind) -> Result<(), CoreError> {
        self.command(
            "add_vertex",
            &[CommandArg::name(graph), CommandArg::name(kind.as_str())],
        )
        .await?;
        Ok(())
    }

    pub async fn add_edge(&self, graph: &str, source: &str, target: &str) -> Result<(), CoreError> {
        self.command(
            "add_edge",
            &[
                CommandArg::name(graph),
                CommandArg::name(source),
                CommandArg::name(target),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn delete_vertex(&self, graph: &str, vertex: &str) -> Result<(), CoreError> {
        self.command(
            "delete_vertex",
            &[CommandArg::name(graph), CommandArg::name(vertex)],
        )
        .await?;
        Ok(())
    }

    pub async fn delete_edge(&self, graph: &str, edge: &str) -> Result<(), CoreError> {
        self.command(
            "delete_edge",
            &[CommandArg::name(graph), CommandArg::name(edge)],
        )
        .await?;
        Ok(())
    }

    pub async fn attach_rewrites(
        &self,
        graph: &str,
        vertices: Vec<String>,
    ) -> Result<(), CoreError> {
        self.command(
            "attach_rewrites",
            &[CommandArg::name(graph), CommandArg::NameSet(vertices)],
        )
        .await?;
        Ok(())
    }

    pub async fn show_rewrites(&self, graph: &str) -> Result<String, CoreError> {
        self.command("show_rewrites", &[CommandArg::name(graph)])
            .await
    }

    pub async fn apply_rewrite(&self, graph: &str, index: i32) -> Result<(), CoreError> {
        self.command(
            "apply_rewrite",
            &[CommandArg::name(graph), CommandArg::Index(index)],
        )
        .await?;
        Ok(())
    }

    pub async fn set_angle(&self, graph: &str, vertex: &str, angle: &str) -> Result<(), CoreError> {
        self.command(
            "set_angle",
            &[
                CommandArg::name(graph),
                CommandArg::name(vertex),
                CommandArg::name(angle),
            ],
        )
        .await?;
        Ok(())
    }

    /// Hilbert-space term of the graph in the given output format.
    pub async fn hilb(&self, graph: &str, format: &str) -> Result<String, CoreError> {
        self.command(
            "hilb",
            &[CommandArg::name(graph), CommandArg::name(format)],
        )
        .await
    }

    pub async fn undo(&self, graph: &str) -> Result<(), CoreError> {
        self.command("undo", &[CommandArg::name(graph)]).await?;
        Ok(())
    }

    pub async fn redo(&self, graph: &str) -> Result<(), CoreError> {
        self.command("redo", &[CommandArg::name(graph)]).await?;
        Ok(())
    }

    pub async fn save_graph(&self, graph: &str, file_name: &str) -> Result<(), CoreError> {
        self.command(
            "save_graph",
            &[CommandArg::name(graph), CommandArg::name(file_name)],
        )
        .await?;
        Ok(())
    }

    /// Loads a graph from a backend-interpreted path; returns its name.
    pub async fn load_graph(&self, file_name: &str) -> Result<String, CoreError> {
        Ok(chomp(
            &self
                .command("load_graph", &[CommandArg::name(file_name)])
                .await?,
        ))
    }
}

// One full request/response cycle; the caller holds the gate.
async fn exchange(
    inner: &mut Inner,
    line: &str,
    timeout: Option<Duration>,
) -> Result<String, CoreError> {
    inner.transport.send_line(line).await?;
    let payload = receive(inner, timeout).await?;
    // eat the trailing prompt before the gate is released, whether or not
    // the payload turns out to be an error
    receive(inner, timeout).await?;
    classify(payload)
}

async fn receive(inner: &mut Inner, timeout: Option<Duration>) -> Result<String, CoreError> {
    match timeout {
        Some(bound) => match tokio::time::timeout(bound, inner.transport.receive()).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout),
        },
        None => inner.transport.receive().await,
    }
}
