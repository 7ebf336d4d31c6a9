//! Unix domain socket server for IPC
//!
//! Provides request-response communication with UI and recognizer clients,
//! plus push notifications (session events and capture prompts) for
//! subscribed clients. All session mutations go through the controller's
//! command channel; the server holds no session state of its own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tracing::{debug, error, info, warn};

use crate::capture::{CapturePrompt, CaptureSubmitter};
use crate::config::SessionConfig;
use crate::events::SessionEvent;
use crate::session::{Action, Command, CommandReply, ControlError};

use super::protocol::{Notification, Request, Response};

/// Everything a client handler needs, cloned per connection
#[derive(Clone)]
struct ClientContext {
    command_tx: mpsc::Sender<Command>,
    submitter: CaptureSubmitter,
    event_tx: broadcast::Sender<SessionEvent>,
    prompt_tx: broadcast::Sender<CapturePrompt>,
}

/// IPC server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    context: ClientContext,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a new IPC server bound to the given socket path
    pub fn new(
        socket_path: &Path,
        command_tx: mpsc::Sender<Command>,
        submitter: CaptureSubmitter,
        event_tx: broadcast::Sender<SessionEvent>,
        prompt_tx: broadcast::Sender<CapturePrompt>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            context: ClientContext {
                command_tx,
                submitter,
                event_tx,
                prompt_tx,
            },
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = self.context.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, context) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Handle a single client connection
async fn handle_client(stream: UnixStream, context: ClientContext) -> Result<()> {
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(Mutex::new(writer));
    let mut len_buf = [0u8; 4];
    let mut is_recognizer = false;
    let mut is_subscribed = false;

    let result: Result<()> = loop {
        // Read message length (4-byte little-endian)
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("client disconnected");
                break Ok(());
            }
            Err(e) => break Err(e.into()),
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > 1024 * 1024 {
            warn!(len, "message too large, disconnecting");
            break Ok(());
        }

        // Read message body
        let mut msg_buf = vec![0u8; len];
        if let Err(e) = reader.read_exact(&mut msg_buf).await {
            break Err(e.into());
        }

        // Parse request
        let request: Request = match serde_json::from_slice(&msg_buf) {
            Ok(request) => request,
            Err(e) => break Err(anyhow::Error::from(e).context("failed to parse request")),
        };
        debug!(?request, "received request");

        if matches!(request, Request::AnnounceRecognizer) {
            is_recognizer = true;
        }
        let subscribe = matches!(request, Request::Subscribe) && !is_subscribed;

        // Process request and send the response
        let response = process_request(request, &context).await;
        if let Err(e) = send_message(&writer, &response).await {
            break Err(e);
        }

        if subscribe {
            is_subscribed = true;
            debug!("client subscribed to notifications");
            spawn_notifier(Arc::clone(&writer), &context);
        }
    };

    // A recognizer going away takes the capability with it
    if is_recognizer {
        info!("recognizer client disconnected, capture capability withdrawn");
        context.submitter.set_available(false);
    }

    result
}

/// Forward session events and capture prompts to a subscribed client
fn spawn_notifier(writer: Arc<Mutex<OwnedWriteHalf>>, context: &ClientContext) {
    let mut event_rx = context.event_tx.subscribe();
    let mut prompt_rx = context.prompt_tx.subscribe();

    tokio::spawn(async move {
        loop {
            let notification = tokio::select! {
                event = event_rx.recv() => match event {
                    Ok(event) => Notification::Event(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "notification receiver lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                prompt = prompt_rx.recv() => match prompt {
                    Ok(prompt) => Notification::Prompt(prompt),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "prompt receiver lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            if send_message(&writer, &notification).await.is_err() {
                debug!("subscribed client went away, stopping notifier");
                break;
            }
        }
    });
}

/// Send a length-prefixed JSON message
async fn send_message<T: serde::Serialize>(
    writer: &Arc<Mutex<OwnedWriteHalf>>,
    msg: &T,
) -> Result<()> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    let mut writer = writer.lock().await;
    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}

/// Process a request and build its response
async fn process_request(request: Request, context: &ClientContext) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Subscribe => Response::Subscribed,

        Request::GetStatus => dispatch(context, Action::Query).await,
        Request::Start => dispatch(context, Action::Start).await,
        Request::ForceStop => dispatch(context, Action::ForceStop).await,
        Request::BeginCheckIn => dispatch(context, Action::BeginCheckIn).await,
        Request::StopCheckIn => dispatch(context, Action::StopCheckIn).await,
        Request::Save => dispatch(context, Action::Save).await,
        Request::Retry => dispatch(context, Action::Retry).await,
        Request::Restart => dispatch(context, Action::Restart).await,
        Request::ExitSession => dispatch(context, Action::ExitSession).await,
        Request::ResetLog => dispatch(context, Action::ResetLog).await,
        Request::ExportLog => dispatch(context, Action::ExportLog).await,

        Request::SetConfig {
            session_hours,
            interval_minutes,
        } => match SessionConfig::from_presented(session_hours, interval_minutes) {
            Ok(config) => dispatch(context, Action::SetConfig(config)).await,
            Err(e) => Response::Error {
                code: "config_invalid".to_string(),
                message: e.to_string(),
            },
        },

        Request::AnnounceRecognizer => {
            info!("recognizer client announced, capture capability available");
            context.submitter.set_available(true);
            Response::Ack
        }
        Request::CaptureResult { generation, text } => {
            context.submitter.submit_transcript(generation, text).await;
            Response::Ack
        }
        Request::CaptureFailed { generation, reason } => {
            context.submitter.submit_error(generation, reason).await;
            Response::Ack
        }
    }
}

/// Send an action to the controller and translate the outcome
async fn dispatch(context: &ClientContext, action: Action) -> Response {
    let (reply_tx, reply_rx) = oneshot::channel();
    let command = Command {
        action,
        reply: Some(reply_tx),
    };

    if context.command_tx.send(command).await.is_err() {
        return controller_gone();
    }

    match reply_rx.await {
        Ok(Ok(CommandReply::Status(status))) => Response::Status(status),
        Ok(Ok(CommandReply::LogText(text))) => Response::LogText { text },
        Ok(Err(error)) => Response::Error {
            code: error_code(&error).to_string(),
            message: error.to_string(),
        },
        Err(_) => controller_gone(),
    }
}

fn controller_gone() -> Response {
    Response::Error {
        code: "controller_unavailable".to_string(),
        message: "session controller is not running".to_string(),
    }
}

fn error_code(error: &ControlError) -> &'static str {
    match error {
        ControlError::InvalidPhase { .. } => "invalid_phase",
        ControlError::Config(_) => "config_invalid",
        ControlError::Capture(crate::capture::CaptureError::Unavailable) => "capture_unavailable",
        ControlError::Capture(crate::capture::CaptureError::Busy) => "capture_busy",
    }
}
