//! Streamable HTTP transport
//!
//! Binds one server instance to one HTTP request. The reply is a single buffered
//! JSON body unless the client accepts an event stream and either refuses JSON or
//! the instance pushes a message before its final response. Streamed replies write
//! every message as a `data: <json>` event.

pub mod message;
pub mod negotiate;

use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::future::{join_all, BoxFuture};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{
    errors::AppError,
    lifecycle::TeardownGuard,
    mcp::{
        peer::Peer,
        server::{RpcRequest, ServerInstance},
    },
};
use message::{parse_body, Inbound, InboundMessage};
use negotiate::{accepted_modes, is_json_content_type};

pub const MCP_SESSION_ID_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

pub type SessionIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

type Exchange = BoxFuture<'static, Result<Vec<Value>, AppError>>;

#[derive(Clone, Default)]
pub struct TransportOptions {
    /// Produces the session id attached to initialize responses. `None` runs the
    /// transport stateless: no session id is issued or expected.
    pub session_id_generator: Option<SessionIdGenerator>,
}

impl TransportOptions {
    pub fn stateless() -> Self {
        Self::default()
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is already connected to a server instance")]
    AlreadyConnected,
    #[error("transport has no server instance")]
    NotConnected,
    #[error("transport is closed")]
    Closed,
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        AppError::internal(err.to_string())
    }
}

/// Cloneable close signal shared between a transport and its teardown.
#[derive(Debug, Clone, Default)]
pub struct TransportHandle {
    closed: CancellationToken,
}

impl TransportHandle {
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }
}

pub struct StreamableHttpTransport {
    options: TransportOptions,
    server: Option<Arc<dyn ServerInstance>>,
    handle: TransportHandle,
}

impl StreamableHttpTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self {
            options,
            server: None,
            handle: TransportHandle::default(),
        }
    }

    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    pub fn connect(&mut self, server: Arc<dyn ServerInstance>) -> Result<(), TransportError> {
        if self.server.is_some() {
            return Err(TransportError::AlreadyConnected);
        }
        if self.handle.is_closed() {
            return Err(TransportError::Closed);
        }

        self.server = Some(server);
        Ok(())
    }

    /// Runs the exchange for one HTTP request, consuming the transport.
    ///
    /// `guard` is resolved when the exchange ends. For streamed replies it travels
    /// with the response body, so dropping the body tears the request down.
    pub async fn handle_request(
        self,
        headers: &HeaderMap,
        body: Bytes,
        guard: TeardownGuard,
    ) -> Result<Response, AppError> {
        match self.exchange(headers, &body).await {
            Ok(Reply::Buffered(response)) => {
                guard.complete();
                Ok(response)
            }
            Ok(Reply::Streaming(stream)) => Ok(stream.into_response(guard)),
            Err(err) => {
                guard.fail();
                Err(err)
            }
        }
    }

    async fn exchange(&self, headers: &HeaderMap, body: &[u8]) -> Result<Reply, AppError> {
        let server = self.server.clone().ok_or(TransportError::NotConnected)?;
        if self.handle.is_closed() {
            return Err(TransportError::Closed.into());
        }

        if !is_json_content_type(headers) {
            return Ok(Reply::rejected(AppError::UnsupportedMediaType {
                message: "Unsupported Media Type: Content-Type must be application/json",
            }));
        }

        let modes = accepted_modes(headers);
        if !modes.any() {
            return Ok(Reply::rejected(AppError::NotAcceptable {
                message: "Not Acceptable: Client must accept application/json or text/event-stream",
            }));
        }

        let inbound = match parse_body(body) {
            Ok(inbound) => inbound,
            Err(err) => return Ok(Reply::rejected(err)),
        };

        let session_id = self.session_id(&inbound);
        let batch = inbound.batch;
        let requests = deliver_notifications(server.as_ref(), inbound).await;
        if requests.is_empty() {
            return Ok(Reply::Buffered(StatusCode::ACCEPTED.into_response()));
        }

        if !modes.event_stream {
            debug!(requests = requests.len(), "buffered exchange");
            let exchange = start_exchange(server, requests, Peer::detached(), self.handle());
            let responses = exchange.await?;
            return Ok(Reply::Buffered(buffered_response(responses, batch, session_id)));
        }

        // Headers are committed only once the exchange pushes or finishes.
        let (outbound_tx, mut outbound) = mpsc::unbounded_channel();
        let mut exchange = start_exchange(server, requests, Peer::new(outbound_tx), self.handle());

        tokio::select! {
            biased;
            result = &mut exchange => {
                let responses = result?;
                let mut pending = drain(&mut outbound);
                if pending.is_empty() && modes.json {
                    debug!("buffered exchange");
                    return Ok(Reply::Buffered(buffered_response(responses, batch, session_id)));
                }

                debug!(pushed = pending.len(), "streaming completed exchange");
                pending.extend(responses);
                Ok(Reply::Streaming(EventStream {
                    pending,
                    outbound,
                    exchange: None,
                    session_id,
                }))
            }
            Some(first) = outbound.recv() => {
                debug!("exchange pushed a message, streaming reply");
                Ok(Reply::Streaming(EventStream {
                    pending: vec![first],
                    outbound,
                    exchange: Some(exchange),
                    session_id,
                }))
            }
        }
    }

    fn session_id(&self, inbound: &Inbound) -> Option<HeaderValue> {
        if !inbound.is_initialization() {
            return None;
        }
        let generator = self.options.session_id_generator.as_ref()?;
        HeaderValue::from_str(&generator()).ok()
    }
}

enum Reply {
    Buffered(Response),
    Streaming(EventStream),
}

impl Reply {
    fn rejected(err: AppError) -> Self {
        debug!(error = %err, "request rejected by transport");
        Self::Buffered(err.into_response())
    }
}

/// Delivers notifications and responses to the server and returns the requests.
async fn deliver_notifications(server: &dyn ServerInstance, inbound: Inbound) -> Vec<RpcRequest> {
    let mut requests = Vec::new();
    for message in inbound.messages {
        match message {
            InboundMessage::Request(request) => requests.push(request),
            InboundMessage::Notification { method, params } => {
                server.handle_notification(&method, params).await;
            }
            InboundMessage::Response => debug!("ignoring client response in stateless mode"),
        }
    }
    requests
}

/// Handles all requests concurrently; responses keep request order. The exchange
/// aborts as soon as the transport is closed.
fn start_exchange(
    server: Arc<dyn ServerInstance>,
    requests: Vec<RpcRequest>,
    peer: Peer,
    handle: TransportHandle,
) -> Exchange {
    Box::pin(async move {
        let calls = requests.into_iter().map(|request| {
            let server = Arc::clone(&server);
            let peer = peer.clone();
            async move { server.handle_request(request, peer).await }
        });

        tokio::select! {
            _ = handle.closed() => Err(TransportError::Closed.into()),
            responses = join_all(calls) => responses.into_iter().collect(),
        }
    })
}

fn drain(outbound: &mut mpsc::UnboundedReceiver<Value>) -> Vec<Value> {
    let mut messages = Vec::new();
    while let Ok(message) = outbound.try_recv() {
        messages.push(message);
    }
    messages
}

fn buffered_response(
    mut responses: Vec<Value>,
    batch: bool,
    session_id: Option<HeaderValue>,
) -> Response {
    let body = if batch {
        Value::Array(responses)
    } else {
        responses.pop().unwrap_or(Value::Null)
    };

    let mut response = (StatusCode::OK, Json(body)).into_response();
    if let Some(session_id) = session_id {
        response
            .headers_mut()
            .insert(MCP_SESSION_ID_HEADER, session_id);
    }
    response
}

struct EventStream {
    pending: Vec<Value>,
    outbound: mpsc::UnboundedReceiver<Value>,
    exchange: Option<Exchange>,
    session_id: Option<HeaderValue>,
}

enum Step {
    Pushed(Value),
    Finished(Result<Vec<Value>, AppError>),
}

impl EventStream {
    fn into_response(self, guard: TeardownGuard) -> Response {
        let Self {
            pending,
            mut outbound,
            exchange,
            session_id,
        } = self;

        let events = async_stream::stream! {
            let mut failure = None;

            for message in pending {
                yield Event::default().json_data(&message);
            }

            if let Some(mut exchange) = exchange {
                loop {
                    let step = tokio::select! {
                        biased;
                        Some(message) = outbound.recv() => Step::Pushed(message),
                        result = &mut exchange => Step::Finished(result),
                    };

                    match step {
                        Step::Pushed(message) => yield Event::default().json_data(&message),
                        Step::Finished(Ok(responses)) => {
                            for message in drain(&mut outbound).into_iter().chain(responses) {
                                yield Event::default().json_data(&message);
                            }
                            break;
                        }
                        Step::Finished(Err(err)) => {
                            failure = Some(err);
                            break;
                        }
                    }
                }
            }

            match failure {
                None => guard.complete(),
                Some(err) => {
                    error!(error = %err, "exchange failed after streaming began, terminating connection");
                    guard.fail();
                    yield Err(axum::Error::new(err));
                }
            }
        };

        let mut response = Sse::new(events).into_response();
        if let Some(session_id) = session_id {
            response
                .headers_mut()
                .insert(MCP_SESSION_ID_HEADER, session_id);
        }
        response
    }
}
