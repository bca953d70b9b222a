//! Drives a [`StreamMachine`] from an `h2` server connection.
//!
//! The connection task owns the machine. Request bodies are read by one small
//! task per stream and forwarded over a channel, so frames from different
//! streams reach the machine in arrival order and in any interleaving.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use h2::server::SendResponse;
use h2::{FlowControl, Reason, RecvStream, SendStream};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::context::ConnectionContext;
use crate::error::TransportError;
use crate::http::response::Response;
use crate::http2::stream::{Frame, RequestHead, StreamMachine, StreamState};

const BODY_EVENT_BUFFER: usize = 64;

/// Body activity of one stream, forwarded to the connection task.
#[derive(Debug)]
enum BodyEvent {
    Data {
        stream_id: u32,
        payload: Bytes,
        end_of_stream: bool,
        flow: FlowControl,
    },
    Reset {
        stream_id: u32,
    },
}

/// Serve HTTP/2 on `io` until the peer goes away or a transport fault occurs.
pub async fn serve<I>(io: I, ctx: ConnectionContext, peer_addr: SocketAddr) -> Result<(), TransportError>
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut connection = h2::server::Builder::new()
        .max_concurrent_streams(ctx.limits.max_concurrent_streams)
        .handshake::<_, Bytes>(io)
        .await?;

    let mut machine = StreamMachine::new(ctx, Some(peer_addr));
    let mut writer = FrameWriter::default();
    let (events_tx, mut events_rx) = mpsc::channel(BODY_EVENT_BUFFER);

    loop {
        tokio::select! {
            accepted = connection.accept() => {
                let Some(accepted) = accepted else { break };
                let (request, respond) = accepted?;
                let stream_id = respond.stream_id().as_u32();
                let (parts, body) = request.into_parts();
                let end_of_stream = body.is_end_stream();

                writer.responders.insert(stream_id, respond);
                let state = machine.on_headers(stream_id, RequestHead::from(parts), end_of_stream);
                if state == StreamState::AwaitingBody {
                    tokio::spawn(forward_body(stream_id, body, events_tx.clone()));
                }
            }
            Some(event) = events_rx.recv() => match event {
                BodyEvent::Data { stream_id, payload, end_of_stream, flow } => {
                    // h2 strips padding and returns it to the window itself.
                    let consumed = machine.on_data(stream_id, payload, 0, end_of_stream);
                    release(flow, stream_id, consumed);
                }
                BodyEvent::Reset { stream_id } => {
                    machine.on_reset(stream_id);
                    writer.forget(stream_id);
                }
            },
        }

        writer.flush(&mut machine)?;
    }

    tracing::debug!("HTTP/2 connection closed by peer");
    Ok(())
}

fn release(mut flow: FlowControl, stream_id: u32, consumed: usize) {
    if consumed == 0 {
        return;
    }
    if let Err(error) = flow.release_capacity(consumed) {
        // The stream is already gone; its window no longer matters.
        tracing::trace!(stream_id, error = %error, "Could not release flow-control capacity");
    }
}

async fn forward_body(stream_id: u32, mut body: RecvStream, events: mpsc::Sender<BodyEvent>) {
    let flow = body.flow_control().clone();
    loop {
        let event = match body.data().await {
            Some(Ok(payload)) => BodyEvent::Data {
                stream_id,
                payload,
                end_of_stream: body.is_end_stream(),
                flow: flow.clone(),
            },
            None => BodyEvent::Data {
                stream_id,
                payload: Bytes::new(),
                end_of_stream: true,
                flow: flow.clone(),
            },
            Some(Err(error)) => {
                tracing::debug!(stream_id, error = %error, "Request body stream failed");
                BodyEvent::Reset { stream_id }
            }
        };

        let finished = match &event {
            BodyEvent::Data { end_of_stream, .. } => *end_of_stream,
            BodyEvent::Reset { .. } => true,
        };
        if events.send(event).await.is_err() || finished {
            return;
        }
    }
}

/// Writes machine frames onto the h2 send handles.
#[derive(Default)]
struct FrameWriter {
    responders: HashMap<u32, SendResponse<Bytes>>,
    bodies: HashMap<u32, SendStream<Bytes>>,
}

impl FrameWriter {
    fn forget(&mut self, stream_id: u32) {
        self.responders.remove(&stream_id);
        self.bodies.remove(&stream_id);
    }

    /// Write every queued frame. Stream resets are absorbed and a response h2
    /// refuses to encode is replaced by a 500; I/O and connection-level
    /// failures are transport faults.
    fn flush(&mut self, machine: &mut StreamMachine) -> Result<(), TransportError> {
        while let Some(frame) = machine.poll_frame() {
            let stream_id = frame.stream_id();
            let sent = match frame {
                Frame::Headers {
                    status,
                    headers,
                    end_of_stream,
                    ..
                } => self.send_headers(stream_id, status, headers, end_of_stream),
                Frame::Data {
                    payload,
                    end_of_stream,
                    ..
                } => self.send_data(stream_id, payload, end_of_stream),
            };

            match sent {
                Ok(()) => {}
                Err(error) if error.is_reset() => {
                    tracing::debug!(stream_id, reason = ?error.reason(), "Stream reset while responding");
                    machine.on_reset(stream_id);
                    self.forget(stream_id);
                }
                Err(error) if error.is_io() || error.reason().is_some() => return Err(error.into()),
                Err(error) => {
                    tracing::warn!(stream_id, error = %error, "Response rejected by HTTP/2 codec");
                    machine.on_reset(stream_id);
                    self.fail(stream_id);
                }
            }
        }
        Ok(())
    }

    fn send_headers(
        &mut self,
        stream_id: u32,
        status: http::StatusCode,
        headers: http::HeaderMap,
        end_of_stream: bool,
    ) -> Result<(), h2::Error> {
        let Some(respond) = self.responders.get_mut(&stream_id) else {
            return Ok(());
        };
        let mut response = http::Response::new(());
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        let body = respond.send_response(response, end_of_stream)?;
        self.responders.remove(&stream_id);
        if !end_of_stream {
            self.bodies.insert(stream_id, body);
        }
        Ok(())
    }

    /// Answer `stream_id` with a plain 500, or reset it when the headers have
    /// already gone out.
    fn fail(&mut self, stream_id: u32) {
        if let Some(mut body) = self.bodies.remove(&stream_id) {
            body.send_reset(Reason::INTERNAL_ERROR);
            return;
        }
        let Some(mut respond) = self.responders.remove(&stream_id) else {
            return;
        };

        let (status, headers, payload) = Response::internal_error().into_parts();
        let mut response = http::Response::new(());
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        match respond.send_response(response, false) {
            Ok(mut body) => {
                if body.send_data(payload, true).is_err() {
                    body.send_reset(Reason::INTERNAL_ERROR);
                }
            }
            Err(_) => respond.send_reset(Reason::INTERNAL_ERROR),
        }
    }

    fn send_data(&mut self, stream_id: u32, payload: Bytes, end_of_stream: bool) -> Result<(), h2::Error> {
        let Some(body) = self.bodies.get_mut(&stream_id) else {
            return Ok(());
        };
        body.send_data(payload, end_of_stream)?;
        if end_of_stream {
            self.bodies.remove(&stream_id);
        }
        Ok(())
    }
}
