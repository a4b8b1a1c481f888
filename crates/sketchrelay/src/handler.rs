//! Per-connection handler: decode requests, run them, send replies.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The protocol is strict request/response: every `Envelope<Request>`
//! gets exactly one `Envelope<Response>` with the same `seq`. Nothing is
//! pushed; clients poll with `View`.

use std::sync::Arc;

use sketchrelay_protocol::{Codec, Envelope, Request, Response};
use sketchrelay_room::{RoomError, RoomRegistry, RoomService};
use tokio::net::TcpStream;

use crate::server::ServerState;
use crate::{RelayError, WsConnection};

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<R, C>(
    conn: WsConnection<TcpStream>,
    state: Arc<ServerState<R, C>>,
) -> Result<(), RelayError>
where
    R: RoomRegistry,
    C: Codec,
{
    let id = conn.id();
    tracing::debug!(%id, "handling new connection");

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::info!(%id, "connection idle, closing");
                let _ = conn.close().await;
                break;
            }
        };

        let envelope: Envelope<Request> = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%id, error = %e, "failed to decode request");
                let reply = Envelope::new(
                    0,
                    Response::Error {
                        code: 400,
                        message: format!("malformed request: {e}"),
                    },
                );
                conn.send(state.codec.encode(&reply)?).await?;
                continue;
            }
        };

        tracing::debug!(
            %id,
            seq = envelope.seq,
            room = %envelope.body.room(),
            player = %envelope.body.name(),
            "request"
        );
        let response = dispatch(&state.service, envelope.body).await;
        let reply = Envelope::new(envelope.seq, response);
        conn.send(state.codec.encode(&reply)?).await?;
    }

    Ok(())
}

/// Runs one request against the service and turns the result into a
/// response. Room errors become `Response::Error`; they never close the
/// connection.
pub(crate) async fn dispatch<R: RoomRegistry>(service: &RoomService<R>, request: Request) -> Response {
    let result = match request {
        Request::Join { room, name } => service
            .join(&room, &name)
            .await
            .map(|view| Response::Room { view }),
        Request::Submit {
            room,
            name,
            payload,
        } => service
            .submit(&room, &name, payload)
            .await
            .map(|(outcome, view)| Response::Submitted { outcome, view }),
        Request::EndGame { room, name } => service
            .end_game(&room, &name)
            .await
            .map(|view| Response::Room { view }),
        Request::View { room, name } => service
            .view(&room, &name)
            .await
            .map(|view| Response::Room { view }),
    };

    result.unwrap_or_else(|e| {
        let code = status_code(&e);
        if code >= 500 {
            tracing::error!(error = %e, "request failed");
        } else {
            tracing::debug!(code, error = %e, "request rejected");
        }
        Response::Error {
            code,
            message: e.to_string(),
        }
    })
}

/// HTTP-style status for a room error.
pub(crate) fn status_code(err: &RoomError) -> u16 {
    match err {
        RoomError::Validation(_) => 400,
        RoomError::NotHost(..) => 403,
        RoomError::NotFound(_) | RoomError::NotInRoom(..) => 404,
        RoomError::PollTimeout(_) => 408,
        RoomError::RaceLoss(_) | RoomError::RoomFull(_) => 409,
        RoomError::Storage(_) => 500,
    }
}
