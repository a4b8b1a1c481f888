//! A WebSocket client for the relay server.
//!
//! Used by the integration tests and by anything scripting a game (bots,
//! load tests). One request is in flight at a time; replies are matched
//! to requests by `seq`.

use std::sync::atomic::{AtomicU64, Ordering};

use sketchrelay_protocol::{
    Codec, Envelope, JsonCodec, Payload, PlayerName, Request, Response, RoomCode, RoomView,
    SubmitOutcome,
};
use sketchrelay_room::{PollConfig, poll_until_changed};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::MaybeTlsStream;

use crate::{RelayError, TransportError, WsConnection};

/// A connected client.
pub struct RelayClient {
    conn: WsConnection<MaybeTlsStream<TcpStream>>,
    codec: JsonCodec,
    next_seq: AtomicU64,
    // Held from send to matching reply.
    in_flight: Mutex<()>,
}

impl RelayClient {
    /// Connects to a server, e.g. `ws://127.0.0.1:8080`.
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(TransportError::Handshake)?;
        Ok(Self {
            conn: WsConnection::new(ws),
            codec: JsonCodec,
            next_seq: AtomicU64::new(1),
            in_flight: Mutex::new(()),
        })
    }

    /// Sends one request and waits for its reply.
    ///
    /// Error responses are returned as `Ok(Response::Error { .. })`; the
    /// typed helpers below turn them into [`RelayError::Rejected`].
    pub async fn request(&self, body: Request) -> Result<Response, RelayError> {
        let _in_flight = self.in_flight.lock().await;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.conn
            .send(self.codec.encode(&Envelope::new(seq, body))?)
            .await?;

        loop {
            let data = self
                .conn
                .recv()
                .await?
                .ok_or_else(|| TransportError::Closed("server closed the connection".into()))?;
            let reply: Envelope<Response> = self.codec.decode(&data)?;
            if reply.seq == seq {
                return Ok(reply.body);
            }
            tracing::debug!(expected = seq, got = reply.seq, "skipping stale reply");
        }
    }

    pub async fn join(&self, room: &RoomCode, name: &PlayerName) -> Result<RoomView, RelayError> {
        let response = self
            .request(Request::Join {
                room: room.clone(),
                name: name.clone(),
            })
            .await?;
        expect_room(response)
    }

    pub async fn submit(
        &self,
        room: &RoomCode,
        name: &PlayerName,
        payload: Payload,
    ) -> Result<(SubmitOutcome, RoomView), RelayError> {
        let response = self
            .request(Request::Submit {
                room: room.clone(),
                name: name.clone(),
                payload,
            })
            .await?;
        match response {
            Response::Submitted { outcome, view } => Ok((outcome, view)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn end_game(&self, room: &RoomCode, name: &PlayerName) -> Result<RoomView, RelayError> {
        let response = self
            .request(Request::EndGame {
                room: room.clone(),
                name: name.clone(),
            })
            .await?;
        expect_room(response)
    }

    pub async fn view(&self, room: &RoomCode, name: &PlayerName) -> Result<RoomView, RelayError> {
        let response = self
            .request(Request::View {
                room: room.clone(),
                name: name.clone(),
            })
            .await?;
        expect_room(response)
    }

    /// Polls `View` until the player's phase, round, or task differs from
    /// `last`.
    pub async fn wait_for_turn(
        &self,
        room: &RoomCode,
        name: &PlayerName,
        last: &RoomView,
        config: PollConfig,
    ) -> Result<RoomView, RelayError> {
        poll_until_changed(room, last, config, move || self.view(room, name)).await
    }

    pub async fn close(&self) -> Result<(), RelayError> {
        Ok(self.conn.close().await?)
    }
}

fn expect_room(response: Response) -> Result<RoomView, RelayError> {
    match response {
        Response::Room { view } => Ok(view),
        other => Err(unexpected(other)),
    }
}

fn unexpected(response: Response) -> RelayError {
    match response {
        Response::Error { code, message } => RelayError::Rejected { code, message },
        other => sketchrelay_protocol::ProtocolError::InvalidMessage(format!(
            "unexpected response: {other:?}"
        ))
        .into(),
    }
}

#[cfg(test)]
mod tests {
    use sketchrelay_protocol::ProtocolError;

    use super::*;

    #[test]
    fn test_error_response_becomes_rejected() {
        let err = expect_room(Response::Error {
            code: 404,
            message: "room fox not found".into(),
        })
        .unwrap_err();
        assert!(matches!(err, RelayError::Rejected { code: 404, .. }));
    }

    #[test]
    fn test_wrong_response_kind_is_protocol_error() {
        let view = RoomView {
            code: RoomCode::new("fox"),
            players: vec![],
            host: None,
            phase: Default::default(),
            round: 0,
            submitted: vec![],
            task: sketchrelay_protocol::Task::Waiting,
        };
        let err = expect_room(Response::Submitted {
            outcome: SubmitOutcome::Waiting,
            view,
        })
        .unwrap_err();
        assert!(matches!(
            err,
            RelayError::Protocol(ProtocolError::InvalidMessage(_))
        ));
    }
}
