//! Per-player views of a room.

use sketchrelay_protocol::{Phase, PlayerName, RoomView, Task};

use crate::{RoomError, RoomState};

impl RoomState {
    /// Builds what `name` sees right now.
    pub fn view_for(&self, name: &PlayerName) -> Result<RoomView, RoomError> {
        if !self.has_player(name) {
            return Err(RoomError::NotInRoom(name.clone(), self.code.clone()));
        }

        Ok(RoomView {
            code: self.code.clone(),
            players: self.players.clone(),
            host: self.host().cloned(),
            phase: self.phase,
            round: self.round,
            submitted: self.submitted(),
            task: self.task_for(name),
        })
    }

    fn task_for(&self, name: &PlayerName) -> Task {
        if self.phase == Phase::Results {
            let chains = self.items.iter().map(|item| item.to_chain_view()).collect();
            return Task::Results { chains };
        }
        if self.has_submitted(name) {
            return Task::Waiting;
        }
        if self.phase == Phase::Word {
            return Task::SubmitWord;
        }

        let Some(item) = self.assigned_item(name) else {
            return Task::Waiting;
        };
        let Some(last) = item.last_step() else {
            return Task::Waiting;
        };
        match (self.phase, &last.payload) {
            (Phase::Draw, payload) => Task::Draw {
                item: item.id.clone(),
                prompt: payload.as_text().unwrap_or_default().to_string(),
            },
            (Phase::Guess, payload) => Task::Guess {
                item: item.id.clone(),
                drawing: payload.as_image().unwrap_or_default().to_vec(),
            },
            _ => Task::Waiting,
        }
    }
}
