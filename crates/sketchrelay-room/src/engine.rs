//! The relay engine: phase state machine, assignment, and chain bookkeeping.
//!
//! The engine never does I/O. Every operation takes the loaded
//! [`RoomState`], mutates it in place, and reports what happened so the
//! caller knows whether the room must be written back. Randomness is
//! injected, which keeps tests deterministic with a seeded RNG.

use std::collections::BTreeMap;

use rand::Rng;
use sketchrelay_protocol::{ItemId, Payload, Phase, PlayerName, Step, SubmitOutcome};

use crate::assign::derange;
use crate::state::RelayItem;
use crate::{RoomConfig, RoomError, RoomState};

/// A player action against one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Join the room, or resume if the name is already on the roster.
    Join { name: PlayerName },
    /// Submit the payload for the current phase.
    Submit { name: PlayerName, payload: Payload },
    /// Jump to the results phase. Host only.
    EndGame { name: PlayerName },
}

/// What an [`Action`] did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// `new_player` is `false` when the name was already on the roster.
    Joined { new_player: bool },
    Submitted(SubmitOutcome),
    /// `changed` is `false` if the game had already ended.
    Ended { changed: bool },
}

impl Effect {
    /// Returns `true` if the room state changed and must be stored.
    pub fn mutated(&self) -> bool {
        match self {
            Self::Joined { new_player } => *new_player,
            Self::Submitted(SubmitOutcome::Accepted { .. }) => true,
            Self::Submitted(SubmitOutcome::Waiting) => false,
            Self::Ended { changed } => *changed,
        }
    }
}

/// Applies player actions to rooms according to a [`RoomConfig`].
#[derive(Debug, Clone, Default)]
pub struct RelayEngine {
    config: RoomConfig,
}

impl RelayEngine {
    pub fn new(config: RoomConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Applies one action. On error the state is left untouched.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        state: &mut RoomState,
        action: Action,
        rng: &mut R,
    ) -> Result<Effect, RoomError> {
        match action {
            Action::Join { name } => self
                .join(state, name)
                .map(|new_player| Effect::Joined { new_player }),
            Action::Submit { name, payload } => self
                .submit(state, &name, payload, rng)
                .map(Effect::Submitted),
            Action::EndGame { name } => self
                .end_game(state, &name)
                .map(|changed| Effect::Ended { changed }),
        }
    }

    /// Adds `name` to the roster. Returns `false` if already present.
    ///
    /// Joining is allowed in any phase. A player who arrives after the
    /// word phase has no item of their own and sits out until an
    /// assignment hands them one.
    pub fn join(&self, state: &mut RoomState, name: PlayerName) -> Result<bool, RoomError> {
        if name.is_blank() {
            return Err(RoomError::Validation("player name is empty".into()));
        }
        if state.has_player(&name) {
            tracing::debug!(room = %state.code, player = %name, "player rejoined");
            return Ok(false);
        }
        if state.players.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(state.code.clone()));
        }

        tracing::info!(
            room = %state.code,
            player = %name,
            phase = %state.phase,
            players = state.players.len() + 1,
            "player joined"
        );
        state.players.push(name);
        Ok(true)
    }

    /// Records a submission and advances the phase if it was the last one.
    ///
    /// Acting out of turn (already submitted, no assignment this phase,
    /// game over) yields [`SubmitOutcome::Waiting`] and changes nothing.
    pub fn submit<R: Rng + ?Sized>(
        &self,
        state: &mut RoomState,
        name: &PlayerName,
        payload: Payload,
        rng: &mut R,
    ) -> Result<SubmitOutcome, RoomError> {
        if payload.is_blank() {
            return Err(RoomError::Validation("submission is empty".into()));
        }
        if !state.has_player(name) {
            return Err(RoomError::NotInRoom(name.clone(), state.code.clone()));
        }
        let Some(kind) = state.phase.step_kind() else {
            return Ok(SubmitOutcome::Waiting);
        };
        if payload.is_image() != kind.is_image() {
            let expected = if kind.is_image() { "an image" } else { "text" };
            return Err(RoomError::Validation(format!(
                "the {} phase expects {expected}",
                state.phase
            )));
        }
        if state.phase != Phase::Word && !state.assignments.contains_key(name) {
            tracing::debug!(room = %state.code, player = %name, "sitting out this phase");
            return Ok(SubmitOutcome::Waiting);
        }
        if state.has_submitted(name) {
            tracing::debug!(room = %state.code, player = %name, "duplicate submission ignored");
            return Ok(SubmitOutcome::Waiting);
        }

        state.submissions.insert(name.clone(), payload.normalized());
        tracing::debug!(
            room = %state.code,
            player = %name,
            submitted = state.submissions.len(),
            "submission recorded"
        );

        let advanced = self.advance(state, rng);
        Ok(SubmitOutcome::Accepted { advanced })
    }

    /// Ends the game. Only the host may do this; pending submissions and
    /// assignments are dropped, chains are kept.
    pub fn end_game(&self, state: &mut RoomState, name: &PlayerName) -> Result<bool, RoomError> {
        if !state.has_player(name) {
            return Err(RoomError::NotInRoom(name.clone(), state.code.clone()));
        }
        if state.host() != Some(name) {
            return Err(RoomError::NotHost(name.clone(), state.code.clone()));
        }
        if state.phase.is_finished() {
            return Ok(false);
        }

        self.finish(state);
        tracing::info!(room = %state.code, round = state.round, "game ended by host");
        Ok(true)
    }

    /// Closes the current phase if every participant has submitted.
    ///
    /// Commits the submissions to their chains, reassigns items, clears
    /// submissions, and moves to the next phase, all at once. Returns
    /// `false` (and changes nothing) if someone is still missing.
    pub fn advance<R: Rng + ?Sized>(&self, state: &mut RoomState, rng: &mut R) -> bool {
        if !state.is_phase_complete() {
            return false;
        }
        let from = state.phase;
        let (Some(kind), Some(mut next)) = (from.step_kind(), from.successor()) else {
            return false;
        };

        let mut submissions = std::mem::take(&mut state.submissions);
        let assignments = std::mem::take(&mut state.assignments);

        if from == Phase::Word {
            let authors = state.players.clone();
            for author in authors {
                if let Some(prompt) = submissions.remove(&author) {
                    let id = state.allocate_item_id(&author);
                    state.items.push(RelayItem::new(id, author, prompt));
                }
            }
        } else {
            for (author, item_id) in assignments {
                let Some(payload) = submissions.remove(&author) else {
                    continue;
                };
                match state.item_mut(&item_id) {
                    Some(item) if item.next_kind() == kind => item.chain.push(Step {
                        kind,
                        author,
                        payload,
                    }),
                    _ => tracing::warn!(
                        room = %state.code,
                        item = %item_id,
                        "assigned item missing or out of step, submission dropped"
                    ),
                }
            }
        }

        if from == Phase::Guess {
            state.round += 1;
            if self
                .config
                .termination
                .should_finish(state.round, state.players.len())
            {
                next = Phase::Results;
            }
        }

        debug_assert!(from.can_transition_to(next));
        state.phase = next;
        if next.is_finished() {
            self.finish(state);
        } else {
            state.assignments = self.assign(state, rng);
        }

        tracing::info!(
            room = %state.code,
            from = %from,
            to = %state.phase,
            round = state.round,
            "phase advanced"
        );
        true
    }

    fn finish(&self, state: &mut RoomState) {
        state.phase = Phase::Results;
        state.submissions.clear();
        state.assignments.clear();
    }

    /// Hands every item to a different player than the one who touched it
    /// last. See [`derange`] for the algorithm.
    fn assign<R: Rng + ?Sized>(&self, state: &RoomState, rng: &mut R) -> BTreeMap<PlayerName, ItemId> {
        let slots: Vec<Option<&ItemId>> = state
            .players
            .iter()
            .map(|player| {
                state
                    .items
                    .iter()
                    .find(|item| item.last_author() == Some(player))
                    .map(|item| &item.id)
            })
            .collect();

        let derangement = derange(state.players.len(), self.config.resample_attempts, rng);
        if derangement.fallback {
            tracing::debug!(room = %state.code, "assignment used rotation fallback");
        }

        state
            .players
            .iter()
            .zip(derangement.targets)
            .filter_map(|(player, slot)| {
                slots
                    .get(slot)
                    .copied()
                    .flatten()
                    .map(|id| (player.clone(), id.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sketchrelay_protocol::{RoomCode, StepKind};

    use super::*;
    use crate::TerminationPolicy;

    fn name(s: &str) -> PlayerName {
        PlayerName::new(s)
    }

    fn text(s: &str) -> Payload {
        Payload::Text(s.into())
    }

    fn image(b: u8) -> Payload {
        Payload::Image(vec![b, b, b])
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn room_with(players: &[&str]) -> RoomState {
        let engine = RelayEngine::default();
        let mut state = RoomState::new(RoomCode::new("fox"));
        for p in players {
            engine.join(&mut state, name(p)).unwrap();
        }
        state
    }

    fn assert_deranged(state: &RoomState) {
        for (player, id) in &state.assignments {
            let item = state.item(id).unwrap();
            assert_ne!(item.last_author(), Some(player), "{player} got own item {id}");
        }
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[test]
    fn test_join_appends_in_order() {
        let state = room_with(&["ana", "bo", "cy"]);
        assert_eq!(state.players, vec![name("ana"), name("bo"), name("cy")]);
        assert_eq!(state.host(), Some(&name("ana")));
    }

    #[test]
    fn test_join_twice_is_noop() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana", "bo"]);

        let added = engine.join(&mut state, name("ana")).unwrap();

        assert!(!added);
        assert_eq!(state.players, vec![name("ana"), name("bo")]);
    }

    #[test]
    fn test_join_blank_name_rejected() {
        let engine = RelayEngine::default();
        let mut state = room_with(&[]);
        let result = engine.join(&mut state, name("   "));
        assert!(matches!(result, Err(RoomError::Validation(_))));
        assert!(state.players.is_empty());
    }

    #[test]
    fn test_join_full_room_rejected() {
        let engine = RelayEngine::new(RoomConfig {
            max_players: 2,
            ..RoomConfig::default()
        });
        let mut state = RoomState::new(RoomCode::new("fox"));
        engine.join(&mut state, name("ana")).unwrap();
        engine.join(&mut state, name("bo")).unwrap();

        let result = engine.join(&mut state, name("cy"));
        assert!(matches!(result, Err(RoomError::RoomFull(_))));
        // Rejoining an existing name is still fine when full.
        assert!(!engine.join(&mut state, name("bo")).unwrap());
    }

    // =====================================================================
    // submit() / advance()
    // =====================================================================

    #[test]
    fn test_partial_submissions_do_not_advance() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana", "bo", "cy"]);
        let mut rng = rng();

        engine.submit(&mut state, &name("ana"), text("cat"), &mut rng).unwrap();
        let outcome = engine.submit(&mut state, &name("bo"), text("dog"), &mut rng).unwrap();

        assert_eq!(outcome, SubmitOutcome::Accepted { advanced: false });
        assert_eq!(state.phase, Phase::Word);
        assert_eq!(state.submissions.len(), 2);
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_last_word_opens_draw_phase_with_derangement() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana", "bo", "cy"]);
        let mut rng = rng();

        for (p, w) in [("ana", "cat"), ("bo", "dog"), ("cy", "fish")] {
            engine.submit(&mut state, &name(p), text(w), &mut rng).unwrap();
        }

        assert_eq!(state.phase, Phase::Draw);
        assert_eq!(state.round, 0);
        assert!(state.submissions.is_empty());
        assert_eq!(state.items.len(), 3);
        assert_eq!(state.assignments.len(), 3);
        assert_deranged(&state);
        for item in &state.items {
            assert_eq!(item.chain[0].kind, StepKind::Word);
            assert_eq!(&item.origin, item.last_author().unwrap());
        }
    }

    #[test]
    fn test_submitted_text_is_trimmed() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana"]);
        engine
            .submit(&mut state, &name("ana"), text("  cat \n"), &mut rng())
            .unwrap();
        assert_eq!(state.items[0].chain[0].payload, text("cat"));
    }

    #[test]
    fn test_blank_submission_rejected_without_change() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana", "bo"]);
        let before = state.clone();

        let result = engine.submit(&mut state, &name("ana"), text("   "), &mut rng());

        assert!(matches!(result, Err(RoomError::Validation(_))));
        assert_eq!(state, before);
    }

    #[test]
    fn test_wrong_payload_kind_rejected() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana", "bo"]);
        let result = engine.submit(&mut state, &name("ana"), image(1), &mut rng());
        assert!(matches!(result, Err(RoomError::Validation(_))));
    }

    #[test]
    fn test_stranger_cannot_submit() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana"]);
        let result = engine.submit(&mut state, &name("zed"), text("cat"), &mut rng());
        assert!(matches!(result, Err(RoomError::NotInRoom(..))));
    }

    #[test]
    fn test_second_submission_waits() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana", "bo"]);
        let mut rng = rng();
        engine.submit(&mut state, &name("ana"), text("cat"), &mut rng).unwrap();

        let outcome = engine.submit(&mut state, &name("ana"), text("cow"), &mut rng).unwrap();

        assert_eq!(outcome, SubmitOutcome::Waiting);
        assert_eq!(state.submissions[&name("ana")], text("cat"));
    }

    #[test]
    fn test_full_cycle_increments_round_once() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana", "bo", "cy"]);
        let mut rng = rng();
        for (i, p) in ["ana", "bo", "cy"].iter().enumerate() {
            engine.submit(&mut state, &name(p), text(&format!("w{i}")), &mut rng).unwrap();
        }
        assert_eq!(state.round, 0);

        for (i, p) in ["ana", "bo", "cy"].iter().enumerate() {
            engine.submit(&mut state, &name(p), image(i as u8 + 1), &mut rng).unwrap();
        }
        assert_eq!(state.phase, Phase::Guess);
        assert_eq!(state.round, 0);
        assert_deranged(&state);

        for (i, p) in ["ana", "bo", "cy"].iter().enumerate() {
            engine.submit(&mut state, &name(p), text(&format!("g{i}")), &mut rng).unwrap();
        }
        assert_eq!(state.phase, Phase::Draw);
        assert_eq!(state.round, 1);
        assert_deranged(&state);
        for item in &state.items {
            assert_eq!(item.chain.len(), 3);
            assert!(item.is_well_formed());
        }
    }

    #[test]
    fn test_single_player_is_assigned_own_item() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["solo"]);
        let mut rng = rng();

        engine.submit(&mut state, &name("solo"), text("moon"), &mut rng).unwrap();
        assert_eq!(state.phase, Phase::Draw);
        assert_eq!(state.assignments[&name("solo")], state.items[0].id);

        engine.submit(&mut state, &name("solo"), image(9), &mut rng).unwrap();
        assert_eq!(state.phase, Phase::Guess);
        engine.submit(&mut state, &name("solo"), text("cheese"), &mut rng).unwrap();
        assert_eq!(state.phase, Phase::Draw);
        assert_eq!(state.round, 1);
    }

    #[test]
    fn test_rotation_fallback_still_deranges() {
        let engine = RelayEngine::new(RoomConfig {
            resample_attempts: 0,
            ..RoomConfig::default()
        });
        let mut state = room_with(&["ana", "bo", "cy", "di"]);
        let mut rng = rng();
        for p in ["ana", "bo", "cy", "di"] {
            engine.submit(&mut state, &name(p), text(p), &mut rng).unwrap();
        }

        // Rotation by one: each player gets the next player's prompt.
        assert_eq!(state.assignments[&name("ana")], state.items[1].id);
        assert_eq!(state.assignments[&name("di")], state.items[0].id);
        assert_deranged(&state);
    }

    #[test]
    fn test_late_joiner_does_not_block_and_eventually_plays() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana", "bo"]);
        let mut rng = rng();
        engine.submit(&mut state, &name("ana"), text("cat"), &mut rng).unwrap();
        engine.submit(&mut state, &name("bo"), text("dog"), &mut rng).unwrap();
        assert_eq!(state.phase, Phase::Draw);

        engine.join(&mut state, name("cy")).unwrap();
        assert!(!state.assignments.contains_key(&name("cy")));
        assert_eq!(
            engine.submit(&mut state, &name("cy"), image(1), &mut rng).unwrap(),
            SubmitOutcome::Waiting
        );

        let mut cy_played = false;
        for _ in 0..40 {
            let acting: Vec<PlayerName> = state.assignments.keys().cloned().collect();
            assert_eq!(acting.len(), 2, "two items, two assignments");
            assert_deranged(&state);
            cy_played |= acting.contains(&name("cy"));
            let payload = |i: u8| match state.phase {
                Phase::Draw => image(i),
                _ => text("guess"),
            };
            let payloads: Vec<Payload> = (0..acting.len() as u8).map(payload).collect();
            for (player, p) in acting.iter().zip(payloads) {
                engine.submit(&mut state, player, p, &mut rng).unwrap();
            }
        }

        assert!(cy_played, "late joiner never got an assignment");
        for item in &state.items {
            assert!(item.is_well_formed());
        }
    }

    #[test]
    fn test_round_limit_moves_to_results() {
        let engine = RelayEngine::new(RoomConfig {
            termination: TerminationPolicy::RoundLimit,
            ..RoomConfig::default()
        });
        let mut state = room_with(&["ana", "bo"]);
        let mut rng = rng();
        for p in ["ana", "bo"] {
            engine.submit(&mut state, &name(p), text(p), &mut rng).unwrap();
        }
        for round in 1..=2u32 {
            for p in ["ana", "bo"] {
                engine.submit(&mut state, &name(p), image(1), &mut rng).unwrap();
            }
            for p in ["ana", "bo"] {
                engine.submit(&mut state, &name(p), text("guess"), &mut rng).unwrap();
            }
            assert_eq!(state.round, round);
        }

        assert_eq!(state.phase, Phase::Results);
        assert!(state.assignments.is_empty());
        for item in &state.items {
            assert_eq!(item.chain.len(), 5);
            assert!(item.is_well_formed());
        }
    }

    #[test]
    fn test_submit_after_results_waits() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana", "bo"]);
        engine.end_game(&mut state, &name("ana")).unwrap();

        let outcome = engine.submit(&mut state, &name("bo"), text("late"), &mut rng()).unwrap();
        assert_eq!(outcome, SubmitOutcome::Waiting);
    }

    // =====================================================================
    // end_game()
    // =====================================================================

    #[test]
    fn test_only_host_can_end_game() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana", "bo"]);

        let result = engine.end_game(&mut state, &name("bo"));
        assert!(matches!(result, Err(RoomError::NotHost(..))));
        assert_eq!(state.phase, Phase::Word);

        assert!(engine.end_game(&mut state, &name("ana")).unwrap());
        assert_eq!(state.phase, Phase::Results);
        assert!(!engine.end_game(&mut state, &name("ana")).unwrap());
    }

    #[test]
    fn test_end_game_drops_pending_submissions() {
        let engine = RelayEngine::default();
        let mut state = room_with(&["ana", "bo"]);
        let mut rng = rng();
        engine.submit(&mut state, &name("ana"), text("cat"), &mut rng).unwrap();
        engine.submit(&mut state, &name("bo"), text("dog"), &mut rng).unwrap();
        let assigned = state.assignments.keys().next().cloned().unwrap();
        engine.submit(&mut state, &assigned, image(1), &mut rng).unwrap();

        engine.end_game(&mut state, &name("ana")).unwrap();

        assert!(state.submissions.is_empty());
        assert!(state.assignments.is_empty());
        assert_eq!(state.items.len(), 2);
        assert!(state.items.iter().all(|item| item.chain.len() == 1));
    }

    // =====================================================================
    // apply()
    // =====================================================================

    #[test]
    fn test_apply_reports_mutation() {
        let engine = RelayEngine::default();
        let mut state = RoomState::new(RoomCode::new("fox"));
        let mut rng = rng();

        let effect = engine
            .apply(&mut state, Action::Join { name: name("ana") }, &mut rng)
            .unwrap();
        assert_eq!(effect, Effect::Joined { new_player: true });
        assert!(effect.mutated());

        let effect = engine
            .apply(&mut state, Action::Join { name: name("ana") }, &mut rng)
            .unwrap();
        assert!(!effect.mutated());

        let effect = engine
            .apply(
                &mut state,
                Action::Submit {
                    name: name("ana"),
                    payload: text("cat"),
                },
                &mut rng,
            )
            .unwrap();
        assert_eq!(
            effect,
            Effect::Submitted(SubmitOutcome::Accepted { advanced: true })
        );

        let effect = engine
            .apply(&mut state, Action::EndGame { name: name("ana") }, &mut rng)
            .unwrap();
        assert_eq!(effect, Effect::Ended { changed: true });
    }
}
