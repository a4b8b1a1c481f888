//! The room aggregate: roster, phase cursor, and relay items.
//!
//! A [`RoomState`] is the whole stored value for one room code. It is
//! loaded, mutated by the [`RelayEngine`](crate::RelayEngine), and
//! written back as a unit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sketchrelay_protocol::{ChainView, ItemId, Payload, Phase, PlayerName, RoomCode, Step, StepKind};

// ---------------------------------------------------------------------------
// RelayItem
// ---------------------------------------------------------------------------

/// One original prompt and everything derived from it.
///
/// The chain is append-only. It always starts with a `Word` step and then
/// alternates `Drawing`, `Guess`, `Drawing`, …
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayItem {
    pub id: ItemId,
    /// Author of the original prompt.
    pub origin: PlayerName,
    pub chain: Vec<Step>,
}

impl RelayItem {
    /// Starts a chain from a prompt.
    pub fn new(id: ItemId, origin: PlayerName, prompt: Payload) -> Self {
        let first = Step {
            kind: StepKind::Word,
            author: origin.clone(),
            payload: prompt,
        };
        Self {
            id,
            origin,
            chain: vec![first],
        }
    }

    /// The most recent step.
    pub fn last_step(&self) -> Option<&Step> {
        self.chain.last()
    }

    /// Who touched this item last. Used by the anti-self-assignment rule.
    pub fn last_author(&self) -> Option<&PlayerName> {
        self.last_step().map(|step| &step.author)
    }

    /// The kind the next appended step must have.
    pub fn next_kind(&self) -> StepKind {
        self.last_step()
            .map_or(StepKind::Word, |step| step.kind.next())
    }

    /// Returns `true` if the chain starts with a word and alternates
    /// drawing/guess afterwards.
    pub fn is_well_formed(&self) -> bool {
        let mut expected = StepKind::Word;
        for step in &self.chain {
            if step.kind != expected {
                return false;
            }
            expected = expected.next();
        }
        !self.chain.is_empty()
    }

    pub(crate) fn to_chain_view(&self) -> ChainView {
        ChainView {
            item: self.id.clone(),
            origin: self.origin.clone(),
            steps: self.chain.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// Everything stored for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomState {
    pub code: RoomCode,

    /// Bumped on every successful write; versioned writes compare it.
    pub version: u64,

    /// Join order. Index 0 is the host. Players are never removed.
    pub players: Vec<PlayerName>,

    pub phase: Phase,

    /// Completed draw/guess cycles.
    pub round: u32,

    /// Relay items in creation order.
    pub items: Vec<RelayItem>,

    /// Pending payloads for the current phase only.
    pub submissions: BTreeMap<PlayerName, Payload>,

    /// Which item each player works on in the current phase. Players
    /// without an entry sit the phase out.
    pub assignments: BTreeMap<PlayerName, ItemId>,

    /// Sequence number for the next item id.
    pub next_item_seq: u64,
}

impl RoomState {
    /// A fresh, unsaved room in the word phase.
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            version: 0,
            players: Vec::new(),
            phase: Phase::Word,
            round: 0,
            items: Vec::new(),
            submissions: BTreeMap::new(),
            assignments: BTreeMap::new(),
            next_item_seq: 0,
        }
    }

    /// The first player to join.
    pub fn host(&self) -> Option<&PlayerName> {
        self.players.first()
    }

    pub fn has_player(&self, name: &PlayerName) -> bool {
        self.players.contains(name)
    }

    pub fn has_submitted(&self, name: &PlayerName) -> bool {
        self.submissions.contains_key(name)
    }

    pub fn item(&self, id: &ItemId) -> Option<&RelayItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub(crate) fn item_mut(&mut self, id: &ItemId) -> Option<&mut RelayItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    /// The item a player must act on this phase, if any.
    pub fn assigned_item(&self, name: &PlayerName) -> Option<&RelayItem> {
        self.assignments.get(name).and_then(|id| self.item(id))
    }

    /// Players expected to submit before the phase can close.
    ///
    /// Everyone writes a word; only assigned players draw or guess, so a
    /// late joiner never holds the room up.
    pub fn participants(&self) -> impl Iterator<Item = &PlayerName> + '_ {
        let phase = self.phase;
        self.players.iter().filter(move |name| match phase {
            Phase::Word => true,
            Phase::Draw | Phase::Guess => self.assignments.contains_key(*name),
            Phase::Results => false,
        })
    }

    /// Returns `true` when every participant has a pending submission.
    pub fn is_phase_complete(&self) -> bool {
        let mut participants = self.participants().peekable();
        participants.peek().is_some()
            && participants.all(|name| self.submissions.contains_key(name))
    }

    /// Allocates the id for a new item authored by `origin`.
    pub(crate) fn allocate_item_id(&mut self, origin: &PlayerName) -> ItemId {
        let id = ItemId::new(origin, self.next_item_seq);
        self.next_item_seq += 1;
        id
    }

    /// Players with a pending submission this phase, in roster order.
    pub fn submitted(&self) -> Vec<PlayerName> {
        self.players
            .iter()
            .filter(|name| self.submissions.contains_key(*name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PlayerName {
        PlayerName::new(s)
    }

    fn text(s: &str) -> Payload {
        Payload::Text(s.into())
    }

    #[test]
    fn test_new_room_is_empty_word_phase() {
        let state = RoomState::new(RoomCode::new("fox"));
        assert_eq!(state.phase, Phase::Word);
        assert_eq!(state.round, 0);
        assert_eq!(state.version, 0);
        assert!(state.players.is_empty());
        assert!(state.host().is_none());
    }

    #[test]
    fn test_relay_item_starts_with_word() {
        let item = RelayItem::new(ItemId::new(&name("ana"), 0), name("ana"), text("cat"));
        assert_eq!(item.chain.len(), 1);
        assert_eq!(item.chain[0].kind, StepKind::Word);
        assert_eq!(item.last_author(), Some(&name("ana")));
        assert_eq!(item.next_kind(), StepKind::Drawing);
        assert!(item.is_well_formed());
    }

    #[test]
    fn test_relay_item_alternation_check() {
        let mut item = RelayItem::new(ItemId::new(&name("ana"), 0), name("ana"), text("cat"));
        item.chain.push(Step {
            kind: StepKind::Guess,
            author: name("bo"),
            payload: text("dog"),
        });
        assert!(!item.is_well_formed());
    }

    #[test]
    fn test_allocate_item_id_never_reuses() {
        let mut state = RoomState::new(RoomCode::new("fox"));
        let a = state.allocate_item_id(&name("ana"));
        let b = state.allocate_item_id(&name("ana"));
        assert_ne!(a, b);
        assert_eq!(state.next_item_seq, 2);
    }

    #[test]
    fn test_phase_complete_requires_every_participant() {
        let mut state = RoomState::new(RoomCode::new("fox"));
        state.players = vec![name("ana"), name("bo")];
        assert!(!state.is_phase_complete());

        state.submissions.insert(name("ana"), text("cat"));
        assert!(!state.is_phase_complete());

        state.submissions.insert(name("bo"), text("dog"));
        assert!(state.is_phase_complete());
    }

    #[test]
    fn test_unassigned_players_do_not_participate_in_draw() {
        let mut state = RoomState::new(RoomCode::new("fox"));
        state.players = vec![name("ana"), name("bo"), name("cy")];
        state.phase = Phase::Draw;
        state
            .assignments
            .insert(name("ana"), ItemId::new(&name("bo"), 1));
        state
            .assignments
            .insert(name("bo"), ItemId::new(&name("ana"), 0));

        let participants: Vec<_> = state.participants().cloned().collect();
        assert_eq!(participants, vec![name("ana"), name("bo")]);

        state.submissions.insert(name("ana"), Payload::Image(vec![1]));
        state.submissions.insert(name("bo"), Payload::Image(vec![2]));
        assert!(state.is_phase_complete());
    }

    #[test]
    fn test_empty_room_is_never_complete() {
        let state = RoomState::new(RoomCode::new("fox"));
        assert!(!state.is_phase_complete());
    }
}
