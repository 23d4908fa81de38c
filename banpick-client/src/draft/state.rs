// Draft state: ban/pick slot arrays and the monotonic turn pointer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::sequence::{self, ChampionId, DraftStep, Phase};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("the draft is complete; no further selections are accepted")]
    Complete,

    #[error("champion `{0}` has already been banned or picked")]
    ChampionTaken(ChampionId),
}

/// Local draft state.
///
/// The backend owns the committed draft; this is a cache that is either
/// advanced optimistically through [`apply_selection`](Self::apply_selection)
/// or replaced wholesale from a snapshot. Slots are indexed by
/// [`DraftStep::index`]; a slot is `None` until its step resolves and is
/// never cleared except by a full snapshot sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftState {
    pub bans: Vec<Option<ChampionId>>,
    pub picks: Vec<Option<ChampionId>>,
    current_step: usize,
}

impl DraftState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The step the draft is currently waiting on, or `None` once complete.
    pub fn current_step(&self) -> Option<&'static DraftStep> {
        sequence::step_at(self.current_step)
    }

    /// The raw turn pointer (equals the number of resolved steps).
    pub fn step_index(&self) -> usize {
        self.current_step
    }

    pub fn is_complete(&self) -> bool {
        self.current_step >= sequence::TOURNAMENT_SEQUENCE.len()
    }

    /// Whether `champion` already occupies any ban or pick slot. No champion
    /// may be selected twice across the whole draft.
    pub fn is_champion_taken(&self, champion: &str) -> bool {
        self.bans
            .iter()
            .chain(self.picks.iter())
            .any(|slot| slot.as_deref() == Some(champion))
    }

    /// Apply a selection to the current step and advance the pointer by one.
    ///
    /// A ban step writes only the bans array, a pick step only the picks
    /// array. Selections after completion and duplicate champions are
    /// rejected without mutating anything; uniqueness gating belongs to the
    /// caller, but a violation must never reach committed state.
    pub fn apply_selection(
        &mut self,
        champion: ChampionId,
    ) -> Result<&'static DraftStep, DraftError> {
        let step = self.current_step().ok_or(DraftError::Complete)?;
        if self.is_champion_taken(&champion) {
            return Err(DraftError::ChampionTaken(champion));
        }

        match step.phase {
            Phase::Ban => set_slot(&mut self.bans, step.index, champion),
            Phase::Pick => set_slot(&mut self.picks, step.index, champion),
        }
        self.current_step += 1;
        Ok(step)
    }

    /// Replace both slot arrays from an authoritative backend snapshot and
    /// re-derive the turn pointer as the first step whose slot is unset.
    pub fn sync_snapshot(
        &mut self,
        bans: Vec<Option<ChampionId>>,
        picks: Vec<Option<ChampionId>>,
    ) {
        self.bans = bans;
        self.picks = picks;
        self.current_step = self.resume_pointer();
    }

    fn resume_pointer(&self) -> usize {
        sequence::TOURNAMENT_SEQUENCE
            .iter()
            .position(|step| self.slot(step).is_none())
            .unwrap_or(sequence::TOURNAMENT_SEQUENCE.len())
    }

    fn slot(&self, step: &DraftStep) -> Option<&ChampionId> {
        let slots = match step.phase {
            Phase::Ban => &self.bans,
            Phase::Pick => &self.picks,
        };
        slots.get(step.index).and_then(|s| s.as_ref())
    }
}

/// Write `value` at `index`, growing the array with empty slots as needed.
fn set_slot(slots: &mut Vec<Option<ChampionId>>, index: usize, value: ChampionId) {
    if slots.len() <= index {
        slots.resize(index + 1, None);
    }
    slots[index] = Some(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::sequence::{Team, TOURNAMENT_SEQUENCE};

    #[test]
    fn new_state_starts_at_step_zero() {
        let state = DraftState::new();
        assert_eq!(state.step_index(), 0);
        assert!(!state.is_complete());
        let step = state.current_step().unwrap();
        assert_eq!(step.team, Team::Blue);
        assert_eq!(step.phase, Phase::Ban);
    }

    #[test]
    fn ban_step_writes_bans_and_leaves_picks_untouched() {
        let mut state = DraftState::new();
        let picks_before = state.picks.clone();

        let step = state.apply_selection("Aatrox".into()).unwrap();
        assert_eq!(step.index, 0);
        assert_eq!(step.phase, Phase::Ban);
        assert_eq!(state.bans[0].as_deref(), Some("Aatrox"));
        assert_eq!(state.picks, picks_before);
        assert_eq!(state.step_index(), 1);
    }

    #[test]
    fn pick_step_writes_picks_and_leaves_bans_untouched() {
        let mut state = DraftState::new();
        // Resolve the six phase-1 bans to reach the first pick step.
        for champ in ["A", "B", "C", "D", "E", "F"] {
            state.apply_selection(champ.into()).unwrap();
        }
        let bans_before = state.bans.clone();

        let step = state.apply_selection("Ahri".into()).unwrap();
        assert_eq!(step.index, 6);
        assert_eq!(step.phase, Phase::Pick);
        assert_eq!(state.picks[6].as_deref(), Some("Ahri"));
        assert_eq!(state.bans, bans_before);
    }

    #[test]
    fn pointer_advances_by_exactly_one_per_selection() {
        let mut state = DraftState::new();
        for i in 0..TOURNAMENT_SEQUENCE.len() {
            assert_eq!(state.step_index(), i);
            state.apply_selection(format!("Champ{i}")).unwrap();
        }
        assert!(state.is_complete());
        assert!(state.current_step().is_none());
    }

    #[test]
    fn selections_after_completion_are_rejected() {
        let mut state = DraftState::new();
        for i in 0..TOURNAMENT_SEQUENCE.len() {
            state.apply_selection(format!("Champ{i}")).unwrap();
        }
        assert_eq!(
            state.apply_selection("Extra".into()),
            Err(DraftError::Complete)
        );
        assert_eq!(state.step_index(), TOURNAMENT_SEQUENCE.len());
    }

    #[test]
    fn duplicate_champion_is_rejected_without_mutation() {
        let mut state = DraftState::new();
        state.apply_selection("Zed".into()).unwrap();

        let err = state.apply_selection("Zed".into()).unwrap_err();
        assert_eq!(err, DraftError::ChampionTaken("Zed".into()));
        assert_eq!(state.step_index(), 1);
    }

    #[test]
    fn duplicate_check_spans_bans_and_picks() {
        let mut state = DraftState::new();
        for champ in ["A", "B", "C", "D", "E", "F"] {
            state.apply_selection(champ.into()).unwrap();
        }
        // Step 6 is a pick; a champion banned earlier stays unavailable.
        assert!(state.is_champion_taken("A"));
        assert!(state.apply_selection("A".into()).is_err());
        assert!(!state.is_champion_taken("G"));
    }

    #[test]
    fn snapshot_sync_replaces_state_and_resumes_pointer() {
        let mut state = DraftState::new();
        state.apply_selection("Old".into()).unwrap();

        // Backend snapshot: the six phase-1 bans and the first pick resolved.
        let mut bans: Vec<Option<ChampionId>> = vec![None; 6];
        for (i, slot) in bans.iter_mut().enumerate() {
            *slot = Some(format!("Ban{i}"));
        }
        let mut picks: Vec<Option<ChampionId>> = vec![None; 7];
        picks[6] = Some("Ahri".into());

        state.sync_snapshot(bans, picks);
        assert_eq!(state.step_index(), 7);
        assert!(!state.is_champion_taken("Old"));
        assert!(state.is_champion_taken("Ban3"));
        assert_eq!(state.current_step().unwrap().index, 7);
    }

    #[test]
    fn snapshot_sync_of_full_draft_is_terminal() {
        let mut state = DraftState::new();
        let mut bans: Vec<Option<ChampionId>> = vec![None; 20];
        let mut picks: Vec<Option<ChampionId>> = vec![None; 20];
        for step in &TOURNAMENT_SEQUENCE {
            let slots = match step.phase {
                Phase::Ban => &mut bans,
                Phase::Pick => &mut picks,
            };
            slots[step.index] = Some(format!("Champ{}", step.index));
        }
        state.sync_snapshot(bans, picks);
        assert!(state.is_complete());
    }

    #[test]
    fn empty_snapshot_resets_to_the_start() {
        let mut state = DraftState::new();
        state.apply_selection("Zed".into()).unwrap();
        state.sync_snapshot(Vec::new(), Vec::new());
        assert_eq!(state.step_index(), 0);
        assert!(state.bans.is_empty());
    }
}
