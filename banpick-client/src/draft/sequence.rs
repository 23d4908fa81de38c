// Canonical tournament draft order and read-only sequence queries.

use serde::{Deserialize, Serialize};

/// Champion identifier as used by the static metadata document (e.g. "Aatrox").
pub type ChampionId = String;

/// The two drafting sides. Spectators exist in the lobby but never act in the
/// draft, so they are not represented here (see [`crate::lobby::Affiliation`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Team {
    Blue,
    Red,
}

/// The action kind of a draft turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Ban,
    Pick,
}

/// One indexed turn in the fixed draft order.
///
/// `position` is the designated seat (1..=5) the turn belongs to; `index` is
/// the turn's offset in [`TOURNAMENT_SEQUENCE`] and doubles as the slot index
/// into the bans/picks arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftStep {
    pub team: Team,
    pub phase: Phase,
    pub position: u8,
    pub index: usize,
}

const fn step(team: Team, phase: Phase, position: u8, index: usize) -> DraftStep {
    DraftStep {
        team,
        phase,
        position,
        index,
    }
}

/// The standard 5v5 tournament draft order.
///
/// The alternation is deliberate snake-draft balancing (the phase-2 pick
/// order reverses the phase-1 pattern) and is kept as a literal table rather
/// than being derived.
pub const TOURNAMENT_SEQUENCE: [DraftStep; 20] = [
    // Phase 1 bans: blue and red alternate, three each.
    step(Team::Blue, Phase::Ban, 1, 0),
    step(Team::Red, Phase::Ban, 1, 1),
    step(Team::Blue, Phase::Ban, 2, 2),
    step(Team::Red, Phase::Ban, 2, 3),
    step(Team::Blue, Phase::Ban, 3, 4),
    step(Team::Red, Phase::Ban, 3, 5),
    // Phase 1 picks: B1, R1, R2, B2, B3, R3.
    step(Team::Blue, Phase::Pick, 1, 6),
    step(Team::Red, Phase::Pick, 1, 7),
    step(Team::Red, Phase::Pick, 2, 8),
    step(Team::Blue, Phase::Pick, 2, 9),
    step(Team::Blue, Phase::Pick, 3, 10),
    step(Team::Red, Phase::Pick, 3, 11),
    // Phase 2 bans: red leads, two each.
    step(Team::Red, Phase::Ban, 4, 12),
    step(Team::Blue, Phase::Ban, 4, 13),
    step(Team::Red, Phase::Ban, 5, 14),
    step(Team::Blue, Phase::Ban, 5, 15),
    // Phase 2 picks: R4, B4, B5, R5.
    step(Team::Red, Phase::Pick, 4, 16),
    step(Team::Blue, Phase::Pick, 4, 17),
    step(Team::Blue, Phase::Pick, 5, 18),
    step(Team::Red, Phase::Pick, 5, 19),
];

/// Look up the step at `index`, or `None` once the sequence is exhausted
/// (the draft-complete terminal condition).
pub fn step_at(index: usize) -> Option<&'static DraftStep> {
    TOURNAMENT_SEQUENCE.get(index)
}

/// A team's ban slots in sequence order, mapped through the shared `bans`
/// array. Unset or out-of-bounds slots map to `None`.
pub fn team_bans(team: Team, bans: &[Option<ChampionId>]) -> Vec<Option<ChampionId>> {
    team_slots(team, Phase::Ban, bans)
}

/// A team's pick slots in sequence order, mapped through the shared `picks`
/// array. Unset or out-of-bounds slots map to `None`.
pub fn team_picks(team: Team, picks: &[Option<ChampionId>]) -> Vec<Option<ChampionId>> {
    team_slots(team, Phase::Pick, picks)
}

fn team_slots(
    team: Team,
    phase: Phase,
    slots: &[Option<ChampionId>],
) -> Vec<Option<ChampionId>> {
    TOURNAMENT_SEQUENCE
        .iter()
        .filter(|s| s.team == team && s.phase == phase)
        .map(|s| slots.get(s.index).cloned().flatten())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_has_twenty_contiguous_indices() {
        assert_eq!(TOURNAMENT_SEQUENCE.len(), 20);
        for (i, step) in TOURNAMENT_SEQUENCE.iter().enumerate() {
            assert_eq!(step.index, i);
        }
    }

    #[test]
    fn phase_one_bans_alternate_blue_first() {
        let expected = [
            (Team::Blue, 1),
            (Team::Red, 1),
            (Team::Blue, 2),
            (Team::Red, 2),
            (Team::Blue, 3),
            (Team::Red, 3),
        ];
        for (i, (team, position)) in expected.iter().enumerate() {
            let step = &TOURNAMENT_SEQUENCE[i];
            assert_eq!(step.team, *team, "index {i}");
            assert_eq!(step.phase, Phase::Ban, "index {i}");
            assert_eq!(step.position, *position, "index {i}");
        }
    }

    #[test]
    fn phase_two_picks_reverse_the_alternation() {
        let expected = [
            (Team::Red, 4),
            (Team::Blue, 4),
            (Team::Blue, 5),
            (Team::Red, 5),
        ];
        for (offset, (team, position)) in expected.iter().enumerate() {
            let step = &TOURNAMENT_SEQUENCE[16 + offset];
            assert_eq!(step.team, *team, "index {}", 16 + offset);
            assert_eq!(step.phase, Phase::Pick, "index {}", 16 + offset);
            assert_eq!(step.position, *position, "index {}", 16 + offset);
        }
    }

    #[test]
    fn step_at_past_the_end_signals_completion() {
        assert!(step_at(19).is_some());
        assert!(step_at(20).is_none());
        assert!(step_at(100).is_none());
    }

    #[test]
    fn blue_bans_map_through_slots_in_index_order() {
        // Blue ban slots sit at indices 0, 2, 4, 13, 15.
        let mut bans: Vec<Option<ChampionId>> = vec![None; 20];
        bans[0] = Some("Aatrox".into());
        bans[4] = Some("Ahri".into());
        bans[15] = Some("Akali".into());

        let blue = team_bans(Team::Blue, &bans);
        assert_eq!(
            blue,
            vec![
                Some("Aatrox".to_string()),
                None,
                Some("Ahri".to_string()),
                None,
                Some("Akali".to_string()),
            ]
        );
    }

    #[test]
    fn short_slot_array_maps_missing_slots_to_none() {
        // Only the first ban is recorded; the array has not grown past it.
        let bans: Vec<Option<ChampionId>> = vec![Some("Zed".into())];
        let blue = team_bans(Team::Blue, &bans);
        assert_eq!(blue.len(), 5);
        assert_eq!(blue[0], Some("Zed".to_string()));
        assert!(blue[1..].iter().all(|slot| slot.is_none()));
    }

    #[test]
    fn red_picks_map_through_slots_in_index_order() {
        // Red pick slots sit at indices 7, 8, 11, 16, 19.
        let mut picks: Vec<Option<ChampionId>> = vec![None; 20];
        picks[7] = Some("Jinx".into());
        picks[19] = Some("Thresh".into());

        let red = team_picks(Team::Red, &picks);
        assert_eq!(red.len(), 5);
        assert_eq!(red[0], Some("Jinx".to_string()));
        assert_eq!(red[4], Some("Thresh".to_string()));
        assert!(red[1..4].iter().all(|slot| slot.is_none()));
    }

    #[test]
    fn team_serializes_to_uppercase_wire_form() {
        assert_eq!(serde_json::to_string(&Team::Blue).unwrap(), "\"BLUE\"");
        assert_eq!(serde_json::to_string(&Phase::Pick).unwrap(), "\"PICK\"");
    }
}
