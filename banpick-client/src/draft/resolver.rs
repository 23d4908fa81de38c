// Turn resolution: may this actor act on the current step?

use serde::{Deserialize, Serialize};

use super::sequence::{DraftStep, Phase, Team};

/// The seat the local actor occupies in the draft. Absent entirely (an
/// `Option<PlayerInfo>` at the call site) until the player has joined a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub team: Team,
    pub position: u8,
}

/// How many people drive the draft, as configured per room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipationMode {
    /// A single operator performs every step (casual/unattended drafting).
    Solo,
    /// One representative per team acts for all of that team's steps.
    Representative,
    /// Each of the five seats per team is restricted to its designated turns.
    Team,
}

impl ParticipationMode {
    /// Parse the backend's `playerCount` settings code. Unknown codes yield
    /// `None`, which callers must treat as "may not act".
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "solo" => Some(ParticipationMode::Solo),
            "representative" => Some(ParticipationMode::Representative),
            "team" => Some(ParticipationMode::Team),
            _ => None,
        }
    }
}

/// Whether `actor` may perform `step` under `mode`.
///
/// This is advisory gating for the local view; the backend remains the
/// authority on whether an action actually commits.
pub fn can_act(step: &DraftStep, actor: &PlayerInfo, mode: ParticipationMode) -> bool {
    match mode {
        ParticipationMode::Solo => true,
        ParticipationMode::Representative => actor.team == step.team,
        ParticipationMode::Team => match step.phase {
            // Only the team's first seat may ban (designated-captain rule).
            Phase::Ban => actor.team == step.team && actor.position == 1,
            Phase::Pick => actor.team == step.team && actor.position == step.position,
        },
    }
}

/// [`can_act`] with a raw mode code. Unknown codes fail closed.
pub fn can_act_code(step: &DraftStep, actor: &PlayerInfo, code: &str) -> bool {
    match ParticipationMode::from_code(code) {
        Some(mode) => can_act(step, actor, mode),
        None => false,
    }
}
