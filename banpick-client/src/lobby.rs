// Lobby membership cache: seats, ready state, and the start gate.

use serde::{Deserialize, Serialize};

use crate::draft::sequence::Team;

/// A participant's affiliation in the lobby. Spectators take part in the
/// room but never act in the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Affiliation {
    Blue,
    Red,
    Spectator,
}

impl Affiliation {
    /// The drafting side, if this affiliation is one.
    pub fn side(self) -> Option<Team> {
        match self {
            Affiliation::Blue => Some(Team::Blue),
            Affiliation::Red => Some(Team::Red),
            Affiliation::Spectator => None,
        }
    }

    pub fn is_player(self) -> bool {
        self.side().is_some()
    }
}

/// A lobby member as broadcast by the backend.
///
/// `position` is the seat within the team, or -1 for spectators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyUser {
    pub id: String,
    pub nickname: String,
    pub team: Affiliation,
    pub position: i32,
    pub is_ready: bool,
    pub is_host: bool,
}

/// Client-side cache of lobby membership.
///
/// The backend owns the member list; every status broadcast replaces the
/// cached mapping in full. There is deliberately no partial-merge path.
#[derive(Debug, Clone, Default)]
pub struct LobbyState {
    pub game_code: String,
    pub users: Vec<LobbyUser>,
}

impl LobbyState {
    pub fn new(game_code: impl Into<String>) -> Self {
        LobbyState {
            game_code: game_code.into(),
            users: Vec::new(),
        }
    }

    /// Replace the cached membership wholesale. Users absent from the new
    /// broadcast are gone.
    pub fn replace_users(&mut self, users: Vec<LobbyUser>) {
        self.users = users;
    }

    pub fn user(&self, id: &str) -> Option<&LobbyUser> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn team_members(&self, side: Team) -> Vec<&LobbyUser> {
        self.users
            .iter()
            .filter(|u| u.team.side() == Some(side))
            .collect()
    }

    /// Host-side start gate: exactly one seated player per side and every
    /// seated player ready. The backend re-validates on `start_draft`.
    pub fn can_start_draft(&self) -> bool {
        let blue = self.team_members(Team::Blue);
        let red = self.team_members(Team::Red);
        blue.len() == 1
            && red.len() == 1
            && blue.iter().chain(red.iter()).all(|u| u.is_ready)
    }

    /// A ready player may not change seats until they un-ready.
    pub fn can_change_seat(&self, id: &str) -> bool {
        self.user(id).is_some_and(|u| !u.is_ready)
    }
}
