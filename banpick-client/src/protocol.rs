// Wire shapes shared by the backend REST endpoints and the realtime channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::draft::sequence::ChampionId;
use crate::lobby::{Affiliation, LobbyUser};

/// Room configuration as owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    /// Game-client version the champion metadata is keyed by.
    pub version: String,
    pub draft_mode: String,
    pub match_format: String,
    /// Participation mode code; see
    /// [`ParticipationMode`](crate::draft::resolver::ParticipationMode).
    pub player_count: String,
    pub time_limit: String,
}

/// `GET /game/{code}` response. `settings` is nominally always present; a
/// response without it is an application error the caller surfaces.
#[derive(Debug, Clone, Deserialize)]
pub struct GameSnapshot {
    #[serde(default)]
    pub settings: Option<RoomSettings>,
    #[serde(default)]
    pub bans: Vec<Option<ChampionId>>,
    #[serde(default)]
    pub picks: Vec<Option<ChampionId>>,
}

/// `GET /game/{code}/status` response.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub users: Vec<LobbyUser>,
}

/// `POST /game/{code}/join` response. The user id has appeared under three
/// different keys across backend revisions; all are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    user_id: Option<String>,
    user: Option<JoinedUser>,
    id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct JoinedUser {
    id: String,
}

impl JoinResponse {
    /// The joined user's id, wherever the backend put it.
    pub fn user_id(self) -> Option<String> {
        self.user_id
            .or(self.user.map(|u| u.id))
            .or(self.id)
    }
}

/// `POST /create-room` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
}

/// Team/seat payload for `update_team` frames and the REST fallback body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAssignment {
    pub team: Affiliation,
    pub position: i32,
}

/// Outbound realtime frames, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    #[serde(rename_all = "camelCase")]
    UpdateTeam {
        user_id: String,
        team_data: TeamAssignment,
    },
    #[serde(rename_all = "camelCase")]
    UpdateReady { user_id: String, is_ready: bool },
    #[serde(rename_all = "camelCase")]
    StartDraft { user_id: String },
    #[serde(rename_all = "camelCase")]
    Ban {
        user_id: String,
        champion_id: ChampionId,
    },
    #[serde(rename_all = "camelCase")]
    Pick {
        user_id: String,
        champion_id: ChampionId,
    },
    #[serde(rename_all = "camelCase")]
    SubmitResult { user_id: String },
}

/// Envelope for inbound realtime frames. Anything other than a well-formed
/// `status_update` is dropped by the session client.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Frame type carrying a [`StatusUpdate`].
pub const STATUS_UPDATE: &str = "status_update";

/// Room status value signalling that the draft has begun.
pub const STATUS_IN_PROGRESS: &str = "in_progress";

/// Payload of a `status_update` frame. Every field is an independent,
/// optional full replacement of the corresponding client cache.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdate {
    pub users: Option<Vec<LobbyUser>>,
    pub status: Option<String>,
    pub settings: Option<RoomSettings>,
}
