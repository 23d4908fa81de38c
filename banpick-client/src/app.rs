// Application event loop: owns the lobby/draft state and the realtime
// session, dispatches status broadcasts, and maps user commands to actions.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::champions::{self, ChampionCatalog};
use crate::draft::resolver::{self, ParticipationMode, PlayerInfo};
use crate::draft::sequence::Phase;
use crate::draft::state::DraftState;
use crate::lobby::{Affiliation, LobbyState};
use crate::protocol::{
    ClientAction, RoomSettings, StatusUpdate, TeamAssignment, STATUS_IN_PROGRESS,
};
use crate::realtime::{SessionClient, SessionError, SessionEvent};

/// Which screen the participant is conceptually on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStage {
    Lobby,
    Draft,
    Complete,
}

/// Commands from the local participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    JoinTeam { team: Affiliation, position: i32 },
    Ready,
    StartDraft,
    Select { champion: String },
    SubmitResult,
    Quit,
}

/// Parse one input line into a command.
///
/// Grammar: `team blue|red <seat>`, `spectate`, `ready`, `start`,
/// `select <ChampionId>`, `submit`, `quit`.
pub fn parse_command(line: &str) -> Option<UserCommand> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "team" => {
            let team = match parts.next()? {
                "blue" => Affiliation::Blue,
                "red" => Affiliation::Red,
                _ => return None,
            };
            let position: i32 = parts.next()?.parse().ok()?;
            Some(UserCommand::JoinTeam { team, position })
        }
        "spectate" => Some(UserCommand::JoinTeam {
            team: Affiliation::Spectator,
            position: -1,
        }),
        "ready" => Some(UserCommand::Ready),
        "start" => Some(UserCommand::StartDraft),
        "select" => Some(UserCommand::Select {
            champion: parts.next()?.to_string(),
        }),
        "submit" => Some(UserCommand::SubmitResult),
        "quit" | "q" => Some(UserCommand::Quit),
        _ => None,
    }
}

/// All client-side state for one room, owned by the event loop.
pub struct AppState {
    pub user_id: String,
    pub lobby: LobbyState,
    pub draft: DraftState,
    pub settings: Option<RoomSettings>,
    pub player: Option<PlayerInfo>,
    pub catalog: Option<ChampionCatalog>,
    pub stage: ViewStage,
    pub language: String,
}

impl AppState {
    pub fn new(game_code: impl Into<String>, user_id: impl Into<String>, language: impl Into<String>) -> Self {
        AppState {
            user_id: user_id.into(),
            lobby: LobbyState::new(game_code),
            draft: DraftState::new(),
            settings: None,
            player: None,
            catalog: None,
            stage: ViewStage::Lobby,
            language: language.into(),
        }
    }

    pub fn me(&self) -> Option<&crate::lobby::LobbyUser> {
        self.lobby.user(&self.user_id)
    }

    /// Apply one status broadcast. Returns whether the room just moved into
    /// the draft.
    pub fn apply_status_update(&mut self, update: StatusUpdate) -> bool {
        if let Some(users) = update.users {
            self.lobby.replace_users(users);
            self.refresh_player();
        }
        if let Some(settings) = update.settings {
            self.settings = Some(settings);
        }
        update.status.as_deref() == Some(STATUS_IN_PROGRESS) && self.stage == ViewStage::Lobby
    }

    /// Re-derive the local draft seat from the replaced lobby mapping.
    fn refresh_player(&mut self) {
        self.player = self.me().and_then(|user| {
            let team = user.team.side()?;
            let position = u8::try_from(user.position).ok()?;
            Some(PlayerInfo { team, position })
        });
    }

    fn mode_code(&self) -> Option<&str> {
        self.settings.as_ref().map(|s| s.player_count.as_str())
    }
}

/// Gate a selection and build the outbound frame for it, or explain why the
/// selection is not allowed right now.
pub fn gate_selection(state: &AppState, champion: &str) -> Result<ClientAction, String> {
    if state.stage != ViewStage::Draft {
        return Err("no draft in progress".into());
    }
    let step = state
        .draft
        .current_step()
        .ok_or_else(|| "the draft is already complete".to_string())?;

    let code = state.mode_code().ok_or_else(|| "room settings unknown".to_string())?;
    let allowed = match ParticipationMode::from_code(code) {
        Some(ParticipationMode::Solo) => true,
        Some(mode) => state
            .player
            .as_ref()
            .is_some_and(|player| resolver::can_act(step, player, mode)),
        None => false,
    };
    if !allowed {
        return Err(format!(
            "it is not your turn (step {}: {:?} {:?} seat {})",
            step.index, step.team, step.phase, step.position
        ));
    }

    if let Some(catalog) = &state.catalog {
        if !catalog.is_valid(champion) {
            return Err(format!("`{champion}` is not a known champion"));
        }
    }
    if state.draft.is_champion_taken(champion) {
        return Err(format!("`{champion}` has already been banned or picked"));
    }

    let action = match step.phase {
        Phase::Ban => ClientAction::Ban {
            user_id: state.user_id.clone(),
            champion_id: champion.to_string(),
        },
        Phase::Pick => ClientAction::Pick {
            user_id: state.user_id.clone(),
            champion_id: champion.to_string(),
        },
    };
    Ok(action)
}

/// Run the main event loop until the participant quits or the command
/// channel closes.
///
/// Listens with `tokio::select!` on:
/// 1. Session events (status broadcasts, reconnect scheduling)
/// 2. User commands
/// 3. The watchdog interval backing the session's reconnect timers
pub async fn run(
    mut session: SessionClient,
    api: ApiClient,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut state: AppState,
    watchdog_interval: Duration,
) -> anyhow::Result<()> {
    info!("application event loop started");

    let mut watchdog = tokio::time::interval(watchdog_interval);
    // The first tick completes immediately; consume it so the first real
    // check happens after one full interval.
    watchdog.tick().await;

    loop {
        tokio::select! {
            event = session.recv() => {
                match event {
                    Ok(SessionEvent::StatusUpdate(update)) => {
                        if state.apply_status_update(update) {
                            enter_draft(&mut state, &api).await;
                        }
                    }
                    Ok(SessionEvent::RetryDue) => {
                        match session.reconnect_now().await {
                            Ok(()) => {}
                            Err(SessionError::RetriesExhausted(n)) => {
                                error!(
                                    attempts = n,
                                    "realtime connection lost; falling back to REST only"
                                );
                            }
                            Err(e) => warn!(error = %e, "reconnect attempt failed"),
                        }
                    }
                    Ok(SessionEvent::Closed) => {
                        info!("server ended the realtime session");
                    }
                    Err(SessionError::RetriesExhausted(n)) => {
                        error!(
                            attempts = n,
                            "realtime connection lost; falling back to REST only"
                        );
                    }
                    Err(e) => warn!(error = %e, "session error"),
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) | None => {
                        info!("quit requested, shutting down");
                        break;
                    }
                    Some(cmd) => handle_command(&mut state, &mut session, &api, cmd).await,
                }
            }

            _ = watchdog.tick() => {
                if let Err(e) = session.maintain().await {
                    error!(error = %e, "watchdog reconnect gave up");
                }
            }
        }
    }

    session.shutdown().await;
    info!("application event loop exiting");
    Ok(())
}

/// Fetch the authoritative room snapshot and champion catalog when the
/// status broadcast moves the room into the draft.
async fn enter_draft(state: &mut AppState, api: &ApiClient) {
    info!("draft starting");
    match api.game(&state.lobby.game_code).await {
        Ok(snapshot) => {
            if let Some(settings) = snapshot.settings {
                state.settings = Some(settings);
            }
            state.draft.sync_snapshot(snapshot.bans, snapshot.picks);
        }
        Err(e) => {
            // The draft can proceed on broadcasts alone; the snapshot is a
            // consistency refresh.
            warn!(error = %e, "failed to fetch the room snapshot");
        }
    }

    if state.catalog.is_none() {
        if let Some(version) = state.settings.as_ref().map(|s| s.version.clone()) {
            match champions::fetch(api.http(), &version, &state.language).await {
                Ok(catalog) => {
                    info!(champions = catalog.len(), %version, "champion catalog loaded");
                    state.catalog = Some(catalog);
                }
                Err(e) => {
                    warn!(error = %e, "failed to fetch champion metadata; skipping validity checks");
                }
            }
        }
    }

    state.stage = ViewStage::Draft;
}

async fn handle_command(
    state: &mut AppState,
    session: &mut SessionClient,
    api: &ApiClient,
    cmd: UserCommand,
) {
    match cmd {
        UserCommand::JoinTeam { team, position } => {
            if state.me().is_some() && !state.lobby.can_change_seat(&state.user_id) {
                warn!("cannot change team while ready");
                return;
            }
            let assignment = TeamAssignment { team, position };
            let action = ClientAction::UpdateTeam {
                user_id: state.user_id.clone(),
                team_data: assignment.clone(),
            };
            if !session.send(&action).await {
                // Fall back to the REST path.
                if let Err(e) = api
                    .update_team(&state.lobby.game_code, &state.user_id, &assignment)
                    .await
                {
                    error!(error = %e, "failed to update team");
                }
            }
        }

        UserCommand::Ready => {
            let is_ready = !state.me().is_some_and(|u| u.is_ready);
            let action = ClientAction::UpdateReady {
                user_id: state.user_id.clone(),
                is_ready,
            };
            if !session.send(&action).await {
                if let Err(e) = api
                    .update_ready(&state.lobby.game_code, &state.user_id, is_ready)
                    .await
                {
                    error!(error = %e, "failed to update ready status");
                }
            }
        }

        UserCommand::StartDraft => {
            if !state.me().is_some_and(|u| u.is_host) {
                warn!("only the host may start the draft");
                return;
            }
            if !state.lobby.can_start_draft() {
                warn!("both teams must be seated and ready");
                return;
            }
            let action = ClientAction::StartDraft {
                user_id: state.user_id.clone(),
            };
            if !session.send(&action).await {
                error!("failed to start the draft; check the connection");
            }
        }

        UserCommand::Select { champion } => {
            let action = match gate_selection(state, &champion) {
                Ok(action) => action,
                Err(reason) => {
                    warn!(%champion, %reason, "selection rejected");
                    return;
                }
            };
            if !session.send(&action).await {
                warn!(%champion, "selection not delivered; try again");
                return;
            }
            // Optimistic local apply; the next broadcast is authoritative.
            match state.draft.apply_selection(champion.clone()) {
                Ok(step) => {
                    info!(
                        index = step.index,
                        team = ?step.team,
                        phase = ?step.phase,
                        %champion,
                        "selection applied"
                    );
                    if state.draft.is_complete() {
                        info!("draft complete");
                        state.stage = ViewStage::Complete;
                    }
                }
                Err(e) => warn!(error = %e, "local state rejected the selection"),
            }
        }

        UserCommand::SubmitResult => {
            if state.stage != ViewStage::Complete {
                warn!("nothing to submit before the draft is complete");
                return;
            }
            let action = ClientAction::SubmitResult {
                user_id: state.user_id.clone(),
            };
            if !session.send(&action).await {
                warn!("result submission not delivered");
            }
        }

        // Quit terminates the run loop before reaching here.
        UserCommand::Quit => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::LobbyUser;

    fn lobby_user(id: &str, team: Affiliation, position: i32) -> LobbyUser {
        LobbyUser {
            id: id.to_string(),
            nickname: id.to_string(),
            team,
            position,
            is_ready: false,
            is_host: false,
        }
    }

    fn settings(player_count: &str) -> RoomSettings {
        RoomSettings {
            version: "14.1.1".into(),
            draft_mode: "tournament".into(),
            match_format: "bo1".into(),
            player_count: player_count.into(),
            time_limit: "none".into(),
        }
    }

    fn draft_ready_state(player_count: &str) -> AppState {
        let mut state = AppState::new("abc123", "u1", "en_US");
        state.settings = Some(settings(player_count));
        state.stage = ViewStage::Draft;
        state
    }

    #[test]
    fn parse_command_grammar() {
        assert_eq!(
            parse_command("team blue 1"),
            Some(UserCommand::JoinTeam {
                team: Affiliation::Blue,
                position: 1
            })
        );
        assert_eq!(
            parse_command("spectate"),
            Some(UserCommand::JoinTeam {
                team: Affiliation::Spectator,
                position: -1
            })
        );
        assert_eq!(parse_command("ready"), Some(UserCommand::Ready));
        assert_eq!(parse_command("start"), Some(UserCommand::StartDraft));
        assert_eq!(
            parse_command("select Aatrox"),
            Some(UserCommand::Select {
                champion: "Aatrox".into()
            })
        );
        assert_eq!(parse_command("q"), Some(UserCommand::Quit));
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("team green 1"), None);
        assert_eq!(parse_command("team blue one"), None);
        assert_eq!(parse_command("select"), None);
    }

    #[test]
    fn status_update_replaces_users_and_derives_the_seat() {
        let mut state = AppState::new("abc123", "u1", "en_US");
        let update = StatusUpdate {
            users: Some(vec![
                lobby_user("u1", Affiliation::Blue, 1),
                lobby_user("u2", Affiliation::Red, 1),
            ]),
            status: None,
            settings: None,
        };
        assert!(!state.apply_status_update(update));
        assert_eq!(
            state.player,
            Some(PlayerInfo {
                team: crate::draft::sequence::Team::Blue,
                position: 1
            })
        );

        // Moving to spectator clears the seat.
        let update = StatusUpdate {
            users: Some(vec![lobby_user("u1", Affiliation::Spectator, -1)]),
            status: None,
            settings: None,
        };
        state.apply_status_update(update);
        assert_eq!(state.player, None);
    }

    #[test]
    fn in_progress_status_triggers_the_draft_transition_once() {
        let mut state = AppState::new("abc123", "u1", "en_US");
        let update = StatusUpdate {
            users: None,
            status: Some(STATUS_IN_PROGRESS.to_string()),
            settings: Some(settings("solo")),
        };
        assert!(state.apply_status_update(update));

        state.stage = ViewStage::Draft;
        let update = StatusUpdate {
            users: None,
            status: Some(STATUS_IN_PROGRESS.to_string()),
            settings: None,
        };
        assert!(!state.apply_status_update(update));
    }

    #[test]
    fn solo_mode_gates_only_on_draft_progress() {
        let mut state = draft_ready_state("solo");
        let action = gate_selection(&state, "Aatrox").unwrap();
        assert!(matches!(action, ClientAction::Ban { .. }));

        state.draft.apply_selection("Aatrox".into()).unwrap();
        let err = gate_selection(&state, "Aatrox").unwrap_err();
        assert!(err.contains("already been banned"));
    }

    #[test]
    fn representative_mode_requires_the_acting_team_seat() {
        let mut state = draft_ready_state("representative");
        // Step 0 is a blue ban; a red representative may not act.
        state.player = Some(PlayerInfo {
            team: crate::draft::sequence::Team::Red,
            position: 1,
        });
        assert!(gate_selection(&state, "Aatrox").is_err());

        state.player = Some(PlayerInfo {
            team: crate::draft::sequence::Team::Blue,
            position: 1,
        });
        assert!(gate_selection(&state, "Aatrox").is_ok());
    }

    #[test]
    fn unseated_players_cannot_act_outside_solo() {
        let state = draft_ready_state("representative");
        assert!(gate_selection(&state, "Aatrox").is_err());
    }

    #[test]
    fn unknown_mode_codes_fail_closed_in_gating() {
        let mut state = draft_ready_state("tournament");
        state.player = Some(PlayerInfo {
            team: crate::draft::sequence::Team::Blue,
            position: 1,
        });
        assert!(gate_selection(&state, "Aatrox").is_err());
    }

    #[test]
    fn gating_respects_the_champion_catalog() {
        use crate::champions::{ChampionCatalog, ChampionDocument};

        let doc: ChampionDocument = serde_json::from_str(
            r#"{
                "type": "champion", "format": "f", "version": "14.1.1",
                "data": {
                    "Aatrox": {
                        "id": "Aatrox", "key": "266", "name": "Aatrox",
                        "title": "t", "image": { "full": "Aatrox.png" }
                    }
                }
            }"#,
        )
        .unwrap();

        let mut state = draft_ready_state("solo");
        state.catalog = Some(ChampionCatalog::from_document(doc));
        assert!(gate_selection(&state, "Aatrox").is_ok());
        assert!(gate_selection(&state, "NotAChampion").is_err());
    }

    #[test]
    fn pick_steps_build_pick_frames() {
        let mut state = draft_ready_state("solo");
        for i in 0..6 {
            state.draft.apply_selection(format!("Ban{i}")).unwrap();
        }
        let action = gate_selection(&state, "Ahri").unwrap();
        assert_eq!(
            action,
            ClientAction::Pick {
                user_id: "u1".into(),
                champion_id: "Ahri".into()
            }
        );
    }

    #[test]
    fn selections_are_refused_outside_the_draft_stage() {
        let mut state = AppState::new("abc123", "u1", "en_US");
        state.settings = Some(settings("solo"));
        assert!(gate_selection(&state, "Aatrox").is_err());
    }
}
