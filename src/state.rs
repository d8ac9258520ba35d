use std::collections::{HashMap, VecDeque};

use chrono::{Duration as ChronoDuration, NaiveDate};

use crate::api::GameSummary;
use crate::boxscore::PlayerStats;
use crate::identity::ClientId;
use crate::live_feed::{FeedState, ON_COURT_SLOTS, Player};

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    DeviceSetup,
    GameSelect,
    Watching,
    PlayerProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourtSide {
    Away,
    Home,
}

/// The game a watch session follows, with the tricodes for the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub game_id: String,
    pub home: String,
    pub away: String,
}

impl From<&GameSummary> for WatchTarget {
    fn from(game: &GameSummary) -> Self {
        Self {
            game_id: game.game_id.clone(),
            home: game.home.clone(),
            away: game.away.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub game_id: String,
    pub player: Player,
    pub stats: Option<PlayerStats>,
    pub loading: bool,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub client_id: String,
    pub client_id_input: Option<String>,
    pub connection_status: Option<String>,
    pub date: NaiveDate,
    pub games: Vec<GameSummary>,
    pub games_loading: bool,
    pub games_loaded_for: Option<NaiveDate>,
    pub selected: usize,
    /// Game id asked of the provider but not yet confirmed by `WatchStarted`.
    pub pending_watch: Option<String>,
    pub watching: Option<WatchTarget>,
    pub feed: FeedState,
    pub feed_paused: bool,
    pub device_paused: Option<bool>,
    pub court_side: CourtSide,
    pub court_slot: usize,
    pub player_names: HashMap<String, String>,
    pub profile: Option<ProfileView>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl AppState {
    pub fn new(client_id: &ClientId, date: NaiveDate) -> Self {
        Self {
            screen: Screen::DeviceSetup,
            client_id: client_id.as_str().to_string(),
            client_id_input: None,
            connection_status: None,
            date,
            games: Vec::new(),
            games_loading: false,
            games_loaded_for: None,
            selected: 0,
            pending_watch: None,
            watching: None,
            feed: FeedState::new(),
            feed_paused: false,
            device_paused: None,
            court_side: CourtSide::Away,
            court_slot: 0,
            player_names: HashMap::new(),
            profile: None,
            logs: VecDeque::new(),
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn shift_date(&mut self, days: i64) {
        if let Some(date) = self.date.checked_add_signed(ChronoDuration::days(days)) {
            self.date = date;
        }
    }

    pub fn selected_game(&self) -> Option<&GameSummary> {
        self.games.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.games.is_empty() {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1) % self.games.len();
    }

    pub fn select_prev(&mut self) {
        if self.games.is_empty() {
            self.selected = 0;
            return;
        }
        if self.selected == 0 {
            self.selected = self.games.len() - 1;
        } else {
            self.selected -= 1;
        }
    }

    /// Moves the on-court cursor down the away column, then the home column.
    pub fn court_next(&mut self) {
        if self.court_slot + 1 < ON_COURT_SLOTS {
            self.court_slot += 1;
            return;
        }
        self.court_slot = 0;
        self.court_side = match self.court_side {
            CourtSide::Away => CourtSide::Home,
            CourtSide::Home => CourtSide::Away,
        };
    }

    pub fn court_prev(&mut self) {
        if self.court_slot > 0 {
            self.court_slot -= 1;
            return;
        }
        self.court_slot = ON_COURT_SLOTS - 1;
        self.court_side = match self.court_side {
            CourtSide::Away => CourtSide::Home,
            CourtSide::Home => CourtSide::Away,
        };
    }

    pub fn court_toggle_side(&mut self) {
        self.court_side = match self.court_side {
            CourtSide::Away => CourtSide::Home,
            CourtSide::Home => CourtSide::Away,
        };
    }

    pub fn selected_player(&self) -> Option<&Player> {
        match self.court_side {
            CourtSide::Away => self.feed.on_court.away_slot(self.court_slot),
            CourtSide::Home => self.feed.on_court.home_slot(self.court_slot),
        }
    }

    /// Full name from the player map when known, else the feed's short name.
    pub fn display_name<'a>(&'a self, player: &'a Player) -> &'a str {
        self.player_names
            .get(&player.id)
            .map(String::as_str)
            .unwrap_or(player.name.as_str())
    }

    pub fn request_watch(&mut self, game: &GameSummary) {
        self.pending_watch = Some(game.game_id.clone());
    }

    /// Forgets an unconfirmed watch request. Returns whether one was pending.
    pub fn cancel_pending_watch(&mut self) -> bool {
        self.pending_watch.take().is_some()
    }

    pub fn begin_watch(&mut self, target: WatchTarget) {
        self.pending_watch = None;
        self.watching = Some(target);
        self.feed = FeedState::new();
        self.feed_paused = false;
        self.court_side = CourtSide::Away;
        self.court_slot = 0;
        self.profile = None;
        self.screen = Screen::Watching;
    }

    /// Drops the session's feed; stale updates for it are ignored afterwards.
    pub fn end_watch(&mut self) {
        self.watching = None;
        self.feed = FeedState::new();
        self.feed_paused = false;
        self.profile = None;
        self.screen = Screen::GameSelect;
    }

    pub fn open_profile(&mut self, player: Player) {
        let Some(game_id) = self.watching.as_ref().map(|w| w.game_id.clone()) else {
            return;
        };
        self.profile = Some(ProfileView {
            game_id,
            player,
            stats: None,
            loading: true,
        });
        self.screen = Screen::PlayerProfile;
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetGames {
        date: NaiveDate,
        games: Vec<GameSummary>,
    },
    WatchStarted(WatchTarget),
    FeedUpdated {
        game_id: String,
        feed: FeedState,
        paused: bool,
    },
    SetPlayerMap(HashMap<String, String>),
    SetPlayerStats {
        game_id: String,
        player_id: String,
        stats: Option<PlayerStats>,
    },
    SetDevicePaused(bool),
    ConnectionChecked(String),
    ClientIdChanged(String),
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    LoadGames { date: NaiveDate },
    StartWatching { game: GameSummary },
    StopWatching,
    FetchPlayerStats { game_id: String, player: Player },
    SetPaused(bool),
    CheckPaused,
    TestConnection,
    ChangeClientId(ClientId),
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetGames { date, games } => {
            // A late answer for a date the user already moved away from.
            if date != state.date {
                return;
            }
            state.games = games;
            state.games_loading = false;
            state.games_loaded_for = Some(date);
            if state.selected >= state.games.len() {
                state.selected = 0;
            }
        }
        Delta::WatchStarted(target) => {
            // Cancelled or superseded while the provider was selecting it.
            if state.pending_watch.as_deref() != Some(target.game_id.as_str()) {
                return;
            }
            state.push_log(format!(
                "[INFO] Watching {} @ {} ({})",
                target.away, target.home, target.game_id
            ));
            state.begin_watch(target);
        }
        Delta::FeedUpdated {
            game_id,
            feed,
            paused,
        } => {
            let current = state.watching.as_ref().map(|w| w.game_id.as_str());
            if current != Some(game_id.as_str()) {
                return;
            }
            state.feed = feed;
            state.feed_paused = paused;
        }
        Delta::SetPlayerMap(map) => {
            if !map.is_empty() {
                state.player_names = map;
            }
        }
        Delta::SetPlayerStats {
            game_id,
            player_id,
            stats,
        } => {
            let Some(profile) = state.profile.as_mut() else {
                return;
            };
            if profile.game_id != game_id || profile.player.id != player_id {
                return;
            }
            profile.loading = false;
            profile.stats = stats;
        }
        Delta::SetDevicePaused(paused) => {
            state.device_paused = Some(paused);
        }
        Delta::ConnectionChecked(status) => {
            state.connection_status = Some(status);
        }
        Delta::ClientIdChanged(id) => {
            state.push_log(format!("[INFO] Client id set to {id}"));
            state.client_id = id;
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
