use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::api::{ApiClient, GameSummary};
use crate::demo_feed::{DemoFeed, demo_games, demo_player_stats};
use crate::identity::{ClientId, IdentityStore};
use crate::live_feed::Player;
use crate::poller::WatchSession;
use crate::state::{Delta, ProviderCommand, WatchTarget};

/// Where game data comes from: the real backend or the offline demo.
pub enum Backend {
    Live(ApiClient),
    Demo,
}

impl Backend {
    pub fn label(&self) -> &'static str {
        match self {
            Backend::Live(_) => "live",
            Backend::Demo => "demo",
        }
    }
}

pub struct Provider {
    backend: Backend,
    store: IdentityStore,
    poll_interval: Duration,
    session: Option<WatchSession>,
    tx: Sender<Delta>,
}

/// Runs provider commands on a background thread until the command channel
/// closes; any live session is stopped before the thread exits.
pub fn spawn_provider(
    backend: Backend,
    store: IdentityStore,
    poll_interval: Duration,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut provider = Provider::new(backend, store, poll_interval, tx);
        for cmd in cmd_rx {
            provider.handle(cmd);
        }
        provider.stop_session();
    })
}

impl Provider {
    pub fn new(
        backend: Backend,
        store: IdentityStore,
        poll_interval: Duration,
        tx: Sender<Delta>,
    ) -> Self {
        Self {
            backend,
            store,
            poll_interval,
            session: None,
            tx,
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn handle(&mut self, cmd: ProviderCommand) {
        match cmd {
            ProviderCommand::LoadGames { date } => {
                let games = match &self.backend {
                    Backend::Live(api) => match api.fetch_games(date) {
                        Ok(games) => games,
                        Err(err) => {
                            self.log(format!("[WARN] Games fetch error: {err:#}"));
                            Vec::new()
                        }
                    },
                    Backend::Demo => demo_games(date),
                };
                if games.is_empty() {
                    self.log(format!("[INFO] No games for {}", date.format("%Y-%m-%d")));
                }
                let _ = self.tx.send(Delta::SetGames { date, games });
            }
            ProviderCommand::StartWatching { game } => self.start_watching(&game),
            ProviderCommand::StopWatching => {
                if self.stop_session() {
                    self.log("[INFO] Watch session ended".to_string());
                }
            }
            ProviderCommand::FetchPlayerStats { game_id, player } => {
                self.fetch_player_stats(game_id, &player);
            }
            ProviderCommand::SetPaused(paused) => {
                let result = match &self.backend {
                    Backend::Live(api) if paused => api.pause(),
                    Backend::Live(api) => api.resume(),
                    Backend::Demo => Ok(()),
                };
                match result {
                    Ok(()) => {
                        let verb = if paused { "paused" } else { "resumed" };
                        self.log(format!("[INFO] Device {verb}"));
                        let _ = self.tx.send(Delta::SetDevicePaused(paused));
                    }
                    Err(err) => self.log(format!("[WARN] Pause/resume failed: {err:#}")),
                }
            }
            ProviderCommand::CheckPaused => {
                let result = match &self.backend {
                    Backend::Live(api) => api.is_paused(),
                    Backend::Demo => Ok(false),
                };
                match result {
                    Ok(paused) => {
                        let _ = self.tx.send(Delta::SetDevicePaused(paused));
                    }
                    Err(err) => self.log(format!("[WARN] Pause state unavailable: {err:#}")),
                }
            }
            ProviderCommand::TestConnection => {
                let status = match &self.backend {
                    Backend::Live(api) => match api.test_connection() {
                        Ok(body) if body.is_empty() => "Connected".to_string(),
                        Ok(body) => format!("Connected: {body}"),
                        Err(err) => format!("Unreachable: {err:#}"),
                    },
                    Backend::Demo => "Demo mode (no backend)".to_string(),
                };
                let _ = self.tx.send(Delta::ConnectionChecked(status));
            }
            ProviderCommand::ChangeClientId(id) => self.change_client_id(id),
        }
    }

    fn start_watching(&mut self, game: &GameSummary) {
        self.stop_session();
        let target = WatchTarget::from(game);

        match &self.backend {
            Backend::Live(api) => {
                if let Err(err) = api.select_game(&game.game_id) {
                    self.log(format!("[WARN] Select game failed: {err:#}"));
                    return;
                }
                let _ = self.tx.send(Delta::WatchStarted(target.clone()));
                self.session = Some(WatchSession::spawn(
                    target,
                    api.clone(),
                    self.poll_interval,
                    self.tx.clone(),
                ));
                match api.player_map() {
                    Ok(map) => {
                        let _ = self.tx.send(Delta::SetPlayerMap(map));
                    }
                    Err(err) => self.log(format!("[WARN] Player map unavailable: {err:#}")),
                }
            }
            Backend::Demo => {
                let _ = self.tx.send(Delta::WatchStarted(target.clone()));
                let feed = DemoFeed::new(target.clone());
                self.session = Some(WatchSession::spawn(
                    target,
                    feed,
                    self.poll_interval,
                    self.tx.clone(),
                ));
            }
        }
    }

    fn fetch_player_stats(&mut self, game_id: String, player: &Player) {
        let stats = match &self.backend {
            Backend::Live(api) => match api.player_stats(&game_id, &player.id) {
                Ok(stats) => Some(stats),
                Err(err) => {
                    self.log(format!(
                        "[WARN] Stats unavailable for {} ({}): {err:#}",
                        player.name, player.id
                    ));
                    None
                }
            },
            Backend::Demo => Some(demo_player_stats(player)),
        };
        let _ = self.tx.send(Delta::SetPlayerStats {
            game_id,
            player_id: player.id.clone(),
            stats,
        });
    }

    fn change_client_id(&mut self, id: ClientId) {
        // A running session is bound to the old id on the server side.
        if self.stop_session() {
            self.log("[INFO] Watch session ended (client id changed)".to_string());
        }
        if let Err(err) = self.store.save(&id) {
            self.log(format!("[WARN] Could not persist client id: {err:#}"));
        }
        let rebound = match &self.backend {
            Backend::Live(api) => Some(api.with_client_id(id.clone())),
            Backend::Demo => None,
        };
        if let Some(api) = rebound {
            self.backend = Backend::Live(api);
        }
        let _ = self.tx.send(Delta::ClientIdChanged(id.to_string()));
    }

    /// Returns whether a session was running.
    fn stop_session(&mut self) -> bool {
        match self.session.take() {
            Some(mut session) => {
                session.stop();
                true
            }
            None => false,
        }
    }

    fn log(&self, msg: String) {
        let _ = self.tx.send(Delta::Log(msg));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use chrono::NaiveDate;

    use super::*;

    fn demo_provider() -> (Provider, Receiver<Delta>) {
        let (tx, rx) = mpsc::channel();
        let dir = std::env::temp_dir().join(format!("shotlight_provider_{}", std::process::id()));
        let store = IdentityStore::at(dir.join("identity.json"));
        (
            Provider::new(Backend::Demo, store, Duration::from_millis(5), tx),
            rx,
        )
    }

    #[test]
    fn demo_games_load_for_requested_date() {
        let (mut provider, rx) = demo_provider();
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        provider.handle(ProviderCommand::LoadGames { date });
        let games = rx
            .try_iter()
            .find_map(|delta| match delta {
                Delta::SetGames { date: d, games } if d == date => Some(games),
                _ => None,
            })
            .expect("games delta");
        assert!(!games.is_empty());
    }

    #[test]
    fn starting_a_new_game_replaces_the_session() {
        let (mut provider, rx) = demo_provider();
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let games = demo_games(date);

        provider.handle(ProviderCommand::StartWatching {
            game: games[0].clone(),
        });
        provider.handle(ProviderCommand::StartWatching {
            game: games[1].clone(),
        });
        assert!(provider.has_session());
        provider.handle(ProviderCommand::StopWatching);
        assert!(!provider.has_session());

        let started: Vec<String> = rx
            .try_iter()
            .filter_map(|delta| match delta {
                Delta::WatchStarted(target) => Some(target.game_id),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![games[0].game_id.clone(), games[1].game_id.clone()]);
    }
}
