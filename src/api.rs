use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::boxscore::PlayerStats;
use crate::config::AppConfig;
use crate::http_client::http_client;
use crate::identity::ClientId;
use crate::live_feed::{ShotEvent, value_to_string};
use crate::poller::ShotSource;
use crate::teams::tricode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub game_id: String,
    pub home: String,
    pub away: String,
}

impl GameSummary {
    pub fn label(&self) -> String {
        format!("{} @ {}", self.away, self.home)
    }
}

/// Thin client over the shot-light backend. The client id is fixed at
/// construction and attached to every call that needs one.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    client_id: ClientId,
}

impl ApiClient {
    pub fn new(config: &AppConfig, client_id: ClientId) -> Result<Self> {
        Ok(Self {
            http: http_client(config.request_timeout)?,
            base_url: config.base_url.clone(),
            client_id,
        })
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn with_client_id(&self, client_id: ClientId) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            client_id,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/nba/{path}", self.base_url)
    }

    pub fn fetch_games(&self, date: NaiveDate) -> Result<Vec<GameSummary>> {
        let date = date.format("%Y-%m-%d").to_string();
        let resp = self
            .http
            .get(self.url("games"))
            .query(&[("date", date.as_str())])
            .send()
            .context("games request failed")?;
        // The backend answers 404 when a date has no games.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body = read_success_body(resp)?;
        parse_games_json(&body)
    }

    pub fn select_game(&self, game_id: &str) -> Result<()> {
        let resp = self
            .http
            .get(self.url("select_game"))
            .query(&[("gameId", game_id), ("client_id", self.client_id.as_str())])
            .send()
            .context("select_game request failed")?;
        read_success_body(resp).map(|_| ())
    }

    pub fn peek_shot(&self) -> Result<Option<ShotEvent>> {
        let resp = self
            .http
            .get(self.url("peek_shot"))
            .query(&[("client_id", self.client_id.as_str())])
            .send()
            .context("peek_shot request failed")?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = read_success_body(resp)?;
        parse_shot_json(&body)
    }

    pub fn player_map(&self) -> Result<HashMap<String, String>> {
        let resp = self
            .http
            .get(self.url("player_map"))
            .query(&[("client_id", self.client_id.as_str())])
            .send()
            .context("player_map request failed")?;
        let body = read_success_body(resp)?;
        parse_player_map_json(&body)
    }

    pub fn player_stats(&self, game_id: &str, player_id: &str) -> Result<PlayerStats> {
        let resp = self
            .http
            .get(self.url("player_stats"))
            .query(&[("gameId", game_id), ("playerId", player_id)])
            .send()
            .context("player_stats request failed")?;
        let body = read_success_body(resp)?;
        parse_player_stats_json(&body)
    }

    pub fn test_connection(&self) -> Result<String> {
        let resp = self
            .http
            .get(self.url("test"))
            .send()
            .context("connection test failed")?;
        read_success_body(resp).map(|body| body.trim().to_string())
    }

    pub fn pause(&self) -> Result<()> {
        self.post_client_command("pause")
    }

    pub fn resume(&self) -> Result<()> {
        self.post_client_command("resume")
    }

    pub fn is_paused(&self) -> Result<bool> {
        let resp = self
            .http
            .get(self.url("is_paused"))
            .query(&[("client_id", self.client_id.as_str())])
            .send()
            .context("is_paused request failed")?;
        let body = read_success_body(resp)?;
        parse_paused_json(&body)
    }

    fn post_client_command(&self, path: &str) -> Result<()> {
        let payload = serde_json::json!({ "client_id": self.client_id.as_str() });
        let resp = self
            .http
            .post(self.url(path))
            .json(&payload)
            .send()
            .with_context(|| format!("{path} request failed"))?;
        read_success_body(resp).map(|_| ())
    }
}

impl ShotSource for ApiClient {
    fn peek_shot(&mut self) -> Result<Option<ShotEvent>> {
        ApiClient::peek_shot(self)
    }
}

fn read_success_body(resp: Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {}: {}", status, body.trim()));
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
struct RawGame {
    #[serde(rename = "gameId", alias = "game_id", default)]
    game_id: Option<Value>,
    #[serde(rename = "homeTeam", alias = "home_team", default)]
    home_team: Option<String>,
    #[serde(rename = "awayTeam", alias = "away_team", default)]
    away_team: Option<String>,
}

pub fn parse_games_json(raw: &str) -> Result<Vec<GameSummary>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let rows: Vec<RawGame> = serde_json::from_str(trimmed).context("invalid games json")?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let game_id = row.game_id.as_ref().and_then(value_to_string)?;
            if game_id.trim().is_empty() {
                return None;
            }
            Some(GameSummary {
                game_id,
                home: tricode(row.home_team.as_deref().unwrap_or("HOME")),
                away: tricode(row.away_team.as_deref().unwrap_or("AWAY")),
            })
        })
        .collect())
}

pub fn parse_shot_json(raw: &str) -> Result<Option<ShotEvent>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let event = serde_json::from_str::<ShotEvent>(trimmed).context("invalid peek_shot json")?;
    Ok(Some(event))
}

pub fn parse_player_map_json(raw: &str) -> Result<HashMap<String, String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(HashMap::new());
    }
    let root: HashMap<String, Value> =
        serde_json::from_str(trimmed).context("invalid player_map json")?;
    Ok(root
        .into_iter()
        .filter_map(|(id, name)| value_to_string(&name).map(|name| (id, name)))
        .collect())
}

pub fn parse_player_stats_json(raw: &str) -> Result<PlayerStats> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(PlayerStats::default());
    }
    serde_json::from_str(trimmed).context("invalid player_stats json")
}

pub fn parse_paused_json(raw: &str) -> Result<bool> {
    let root: Value = serde_json::from_str(raw.trim()).context("invalid is_paused json")?;
    Ok(root.get("paused").and_then(Value::as_bool).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn games_accept_both_key_styles_and_names() {
        let raw = r#"[
            {"gameId": "0022400061", "homeTeam": "BOS", "awayTeam": "NYK"},
            {"game_id": 22400062, "home_team": "Los Angeles Lakers", "away_team": "Minnesota Timberwolves"},
            {"homeTeam": "MIA", "awayTeam": "ORL"}
        ]"#;
        let games = parse_games_json(raw).expect("valid games");
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].label(), "NYK @ BOS");
        assert_eq!(games[1].game_id, "22400062");
        assert_eq!(games[1].home, "LAL");
        assert_eq!(games[1].away, "MIN");
    }

    #[test]
    fn empty_bodies_degrade_to_empty() {
        assert!(parse_games_json("").expect("empty").is_empty());
        assert!(parse_shot_json("null").expect("null").is_none());
        assert!(parse_player_map_json(" ").expect("blank").is_empty());
        assert_eq!(
            parse_player_stats_json("null").expect("null"),
            PlayerStats::default()
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_games_json("{\"error\": 1").is_err());
        assert!(parse_shot_json("[1, 2").is_err());
    }

    #[test]
    fn paused_flag_defaults_to_false() {
        assert!(parse_paused_json(r#"{"paused": true}"#).expect("json"));
        assert!(!parse_paused_json(r#"{}"#).expect("json"));
    }
}
