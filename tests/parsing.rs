use std::fs;
use std::path::PathBuf;

use shotlight_terminal::api::{
    parse_games_json, parse_paused_json, parse_player_map_json, parse_player_stats_json,
    parse_shot_json,
};
use shotlight_terminal::boxscore::{format_minutes, headshot_url};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_games_fixture() {
    let raw = read_fixture("games.json");
    let games = parse_games_json(&raw).expect("fixture should parse");
    assert_eq!(games.len(), 3);
    assert_eq!(games[0].game_id, "0022400601");
    assert_eq!(games[0].home, "BOS");
    assert_eq!(games[0].away, "NYK");
    assert_eq!(games[1].label(), "LAL @ GSW");
    assert_eq!(games[2].game_id, "22400603");
    assert_eq!(games[2].home, "DEN");
    assert_eq!(games[2].away, "MIN");
}

#[test]
fn parses_peek_shot_fixture() {
    let raw = read_fixture("peek_shot.json");
    let event = parse_shot_json(&raw)
        .expect("fixture should parse")
        .expect("fixture has a shot");
    assert_eq!(event.score_home, Some(48));
    assert_eq!(event.score_away, Some(44));
    assert_eq!(event.game_id.as_deref(), Some("0022400601"));
    assert_eq!(event.is_three_point, Some(true));
    assert_eq!(
        event.log_line().as_deref(),
        Some("[Q2 07:41] Tatum 26' 3PT Jump Shot (12 PTS)")
    );

    let on_court = event.on_court.expect("roster present");
    assert_eq!(on_court.home.len(), 5);
    assert_eq!(on_court.home[0].id, "1628369");
    assert_eq!(on_court.away.len(), 4);
}

#[test]
fn paused_payload_has_no_log_line() {
    let raw = read_fixture("peek_shot_paused.json");
    let event = parse_shot_json(&raw)
        .expect("fixture should parse")
        .expect("payload present");
    assert!(event.is_paused());
    assert!(event.log_line().is_none());
    assert!(event.score_home.is_none());
    assert!(event.on_court.is_none());
}

#[test]
fn parses_player_map_fixture() {
    let raw = read_fixture("player_map.json");
    let map = parse_player_map_json(&raw).expect("fixture should parse");
    assert_eq!(map.len(), 3);
    assert_eq!(map.get("1628369").map(String::as_str), Some("Jayson Tatum"));
    assert!(!map.contains_key("999"));
}

#[test]
fn parses_player_stats_fixture() {
    let raw = read_fixture("player_stats.json");
    let stats = parse_player_stats_json(&raw).expect("fixture should parse");
    assert_eq!(stats.points, 27);
    assert_eq!(stats.jersey_num.as_deref(), Some("0"));
    assert_eq!(stats.fg_line(), "9-20 (45.0%)");
    assert_eq!(stats.three_pt_line(), "4-10 (40.0%)");
    assert_eq!(stats.minutes_label(), "34:13");
}

#[test]
fn minutes_fall_back_to_zero() {
    assert_eq!(format_minutes(Some("PT05M07.50S")), "5:07");
    assert_eq!(format_minutes(Some("34:13")), "0:00");
    assert_eq!(format_minutes(None), "0:00");
}

#[test]
fn headshot_points_at_player_id() {
    assert!(headshot_url("1628369").ends_with("/1628369.png"));
}

#[test]
fn paused_probe_parses() {
    assert!(parse_paused_json(r#"{"client_id": "abc", "paused": true}"#).expect("json"));
    assert!(parse_paused_json("{not json").is_err());
}

#[test]
fn no_content_bodies_are_empty() {
    assert!(parse_shot_json("").expect("blank").is_none());
    assert!(parse_games_json("null").expect("null").is_empty());
}
