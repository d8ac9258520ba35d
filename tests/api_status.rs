use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::NaiveDate;

use shotlight_terminal::api::ApiClient;
use shotlight_terminal::config::AppConfig;
use shotlight_terminal::identity::ClientId;
use shotlight_terminal::poller::{FakeClock, ShotStream};

const SHOT_JSON: &str = r#"{"description":"Dunk","period":1,"clock":"1:00","scoreHome":2,"scoreAway":0}"#;
const GAMES_JSON: &str = r#"[{"gameId":"0022400601","homeTeam":"BOS","awayTeam":"NYK"}]"#;

fn response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn no_content() -> String {
    "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n".to_string()
}

/// Serves one canned response per connection, in order, and returns the
/// request lines it saw.
fn serve(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for reply in responses {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            loop {
                let mut header = String::new();
                let read = reader.read_line(&mut header).expect("header");
                if read == 0 || header == "\r\n" {
                    break;
                }
            }
            seen.push(request_line.trim().to_string());
            let mut stream = stream;
            stream.write_all(reply.as_bytes()).expect("write reply");
            stream.flush().expect("flush");
        }
        seen
    });
    (base, handle)
}

fn client(base: &str) -> ApiClient {
    let base = base.to_string();
    let config = AppConfig::from_lookup(move |key| (key == "SHOTLIGHT_BASE_URL").then(|| base.clone()));
    let id = ClientId::parse("test-device-01").expect("valid id");
    ApiClient::new(&config, id).expect("http client")
}

#[test]
fn peek_shot_maps_http_status() {
    let (base, server) = serve(vec![
        no_content(),
        response("500 Internal Server Error", "boom"),
        response("200 OK", SHOT_JSON),
    ]);
    let api = client(&base);

    assert!(api.peek_shot().expect("204 is not an error").is_none());

    let err = api.peek_shot().expect_err("500 is a failed poll");
    assert!(format!("{err:#}").contains("500"));

    let event = api
        .peek_shot()
        .expect("200 parses")
        .expect("200 carries a shot");
    assert_eq!(event.log_line().as_deref(), Some("[Q1 1:00] Dunk"));

    let seen = server.join().expect("server thread");
    assert_eq!(seen.len(), 3);
    assert!(seen[0].starts_with("GET /nba/peek_shot?client_id=test-device-01"));
}

#[test]
fn stream_skips_failed_polls_over_http() {
    let (base, server) = serve(vec![
        no_content(),
        response("503 Service Unavailable", ""),
        response("200 OK", SHOT_JSON),
    ]);
    let mut stream = ShotStream::new(client(&base), FakeClock::new(), Duration::from_secs(3));

    assert_eq!(stream.next(), Some(None));
    assert_eq!(stream.consecutive_failures(), 0);
    assert_eq!(stream.next(), Some(None));
    assert_eq!(stream.consecutive_failures(), 1);
    let shot = stream.next().expect("stream keeps polling").expect("shot");
    assert_eq!(shot.score_home, Some(2));
    assert_eq!(stream.consecutive_failures(), 0);

    server.join().expect("server thread");
}

#[test]
fn games_not_found_is_an_empty_day() {
    let (base, server) = serve(vec![
        response("404 Not Found", r#"{"error":"no games"}"#),
        response("200 OK", GAMES_JSON),
        response("500 Internal Server Error", "boom"),
    ]);
    let api = client(&base);
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid date");

    assert!(api.fetch_games(date).expect("404 means no games").is_empty());

    let games = api.fetch_games(date).expect("200 parses");
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].label(), "NYK @ BOS");

    assert!(api.fetch_games(date).is_err());

    let seen = server.join().expect("server thread");
    assert!(seen[0].starts_with("GET /nba/games?date=2025-01-15"));
}
