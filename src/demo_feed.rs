use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::api::GameSummary;
use crate::boxscore::PlayerStats;
use crate::live_feed::{OnCourt, Player, ShotEvent};
use crate::poller::ShotSource;
use crate::state::WatchTarget;

const PERIOD_SECS: u32 = 12 * 60;

/// Offline stand-in for `/nba/peek_shot`. Mimics the real backend closely
/// enough to exercise the reconciler: repeated answers while nothing moved,
/// no-content gaps, substitutions, and the occasional paused answer.
pub struct DemoFeed {
    rng: StdRng,
    target: WatchTarget,
    period: u32,
    clock_secs: u32,
    home_score: u32,
    away_score: u32,
    home_bench: Vec<Player>,
    away_bench: Vec<Player>,
    on_court: OnCourt,
    last: Option<ShotEvent>,
    index: u32,
}

impl DemoFeed {
    pub fn new(target: WatchTarget) -> Self {
        Self::with_rng(target, StdRng::from_entropy())
    }

    pub fn with_seed(target: WatchTarget, seed: u64) -> Self {
        Self::with_rng(target, StdRng::seed_from_u64(seed))
    }

    fn with_rng(target: WatchTarget, rng: StdRng) -> Self {
        let (home_court, home_bench) = seed_roster(&target.home, 100);
        let (away_court, away_bench) = seed_roster(&target.away, 200);
        Self {
            rng,
            target,
            period: 1,
            clock_secs: PERIOD_SECS,
            home_score: 0,
            away_score: 0,
            home_bench,
            away_bench,
            on_court: OnCourt {
                home: home_court,
                away: away_court,
            },
            last: None,
            index: 0,
        }
    }

    fn next_event(&mut self) -> ShotEvent {
        let elapsed = self.rng.gen_range(8..40);
        if self.clock_secs <= elapsed {
            self.period = (self.period + 1).min(4);
            self.clock_secs = PERIOD_SECS;
        } else {
            self.clock_secs -= elapsed;
        }

        if self.rng.gen_bool(0.15) {
            self.substitute();
        }

        let home_side = self.rng.gen_bool(0.5);
        let roster = if home_side {
            &self.on_court.home
        } else {
            &self.on_court.away
        };
        let shooter = roster[self.rng.gen_range(0..roster.len())].name.clone();
        let three = self.rng.gen_bool(0.35);
        let made = self.rng.gen_bool(if three { 0.36 } else { 0.52 });
        let distance = if three {
            self.rng.gen_range(23..30)
        } else {
            self.rng.gen_range(1..18)
        };
        let kind = if three { "3PT Jump Shot" } else { "Driving Layup" };

        if made {
            let points = if three { 3 } else { 2 };
            if home_side {
                self.home_score += points;
            } else {
                self.away_score += points;
            }
        }

        let description = if made {
            format!("{shooter} {distance}' {kind}")
        } else {
            format!("MISS {shooter} {distance}' {kind}")
        };
        self.index += 1;

        ShotEvent {
            description: Some(description),
            period: Some(self.period),
            clock: Some(format_game_clock(self.clock_secs)),
            score_home: Some(self.home_score),
            score_away: Some(self.away_score),
            on_court: Some(self.on_court.clone()),
            player: Some(shooter),
            team: Some(if home_side {
                self.target.home.clone()
            } else {
                self.target.away.clone()
            }),
            result: Some(if made { "Made" } else { "Missed" }.to_string()),
            is_three_point: Some(three),
            index: Some(self.index),
            home_team: Some(self.target.home.clone()),
            away_team: Some(self.target.away.clone()),
            game_id: Some(self.target.game_id.clone()),
            ..ShotEvent::default()
        }
    }

    fn substitute(&mut self) {
        let home_side = self.rng.gen_bool(0.5);
        let (court, bench) = if home_side {
            (&mut self.on_court.home, &mut self.home_bench)
        } else {
            (&mut self.on_court.away, &mut self.away_bench)
        };
        if court.is_empty() || bench.is_empty() {
            return;
        }
        let out_idx = self.rng.gen_range(0..court.len());
        let in_idx = self.rng.gen_range(0..bench.len());
        std::mem::swap(&mut court[out_idx], &mut bench[in_idx]);
        court.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

impl ShotSource for DemoFeed {
    fn peek_shot(&mut self) -> Result<Option<ShotEvent>> {
        let roll: f64 = self.rng.r#gen();
        if roll < 0.2 {
            return Ok(None);
        }
        if roll < 0.45 {
            if let Some(last) = self.last.clone() {
                return Ok(Some(last));
            }
        }
        if roll > 0.98 {
            return Ok(Some(ShotEvent {
                paused: Some(true),
                message: Some("Client is paused".to_string()),
                ..ShotEvent::default()
            }));
        }
        let event = self.next_event();
        self.last = Some(event.clone());
        Ok(Some(event))
    }
}

pub fn demo_games(date: NaiveDate) -> Vec<GameSummary> {
    const MATCHUPS: &[(&str, &str)] = &[
        ("BOS", "NYK"),
        ("LAL", "GSW"),
        ("DEN", "MIN"),
        ("MIA", "PHI"),
        ("OKC", "DAL"),
        ("MIL", "CLE"),
    ];
    let count = 2 + (date.ordinal() as usize % 4);
    let offset = date.day0() as usize % MATCHUPS.len();
    (0..count)
        .map(|i| {
            let (home, away) = MATCHUPS[(offset + i) % MATCHUPS.len()];
            GameSummary {
                game_id: format!("demo-{}-{i}", date.format("%Y%m%d")),
                home: home.to_string(),
                away: away.to_string(),
            }
        })
        .collect()
}

pub fn demo_player_stats(player: &Player) -> PlayerStats {
    let seed = player
        .id
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    let mut rng = StdRng::seed_from_u64(seed);
    let fg_attempted = rng.gen_range(4..22);
    let fg_made = rng.gen_range(0..=fg_attempted);
    let three_pt_attempted = rng.gen_range(0..=fg_attempted.min(10));
    let three_pt_made = rng.gen_range(0..=three_pt_attempted.min(fg_made));
    let ft_attempted = rng.gen_range(0..9);
    let ft_made = rng.gen_range(0..=ft_attempted);
    PlayerStats {
        name: Some(player.name.clone()),
        points: fg_made * 2 + three_pt_made + ft_made,
        rebounds: rng.gen_range(0..12),
        assists: rng.gen_range(0..10),
        steals: rng.gen_range(0..4),
        blocks: rng.gen_range(0..3),
        turnovers: rng.gen_range(0..5),
        fg_made,
        fg_attempted,
        fg_pct: ratio(fg_made, fg_attempted),
        three_pt_made,
        three_pt_attempted,
        three_pt_pct: ratio(three_pt_made, three_pt_attempted),
        ft_made,
        ft_attempted,
        ft_pct: ratio(ft_made, ft_attempted),
        minutes: Some(format!(
            "PT{}M{:02}.00S",
            rng.gen_range(8..40),
            rng.gen_range(0..60)
        )),
        ..PlayerStats::default()
    }
}

fn ratio(made: u32, attempted: u32) -> f64 {
    if attempted == 0 {
        0.0
    } else {
        made as f64 / attempted as f64
    }
}

fn format_game_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn seed_roster(team: &str, base_id: u32) -> (Vec<Player>, Vec<Player>) {
    let mut players: Vec<Player> = (0..9)
        .map(|i| Player {
            id: (base_id + i).to_string(),
            name: format!("{}. {team} #{}", (b'A' + i as u8) as char, i + 1),
        })
        .collect();
    let bench = players.split_off(5);
    (players, bench)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_feed::{FeedState, merge_snapshot};

    fn target() -> WatchTarget {
        WatchTarget {
            game_id: "demo-1".to_string(),
            home: "BOS".to_string(),
            away: "NYK".to_string(),
        }
    }

    #[test]
    fn demo_feed_keeps_five_per_side_and_scores_monotonic() {
        let mut feed = DemoFeed::with_seed(target(), 7);
        let mut state = FeedState::new();
        let mut last_total = 0;
        for _ in 0..200 {
            let event = feed.peek_shot().expect("demo never fails");
            merge_snapshot(&mut state, event.as_ref());
            assert!(state.on_court.home.len() <= 5);
            let total = state.home_score + state.away_score;
            assert!(total >= last_total);
            last_total = total;
        }
        assert!(!state.log.is_empty());
        assert!(
            state
                .log
                .windows(2)
                .all(|pair| pair[0] != pair[1])
        );
    }

    #[test]
    fn demo_games_are_stable_per_date() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        assert_eq!(demo_games(date), demo_games(date));
        assert!(demo_games(date).len() >= 2);
    }

    #[test]
    fn demo_stats_are_consistent() {
        let player = Player {
            id: "101".to_string(),
            name: "B. BOS #2".to_string(),
        };
        let stats = demo_player_stats(&player);
        assert!(stats.fg_made <= stats.fg_attempted);
        assert!(stats.three_pt_made <= stats.fg_made);
        assert_eq!(stats, demo_player_stats(&player));
    }
}
