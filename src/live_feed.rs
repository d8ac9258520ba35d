use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Slots shown per side in the on-court grid.
pub const ON_COURT_SLOTS: usize = 5;
pub const EMPTY_SLOT: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    #[serde(default, deserialize_with = "de_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnCourt {
    #[serde(default)]
    pub home: Vec<Player>,
    #[serde(default)]
    pub away: Vec<Player>,
}

impl OnCourt {
    pub fn home_slot(&self, idx: usize) -> Option<&Player> {
        self.home.get(idx)
    }

    pub fn away_slot(&self, idx: usize) -> Option<&Player> {
        self.away.get(idx)
    }
}

/// One `peek_shot` response. Every field is optional on the wire; a field
/// that is missing (or `null`) never overwrites existing feed state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotEvent {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub period: Option<u32>,
    #[serde(default)]
    pub clock: Option<String>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub score_home: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub score_away: Option<u32>,
    #[serde(default)]
    pub on_court: Option<OnCourt>,

    // Display-only extras.
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub is_three_point: Option<bool>,
    #[serde(default)]
    pub is_dunk: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub index: Option<u32>,
    #[serde(default, rename = "home_team")]
    pub home_team: Option<String>,
    #[serde(default, rename = "away_team")]
    pub away_team: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string_or_number")]
    pub game_id: Option<String>,
    #[serde(default)]
    pub paused: Option<bool>,
    #[serde(default)]
    pub reset: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ShotEvent {
    /// `[Q{period} {clock}] {description}` when all three parts are usable.
    pub fn log_line(&self) -> Option<String> {
        let description = self.description.as_deref().filter(|s| !s.is_empty())?;
        let period = self.period.filter(|p| *p != 0)?;
        let clock = self.clock.as_deref().filter(|s| !s.is_empty())?;
        Some(format!("[Q{period} {clock}] {description}"))
    }

    pub fn is_paused(&self) -> bool {
        self.paused.unwrap_or(false)
    }

    pub fn is_reset(&self) -> bool {
        self.reset.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedState {
    pub home_score: u32,
    pub away_score: u32,
    pub on_court: OnCourt,
    pub log: Vec<String>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_line(&self) -> Option<&str> {
        self.log.last().map(String::as_str)
    }

    /// Folds one snapshot into the running state. Returns whether anything
    /// visible changed.
    pub fn merge(&mut self, event: &ShotEvent) -> bool {
        let mut changed = false;

        if let Some(line) = event.log_line() {
            if self.last_line() != Some(line.as_str()) {
                self.log.push(line);
                changed = true;
            }
        }

        if let Some(score) = event.score_home {
            changed |= self.home_score != score;
            self.home_score = score;
        }
        if let Some(score) = event.score_away {
            changed |= self.away_score != score;
            self.away_score = score;
        }

        // Rosters are replaced as a whole, never patched slot by slot.
        if let Some(on_court) = event.on_court.as_ref() {
            changed |= self.on_court != *on_court;
            self.on_court = on_court.clone();
        }

        changed
    }
}

/// `None` means "nothing new this cycle" and leaves `state` untouched.
pub fn merge_snapshot(state: &mut FeedState, event: Option<&ShotEvent>) -> bool {
    match event {
        Some(event) => state.merge(event),
        None => false,
    }
}

fn de_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(&value).unwrap_or_default())
}

pub(crate) fn de_opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}

fn de_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_u32))
}

pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn value_to_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(description: &str, period: u32, clock: &str) -> ShotEvent {
        ShotEvent {
            description: Some(description.to_string()),
            period: Some(period),
            clock: Some(clock.to_string()),
            ..ShotEvent::default()
        }
    }

    fn player(id: &str, name: &str) -> Player {
        Player {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn formats_log_line() {
        let mut state = FeedState::new();
        merge_snapshot(&mut state, Some(&shot("Made Shot", 2, "5:30")));
        assert_eq!(state.log, vec!["[Q2 5:30] Made Shot".to_string()]);
    }

    #[test]
    fn absent_event_is_identity() {
        let mut state = FeedState {
            home_score: 10,
            away_score: 7,
            on_court: OnCourt {
                home: vec![player("1", "A. One")],
                away: Vec::new(),
            },
            log: vec!["[Q1 11:00] Jump ball".to_string()],
        };
        let before = state.clone();
        assert!(!merge_snapshot(&mut state, None));
        assert_eq!(state, before);
    }

    #[test]
    fn adjacent_duplicates_collapse_but_later_repeats_do_not() {
        let mut state = FeedState::new();
        let a = shot("Made Shot", 1, "10:00");
        let b = shot("Missed Shot", 1, "9:40");
        for event in [&a, &a, &a, &b, &b, &a] {
            merge_snapshot(&mut state, Some(event));
        }
        assert_eq!(
            state.log,
            vec![
                "[Q1 10:00] Made Shot".to_string(),
                "[Q1 9:40] Missed Shot".to_string(),
                "[Q1 10:00] Made Shot".to_string(),
            ]
        );
    }

    #[test]
    fn zero_score_is_applied_and_missing_score_is_kept() {
        let mut state = FeedState {
            home_score: 10,
            ..FeedState::default()
        };
        merge_snapshot(&mut state, Some(&ShotEvent::default()));
        assert_eq!(state.home_score, 10);

        let zero = ShotEvent {
            score_home: Some(0),
            ..ShotEvent::default()
        };
        merge_snapshot(&mut state, Some(&zero));
        assert_eq!(state.home_score, 0);
    }

    #[test]
    fn scores_update_independently() {
        let mut state = FeedState {
            home_score: 4,
            away_score: 9,
            ..FeedState::default()
        };
        let away_only = ShotEvent {
            score_away: Some(11),
            ..ShotEvent::default()
        };
        merge_snapshot(&mut state, Some(&away_only));
        assert_eq!((state.home_score, state.away_score), (4, 11));
    }

    #[test]
    fn partial_event_updates_scores_without_logging() {
        let mut state = FeedState::new();
        let event = ShotEvent {
            description: Some("Layup".to_string()),
            period: Some(3),
            clock: None,
            score_home: Some(55),
            ..ShotEvent::default()
        };
        assert!(merge_snapshot(&mut state, Some(&event)));
        assert!(state.log.is_empty());
        assert_eq!(state.home_score, 55);
    }

    #[test]
    fn on_court_is_replaced_wholesale() {
        let mut state = FeedState::new();
        state.on_court = OnCourt {
            home: vec![player("1", "A"), player("2", "B")],
            away: vec![player("3", "C")],
        };
        let event = ShotEvent {
            on_court: Some(OnCourt {
                home: vec![player("9", "Z")],
                away: Vec::new(),
            }),
            ..ShotEvent::default()
        };
        merge_snapshot(&mut state, Some(&event));
        assert_eq!(state.on_court.home, vec![player("9", "Z")]);
        assert!(state.on_court.away.is_empty());
        assert!(state.on_court.away_slot(0).is_none());
    }

    #[test]
    fn empty_description_or_zero_period_skips_log() {
        assert!(shot("", 1, "1:00").log_line().is_none());
        assert!(shot("Dunk", 0, "1:00").log_line().is_none());
        assert!(shot("Dunk", 1, "").log_line().is_none());
    }

    #[test]
    fn parses_loose_wire_types() {
        let raw = r#"{
            "description": "MISS Curry 3PT",
            "period": 4,
            "clock": "01:12",
            "scoreHome": "101",
            "scoreAway": "N/A",
            "onCourt": {"home": [{"id": 201939, "name": "S. Curry"}]}
        }"#;
        let event: ShotEvent = serde_json::from_str(raw).expect("valid shot json");
        assert_eq!(event.score_home, Some(101));
        assert_eq!(event.score_away, None);
        let on_court = event.on_court.expect("on court");
        assert_eq!(on_court.home[0].id, "201939");
        assert!(on_court.away.is_empty());
    }
}
