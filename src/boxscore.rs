use serde::{Deserialize, Serialize};

const HEADSHOT_BASE: &str = "https://cdn.nba.com/headshots/nba/latest/1040x760";

/// One player's line from `/nba/player_stats`. Missing counters read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerStats {
    pub name: Option<String>,
    pub team: Option<String>,
    pub position: Option<String>,
    #[serde(deserialize_with = "crate::live_feed::de_opt_string_or_number")]
    pub jersey_num: Option<String>,
    pub points: u32,
    pub rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    pub turnovers: u32,
    pub fg_made: u32,
    pub fg_attempted: u32,
    pub fg_pct: f64,
    pub three_pt_made: u32,
    pub three_pt_attempted: u32,
    pub three_pt_pct: f64,
    pub ft_made: u32,
    pub ft_attempted: u32,
    pub ft_pct: f64,
    pub minutes: Option<String>,
}

impl PlayerStats {
    pub fn minutes_label(&self) -> String {
        format_minutes(self.minutes.as_deref())
    }

    pub fn fg_line(&self) -> String {
        shooting_line(self.fg_made, self.fg_attempted, self.fg_pct)
    }

    pub fn three_pt_line(&self) -> String {
        shooting_line(self.three_pt_made, self.three_pt_attempted, self.three_pt_pct)
    }

    pub fn ft_line(&self) -> String {
        shooting_line(self.ft_made, self.ft_attempted, self.ft_pct)
    }
}

/// `PT{minutes}M{seconds}S` to `m:ss`. Anything unparseable is `0:00`.
pub fn format_minutes(raw: Option<&str>) -> String {
    raw.and_then(parse_iso_minutes)
        .map(|(m, s)| format!("{m}:{s:02}"))
        .unwrap_or_else(|| "0:00".to_string())
}

fn parse_iso_minutes(raw: &str) -> Option<(u32, u32)> {
    let rest = raw.trim().strip_prefix("PT")?;
    let (minutes, rest) = rest.split_once('M')?;
    let seconds = rest.strip_suffix('S')?;
    let minutes = minutes.parse::<u32>().ok()?;
    let seconds = seconds.parse::<f64>().ok()?;
    if !seconds.is_finite() || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    Some((minutes, seconds.trunc() as u32))
}

/// Upstream percentages are fractions (0.5); some feeds already send 50.0.
fn shooting_line(made: u32, attempted: u32, pct: f64) -> String {
    let pct = if pct <= 1.0 { pct * 100.0 } else { pct };
    format!("{made}-{attempted} ({pct:.1}%)")
}

pub fn headshot_url(player_id: &str) -> String {
    format!("{HEADSHOT_BASE}/{}.png", player_id.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_iso_minutes() {
        assert_eq!(format_minutes(Some("PT34M13.00S")), "34:13");
        assert_eq!(format_minutes(Some("PT05M07.90S")), "5:07");
        assert_eq!(format_minutes(Some("PT0M0S")), "0:00");
        assert_eq!(format_minutes(None), "0:00");
        assert_eq!(format_minutes(Some("garbage")), "0:00");
        assert_eq!(format_minutes(Some("PT12M")), "0:00");
    }

    #[test]
    fn shooting_lines_render_percent() {
        let stats = PlayerStats {
            fg_made: 9,
            fg_attempted: 18,
            fg_pct: 0.5,
            ft_made: 4,
            ft_attempted: 5,
            ft_pct: 80.0,
            ..PlayerStats::default()
        };
        assert_eq!(stats.fg_line(), "9-18 (50.0%)");
        assert_eq!(stats.ft_line(), "4-5 (80.0%)");
        assert_eq!(stats.three_pt_line(), "0-0 (0.0%)");
    }

    #[test]
    fn headshot_uses_player_id() {
        assert_eq!(
            headshot_url("2544"),
            "https://cdn.nba.com/headshots/nba/latest/1040x760/2544.png"
        );
    }
}
