use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use shotlight_terminal::api::ApiClient;
use shotlight_terminal::boxscore::headshot_url;
use shotlight_terminal::config::AppConfig;
use shotlight_terminal::identity::{ClientId, IdentityStore, resolve_client_id};
use shotlight_terminal::live_feed::{EMPTY_SLOT, ON_COURT_SLOTS, Player};
use shotlight_terminal::provider::{self, Backend as FeedBackend};
use shotlight_terminal::state::{
    AppState, CourtSide, ProviderCommand, Screen, apply_delta,
};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    backend_label: &'static str,
}

impl App {
    fn new(state: AppState, cmd_tx: mpsc::Sender<ProviderCommand>, backend_label: &'static str) -> Self {
        Self {
            state,
            should_quit: false,
            cmd_tx,
            backend_label,
        }
    }

    fn send(&mut self, cmd: ProviderCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Background worker is gone");
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.client_id_input.is_some() {
            self.on_edit_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => {
                self.stop_watching();
                self.should_quit = true;
                return;
            }
            KeyCode::Char('?') => {
                self.state.help_overlay = !self.state.help_overlay;
                return;
            }
            _ => {}
        }

        match self.state.screen {
            Screen::DeviceSetup => self.on_setup_key(key),
            Screen::GameSelect => self.on_games_key(key),
            Screen::Watching => self.on_watching_key(key),
            Screen::PlayerProfile => {
                if matches!(key.code, KeyCode::Char('b') | KeyCode::Esc) {
                    self.state.profile = None;
                    self.state.screen = Screen::Watching;
                }
            }
        }
    }

    fn on_edit_key(&mut self, key: KeyEvent) {
        let Some(input) = self.state.client_id_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Esc => self.state.client_id_input = None,
            KeyCode::Enter => {
                let raw = input.clone();
                match ClientId::parse(&raw) {
                    Ok(id) => {
                        self.state.client_id_input = None;
                        self.send(ProviderCommand::ChangeClientId(id));
                    }
                    Err(err) => self.state.push_log(format!("[WARN] {err}")),
                }
            }
            _ => {}
        }
    }

    fn on_setup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('e') => {
                self.state.client_id_input = Some(self.state.client_id.clone());
            }
            KeyCode::Char('t') => {
                self.state.connection_status = Some("Checking...".to_string());
                self.send(ProviderCommand::TestConnection);
            }
            KeyCode::Enter => {
                self.state.screen = Screen::GameSelect;
                if self.state.games_loaded_for != Some(self.state.date) {
                    self.request_games();
                }
            }
            _ => {}
        }
    }

    fn on_games_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.change_date(-1),
            KeyCode::Char('l') | KeyCode::Right => self.change_date(1),
            KeyCode::Char('H') => self.change_date(-7),
            KeyCode::Char('L') => self.change_date(7),
            KeyCode::Char('r') => self.request_games(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('s') => {
                self.stop_watching();
                self.state.screen = Screen::DeviceSetup;
            }
            KeyCode::Char('b') | KeyCode::Esc => self.stop_watching(),
            KeyCode::Enter => {
                if let Some(game) = self.state.selected_game().cloned() {
                    self.state.push_log(format!("[INFO] Selecting {}", game.label()));
                    self.state.request_watch(&game);
                    self.send(ProviderCommand::StartWatching { game });
                    self.send(ProviderCommand::CheckPaused);
                }
            }
            _ => {}
        }
    }

    fn on_watching_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('b') | KeyCode::Esc => self.stop_watching(),
            KeyCode::Char('j') | KeyCode::Down => self.state.court_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.court_prev(),
            KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
                self.state.court_toggle_side()
            }
            KeyCode::Char('p') => {
                let paused = self.state.device_paused.unwrap_or(false);
                self.send(ProviderCommand::SetPaused(!paused));
            }
            KeyCode::Enter => self.open_selected_player(),
            _ => {}
        }
    }

    fn open_selected_player(&mut self) {
        let Some(player) = self.state.selected_player().cloned() else {
            return;
        };
        let Some(game_id) = self.state.watching.as_ref().map(|w| w.game_id.clone()) else {
            return;
        };
        self.state.open_profile(player.clone());
        self.send(ProviderCommand::FetchPlayerStats { game_id, player });
    }

    /// Stops the live session, or one the provider is still starting.
    fn stop_watching(&mut self) {
        let was_pending = self.state.cancel_pending_watch();
        if self.state.watching.is_some() {
            self.send(ProviderCommand::StopWatching);
            self.state.end_watch();
        } else if was_pending {
            self.send(ProviderCommand::StopWatching);
            self.state.push_log("[INFO] Game selection cancelled");
        }
    }

    fn change_date(&mut self, days: i64) {
        self.state.shift_date(days);
        self.request_games();
    }

    fn request_games(&mut self) {
        self.state.games_loading = true;
        self.state.games.clear();
        self.state.selected = 0;
        let date = self.state.date;
        self.send(ProviderCommand::LoadGames { date });
    }
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = AppConfig::from_env();
    let store = IdentityStore::open_default();
    let client_id = resolve_client_id(&store, config.client_id_override.as_deref())?;

    let backend = if config.demo {
        FeedBackend::Demo
    } else {
        FeedBackend::Live(ApiClient::new(&config, client_id.clone())?)
    };
    let backend_label = backend.label();

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let worker = provider::spawn_provider(backend, store, config.poll_interval, tx, cmd_rx);

    let mut state = AppState::new(&client_id, config.start_date);
    state.push_log(format!(
        "[INFO] Client id {client_id} | backend {} | poll {}ms",
        if config.demo { "demo" } else { config.base_url.as_str() },
        config.poll_interval.as_millis()
    ));
    let mut app = App::new(state, cmd_tx, backend_label);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Closing the command channel lets the worker stop any live session.
    drop(app);
    let _ = worker.join();

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<shotlight_terminal::state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::DeviceSetup => render_setup(frame, chunks[1], &app.state),
        Screen::GameSelect => render_games(frame, chunks[1], &app.state),
        Screen::Watching => render_watching(frame, chunks[1], &app.state),
        Screen::PlayerProfile => render_profile(frame, chunks[1], &app.state),
    }

    let footer = Paragraph::new(footer_text(&app.state))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        let area = frame.size();
        render_help_overlay(frame, area);
    }
}

fn header_text(app: &App) -> String {
    let state = &app.state;
    let title = match state.screen {
        Screen::DeviceSetup => "SHOT LIGHT | Device Setup".to_string(),
        Screen::GameSelect => format!("SHOT LIGHT | Games {}", state.date.format("%a %Y-%m-%d")),
        Screen::Watching | Screen::PlayerProfile => match state.watching.as_ref() {
            Some(w) => format!("SHOT LIGHT | {} @ {}", w.away, w.home),
            None => "SHOT LIGHT".to_string(),
        },
    };
    let line1 = format!("  (o)  {title}");
    let line2 = format!("  /|\\  {} | {}", app.backend_label, state.client_id);
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    if state.client_id_input.is_some() {
        return "Type device id | Enter Save | Esc Cancel".to_string();
    }
    match state.screen {
        Screen::DeviceSetup => "e Edit id | t Test connection | Enter Games | ? Help | q Quit",
        Screen::GameSelect => {
            "h/l Day | H/L Week | r Reload | j/k Move | Enter Watch | s Setup | ? Help | q Quit"
        }
        Screen::Watching => {
            "j/k Player | Tab Side | Enter Profile | p Pause/Resume | b/Esc Stop | ? Help | q Quit"
        }
        Screen::PlayerProfile => "b/Esc Back | ? Help | q Quit",
    }
    .to_string()
}

fn render_setup(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(1)])
        .split(area);

    let mut lines = vec![
        Line::from("NBA Shot Lights setup"),
        Line::from(""),
    ];
    match state.client_id_input.as_ref() {
        Some(input) => lines.push(Line::from(vec![
            Span::raw("Device ID: "),
            Span::styled(
                format!("{input}_"),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ])),
        None => lines.push(Line::from(vec![
            Span::raw("Device ID: "),
            Span::styled(state.client_id.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ])),
    }
    lines.push(Line::from("Sport:     NBA"));
    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "Backend:   {}",
        state.connection_status.as_deref().unwrap_or("not checked")
    )));

    let setup = Paragraph::new(lines).block(Block::default().title("Device").borders(Borders::ALL));
    frame.render_widget(setup, rows[0]);

    let console = Paragraph::new(console_text(state, 6))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, rows[1]);
}

fn render_games(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(5)])
        .split(area);

    let block = Block::default()
        .title(format!("Games on {}", state.date.format("%Y-%m-%d")))
        .borders(Borders::ALL);
    let inner = block.inner(rows[0]);
    frame.render_widget(block, rows[0]);

    if state.games_loading {
        let loading = Paragraph::new("Loading games...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(loading, inner);
    } else if state.games.is_empty() {
        let empty = Paragraph::new("No games for this date (r to reload, h/l to change day)")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
    } else {
        let visible = inner.height as usize;
        let (start, end) = visible_range(state.selected, state.games.len(), visible);
        let lines: Vec<Line> = (start..end)
            .map(|idx| {
                let game = &state.games[idx];
                let text = format!(" {:<4} @ {:<4}  {}", game.away, game.home, game.game_id);
                if idx == state.selected {
                    Line::styled(text, Style::default().fg(Color::White).bg(Color::DarkGray))
                } else {
                    Line::from(text)
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    let console = Paragraph::new(console_text(state, 3))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, rows[1]);
}

fn render_watching(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(target) = state.watching.as_ref() else {
        let empty = Paragraph::new("No game selected").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(ON_COURT_SLOTS as u16 + 3),
            Constraint::Min(3),
            Constraint::Length(4),
        ])
        .split(area);

    let mut status = Vec::new();
    if state.feed_paused {
        status.push("FEED PAUSED");
    }
    if state.device_paused == Some(true) {
        status.push("DEVICE PAUSED");
    }
    let score = format!(
        "{}  {} - {}  {}",
        target.away, state.feed.away_score, state.feed.home_score, target.home
    );
    let score_line = if status.is_empty() {
        score
    } else {
        format!("{score}   [{}]", status.join(" | "))
    };
    let header = Paragraph::new(score_line)
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, rows[0]);

    render_on_court(frame, rows[1], state, &target.away, &target.home);

    let log_block = Block::default().title("Play by play").borders(Borders::ALL);
    let log_inner = log_block.inner(rows[2]);
    frame.render_widget(log_block, rows[2]);
    let visible = log_inner.height as usize;
    let start = state.feed.log.len().saturating_sub(visible);
    let log_text = if state.feed.log.is_empty() {
        "Waiting for shots...".to_string()
    } else {
        state.feed.log[start..].join("\n")
    };
    frame.render_widget(Paragraph::new(log_text), log_inner);

    let console = Paragraph::new(console_text(state, 2))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, rows[3]);
}

fn render_on_court(frame: &mut Frame, area: Rect, state: &AppState, away: &str, home: &str) {
    let block = Block::default().title("On Court").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    for (col, side, code) in [(cols[0], CourtSide::Away, away), (cols[1], CourtSide::Home, home)] {
        let roster = match side {
            CourtSide::Away => &state.feed.on_court.away,
            CourtSide::Home => &state.feed.on_court.home,
        };
        let mut lines = vec![Line::styled(
            code.to_uppercase(),
            Style::default().add_modifier(Modifier::BOLD),
        )];
        for slot in 0..ON_COURT_SLOTS {
            let name = roster
                .get(slot)
                .map(|p| state.display_name(p))
                .unwrap_or(EMPTY_SLOT);
            let selected = state.court_side == side && state.court_slot == slot;
            let style = if selected {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default()
            };
            lines.push(Line::styled(format!(" {name}"), style));
        }
        frame.render_widget(Paragraph::new(lines), col);
    }
}

fn render_profile(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(profile) = state.profile.as_ref() else {
        return;
    };
    let text = profile_text(state, &profile.player, profile.stats.as_ref(), profile.loading);
    let panel = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Player").borders(Borders::ALL));
    frame.render_widget(panel, area);
}

fn profile_text(
    state: &AppState,
    player: &Player,
    stats: Option<&shotlight_terminal::boxscore::PlayerStats>,
    loading: bool,
) -> String {
    let mut lines = vec![
        state.display_name(player).to_string(),
        format!("ID: {}", player.id),
        format!("Headshot: {}", headshot_url(&player.id)),
        String::new(),
    ];
    match stats {
        Some(stats) => {
            if let Some(team) = stats.team.as_deref() {
                let pos = stats.position.as_deref().unwrap_or("-");
                let num = stats.jersey_num.as_deref().unwrap_or("-");
                lines.push(format!("{team} | #{num} | {pos}"));
            }
            lines.push(format!(
                "PTS {}  REB {}  AST {}  STL {}  BLK {}  TOV {}",
                stats.points, stats.rebounds, stats.assists, stats.steals, stats.blocks, stats.turnovers
            ));
            lines.push(format!("FG  {}", stats.fg_line()));
            lines.push(format!("3P  {}", stats.three_pt_line()));
            lines.push(format!("FT  {}", stats.ft_line()));
            lines.push(format!("MIN {}", stats.minutes_label()));
        }
        None if loading => lines.push("Loading stats...".to_string()),
        None => lines.push("Stats unavailable".to_string()),
    }
    lines.join("\n")
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &AppState, take: usize) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(take)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Shot Light Terminal - Help",
        "",
        "Global:",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Setup:",
        "  e            Edit device id",
        "  t            Test backend connection",
        "  Enter        Continue to games",
        "",
        "Games:",
        "  h/l  H/L     Previous/next day, week",
        "  j/k or ↑/↓   Move",
        "  Enter        Watch selected game",
        "  b / Esc      Cancel a selection in flight",
        "",
        "Watching:",
        "  j/k  Tab     Move player cursor, switch side",
        "  Enter        Player profile",
        "  p            Pause/resume device",
        "  b / Esc      Stop watching",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
