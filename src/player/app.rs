//! Terminal front-end state and event loop for the stem player.
//!
//! The loop is single-threaded: every frame it drains load completions from
//! the player, checks on a running submission, redraws, and handles at most
//! one key. Submissions run on a worker thread and report back over a
//! channel so the UI keeps redrawing while the backend separates.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::info;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::{error::Error, io, thread, time::Duration};

use stemdeck::config::Config;
use stemdeck::constants::{LOG_FILE_NAME, SEEK_STEP, VOLUME_STEP};
use stemdeck::job::{self, HttpJobClient, JobClient, VideoInfo};
use stemdeck::session::{FailureReason, PlayerStatus, SessionNotice, StemPlayer};
use stemdeck::stems::{Stem, StemSet};

use super::ui;

/// What the player should open with.
pub enum PlayTarget {
    Stems {
        stems: StemSet,
        title: Option<String>,
    },
    Submit {
        source: String,
    },
}

type SubmissionResult = Result<(VideoInfo, StemSet), String>;

pub struct App {
    pub player: StemPlayer,
    pub should_quit: bool,
    pub selected: Stem,
    pub title: Option<String>,
    pub message: Option<String>,
    submission: Option<Receiver<SubmissionResult>>,
}

impl App {
    pub fn new(player: StemPlayer) -> Self {
        Self {
            player,
            should_quit: false,
            selected: Stem::MASTER,
            title: None,
            message: None,
            submission: None,
        }
    }

    pub fn load(&mut self, stems: StemSet, title: Option<String>) {
        self.title = title;
        self.message = None;
        let generation = self.player.load_stems(stems);
        info!("Loading stems as session {generation}");
    }

    /// Run the two-step submission in the background. The previous session
    /// is torn down right away.
    pub fn submit(&mut self, source: String, client: Box<dyn JobClient + Send>) {
        self.player.begin_submit();
        self.title = Some(source.clone());
        self.message = None;

        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("submit".to_string())
            .spawn(move || {
                let result = job::submit(client.as_ref(), &source, |phase, info| {
                    info!(
                        "Submission phase {phase:?} ({})",
                        info.and_then(VideoInfo::display_name).unwrap_or("-")
                    );
                })
                .map_err(|e| e.to_string());
                let _ = tx.send(result);
            });

        match spawned {
            Ok(_) => self.submission = Some(rx),
            Err(e) => self.player.submit_failed(e.to_string()),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submission.is_some()
    }

    fn poll_submission(&mut self) {
        let Some(rx) = &self.submission else {
            return;
        };

        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err("submission worker exited".to_string()),
        };
        self.submission = None;

        match result {
            Ok((info, stems)) => {
                let title = info.display_name().map(str::to_string).or(self.title.take());
                self.load(stems, title);
            }
            Err(reason) => {
                log::error!("Submission failed: {reason}");
                self.player.submit_failed(reason);
            }
        }
    }

    /// Per-frame housekeeping.
    pub fn update(&mut self) {
        self.poll_submission();

        for notice in self.player.pump() {
            match notice {
                SessionNotice::AllReady => {
                    self.message = Some("All stems ready, press space to play".to_string());
                }
                SessionNotice::LoadFailed { stem, error } => {
                    self.message = Some(format!("{stem}: {error}"));
                }
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.player.state().playing
    }

    pub fn toggle_playback(&mut self) {
        match self.player.toggle_transport() {
            Ok(playing) => info!("Transport {}", if playing { "playing" } else { "paused" }),
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    pub fn seek_to(&mut self, fraction: f64) {
        if let Err(e) = self.player.seek_master(fraction.clamp(0.0, 1.0)) {
            self.message = Some(e.to_string());
        }
    }

    pub fn seek_relative(&mut self, delta: f64) {
        let target = self.player.master_progress() + delta;
        self.seek_to(target);
    }

    pub fn select_next(&mut self) {
        let next = (self.selected.index() + 1) % Stem::ALL.len();
        self.selected = Stem::ALL[next];
    }

    pub fn select_previous(&mut self) {
        let len = Stem::ALL.len();
        let previous = (self.selected.index() + len - 1) % len;
        self.selected = Stem::ALL[previous];
    }

    fn selected_snapshot(&self) -> Option<(f32, bool)> {
        self.player
            .tracks()
            .into_iter()
            .find(|t| t.stem == self.selected)
            .map(|t| (t.volume, t.muted))
    }

    pub fn adjust_volume(&mut self, delta: f32) {
        let Some((volume, _)) = self.selected_snapshot() else {
            return;
        };
        if let Err(e) = self.player.set_stem_volume(self.selected, volume + delta) {
            self.message = Some(e.to_string());
        }
    }

    pub fn toggle_mute(&mut self) {
        let Some((_, muted)) = self.selected_snapshot() else {
            return;
        };
        if let Err(e) = self.player.set_stem_muted(self.selected, !muted) {
            self.message = Some(e.to_string());
        }
    }

    pub fn reload(&mut self) {
        if self.is_submitting() {
            return;
        }
        match self.player.reload() {
            Ok(_) => self.message = None,
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    pub fn failure_banner(&self) -> Option<String> {
        match self.player.status() {
            PlayerStatus::Failed { reason } => Some(match reason {
                FailureReason::Stems(stems) => {
                    let names: Vec<&str> = stems.iter().map(Stem::as_str).collect();
                    format!("Could not load: {}", names.join(", "))
                }
                FailureReason::Submission(reason) => {
                    format!("Submission failed: {reason}")
                }
            }),
            _ => None,
        }
    }
}

pub fn run(config: Config, target: PlayTarget) -> Result<(), Box<dyn Error>> {
    init_logging()?;
    info!("Starting stemdeck player");

    let player = stemdeck::backend::open_player(&config)?;
    let mut app = App::new(player);

    match target {
        PlayTarget::Stems { stems, title } => app.load(stems, title),
        PlayTarget::Submit { source } => {
            let client = HttpJobClient::from_config(&config)?;
            app.submit(source, Box::new(client));
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.player.teardown();
    info!("Player closed");

    if let Err(e) = res {
        eprintln!("Error: {e}");
        return Err(e);
    }
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    loop {
        app.update();

        terminal.draw(|f| ui::draw(f, app))?;

        // Poll for events with a short timeout to allow continuous rendering
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            handle_key_event(app, key);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char(' ') => app.toggle_playback(),
        KeyCode::Left => app.seek_relative(-SEEK_STEP),
        KeyCode::Right => app.seek_relative(SEEK_STEP),
        KeyCode::Char(c @ '0'..='9') => {
            let tenth = c.to_digit(10).unwrap_or(0);
            app.seek_to(f64::from(tenth) / 10.0);
        }
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_volume(VOLUME_STEP),
        KeyCode::Char('-') => app.adjust_volume(-VOLUME_STEP),
        KeyCode::Char('m') => app.toggle_mute(),
        KeyCode::Char('r') => app.reload(),
        _ => {}
    }
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    use simplelog::{CombinedLogger, LevelFilter, WriteLogger};
    use std::fs::File;

    let log_file = std::env::temp_dir().join(LOG_FILE_NAME);
    CombinedLogger::init(vec![WriteLogger::new(
        LevelFilter::Debug,
        simplelog::Config::default(),
        File::create(log_file)?,
    )])?;

    Ok(())
}
