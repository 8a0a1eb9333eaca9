use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::cursor;
use miette::IntoDiagnostic;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Gauge, Paragraph, Widget};
use ratatui::{Terminal, TerminalOptions, Viewport};

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::KiraError;

const TICK: Duration = Duration::from_millis(120);
const SPINNER: &[char] = &['|', '/', '-', '\\'];

#[derive(Debug)]
struct GaugeState {
    total: usize,
    completed: usize,
    failed: usize,
    retries: u32,
    status: String,
    started: Instant,
    // Lines printed above the gauge on the next frame.
    pending: VecDeque<String>,
}

impl GaugeState {
    fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

/// Inline progress gauge of completed jobs over total jobs. Retry notices
/// scroll above the gauge on stdout.
pub struct Tui {
    state: Arc<Mutex<GaugeState>>,
}

struct TuiProgress {
    state: Arc<Mutex<GaugeState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        match event {
            ProgressEvent::Started { total } => {
                state.total = total;
                state.status = "starting".to_string();
            }
            ProgressEvent::Attempt { id, attempt } => {
                state.status = if attempt > 1 {
                    format!("{id} (attempt {attempt})")
                } else {
                    id
                };
            }
            ProgressEvent::Retry { message, .. } => {
                state.retries = state.retries.saturating_add(1);
                state.pending.push_back(message);
            }
            ProgressEvent::Saved {
                id,
                path,
                completed,
                ..
            } => {
                state.completed = completed;
                state.status = format!("saved {id}");
                state.pending.push_back(format!("{id} -> {path}"));
            }
            ProgressEvent::Failed {
                id,
                attempts,
                completed,
                ..
            } => {
                state.completed = completed;
                state.failed += 1;
                state.status = format!("gave up on {id}");
                state
                    .pending
                    .push_back(format!("{id} failed after {attempts} attempt(s)"));
            }
        }
    }
}

impl Tui {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GaugeState {
                total: 0,
                completed: 0,
                failed: 0,
                retries: 0,
                status: "ready".to_string(),
                started: Instant::now(),
                pending: VecDeque::new(),
            })),
        }
    }

    /// Runs `f` on a worker thread while the gauge is redrawn on this one.
    pub fn run<F, R>(&mut self, f: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, KiraError> + Send + 'static,
        R: Send + 'static,
    {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::with_options(
            backend,
            TerminalOptions {
                viewport: Viewport::Inline(2),
            },
        )
        .into_diagnostic()?;
        terminal.hide_cursor().into_diagnostic()?;

        let (tx, rx) = mpsc::channel();
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        let handle = thread::spawn(move || tx.send(f(&sink)));

        let mut tick = 0usize;
        let result = loop {
            self.render(&mut terminal, tick)?;
            if let Some(result) = poll_worker(&rx, TICK) {
                break result;
            }
            tick = tick.wrapping_add(1);
        };
        handle.join().ok();

        self.render(&mut terminal, tick)?;
        terminal.clear().into_diagnostic()?;
        io::stdout().execute(cursor::Show).into_diagnostic()?;
        result.map_err(miette::Report::new)
    }

    fn render(
        &self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        tick: usize,
    ) -> miette::Result<()> {
        let Ok(mut state) = self.state.lock() else {
            return Ok(());
        };
        while let Some(line) = state.pending.pop_front() {
            terminal
                .insert_before(1, |buf| {
                    Paragraph::new(line).render(buf.area, buf);
                })
                .into_diagnostic()?;
        }

        let elapsed = state.started.elapsed().as_secs();
        let spinner = SPINNER[tick % SPINNER.len()];
        let header = Line::from(vec![
            Span::styled(
                format!("{spinner} kira-ef "),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(state.status.clone()),
            Span::styled(
                format!(
                    "  retries={} failed={} elapsed={elapsed}s",
                    state.retries, state.failed
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
            .ratio(state.ratio())
            .label(format!("{}/{}", state.completed, state.total));

        terminal
            .draw(|frame| {
                let [top, bottom] =
                    Layout::vertical([Constraint::Length(1), Constraint::Length(1)])
                        .areas(frame.area());
                frame.render_widget(Paragraph::new(header), top);
                frame.render_widget(gauge, bottom);
            })
            .into_diagnostic()?;
        Ok(())
    }
}

/// Waits up to `tick` for the worker's result. A worker that hangs up without
/// sending (it panicked) yields [`KiraError::Worker`].
fn poll_worker<R>(
    rx: &Receiver<Result<R, KiraError>>,
    tick: Duration,
) -> Option<Result<R, KiraError>> {
    match rx.recv_timeout(tick) {
        Ok(result) => Some(result),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Err(KiraError::Worker(
            "worker thread stopped without a result".to_string(),
        ))),
    }
}

impl Default for Tui {
    fn default() -> Self {
        Self::new()
    }
}
