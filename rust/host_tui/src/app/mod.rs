use std::fmt;

use chrono::{DateTime, Local};
use color_eyre::{Result, eyre::OptionExt};
use crossterm::event::Event;
use el_messages::{Command, Report, Sample};
use ratatui::{
    DefaultTerminal,
    crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    widgets::ListState,
};

use crate::{
    config::Config,
    event::{EventHandler, TuiEvent},
    plot::PlotWindow,
    recording::Recording,
};

/// Oldest log entries are dropped past this many.
pub const MAX_LOG_ENTRIES: usize = 1000;

/// Everything the user can do, in the order of the commands list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Save,
    SavePlot,
    Close,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Start,
        Action::Stop,
        Action::Save,
        Action::SavePlot,
        Action::Close,
    ];

    /// The keyboard shortcut for a key press, if it has one.
    pub fn from_key(key_event: KeyEvent) -> Option<Action> {
        match key_event.code {
            KeyCode::Char('c' | 'C') if key_event.modifiers == KeyModifiers::CONTROL => {
                Some(Action::Close)
            }
            KeyCode::Esc | KeyCode::Char('q') => Some(Action::Close),
            KeyCode::Char('s') => Some(Action::Start),
            KeyCode::Char('e') => Some(Action::Stop),
            KeyCode::Char('w') => Some(Action::Save),
            KeyCode::Char('p') => Some(Action::SavePlot),
            _ => None,
        }
    }

    pub fn shortcut(self) -> &'static str {
        match self {
            Action::Start => "s",
            Action::Stop => "e",
            Action::Save => "w",
            Action::SavePlot => "p",
            Action::Close => "q",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => write!(f, "Start"),
            Action::Stop => write!(f, "Stop"),
            Action::Save => write!(f, "Save data"),
            Action::SavePlot => write!(f, "Save plot"),
            Action::Close => write!(f, "Close"),
        }
    }
}

/// Where the current run is, as far as the host can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No start command sent yet.
    Idle,
    /// Start sent, waiting for the end marker.
    Running,
    /// The MCU reported the end of the run.
    Ended,
}

/// Application.
#[derive(Debug)]
pub struct App {
    /// Is the application running?
    pub running: bool,
    /// Event handler.
    pub events: EventHandler,
    pub config: Config,
    /// False once the serial link is lost. The recording stays available.
    pub connected: bool,
    /// The state of the commands section.
    pub commands_state: ListState,
    /// Commands sent to the MCU, non-telemetry lines from it and local notices.
    pub messages: Vec<LogEntry>,
    pub recording: Recording,
    pub plot: PlotWindow,
    pub latest: Option<Sample>,
    pub run_state: RunState,
}

impl App {
    /// Constructs a new instance of [`App`].
    pub fn new(events: EventHandler, config: Config) -> Self {
        Self {
            running: true,
            events,
            config,
            connected: true,
            commands_state: ListState::default().with_selected(Some(0)),
            messages: Vec::new(),
            recording: Recording::default(),
            plot: PlotWindow::default(),
            latest: None,
            run_state: RunState::Idle,
        }
    }

    /// Run the application's main loop.
    ///
    /// # Errors
    /// Returns an error if the terminal fails or the recording cannot be saved on close. Unsaved
    /// samples are written to the output file before any error is returned.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        let result = self.main_loop(&mut terminal).await;
        self.finish(result).await
    }

    async fn main_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        terminal.draw(|frame| frame.render_widget(&mut *self, frame.area()))?;
        while self.running {
            let event = self.events.next().await??;
            if self.handle_event(event).await? && self.running {
                terminal.draw(|frame| frame.render_widget(&mut *self, frame.area()))?;
            }
        }
        Ok(())
    }

    /// Keeps the recording if the main loop failed.
    async fn finish(&mut self, result: Result<()>) -> Result<()> {
        let Err(error) = result else {
            return Ok(());
        };
        if !self.recording.has_unsaved() {
            return Err(error);
        }
        let context = match self.recording.save(&self.config.output).await {
            Ok(count) => format!(
                "Stopped after saving {count} samples to {}",
                self.config.output.display()
            ),
            Err(save_error) => format!("The recording was lost: {save_error:#}"),
        };
        Err(error.wrap_err(context))
    }

    /// Updates the state of [`App`] with one event. Returns true if the screen should be redrawn.
    async fn handle_event(&mut self, event: TuiEvent) -> Result<bool> {
        // Samples arrive every millisecond, so only keys and ticks redraw.
        let redraw = match event {
            TuiEvent::Crossterm(Event::Key(key_event))
                if key_event.kind == KeyEventKind::Press =>
            {
                self.handle_key_events(key_event).await?;
                true
            }
            TuiEvent::Crossterm(Event::Resize(..)) | TuiEvent::Tick => true,
            // We're only concerned with key presses and resizes.
            TuiEvent::Crossterm(_) => false,
            TuiEvent::Report(Report::Sample(sample)) => {
                self.record(sample);
                false
            }
            TuiEvent::Report(Report::End) => {
                self.run_state = RunState::Ended;
                self.log(LogEntry::from_mcu(format!(
                    "End of run, {} samples received",
                    self.recording.len()
                )));
                true
            }
            TuiEvent::Console(text) => {
                self.log(LogEntry::from_mcu(text));
                false
            }
            TuiEvent::Disconnected(reason) => {
                self.connected = false;
                self.log(LogEntry::local(reason));
                if self.recording.has_unsaved() {
                    self.save().await;
                }
                true
            }
        };
        Ok(redraw)
    }

    /// Handles the key events and updates the state of [`App`].
    async fn handle_key_events(&mut self, key_event: KeyEvent) -> Result<()> {
        match key_event.code {
            KeyCode::Up => self.commands_state.scroll_up_by(1),
            KeyCode::Down => self.commands_state.scroll_down_by(1),
            KeyCode::Enter => {
                let selected = self
                    .commands_state
                    .selected()
                    .ok_or_eyre("One command is always selected")?;
                if let Some(action) = Action::ALL.get(selected) {
                    self.perform(*action).await?;
                }
            }
            _ => {
                if let Some(action) = Action::from_key(key_event) {
                    self.perform(action).await?;
                }
            }
        }
        Ok(())
    }

    async fn perform(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Start => {
                // Starting over must not lose the previous run.
                if self.recording.has_unsaved() {
                    self.save().await;
                }
                self.recording.clear();
                self.plot.clear();
                self.latest = None;
                if self.send(Command::Start).await {
                    self.run_state = RunState::Running;
                }
            }
            Action::Stop => {
                self.send(Command::Stop).await;
            }
            Action::Save => {
                if self.recording.is_empty() {
                    self.log(LogEntry::local("Nothing to save yet"));
                } else {
                    self.save().await;
                }
            }
            Action::SavePlot => {
                if self.recording.is_empty() {
                    self.log(LogEntry::local("Nothing to plot yet"));
                } else {
                    self.save_plot().await;
                }
            }
            Action::Close => {
                self.send(Command::Stop).await;
                // There is no log left to read after exiting, so a failed save is an error.
                if self.recording.has_unsaved() {
                    self.recording.save(&self.config.output).await?;
                }
                if self.recording.has_unplotted() {
                    self.recording.save_plot(&self.config.plot_output).await?;
                }
                self.running = false;
            }
        }
        Ok(())
    }

    /// Sends `command` and logs it. A failed write is logged too; returns false in that case.
    async fn send(&mut self, command: Command) -> bool {
        match self.events.send(command).await {
            Ok(()) => {
                self.log(LogEntry::to_mcu(command.to_string()));
                true
            }
            Err(error) => {
                self.log(LogEntry::local(format!("{command} failed: {error:#}")));
                false
            }
        }
    }

    /// Saves the recording to the configured file and logs the outcome.
    async fn save(&mut self) {
        let entry = match self.recording.save(&self.config.output).await {
            Ok(count) => LogEntry::local(format!(
                "Saved {count} samples to {}",
                self.config.output.display()
            )),
            Err(error) => LogEntry::local(format!("{error:#}")),
        };
        self.log(entry);
    }

    async fn save_plot(&mut self) {
        let entry = match self.recording.save_plot(&self.config.plot_output).await {
            Ok(count) => LogEntry::local(format!(
                "Plotted {count} samples to {}",
                self.config.plot_output.display()
            )),
            Err(error) => LogEntry::local(format!("{error:#}")),
        };
        self.log(entry);
    }

    fn record(&mut self, sample: Sample) {
        self.plot.push(&sample);
        self.recording.push(sample);
        self.latest = Some(sample);
    }

    fn log(&mut self, entry: LogEntry) {
        if self.messages.len() == MAX_LOG_ENTRIES {
            self.messages.remove(0);
        }
        self.messages.push(entry);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    FromMcu,
    ToMcu,
    Local,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::FromMcu => write!(f, "From MCU"),
            Origin::ToMcu => write!(f, "To MCU"),
            Origin::Local => write!(f, "Host"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub text: String,
    pub origin: Origin,
    pub timestamp: DateTime<Local>,
}

impl LogEntry {
    fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            text: text.into(),
            origin,
            timestamp: Local::now(),
        }
    }

    /// Records a line that was received from the MCU.
    pub fn from_mcu(text: impl Into<String>) -> Self {
        Self::new(text, Origin::FromMcu)
    }

    /// Records a command right after it was sent to the MCU.
    pub fn to_mcu(text: impl Into<String>) -> Self {
        Self::new(text, Origin::ToMcu)
    }

    /// Records something the host did on its own.
    pub fn local(text: impl Into<String>) -> Self {
        Self::new(text, Origin::Local)
    }
}
