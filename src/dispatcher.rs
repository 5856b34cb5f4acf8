//! Command dispatcher: input line lifecycle, history and command routing

use std::time::Instant;

use tracing::{info, warn};

use crate::assistant::{AssistantApi, ContextId, QueryPipeline};
use crate::boot::{self, BootLine};
use crate::command::{self, Command};
use crate::history::{CommandHistory, Direction};
use crate::output::Output;
use crate::prefs::{KeyValueStore, Preferences};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Boot script playing, input inert
    Booting,
    /// Input line present and focused
    Idle,
    /// A command or query is being processed
    Busy,
}

/// Keys the dispatcher reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Enter,
    Up,
    Down,
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
}

/// All mutable state of one running terminal
pub struct Session {
    pub history: CommandHistory,
    pub sound_enabled: bool,
    pub context: Option<ContextId>,
    pub phase: Phase,
    pub started_at: Instant,
}

pub struct Dispatcher<A, S> {
    session: Session,
    prefs: Preferences<S>,
    output: Output,
    pipeline: QueryPipeline<A>,
    script: &'static [BootLine],
    prompt: String,
}

impl<A: AssistantApi, S: KeyValueStore> Dispatcher<A, S> {
    pub fn new(
        pipeline: QueryPipeline<A>,
        prefs: Preferences<S>,
        output: Output,
        script: &'static [BootLine],
        prompt: &str,
    ) -> Self {
        let session = Session {
            history: CommandHistory::new(prefs.load_history()),
            sound_enabled: prefs.load_sound(),
            context: None,
            phase: Phase::Booting,
            started_at: Instant::now(),
        };
        Self {
            session,
            prefs,
            output,
            pipeline,
            script,
            prompt: prompt.to_string(),
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[cfg(test)]
    pub fn output(&self) -> &Output {
        &self.output
    }

    #[cfg(test)]
    pub fn prefs(&self) -> &Preferences<S> {
        &self.prefs
    }

    /// Create the conversation context while the boot script plays, then
    /// open the input line
    pub async fn start(&mut self, play_boot: bool) {
        self.session.phase = Phase::Booting;
        self.output.close_input();

        let output = &self.output;
        let script = self.script;
        let sound_enabled = self.session.sound_enabled;
        let boot = async move {
            if play_boot {
                boot::play(output, script, sound_enabled).await;
            }
        };
        let (context, ()) = tokio::join!(self.pipeline.open_context(output), boot);

        self.session.context = context;
        self.finish_boot();
    }

    /// Replay the boot script from the top
    pub async fn boot(&mut self) {
        self.session.phase = Phase::Booting;
        self.output.close_input();
        boot::play(&self.output, self.script, self.session.sound_enabled).await;
        self.finish_boot();
    }

    fn finish_boot(&mut self) {
        self.session.phase = Phase::Idle;
        self.output.open_input();
        self.output.scroll_to_bottom();
    }

    /// Handle one key; true when it submitted a non-blank line
    pub async fn handle_key(&mut self, key: KeyInput) -> bool {
        if self.session.phase != Phase::Idle || !self.output.has_input() {
            return false;
        }

        match key {
            KeyInput::Enter => {
                let raw = self.output.input_text().unwrap_or_default();
                self.submit(&raw).await;
                return !raw.trim().is_empty();
            }
            KeyInput::Up => self.navigate_history(Direction::Older),
            KeyInput::Down => self.navigate_history(Direction::Newer),
            edit => {
                self.output.edit_input(|input| match edit {
                    KeyInput::Char(c) => input.insert(c),
                    KeyInput::Backspace => input.backspace(),
                    KeyInput::Delete => input.delete(),
                    KeyInput::Left => input.left(),
                    KeyInput::Right => input.right(),
                    KeyInput::Home => input.home(),
                    KeyInput::End => input.end(),
                    KeyInput::Enter | KeyInput::Up | KeyInput::Down => {}
                });
                self.output.keystroke(self.session.sound_enabled);
            }
        }
        false
    }

    pub fn navigate_history(&mut self, direction: Direction) {
        let field = self.output.input_text().unwrap_or_default();
        if let Some(text) = self.session.history.navigate(direction, &field) {
            self.output.edit_input(|input| input.set(&text));
        }
    }

    /// Process one submitted line
    pub async fn submit(&mut self, raw: &str) {
        if raw.trim().is_empty() {
            self.output.open_input();
            return;
        }

        self.session.phase = Phase::Busy;
        self.output.close_input();
        self.output.text(&format!("{}{}\n", self.prompt, raw), None);

        self.session.history.push(raw);
        if let Err(e) = self.prefs.save_history(self.session.history.entries()) {
            warn!("failed to save command history: {}", e);
        }

        let command = Command::classify(raw);
        info!(?command, "dispatching");

        match command {
            Command::Clear => self.output.clear(),
            Command::Help => self.output.system(command::HELP_TEXT),
            Command::Status => {
                let report = command::status_report(self.session.started_at.elapsed());
                self.output.system(&report);
            }
            Command::Sound => {
                self.session.sound_enabled = !self.session.sound_enabled;
                if let Err(e) = self.prefs.save_sound(self.session.sound_enabled) {
                    warn!("failed to save sound preference: {}", e);
                }
                self.output.system(&command::sound_report(self.session.sound_enabled));
            }
            Command::Reset => {
                self.output.clear();
                self.boot().await;
                return;
            }
            Command::Query(text) => {
                self.pipeline
                    .query(self.session.context.as_ref(), &text, &self.output)
                    .await;
            }
        }

        self.session.phase = Phase::Idle;
        self.output.open_input();
        self.output.scroll_to_bottom();
    }
}
