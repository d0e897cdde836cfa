//! Interactive dashboard session: one render loop fed by three serialized
//! trigger sources (refresh timer, push listener, keyboard).

use std::io::Read;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use tether_api::{
    ActionDefinition, ActionSet, ActionSubmission, RelayApiError, RelayClient, SessionCursor,
    TuiFramePayload,
};

use crate::config::SessionConfig;
use crate::error::EngineError;
use crate::keys::{Key, KeyDecoder};
use crate::push::spawn_push_listener;
use crate::terminal::{screen, SessionTerminal};

const TRIGGER_CAPACITY: usize = 64;
const FOOTER_ROWS: u16 = 2;

/// One message in the serialized trigger queue. Every source of screen
/// mutation posts here, so renders are consumed one at a time and never
/// interleave.
#[derive(Debug)]
pub enum SessionTrigger {
    /// Timer tick or explicit request for a fresh fetch-and-render.
    Refresh,
    /// Asynchronous push frame replacing the displayed content.
    Push(TuiFramePayload),
    /// Raw keyboard bytes.
    Input(Vec<u8>),
    /// Process-level interrupt (SIGINT).
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Initializing,
    AwaitingInput,
    Prompting,
    Terminated,
}

/// Server seam for the dashboard endpoints, so the controller can be driven
/// by a recording fake in tests.
#[allow(async_fn_in_trait)]
pub trait DashboardOps {
    async fn fetch_frame(
        &self,
        cols: u16,
        rows: u16,
        cursor: SessionCursor,
    ) -> Result<String, RelayApiError>;

    async fn fetch_actions(&self) -> Result<ActionSet, RelayApiError>;

    async fn submit_action(
        &self,
        submission: &ActionSubmission,
    ) -> Result<tether_api::ActionOutcome, RelayApiError>;
}

/// [`DashboardOps`] backed by the relay client for one instance.
pub struct InstanceDashboard {
    client: Arc<RelayClient>,
    instance_id: String,
}

impl InstanceDashboard {
    pub fn new(client: Arc<RelayClient>, instance_id: impl Into<String>) -> Self {
        Self {
            client,
            instance_id: instance_id.into(),
        }
    }
}

impl DashboardOps for InstanceDashboard {
    async fn fetch_frame(
        &self,
        cols: u16,
        rows: u16,
        cursor: SessionCursor,
    ) -> Result<String, RelayApiError> {
        self.client
            .fetch_tui_frame(&self.instance_id, cols, rows, Some(cursor))
            .await
    }

    async fn fetch_actions(&self) -> Result<ActionSet, RelayApiError> {
        self.client.fetch_actions(&self.instance_id).await
    }

    async fn submit_action(
        &self,
        submission: &ActionSubmission,
    ) -> Result<tether_api::ActionOutcome, RelayApiError> {
        self.client
            .submit_action(&self.instance_id, submission)
            .await
    }
}

/// Interactive dashboard controller.
///
/// Owns raw keyboard mode for its lifetime. Teardown is idempotent and runs
/// on every exit path, including drop, so raw mode is always restored.
pub struct DashboardSession<T: SessionTerminal, O: DashboardOps> {
    terminal: T,
    ops: O,
    config: SessionConfig,
    rx: mpsc::Receiver<SessionTrigger>,
    keys: KeyDecoder,
    state: SessionState,
    running: bool,
    raw_held: bool,
    cleaned_up: bool,
    cursor: SessionCursor,
    actions: ActionSet,
    screen_content: String,
    error_notice: Option<String>,
    pending_push: Option<TuiFramePayload>,
}

impl<T: SessionTerminal, O: DashboardOps> DashboardSession<T, O> {
    pub fn new(terminal: T, ops: O, config: SessionConfig) -> (Self, mpsc::Sender<SessionTrigger>) {
        let (tx, rx) = mpsc::channel(TRIGGER_CAPACITY);
        let session = Self {
            terminal,
            ops,
            config,
            rx,
            keys: KeyDecoder::default(),
            state: SessionState::Initializing,
            running: true,
            raw_held: false,
            cleaned_up: false,
            cursor: SessionCursor::default(),
            actions: ActionSet::default(),
            screen_content: String::new(),
            error_notice: None,
            pending_push: None,
        };
        (session, tx)
    }

    /// Run to termination. Cleanup happens here on every path, success or
    /// error, and again on drop as a backstop.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        let result = self.drive().await;
        self.shutdown();
        result
    }

    async fn drive(&mut self) -> Result<(), EngineError> {
        self.enter()?;
        self.render(true).await?;

        while self.running {
            let Some(trigger) = self.rx.recv().await else {
                return Err(EngineError::ChannelClosed);
            };
            self.handle_trigger(trigger).await?;
        }

        Ok(())
    }

    fn enter(&mut self) -> Result<(), EngineError> {
        self.terminal.enter_raw()?;
        self.raw_held = true;
        self.terminal
            .write(&format!("{}{}", screen::ALT_SCREEN_ENTER, screen::CURSOR_HIDE));
        Ok(())
    }

    async fn handle_trigger(&mut self, trigger: SessionTrigger) -> Result<(), EngineError> {
        match trigger {
            SessionTrigger::Refresh => self.render(false).await,
            SessionTrigger::Push(payload) => {
                self.apply_push(payload);
                Ok(())
            }
            SessionTrigger::Input(bytes) => {
                for key in self.keys.feed(&bytes) {
                    if !self.running {
                        break;
                    }
                    self.handle_key(key).await?;
                }
                Ok(())
            }
            SessionTrigger::Interrupt => {
                self.terminate();
                Ok(())
            }
        }
    }

    fn apply_push(&mut self, payload: TuiFramePayload) {
        self.screen_content = payload.ansi;
        if let Some(actions) = payload.actions {
            // Action sets are replaced wholesale, never merged.
            self.actions.actions = actions;
        }
        self.draw();
    }

    async fn handle_key(&mut self, key: Key) -> Result<(), EngineError> {
        match key {
            Key::Char('q') | Key::Escape | Key::Interrupt => {
                self.terminate();
                Ok(())
            }
            Key::Up => self.navigate(|cursor, _| cursor.selected = cursor.selected.saturating_sub(1)).await,
            Key::Down => self.navigate(|cursor, _| cursor.selected = cursor.selected.saturating_add(1)).await,
            Key::PageUp => {
                self.navigate(|cursor, step| cursor.scroll = cursor.scroll.saturating_sub(step))
                    .await
            }
            Key::PageDown => {
                self.navigate(|cursor, step| cursor.scroll = cursor.scroll.saturating_add(step))
                    .await
            }
            Key::Char(ch) => {
                let Some(action) = self.actions.action_for_key(&ch.to_string()).cloned() else {
                    // Unmapped key: no state change, no redundant re-render.
                    return Ok(());
                };
                self.run_action(action).await
            }
            Key::Other => Ok(()),
        }
    }

    /// Adjust the cursor locally and re-fetch. The adjustment is a hint; the
    /// server clamps out-of-range values on the next fetch.
    async fn navigate(
        &mut self,
        apply: impl FnOnce(&mut SessionCursor, u32),
    ) -> Result<(), EngineError> {
        if !self.actions.navigable {
            return Ok(());
        }
        apply(&mut self.cursor, self.config.page_step);
        self.render(false).await
    }

    async fn run_action(&mut self, action: ActionDefinition) -> Result<(), EngineError> {
        let needs_line_input = !action.prompts.is_empty() || action.confirm;
        let mut inputs = Vec::with_capacity(action.prompts.len());

        if needs_line_input {
            self.suspend_raw()?;
        }

        for prompt in &action.prompts {
            self.terminal.write(&format!("{prompt}: "));
            match self.read_line().await {
                Some(answer) => inputs.push(answer),
                None => {
                    self.resume_raw()?;
                    self.terminate();
                    return Ok(());
                }
            }
        }

        let mut confirmed = true;
        if action.confirm {
            self.terminal
                .write(&format!("{}: are you sure? [y/N] ", action.label));
            match self.read_line().await {
                Some(answer) => confirmed = answer.trim().eq_ignore_ascii_case("y"),
                None => {
                    self.resume_raw()?;
                    self.terminate();
                    return Ok(());
                }
            }
        }

        if needs_line_input {
            self.resume_raw()?;
        }

        if !confirmed {
            tracing::debug!(action = %action.id, "action cancelled at confirmation");
            return self.render(false).await;
        }

        let submission = ActionSubmission::new(action.id, self.cursor, inputs);
        match self.ops.submit_action(&submission).await {
            Ok(outcome) if outcome.ok => self.render(true).await,
            Ok(outcome) => {
                // Non-fatal: show inline for a fixed short duration, then
                // continue rendering.
                self.error_notice = Some(outcome.failure_message());
                self.draw();
                tokio::time::sleep(self.config.error_display).await;
                self.error_notice = None;
                self.render(true).await
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Release raw mode for a line-oriented prompt sub-flow. Prompt and raw
    /// transitions never overlap: one release covers the whole sub-flow.
    fn suspend_raw(&mut self) -> Result<(), EngineError> {
        self.state = SessionState::Prompting;
        if self.raw_held {
            self.raw_held = false;
            self.terminal.leave_raw()?;
        }
        self.terminal.write("\r\n");
        Ok(())
    }

    fn resume_raw(&mut self) -> Result<(), EngineError> {
        if !self.raw_held {
            self.terminal.enter_raw()?;
            self.raw_held = true;
        }
        self.state = SessionState::AwaitingInput;
        // A push frame that arrived mid-prompt becomes the latest snapshot.
        if let Some(payload) = self.pending_push.take() {
            self.screen_content = payload.ansi;
            if let Some(actions) = payload.actions {
                self.actions.actions = actions;
            }
        }
        Ok(())
    }

    /// Collect one line of cooked-mode input from the trigger queue. While
    /// prompting, refresh ticks are dropped and at most the latest push
    /// frame is stashed so the prompt line is never repainted over.
    async fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        loop {
            let trigger = self.rx.recv().await?;
            match trigger {
                SessionTrigger::Input(bytes) => {
                    line.push_str(&String::from_utf8_lossy(&bytes));
                    if let Some(pos) = line.find('\n') {
                        return Some(line[..pos].trim_end_matches('\r').to_string());
                    }
                }
                SessionTrigger::Push(payload) => self.pending_push = Some(payload),
                SessionTrigger::Refresh => {}
                SessionTrigger::Interrupt => return None,
            }
        }
    }

    async fn render(&mut self, refresh_actions: bool) -> Result<(), EngineError> {
        let (cols, rows) = self.terminal.size();
        let body_rows = rows.saturating_sub(FOOTER_ROWS);
        self.screen_content = self.ops.fetch_frame(cols, body_rows, self.cursor).await?;
        if refresh_actions {
            self.actions = self.ops.fetch_actions().await?;
        }
        if self.state == SessionState::Initializing {
            self.state = SessionState::AwaitingInput;
        }
        self.draw();
        Ok(())
    }

    fn draw(&mut self) {
        let mut out = String::with_capacity(self.screen_content.len() + 128);
        out.push_str(screen::CLEAR);
        out.push_str(&self.screen_content);
        out.push_str("\r\n");
        out.push_str(&self.footer());
        if let Some(notice) = &self.error_notice {
            out.push_str("\r\n\x1b[7m ");
            out.push_str(notice);
            out.push_str(" \x1b[0m");
        }
        self.terminal.write(&out);
    }

    fn footer(&self) -> String {
        let mut hints = vec!["q quit".to_string()];
        if self.actions.navigable {
            hints.push("↑/↓ move".to_string());
            hints.push("pgup/pgdn scroll".to_string());
        }
        for action in &self.actions.actions {
            hints.push(format!("{} {}", action.key, action.label));
        }
        format!("\x1b[2m{}\x1b[0m", hints.join("  "))
    }

    fn terminate(&mut self) {
        self.running = false;
        self.state = SessionState::Terminated;
    }

    /// Idempotent teardown: restore raw mode at most once, close the trigger
    /// queue, and leave the alternate screen.
    pub fn shutdown(&mut self) {
        self.running = false;
        self.state = SessionState::Terminated;
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        self.rx.close();
        if self.raw_held {
            self.raw_held = false;
            let _ = self.terminal.leave_raw();
        }
        self.terminal.write(&format!(
            "{}{}{}",
            screen::CLEAR,
            screen::CURSOR_SHOW,
            screen::ALT_SCREEN_EXIT
        ));
    }
}

impl<T: SessionTerminal, O: DashboardOps> Drop for DashboardSession<T, O> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run a full interactive session against one instance: raw keyboard
/// capture, periodic refresh, live push updates, and SIGINT handling, all
/// serialized through the session's trigger queue.
#[cfg(unix)]
pub async fn run_dashboard(
    client: Arc<RelayClient>,
    instance_id: &str,
    config: SessionConfig,
) -> Result<(), EngineError> {
    let terminal = crate::terminal::ProcessTerminal::new();
    let ops = InstanceDashboard::new(Arc::clone(&client), instance_id);
    let (mut session, tx) = DashboardSession::new(terminal, ops, config.clone());

    let timer = spawn_refresh_timer(tx.clone(), config.refresh_interval);
    let interrupts = spawn_interrupt_forwarder(tx.clone());
    let push = spawn_push_listener(Arc::clone(&client), instance_id.to_string(), tx.clone());
    let _stdin_reader = spawn_stdin_reader(tx);

    let result = session.run().await;

    push.stop();
    timer.abort();
    interrupts.abort();
    result
}

fn spawn_refresh_timer(
    tx: mpsc::Sender<SessionTrigger>,
    period: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately; the initial render covers it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if tx.send(SessionTrigger::Refresh).await.is_err() {
                break;
            }
        }
    })
}

fn spawn_interrupt_forwarder(tx: mpsc::Sender<SessionTrigger>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(SessionTrigger::Interrupt).await.is_err() {
                break;
            }
        }
    })
}

/// Blocking stdin reader on a dedicated thread; exits when the trigger
/// queue closes.
fn spawn_stdin_reader(tx: mpsc::Sender<SessionTrigger>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut stdin = std::io::stdin();
        let mut buf = [0u8; 64];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) => break,
                Ok(count) => {
                    if tx
                        .blocking_send(SessionTrigger::Input(buf[..count].to_vec()))
                        .is_err()
                    {
                        break;
                    }
                }
                Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    })
}
