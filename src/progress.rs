//! Ephemeral status line multiplexing overlapping progress signals.

use std::io::Write;

use crate::terminal::screen::CLEAR_LINE;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SEGMENT_SEPARATOR: &str = " · ";

/// Aggregates everything currently "in flight" (active tool calls,
/// sub-agent lifecycles, a transient notice) into one overwriting status
/// line, suspended around literal text output so the two never interleave.
pub struct ProgressTracker<W: Write> {
    sink: W,
    tools: Vec<String>,
    subagents: Vec<(String, Option<String>)>,
    subtype: Option<String>,
    notice: Option<String>,
    paused: bool,
    visible: bool,
    frame: usize,
}

impl<W: Write> ProgressTracker<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            tools: Vec::new(),
            subagents: Vec::new(),
            subtype: None,
            notice: None,
            paused: false,
            visible: false,
            frame: 0,
        }
    }

    /// Append a tool to the active set. Duplicate adds are idempotent.
    pub fn tool_started(&mut self, tool: &str) {
        if !self.tools.iter().any(|active| active == tool) {
            self.tools.push(tool.to_string());
        }
        self.redraw();
    }

    /// Remove a tool by value. Removing a non-present tool is a no-op.
    pub fn tool_finished(&mut self, tool: &str) {
        self.tools.retain(|active| active != tool);
        self.redraw();
    }

    /// Record a sub-agent's label and subtype. Re-spawning an existing label
    /// replaces its subtype.
    pub fn subagent_spawned(&mut self, label: &str, subtype: Option<&str>) {
        let subtype = subtype.map(ToString::to_string);
        match self
            .subagents
            .iter_mut()
            .find(|(active, _)| active == label)
        {
            Some(entry) => entry.1 = subtype,
            None => self.subagents.push((label.to_string(), subtype)),
        }
        self.redraw();
    }

    /// Drop a sub-agent regardless of outcome; completion and failure are
    /// both just "no longer active".
    pub fn subagent_finished(&mut self, label: &str) {
        self.subagents.retain(|(active, _)| active != label);
        self.redraw();
    }

    /// Replace the current-subtype scalar shown as a bracketed prefix.
    pub fn set_subtype(&mut self, subtype: &str) {
        self.subtype = if subtype.is_empty() {
            None
        } else {
            Some(subtype.to_string())
        };
        self.redraw();
    }

    /// Set a transient notice segment ("thinking", a task name).
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
        self.redraw();
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
        self.redraw();
    }

    /// Hide the status line before literal text is written. While paused the
    /// line never re-displays until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        self.paused = true;
        self.hide();
    }

    /// Leave the paused state, re-displaying only if work is still active.
    pub fn resume(&mut self) {
        self.paused = false;
        self.redraw();
    }

    /// Advance the spinner and repaint if visible.
    pub fn tick(&mut self) {
        self.frame = self.frame.wrapping_add(1);
        self.redraw();
    }

    /// Hide the line and clear all tracked state. Safe to call repeatedly.
    pub fn finish(&mut self) {
        self.tools.clear();
        self.subagents.clear();
        self.subtype = None;
        self.notice = None;
        self.paused = false;
        self.hide();
    }

    pub fn is_idle(&self) -> bool {
        self.tools.is_empty() && self.subagents.is_empty() && self.notice.is_none()
    }

    /// The line that would be displayed right now, or `None` when hidden.
    pub fn status_line(&self) -> Option<String> {
        if self.paused {
            return None;
        }

        let mut segments = Vec::new();
        if let Some(notice) = &self.notice {
            segments.push(notice.clone());
        }
        for (label, subtype) in &self.subagents {
            match subtype {
                Some(subtype) => segments.push(format!("{label} ({subtype}) running")),
                None => segments.push(format!("{label} running")),
            }
        }
        if !self.tools.is_empty() {
            segments.push(format!("calling {}", self.tools.join(", ")));
        }

        if segments.is_empty() {
            return None;
        }

        let spinner = SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()];
        let prefix = self
            .subtype
            .as_deref()
            .map(|subtype| format!("[{subtype}] "))
            .unwrap_or_default();

        Some(format!(
            "{spinner} {prefix}{}",
            segments.join(SEGMENT_SEPARATOR)
        ))
    }

    fn redraw(&mut self) {
        match self.status_line() {
            Some(line) => {
                let _ = write!(self.sink, "{CLEAR_LINE}{line}");
                let _ = self.sink.flush();
                self.visible = true;
            }
            None => self.hide(),
        }
    }

    fn hide(&mut self) {
        if self.visible {
            let _ = write!(self.sink, "{CLEAR_LINE}");
            let _ = self.sink.flush();
            self.visible = false;
        }
    }
}
