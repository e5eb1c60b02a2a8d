use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;
use log::{ debug, error };
use thiserror::Error;

use super::palette::{ CommandPalette, CommandSuggestion, PaletteKey };
use super::transport::{ ChatTransport, TransportError };
use crate::models::chat::ChatMessage;

/// Appended in place of a reply when the proxy could not be reached or failed.
pub const FALLBACK_REPLY: &str = "I apologize, but I encountered an error. Please try again.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("Nothing to send")]
    EmptyInput,

    #[error("A message is already being sent")]
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Replied,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Tab,
    Enter { shift: bool },
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Not consumed; the caller applies its default behaviour.
    Ignored,
    Handled,
    Send,
}

/// Composer toggles. They are shown to the user but never change the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Toggles {
    pub search: bool,
    pub deep_research: bool,
    pub reason: bool,
}

/// Holds the single send slot. Releasing happens on drop, so every exit path
/// of a send clears the loading flag.
#[derive(Debug)]
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A send that has been recorded in the transcript but not yet dispatched.
#[derive(Debug)]
pub struct PendingSend {
    messages: Vec<ChatMessage>,
    guard: InFlightGuard,
}

impl PendingSend {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub async fn dispatch<T: ChatTransport + ?Sized>(self, transport: &T) -> CompletedSend {
        let result = transport.send(&self.messages).await;
        CompletedSend { result, guard: self.guard }
    }
}

#[derive(Debug)]
pub struct CompletedSend {
    result: Result<ChatMessage, TransportError>,
    guard: InFlightGuard,
}

/// Client-side state of one chat view.
#[derive(Debug, Default)]
pub struct ChatSession {
    input: String,
    transcript: Vec<ChatMessage>,
    in_flight: Arc<AtomicBool>,
    palette: CommandPalette,
    toggles: Toggles,
    attachments: Vec<String>,
    attachment_seq: u32,
    recent_command: Option<&'static str>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn palette(&self) -> &CommandPalette {
        &self.palette
    }

    pub fn toggles(&self) -> Toggles {
        self.toggles
    }

    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    pub fn recent_command(&self) -> Option<&'static str> {
        self.recent_command
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.palette.update(&self.input);
    }

    pub fn handle_key(&mut self, key: Key) -> KeyAction {
        if self.palette.is_visible() {
            let palette_key = match key {
                Key::Up => PaletteKey::Up,
                Key::Down => PaletteKey::Down,
                Key::Tab | Key::Enter { .. } => PaletteKey::Accept,
                Key::Escape => PaletteKey::Escape,
            };
            if let Some(cmd) = self.palette.handle_key(palette_key) {
                self.apply_command(cmd);
            }
            return KeyAction::Handled;
        }

        match key {
            Key::Enter { shift: false } if !self.input.trim().is_empty() => KeyAction::Send,
            Key::Enter { shift: false } => KeyAction::Handled,
            _ => KeyAction::Ignored,
        }
    }

    /// Pointer selection of a palette entry.
    pub fn select_command(&mut self, index: usize) -> Option<&'static CommandSuggestion> {
        let cmd = self.palette.select(index)?;
        self.apply_command(cmd);
        Some(cmd)
    }

    pub fn clear_recent_command(&mut self) {
        self.recent_command = None;
    }

    fn apply_command(&mut self, cmd: &'static CommandSuggestion) {
        self.input = format!("{} ", cmd.prefix);
        self.palette.update(&self.input);
        self.recent_command = Some(cmd.label);
    }

    pub fn toggle_search(&mut self) -> bool {
        self.toggles.search = !self.toggles.search;
        self.toggles.search
    }

    pub fn toggle_deep_research(&mut self) -> bool {
        self.toggles.deep_research = !self.toggles.deep_research;
        self.toggles.deep_research
    }

    pub fn toggle_reason(&mut self) -> bool {
        self.toggles.reason = !self.toggles.reason;
        self.toggles.reason
    }

    /// Adds a placeholder attachment. Nothing is read from disk.
    pub fn attach_file(&mut self) -> &str {
        self.attachment_seq += 1;
        self.attachments.push(format!("file-{}.pdf", self.attachment_seq));
        self.attachments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<String> {
        (index < self.attachments.len()).then(|| self.attachments.remove(index))
    }

    /// Clears the input, records the user message and takes the send slot.
    pub fn begin_send(&mut self) -> Result<PendingSend, SendError> {
        let text = self.input.trim();
        if text.is_empty() {
            return Err(SendError::EmptyInput);
        }
        let guard = InFlightGuard::acquire(&self.in_flight).ok_or(SendError::InFlight)?;

        let message = ChatMessage::user(text);
        self.set_input(String::new());
        self.transcript.push(message);

        Ok(PendingSend {
            messages: self.transcript.clone(),
            guard,
        })
    }

    /// Appends the reply, or the fallback on failure, then frees the slot.
    pub fn finish_send(&mut self, completed: CompletedSend) -> SendOutcome {
        let CompletedSend { result, guard } = completed;
        let outcome = match result {
            Ok(message) => {
                debug!("Received {} reply ({} chars)", message.role, message.content.len());
                self.transcript.push(message);
                SendOutcome::Replied
            }
            Err(e) => {
                error!("Error sending message: {}", e);
                self.transcript.push(ChatMessage::assistant(FALLBACK_REPLY));
                SendOutcome::Failed
            }
        };
        drop(guard);
        outcome
    }

    pub async fn send_message<T: ChatTransport + ?Sized>(
        &mut self,
        transport: &T
    ) -> Result<SendOutcome, SendError> {
        let pending = self.begin_send()?;
        let completed = pending.dispatch(transport).await;
        Ok(self.finish_send(completed))
    }
}
