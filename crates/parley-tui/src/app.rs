use std::sync::Arc;

use parley_core::{
    ChatView, EngineBackend, EngineView, PendingRequest, ProgressFn, Provider, SummaryView,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::tui::{AppEvent, EngineEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Chat,
    Summarize,
}

impl Screen {
    pub fn next(self) -> Self {
        match self {
            Screen::Chat => Screen::Summarize,
            Screen::Summarize => Screen::Chat,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::Chat => "Chat",
            Screen::Summarize => "Summarize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// A view plus the mount it belongs to; events from older mounts are dropped
pub struct Mounted<V> {
    pub view: V,
    pub generation: u64,
    /// Cursor position in `view.input()`, in characters
    pub cursor: usize,
    pub scroll: u16,
}

impl<V: EngineView> Mounted<V> {
    fn new(view: V, generation: u64) -> Self {
        Self { view, generation, cursor: 0, scroll: 0 }
    }

    /// Keep the cursor inside the input after it was replaced or cleared
    pub fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.view.input().chars().count());
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Mounted views (each owns its own engine session)
    pub chat: Option<Mounted<ChatView>>,
    pub summary: Option<Mounted<SummaryView>>,
    next_generation: u64,

    // Chat area size for scroll calculations (inner size minus borders)
    pub chat_height: u16,
    pub chat_width: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Engine
    pub provider: Provider,
    pub model: String,
    backend: Arc<dyn EngineBackend>,
    tx: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        provider: Provider,
        model: String,
        backend: Arc<dyn EngineBackend>,
        tx: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Chat,
            input_mode: InputMode::Normal,
            chat: None,
            summary: None,
            next_generation: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            provider,
            model,
            backend,
            tx,
        }
    }

    /// Show `screen`, mounting its view on first visit
    pub fn show(&mut self, screen: Screen) {
        self.screen = screen;
        self.input_mode = InputMode::Normal;
        let mounted = match screen {
            Screen::Chat => self.chat.is_some(),
            Screen::Summarize => self.summary.is_some(),
        };
        if !mounted {
            self.mount(screen);
        }
    }

    /// Discard the current screen's view and start a fresh one
    pub fn remount(&mut self) {
        info!(screen = self.screen.title(), "remounting view");
        self.input_mode = InputMode::Normal;
        self.mount(self.screen);
    }

    fn mount(&mut self, screen: Screen) {
        self.next_generation += 1;
        let generation = self.next_generation;

        let started = match screen {
            Screen::Chat => {
                let mut view = ChatView::new(self.model.clone());
                let started = view.session_mut().begin_loading();
                self.chat = Some(Mounted::new(view, generation));
                started
            }
            Screen::Summarize => {
                let mut view = SummaryView::new(self.model.clone());
                let started = view.session_mut().begin_loading();
                self.summary = Some(Mounted::new(view, generation));
                started
            }
        };
        if started {
            spawn_load(Arc::clone(&self.backend), self.model.clone(), screen, generation, self.tx.clone());
        }
    }

    /// Session of the visible view
    pub fn current_view(&self) -> Option<&dyn EngineView> {
        match self.screen {
            Screen::Chat => self.chat.as_ref().map(|m| &m.view as &dyn EngineView),
            Screen::Summarize => self.summary.as_ref().map(|m| &m.view as &dyn EngineView),
        }
    }

    pub fn can_edit(&self) -> bool {
        self.current_view().is_some_and(|v| v.accepts_input())
    }

    /// Submit the visible view's input, if it can take a request
    pub fn submit(&mut self) {
        let tx = self.tx.clone();
        match self.screen {
            Screen::Chat => {
                if let Some(mounted) = self.chat.as_mut() {
                    if let Some(pending) = mounted.view.begin_submit() {
                        mounted.clamp_cursor();
                        spawn_request(pending, Screen::Chat, mounted.generation, tx);
                        self.input_mode = InputMode::Normal;
                        self.scroll_chat_to_bottom();
                    }
                }
            }
            Screen::Summarize => {
                if let Some(mounted) = self.summary.as_mut() {
                    if let Some(pending) = mounted.view.begin_submit() {
                        mounted.scroll = 0;
                        spawn_request(pending, Screen::Summarize, mounted.generation, tx);
                        self.input_mode = InputMode::Normal;
                    }
                }
            }
        }
    }

    pub fn handle_engine_event(&mut self, screen: Screen, generation: u64, event: EngineEvent) {
        let applied = match screen {
            Screen::Chat => apply_event(self.chat.as_mut(), generation, event),
            Screen::Summarize => apply_event(self.summary.as_mut(), generation, event),
        };
        if !applied {
            debug!(screen = screen.title(), generation, "dropping event from discarded view");
            return;
        }
        if screen == Screen::Chat {
            self.scroll_chat_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.current_view().is_some_and(|v| v.session().is_busy()) {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat so the newest line (or the status line) is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let Some(mounted) = self.chat.as_mut() else { return };

        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };

        let mut total_lines: u16 = 0;
        for msg in mounted.view.transcript() {
            for line in msg.content.lines() {
                total_lines = total_lines.saturating_add(wrapped_rows(line, wrap_width));
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }
        if mounted.view.is_busy() {
            total_lines = total_lines.saturating_add(2); // Status + thinking lines
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        mounted.scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        if let Some(scroll) = self.current_scroll_mut() {
            *scroll = scroll.saturating_add(lines);
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        if let Some(scroll) = self.current_scroll_mut() {
            *scroll = scroll.saturating_sub(lines);
        }
    }

    pub fn scroll_top(&mut self) {
        if let Some(scroll) = self.current_scroll_mut() {
            *scroll = 0;
        }
    }

    fn current_scroll_mut(&mut self) -> Option<&mut u16> {
        match self.screen {
            Screen::Chat => self.chat.as_mut().map(|m| &mut m.scroll),
            Screen::Summarize => self.summary.as_mut().map(|m| &mut m.scroll),
        }
    }

    /// Input buffer and cursor of the visible view
    pub fn current_input_mut(&mut self) -> Option<(&mut String, &mut usize)> {
        match self.screen {
            Screen::Chat => self.chat.as_mut().map(|m| (m.view.input_mut(), &mut m.cursor)),
            Screen::Summarize => self.summary.as_mut().map(|m| (m.view.input_mut(), &mut m.cursor)),
        }
    }
}

/// Rows `line` takes when wrapped at `width` characters
fn wrapped_rows(line: &str, width: usize) -> u16 {
    // Use character count, not byte length, for proper UTF-8 handling
    let rows = line.chars().count() / width.max(1) + 1;
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn apply_event<V: EngineView>(mounted: Option<&mut Mounted<V>>, generation: u64, event: EngineEvent) -> bool {
    let Some(mounted) = mounted.filter(|m| m.generation == generation) else {
        return false;
    };
    let view = &mut mounted.view;
    match event {
        EngineEvent::Progress(fraction) => view.session_mut().report_progress(fraction),
        EngineEvent::Loaded(result) => view.session_mut().finish_loading(result),
        EngineEvent::Replied(result) => view.complete(result),
    }
    true
}

fn spawn_load(
    backend: Arc<dyn EngineBackend>,
    model: String,
    screen: Screen,
    generation: u64,
    tx: UnboundedSender<AppEvent>,
) {
    tokio::spawn(async move {
        let progress_tx = tx.clone();
        let progress: ProgressFn = Arc::new(move |fraction| {
            let _ = progress_tx.send(AppEvent::Engine {
                screen,
                generation,
                event: EngineEvent::Progress(fraction),
            });
        });
        let result = backend.load(&model, progress).await;
        let _ = tx.send(AppEvent::Engine {
            screen,
            generation,
            event: EngineEvent::Loaded(result),
        });
    });
}

fn spawn_request(pending: PendingRequest, screen: Screen, generation: u64, tx: UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let result = pending.send().await;
        let _ = tx.send(AppEvent::Engine {
            screen,
            generation,
            event: EngineEvent::Replied(result),
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_rows() {
        assert_eq!(wrapped_rows("", 10), 1);
        assert_eq!(wrapped_rows("héllo", 10), 1);
        assert_eq!(wrapped_rows(&"x".repeat(25), 10), 3);
    }

    #[test]
    fn test_wrapped_rows_saturates_on_huge_lines() {
        let line = "x".repeat(70_000);
        assert_eq!(wrapped_rows(&line, 1), u16::MAX);
    }
}
