//! The surface a front end drives, shared by both views.

use crate::chat::ChatView;
use crate::engine::{CompletionResponse, PendingRequest};
use crate::error::EngineResult;
use crate::session::EngineSession;
use crate::summary::SummaryView;

pub trait EngineView {
    fn session(&self) -> &EngineSession;
    fn session_mut(&mut self) -> &mut EngineSession;
    fn input(&self) -> &str;
    fn input_mut(&mut self) -> &mut String;
    fn begin_submit(&mut self) -> Option<PendingRequest>;
    fn complete(&mut self, result: EngineResult<CompletionResponse>);

    /// Input editing is disabled until the session can take a request
    fn accepts_input(&self) -> bool {
        self.session().can_submit()
    }
}

impl EngineView for ChatView {
    fn session(&self) -> &EngineSession {
        ChatView::session(self)
    }

    fn session_mut(&mut self) -> &mut EngineSession {
        ChatView::session_mut(self)
    }

    fn input(&self) -> &str {
        ChatView::input(self)
    }

    fn input_mut(&mut self) -> &mut String {
        ChatView::input_mut(self)
    }

    fn begin_submit(&mut self) -> Option<PendingRequest> {
        ChatView::begin_submit(self)
    }

    fn complete(&mut self, result: EngineResult<CompletionResponse>) {
        ChatView::complete(self, result)
    }
}

impl EngineView for SummaryView {
    fn session(&self) -> &EngineSession {
        SummaryView::session(self)
    }

    fn session_mut(&mut self) -> &mut EngineSession {
        SummaryView::session_mut(self)
    }

    fn input(&self) -> &str {
        SummaryView::input(self)
    }

    fn input_mut(&mut self) -> &mut String {
        SummaryView::input_mut(self)
    }

    fn begin_submit(&mut self) -> Option<PendingRequest> {
        SummaryView::begin_submit(self)
    }

    fn complete(&mut self, result: EngineResult<CompletionResponse>) {
        SummaryView::complete(self, result)
    }
}
