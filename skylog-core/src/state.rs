//! The single mutable record behind the analyzer, independent of any rendering

use crate::attachment::ImageAttachment;
use crate::hardware::{HardwareContext, HardwareField};
use crate::ingest::{BINARY_LOG_NOTICE, Ingested, READ_ERROR_MESSAGE};
use crate::session::ChatSession;
use std::sync::Arc;

/// Tag of one analysis cycle. Updates carrying an older tag are discarded.
pub type Generation = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryRole {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: EntryRole,
    pub text: String,
}

impl ChatEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: EntryRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: EntryRole::Model,
            text: text.into(),
        }
    }
}

#[derive(Default)]
pub struct AnalyzerState {
    pub hardware: HardwareContext,
    pub log_text: String,
    pub attachment: Option<ImageAttachment>,
    /// `None` until the first analysis starts, then the accumulated report
    report: Option<String>,
    history: Vec<ChatEntry>,
    chat_input: String,
    analyzing: bool,
    error: Option<String>,
    session: Option<Arc<dyn ChatSession>>,
    generation: Generation,
}

impl AnalyzerState {
    pub fn set_field(&mut self, field: HardwareField, value: impl Into<String>) {
        self.hardware.set_field(field, value);
    }

    pub fn set_log_text(&mut self, text: impl Into<String>) {
        self.log_text = text.into();
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    /// Follow-up transcript, oldest first
    pub fn history(&self) -> &[ChatEntry] {
        &self.history
    }

    pub fn chat_input(&self) -> &str {
        &self.chat_input
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    /// Last user-visible error
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_chat_input(&mut self, text: impl Into<String>) {
        self.chat_input = text.into();
    }

    pub fn clear_chat_input(&mut self) {
        self.chat_input.clear();
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = None;
    }

    pub fn apply_ingested(&mut self, ingested: Ingested) {
        self.attachment = None;
        match ingested {
            Ingested::Image(attachment) => self.attachment = Some(attachment),
            Ingested::BinaryLog => self.log_text = BINARY_LOG_NOTICE.to_string(),
            Ingested::Text { text, .. } => self.log_text = text,
        }
        self.error = None;
    }

    /// A failed read keeps the previous log text
    pub fn record_read_error(&mut self) {
        self.record_error(READ_ERROR_MESSAGE);
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn session(&self) -> Option<Arc<dyn ChatSession>> {
        self.session.clone()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Reset report, session, transcript and error for a fresh analysis
    pub fn begin_analysis(&mut self) -> Generation {
        self.generation += 1;
        self.report = Some(String::new());
        self.session = None;
        self.history.clear();
        self.error = None;
        self.analyzing = true;
        self.generation
    }

    /// Append a fragment and return the cumulative report
    pub fn append_report_fragment(&mut self, generation: Generation, fragment: &str) -> Option<&str> {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "Discarding stale report fragment");
            return None;
        }
        let report = self.report.get_or_insert_with(String::new);
        report.push_str(fragment);
        Some(report.as_str())
    }

    pub fn complete_analysis(&mut self, generation: Generation, session: Arc<dyn ChatSession>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.session = Some(session);
        self.analyzing = false;
        true
    }

    /// Partial report text is kept
    pub fn fail_analysis(&mut self, generation: Generation, message: impl Into<String>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.error = Some(message.into());
        self.analyzing = false;
        true
    }

    /// Returns the index of the new entry
    pub fn push_chat_entry(&mut self, entry: ChatEntry) -> usize {
        self.history.push(entry);
        self.history.len() - 1
    }

    /// Overwrite the text of the last transcript entry, returning its index
    pub fn replace_last_entry(&mut self, generation: Generation, text: impl Into<String>) -> Option<usize> {
        if generation != self.generation {
            return None;
        }
        let index = self.history.len().checked_sub(1)?;
        self.history[index].text = text.into();
        Some(index)
    }
}
