use crate::error::AnalysisError;
use crate::ingest::{IngestError, SourceFile, ingest};
use crate::prompt;
use crate::report::ReportView;
use crate::session::{ChatSession, ModelSession, text_fragments};
use crate::state::{AnalyzerState, ChatEntry, Generation};
use futures::StreamExt;
use llm::{ChatMessage, ChatModel, ChatRequest};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerEvent {
    /// Cumulative report text after each fragment
    ReportUpdated(String),
    ReportComplete,
    AnalysisFailed(String),
    ChatEntryAdded(ChatEntry),
    ChatEntryUpdated { index: usize, text: String },
    ChatComplete,
}

/// Drives analysis and follow-up chat over an [`AnalyzerState`], announcing every
/// state change on the event channel returned by [`Analyzer::new`].
pub struct Analyzer {
    model: Arc<dyn ChatModel + Send + Sync>,
    thinking_budget: Option<i32>,
    state: AnalyzerState,
    event_tx: mpsc::UnboundedSender<AnalyzerEvent>,
}

impl Analyzer {
    pub fn new(
        model: Arc<dyn ChatModel + Send + Sync>,
        thinking_budget: Option<i32>,
    ) -> (Self, mpsc::UnboundedReceiver<AnalyzerEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let analyzer = Self {
            model,
            thinking_budget,
            state: AnalyzerState::default(),
            event_tx,
        };
        (analyzer, event_rx)
    }

    pub fn state(&self) -> &AnalyzerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AnalyzerState {
        &mut self.state
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn report_view(&self) -> ReportView {
        ReportView::new(self.state.report(), self.state.is_analyzing())
    }

    fn emit(&self, event: AnalyzerEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Ingest a user-selected file into the log text or the image slot.
    /// Any earlier image is dropped first, even if the new file fails to read.
    pub async fn load_file(&mut self, file: Arc<dyn SourceFile>) -> Result<(), IngestError> {
        self.state.clear_attachment();
        let name = file.name().to_string();
        match ingest(file).await {
            Ok(ingested) => {
                self.state.apply_ingested(ingested);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Failed to read file");
                self.state.record_read_error();
                Err(e)
            }
        }
    }

    /// Stream a report for the current inputs, then seed a chat session with the exchange.
    pub async fn analyze(&mut self) -> Result<(), AnalysisError> {
        if self.state.is_analyzing() {
            return Err(AnalysisError::InProgress);
        }
        if !prompt::has_input(&self.state.log_text, self.state.attachment.as_ref()) {
            let error = AnalysisError::MissingInput;
            self.state.record_error(error.to_string());
            self.emit(AnalyzerEvent::AnalysisFailed(error.to_string()));
            return Err(error);
        }

        let generation = self.state.begin_analysis();
        tracing::info!(generation, model = self.model.name(), "Starting analysis");

        match self.run_analysis(generation).await {
            Ok(session) => {
                self.state.complete_analysis(generation, session);
                tracing::info!(generation, "Analysis complete");
                self.emit(AnalyzerEvent::ReportComplete);
                Ok(())
            }
            Err(error) => {
                let message = error.to_string();
                tracing::error!(generation, error = %message, "Analysis failed");
                self.state.fail_analysis(generation, message.clone());
                self.emit(AnalyzerEvent::AnalysisFailed(message));
                Err(error)
            }
        }
    }

    async fn run_analysis(&mut self, generation: Generation) -> Result<Arc<dyn ChatSession>, AnalysisError> {
        let prompt = prompt::assemble(
            &self.state.hardware,
            &self.state.log_text,
            self.state.attachment.as_ref(),
        )
        .await?;

        let mut request =
            ChatRequest::new([&prompt.message]).with_system_instruction(prompt.system_instruction.clone());
        if let Some(budget) = self.thinking_budget {
            request = request.with_thinking_budget(budget);
        }

        let stream = self
            .model
            .stream_chat(&request)
            .await
            .map_err(|e| AnalysisError::remote(&e))?;

        let mut fragments = text_fragments(stream);
        let mut reply = String::new();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment.map_err(|e| AnalysisError::remote(&e))?;
            reply.push_str(&fragment);
            if let Some(report) = self
                .state
                .append_report_fragment(generation, &fragment)
                .map(str::to_owned)
            {
                self.emit(AnalyzerEvent::ReportUpdated(report));
            }
        }

        let session = ModelSession::seeded(
            Arc::clone(&self.model),
            prompt.system_instruction,
            self.thinking_budget,
            vec![prompt.message, ChatMessage::assistant(reply)],
        );
        Ok(Arc::new(session))
    }

    /// Send the current chat input as a follow-up question
    pub async fn send_chat(&mut self) -> bool {
        let message = self.state.chat_input().to_string();
        self.ask(message).await
    }

    /// Ask a follow-up question. Returns `false` without doing anything when the
    /// message is blank or no analysis has completed yet.
    pub async fn ask(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if message.trim().is_empty() {
            return false;
        }
        let Some(session) = self.state.session() else {
            return false;
        };
        let generation = self.state.generation();

        let user = ChatEntry::user(message.clone());
        self.state.push_chat_entry(user.clone());
        self.state.clear_chat_input();
        self.emit(AnalyzerEvent::ChatEntryAdded(user));

        if let Err(e) = self.stream_reply(session.as_ref(), &message, generation).await {
            let message = format!("{:#}", e);
            tracing::error!(error = %message, "Follow-up failed");
            let entry = ChatEntry::model(format!("Error: {}", message));
            self.state.push_chat_entry(entry.clone());
            self.emit(AnalyzerEvent::ChatEntryAdded(entry));
        }

        self.emit(AnalyzerEvent::ChatComplete);
        true
    }

    async fn stream_reply(
        &mut self,
        session: &dyn ChatSession,
        message: &str,
        generation: Generation,
    ) -> anyhow::Result<()> {
        let mut fragments = session.send_stream(message).await?;

        let entry = ChatEntry::model("");
        self.state.push_chat_entry(entry.clone());
        self.emit(AnalyzerEvent::ChatEntryAdded(entry));

        let mut reply = String::new();
        while let Some(fragment) = fragments.next().await {
            reply.push_str(&fragment?);
            if let Some(index) = self.state.replace_last_entry(generation, reply.clone()) {
                self.emit(AnalyzerEvent::ChatEntryUpdated {
                    index,
                    text: reply.clone(),
                });
            }
        }
        Ok(())
    }
}
