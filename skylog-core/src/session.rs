//! Follow-up conversation seeded with a completed analysis

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use llm::{ChatMessage, ChatModel, ChatRequest, ChatStream};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Text fragments of one model reply, in arrival order
pub type FragmentStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send>>;

/// Opaque conversational handle: submit a message, get the reply as fragments
#[async_trait]
pub trait ChatSession: Send + Sync {
    async fn send_stream(&self, message: &str) -> anyhow::Result<FragmentStream>;

    /// Turns committed so far, oldest first
    async fn history(&self) -> Vec<ChatMessage>;
}

/// Reduce a model stream to its non-empty text fragments
pub fn text_fragments(stream: ChatStream) -> FragmentStream {
    Box::pin(stream.filter_map(|item| async move {
        match item {
            Ok(chunk) => {
                let text = chunk.get_text();
                (!text.is_empty()).then_some(Ok(text))
            }
            Err(e) => Some(Err(e)),
        }
    }))
}

/// Chat session backed by a [`ChatModel`]; every request replays the whole history
pub struct ModelSession {
    model: Arc<dyn ChatModel + Send + Sync>,
    system_instruction: String,
    thinking_budget: Option<i32>,
    history: Arc<Mutex<Vec<ChatMessage>>>,
}

impl ModelSession {
    /// Start from an existing exchange, e.g. the analysis request and its report
    pub fn seeded(
        model: Arc<dyn ChatModel + Send + Sync>,
        system_instruction: impl Into<String>,
        thinking_budget: Option<i32>,
        history: Vec<ChatMessage>,
    ) -> Self {
        Self {
            model,
            system_instruction: system_instruction.into(),
            thinking_budget,
            history: Arc::new(Mutex::new(history)),
        }
    }

    fn request<'a>(&self, messages: impl IntoIterator<Item = &'a ChatMessage>) -> ChatRequest {
        let request = ChatRequest::new(messages).with_system_instruction(self.system_instruction.clone());
        match self.thinking_budget {
            Some(budget) => request.with_thinking_budget(budget),
            None => request,
        }
    }
}

#[async_trait]
impl ChatSession for ModelSession {
    async fn send_stream(&self, message: &str) -> anyhow::Result<FragmentStream> {
        let user = ChatMessage::user(message);
        let request = {
            let history = self.history.lock().await;
            self.request(history.iter().chain(std::iter::once(&user)))
        };

        tracing::debug!(
            model = self.model.name(),
            turns = request.messages().len(),
            "Opening follow-up stream"
        );
        let stream = self.model.stream_chat(&request).await?;
        Ok(commit_on_completion(
            text_fragments(stream),
            Arc::clone(&self.history),
            user,
        ))
    }

    async fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().await.clone()
    }
}

struct PendingTurn {
    fragments: FragmentStream,
    history: Arc<Mutex<Vec<ChatMessage>>>,
    user: ChatMessage,
    reply: String,
}

/// Forward fragments; once the stream ends cleanly, record the user turn and the full reply.
/// A failed reply leaves the history untouched.
fn commit_on_completion(
    fragments: FragmentStream,
    history: Arc<Mutex<Vec<ChatMessage>>>,
    user: ChatMessage,
) -> FragmentStream {
    let pending = PendingTurn {
        fragments,
        history,
        user,
        reply: String::new(),
    };

    Box::pin(stream::unfold(Some(pending), |state| async move {
        let Some(mut pending) = state else {
            return None;
        };
        match pending.fragments.next().await {
            Some(Ok(fragment)) => {
                pending.reply.push_str(&fragment);
                Some((Ok(fragment), Some(pending)))
            }
            Some(Err(e)) => Some((Err(e), None)),
            None => {
                let PendingTurn {
                    history, user, reply, ..
                } = pending;
                history.lock().await.extend([user, ChatMessage::assistant(reply)]);
                None
            }
        }
    }))
}
