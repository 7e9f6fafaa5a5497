use async_trait::async_trait;
use futures::stream;
use llm::{ChatChunk, ChatModel, ChatPayload, ChatRequest, ChatStream, ContentBlock, Role};
use skylog_core::prompt::{NO_LOG_PLACEHOLDER, SYSTEM_INSTRUCTION};
use skylog_core::{AnalysisError, Analyzer, AnalyzerEvent, ChatEntry, MemoryFile, ReportLine, ReportView};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

enum Reply {
    Fragments(Vec<&'static str>),
    BreaksAfter(Vec<&'static str>, &'static str),
    Refuses(&'static str),
}

/// Plays back one scripted reply per call and records every request
struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> ChatRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

fn chunks(fragments: Vec<&'static str>) -> Vec<anyhow::Result<ChatChunk>> {
    fragments
        .into_iter()
        .map(|f| Ok(ChatChunk::assistant(ChatPayload::text(f))))
        .collect()
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream_chat(&self, request: &ChatRequest) -> anyhow::Result<ChatStream> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Fragments(fragments)) => Ok(Box::pin(stream::iter(chunks(fragments)))),
            Some(Reply::BreaksAfter(fragments, error)) => {
                let mut items = chunks(fragments);
                items.push(Err(anyhow::anyhow!(error)));
                Ok(Box::pin(stream::iter(items)))
            }
            Some(Reply::Refuses(error)) => Err(anyhow::anyhow!(error)),
            None => anyhow::bail!("no scripted reply left"),
        }
    }
}

fn drain(rx: &mut UnboundedReceiver<AnalyzerEvent>) -> Vec<AnalyzerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_report_accumulates_fragments_then_seeds_session() {
    let model = ScriptedModel::new(vec![Reply::Fragments(vec!["A", "B", "C"])]);
    let (mut analyzer, mut rx) = Analyzer::new(model.clone(), Some(32768));
    analyzer.state_mut().set_log_text("GPS, 0, 12, 1.1");

    analyzer.analyze().await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![
            AnalyzerEvent::ReportUpdated("A".to_string()),
            AnalyzerEvent::ReportUpdated("AB".to_string()),
            AnalyzerEvent::ReportUpdated("ABC".to_string()),
            AnalyzerEvent::ReportComplete,
        ]
    );
    assert_eq!(analyzer.state().report(), Some("ABC"));
    assert!(!analyzer.state().is_analyzing());

    let request = model.request(0);
    assert_eq!(request.system_instruction(), Some(SYSTEM_INSTRUCTION));
    assert_eq!(request.thinking_budget(), Some(32768));
    assert_eq!(request.messages().len(), 1);

    let session = analyzer.state().session().unwrap();
    let history = session.history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], request.messages()[0]);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].get_text(), "ABC");
}

#[tokio::test]
async fn test_follow_up_streams_into_last_entry() {
    let model = ScriptedModel::new(vec![
        Reply::Fragments(vec!["report"]),
        Reply::Fragments(vec!["X", "Y"]),
        Reply::Fragments(vec!["Z"]),
    ]);
    let (mut analyzer, mut rx) = Analyzer::new(model.clone(), None);
    analyzer.state_mut().set_log_text("log");
    analyzer.analyze().await.unwrap();
    drain(&mut rx);

    assert!(analyzer.ask("test").await);
    assert_eq!(
        drain(&mut rx),
        vec![
            AnalyzerEvent::ChatEntryAdded(ChatEntry::user("test")),
            AnalyzerEvent::ChatEntryAdded(ChatEntry::model("")),
            AnalyzerEvent::ChatEntryUpdated {
                index: 1,
                text: "X".to_string()
            },
            AnalyzerEvent::ChatEntryUpdated {
                index: 1,
                text: "XY".to_string()
            },
            AnalyzerEvent::ChatComplete,
        ]
    );
    assert_eq!(
        analyzer.state().history(),
        vec![ChatEntry::user("test"), ChatEntry::model("XY")]
    );

    let follow_up = model.request(1);
    assert_eq!(follow_up.messages().len(), 3);
    assert_eq!(follow_up.messages()[1].get_text(), "report");
    assert_eq!(follow_up.messages()[2].get_text(), "test");
    assert_eq!(follow_up.system_instruction(), Some(SYSTEM_INSTRUCTION));

    assert!(analyzer.ask("and then?").await);
    let second = model.request(2);
    assert_eq!(second.messages().len(), 5);
    assert_eq!(second.messages()[3].get_text(), "XY");
    assert_eq!(analyzer.state().history().len(), 4);
}

#[tokio::test]
async fn test_missing_input_makes_no_remote_call() {
    let model = ScriptedModel::new(vec![Reply::Fragments(vec!["unused"])]);
    let (mut analyzer, mut rx) = Analyzer::new(model.clone(), None);

    assert_eq!(analyzer.analyze().await, Err(AnalysisError::MissingInput));
    assert_eq!(model.calls(), 0);
    assert!(matches!(drain(&mut rx).as_slice(), [AnalyzerEvent::AnalysisFailed(_)]));
    assert!(analyzer.state().report().is_none());
    assert!(!analyzer.state().is_analyzing());
}

#[tokio::test]
async fn test_remote_failure_keeps_partial_report() {
    let model = ScriptedModel::new(vec![Reply::BreaksAfter(vec!["### Health"], "stream reset")]);
    let (mut analyzer, mut rx) = Analyzer::new(model.clone(), None);
    analyzer.state_mut().set_log_text("log");

    let error = analyzer.analyze().await.unwrap_err();
    assert_eq!(error, AnalysisError::Remote("stream reset".to_string()));
    assert_eq!(
        drain(&mut rx),
        vec![
            AnalyzerEvent::ReportUpdated("### Health".to_string()),
            AnalyzerEvent::AnalysisFailed("stream reset".to_string()),
        ]
    );

    let state = analyzer.state();
    assert_eq!(state.report(), Some("### Health"));
    assert_eq!(state.error(), Some("stream reset"));
    assert!(!state.is_analyzing());
    assert!(!state.has_session());
    assert_eq!(
        analyzer.report_view(),
        ReportView::Lines(vec![ReportLine::Heading(" Health".to_string())])
    );

    assert!(!analyzer.ask("still there?").await);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_chat_failure_is_annotated() {
    let model = ScriptedModel::new(vec![Reply::Fragments(vec!["report"]), Reply::Refuses("quota exceeded")]);
    let (mut analyzer, mut rx) = Analyzer::new(model.clone(), None);
    analyzer.state_mut().set_log_text("log");
    analyzer.analyze().await.unwrap();
    drain(&mut rx);

    assert!(analyzer.ask("test").await);
    assert_eq!(
        analyzer.state().history(),
        vec![ChatEntry::user("test"), ChatEntry::model("Error: quota exceeded")]
    );
    assert_eq!(drain(&mut rx).last(), Some(&AnalyzerEvent::ChatComplete));

    // The failed turn is not part of the session
    let session = analyzer.state().session().unwrap();
    assert_eq!(session.history().await.len(), 2);
}

#[tokio::test]
async fn test_chat_failure_after_stream_opened_keeps_partial_reply() {
    let model = ScriptedModel::new(vec![
        Reply::Fragments(vec!["report"]),
        Reply::BreaksAfter(vec!["X"], "reset"),
    ]);
    let (mut analyzer, mut rx) = Analyzer::new(model.clone(), None);
    analyzer.state_mut().set_log_text("log");
    analyzer.analyze().await.unwrap();
    drain(&mut rx);

    assert!(analyzer.ask("test").await);
    assert_eq!(
        analyzer.state().history(),
        vec![
            ChatEntry::user("test"),
            ChatEntry::model("X"),
            ChatEntry::model("Error: reset"),
        ]
    );
    assert_eq!(drain(&mut rx).last(), Some(&AnalyzerEvent::ChatComplete));

    let session = analyzer.state().session().unwrap();
    assert_eq!(session.history().await.len(), 2);
}

#[tokio::test]
async fn test_image_only_analysis() {
    let model = ScriptedModel::new(vec![Reply::Fragments(vec!["looks fine"])]);
    let (mut analyzer, _rx) = Analyzer::new(model.clone(), None);

    let file = Arc::new(MemoryFile::new("vibe.PNG", vec![1, 2, 3]));
    analyzer.load_file(file.clone()).await.unwrap();
    assert_eq!(file.reads(), 0);

    analyzer.analyze().await.unwrap();
    assert_eq!(file.reads(), 1);

    let request = model.request(0);
    let message = &request.messages()[0];
    assert!(message.get_text().ends_with(NO_LOG_PLACEHOLDER));
    assert_eq!(
        message.payload.content[1],
        ContentBlock::Image {
            data: "AQID".to_string(),
            mime_type: "image/png".to_string(),
        }
    );
}

#[tokio::test]
async fn test_new_analysis_replaces_session_and_transcript() {
    let model = ScriptedModel::new(vec![
        Reply::Fragments(vec!["first"]),
        Reply::Fragments(vec!["answer"]),
        Reply::Fragments(vec!["second"]),
    ]);
    let (mut analyzer, _rx) = Analyzer::new(model.clone(), None);
    analyzer.state_mut().set_log_text("log");
    analyzer.analyze().await.unwrap();
    analyzer.ask("question").await;
    let first_generation = analyzer.state().generation();

    analyzer.analyze().await.unwrap();
    let state = analyzer.state();
    assert!(state.generation() > first_generation);
    assert_eq!(state.report(), Some("second"));
    assert!(state.history().is_empty());

    let history = state.session().unwrap().history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].get_text(), "second");
}
