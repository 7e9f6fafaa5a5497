//! Flight-log analysis controller
//!
//! This crate provides:
//! - **Ingestion**: `ingest` classifies user files into log text, a notice, or an image
//! - **Prompting**: `prompt::assemble` merges hardware metadata, log text and image data
//! - **Orchestration**: `Analyzer` streams the report and drives the follow-up chat
//! - **State**: `AnalyzerState`, one explicit record with named update operations
//! - **Rendering**: `render_report` classifies report lines for display
//!
//! # Example
//!
//! ```ignore
//! use skylog_core::{Analyzer, AnalyzerEvent};
//!
//! let (mut analyzer, mut events) = Analyzer::new(model, Some(32768));
//! analyzer.state_mut().set_log_text(log);
//! analyzer.analyze().await?;
//! analyzer.ask("Why does motor 3 run hot?").await;
//! ```
pub mod analyzer;
pub mod attachment;
pub mod error;
pub mod hardware;
pub mod ingest;
pub mod prompt;
pub mod report;
pub mod session;
pub mod state;

pub use analyzer::{Analyzer, AnalyzerEvent};
pub use attachment::ImageAttachment;
pub use error::AnalysisError;
pub use hardware::{FRAME_TYPES, HardwareContext, HardwareField};
pub use ingest::{Ingested, IngestError, LocalFile, MemoryFile, SourceFile, ingest};
pub use prompt::{AnalysisPrompt, assemble};
pub use report::{ReportLine, ReportView, render_report};
pub use session::{ChatSession, FragmentStream, ModelSession};
pub use state::{AnalyzerState, ChatEntry, EntryRole, Generation};
