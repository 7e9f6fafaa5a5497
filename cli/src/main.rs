use anyhow::Context;
use clap::Parser;
use config::{PathManager, Settings, api_key, load_env_file};
use llm::{GeminiProvider, ModelProvider};
use skylog_core::ingest::BINARY_LOG_NOTICE;
use skylog_core::{Analyzer, AnalyzerEvent, EntryRole, HardwareField, LocalFile, ReportLine, ReportView};

use clap_derive::Parser;
use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

mod logging;

#[derive(Parser, Debug)]
#[command(author, version, about = "Analyze drone flight logs with Gemini", long_about = None)]
struct Args {
    /// Flight log or parameter file (.log, .txt, .param), or a screenshot (.png, .jpg, .webp)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Screenshot of log graphs or a parameter screen
    #[arg(long)]
    image: Option<PathBuf>,

    /// Log data given inline; replaces text loaded with --log
    #[arg(long)]
    log_text: Option<String>,

    /// Quadcopter, Hexacopter, Octocopter, Fixed Wing or VTOL [default: Quadcopter]
    #[arg(long)]
    frame_type: Option<String>,

    /// All-up weight in kg [default: 1.2]
    #[arg(long)]
    weight: Option<String>,

    /// Battery cell count [default: 4]
    #[arg(long)]
    cells: Option<String>,

    /// Battery capacity in mAh [default: 1500]
    #[arg(long)]
    capacity: Option<String>,

    /// Motor KV [default: 2400]
    #[arg(long)]
    motor_kv: Option<String>,

    /// Propeller size in inches [default: 5]
    #[arg(long)]
    prop_size: Option<String>,

    /// ESC current rating in amps [default: 45]
    #[arg(long)]
    esc_current: Option<String>,

    /// Gemini model identifier
    #[arg(long, env = "SKYLOG_MODEL")]
    model: Option<String>,

    /// Reasoning token budget for each request
    #[arg(long, env = "SKYLOG_THINKING_BUDGET")]
    thinking_budget: Option<i32>,

    /// Custom base URL for Gemini API (e.g., for proxy)
    #[arg(long, env = "GEMINI_BASE_URL")]
    gemini_url: Option<String>,

    /// Directory for logs and settings instead of the platform default
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Exit after the report instead of opening the follow-up chat
    #[arg(long)]
    no_chat: bool,

    /// List the available Gemini models and exit
    #[arg(long)]
    list_models: bool,

    #[arg(long, short)]
    tracing: bool,
}

/// Streams events to the terminal, printing only the text each update adds
#[derive(Default)]
struct Printer {
    printed: usize,
}

impl Printer {
    fn show(&mut self, event: &AnalyzerEvent) {
        match event {
            AnalyzerEvent::ReportUpdated(text) => self.print_delta(text),
            AnalyzerEvent::ReportComplete => {
                println!();
                self.printed = 0;
            }
            AnalyzerEvent::AnalysisFailed(message) => {
                if self.printed > 0 {
                    println!();
                }
                eprintln!("Error: {}", message);
                self.printed = 0;
            }
            AnalyzerEvent::ChatEntryAdded(entry) => {
                if entry.role == EntryRole::Model {
                    self.printed = 0;
                    if entry.text.is_empty() {
                        print!("\nmodel> ");
                    } else {
                        eprintln!("{}", entry.text);
                    }
                }
            }
            AnalyzerEvent::ChatEntryUpdated { text, .. } => self.print_delta(text),
            AnalyzerEvent::ChatComplete => {
                println!();
                println!();
                self.printed = 0;
            }
        }
        let _ = io::stdout().flush();
    }

    fn print_delta(&mut self, text: &str) {
        if let Some(delta) = text.get(self.printed..) {
            print!("{}", delta);
        }
        self.printed = text.len();
    }
}

/// Run one analyzer operation while printing its events as they arrive
async fn drive<F: Future>(
    operation: F,
    events: &mut UnboundedReceiver<AnalyzerEvent>,
    printer: &mut Printer,
) -> F::Output {
    tokio::pin!(operation);
    let output = loop {
        tokio::select! {
            biased;
            Some(event) = events.recv() => printer.show(&event),
            output = &mut operation => break output,
        }
    };
    while let Ok(event) = events.try_recv() {
        printer.show(&event);
    }
    output
}

fn print_status_bar(analyzer: &Analyzer) {
    let terminal_width: usize = 80;
    let hw = &analyzer.state().hardware;
    let status = format!(
        " {} • {} • {}S {}mAh • {}KV ",
        analyzer.model_name(),
        hw.frame_type, hw.battery_cells, hw.battery_capacity_mah, hw.motor_kv
    );
    let padding = terminal_width.saturating_sub(status.chars().count());
    let left_pad = padding / 2;
    let right_pad = padding - left_pad;

    println!("┌{}┐", "─".repeat(terminal_width - 2));
    println!("│{}{}{}│", " ".repeat(left_pad), status, " ".repeat(right_pad));
    println!("└{}┘", "─".repeat(terminal_width - 2));
}

fn print_report(view: ReportView) {
    match view {
        ReportView::Skeleton => println!("(analysis in progress)"),
        ReportView::Empty => println!("No report yet."),
        ReportView::Lines(lines) => {
            for line in lines {
                match line {
                    ReportLine::Heading(text) => {
                        let title = text.trim();
                        println!();
                        println!("{}", title);
                        println!("{}", "═".repeat(title.chars().count()));
                    }
                    ReportLine::SubHeading(text) => println!("▸ {}", text.trim()),
                    ReportLine::ListItem(text) => println!("  • {}", text.trim()),
                    ReportLine::Paragraph(text) => println!("{}", text),
                }
            }
        }
    }
}

// Slash command parsing and handling
mod commands {
    use super::*;

    pub enum Command {
        Quit,
        Help,
        Report,
        History,
    }

    pub enum CommandResult {
        Continue,
        Exit,
    }

    impl Command {
        pub fn parse(input: &str) -> Result<Self, String> {
            let Some(rest) = input.strip_prefix('/') else {
                return Err("Not a command".to_string());
            };

            let parts: Vec<&str> = rest.split_whitespace().collect();
            if parts.is_empty() {
                return Err("Empty command".to_string());
            }

            match parts[0] {
                "quit" | "exit" => Ok(Command::Quit),
                "help" => Ok(Command::Help),
                "report" => Ok(Command::Report),
                "history" => Ok(Command::History),
                _ => Err(format!("Unknown command: /{}. Type /help for available commands.", parts[0])),
            }
        }

        pub fn execute(self, analyzer: &Analyzer) -> CommandResult {
            match self {
                Command::Quit => {
                    println!("Goodbye!");
                    CommandResult::Exit
                }
                Command::Help => {
                    print_help();
                    println!();
                    CommandResult::Continue
                }
                Command::Report => {
                    print_report(analyzer.report_view());
                    println!();
                    CommandResult::Continue
                }
                Command::History => {
                    let history = analyzer.state().history();
                    if history.is_empty() {
                        println!("No follow-up questions yet.");
                    }
                    for entry in history {
                        let who = match entry.role {
                            EntryRole::User => "you",
                            EntryRole::Model => "model",
                        };
                        println!("{}> {}", who, entry.text);
                    }
                    println!();
                    CommandResult::Continue
                }
            }
        }
    }

    fn print_help() {
        println!("Ask follow-up questions about the report, or use a command:");
        println!("  /report                - Show the report with its structure");
        println!("  /history               - Show the follow-up conversation");
        println!("  /quit, /exit           - Exit");
        println!("  /help                  - Show this help message");
        println!("  Ctrl+D                 - Exit");
    }
}

/// Apply hardware flags, files and inline text to the analyzer state
async fn load_inputs(analyzer: &mut Analyzer, args: &Args) {
    let fields = [
        (HardwareField::FrameType, &args.frame_type),
        (HardwareField::Weight, &args.weight),
        (HardwareField::BatteryCells, &args.cells),
        (HardwareField::BatteryCapacity, &args.capacity),
        (HardwareField::MotorKv, &args.motor_kv),
        (HardwareField::PropellerSize, &args.prop_size),
        (HardwareField::EscCurrent, &args.esc_current),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            analyzer.state_mut().set_field(field, value.as_str());
        }
    }
    if !analyzer.state().hardware.has_known_frame_type() {
        tracing::warn!(frame_type = %analyzer.state().hardware.frame_type, "Unlisted frame type");
    }

    for path in [&args.log, &args.image].into_iter().flatten() {
        match LocalFile::open(path).await {
            Ok(file) => {
                if analyzer.load_file(Arc::new(file)).await.is_err() {
                    if let Some(error) = analyzer.state().error() {
                        eprintln!("{}: {}", path.display(), error);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to open file");
                analyzer.state_mut().record_read_error();
                eprintln!("{}: {}", path.display(), e);
            }
        }
    }

    if let Some(text) = &args.log_text {
        analyzer.state_mut().set_log_text(text.as_str());
    }
}

async fn list_models(provider: &GeminiProvider) -> anyhow::Result<()> {
    let models = provider.list_models().await?;
    for model in models {
        println!("{:<32} {}", model.id, model.name());
    }
    Ok(())
}

async fn chat_loop(
    analyzer: &mut Analyzer,
    events: &mut UnboundedReceiver<AnalyzerEvent>,
    printer: &mut Printer,
) -> anyhow::Result<()> {
    println!();
    println!("Ask a follow-up question. Type /help for commands, Ctrl+D or /quit to exit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("Error reading input")? else {
            println!();
            println!("Goodbye!");
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        // Try to parse as command
        if input.starts_with('/') {
            match commands::Command::parse(input) {
                Ok(cmd) => match cmd.execute(analyzer) {
                    commands::CommandResult::Exit => break,
                    commands::CommandResult::Continue => continue,
                },
                Err(err) => {
                    println!("{}", err);
                    println!();
                    continue;
                }
            }
        }

        analyzer.state_mut().set_chat_input(input);
        drive(analyzer.send_chat(), events, printer).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    load_env_file();
    let args = Args::parse();

    if let Some(dir) = &args.data_dir {
        PathManager::set_data_dir(dir.clone());
    }
    let _log_guard = logging::init_logging(args.tracing);
    let settings = Settings::load();

    let api_key = api_key();
    let provider = match args.gemini_url.as_ref().or(settings.gemini_base_url.as_ref()) {
        Some(url) => GeminiProvider::new(url, &api_key)?,
        None => GeminiProvider::default(&api_key)?,
    };

    if args.list_models {
        list_models(&provider).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let model_name = args.model.clone().unwrap_or_else(|| settings.model().to_string());
    let thinking_budget = args.thinking_budget.unwrap_or_else(|| settings.thinking_budget());
    let model = provider
        .create_chat_model(&model_name)
        .with_context(|| format!("Failed to create model {}", model_name))?;
    tracing::info!(model = %model_name, thinking_budget, "Starting skylog");

    let (mut analyzer, mut events) = Analyzer::new(model, Some(thinking_budget));
    load_inputs(&mut analyzer, &args).await;

    if analyzer.state().log_text == BINARY_LOG_NOTICE {
        eprintln!("{}", BINARY_LOG_NOTICE);
        if analyzer.state().attachment.is_none() {
            return Ok(ExitCode::FAILURE);
        }
    }

    print_status_bar(&analyzer);
    println!();

    let mut printer = Printer::default();
    if drive(analyzer.analyze(), &mut events, &mut printer).await.is_err() {
        return Ok(ExitCode::FAILURE);
    }

    if !args.no_chat {
        chat_loop(&mut analyzer, &mut events, &mut printer).await?;
        println!("Follow-up conversation had {} entries", analyzer.state().history().len());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert!(matches!(commands::Command::parse("/quit"), Ok(commands::Command::Quit)));
        assert!(matches!(commands::Command::parse("/exit"), Ok(commands::Command::Quit)));
        assert!(matches!(commands::Command::parse("/report"), Ok(commands::Command::Report)));
        assert!(matches!(commands::Command::parse("/history"), Ok(commands::Command::History)));
        assert!(commands::Command::parse("/model gemini").is_err());
        assert!(commands::Command::parse("/").is_err());
        assert!(commands::Command::parse("hello").is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from([
            "skylog",
            "--log",
            "flight.log",
            "--cells",
            "6",
            "--frame-type",
            "Fixed Wing",
            "--no-chat",
        ])
        .unwrap();
        assert_eq!(args.log, Some(PathBuf::from("flight.log")));
        assert_eq!(args.cells.as_deref(), Some("6"));
        assert_eq!(args.frame_type.as_deref(), Some("Fixed Wing"));
        assert!(args.no_chat);
        assert!(!args.list_models);
    }

    #[test]
    fn test_printer_tracks_cumulative_text() {
        let mut printer = Printer::default();
        printer.show(&AnalyzerEvent::ReportUpdated("AB".to_string()));
        assert_eq!(printer.printed, 2);
        printer.show(&AnalyzerEvent::ReportUpdated("ABC".to_string()));
        assert_eq!(printer.printed, 3);
        printer.show(&AnalyzerEvent::ReportComplete);
        assert_eq!(printer.printed, 0);
    }
}
