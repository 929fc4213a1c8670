use crate::config::AppConfig;
use crate::dashboard;
use crate::history::{ChatEntry, Role};
use crate::logger::{Logger, SessionMetrics};
use crate::session::{self, AssistantSession};
use crate::utils::{extract_citations, preview};
use colored::*;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Context, Editor, Helper, Highlighter, Validator};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Available slash commands for tab-completion.
const COMMANDS: &[&str] = &[
    "/help", "/quit", "/exit", "/init", "/clear", "/status",
    "/config", "/samples", "/ask", "/history", "/stats",
];

/// Preset sample questions exposed through `/samples` and `/ask N`.
const SAMPLE_QUESTIONS: &[&str] = &[
    "What is bioluminescence and how does it help marine life?",
    "How does night imagery support disaster response?",
    "What causes the urban heat island effect?",
    "How do city lights reveal urban development patterns?",
    "What can satellite imagery tell us about North vs South Korea?",
];

/// Rustyline helper providing slash-command tab-completion and inline hints.
#[derive(Helper, Validator, Highlighter)]
struct CommandCompleter;

impl Hinter for CommandCompleter {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        // Only hint when cursor is at end and line starts with '/'
        if pos != line.len() || !line.starts_with('/') || line.contains(' ') {
            return None;
        }

        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && **cmd != line)
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only complete when the cursor is at the first word and it starts with '/'
        let prefix = &line[..pos];
        if !prefix.starts_with('/') || prefix.contains(' ') {
            return Ok((0, vec![]));
        }

        let matches: Vec<Pair> = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

pub fn print_banner() {
    println!("{}", "====================================".bright_cyan());
    println!("{}", "   EARTH AT NIGHT AI ASSISTANT      ".bright_cyan().bold());
    println!("{}", "====================================".bright_cyan());
    println!("{}", " Retrieval-augmented Q&A with source citations".bright_white());
    println!("{}\n", " Type /init to connect, /help for commands".dimmed());
}

/// Start a spinner animation in a background thread.
/// Returns an `Arc<AtomicBool>`; set it to `false` to stop the spinner.
fn start_spinner(message: &str) -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    let msg = message.to_string();

    std::thread::spawn(move || {
        let frames = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
        let mut i = 0;
        while running_clone.load(Ordering::Relaxed) {
            print!("\r{} {} ", frames[i % frames.len()].to_string().cyan(), msg.dimmed());
            let _ = io::stdout().flush();
            std::thread::sleep(std::time::Duration::from_millis(80));
            i += 1;
        }
        // Clear the spinner line
        print!("\r{}\r", " ".repeat(msg.len() + 4));
        let _ = io::stdout().flush();
    });

    running
}

/// Stop a running spinner.
fn stop_spinner(handle: &Arc<AtomicBool>) {
    handle.store(false, Ordering::Relaxed);
    // Give the spinner thread time to clear the line
    std::thread::sleep(std::time::Duration::from_millis(100));
}

fn render_entry(entry: &ChatEntry) {
    match entry.role {
        Role::User => {
            println!(
                "\n{} {}",
                format!("🧑 {} ({}):", entry.role.label(), entry.timestamp).bright_blue().bold(),
                entry.content
            );
        }
        Role::Assistant => {
            println!(
                "\n{}\n{}",
                format!("🤖 {} ({}):", entry.role.label(), entry.timestamp).bright_green().bold(),
                entry.content
            );
        }
    }
}

fn print_status(session: &AssistantSession) {
    let status = session.status();
    let (dot, text) = if status.is_connected() {
        ("●".green(), status.describe().green())
    } else {
        ("●".red(), status.describe().red())
    };
    println!("\n{} {}", dot, text);
    if let Some(thread_id) = session.thread_id() {
        println!("  {} {}", "Thread:".dimmed(), thread_id.dimmed());
    }
    println!();
}

fn print_config(session: &AssistantSession) {
    match session.settings() {
        Some(settings) => {
            println!("\n{}", "Configuration:".bright_cyan().bold());
            for (key, value) in settings.display_rows() {
                println!("  {:<18} {}", format!("{key}:").dimmed(), value.bright_white());
            }
            println!();
        }
        None => println!("{}", "No configuration loaded yet. Run /init first.".yellow()),
    }
}

fn print_help() {
    println!("\n{}", "Available Commands:".bright_cyan().bold());
    println!("  {}  - Exit the program", "/quit, /exit".green());
    println!("  {}         - Show this help", "/help".green());
    println!("  {}         - Initialize the agent connection", "/init".green());
    println!("  {}        - Clear chat history", "/clear".green());
    println!("  {}       - Show connection status", "/status".green());
    println!("  {}       - Show configuration values", "/config".green());
    println!("  {}      - List the sample questions", "/samples".green());
    println!("  {} <n>    - Ask sample question n", "/ask".green());
    println!("  {}      - Show chat history", "/history".green());
    println!("  {}        - Show session statistics", "/stats".green());
    println!();
}

async fn handle_question(
    question: &str,
    session: &mut AssistantSession,
    logger: &Logger,
    metrics: &mut SessionMetrics,
) {
    metrics.total_turns += 1;
    let _ = logger.log_question(question);

    let spinner = start_spinner("Thinking...");
    let answer = session.ask(question).await;
    stop_spinner(&spinner);

    let _ = logger.log_answer(&answer);
    if session::is_failure_text(&answer) {
        metrics.failed_turns += 1;
    } else {
        metrics.answered_turns += 1;
    }

    // The turn appended exactly two entries; re-render them from the store
    let entries: Vec<&ChatEntry> = session.history().iter().collect();
    for entry in entries.iter().rev().take(2).rev() {
        render_entry(entry);
    }

    let citations = extract_citations(&answer);
    if !citations.is_empty() {
        println!("\n{} {}", "Sources:".dimmed(), citations.join(", ").bright_yellow());
    }
    println!();
}

/// Interactive chat entry point.
pub async fn run_chat(config: &AppConfig) {
    print_banner();

    let logger = Logger::new(&config.log_dir).expect("Failed to create logger");
    let mut metrics = SessionMetrics::new();
    let mut session = AssistantSession::new(config);

    // Set up rustyline editor with tab-completion
    let rl_config = Config::builder()
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(100)
        .build();
    let mut rl: Editor<CommandCompleter, DefaultHistory> =
        Editor::with_config(rl_config).expect("Failed to create line editor");
    rl.set_helper(Some(CommandCompleter));

    loop {
        let readline = rl.readline(&"> ".bright_cyan().bold().to_string());
        let line = match readline {
            Ok(line) => line.trim().to_string(),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                println!("{} {}", "✗ Input error:".red(), e);
                continue;
            }
        };

        if line.is_empty() {
            continue;
        }

        if line == "/quit" || line == "/exit" {
            println!("Goodbye!");
            break;
        }

        if line == "/help" {
            print_help();
            continue;
        }

        if line == "/init" {
            metrics.init_attempts += 1;
            let spinner = start_spinner("Initializing connections...");
            let result = session.initialize().await;
            stop_spinner(&spinner);
            match result {
                Ok(()) => {
                    let _ = logger.log_init("connected");
                    println!("{}", "✓ Agent initialized successfully.".green());
                }
                Err(reason) => {
                    let _ = logger.log_init(&format!("failed: {reason}"));
                    println!("{} {}", "✗ Failed to initialize agent:".red().bold(), reason);
                }
            }
            continue;
        }

        if line == "/clear" {
            session.clear_history();
            println!("{}", "✓ Chat history cleared.".green());
            continue;
        }

        if line == "/status" {
            print_status(&session);
            continue;
        }

        if line == "/config" {
            print_config(&session);
            continue;
        }

        if line == "/samples" {
            println!("\n{}", "Sample Questions:".bright_cyan().bold());
            for (i, question) in SAMPLE_QUESTIONS.iter().enumerate() {
                println!("  {}. {}", i + 1, question.bright_white());
            }
            println!("{}\n", "Ask one with /ask <n>".dimmed());
            continue;
        }

        if line == "/history" {
            if session.history().is_empty() {
                println!("{}", "No chat history yet.".yellow());
            } else {
                println!("\n{}", "Chat History:".bright_cyan().bold());
                for (i, entry) in session.history().iter().enumerate() {
                    let role = match entry.role {
                        Role::User => entry.role.label().bright_blue(),
                        Role::Assistant => entry.role.label().bright_green(),
                    };
                    println!("\n{}. [{}] {}", i + 1, role, entry.timestamp.dimmed());
                    println!("{}", preview(&entry.content, 100).dimmed());
                }
                println!();
            }
            continue;
        }

        if line == "/stats" {
            metrics.display();
            continue;
        }

        if let Some(arg) = line.strip_prefix("/ask") {
            let question = match arg.trim().parse::<usize>() {
                Ok(n) if (1..=SAMPLE_QUESTIONS.len()).contains(&n) => SAMPLE_QUESTIONS[n - 1],
                _ => {
                    println!(
                        "{}",
                        format!("Usage: /ask <1-{}>, see /samples", SAMPLE_QUESTIONS.len()).yellow()
                    );
                    continue;
                }
            };
            handle_question(question, &mut session, &logger, &mut metrics).await;
            continue;
        }

        if line.starts_with('/') {
            println!("{} {}", "Unknown command:".yellow(), line);
            continue;
        }

        // Free text is one blocking turn
        handle_question(&line, &mut session, &logger, &mut metrics).await;
    }

    // Display session statistics on exit
    println!("\n{}", "Session ended.".bright_cyan());
    metrics.display();
}

/// Run the chat with the analytics dashboard served in the background.
pub async fn run_chat_with_dashboard(config: &AppConfig) {
    let state = Arc::new(dashboard::DashboardState::from_env());
    let port = config.dashboard_port;

    tokio::spawn(async move {
        if let Err(e) = dashboard::start_dashboard(state, port).await {
            eprintln!("Dashboard server error: {e:#}");
        }
    });

    println!(
        "{} {}",
        "✓ Analytics dashboard:".green(),
        format!("http://127.0.0.1:{port}/").bright_white()
    );

    run_chat(config).await;
}
