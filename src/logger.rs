use crate::utils::preview;
use anyhow::Result;
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Append-only session log file under the configured log directory.
pub struct Logger {
    log_file: PathBuf,
}

/// Per-process counters shown by `/stats` and on exit.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    pub total_turns: usize,
    pub answered_turns: usize,
    pub failed_turns: usize,
    pub init_attempts: usize,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_turns == 0 {
            return 0.0;
        }
        (self.answered_turns as f64 / self.total_turns as f64) * 100.0
    }

    pub fn display(&self) {
        use colored::Colorize;
        println!("\n{}", "━━━━━━━━━ Session Statistics ━━━━━━━━━".bright_cyan().bold());
        println!("Questions asked: {}", self.total_turns);
        println!("Answered: {}", self.answered_turns.to_string().green());
        println!("Failed turns: {}", self.failed_turns.to_string().red());
        println!("Initialize attempts: {}", self.init_attempts.to_string().yellow());
        println!("Success rate: {:.1}%", self.success_rate());
        println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".bright_cyan());
    }
}

impl Logger {
    pub fn new(log_dir: &str) -> Result<Self> {
        let dir = PathBuf::from(log_dir);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_file = dir.join(format!("session_{}.log", timestamp));

        Ok(Self { log_file })
    }

    pub fn log(&self, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{}] {}", timestamp, message)?;
        Ok(())
    }

    pub fn log_question(&self, question: &str) -> Result<()> {
        self.log(&format!("QUESTION: {}", question))
    }

    pub fn log_answer(&self, answer: &str) -> Result<()> {
        self.log(&format!("ANSWER: {}", preview(answer, 200)))
    }

    pub fn log_init(&self, outcome: &str) -> Result<()> {
        self.log(&format!("INIT: {}", outcome))
    }

    pub fn log_error(&self, error: &str) -> Result<()> {
        self.log(&format!("ERROR: {}", error))
    }
}
