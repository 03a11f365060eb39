//! Terminal display surface

use std::io::{BufRead, Write};

use assistant_core::{EventSink, SecretPrompt, SessionEvent, TurnRole};

const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Prints session events; reasoning goes dimmed to stderr, answers to stdout
pub struct TerminalSink {
    show_thoughts: bool,
    echo_user: bool,
}

impl TerminalSink {
    pub fn new(show_thoughts: bool) -> Self {
        Self {
            show_thoughts,
            echo_user: false,
        }
    }

    /// Also print user turns (history replay)
    pub fn echoing_user(mut self) -> Self {
        self.echo_user = true;
        self
    }

    fn render(&self, event: &SessionEvent) -> Option<String> {
        match event {
            SessionEvent::Title { text } => Some(format!("{BOLD}{}{RESET}\n{}", text, "═".repeat(text.chars().count()))),
            SessionEvent::Turn { turn } => match turn.role() {
                TurnRole::User if self.echo_user => Some(format!("{BOLD}you>{RESET} {}", turn.content())),
                TurnRole::User => None,
                TurnRole::Assistant => Some(format!("{BOLD}assistant>{RESET} {}\n", turn.content())),
            },
            SessionEvent::Thought { step, text } if self.show_thoughts => {
                Some(format!("{DIM}  [{}] thought: {}{RESET}", step, text))
            }
            SessionEvent::ToolCall { step, tool, input } if self.show_thoughts => {
                Some(format!("{DIM}  [{}] {} ← {}{RESET}", step, tool, input))
            }
            SessionEvent::Observation { step, tool, output, success } if self.show_thoughts => {
                let status = if *success { "→" } else { "✗" };
                Some(format!("{DIM}  [{}] {} {} {}{RESET}", step, tool, status, indent(output)))
            }
            SessionEvent::Warning { text } => Some(format!("{YELLOW}⚠ {}{RESET}", text)),
            // The assistant turn carries the same text
            SessionEvent::Answer { .. } => None,
            _ => None,
        }
    }
}

impl EventSink for TerminalSink {
    fn emit(&self, event: SessionEvent) {
        let Some(line) = self.render(&event) else {
            return;
        };

        if event.is_thought() || matches!(event, SessionEvent::Warning { .. }) {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

fn indent(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join("\n      ")
}

/// Reads the API key from the terminal
pub struct StdinPrompt;

impl SecretPrompt for StdinPrompt {
    fn ask(&self, label: &str) -> Option<String> {
        eprint!("{}: ", label);
        std::io::stderr().flush().ok()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).ok()?;
        Some(line.trim().to_string()).filter(|key| !key.is_empty())
    }
}
