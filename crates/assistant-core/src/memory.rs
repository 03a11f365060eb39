//! Summary Memory
//!
//! Keeps one rolling summary of the dialogue instead of the verbatim turns.
//! Every exchange costs one extra model call: the previous summary and the
//! new exchange go in, a replacement summary comes out. The summary is
//! clamped to `max_summary_chars`, so its size does not depend on the
//! number of turns.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{GenerationOptions, LlmProvider};

const SUMMARY_PROMPT: &str = r#"Progressively summarize the lines of conversation provided, adding onto the previous summary and returning a new summary.
Keep names, facts, open questions and any papers or links that were mentioned. Drop small talk.
Reply with the new summary only."#;

/// Memory configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Upper bound for the stored summary, in characters
    pub max_summary_chars: usize,

    /// Instructions for the summarisation call
    pub prompt: String,

    /// Timeout for the summarisation call
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_summary_chars: 2000,
            prompt: SUMMARY_PROMPT.into(),
            timeout: Duration::from_secs(60),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Rolling conversation summary, owned by one session
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConversationMemory {
    config: MemoryConfig,
    summary: Option<String>,
    exchanges: usize,
}

impl ConversationMemory {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            summary: None,
            exchanges: 0,
        }
    }

    /// Summary the agent should read as context; empty before the first exchange
    pub fn context(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }

    /// Number of exchanges folded into the summary
    pub fn exchanges(&self) -> usize {
        self.exchanges
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Fold one exchange into the summary.
    ///
    /// A failed summarisation call does not lose the exchange: the new lines
    /// are appended to the previous summary and the oldest text is dropped.
    pub async fn append(
        &mut self,
        provider: &dyn LlmProvider,
        options: &GenerationOptions,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<()> {
        let new_lines = format_exchange(user_text, assistant_text);

        let summary = match self.summarize(provider, options, &new_lines).await {
            Ok(summary) if !summary.trim().is_empty() => clamp_head(summary.trim(), self.config.max_summary_chars),
            Ok(_) => {
                tracing::warn!(provider = provider.name(), "Summarizer returned empty text, folding exchange verbatim");
                self.fold_verbatim(&new_lines)
            }
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "Summarization failed, folding exchange verbatim");
                self.fold_verbatim(&new_lines)
            }
        };

        tracing::debug!(
            exchanges = self.exchanges + 1,
            chars = summary.chars().count(),
            "Memory summary updated"
        );
        self.summary = Some(summary);
        self.exchanges += 1;
        Ok(())
    }

    async fn summarize(
        &self,
        provider: &dyn LlmProvider,
        options: &GenerationOptions,
        new_lines: &str,
    ) -> Result<String> {
        let messages = [
            Message::system(self.config.prompt.clone()),
            Message::user(format!(
                "Current summary:\n{}\n\nNew lines of conversation:\n{}\n\nNew summary:",
                self.context(),
                new_lines
            )),
        ];

        let options = GenerationOptions {
            temperature: 0.0,
            stop_sequences: Vec::new(),
            ..options.clone()
        };

        let completion = tokio::time::timeout(self.config.timeout, provider.complete(&messages, &options))
            .await
            .map_err(|_| AgentError::Timeout(self.config.timeout.as_secs(), "memory summarization".into()))??;

        Ok(completion.content)
    }

    fn fold_verbatim(&self, new_lines: &str) -> String {
        let folded = if self.context().is_empty() {
            new_lines.to_string()
        } else {
            format!("{}\n{}", self.context(), new_lines)
        };
        clamp_tail(&folded, self.config.max_summary_chars)
    }
}

fn format_exchange(user_text: &str, assistant_text: &str) -> String {
    format!("Human: {}\nAI: {}", user_text.trim(), assistant_text.trim())
}

/// Keep the first `max` characters
fn clamp_head(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Keep the last `max` characters
fn clamp_tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn options() -> GenerationOptions {
        GenerationOptions::default()
    }

    #[test]
    fn test_memory_starts_empty() {
        let memory = ConversationMemory::default();
        assert_eq!(memory.context(), "");
        assert_eq!(memory.exchanges(), 0);
    }

    #[tokio::test]
    async fn test_summary_replaces_previous_summary() {
        let provider = ScriptedProvider::new(["User asked about France.", "User asked about France and Spain."]);
        let mut memory = ConversationMemory::default();

        memory.append(&provider, &options(), "Capital of France?", "Paris").await.unwrap();
        assert_eq!(memory.context(), "User asked about France.");

        memory.append(&provider, &options(), "And Spain?", "Madrid").await.unwrap();
        assert_eq!(memory.context(), "User asked about France and Spain.");
        assert_eq!(memory.exchanges(), 2);
    }

    #[tokio::test]
    async fn test_summarizer_sees_only_prior_summary_and_latest_exchange() {
        let provider = ScriptedProvider::new(["S1", "S2"]);
        let mut memory = ConversationMemory::default();

        memory.append(&provider, &options(), "first question", "first answer").await.unwrap();
        memory.append(&provider, &options(), "second question", "second answer").await.unwrap();

        let prompts = provider.prompts();
        let second = &prompts[1];
        let user = &second.last().unwrap().content;
        assert!(user.contains("Current summary:\nS1"));
        assert!(user.contains("Human: second question\nAI: second answer"));
        assert!(!user.contains("first question"));
    }

    #[tokio::test]
    async fn test_summary_is_bounded() {
        let long = "x".repeat(10_000);
        let provider = ScriptedProvider::repeating(&long);
        let mut memory = ConversationMemory::new(MemoryConfig {
            max_summary_chars: 100,
            ..Default::default()
        });

        for i in 0..20 {
            memory
                .append(&provider, &options(), &format!("question {}", i), "answer")
                .await
                .unwrap();
            assert!(memory.context().chars().count() <= 100);
        }
    }

    #[tokio::test]
    async fn test_failed_summarization_folds_verbatim_and_stays_bounded() {
        let provider = ScriptedProvider::failing();
        let mut memory = ConversationMemory::new(MemoryConfig {
            max_summary_chars: 40,
            ..Default::default()
        });

        memory.append(&provider, &options(), "hi", "hello").await.unwrap();
        assert_eq!(memory.context(), "Human: hi\nAI: hello");

        memory.append(&provider, &options(), "what now", "nothing").await.unwrap();
        assert_eq!(memory.context().chars().count(), 40);
        assert!(memory.context().ends_with("AI: nothing"));
    }

    #[test]
    fn test_clamp_is_char_safe() {
        assert_eq!(clamp_head("héllo", 2), "hé");
        assert_eq!(clamp_tail("héllo", 4), "éllo");
    }
}
