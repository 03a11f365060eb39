//! Interactive Shell
//!
//! Glue between a display surface and the agent: resolves the credential,
//! records chat turns and forwards every event to the sink.

use crate::credential::{ApiKey, CredentialProvider, SecretPrompt};
use crate::error::{AgentError, Result};
use crate::events::{EventSink, SessionEvent};
use crate::reasoning::{Agent, AgentOutcome};
use crate::session::Session;
use crate::transcript::ChatTurn;

pub struct Shell {
    agent: Agent,
    title: String,
}

impl Shell {
    pub fn new(agent: Agent, title: impl Into<String>) -> Self {
        Self {
            agent,
            title: title.into(),
        }
    }

    /// Emit the title, resolve the key and only then build the agent.
    ///
    /// Without a key the sink gets a warning and `build` is never called,
    /// so nothing reaches the model or the tools.
    pub fn open<F>(
        credentials: &CredentialProvider,
        prompt: &dyn SecretPrompt,
        sink: &dyn EventSink,
        title: impl Into<String>,
        build: F,
    ) -> Result<Self>
    where
        F: FnOnce(ApiKey) -> Result<Agent>,
    {
        let title = title.into();
        sink.emit(SessionEvent::Title { text: title.clone() });

        let key = match credentials.require(prompt) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(env_var = credentials.env_var(), "No API key available, halting session");
                sink.emit(SessionEvent::Warning { text: e.user_message() });
                return Err(e);
            }
        };

        Ok(Self::new(build(key)?, title))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Re-emit the title and every recorded turn
    pub fn replay(&self, session: &Session, sink: &dyn EventSink) {
        sink.emit(SessionEvent::Title { text: self.title.clone() });
        for turn in session.transcript.turns() {
            sink.emit(SessionEvent::Turn { turn: turn.clone() });
        }
    }

    /// Handle one user submission.
    ///
    /// The transcript always gains a user turn and an assistant turn, even
    /// when the agent fails; the assistant turn then carries the
    /// user-facing error text.
    pub async fn on_submit(
        &self,
        session: &mut Session,
        text: &str,
        sink: &dyn EventSink,
    ) -> Result<AgentOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::EmptyInput);
        }

        let turn = session.transcript.push(ChatTurn::user(text)).clone();
        sink.emit(SessionEvent::Turn { turn });

        tracing::info!(session_id = %session.id, chars = text.len(), "Submission received");
        let result = self.agent.run(&mut session.memory, text, sink).await;

        let reply = match &result {
            Ok(outcome) => {
                tracing::info!(
                    session_id = %session.id,
                    iterations = outcome.iterations,
                    tool_calls = outcome.tool_calls.len(),
                    degraded = outcome.degraded,
                    "Submission answered"
                );
                outcome.answer.clone()
            }
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e, "Submission failed");
                sink.emit(SessionEvent::Warning { text: e.user_message() });
                e.user_message()
            }
        };

        let turn = session.transcript.push(ChatTurn::assistant(reply)).clone();
        sink.emit(SessionEvent::Turn { turn });
        session.touch();

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{NoPrompt, SuppliedSecret};
    use crate::events::EventLog;
    use crate::reasoning::AgentBuilder;
    use crate::testing::ScriptedProvider;
    use crate::transcript::TurnRole;
    use std::cell::Cell;
    use std::sync::Arc;

    const TITLE: &str = "AI Search Engine: Context Aware Agent";

    fn no_env() -> CredentialProvider {
        CredentialProvider::groq().with_lookup(|_| None)
    }

    fn shell_with(provider: Arc<ScriptedProvider>) -> Shell {
        Shell::new(AgentBuilder::new().provider(provider).build().unwrap(), TITLE)
    }

    #[test]
    fn test_missing_credential_halts_before_any_call() {
        let log = EventLog::new();
        let built = Cell::new(false);

        let result = Shell::open(&no_env(), &NoPrompt, &log, TITLE, |_| {
            built.set(true);
            AgentBuilder::new().build()
        });

        assert!(matches!(result, Err(AgentError::MissingCredential(_))));
        assert!(!built.get());
        assert_eq!(
            log.snapshot(),
            vec![
                SessionEvent::Title { text: TITLE.into() },
                SessionEvent::Warning { text: "Groq API Key required in sidebar".into() },
            ]
        );
    }

    #[test]
    fn test_open_passes_prompted_key_to_builder() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let shell = Shell::open(
            &no_env(),
            &SuppliedSecret(Some("gsk_sidebar".into())),
            &EventLog::new(),
            TITLE,
            |key| {
                assert_eq!(key.expose(), "gsk_sidebar");
                AgentBuilder::new().provider(provider.clone()).build()
            },
        )
        .unwrap();

        assert_eq!(shell.title(), TITLE);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_capital_of_france_transcript() {
        let provider = Arc::new(ScriptedProvider::new(["Paris", "The user asked for the capital of France."]));
        let shell = shell_with(provider);
        let mut session = Session::default();

        let outcome = shell
            .on_submit(&mut session, "What is the capital of France?", &EventLog::new())
            .await
            .unwrap();

        assert_eq!(outcome.iterations, 1);
        let turns = session.transcript.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role(), TurnRole::User);
        assert_eq!(turns[0].content(), "What is the capital of France?");
        assert_eq!(turns[1].role(), TurnRole::Assistant);
        assert_eq!(turns[1].content(), "Paris");
    }

    #[tokio::test]
    async fn test_n_submissions_make_2n_turns_in_order() {
        let provider = Arc::new(ScriptedProvider::repeating("ok"));
        let shell = shell_with(provider);
        let mut session = Session::default();

        for i in 0..4 {
            shell
                .on_submit(&mut session, &format!("question {}", i), &EventLog::new())
                .await
                .unwrap();
        }

        let turns = session.transcript.turns();
        assert_eq!(turns.len(), 8);
        for (i, pair) in turns.chunks(2).enumerate() {
            assert_eq!(pair[0].role(), TurnRole::User);
            assert_eq!(pair[0].content(), format!("question {}", i));
            assert_eq!(pair[1].role(), TurnRole::Assistant);
        }
    }

    #[tokio::test]
    async fn test_provider_failure_still_pairs_turns() {
        let shell = shell_with(Arc::new(ScriptedProvider::failing()));
        let mut session = Session::default();
        let log = EventLog::new();

        let err = shell.on_submit(&mut session, "hello", &log).await.unwrap_err();

        assert!(matches!(err, AgentError::ProviderUnavailable(_)));
        assert_eq!(session.turn_count(), 2);
        assert_eq!(session.transcript.last().unwrap().content(), err.user_message());
        assert!(log.snapshot().iter().any(|e| matches!(e, SessionEvent::Warning { .. })));
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected() {
        let provider = Arc::new(ScriptedProvider::repeating("ok"));
        let shell = shell_with(provider.clone());
        let mut session = Session::default();

        let err = shell.on_submit(&mut session, "   ", &EventLog::new()).await.unwrap_err();

        assert!(matches!(err, AgentError::EmptyInput));
        assert_eq!(session.turn_count(), 0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_replay_emits_title_and_turns() {
        let shell = shell_with(Arc::new(ScriptedProvider::repeating("ok")));
        let mut session = Session::default();
        shell.on_submit(&mut session, "hi", &EventLog::new()).await.unwrap();

        let log = EventLog::new();
        shell.replay(&session, &log);

        let events = log.snapshot();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], SessionEvent::Title { text: TITLE.into() });
        assert!(matches!(&events[1], SessionEvent::Turn { turn } if turn.content() == "hi"));
        assert!(matches!(&events[2], SessionEvent::Turn { turn } if turn.content() == "ok"));
    }
}
