//! In-process providers and tools for unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Completion, GenerationOptions, LlmProvider};
use crate::tool::Tool;

enum Script {
    Queue(Mutex<VecDeque<String>>),
    Repeat(String),
    Fail,
}

/// Provider that replays canned completions and records every prompt
pub struct ScriptedProvider {
    script: Script,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::Queue(Mutex::new(
            responses.into_iter().map(Into::into).collect(),
        )))
    }

    pub fn repeating(response: &str) -> Self {
        Self::with_script(Script::Repeat(response.to_string()))
    }

    pub fn failing() -> Self {
        Self::with_script(Script::Fail)
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        let content = match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))?,
            Script::Repeat(text) => text.clone(),
            Script::Fail => return Err(AgentError::ProviderUnavailable("scripted outage".into())),
        };
        Ok(Completion::text(content, options.model.clone()))
    }
}

/// Tool that echoes its query and counts invocations
pub struct EchoTool {
    name: String,
    pub calls: AtomicUsize,
}

impl EchoTool {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Echoes the query back."
    }

    async fn invoke(&self, query: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}: {}", self.name, query))
    }
}

/// Tool that always fails like a rate-limited backend
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }

    fn description(&self) -> &str {
        "Always fails."
    }

    async fn invoke(&self, _query: &str) -> Result<String> {
        Err(AgentError::ToolExecution("429 Too Many Requests".into()))
    }
}

/// Tool that never finishes within a test timeout
pub struct StallingTool;

#[async_trait]
impl Tool for StallingTool {
    fn name(&self) -> &str {
        "stall"
    }

    fn description(&self) -> &str {
        "Sleeps for a long time."
    }

    async fn invoke(&self, _query: &str) -> Result<String> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok("too late".into())
    }
}
