//! Reasoning Loop
//!
//! Reason/act/observe state machine:
//!
//! ```text
//! AwaitingInput → Thinking → { ToolCall → Observing → Thinking }* → Answering → AwaitingInput
//! ```
//!
//! Every model call made in `Thinking` counts against `max_iterations`.
//! Unknown tools, failing tools and unparseable output are fed back to the
//! model as observations or corrections; when the cap is reached the agent
//! answers with whatever it has instead of failing the submission.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::events::{EventSink, NullSink, SessionEvent};
use crate::memory::ConversationMemory;
use crate::message::{Conversation, Message};
use crate::parse::{Directive, parse_directive};
use crate::provider::{Completion, GenerationOptions, LlmProvider};
use crate::tool::{Tool, ToolCall, ToolRegistry, ToolResult};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt template
    pub system_prompt: String,

    /// Maximum model calls per submission before a degraded answer
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Timeout applied to each model call and each tool call
    pub call_timeout: Duration,

    /// Whether to append tool descriptions to system prompt
    pub inject_tool_descriptions: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 15,
            generation: GenerationOptions {
                stop_sequences: vec!["\nObservation:".into()],
                ..GenerationOptions::default()
            },
            call_timeout: Duration::from_secs(60),
            inject_tool_descriptions: true,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful research assistant that can look up academic papers and search the web.

Think about whether you need a tool. If you do, write one short sentence of reasoning and then a single tool block. Stop right after the block: the tool's result will be sent back to you as an "Observation" message.

When you can answer, reply with the answer as plain text and no tool block.
Use the conversation summary, if one is given, to resolve references to earlier questions.
Be concise and accurate, and cite paper titles when you use them."#;

const FORMAT_CORRECTION: &str = "Your last reply could not be understood ({reason}). \
Either call a tool with exactly one block of the form\n```tool\n{\"tool\": \"tool_name\", \"input\": \"search query\"}\n```\n\
or reply with your final answer as plain text.";

/// Observable agent states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentState {
    AwaitingInput,
    Thinking,
    ToolCall,
    Observing,
    Answering,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentState::AwaitingInput => "awaiting_input",
            AgentState::Thinking => "thinking",
            AgentState::ToolCall => "tool_call",
            AgentState::Observing => "observing",
            AgentState::Answering => "answering",
        };
        write!(f, "{}", s)
    }
}

/// Loop position plus the data that state carries
enum Step {
    Thinking,
    ToolCall(ToolCall),
    Observing(ToolResult),
    Answering { text: String, degraded: bool },
}

impl Step {
    fn state(&self) -> AgentState {
        match self {
            Step::Thinking => AgentState::Thinking,
            Step::ToolCall(_) => AgentState::ToolCall,
            Step::Observing(_) => AgentState::Observing,
            Step::Answering { .. } => AgentState::Answering,
        }
    }
}

/// Result of one submission
#[derive(Clone, Debug)]
pub struct AgentOutcome {
    /// Text shown to the user
    pub answer: String,

    /// True when the iteration cap forced the answer
    pub degraded: bool,

    /// Model calls spent in `Thinking`
    pub iterations: usize,

    /// Tool calls issued, in order
    pub tool_calls: Vec<ToolCall>,
}

/// The reasoning agent
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Build the full system prompt including tool descriptions
    fn build_system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.clone();

        if self.config.inject_tool_descriptions && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
        }

        prompt
    }

    /// Answer one user utterance and fold the exchange into `memory`
    pub async fn run(
        &self,
        memory: &mut ConversationMemory,
        user_text: &str,
        sink: &dyn EventSink,
    ) -> Result<AgentOutcome> {
        let outcome = self.reason(memory.context(), user_text, sink).await?;

        memory
            .append(self.provider.as_ref(), &self.config.generation, user_text, &outcome.answer)
            .await?;

        tracing::debug!(state = %AgentState::AwaitingInput, "Submission complete");
        Ok(outcome)
    }

    /// Stateless question (no memory, no events)
    pub async fn ask(&self, question: &str) -> Result<String> {
        self.reason("", question, &NullSink).await.map(|o| o.answer)
    }

    /// Run the state machine from `Thinking` to `Answering`
    pub async fn reason(
        &self,
        memory_context: &str,
        user_text: &str,
        sink: &dyn EventSink,
    ) -> Result<AgentOutcome> {
        let mut conversation = Conversation::with_system_prompt(self.build_system_prompt());
        if !memory_context.trim().is_empty() {
            conversation.push(Message::system(format!(
                "Summary of the conversation so far:\n{}",
                memory_context
            )));
        }
        conversation.push(Message::user(user_text));

        let mut iterations = 0;
        let mut tool_calls = Vec::new();
        let mut last_observation: Option<ToolResult> = None;
        let mut step = Step::Thinking;

        tracing::debug!(from = %AgentState::AwaitingInput, to = %step.state(), "Agent transition");

        loop {
            let next = match step {
                Step::Thinking => {
                    if iterations >= self.config.max_iterations {
                        tracing::warn!(
                            max_iterations = self.config.max_iterations,
                            "Iteration cap reached, answering with partial results"
                        );
                        Step::Answering {
                            text: self.degraded_answer(last_observation.as_ref()),
                            degraded: true,
                        }
                    } else {
                        iterations += 1;
                        let completion = self.think(&conversation).await?;
                        self.interpret(completion, iterations, &mut conversation, sink)
                    }
                }
                Step::ToolCall(call) => {
                    sink.emit(SessionEvent::ToolCall {
                        step: iterations,
                        tool: call.name.clone(),
                        input: call.input.clone(),
                    });
                    let result = self.execute_tool(&call).await;
                    tool_calls.push(call);
                    Step::Observing(result)
                }
                Step::Observing(result) => {
                    sink.emit(SessionEvent::Observation {
                        step: iterations,
                        tool: result.name.clone(),
                        output: result.output.clone(),
                        success: result.success,
                    });
                    conversation.push(Message::tool(result.observation(), result.id.clone()));
                    last_observation = Some(result);
                    Step::Thinking
                }
                Step::Answering { text, degraded } => {
                    sink.emit(SessionEvent::Answer {
                        text: text.clone(),
                        degraded,
                    });
                    return Ok(AgentOutcome {
                        answer: text,
                        degraded,
                        iterations,
                        tool_calls,
                    });
                }
            };

            tracing::debug!(to = %next.state(), iteration = iterations, "Agent transition");
            step = next;
        }
    }

    /// One model call, bounded by the call timeout
    async fn think(&self, conversation: &Conversation) -> Result<Completion> {
        tracing::debug!(
            provider = self.provider.name(),
            messages = conversation.len(),
            est_tokens = conversation.estimate_tokens(),
            "Requesting completion"
        );

        tokio::time::timeout(
            self.config.call_timeout,
            self.provider.complete(conversation.messages(), &self.config.generation),
        )
        .await
        .map_err(|_| AgentError::Timeout(self.config.call_timeout.as_secs(), "model call".into()))?
    }

    /// Classify model output and pick the next step
    fn interpret(
        &self,
        completion: Completion,
        iteration: usize,
        conversation: &mut Conversation,
        sink: &dyn EventSink,
    ) -> Step {
        let content = completion.content;

        match parse_directive(&content) {
            Ok(Directive::FinalAnswer { thought, text }) => {
                if let Some(thought) = thought {
                    sink.emit(SessionEvent::Thought { step: iteration, text: thought });
                }
                conversation.push(Message::assistant(content));
                Step::Answering { text, degraded: false }
            }
            Ok(Directive::ToolCall { thought, call }) => {
                if let Some(thought) = thought {
                    sink.emit(SessionEvent::Thought { step: iteration, text: thought });
                }
                conversation.push(Message::assistant(content));
                Step::ToolCall(call)
            }
            Err(e) => {
                let reason = match e {
                    AgentError::UnparseableModelOutput(reason) => reason,
                    other => other.to_string(),
                };
                tracing::warn!(iteration, reason = %reason, "Unparseable model output, asking for a correction");
                sink.emit(SessionEvent::Thought {
                    step: iteration,
                    text: format!("Could not parse the model's reply ({}); asking it to correct the format.", reason),
                });
                conversation.push(Message::assistant(content));
                conversation.push(Message::user(FORMAT_CORRECTION.replace("{reason}", &reason)));
                Step::Thinking
            }
        }
    }

    /// Execute a tool call; every failure becomes an observation
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        tracing::debug!(tool = %call.name, input = %call.input, "Executing tool");

        let outcome = tokio::time::timeout(self.config.call_timeout, self.tools.invoke(call)).await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(AgentError::UnknownTool(name))) => {
                tracing::warn!(tool = %name, "Model requested an unknown tool");
                ToolResult::failure(
                    name.clone(),
                    format!(
                        "Unknown tool '{}'. Available tools: {}.",
                        name,
                        self.tools.names().join(", ")
                    ),
                )
                .with_id(call.id.clone())
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool failed");
                ToolResult::failure(call.name.clone(), format!("Error: {}", e)).with_id(call.id.clone())
            }
            Err(_) => {
                tracing::warn!(tool = %call.name, timeout_secs = self.config.call_timeout.as_secs(), "Tool timed out");
                ToolResult::failure(
                    call.name.clone(),
                    format!("Error: tool call timed out after {}s", self.config.call_timeout.as_secs()),
                )
                .with_id(call.id.clone())
            }
        }
    }

    /// Best-effort answer when the cap is hit
    fn degraded_answer(&self, last_observation: Option<&ToolResult>) -> String {
        match last_observation.filter(|r| r.success) {
            Some(result) => format!(
                "I couldn't reach a final answer within {} reasoning steps. Here is the most relevant information I found:\n\n{}",
                self.config.max_iterations, result.output
            ),
            None => format!(
                "Agent stopped after {} reasoning steps without reaching a final answer. Please try rephrasing your question.",
                self.config.max_iterations
            ),
        }
    }

    /// Get the LLM provider
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Vec<Arc<dyn Tool>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: Vec::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn shared_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self.provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        let mut registry = ToolRegistry::new();
        for tool in self.tools {
            registry.register_shared(tool)?;
        }

        Ok(Agent::new(provider, Arc::new(registry), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::message::Role;
    use crate::testing::{EchoTool, FailingTool, ScriptedProvider, StallingTool};
    use std::sync::atomic::Ordering;

    const PAPER_QUERY: &str = "Find a recent paper on transformer quantization";

    fn agent_with(provider: Arc<ScriptedProvider>, tools: Vec<Arc<dyn Tool>>, max_iterations: usize) -> Agent {
        let mut builder = AgentBuilder::new().provider(provider).max_iterations(max_iterations);
        for tool in tools {
            builder = builder.shared_tool(tool);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_direct_answer_takes_one_step() {
        let provider = Arc::new(ScriptedProvider::new(["Paris", "User asked for the capital of France: Paris."]));
        let agent = agent_with(provider.clone(), vec![], 15);
        let mut memory = ConversationMemory::default();
        let log = EventLog::new();

        let outcome = agent
            .run(&mut memory, "What is the capital of France?", &log)
            .await
            .unwrap();

        assert_eq!(outcome.answer, "Paris");
        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.degraded);
        assert!(outcome.tool_calls.is_empty());
        assert_eq!(memory.context(), "User asked for the capital of France: Paris.");
        assert_eq!(provider.calls(), 2);
        assert_eq!(
            log.snapshot(),
            vec![SessionEvent::Answer { text: "Paris".into(), degraded: false }]
        );
    }

    #[tokio::test]
    async fn test_paper_search_round_trip() {
        let directive = format!(
            "I should search arXiv.\n```tool\n{{\"tool\": \"arxiv\", \"input\": \"{}\"}}\n```",
            PAPER_QUERY
        );
        let provider = Arc::new(ScriptedProvider::new([
            directive.as_str(),
            "Here is a recent paper on transformer quantization: ...",
        ]));
        let arxiv = Arc::new(EchoTool::named("arxiv"));
        let agent = agent_with(provider.clone(), vec![arxiv.clone() as Arc<dyn Tool>, Arc::new(EchoTool::named("WebSearch"))], 15);
        let log = EventLog::new();

        let outcome = agent.reason("", PAPER_QUERY, &log).await.unwrap();

        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].name, "arxiv");
        assert_eq!(outcome.tool_calls[0].input, PAPER_QUERY);
        assert_eq!(arxiv.calls.load(Ordering::SeqCst), 1);
        assert!(outcome.answer.starts_with("Here is a recent paper"));

        let events = log.snapshot();
        assert!(matches!(&events[0], SessionEvent::Thought { text, .. } if text == "I should search arXiv."));
        assert!(matches!(&events[1], SessionEvent::ToolCall { tool, .. } if tool == "arxiv"));
        assert!(matches!(&events[2], SessionEvent::Observation { success: true, .. }));
        assert!(matches!(&events[3], SessionEvent::Answer { .. }));

        // The observation reached the model on the second call
        let prompts = provider.prompts();
        let second = &prompts[1];
        let observation = second.last().unwrap();
        assert_eq!(observation.role, Role::Tool);
        assert!(observation.content.contains(PAPER_QUERY));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_observation() {
        let provider = Arc::new(ScriptedProvider::new([
            "```tool\n{\"tool\": \"calculator\", \"input\": \"2+2\"}\n```",
            "4",
        ]));
        let agent = agent_with(provider.clone(), vec![Arc::new(EchoTool::named("arxiv")) as Arc<dyn Tool>], 15);

        let outcome = agent.reason("", "What is 2+2?", &NullSink).await.unwrap();

        assert_eq!(outcome.answer, "4");
        let observation = provider.prompts()[1].last().unwrap().content.to_lowercase();
        assert!(observation.contains("unknown tool"));
        assert!(observation.contains("arxiv"));
    }

    #[tokio::test]
    async fn test_unparseable_output_hits_cap_exactly() {
        let provider = Arc::new(ScriptedProvider::repeating("```tool\n{not json\n```"));
        let agent = agent_with(provider.clone(), vec![Arc::new(EchoTool::named("arxiv")) as Arc<dyn Tool>], 4);
        let log = EventLog::new();

        let outcome = agent.reason("", "anything", &log).await.unwrap();

        assert!(outcome.degraded);
        assert_eq!(outcome.iterations, 4);
        assert_eq!(provider.calls(), 4);
        assert!(outcome.answer.contains("4 reasoning steps"));

        // Every retry carried a correction instruction
        let last_prompt = provider.prompts().pop().unwrap();
        let corrections = last_prompt
            .iter()
            .filter(|m| m.role == Role::User && m.content.contains("could not be understood"))
            .count();
        assert_eq!(corrections, 3);
        assert!(matches!(log.snapshot().last(), Some(SessionEvent::Answer { degraded: true, .. })));
    }

    #[tokio::test]
    async fn test_endless_tool_calls_degrade_with_last_observation() {
        let provider = Arc::new(ScriptedProvider::repeating(
            "```tool\n{\"tool\": \"WebSearch\", \"input\": \"again\"}\n```",
        ));
        let search = Arc::new(EchoTool::named("WebSearch"));
        let agent = agent_with(provider.clone(), vec![search.clone() as Arc<dyn Tool>], 3);

        let outcome = agent.reason("", "loop forever", &NullSink).await.unwrap();

        assert!(outcome.degraded);
        assert_eq!(provider.calls(), 3);
        assert_eq!(search.calls.load(Ordering::SeqCst), 3);
        assert!(outcome.answer.contains("WebSearch: again"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_observed_not_raised() {
        let provider = Arc::new(ScriptedProvider::new([
            "```tool\n{\"tool\": \"flaky\", \"input\": \"q\"}\n```",
            "The search service is rate limited right now.",
        ]));
        let agent = agent_with(provider.clone(), vec![Arc::new(FailingTool) as Arc<dyn Tool>], 15);
        let log = EventLog::new();

        let outcome = agent.reason("", "search something", &log).await.unwrap();

        assert!(!outcome.degraded);
        assert!(log.snapshot().iter().any(|e| matches!(
            e,
            SessionEvent::Observation { success: false, output, .. } if output.contains("429")
        )));
    }

    #[tokio::test]
    async fn test_tool_timeout_is_observed() {
        let provider = Arc::new(ScriptedProvider::new([
            "```tool\n{\"tool\": \"stall\", \"input\": \"q\"}\n```",
            "Timed out, sorry.",
        ]));
        let agent = AgentBuilder::new()
            .provider(provider.clone())
            .tool(StallingTool)
            .call_timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        let outcome = agent.reason("", "slow", &NullSink).await.unwrap();

        assert_eq!(outcome.answer, "Timed out, sorry.");
        let prompts = provider.prompts();
        let observation = &prompts[1].last().unwrap().content;
        assert!(observation.contains("timed out"));
    }

    #[tokio::test]
    async fn test_memory_context_is_injected() {
        let provider = Arc::new(ScriptedProvider::new(["It is Madrid."]));
        let agent = agent_with(provider.clone(), vec![], 15);

        agent
            .reason("User previously asked about France.", "And Spain?", &NullSink)
            .await
            .unwrap();

        let prompts = provider.prompts();
        let prompt = &prompts[0];
        assert_eq!(prompt.len(), 3);
        assert!(prompt[1].content.contains("User previously asked about France."));
        assert_eq!(prompt[2].content, "And Spain?");
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let provider = Arc::new(ScriptedProvider::failing());
        let agent = agent_with(provider, vec![], 15);

        let err = agent.ask("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::ProviderUnavailable(_)));
    }

    #[test]
    fn test_builder_requires_provider_and_unique_tools() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));

        let result = AgentBuilder::new()
            .provider(Arc::new(ScriptedProvider::new(Vec::<String>::new())))
            .tool(EchoTool::named("arxiv"))
            .tool(EchoTool::named("arxiv"))
            .build();
        assert!(matches!(result, Err(AgentError::DuplicateTool(_))));
    }

    #[test]
    fn test_system_prompt_lists_tools() {
        let agent = AgentBuilder::new()
            .provider(Arc::new(ScriptedProvider::new(Vec::<String>::new())))
            .tool(EchoTool::named("arxiv"))
            .build()
            .unwrap();
        let prompt = agent.build_system_prompt();
        assert!(prompt.contains("research assistant"));
        assert!(prompt.contains("### arxiv"));
    }
}
