use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{ApiError, AssistantApi, ChatRole, ContextId, RunId, RunStatus};
use crate::format::format_response;
use crate::output::Output;
use crate::surface::StyleTag;

pub const INIT_ERROR: &str = "Error initializing AI system. Please check your configuration.";

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("AI system not properly initialized.")]
    NotInitialized,

    #[error("Run ended with status: {0}")]
    RunEnded(RunStatus),

    #[error("Run timed out")]
    TimedOut,

    #[error("Latest message is not from the assistant")]
    NotAssistant,

    #[error("Assistant returned no reply")]
    EmptyReply,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Constant-interval polling budget
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: 50,
        }
    }
}

pub struct QueryPipeline<A> {
    api: A,
    poll: PollSettings,
}

impl<A: AssistantApi> QueryPipeline<A> {
    pub fn new(api: A, poll: PollSettings) -> Self {
        Self { api, poll }
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Create the conversation context; failure is rendered and final
    pub async fn open_context(&self, output: &Output) -> Option<ContextId> {
        match self.api.create_context().await {
            Ok(context) => {
                info!(context = %context, "conversation context created");
                Some(context)
            }
            Err(e) => {
                warn!("failed to create conversation context: {}", e);
                output.break_line();
                output.error(INIT_ERROR);
                None
            }
        }
    }

    /// Run one query and render either the formatted reply or one error line
    pub async fn query(&self, context: Option<&ContextId>, text: &str, output: &Output) {
        let Some(context) = context else {
            output.error(&format!("Error: {}", QueryError::NotInitialized));
            return;
        };

        output.text("Processing query...\n", Some(StyleTag::Dim));

        match self.fetch_reply(context, text).await {
            Ok(reply) => output.markup(&format!("{}\n", format_response(&reply))),
            Err(e) => {
                warn!("query failed: {}", e);
                output.error(&format!("Error processing query: {}", e));
            }
        }
    }

    /// Submit, run, poll and fetch; returns the raw reply text
    pub async fn fetch_reply(&self, context: &ContextId, text: &str) -> Result<String, QueryError> {
        self.api.post_user_message(context, text).await?;
        let run = self.api.start_run(context).await?;
        info!(run = %run, "run started");

        self.poll_run(context, &run).await?;

        let message = self
            .api
            .latest_message(context)
            .await?
            .ok_or(QueryError::EmptyReply)?;
        if message.role != ChatRole::Assistant {
            return Err(QueryError::NotAssistant);
        }
        Ok(message.content)
    }

    /// Poll until a terminal status or the attempt budget runs out
    pub async fn poll_run(&self, context: &ContextId, run: &RunId) -> Result<(), QueryError> {
        for attempt in 1..=self.poll.max_attempts {
            let status = self.api.run_status(context, run).await?;
            debug!(attempt, status = %status, "polled run");

            match status {
                RunStatus::Completed => return Ok(()),
                RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired => {
                    return Err(QueryError::RunEnded(status));
                }
                RunStatus::Pending => {
                    if attempt < self.poll.max_attempts && !self.poll.interval.is_zero() {
                        tokio::time::sleep(self.poll.interval).await;
                    }
                }
            }
        }
        Err(QueryError::TimedOut)
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::assistant::{ApiError, AssistantApi, ChatMessage, ChatRole, ContextId, RunId, RunStatus};

    /// Scripted assistant service that records the calls it receives
    #[derive(Clone, Default)]
    pub struct FakeApi {
        pub inner: Arc<Mutex<FakeState>>,
    }

    #[derive(Default)]
    pub struct FakeState {
        pub fail_create: bool,
        pub fail_post: bool,
        pub statuses: VecDeque<RunStatus>,
        pub reply: Option<ChatMessage>,
        pub posted: Vec<String>,
        pub runs_started: usize,
        pub polls: usize,
        pub poll_times: Vec<tokio::time::Instant>,
        pub contexts_created: usize,
    }

    impl FakeApi {
        pub fn replying(statuses: Vec<RunStatus>, reply: &str) -> Self {
            let api = Self::default();
            {
                let mut state = api.state();
                state.statuses = statuses.into();
                state.reply = Some(ChatMessage {
                    role: ChatRole::Assistant,
                    content: reply.to_string(),
                });
            }
            api
        }

        pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
            self.inner.lock().unwrap()
        }
    }

    #[async_trait]
    impl AssistantApi for FakeApi {
        async fn create_context(&self) -> Result<ContextId, ApiError> {
            let mut state = self.state();
            if state.fail_create {
                return Err(ApiError::Unexpected("connection refused".to_string()));
            }
            state.contexts_created += 1;
            Ok(ContextId("thread_1".to_string()))
        }

        async fn post_user_message(&self, _context: &ContextId, text: &str) -> Result<(), ApiError> {
            let mut state = self.state();
            if state.fail_post {
                return Err(ApiError::Status {
                    status: 500,
                    body: "server error".to_string(),
                });
            }
            state.posted.push(text.to_string());
            Ok(())
        }

        async fn start_run(&self, _context: &ContextId) -> Result<RunId, ApiError> {
            let mut state = self.state();
            state.runs_started += 1;
            Ok(RunId(format!("run_{}", state.runs_started)))
        }

        async fn run_status(&self, _context: &ContextId, _run: &RunId) -> Result<RunStatus, ApiError> {
            let mut state = self.state();
            state.polls += 1;
            state.poll_times.push(tokio::time::Instant::now());
            Ok(state.statuses.pop_front().unwrap_or(RunStatus::Pending))
        }

        async fn latest_message(&self, _context: &ContextId) -> Result<Option<ChatMessage>, ApiError> {
            Ok(self.state().reply.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::FakeApi;
    use super::*;
    use crate::sound::testing::CountingCue;
    use crate::surface::{Fragment, SharedSurface};

    fn instant_poll() -> PollSettings {
        PollSettings {
            interval: Duration::ZERO,
            max_attempts: 50,
        }
    }

    fn output() -> Output {
        Output::new(SharedSurface::new(), Arc::new(CountingCue::default()))
    }

    fn context() -> ContextId {
        ContextId("thread_1".to_string())
    }

    fn pending(n: usize) -> Vec<RunStatus> {
        vec![RunStatus::Pending; n]
    }

    #[tokio::test]
    async fn test_succeeds_on_last_allowed_poll() {
        let mut statuses = pending(49);
        statuses.push(RunStatus::Completed);
        let pipeline = QueryPipeline::new(FakeApi::replying(statuses, "done"), instant_poll());

        let reply = pipeline.fetch_reply(&context(), "hi").await.unwrap();
        assert_eq!(reply, "done");
        assert_eq!(pipeline.api().state().polls, 50);
    }

    #[tokio::test]
    async fn test_times_out_without_extra_poll() {
        let pipeline = QueryPipeline::new(FakeApi::replying(pending(60), "never"), instant_poll());

        let err = pipeline.fetch_reply(&context(), "hi").await.unwrap_err();
        assert!(matches!(err, QueryError::TimedOut));
        assert_eq!(err.to_string(), "Run timed out");
        assert_eq!(pipeline.api().state().polls, 50);
    }

    #[tokio::test]
    async fn test_terminal_failure_stops_polling() {
        for (status, message) in [
            (RunStatus::Failed, "Run ended with status: failed"),
            (RunStatus::Cancelled, "Run ended with status: cancelled"),
            (RunStatus::Expired, "Run ended with status: expired"),
        ] {
            let statuses = vec![RunStatus::Pending, status, RunStatus::Completed];
            let pipeline = QueryPipeline::new(FakeApi::replying(statuses, "x"), instant_poll());

            let err = pipeline.fetch_reply(&context(), "hi").await.unwrap_err();
            assert_eq!(err.to_string(), message);
            assert_eq!(pipeline.api().state().polls, 2, "{status}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_at_constant_interval() {
        let mut statuses = pending(3);
        statuses.push(RunStatus::Completed);
        let poll = PollSettings {
            interval: Duration::from_millis(1000),
            max_attempts: 50,
        };
        let pipeline = QueryPipeline::new(FakeApi::replying(statuses, "done"), poll);

        let start = tokio::time::Instant::now();
        pipeline.fetch_reply(&context(), "hi").await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(3));

        let times = pipeline.api().state().poll_times.clone();
        assert_eq!(times.len(), 4);
        for pair in times.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sleep_after_last_attempt() {
        let poll = PollSettings {
            interval: Duration::from_millis(1000),
            max_attempts: 3,
        };
        let pipeline = QueryPipeline::new(FakeApi::replying(pending(5), "never"), poll);

        let start = tokio::time::Instant::now();
        let err = pipeline.fetch_reply(&context(), "hi").await.unwrap_err();
        assert!(matches!(err, QueryError::TimedOut));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_query_renders_formatted_reply() {
        let pipeline = QueryPipeline::new(
            FakeApi::replying(vec![RunStatus::Completed], "- item at 18.2°C"),
            instant_poll(),
        );
        let output = output();

        pipeline.query(Some(&context()), "temps?", &output).await;

        assert_eq!(pipeline.api().state().posted, vec!["temps?".to_string()]);
        assert_eq!(
            output.surface().lock().fragments,
            vec![
                Fragment::Text {
                    text: "Processing query...\n".to_string(),
                    style: Some(StyleTag::Dim)
                },
                Fragment::Markup(
                    "• item at <span class=\"bright\">18.2</span>°C\n".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_query_without_context_makes_no_calls() {
        let pipeline = QueryPipeline::new(FakeApi::default(), instant_poll());
        let output = output();

        pipeline.query(None, "hello", &output).await;

        let state = pipeline.api().state();
        assert!(state.posted.is_empty());
        assert_eq!(state.runs_started, 0);
        assert_eq!(
            output.surface().lock().transcript(),
            "Error: AI system not properly initialized.\n"
        );
    }

    #[tokio::test]
    async fn test_transport_failure_renders_single_error_line() {
        let api = FakeApi::default();
        api.state().fail_post = true;
        let pipeline = QueryPipeline::new(api, instant_poll());
        let output = output();

        pipeline.query(Some(&context()), "hello", &output).await;

        let surface = output.surface().lock();
        assert_eq!(surface.fragments.len(), 2);
        assert_eq!(
            surface.fragments[1],
            Fragment::Text {
                text: "Error processing query: Assistant API error 500: server error\n".to_string(),
                style: Some(StyleTag::Error)
            }
        );
        assert_eq!(pipeline.api().state().runs_started, 0);
    }

    #[tokio::test]
    async fn test_non_assistant_reply_is_an_error() {
        let api = FakeApi::replying(vec![RunStatus::Completed], "echo");
        if let Some(reply) = api.state().reply.as_mut() {
            reply.role = ChatRole::User;
        }
        let pipeline = QueryPipeline::new(api, instant_poll());

        let err = pipeline.fetch_reply(&context(), "echo").await.unwrap_err();
        assert!(matches!(err, QueryError::NotAssistant));
    }

    #[tokio::test]
    async fn test_open_context_failure_is_rendered() {
        let api = FakeApi::default();
        api.state().fail_create = true;
        let pipeline = QueryPipeline::new(api, instant_poll());
        let output = output();

        assert_eq!(pipeline.open_context(&output).await, None);
        assert_eq!(output.surface().lock().transcript(), format!("{}\n", INIT_ERROR));
    }

    #[tokio::test]
    async fn test_open_context_failure_starts_own_line() {
        let api = FakeApi::default();
        api.state().fail_create = true;
        let pipeline = QueryPipeline::new(api, instant_poll());
        let output = output();
        output.text("RAM - [", None);

        assert_eq!(pipeline.open_context(&output).await, None);
        assert_eq!(
            output.surface().lock().transcript(),
            format!("RAM - [\n{}\n", INIT_ERROR)
        );
    }
}
