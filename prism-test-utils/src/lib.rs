//! Prism Test Utilities
//!
//! Centralized test infrastructure for the Prism workspace:
//! - Scripted mock generation and enhancement providers
//! - Proptest generators for prompts and requests
//! - Test fixtures for common scenarios
//! - Custom assertions for Prism error variants
//! - A local HTTP server that serves artifact bytes

pub use prism_core::{
    GenerationRequest, MediaKind, Phase, PrismError, PrismResult, ProviderError, TargetKind,
    ValidationError,
};
pub use prism_providers::{
    EnhancementProvider, GenerationProvider, JobSpec, PollSnapshot, RemoteStatus, SubmittedTask,
};

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub mod http;

// ============================================================================
// MOCK GENERATION PROVIDER
// ============================================================================

/// How a mock task behaves after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Report RUNNING for `polls - 1` polls, then SUCCEEDED.
    SucceedAfter {
        polls: u32,
        url: String,
        actual_prompt: Option<String>,
    },
    /// Report RUNNING, then FAILED with the given reason.
    FailAfter {
        polls: u32,
        code: String,
        message: String,
    },
    /// Report RUNNING, then CANCELED.
    CancelAfter { polls: u32 },
    /// Report UNKNOWN on the first poll.
    Unknown,
    /// Report RUNNING forever.
    NeverFinish,
    /// Refuse the submission.
    RejectSubmission { code: String, message: String },
    /// Fail `errors` polls with a transport error, then follow `then`.
    FlakyPolls { errors: u32, then: Box<Script> },
}

impl Script {
    pub fn succeed(url: impl Into<String>) -> Self {
        Script::SucceedAfter {
            polls: 1,
            url: url.into(),
            actual_prompt: None,
        }
    }
}

/// Recorded provider interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    Submitted {
        task_id: String,
        kind: MediaKind,
        at: Instant,
    },
    Terminal {
        task_id: String,
        status: RemoteStatus,
        at: Instant,
    },
    Canceled {
        task_id: String,
    },
}

#[derive(Debug)]
struct MockTask {
    script: Script,
    polls: u32,
    errors_seen: u32,
    terminal: bool,
}

/// Scripted generation provider that records submissions, terminal
/// observations and the peak number of unfinished tasks.
#[derive(Debug)]
pub struct MockGenerationProvider {
    default_script: Script,
    queued: Mutex<VecDeque<Script>>,
    tasks: Mutex<HashMap<String, MockTask>>,
    specs: Mutex<Vec<JobSpec>>,
    events: Mutex<Vec<MockEvent>>,
    next_id: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    polls: AtomicUsize,
    submit_delay: Option<Duration>,
}

impl MockGenerationProvider {
    /// Every task follows `script` unless a per-submission script is queued.
    pub fn new(script: Script) -> Self {
        Self {
            default_script: script,
            queued: Mutex::new(VecDeque::new()),
            tasks: Mutex::new(HashMap::new()),
            specs: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            submit_delay: None,
        }
    }

    /// Tasks succeed on the first poll with `url`.
    pub fn succeeding(url: impl Into<String>) -> Self {
        Self::new(Script::succeed(url))
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    /// Script for the next submission only.
    pub fn push_script(&self, script: Script) {
        self.queued.lock().unwrap().push_back(script);
    }

    pub fn submissions(&self) -> usize {
        self.specs.lock().unwrap().len()
    }

    pub fn submitted_specs(&self) -> Vec<JobSpec> {
        self.specs.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn cancel_calls(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MockEvent::Canceled { task_id } => Some(task_id),
                _ => None,
            })
            .collect()
    }

    /// Highest number of submitted tasks not yet observed terminal.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, event: MockEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn finish(&self, task_id: &str, status: RemoteStatus) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.record(MockEvent::Terminal {
            task_id: task_id.to_string(),
            status,
            at: Instant::now(),
        });
    }
}

fn running(task_id: &str) -> PollSnapshot {
    PollSnapshot {
        task_id: task_id.to_string(),
        status: Some(RemoteStatus::Running),
        ..Default::default()
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => "mock-image",
            MediaKind::Video => "mock-video",
        }
    }

    async fn submit(&self, spec: &JobSpec) -> PrismResult<SubmittedTask> {
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        let script = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_script.clone());
        self.specs.lock().unwrap().push(spec.clone());

        if let Script::RejectSubmission { code, message } = &script {
            return Err(ProviderError::SubmissionRejected {
                provider: "mock".to_string(),
                code: code.clone(),
                message: message.clone(),
            }
            .into());
        }

        let task_id = format!("mock-task-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.tasks.lock().unwrap().insert(
            task_id.clone(),
            MockTask {
                script,
                polls: 0,
                errors_seen: 0,
                terminal: false,
            },
        );
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        self.record(MockEvent::Submitted {
            task_id: task_id.clone(),
            kind: spec.kind,
            at: Instant::now(),
        });
        Ok(SubmittedTask {
            task_id,
            status: RemoteStatus::Pending,
        })
    }

    async fn poll(&self, _kind: MediaKind, task_id: &str) -> PrismResult<PollSnapshot> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let (snapshot, finished) = {
            let mut tasks = self.tasks.lock().unwrap();
            let Some(task) = tasks.get_mut(task_id) else {
                return Ok(PollSnapshot {
                    task_id: task_id.to_string(),
                    status: Some(RemoteStatus::Unknown),
                    ..Default::default()
                });
            };

            let mut script = task.script.clone();
            if let Script::FlakyPolls { errors, then } = &script {
                if task.errors_seen < *errors {
                    task.errors_seen += 1;
                    return Err(ProviderError::Unreachable {
                        provider: "mock".to_string(),
                        reason: format!("flaky poll {}", task.errors_seen),
                    }
                    .into());
                }
                script = (**then).clone();
            }
            task.polls += 1;
            let polls = task.polls;

            let snapshot = match script {
                Script::SucceedAfter {
                    polls: n,
                    url,
                    actual_prompt,
                } if polls >= n => PollSnapshot {
                    task_id: task_id.to_string(),
                    status: Some(RemoteStatus::Succeeded),
                    result_url: Some(url),
                    actual_prompt,
                    ..Default::default()
                },
                Script::FailAfter {
                    polls: n,
                    code,
                    message,
                } if polls >= n => PollSnapshot {
                    task_id: task_id.to_string(),
                    status: Some(RemoteStatus::Failed),
                    error_code: Some(code),
                    error_message: Some(message),
                    ..Default::default()
                },
                Script::CancelAfter { polls: n } if polls >= n => PollSnapshot {
                    task_id: task_id.to_string(),
                    status: Some(RemoteStatus::Canceled),
                    ..Default::default()
                },
                Script::Unknown => PollSnapshot {
                    task_id: task_id.to_string(),
                    status: Some(RemoteStatus::Unknown),
                    ..Default::default()
                },
                _ => running(task_id),
            };

            let finished = snapshot.status().is_terminal() && !task.terminal;
            if finished {
                task.terminal = true;
            }
            (snapshot, finished)
        };

        if finished {
            self.finish(task_id, snapshot.status());
        }
        Ok(snapshot)
    }

    async fn cancel(&self, task_id: &str) -> PrismResult<()> {
        self.record(MockEvent::Canceled {
            task_id: task_id.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// MOCK ENHANCEMENT PROVIDER
// ============================================================================

/// Enhancement provider that counts calls and can be slowed down or broken.
#[derive(Debug)]
pub struct MockEnhancementProvider {
    prefix: String,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl MockEnhancementProvider {
    pub fn new() -> Self {
        Self::with_prefix("Enhanced: ")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: None,
        }
    }

    pub fn failing() -> Self {
        let provider = Self::new();
        provider.set_failing(true);
        provider
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// What a successful call returns for `prompt`.
    pub fn expected(&self, prompt: &str) -> String {
        format!("{}{}", self.prefix, prompt)
    }
}

impl Default for MockEnhancementProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnhancementProvider for MockEnhancementProvider {
    fn model_id(&self) -> &str {
        "mock-enhancer"
    }

    async fn enhance(&self, prompt: &str) -> PrismResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PrismError::Enhancement {
                reason: "mock enhancer unavailable".to_string(),
            });
        }
        Ok(self.expected(prompt))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for prompts and requests.

    use super::*;
    use proptest::prelude::*;
    use prism_core::intent::{IMAGE_KEYWORDS, VIDEO_KEYWORDS};

    /// Lower-case filler words containing no media keyword.
    pub fn arb_neutral_prompt() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop::sample::select(vec![
                "sunset", "over", "the", "calm", "sea", "a", "red", "fox", "running", "forest",
                "小猫", "月光", "奔跑", "mountains", "golden", "light",
            ]),
            3..12,
        )
        .prop_map(|words| words.join(" "))
    }

    pub fn arb_video_prompt() -> impl Strategy<Value = String> {
        (arb_neutral_prompt(), prop::sample::select(VIDEO_KEYWORDS))
            .prop_map(|(base, keyword)| format!("{} {}", keyword, base))
    }

    pub fn arb_image_prompt() -> impl Strategy<Value = String> {
        (arb_neutral_prompt(), prop::sample::select(IMAGE_KEYWORDS))
            .prop_map(|(base, keyword)| format!("{} {}", keyword, base))
    }

    /// Prompts whose trimmed length is below `min` characters.
    pub fn arb_short_prompt(min: usize) -> impl Strategy<Value = String> {
        let max = min.saturating_sub(1);
        (prop::collection::vec(prop::char::range('a', 'z'), 0..=max), " {0,3}")
            .prop_map(|(chars, pad)| format!("{}{}{}", pad, chars.into_iter().collect::<String>(), pad))
    }

    pub fn arb_size_token() -> impl Strategy<Value = String> {
        prop_oneof![
            (1u32..=4096, 1u32..=4096).prop_map(|(w, h)| format!("{}*{}", w, h)),
            "[a-z]{1,8}",
            Just("1328*1328".to_string()),
        ]
    }

    pub fn arb_media_kind() -> impl Strategy<Value = MediaKind> {
        prop_oneof![Just(MediaKind::Image), Just(MediaKind::Video)]
    }

    pub fn arb_target_kind() -> impl Strategy<Value = TargetKind> {
        prop_oneof![
            Just(TargetKind::Image),
            Just(TargetKind::Video),
            Just(TargetKind::Auto)
        ]
    }

    pub fn arb_generation_request() -> impl Strategy<Value = GenerationRequest> {
        (
            arb_neutral_prompt(),
            arb_target_kind(),
            prop::option::of(arb_size_token()),
            prop::option::of(prop::sample::select(vec![5u32, 10])),
            prop::option::of(any::<bool>()),
        )
            .prop_map(|(prompt, target, size, duration, watermark)| GenerationRequest {
                prompt,
                target,
                size,
                duration,
                watermark,
                ..Default::default()
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built prompts and requests.

    use super::*;

    /// No explicit media keyword.
    pub const NO_KEYWORD_PROMPT: &str = "一只小猫在月光下奔跑";
    pub const VIDEO_PROMPT: &str = "Generate a video of a sunset";
    pub const IMAGE_PROMPT: &str = "A photo of a lighthouse at dawn";

    pub fn auto_request(prompt: &str) -> GenerationRequest {
        GenerationRequest::new(prompt, TargetKind::Auto)
    }

    pub fn image_request(prompt: &str) -> GenerationRequest {
        GenerationRequest::new(prompt, TargetKind::Image)
    }

    pub fn video_request(prompt: &str) -> GenerationRequest {
        GenerationRequest::new(prompt, TargetKind::Video)
    }

    /// Request with local enhancement turned off.
    pub fn unenhanced(mut request: GenerationRequest) -> GenerationRequest {
        request.enhance = Some(false);
        request
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on Prism error variants.

    use super::*;

    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &PrismResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &PrismResult<T>) {
        match result {
            Err(PrismError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_provider_error<T: std::fmt::Debug>(result: &PrismResult<T>) {
        match result {
            Err(PrismError::Provider(_)) => {}
            other => panic!("Expected Provider error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_timeout<T: std::fmt::Debug>(result: &PrismResult<T>, phase: Phase) {
        match result {
            Err(PrismError::Timeout { phase: p, .. }) => {
                assert_eq!(*p, phase, "Wrong phase in Timeout error")
            }
            other => panic!("Expected {:?} Timeout, got: {:?}", phase, other),
        }
    }

    #[track_caller]
    pub fn assert_download_error<T: std::fmt::Debug>(result: &PrismResult<T>) {
        match result {
            Err(PrismError::Download { .. }) => {}
            other => panic!("Expected Download error, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_mock_succeeds_after_polls() {
        let provider = MockGenerationProvider::new(Script::SucceedAfter {
            polls: 2,
            url: "http://x/a.jpg".into(),
            actual_prompt: None,
        });
        let task = provider.submit(&JobSpec::image("a cat", "1280*960")).await.unwrap();
        assert_eq!(provider.peak_in_flight(), 1);
        let first = provider.poll(MediaKind::Image, &task.task_id).await.unwrap();
        assert_eq!(first.status(), RemoteStatus::Running);
        let second = provider.poll(MediaKind::Image, &task.task_id).await.unwrap();
        assert_eq!(second.status(), RemoteStatus::Succeeded);
        assert_eq!(provider.events().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_flaky_then_success() {
        let provider = MockGenerationProvider::new(Script::FlakyPolls {
            errors: 2,
            then: Box::new(Script::succeed("http://x/b.jpg")),
        });
        let task = provider.submit(&JobSpec::image("a cat", "1280*960")).await.unwrap();
        assert!(provider.poll(MediaKind::Image, &task.task_id).await.is_err());
        assert!(provider.poll(MediaKind::Image, &task.task_id).await.is_err());
        let ok = provider.poll(MediaKind::Image, &task.task_id).await.unwrap();
        assert_eq!(ok.status(), RemoteStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_mock_rejects_queued_submission() {
        let provider = MockGenerationProvider::succeeding("http://x/c.jpg");
        provider.push_script(Script::RejectSubmission {
            code: "InvalidParameter".into(),
            message: "bad size".into(),
        });
        let spec = JobSpec::image("a cat", "1280*960");
        assert!(provider.submit(&spec).await.is_err());
        assert!(provider.submit(&spec).await.is_ok());
        assert_eq!(provider.submissions(), 2);
    }

    #[tokio::test]
    async fn test_mock_enhancer_counts() {
        let provider = MockEnhancementProvider::new();
        assert_eq!(provider.enhance("x").await.unwrap(), "Enhanced: x");
        provider.set_failing(true);
        assert!(provider.enhance("x").await.is_err());
        assert_eq!(provider.calls(), 2);
    }

    proptest! {
        #[test]
        fn prop_short_prompts_are_short(p in generators::arb_short_prompt(3)) {
            prop_assert!(p.trim().chars().count() < 3);
        }

        #[test]
        fn prop_video_prompts_contain_keyword(p in generators::arb_video_prompt()) {
            let analysis = prism_core::IntentClassifier::default().classify(&p);
            prop_assert_eq!(analysis.kind, MediaKind::Video);
        }
    }
}
