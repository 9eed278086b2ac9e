use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, error, info, trace, warn};

use crate::config::{self, Config};
use crate::engine::inactivity::InactivityMonitor;
use crate::engine::tasks::{TaskHandle, TaskMode, TaskRunner};
use crate::identity::Identity;
use crate::service::{ServiceError, TestService};
use crate::session::input::{self, SKIP_MARKER};
use crate::session::result::{SubmitRoute, TestResult, submission_route};
use crate::session::typing_test::TypingTest;
use crate::store::sentence_cache::SentenceCache;

pub const FETCH_ERROR_MESSAGE: &str =
    "Error while loading test words, please check your internet connection";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No sentence yet; a fetch may be in flight.
    Idle,
    Active,
    Finished,
    /// The sentence could not be loaded. Only a restart leaves this state.
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Type(char),
    Skip,
    Backspace,
    Retry,
    SelectWordCount(usize),
}

#[derive(Debug)]
pub enum TaskOutcome {
    SentenceFetched {
        word_count: usize,
        result: Result<String, ServiceError>,
    },
    Prefetched {
        word_count: usize,
        result: Result<String, ServiceError>,
    },
    TokenIssued(Result<String, ServiceError>),
    ResultSaved {
        route: SubmitRoute,
        result: Result<(), ServiceError>,
    },
}

/// Typing test state machine. Owns the current session and every task or
/// timer acting on it; all methods run on the event loop thread.
pub struct App {
    phase: Phase,
    word_count: usize,
    test: Option<TypingTest>,
    last_result: Option<TestResult>,
    error_message: Option<String>,
    identity: Identity,
    min_save_accuracy: u32,
    service: Arc<dyn TestService>,
    cache: SentenceCache,
    tasks: TaskRunner<TaskOutcome>,
    fetch_task: Option<TaskHandle>,
    prefetch_task: Option<TaskHandle>,
    token_task: Option<TaskHandle>,
    inactivity: InactivityMonitor,
}

impl App {
    pub fn new(
        config: &Config,
        identity: Identity,
        service: Arc<dyn TestService>,
        cache: SentenceCache,
        task_mode: TaskMode,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            word_count: config::nearest_preset(config.word_count),
            test: None,
            last_result: None,
            error_message: None,
            identity,
            min_save_accuracy: config.min_save_accuracy,
            service,
            cache,
            tasks: TaskRunner::new(task_mode),
            fetch_task: None,
            prefetch_task: None,
            token_task: None,
            inactivity: InactivityMonitor::new(config.inactivity_timeout()),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn test(&self) -> Option<&TypingTest> {
        self.test.as_ref()
    }

    pub fn last_result(&self) -> Option<&TestResult> {
        self.last_result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.fetch_task.is_some()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn cache(&self) -> &SentenceCache {
        &self.cache
    }

    /// Guest name edits are refused once typing has begun.
    pub fn guest_name_locked(&self) -> bool {
        self.identity.is_authenticated() || self.test.as_ref().is_some_and(|t| t.has_started())
    }

    pub fn inactivity_armed(&self) -> bool {
        self.inactivity.is_armed()
    }

    /// Begin a fresh session for the current word count, discarding the old one.
    pub fn start(&mut self) {
        self.cancel_session_tasks();
        self.test = None;
        self.last_result = None;
        self.error_message = None;
        self.phase = Phase::Idle;

        match self.cache.consume(self.word_count).map(checked_sentence) {
            Some(Ok(sentence)) => {
                debug!("using cached sentence for {} words", self.word_count);
                self.activate(&sentence);
                self.prefetch();
            }
            Some(Err(e)) => {
                warn!("discarding cached sentence: {e}");
                self.fetch_sentence();
            }
            None => self.fetch_sentence(),
        }
    }

    pub fn select_word_count(&mut self, word_count: usize) {
        let word_count = config::nearest_preset(word_count);
        if let Err(e) = self.cache.clear(self.word_count) {
            warn!("failed to clear cached sentence for {} words: {e}", self.word_count);
        }
        info!("word count changed {} -> {word_count}", self.word_count);
        self.word_count = word_count;
        self.start();
    }

    pub fn handle(&mut self, command: Command, now: Instant) {
        match command {
            Command::Type(ch) => self.type_char(ch, now),
            Command::Skip => self.skip(now),
            Command::Backspace => self.backspace(now),
            Command::Retry => self.start(),
            Command::SelectWordCount(n) => self.select_word_count(n),
        }
    }

    /// Apply finished background work and expire the inactivity timer.
    pub fn poll(&mut self, now: Instant) {
        for outcome in self.tasks.drain() {
            self.apply_outcome(outcome);
        }

        if self.inactivity.poll(now) && !self.identity.is_authenticated() {
            info!(
                "clearing guest name after {}s of inactivity",
                self.inactivity.timeout().as_secs()
            );
            self.identity.clear_guest_name();
        }
    }

    pub fn set_guest_name(&mut self, name: &str, now: Instant) -> bool {
        if self.guest_name_locked() {
            return false;
        }
        self.identity.set_guest_name(name);
        self.inactivity.arm(now);
        true
    }

    /// Cancel everything still in flight and give pending result saves up to
    /// `grace` to finish. Called on teardown.
    pub fn shutdown(&mut self, grace: Duration) {
        self.cancel_session_tasks();
        let abandoned = self.tasks.join_detached(grace);
        if abandoned > 0 {
            warn!("abandoning {abandoned} result save(s) still in flight at exit");
        }
    }

    fn cancel_session_tasks(&mut self) {
        for handle in [
            self.fetch_task.take(),
            self.prefetch_task.take(),
            self.token_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.cancel();
        }
        self.inactivity.cancel();
    }

    fn activate(&mut self, sentence: &str) {
        self.test = Some(TypingTest::new(sentence, self.word_count));
        self.phase = Phase::Active;
    }

    fn fetch_sentence(&mut self) {
        let service = Arc::clone(&self.service);
        let credential = self.identity.credential().cloned();
        let word_count = self.word_count;
        self.fetch_task = Some(self.tasks.spawn(move || TaskOutcome::SentenceFetched {
            word_count,
            result: service
                .start_test(word_count, credential.as_ref())
                .and_then(|r| checked_sentence(r.sentence)),
        }));
    }

    fn prefetch(&mut self) {
        let service = Arc::clone(&self.service);
        let credential = self.identity.credential().cloned();
        let word_count = self.word_count;
        self.prefetch_task = Some(self.tasks.spawn(move || TaskOutcome::Prefetched {
            word_count,
            result: service
                .start_test(word_count, credential.as_ref())
                .and_then(|r| checked_sentence(r.sentence)),
        }));
    }

    fn request_token(&mut self) {
        let (Some(credential), Some(test)) = (self.identity.credential().cloned(), &self.test)
        else {
            return;
        };
        let service = Arc::clone(&self.service);
        let sentence = test.sentence();
        self.token_task = Some(self.tasks.spawn(move || {
            TaskOutcome::TokenIssued(
                service
                    .generate_test_token(&sentence, &credential)
                    .map(|r| r.token),
            )
        }));
    }

    fn apply_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::SentenceFetched { word_count, result } => {
                self.fetch_task = None;
                match result {
                    Ok(sentence) => {
                        self.activate(&sentence);
                        self.prefetch();
                    }
                    Err(e) => {
                        error!("failed to load sentence for {word_count} words: {e}");
                        self.phase = Phase::Error;
                        self.error_message = Some(FETCH_ERROR_MESSAGE.to_string());
                    }
                }
            }
            TaskOutcome::Prefetched { word_count, result } => {
                self.prefetch_task = None;
                match result {
                    Ok(sentence) => {
                        if let Err(e) = self.cache.store(word_count, &sentence) {
                            warn!("failed to cache sentence for {word_count} words: {e}");
                        }
                    }
                    Err(e) => {
                        warn!("prefetch for {word_count} words failed: {e}");
                        if let Err(e) = self.cache.clear(word_count) {
                            warn!("failed to clear cached sentence for {word_count} words: {e}");
                        }
                    }
                }
            }
            TaskOutcome::TokenIssued(result) => {
                self.token_task = None;
                match result {
                    Ok(token) => {
                        if let Some(test) = self.test.as_mut() {
                            debug!("test token attached");
                            test.test_token = Some(token);
                        }
                    }
                    Err(e) => warn!("test token request failed, continuing without: {e}"),
                }
            }
            TaskOutcome::ResultSaved { route, result } => match result {
                Ok(()) => info!("result saved ({route:?})"),
                Err(e) => error!("failed to save result ({route:?}): {e}"),
            },
        }
    }

    fn type_char(&mut self, ch: char, now: Instant) {
        if self.phase != Phase::Active {
            return;
        }
        let Some(test) = self.test.as_mut() else {
            return;
        };
        let Some(event) = input::process_char(test, ch, now) else {
            return;
        };
        if !event.is_correct() {
            trace!("typed {:?} where {:?} was expected", event.actual, event.expected);
        }

        self.touch(now);
        if event.started_test {
            self.request_token();
        }
        self.finish_if_complete(now);
    }

    fn skip(&mut self, now: Instant) {
        if self.phase != Phase::Active {
            return;
        }
        if self.test.as_mut().is_some_and(input::process_skip) {
            self.touch(now);
            self.finish_if_complete(now);
        }
    }

    fn backspace(&mut self, now: Instant) {
        if self.phase != Phase::Active {
            return;
        }
        if self.test.as_mut().is_some_and(input::process_backspace) {
            self.touch(now);
        }
    }

    fn touch(&mut self, now: Instant) {
        if !self.identity.is_authenticated() {
            self.inactivity.arm(now);
        }
    }

    fn finish_if_complete(&mut self, now: Instant) {
        let Some(test) = self.test.as_mut() else {
            return;
        };
        if !test.is_complete() {
            return;
        }
        if test.started_at.is_none() {
            error!("test filled without a start time, not finishing");
            return;
        }

        test.finished_at = Some(now);
        let summary = test.diff();
        let evaluated = summary.evaluated();
        let result = TestResult::from_test(test, summary, Utc::now());
        let test_token = test.test_token.clone();
        info!(
            "test finished: {} wpm, {}% accuracy over {evaluated} chars, {:.2}s",
            result.metrics.wpm, result.metrics.accuracy_percent, result.metrics.elapsed_secs
        );

        self.phase = Phase::Finished;
        self.token_task = None;
        self.submit(&result, test_token);
        self.last_result = Some(result);
    }

    fn submit(&mut self, finished: &TestResult, test_token: Option<String>) {
        let route = match submission_route(&finished.metrics, &self.identity, self.min_save_accuracy)
        {
            Ok(route) => route,
            Err(reason) => {
                debug!(
                    "result not saved ({reason:?}): accuracy {}%",
                    finished.metrics.accuracy_percent
                );
                return;
            }
        };

        let payload = finished.payload(&self.identity, test_token.as_deref());
        let credential = self.identity.credential().cloned();
        let service = Arc::clone(&self.service);
        self.tasks.spawn_detached(move || {
            let result = match route {
                SubmitRoute::Authenticated => {
                    service.save_result(&payload, credential.as_ref(), payload.test_token.as_deref())
                }
                SubmitRoute::Guest => service.save_guest_result(&payload),
            };
            TaskOutcome::ResultSaved { route, result }
        });
    }
}

/// Reject sentences the skip logic cannot work with.
fn checked_sentence(sentence: String) -> Result<String, ServiceError> {
    let sentence = sentence.trim();
    if sentence.is_empty() {
        return Err(ServiceError::InvalidSentence("empty"));
    }
    if sentence.contains(SKIP_MARKER) {
        return Err(ServiceError::InvalidSentence("contains the skip marker"));
    }
    Ok(sentence.to_string())
}
