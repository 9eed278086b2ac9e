use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::session::diff::{DiffSummary, WrongPosition};
use crate::session::typing_test::TypingTest;

/// Speed and accuracy figures for a finished test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    /// Fraction of evaluated chars that were correct, 0.0..=1.0.
    pub accuracy: f64,
    pub accuracy_percent: u32,
    pub raw_wpm: u32,
    pub wpm: u32,
    pub cpm: u32,
    pub elapsed_secs: f64,
    pub word_count: usize,
    pub character_count: usize,
}

impl Metrics {
    pub fn compute(elapsed_secs: f64, word_count: usize, correct: usize, incorrect: usize) -> Self {
        let character_count = correct + incorrect;
        let accuracy = if character_count > 0 {
            correct as f64 / character_count as f64
        } else {
            0.0
        };

        let elapsed_minutes = elapsed_secs / 60.0;
        let (raw_wpm, cpm) = if elapsed_minutes > 0.0 {
            (
                round_count(word_count as f64 / elapsed_minutes),
                round_count(correct as f64 / elapsed_minutes),
            )
        } else {
            (0, 0)
        };

        Self {
            accuracy,
            accuracy_percent: round_count(accuracy * 100.0),
            raw_wpm,
            wpm: round_count(raw_wpm as f64 * accuracy),
            cpm,
            elapsed_secs,
            word_count,
            character_count,
        }
    }
}

fn round_count(value: f64) -> u32 {
    value.round() as u32
}

/// Body posted to the results endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub accuracy: u32,
    pub raw: u32,
    pub wpm: u32,
    pub cpm: u32,
    pub time: f64,
    pub words: usize,
    pub characters: usize,
    pub sentence: String,
    pub user_input: String,
    pub timestamp: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_token: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TestResult {
    pub metrics: Metrics,
    pub correct: usize,
    pub incorrect: usize,
    pub wrong_positions: Vec<WrongPosition>,
    pub sentence: String,
    pub user_input: String,
    pub completed_at: DateTime<Utc>,
}

impl TestResult {
    pub fn from_test(test: &TypingTest, summary: DiffSummary, completed_at: DateTime<Utc>) -> Self {
        let metrics = Metrics::compute(
            test.elapsed_secs(),
            test.word_count,
            summary.correct,
            summary.incorrect,
        );

        Self {
            metrics,
            correct: summary.correct,
            incorrect: summary.incorrect,
            wrong_positions: summary.wrong_positions,
            sentence: test.sentence(),
            user_input: test.typed(),
            completed_at,
        }
    }

    pub fn payload(&self, identity: &Identity, test_token: Option<&str>) -> ResultPayload {
        ResultPayload {
            accuracy: self.metrics.accuracy_percent,
            raw: self.metrics.raw_wpm,
            wpm: self.metrics.wpm,
            cpm: self.metrics.cpm,
            time: (self.metrics.elapsed_secs * 100.0).round() / 100.0,
            words: self.metrics.word_count,
            characters: self.metrics.character_count,
            sentence: self.sentence.clone(),
            user_input: self.user_input.clone(),
            timestamp: self.completed_at.timestamp_millis(),
            username: identity.submitted_name().to_string(),
            test_token: test_token.map(str::to_string),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitRoute {
    Authenticated,
    Guest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    LowAccuracy,
    Anonymous,
}

/// Decide whether and where a result is saved.
pub fn submission_route(
    metrics: &Metrics,
    identity: &Identity,
    min_accuracy_percent: u32,
) -> Result<SubmitRoute, SkipReason> {
    if !identity.can_submit() {
        return Err(SkipReason::Anonymous);
    }
    if metrics.accuracy_percent < min_accuracy_percent {
        return Err(SkipReason::LowAccuracy);
    }
    if identity.is_authenticated() {
        Ok(SubmitRoute::Authenticated)
    } else {
        Ok(SubmitRoute::Guest)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::service::Credential;
    use crate::session::input;

    #[test]
    fn test_metrics_for_exact_two_word_run() {
        let m = Metrics::compute(6.0, 2, 7, 0);
        assert_eq!(m.accuracy_percent, 100);
        assert_eq!(m.raw_wpm, 20);
        assert_eq!(m.wpm, 20);
        assert_eq!(m.cpm, 70);
        assert_eq!(m.character_count, 7);
    }

    #[test]
    fn test_wpm_is_weighted_by_accuracy() {
        // 10 words in 30s -> raw 20; accuracy 3/4
        let m = Metrics::compute(30.0, 10, 30, 10);
        assert_eq!(m.raw_wpm, 20);
        assert_eq!(m.wpm, 15);
        assert_eq!(m.cpm, 60);
        assert_eq!(m.accuracy_percent, 75);
    }

    #[test]
    fn test_zero_evaluated_chars_has_zero_accuracy() {
        let m = Metrics::compute(10.0, 2, 0, 0);
        assert_eq!(m.accuracy, 0.0);
        assert_eq!(m.wpm, 0);
        assert_eq!(m.raw_wpm, 12);
    }

    #[test]
    fn test_zero_elapsed_yields_zero_speed() {
        let m = Metrics::compute(0.0, 2, 7, 0);
        assert_eq!(m.raw_wpm, 0);
        assert_eq!(m.cpm, 0);
        assert_eq!(m.accuracy_percent, 100);
    }

    #[test]
    fn test_metrics_are_deterministic() {
        let a = Metrics::compute(12.34, 15, 70, 9);
        let b = Metrics::compute(12.34, 15, 70, 9);
        assert_eq!(a, b);
    }

    #[test]
    fn test_payload_serializes_camel_case_and_omits_missing_token() {
        let mut test = TypingTest::new("ab", 1);
        let t0 = Instant::now();
        input::process_char(&mut test, 'a', t0);
        input::process_char(&mut test, 'b', t0);
        test.finished_at = Some(t0 + Duration::from_millis(1234));

        let result = TestResult::from_test(&test, test.diff(), Utc::now());
        let payload = result.payload(&Identity::guest("ana"), None);
        assert_eq!(payload.time, 1.23);
        assert_eq!(payload.username, "ana");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["userInput"], "ab");
        assert_eq!(json["characters"], 2);
        assert!(json.get("testToken").is_none());

        let with_token = result.payload(&Identity::authenticated(Credential::new("c")), Some("tk"));
        let json = serde_json::to_value(&with_token).unwrap();
        assert_eq!(json["testToken"], "tk");
        assert_eq!(json["username"], "");
    }

    #[test]
    fn test_submission_gate() {
        let passing = Metrics::compute(10.0, 2, 7, 3);
        assert_eq!(passing.accuracy_percent, 70);
        assert_eq!(
            submission_route(&passing, &Identity::default(), 70),
            Err(SkipReason::Anonymous)
        );
        assert_eq!(
            submission_route(&passing, &Identity::guest("ana"), 70),
            Ok(SubmitRoute::Guest)
        );
        assert_eq!(
            submission_route(&passing, &Identity::authenticated(Credential::new("c")), 70),
            Ok(SubmitRoute::Authenticated)
        );

        let failing = Metrics::compute(10.0, 2, 6, 4);
        assert_eq!(
            submission_route(&failing, &Identity::guest("ana"), 70),
            Err(SkipReason::LowAccuracy)
        );
    }
}
