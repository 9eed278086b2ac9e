use crate::session::input::SKIP_MARKER;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharStatus {
    Correct,
    Incorrect(char),
    Skipped,
    Pending,
}

/// A target index the user got wrong, either by typing another char or by
/// skipping past it (`typed` is `None`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrongPosition {
    pub position: usize,
    pub expected: char,
    pub typed: Option<char>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub correct: usize,
    pub incorrect: usize,
    pub wrong_positions: Vec<WrongPosition>,
}

impl DiffSummary {
    pub fn evaluated(&self) -> usize {
        self.correct + self.incorrect
    }
}

pub fn char_status(expected: char, typed: Option<char>) -> CharStatus {
    match typed {
        None => CharStatus::Pending,
        Some(SKIP_MARKER) => CharStatus::Skipped,
        Some(ch) if ch == expected => CharStatus::Correct,
        Some(ch) => CharStatus::Incorrect(ch),
    }
}

/// Per-index status of the whole target, used for live rendering.
pub fn live_statuses(target: &[char], input: &[char]) -> Vec<CharStatus> {
    target
        .iter()
        .enumerate()
        .map(|(i, &expected)| char_status(expected, input.get(i).copied()))
        .collect()
}

/// Compare `input` against `target`. Indices past the end of `input` are not
/// counted, so the result is only authoritative once both have equal length.
pub fn diff(target: &[char], input: &[char]) -> DiffSummary {
    let mut summary = DiffSummary::default();

    for (position, &expected) in target.iter().enumerate() {
        match char_status(expected, input.get(position).copied()) {
            CharStatus::Correct => summary.correct += 1,
            CharStatus::Pending => {}
            CharStatus::Skipped => {
                summary.incorrect += 1;
                summary.wrong_positions.push(WrongPosition {
                    position,
                    expected,
                    typed: None,
                });
            }
            CharStatus::Incorrect(typed) => {
                summary.incorrect += 1;
                summary.wrong_positions.push(WrongPosition {
                    position,
                    expected,
                    typed: Some(typed),
                });
            }
        }
    }

    summary
}
