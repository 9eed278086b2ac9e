use std::time::Instant;

use crate::session::typing_test::TypingTest;

/// Stands in for each untyped letter of a skipped word. Never part of a sentence.
pub const SKIP_MARKER: char = '_';

const WORD_SEPARATOR: char = ' ';

#[derive(Clone, Copy, Debug)]
pub struct KeystrokeEvent {
    pub expected: char,
    pub actual: char,
    /// True for the keystroke that started the test clock.
    pub started_test: bool,
}

impl KeystrokeEvent {
    pub fn is_correct(&self) -> bool {
        self.expected == self.actual
    }
}

pub fn is_typeable(ch: char) -> bool {
    !ch.is_whitespace() && !ch.is_control() && ch != SKIP_MARKER
}

pub fn process_char(test: &mut TypingTest, ch: char, now: Instant) -> Option<KeystrokeEvent> {
    if !is_typeable(ch) {
        return None;
    }
    let Some(&expected) = test.target.get(test.input.len()) else {
        return None;
    };

    let started_test = test.started_at.is_none();
    if started_test {
        test.started_at = Some(now);
    }

    test.input.push(ch);

    Some(KeystrokeEvent {
        expected,
        actual: ch,
        started_test,
    })
}

pub fn process_skip(test: &mut TypingTest) -> bool {
    if test.is_complete() {
        return false;
    }
    skip_word(&test.target, &mut test.input, &mut test.skip_history)
}

/// Advance `input` to the start of the next word, filling untyped letters of
/// the current word with [`SKIP_MARKER`]. On the last word the buffer is padded
/// to the full sentence length instead of getting a separator.
///
/// Returns false (and changes nothing) when the cursor sits at the untouched
/// start of a word.
pub fn skip_word(sentence: &[char], input: &mut Vec<char>, history: &mut Vec<usize>) -> bool {
    let current_pos = input.len();
    let words: Vec<&[char]> = sentence.split(|&c| c == WORD_SEPARATOR).collect();

    let mut word_start = 0;
    let mut located = None;
    for (idx, word) in words.iter().enumerate() {
        if current_pos >= word_start && current_pos <= word_start + word.len() {
            located = Some((idx, word_start, word.len()));
            break;
        }
        word_start += word.len() + 1;
    }
    let Some((word_idx, word_start, word_len)) = located else {
        return false;
    };

    let word_end = word_start + word_len;
    let has_started_word = current_pos > word_start;
    let is_word_complete = current_pos == word_end;
    if !has_started_word && !is_word_complete {
        return false;
    }

    history.push(current_pos);

    if !is_word_complete {
        input.extend(std::iter::repeat_n(SKIP_MARKER, word_end - current_pos));
    }

    if word_idx == words.len() - 1 {
        while input.len() < sentence.len() {
            input.push(SKIP_MARKER);
        }
    } else {
        input.push(WORD_SEPARATOR);
    }

    true
}

/// Delete one char, or undo a whole skip when the buffer ends on a separator
/// and a skip is still on record.
pub fn process_backspace(test: &mut TypingTest) -> bool {
    if test.input.is_empty() {
        return false;
    }

    if test.input.last() == Some(&WORD_SEPARATOR)
        && let Some(pos) = test.skip_history.pop()
    {
        test.input.truncate(pos);
    } else {
        test.input.pop();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(test: &TypingTest) -> String {
        test.input.iter().collect()
    }

    fn type_str(test: &mut TypingTest, s: &str) {
        let now = Instant::now();
        for ch in s.chars() {
            process_char(test, ch, now);
        }
    }

    #[test]
    fn test_first_keystroke_starts_clock_once() {
        let mut test = TypingTest::new("ab", 1);
        let t0 = Instant::now();
        let first = process_char(&mut test, 'a', t0).unwrap();
        assert!(first.started_test);
        assert_eq!(test.started_at, Some(t0));

        let second = process_char(&mut test, 'x', t0 + std::time::Duration::from_secs(1)).unwrap();
        assert!(!second.started_test);
        assert!(!second.is_correct());
        assert_eq!((second.expected, second.actual), ('b', 'x'));
        assert_eq!(test.started_at, Some(t0));
    }

    #[test]
    fn test_input_never_exceeds_sentence() {
        let mut test = TypingTest::new("ab", 1);
        type_str(&mut test, "abc");
        assert_eq!(typed(&test), "ab");
        assert!(process_char(&mut test, 'd', Instant::now()).is_none());
    }

    #[test]
    fn test_keystroke_on_empty_sentence_is_ignored() {
        let mut test = TypingTest::new("", 0);
        assert!(process_char(&mut test, 'a', Instant::now()).is_none());
        assert!(test.input.is_empty());
        assert!(test.started_at.is_none());
    }

    #[test]
    fn test_untypeable_chars_are_ignored() {
        let mut test = TypingTest::new("ab", 1);
        assert!(process_char(&mut test, ' ', Instant::now()).is_none());
        assert!(process_char(&mut test, SKIP_MARKER, Instant::now()).is_none());
        assert!(process_char(&mut test, '\n', Instant::now()).is_none());
        assert!(test.input.is_empty());
        assert!(test.started_at.is_none());
    }

    #[test]
    fn test_skip_mid_word_fills_markers_and_separator() {
        let mut test = TypingTest::new("cat dog", 2);
        type_str(&mut test, "ca");
        assert!(process_skip(&mut test));
        assert_eq!(typed(&test), "ca_ ");
        assert_eq!(test.skip_history, vec![2]);
    }

    #[test]
    fn test_skip_at_untouched_word_start_is_noop() {
        let mut test = TypingTest::new("cat dog", 2);
        assert!(!process_skip(&mut test));
        assert!(test.input.is_empty());
        assert!(test.skip_history.is_empty());

        type_str(&mut test, "cat");
        assert!(process_skip(&mut test));
        assert_eq!(typed(&test), "cat ");
        assert!(!process_skip(&mut test));
        assert_eq!(typed(&test), "cat ");
        assert_eq!(test.skip_history, vec![3]);
    }

    #[test]
    fn test_skip_completed_word_only_appends_separator() {
        let mut test = TypingTest::new("cat dog", 2);
        type_str(&mut test, "cxt");
        assert!(process_skip(&mut test));
        assert_eq!(typed(&test), "cxt ");
        assert_eq!(test.skip_history, vec![3]);
    }

    #[test]
    fn test_skip_on_last_word_pads_to_sentence_length() {
        let mut test = TypingTest::new("cat dog", 2);
        type_str(&mut test, "cat");
        process_skip(&mut test);
        type_str(&mut test, "d");
        assert!(process_skip(&mut test));
        assert_eq!(typed(&test), "cat d__");
        assert!(test.is_complete());
    }

    #[test]
    fn test_backspace_undoes_whole_skip() {
        let mut test = TypingTest::new("cat dog", 2);
        type_str(&mut test, "ca");
        process_skip(&mut test);
        assert!(process_backspace(&mut test));
        assert_eq!(typed(&test), "ca");
        assert!(test.skip_history.is_empty());
    }

    #[test]
    fn test_backspace_without_skip_removes_one_char() {
        let mut test = TypingTest::new("cat dog", 2);
        type_str(&mut test, "cat");
        assert!(process_backspace(&mut test));
        assert_eq!(typed(&test), "ca");
    }

    #[test]
    fn test_backspace_inside_next_word_is_char_by_char() {
        let mut test = TypingTest::new("cat dog", 2);
        type_str(&mut test, "c");
        process_skip(&mut test);
        type_str(&mut test, "do");
        process_backspace(&mut test);
        assert_eq!(typed(&test), "c__ d");
        process_backspace(&mut test);
        assert_eq!(typed(&test), "c__ ");
        process_backspace(&mut test);
        assert_eq!(typed(&test), "c");
        assert!(test.skip_history.is_empty());
    }

    #[test]
    fn test_backspace_on_empty_is_noop() {
        let mut test = TypingTest::new("cat", 1);
        assert!(!process_backspace(&mut test));
    }
}
