//! Quiz-text parsing.
//!
//! The assistant answers quiz prompts with loosely formatted text: a question line,
//! four lettered options and an `Answer: <letter>` line per question. This module
//! pulls structured questions out of that text. Blocks that are missing an option
//! or a recognisable answer are dropped silently.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Number of questions kept when the caller does not say otherwise.
pub const DEFAULT_MAX_QUESTIONS: usize = 10;

const LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

struct Patterns {
    numbered: Regex,
    option: Regex,
    answer: Regex,
}

#[allow(clippy::expect_used)] // literal patterns
static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    numbered: Regex::new(r"(?i)^(?:(?:question|q)\s*\d*\s*[.):\-]|\d+\s*[.):\-])\s*")
        .expect("question pattern"),
    option: Regex::new(r"^\(?([A-Da-d])\s*[).:\]]\s*(.+)$").expect("option pattern"),
    // "Answer: B" / "Answer - (b) ..." or a bare trailing "Answer C"
    answer: Regex::new(concat!(
        r"(?i)^(?:correct\s+)?answer",
        r"(?:\s*[:\-]\s*\(?([a-d])(?:[\s.):]|$)|\s+\(?([a-d])\)?[.)]?\s*$)",
    ))
    .expect("answer pattern"),
});

/// One multiple-choice question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Question text without numbering
    pub question: String,
    /// Options A to D, in order
    pub options: [String; 4],
    /// Correct option letter, `'A'` to `'D'`
    pub answer: char,
}

impl QuizQuestion {
    /// Zero-based index of the correct option.
    #[must_use]
    pub fn answer_index(&self) -> usize {
        LETTERS.iter().position(|c| *c == self.answer).unwrap_or_default()
    }
}

/// Extracts up to `max` questions from `text`, in source order.
#[must_use]
pub fn parse_quiz(text: &str, max: usize) -> Vec<QuizQuestion> {
    let blocks = split_blocks(text);
    let total = blocks.len();
    let questions: Vec<QuizQuestion> = blocks
        .iter()
        .filter_map(|block| parse_block(block))
        .take(max)
        .collect();
    debug!("Parsed {} quiz questions from {} blocks", questions.len(), total);
    questions
}

fn clean(line: &str) -> &str {
    line.trim().trim_matches(|c| c == '*' || c == '#' || c == '_').trim()
}

// Blocks end at blank lines and answer lines; a numbered question line starts a new
// one, and so does any plain line once four options have been seen.
fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let patterns = &*PATTERNS;
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut options_seen = 0;

    for raw in text.lines() {
        let line = clean(raw);
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            options_seen = 0;
            continue;
        }
        let is_answer = patterns.answer.is_match(line);
        let is_option = !is_answer && patterns.option.is_match(line);
        let starts_question = patterns.numbered.is_match(line)
            || (options_seen >= LETTERS.len() && !is_answer && !is_option);
        if starts_question && !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
            options_seen = 0;
        }
        current.push(line);
        if is_option {
            options_seen += 1;
        }
        if is_answer {
            blocks.push(std::mem::take(&mut current));
            options_seen = 0;
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn letter_index(letter: &str) -> Option<usize> {
    let upper = letter.chars().next()?.to_ascii_uppercase();
    LETTERS.iter().position(|c| *c == upper)
}

fn parse_block(lines: &[&str]) -> Option<QuizQuestion> {
    let patterns = &*PATTERNS;
    let mut question = String::new();
    let mut options: [Option<String>; 4] = Default::default();
    let mut answer = None;

    for line in lines {
        if let Some(caps) = patterns.answer.captures(line) {
            answer = caps
                .get(1)
                .or_else(|| caps.get(2))
                .and_then(|letter| letter_index(letter.as_str()));
            continue;
        }
        if let Some(caps) = patterns.option.captures(line) {
            if let Some(slot) = letter_index(&caps[1]).and_then(|i| options.get_mut(i)) {
                if slot.is_none() {
                    *slot = Some(caps[2].trim().to_string());
                }
            }
            continue;
        }
        // Text before the first option belongs to the question
        if options.iter().all(Option::is_none) {
            let text = patterns.numbered.replace(line, "");
            if !question.is_empty() {
                question.push(' ');
            }
            question.push_str(text.trim());
        }
    }

    let answer = answer?;
    if question.is_empty() {
        return None;
    }
    let [Some(a), Some(b), Some(c), Some(d)] = options else {
        return None;
    };
    Some(QuizQuestion {
        question,
        options: [a, b, c, d],
        answer: LETTERS[answer],
    })
}
