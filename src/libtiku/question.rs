use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Option text shown for the "true" side of a judge question.
pub const TRUE_LABEL: &str = "对";
/// Option text shown for the "false" side of a judge question.
pub const FALSE_LABEL: &str = "错";

// Checked before the true words so that "不对"/"不正确" land on B.
const FALSE_WORDS: [&str; 6] = ["不正确", "不对", "错", "×", "✗", "F"];
const TRUE_WORDS: [&str; 5] = ["正确", "对", "√", "✓", "T"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Single,
    Multi,
    Judge,
}

/// How a front end should let the user answer a question of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    RadioChoice,
    MultiChoice,
    BinaryChoice,
}

impl QuestionKind {
    pub fn interaction(self) -> Interaction {
        match self {
            QuestionKind::Single => Interaction::RadioChoice,
            QuestionKind::Multi => Interaction::MultiChoice,
            QuestionKind::Judge => Interaction::BinaryChoice,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuestionKind::Single => "单选",
            QuestionKind::Multi => "多选",
            QuestionKind::Judge => "判断",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuestionKind::Single => "single",
            QuestionKind::Multi => "multi",
            QuestionKind::Judge => "judge",
        };
        f.write_str(name)
    }
}

/// Reasons a parsed question cannot be graded the way its kind promises.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Malformation {
    #[error("no answer recorded")]
    EmptyAnswer,
    #[error("no options recorded")]
    NoOptions,
    #[error("answer letter {0} is not one of the options")]
    UnknownLetter(char),
    #[error("{kind} question has {count} answer letter(s)")]
    AnswerCount { kind: QuestionKind, count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub kind: QuestionKind,
    pub id: String,
    pub content: String,
    pub options: BTreeMap<char, String>,
    /// Sorted, distinct option letters.
    pub answer: Vec<char>,
    pub explanation: String,
}

impl Question {
    pub fn judge_options() -> BTreeMap<char, String> {
        BTreeMap::from([('A', TRUE_LABEL.to_string()), ('B', FALSE_LABEL.to_string())])
    }

    pub fn answer_str(&self) -> String {
        self.answer.iter().collect()
    }

    /// Answer as the user would read it: letters, or the judge label.
    pub fn answer_display(&self) -> String {
        match self.kind {
            QuestionKind::Judge => self
                .answer
                .iter()
                .filter_map(|letter| self.options.get(letter))
                .cloned()
                .collect::<Vec<_>>()
                .join(""),
            _ => self.answer_str(),
        }
    }

    pub fn malformations(&self) -> Vec<Malformation> {
        let mut found = Vec::new();
        if self.options.is_empty() {
            found.push(Malformation::NoOptions);
        }
        if self.answer.is_empty() {
            found.push(Malformation::EmptyAnswer);
            return found;
        }
        for letter in &self.answer {
            if !self.options.contains_key(letter) {
                found.push(Malformation::UnknownLetter(*letter));
            }
        }
        let count = self.answer.len();
        let count_ok = match self.kind {
            QuestionKind::Single | QuestionKind::Judge => count == 1,
            QuestionKind::Multi => count >= 2,
        };
        if !count_ok {
            found.push(Malformation::AnswerCount {
                kind: self.kind,
                count,
            });
        }
        found
    }

    pub fn is_well_formed(&self) -> bool {
        self.malformations().is_empty()
    }
}

/// Maps a judge answer written as a word or symbol to A (true) or B (false).
pub fn judge_letter(text: &str) -> Option<char> {
    let text = text.trim().to_uppercase();
    match text.as_str() {
        "A" => return Some('A'),
        "B" => return Some('B'),
        _ => {}
    }
    if FALSE_WORDS.iter().any(|word| text.contains(word)) {
        Some('B')
    } else if TRUE_WORDS.iter().any(|word| text.contains(word)) {
        Some('A')
    } else {
        None
    }
}

/// Upper-cased ASCII letters of `text`, sorted and de-duplicated.
pub fn normalize_letters(text: &str) -> Vec<char> {
    let mut letters: Vec<char> = text
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    letters.sort_unstable();
    letters.dedup();
    letters
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuestionBank {
    pub single: Vec<Question>,
    pub multi: Vec<Question>,
    pub judge: Vec<Question>,
}

impl QuestionBank {
    pub fn collection(&self, kind: QuestionKind) -> &[Question] {
        match kind {
            QuestionKind::Single => &self.single,
            QuestionKind::Multi => &self.multi,
            QuestionKind::Judge => &self.judge,
        }
    }

    pub(crate) fn push(&mut self, question: Question) {
        match question.kind {
            QuestionKind::Single => self.single.push(question),
            QuestionKind::Multi => self.multi.push(question),
            QuestionKind::Judge => self.judge.push(question),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.single.iter().chain(&self.multi).chain(&self.judge)
    }

    pub fn len(&self) -> usize {
        self.single.len() + self.multi.len() + self.judge.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn malformed(&self) -> Vec<(&Question, Vec<Malformation>)> {
        self.iter()
            .map(|q| (q, q.malformations()))
            .filter(|(_, problems)| !problems.is_empty())
            .collect()
    }
}
