//! Line-oriented reader for plain-text question banks.
//!
//! The bank is split into sections headed by a Chinese numeral marker
//! (`一、单项选择题`). Inside a choice section each question starts with
//! `<n>.` or `<n>．`, followed by option lines, an `答案：` line and an
//! optional `答案解析：` line. Formatting is inconsistent in practice, so every
//! line is classified best-effort and nothing here ever fails.

use crate::libtiku::question::{
    judge_letter, normalize_letters, Question, QuestionBank, QuestionKind,
};
use log::{debug, info, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[一二三四五六七八九十]+\s*[、.．]\s*(.*)$").unwrap());
static QUESTION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*[.．](.*)$").unwrap());
static GLUED_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s[A-E]\s*[.．]").unwrap());
static OPTION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)([A-E])\s*[.．]").unwrap());
static ANSWER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^答案\s*[：:]\s*(.*)$").unwrap());
static EXPLANATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:答案)?解析\s*[：:]\s*(.*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Kind(QuestionKind),
    Ignore,
}

impl Section {
    fn from_title(title: &str) -> Section {
        if title.contains("单项") || title.contains("单选") {
            Section::Kind(QuestionKind::Single)
        } else if title.contains("多项") || title.contains("多选") {
            Section::Kind(QuestionKind::Multi)
        } else if title.contains("判断") {
            Section::Kind(QuestionKind::Judge)
        } else {
            Section::Ignore
        }
    }
}

/// A question still receiving lines.
#[derive(Debug)]
struct Draft {
    kind: QuestionKind,
    id: String,
    content: String,
    options: BTreeMap<char, String>,
    answer: String,
    explanation: Option<String>,
}

impl Draft {
    fn new(kind: QuestionKind, id: &str, content: &str) -> Self {
        Draft {
            kind,
            id: id.to_string(),
            content: content.to_string(),
            options: BTreeMap::new(),
            answer: String::new(),
            explanation: None,
        }
    }

    /// Stem wrapped across lines until the first option shows up, then the
    /// highest-lettered option. This is a heuristic: a stem paragraph that
    /// follows an option is indistinguishable from a wrapped option.
    fn continue_with(&mut self, line: &str) {
        match self.options.last_entry() {
            Some(mut entry) => {
                let text = entry.get_mut();
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(line);
            }
            None => self.content.push_str(line),
        }
    }

    fn add_options(&mut self, line: &str) -> bool {
        let marks: Vec<(char, usize, usize)> = OPTION_TOKEN
            .captures_iter(line)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let letter = caps.get(1)?.as_str().chars().next()?;
                Some((letter, whole.start(), whole.end()))
            })
            .collect();
        let Some(&(_, first_start, _)) = marks.first() else {
            return false;
        };

        let prefix = line[..first_start].trim();
        if !prefix.is_empty() {
            self.continue_with(prefix);
        }
        for (idx, &(letter, _, end)) in marks.iter().enumerate() {
            let stop = marks.get(idx + 1).map_or(line.len(), |next| next.1);
            self.options.insert(letter, line[end..stop].trim().to_string());
        }
        true
    }

    fn finish(self) -> Question {
        let (options, answer) = match self.kind {
            QuestionKind::Judge => (
                Question::judge_options(),
                judge_letter(&self.answer).into_iter().collect(),
            ),
            QuestionKind::Single | QuestionKind::Multi => {
                // Only the leading letter run counts; notes like `（见P12）` follow it.
                let leading: String = self
                    .answer
                    .chars()
                    .take_while(|c| {
                        c.is_ascii_alphabetic() || c.is_whitespace() || matches!(c, ',' | '，' | '、')
                    })
                    .collect();
                let letters = normalize_letters(&leading)
                    .into_iter()
                    .filter(|letter| ('A'..='E').contains(letter))
                    .collect();
                (self.options, letters)
            }
        };
        Question {
            kind: self.kind,
            id: self.id,
            content: self.content,
            options,
            answer,
            explanation: self.explanation.unwrap_or_default(),
        }
    }
}

#[derive(Debug)]
struct Parser {
    section: Section,
    draft: Option<Draft>,
    bank: QuestionBank,
}

impl Parser {
    fn new() -> Self {
        Parser {
            section: Section::Ignore,
            draft: None,
            bank: QuestionBank::default(),
        }
    }

    fn feed(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        if let Some(caps) = SECTION.captures(line) {
            self.finalize();
            self.section = Section::from_title(&caps[1]);
            debug!("[Parse] Section {:?} -> {:?}", &caps[1], self.section);
            return;
        }

        let Section::Kind(kind) = self.section else {
            return;
        };

        if let Some(caps) = QUESTION_START.captures(line) {
            self.finalize();
            let rest = caps[2].trim();
            let (stem, glued) = split_glued_option(rest);
            self.draft = Some(Draft::new(kind, &caps[1], stem));
            if let Some(glued) = glued {
                debug!("[Parse] Question {} has a glued option: {:?}", &caps[1], glued);
                self.classify(glued);
            }
            return;
        }

        self.classify(line);
    }

    fn classify(&mut self, line: &str) {
        let Some(draft) = self.draft.as_mut() else {
            debug!("[Parse] Dropping line outside any question: {:?}", line);
            return;
        };

        if let Some(caps) = ANSWER.captures(line) {
            draft.answer = caps[1].trim().to_string();
            return;
        }
        if let Some(caps) = EXPLANATION.captures(line) {
            draft.explanation = Some(caps[1].trim().to_string());
            return;
        }
        if line.starts_with("答案") {
            debug!("[Parse] Dropping unlabelled answer line: {:?}", line);
            return;
        }
        if let Some(explanation) = draft.explanation.as_mut() {
            if !explanation.is_empty() {
                explanation.push(' ');
            }
            explanation.push_str(line);
            return;
        }

        match draft.kind {
            QuestionKind::Judge => draft.content.push_str(line),
            QuestionKind::Single | QuestionKind::Multi => {
                if !draft.add_options(line) {
                    draft.continue_with(line);
                }
            }
        }
    }

    fn finalize(&mut self) {
        let Some(draft) = self.draft.take() else {
            return;
        };
        let question = draft.finish();
        let problems = question.malformations();
        if !problems.is_empty() {
            let reasons: Vec<String> = problems.iter().map(ToString::to_string).collect();
            warn!(
                "[Parse] {} question {} is malformed: {}",
                question.kind,
                question.id,
                reasons.join("; ")
            );
        }
        debug!("[Parse] Finished {:?}", question);
        self.bank.push(question);
    }

    fn finish(mut self) -> QuestionBank {
        self.finalize();
        info!(
            "[Parse] Loaded {} single, {} multi and {} judge questions.",
            self.bank.single.len(),
            self.bank.multi.len(),
            self.bank.judge.len()
        );
        self.bank
    }
}

/// Splits `3.What is 2+2? A.3 B.4` style remainders into the stem and the
/// option text that was glued onto it.
fn split_glued_option(rest: &str) -> (&str, Option<&str>) {
    match GLUED_OPTION.find(rest) {
        Some(m) => (rest[..m.start()].trim_end(), Some(rest[m.start()..].trim())),
        None => (rest, None),
    }
}

/// Parses a whole bank. Never fails: lines that cannot be placed are dropped.
pub fn parse(text: &str) -> QuestionBank {
    let mut parser = Parser::new();
    for line in text.trim_start_matches('\u{feff}').lines() {
        parser.feed(line);
    }
    parser.finish()
}
