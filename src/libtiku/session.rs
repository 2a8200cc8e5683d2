use crate::libtiku::question::{judge_letter, normalize_letters, Question, QuestionBank, QuestionKind};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which collections a quiz draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Single,
    Multi,
    Judge,
    Mixed,
}

impl Mode {
    pub fn pool(self, bank: &QuestionBank) -> Vec<&Question> {
        match self {
            Mode::Single => bank.single.iter().collect(),
            Mode::Multi => bank.multi.iter().collect(),
            Mode::Judge => bank.judge.iter().collect(),
            Mode::Mixed => bank.iter().collect(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Single => "single",
            Mode::Multi => "multi",
            Mode::Judge => "judge",
            Mode::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("unknown mode {0:?} (expected single, multi, judge or mixed)")]
pub struct UnknownMode(String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" | "s" | "1" => Ok(Mode::Single),
            "multi" | "m" | "2" => Ok(Mode::Multi),
            "judge" | "j" | "3" => Ok(Mode::Judge),
            "mixed" | "x" | "4" => Ok(Mode::Mixed),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no {mode} questions available")]
    EmptyPool { mode: Mode },
    #[error("the answer contains no option letters")]
    NoAnswer,
    #[error("{0:?} is not one of the choices")]
    InvalidChoice(String),
    #[error("this question has already been answered")]
    AlreadySubmitted,
    #[error("this question has not been answered yet")]
    NotSubmitted,
    #[error("the quiz is already finished")]
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub correct: bool,
    pub given: Vec<char>,
    pub expected: Vec<char>,
}

/// Compares letter sets: order, repetition and case in `letters` do not matter.
/// An empty stored answer never matches.
pub fn grade(question: &Question, letters: &str) -> Verdict {
    let given = normalize_letters(letters);
    let expected = normalize_letters(&question.answer_str());
    Verdict {
        correct: !expected.is_empty() && given == expected,
        given,
        expected,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub score: usize,
    pub total: usize,
    /// `score / total`, between 0 and 1.
    pub rate: f64,
}

impl Report {
    fn new(score: usize, total: usize) -> Self {
        let rate = if total == 0 {
            0.0
        } else {
            score as f64 / total as f64
        };
        Report { score, total, rate }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Playing { verdict: Option<Verdict> },
    Finished(Report),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Next,
    Finished(Report),
}

/// One linear run through a sample of the bank.
#[derive(Debug, Clone)]
pub struct QuizSession {
    mode: Mode,
    questions: Vec<Question>,
    cursor: usize,
    score: usize,
    phase: Phase,
}

impl QuizSession {
    /// Samples `count` questions (clamped to `1..=pool size`) without replacement.
    pub fn start<R: Rng + ?Sized>(
        bank: &QuestionBank,
        mode: Mode,
        count: usize,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let mut pool = mode.pool(bank);
        if pool.is_empty() {
            return Err(SessionError::EmptyPool { mode });
        }
        let count = count.clamp(1, pool.len());
        pool.shuffle(rng);
        let questions: Vec<Question> = pool.into_iter().take(count).cloned().collect();
        info!("[Setup] Started a {} quiz with {} questions.", mode, questions.len());

        Ok(QuizSession {
            mode,
            questions,
            cursor: 0,
            score: 0,
            phase: Phase::Playing { verdict: None },
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current(&self) -> Option<&Question> {
        match self.phase {
            Phase::Playing { .. } => self.questions.get(self.cursor),
            Phase::Finished(_) => None,
        }
    }

    /// 1-based index of the current question and the session length.
    pub fn position(&self) -> (usize, usize) {
        ((self.cursor + 1).min(self.questions.len()), self.questions.len())
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    pub fn report(&self) -> Option<Report> {
        match self.phase {
            Phase::Finished(report) => Some(report),
            Phase::Playing { .. } => None,
        }
    }

    /// Grades the current question. Judge questions also accept the
    /// true/false words in place of A/B, and reject any other letter.
    pub fn submit(&mut self, input: &str) -> Result<Verdict, SessionError> {
        let question = match &self.phase {
            Phase::Finished(_) => return Err(SessionError::Finished),
            Phase::Playing { verdict: Some(_) } => return Err(SessionError::AlreadySubmitted),
            Phase::Playing { verdict: None } => self
                .questions
                .get(self.cursor)
                .ok_or(SessionError::Finished)?,
        };

        let letters = match question.kind {
            QuestionKind::Judge => match judge_letter(input) {
                Some(letter) => String::from(letter),
                None if normalize_letters(input).is_empty() => {
                    return Err(SessionError::NoAnswer)
                }
                None => return Err(SessionError::InvalidChoice(input.trim().to_string())),
            },
            QuestionKind::Single | QuestionKind::Multi => input.to_string(),
        };
        if normalize_letters(&letters).is_empty() {
            return Err(SessionError::NoAnswer);
        }

        let verdict = grade(question, &letters);
        debug!(
            "[Quiz] Question {} ({}): given {:?}, expected {:?}",
            question.id, question.kind, verdict.given, verdict.expected
        );
        if verdict.correct {
            self.score += 1;
        }
        self.phase = Phase::Playing {
            verdict: Some(verdict.clone()),
        };
        Ok(verdict)
    }

    pub fn advance(&mut self) -> Result<Progress, SessionError> {
        match &self.phase {
            Phase::Finished(_) => return Err(SessionError::Finished),
            Phase::Playing { verdict: None } => return Err(SessionError::NotSubmitted),
            Phase::Playing { verdict: Some(_) } => {}
        }

        self.cursor += 1;
        if self.cursor < self.questions.len() {
            self.phase = Phase::Playing { verdict: None };
            return Ok(Progress::Next);
        }

        let report = Report::new(self.score, self.questions.len());
        info!(
            "[Quiz] Finished: {}/{} ({:.1}%)",
            report.score,
            report.total,
            report.rate * 100.0
        );
        self.phase = Phase::Finished(report);
        Ok(Progress::Finished(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{BTreeMap, HashSet};

    fn question(kind: QuestionKind, id: usize, answer: &[char]) -> Question {
        let options = match kind {
            QuestionKind::Judge => Question::judge_options(),
            _ => ('A'..='D').map(|c| (c, format!("option {c}"))).collect::<BTreeMap<_, _>>(),
        };
        Question {
            kind,
            id: id.to_string(),
            content: format!("question {id}"),
            options,
            answer: answer.to_vec(),
            explanation: String::new(),
        }
    }

    fn bank() -> QuestionBank {
        QuestionBank {
            single: (1..=12).map(|i| question(QuestionKind::Single, i, &['A'])).collect(),
            multi: (1..=3)
                .map(|i| question(QuestionKind::Multi, i, &['A', 'C']))
                .collect(),
            judge: vec![question(QuestionKind::Judge, 1, &['B'])],
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn letter_order_and_case_do_not_matter() {
        let q = question(QuestionKind::Multi, 1, &['A', 'C']);
        assert!(grade(&q, "CA").correct);
        assert!(grade(&q, "AC").correct);
        assert!(grade(&q, "ac").correct);
        assert!(grade(&q, "a, c, a").correct);
        assert!(!grade(&q, "ACD").correct);
        assert!(!grade(&q, "A").correct);
    }

    #[test]
    fn empty_answer_never_grades_correct() {
        let q = question(QuestionKind::Single, 1, &[]);
        assert!(!grade(&q, "A").correct);
        assert!(!grade(&q, "").correct);
    }

    #[test]
    fn sample_is_clamped_to_pool() {
        let session = QuizSession::start(&bank(), Mode::Single, 1000, &mut rng()).unwrap();
        assert_eq!(session.questions().len(), 12);
        let ids: HashSet<&str> = session.questions().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), 12);
    }

    #[test]
    fn zero_count_still_asks_one_question() {
        let session = QuizSession::start(&bank(), Mode::Multi, 0, &mut rng()).unwrap();
        assert_eq!(session.position(), (1, 1));
    }

    #[test]
    fn mixed_mode_draws_from_every_kind() {
        let session = QuizSession::start(&bank(), Mode::Mixed, 100, &mut rng()).unwrap();
        assert_eq!(session.questions().len(), 16);
    }

    #[test]
    fn empty_pool_is_reported() {
        let bank = QuestionBank::default();
        let err = QuizSession::start(&bank, Mode::Judge, 5, &mut rng()).unwrap_err();
        assert_eq!(err, SessionError::EmptyPool { mode: Mode::Judge });
    }

    #[test]
    fn sampled_order_is_stable() {
        let session = QuizSession::start(&bank(), Mode::Single, 5, &mut rng()).unwrap();
        let first: Vec<String> = session.questions().iter().map(|q| q.id.clone()).collect();
        let again: Vec<String> = session.questions().iter().map(|q| q.id.clone()).collect();
        assert_eq!(first, again);
        assert_eq!(session.current().map(|q| q.id.clone()), first.first().cloned());
    }

    #[test]
    fn full_run_reaches_a_report() {
        let mut session = QuizSession::start(&bank(), Mode::Multi, 3, &mut rng()).unwrap();
        assert!(session.submit("ca").unwrap().correct);
        assert_eq!(session.advance().unwrap(), Progress::Next);
        assert!(!session.submit("A").unwrap().correct);
        assert_eq!(session.advance().unwrap(), Progress::Next);
        assert!(session.submit("CCA").unwrap().correct);

        let Progress::Finished(report) = session.advance().unwrap() else {
            panic!("expected the quiz to finish");
        };
        assert_eq!(report.score, 2);
        assert_eq!(report.total, 3);
        assert!((report.rate - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!(session.is_finished());
        assert!(session.current().is_none());
        assert_eq!(session.report(), Some(report));
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut session = QuizSession::start(&bank(), Mode::Judge, 1, &mut rng()).unwrap();
        assert_eq!(session.advance(), Err(SessionError::NotSubmitted));
        assert_eq!(session.submit("？"), Err(SessionError::NoAnswer));
        assert!(session.submit("错").unwrap().correct);
        assert_eq!(session.submit("B"), Err(SessionError::AlreadySubmitted));
        assert!(matches!(session.advance(), Ok(Progress::Finished(_))));
        assert_eq!(session.submit("B"), Err(SessionError::Finished));
        assert_eq!(session.advance(), Err(SessionError::Finished));
    }

    #[test]
    fn judge_accepts_letters_too() {
        let mut session = QuizSession::start(&bank(), Mode::Judge, 1, &mut rng()).unwrap();
        assert!(!session.submit("a").unwrap().correct);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn judge_rejects_letters_outside_true_false() {
        let mut session = QuizSession::start(&bank(), Mode::Judge, 1, &mut rng()).unwrap();
        assert_eq!(
            session.submit("C"),
            Err(SessionError::InvalidChoice("C".to_string()))
        );
        assert_eq!(
            session.submit(" ab "),
            Err(SessionError::InvalidChoice("ab".to_string()))
        );
        assert!(!session.is_finished());
        assert!(session.submit("b").unwrap().correct);
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn modes_parse_from_text() {
        assert_eq!("single".parse::<Mode>().unwrap(), Mode::Single);
        assert_eq!("4".parse::<Mode>().unwrap(), Mode::Mixed);
        assert!("essay".parse::<Mode>().is_err());
    }
}
