use crate::libtiku::question::{Interaction, Question, QuestionBank};
use crate::libtiku::session::{Mode, Progress, QuizSession, Report, SessionError, Verdict};
use crate::Error;
use colored::Colorize;
use log::debug;
use rand::Rng;
use std::io::{self, Write};
use text_io::try_read;

const DEFAULT_COUNT: usize = 5;

#[derive(Debug, PartialEq)]
enum Choice {
    Answer(String),
    Quit,
}

impl Choice {
    fn from_str(input: &str) -> Choice {
        match input.trim() {
            "q" | "Q" => Choice::Quit,
            answer => Choice::Answer(answer.to_string()),
        }
    }
}

/// `None` once stdin is closed or unreadable.
fn prompt(text: &str) -> Option<String> {
    print!("{} ", text.cyan());
    if let Err(err) = io::stdout().flush() {
        debug!("[Input] Cannot flush stdout: {}", err);
    }
    let line: Result<String, text_io::Error> = try_read!("{}\n");
    match line {
        Ok(line) => Some(line.trim().to_string()),
        Err(err) => {
            debug!("[Input] Cannot read line: {:?}", err);
            None
        }
    }
}

fn pick_mode() -> Option<Mode> {
    loop {
        let input = prompt("\n请选择题型 (1: 单选题, 2: 多选题, 3: 判断题, 4: 混合模式, q: 退出):")?;
        if input.eq_ignore_ascii_case("q") {
            return None;
        }
        match input.parse::<Mode>() {
            Ok(mode) => return Some(mode),
            Err(err) => {
                debug!("[Setup] {}", err);
                println!("{}", "无效输入".bright_red());
            }
        }
    }
}

fn pick_count(pool_size: usize) -> Option<usize> {
    let input = prompt(&format!("请输入刷题数量 (最大 {}):", pool_size))?;
    Some(input.parse().unwrap_or(DEFAULT_COUNT))
}

fn answer_prompt(interaction: Interaction) -> &'static str {
    match interaction {
        Interaction::RadioChoice => "请输入答案 (单个字母, q 提前结束):",
        Interaction::MultiChoice => "请输入答案 (多个字母, 如 AC, q 提前结束):",
        Interaction::BinaryChoice => "请判断 (对/错 或 A/B, q 提前结束):",
    }
}

fn show_question(idx: usize, total: usize, question: &Question) {
    let leading = format!("[{}/{}] ", idx, total);
    println!(
        "\n{}{}",
        leading.cyan(),
        format!("【{}】 {}", question.kind.label(), question.content).bold()
    );
    let indent = " ".repeat(2);
    for (letter, text) in &question.options {
        println!("{}{}. {}", indent, letter.to_string().bold(), text);
    }
}

fn show_verdict(question: &Question, verdict: &Verdict) {
    if verdict.correct {
        println!("{}", "✅ 回答正确！".bright_green());
        return;
    }
    println!(
        "{}",
        format!("❌ 回答错误。正确答案是: {}", question.answer_display()).bright_red()
    );
    if !question.explanation.is_empty() {
        println!("   {}", format!("解析: {}", question.explanation).green());
    }
}

fn show_report(report: &Report) {
    let line = format!(
        "\n测试结束！你的得分: {}/{} ({:.1}%)",
        report.score,
        report.total,
        report.rate * 100.0
    );
    if report.rate >= 0.6 {
        println!("{}", line.bright_green());
    } else {
        println!("{}", line.bright_red());
    }
}

/// Runs one session to the end, or until the user quits.
fn play(mut session: QuizSession) -> Result<(), Error> {
    println!(
        "{}",
        format!(
            "\n=== 开始测试 ({}, 共 {} 题) ===",
            session.mode(),
            session.questions().len()
        )
        .cyan()
    );

    while !session.is_finished() {
        let Some(question) = session.current().cloned() else {
            break;
        };
        let (idx, total) = session.position();
        show_question(idx, total, &question);

        let verdict = loop {
            let Some(input) = prompt(answer_prompt(question.kind.interaction())) else {
                return Ok(());
            };
            match Choice::from_str(&input) {
                Choice::Quit => {
                    println!("{}", "提前结束本轮！".cyan());
                    return Ok(());
                }
                Choice::Answer(answer) => match session.submit(&answer) {
                    Ok(verdict) => break verdict,
                    Err(SessionError::NoAnswer) => {
                        println!("{}", "⚠️ 请先完成作答".yellow());
                    }
                    Err(err @ SessionError::InvalidChoice(_)) => {
                        debug!("[Quiz] {}", err);
                        println!("{}", "⚠️ 无效选项，请重新作答".yellow());
                    }
                    Err(err) => return Err(err.into()),
                },
            }
        };
        show_verdict(&question, &verdict);
        debug!("[Quiz] Score so far: {}/{}", session.score(), idx);

        if let Progress::Finished(report) = session.advance()? {
            debug!("[Quiz] Finished with {:?}", report);
        }
    }
    if let Some(report) = session.report() {
        show_report(&report);
    }
    Ok(())
}

/// Setup → playing → finished, then back to setup until the user quits.
/// A mode given on the command line runs exactly one session.
pub fn cli_loop<R: Rng>(
    bank: &QuestionBank,
    preset_mode: Option<Mode>,
    preset_count: Option<usize>,
    rng: &mut R,
) -> Result<(), Error> {
    println!("{}", "\n==============================".cyan());
    println!("{}", "       题库随机刷题系统".cyan());
    println!("{}", "==============================".cyan());

    loop {
        let Some(mode) = preset_mode.or_else(pick_mode) else {
            break;
        };

        let pool_size = mode.pool(bank).len();
        let count = match preset_count {
            Some(count) => count,
            None if pool_size == 0 => 1,
            None => match pick_count(pool_size) {
                Some(count) => count,
                None => break,
            },
        };

        match QuizSession::start(bank, mode, count, rng) {
            Ok(session) => play(session)?,
            Err(err @ SessionError::EmptyPool { .. }) => {
                println!("{}", "当前题库为空，无法开始。".yellow());
                if preset_mode.is_some() {
                    return Err(err.into());
                }
            }
            Err(err) => return Err(err.into()),
        }

        if preset_mode.is_some() {
            break;
        }
    }
    Ok(())
}
