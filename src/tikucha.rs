use colored::Colorize;
use env_logger::Env;
use log::{error, info};
use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;
mod libtiku;
use crate::libtiku::parser::parse;
use crate::libtiku::question::{QuestionBank, QuestionKind};
use crate::libtiku::session::Mode;
use crate::libtiku::source::{self, SourceError};

#[derive(Parser, Debug)]
#[command(name = "题库查 (Tikucha)")]
#[command(version, about = "Inspect a question bank without starting a quiz.", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "info")]
    log_level: String,
    #[arg(short, long, value_name = "FILE", default_value = "tiku.txt")]
    file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the parsed bank as JSON.
    Export {
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        #[arg(long, default_value = "false")]
        pretty: bool,
    },
    /// List questions that cannot be graded as their kind promises.
    Check,
    /// Count questions per kind and per quiz mode.
    Stats,
}

#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("cannot serialize the bank")]
    Json(#[from] serde_json::Error),
    #[error("cannot write the export")]
    Write(#[from] io::Error),
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level)).init();

    let raw = match source::load(&args.file) {
        Ok(raw) => raw,
        Err(err) => {
            error!("{}", format!("Unable to load {:?}: {}", args.file, err).red());
            return Err(err.into());
        }
    };
    let bank = parse(&raw);

    match args.command {
        Commands::Export { output, pretty } => export(&bank, output, pretty)?,
        Commands::Check => check(&bank),
        Commands::Stats => stats(&bank),
    }
    Ok(())
}

fn to_json(bank: &QuestionBank, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(bank)
    } else {
        serde_json::to_string(bank)
    }
}

fn export(bank: &QuestionBank, output: Option<PathBuf>, pretty: bool) -> Result<(), Error> {
    let json = to_json(bank, pretty)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            info!("{}", format!("Exported {} questions to {:?}", bank.len(), path).cyan());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Tree-style lines for every malformed question, then a summary line.
fn check_lines(bank: &QuestionBank) -> Vec<String> {
    let malformed = bank.malformed();
    let mut lines = Vec::new();
    for (question, problems) in &malformed {
        lines.push(format!(
            "├ ✘ [{}] #{} {}",
            question.kind, question.id, question.content
        ));
        for problem in problems {
            lines.push(format!("│ └ {}", problem));
        }
    }
    let well_formed = bank.iter().filter(|q| q.is_well_formed()).count();
    lines.push(format!(
        "{} of {} questions are well formed.",
        well_formed,
        bank.len()
    ));
    lines
}

fn check(bank: &QuestionBank) {
    info!("{}", format!("Checking {} questions...", bank.len()).blue());
    let clean = bank.malformed().is_empty();
    for line in check_lines(bank) {
        if clean {
            println!("{}", line.bright_green());
        } else if line.starts_with('├') {
            println!("{}", line.red());
        } else if line.starts_with('│') {
            println!("{}", line.yellow());
        } else {
            println!("{}", line.bright_red());
        }
    }
}

fn stats(bank: &QuestionBank) {
    println!("{}", "Questions per kind:".cyan());
    for kind in [QuestionKind::Single, QuestionKind::Multi, QuestionKind::Judge] {
        println!("├ {}: {}", kind, bank.collection(kind).len());
    }
    println!("{}", "Pool per quiz mode:".cyan());
    for mode in [Mode::Single, Mode::Multi, Mode::Judge, Mode::Mixed] {
        println!("├ {}: {}", mode, mode.pool(bank).len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = "一、单项选择题\n\
        1.中国的首都是\nA.上海\nB.北京\n答案：B\n\
        2.缺答案的题\nA.甲\nB.乙\n\
        二、多项选择题\n\
        1.哪些是偶数\nA.2 B.3 C.4\n答案：AC\n";

    #[test]
    fn export_keeps_letters_as_keys_and_answer_as_list() {
        let json = to_json(&parse(BANK), false).unwrap();
        assert!(json.contains(r#""kind":"single""#));
        assert!(json.contains(r#""options":{"A":"上海","B":"北京"}"#));
        assert!(json.contains(r#""answer":["B"]"#));
        assert!(json.contains(r#""kind":"multi""#));
        assert!(json.contains(r#""answer":["A","C"]"#));
    }

    #[test]
    fn pretty_export_is_the_same_document() {
        let bank = parse(BANK);
        let compact: serde_json::Value = serde_json::from_str(&to_json(&bank, false).unwrap()).unwrap();
        let pretty: serde_json::Value = serde_json::from_str(&to_json(&bank, true).unwrap()).unwrap();
        assert_eq!(compact, pretty);
        assert_eq!(compact["judge"], serde_json::json!([]));
    }

    #[test]
    fn check_lists_question_without_answer() {
        let lines = check_lines(&parse(BANK));
        assert_eq!(lines[0], "├ ✘ [single] #2 缺答案的题");
        assert_eq!(lines[1], "│ └ no answer recorded");
        assert_eq!(lines.last().unwrap(), "2 of 3 questions are well formed.");
    }

    #[test]
    fn clean_bank_only_has_the_summary() {
        let lines = check_lines(&parse("三、判断题\n1.地球是圆的\n答案：对\n"));
        assert_eq!(lines, vec!["1 of 1 questions are well formed.".to_string()]);
    }
}
