use clap::Parser;
use colored::Colorize;
use env_logger::Env;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use thiserror::Error;

mod cli;
mod libtiku;

use crate::libtiku::parser::parse;
use crate::libtiku::session::{Mode, SessionError};
use crate::libtiku::source::{self, SourceError};

#[derive(Parser, Debug)]
#[command(name = "题库刷题 (Tiku)")]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "tiku.txt")]
    file: PathBuf,
    /// single, multi, judge or mixed. Asked interactively when missing.
    #[arg(short, long)]
    mode: Option<Mode>,
    #[arg(short, long)]
    count: Option<usize>,
    /// Seed for reproducible question order.
    #[arg(short, long)]
    seed: Option<u64>,
    #[arg(short, long, default_value = "error")]
    log_level: String,
}

#[derive(Debug, Error)]
enum Error {
    #[error("the question bank contains no questions")]
    NoQuestions,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level)).init();

    let raw = match source::load(&args.file) {
        Ok(raw) => raw,
        Err(err) => {
            println!("{}", format!("错误：无法读取题库 {:?}。", args.file).bright_red());
            if matches!(err, SourceError::NotFound(_)) {
                println!(
                    "{}",
                    "请创建一个名为 tiku.txt 的文件，并将题库内容粘贴进去。".yellow()
                );
            }
            return Err(err.into());
        }
    };

    println!("{}", "正在解析题库...".cyan());
    let bank = parse(&raw);
    println!(
        "{}",
        format!(
            "解析完成！共加载 {} 道单选题，{} 道多选题，{} 道判断题。",
            bank.single.len(),
            bank.multi.len(),
            bank.judge.len()
        )
        .cyan()
    );
    if bank.is_empty() {
        warn!("[Setup] No questions parsed from {:?}.", args.file);
        println!("{}", "未解析到题目，请检查题库格式。".yellow());
        return Err(Error::NoQuestions);
    }

    let mut rng = match args.seed {
        Some(seed) => {
            debug!("[Setup] Using seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    cli::cli_loop(&bank, args.mode, args.count, &mut rng)
}
