use anyhow::bail;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::analysis::CleanOptions;
use crate::dataset::{SeasonWindow, Venue};
use crate::extract::source::parse_page_selection;
use crate::extract::ExtractOptions;

/// Single-season schedule statistics: extract, clean, analyse, ask
#[derive(Parser, Debug, Clone)]
#[command(name = "season-stats", version, about)]
pub struct Config {
    /// Directory for every output file
    #[arg(long, env = "SEASON_OUTDIR", default_value = ".", global = true)]
    pub outdir: PathBuf,

    /// First day of the season (YYYY-MM-DD); earlier games are rejected
    #[arg(long, env = "SEASON_START", global = true)]
    pub season_start: Option<NaiveDate>,

    /// Last day of the season (YYYY-MM-DD)
    #[arg(long, env = "SEASON_END", global = true)]
    pub season_end: Option<NaiveDate>,

    /// Smallest plausible goal count for either side
    #[arg(long, default_value = "1", global = true)]
    pub min_score: u32,

    /// Largest plausible goal count for either side (at most 99)
    #[arg(long, default_value = "35", global = true)]
    pub max_score: u32,

    /// Venue assumed when a line or row has no marker (home, away, neutral)
    #[arg(long, global = true)]
    pub default_venue: Option<Venue>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Pull candidate game rows out of a schedule PDF or text dump
    Extract(ExtractArgs),
    /// Validate the raw rows and write the tidy table, summary and sensitivity sweep
    Clean(CleanArgs),
    /// Put questions about the tidy table to a language model
    Ask(AskArgs),
    /// Extract, clean, then ask if any question or --crosscheck is given
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Schedule PDF, or a text file already extracted from one
    pub input: PathBuf,

    /// 1-based pages to read, e.g. "1-3,5"
    #[arg(long)]
    pub pages: Option<String>,

    /// Skip the direct text layer and OCR straight away
    #[arg(long)]
    pub force_ocr: bool,

    /// Write each page's text to <outdir>/pdf_text_dump/pageNN.txt
    #[arg(long)]
    pub dump_text: bool,

    /// Raw candidate table, relative to --outdir
    #[arg(long, default_value = "games.csv")]
    pub outfile: String,

    /// Non-whitespace characters a source must yield before it is trusted
    #[arg(long, default_value = "200")]
    pub min_text_chars: usize,
}

#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// Largest total swing in the sensitivity sweep
    #[arg(long, default_value = "4")]
    pub dmax: u32,

    /// Swings whose flipped games are listed in full
    #[arg(long, default_value = "2,4", value_delimiter = ',')]
    pub detail_swings: Vec<u32>,

    /// Number of games the season actually had; a different count is warned
    #[arg(long)]
    pub expected_games: Option<usize>,

    /// Warn when the season window rejects more rows than this
    #[arg(long, default_value = "3")]
    pub window_exclusion_warn: usize,
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// Raw table to clean (default <outdir>/games.csv, then games_final.csv)
    #[arg(long)]
    pub inp: Option<PathBuf>,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Args, Debug, Clone)]
pub struct QuestionArgs {
    /// Question to ask about the tidy table (repeatable)
    #[arg(long = "question")]
    pub questions: Vec<String>,

    /// Ask questions with locally known answers and compare
    #[arg(long)]
    pub crosscheck: bool,

    /// Goals-for swing used by the cross-check's flip question
    #[arg(long, default_value = "2")]
    pub flip_swing: u32,
}

impl QuestionArgs {
    pub fn will_ask(&self) -> bool {
        !self.questions.is_empty() || self.crosscheck
    }
}

#[derive(Args, Debug, Clone)]
pub struct LlmArgs {
    /// OpenAI-compatible API base URL
    #[arg(long, env = "LLM_API_URL", default_value = "https://api.openai.com/v1")]
    pub llm_api_url: String,

    /// API key (required whenever a question is asked)
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60")]
    pub llm_timeout_secs: u64,

    /// Retries on rate limiting, server errors and dropped connections
    #[arg(long, default_value = "3")]
    pub llm_max_retries: u32,
}

impl LlmArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.llm_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            bail!("LLM_API_KEY is required to ask questions. Set it or pass --llm-api-key.");
        }
        let url = match url::Url::parse(&self.llm_api_url) {
            Ok(u) => u,
            Err(e) => bail!("llm_api_url '{}' is not a valid URL: {}", self.llm_api_url, e),
        };
        if !matches!(url.scheme(), "http" | "https") {
            bail!("llm_api_url must be http or https, got '{}'", url.scheme());
        }
        if self.llm_timeout_secs == 0 {
            bail!("llm_timeout_secs must be positive");
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    /// Tidy table to ask about (default <outdir>/games_final.csv)
    #[arg(long)]
    pub inp: Option<PathBuf>,

    #[command(flatten)]
    pub questions: QuestionArgs,

    #[command(flatten)]
    pub llm: LlmArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub extract: ExtractArgs,

    #[command(flatten)]
    pub analysis: AnalysisArgs,

    #[command(flatten)]
    pub questions: QuestionArgs,

    #[command(flatten)]
    pub llm: LlmArgs,
}

impl Config {
    pub fn window(&self) -> SeasonWindow {
        SeasonWindow::new(self.season_start, self.season_end)
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            window: self.window(),
            max_score: self.max_score,
            default_venue: self.default_venue,
        }
    }

    pub fn clean_options(&self, analysis: &AnalysisArgs) -> CleanOptions {
        CleanOptions {
            window: self.window(),
            min_score: self.min_score,
            max_score: self.max_score,
            window_exclusion_warn: analysis.window_exclusion_warn,
            expected_games: analysis.expected_games,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_score > 99 {
            bail!("max_score must be at most 99 (scores are read as 1-2 digit numbers)");
        }
        if self.min_score > self.max_score {
            bail!(
                "min_score ({}) must not exceed max_score ({})",
                self.min_score,
                self.max_score
            );
        }
        if let (Some(start), Some(end)) = (self.season_start, self.season_end) {
            if start > end {
                bail!("season_start {} is after season_end {}", start, end);
            }
        }

        match &self.command {
            Command::Extract(e) => validate_extract(e)?,
            Command::Clean(c) => validate_analysis(&c.analysis)?,
            Command::Ask(a) => {
                if !a.questions.will_ask() {
                    bail!("Nothing to ask. Pass --question and/or --crosscheck.");
                }
                validate_questions(&a.questions)?;
                a.llm.validate()?;
            }
            Command::Run(r) => {
                validate_extract(&r.extract)?;
                validate_analysis(&r.analysis)?;
                if r.questions.will_ask() {
                    validate_questions(&r.questions)?;
                    r.llm.validate()?;
                }
            }
        }
        Ok(())
    }
}

fn validate_extract(args: &ExtractArgs) -> anyhow::Result<()> {
    if let Some(pages) = &args.pages {
        // syntax only; the page count is not known yet
        parse_page_selection(pages, 0)?;
    }
    if args.outfile.trim().is_empty() {
        bail!("outfile must not be empty");
    }
    Ok(())
}

fn validate_analysis(args: &AnalysisArgs) -> anyhow::Result<()> {
    if !(1..=20).contains(&args.dmax) {
        bail!("dmax must be between 1 and 20");
    }
    if args.detail_swings.contains(&0) {
        bail!("detail_swings must be positive");
    }
    Ok(())
}

fn validate_questions(args: &QuestionArgs) -> anyhow::Result<()> {
    if args.flip_swing == 0 {
        bail!("flip_swing must be positive");
    }
    if args.questions.iter().any(|q| q.trim().is_empty()) {
        bail!("--question must not be empty");
    }
    Ok(())
}
