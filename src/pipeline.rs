use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analysis::{
    clean_games, render_extraction, render_flips, render_summary, summarize, sweep, CleanReport,
};
use crate::config::{
    AnalysisArgs, AskArgs, CleanArgs, Command, Config, ExtractArgs, LlmArgs, QuestionArgs, RunArgs,
};
use crate::dataset::{self, GameRecord, RawGame, RowError, CLEAN_FILE, FINAL_FILE, RAW_FILE};
use crate::extract::{extract_schedule, sources_for, ExtractedText, Page};
use crate::qa::{self, LlmClient, QaBackend};

pub const EXTRACTION_FILE: &str = "extraction_report.txt";
pub const SUMMARY_FILE: &str = "season_summary.txt";
pub const FLIPS_FILE: &str = "flips_summary.txt";
pub const QA_FILE: &str = "qa_report.txt";
pub const DUMP_DIR: &str = "pdf_text_dump";

pub async fn dispatch(cfg: &Config) -> Result<()> {
    match &cfg.command {
        Command::Extract(args) => run_extract(cfg, args).await.map(|_| ()),
        Command::Clean(args) => run_clean(cfg, args).map(|_| ()),
        Command::Ask(args) => run_ask(cfg, args).await,
        Command::Run(args) => run_all(cfg, args).await,
    }
}

// ── extract ──────────────────────────────────────────────────────────────────

pub async fn run_extract(cfg: &Config, args: &ExtractArgs) -> Result<ExtractedText> {
    if !args.input.exists() {
        bail!("Input not found: {}", args.input.display());
    }
    let sources = sources_for(&args.input, args.force_ocr, &cfg.outdir);
    let text = extract_schedule(
        &sources,
        args.pages.as_deref(),
        args.min_text_chars,
        &cfg.extract_options(),
    )
    .await?;

    if args.dump_text {
        dump_pages(&cfg.outdir, &text.pages)?;
    }
    report_misses(&text);
    write_text(&cfg.outdir.join(EXTRACTION_FILE), &render_extraction(&text))?;
    if text.extraction.games.is_empty() {
        bail!(
            "No game rows found in {} ({} source). \
             Check --pages, --default-venue or try --force-ocr.",
            args.input.display(),
            text.source
        );
    }

    let out = cfg.outdir.join(&args.outfile);
    dataset::write_raw_games(&out, &text.extraction.games)?;
    info!(
        "Wrote {} candidate game(s) to {}",
        text.extraction.games.len(),
        out.display()
    );
    Ok(text)
}

fn report_misses(text: &ExtractedText) {
    let ex = &text.extraction;
    info!(
        "{}: {} line(s) scanned, {} game(s), {} merged, {} unmatched",
        text.source,
        ex.lines_scanned,
        ex.games.len(),
        ex.merged,
        ex.unmatched
    );
    for f in &ex.fragments {
        warn!("page {}: skipped '{}' ({})", f.page, f.text, f.reason);
    }
}

pub fn dump_pages(outdir: &Path, pages: &[Page]) -> Result<()> {
    let dir = outdir.join(DUMP_DIR);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    for p in pages {
        let path = dir.join(format!("page{:02}.txt", p.number));
        write_text(&path, &p.text)?;
    }
    info!("Dumped {} page(s) of text to {}", pages.len(), dir.display());
    Ok(())
}

// ── clean ────────────────────────────────────────────────────────────────────

/// Default input for `clean`: the raw table, else an earlier tidy one.
fn default_clean_input(outdir: &Path) -> Result<PathBuf> {
    let raw = outdir.join(RAW_FILE);
    if raw.exists() {
        return Ok(raw);
    }
    let tidy = outdir.join(FINAL_FILE);
    if tidy.exists() {
        warn!("{} not found, cleaning {} instead", raw.display(), tidy.display());
        return Ok(tidy);
    }
    bail!(
        "No input table: neither {} nor {} exists. Run `extract` first or pass --inp.",
        raw.display(),
        tidy.display()
    )
}

pub fn run_clean(cfg: &Config, args: &CleanArgs) -> Result<CleanReport> {
    let inp = match &args.inp {
        Some(p) => p.clone(),
        None => default_clean_input(&cfg.outdir)?,
    };
    let loaded = dataset::read_games(&inp, &cfg.window(), cfg.default_venue)?;
    info!(
        "Read {} row(s) from {} ({} unreadable)",
        loaded.games.len(),
        inp.display(),
        loaded.unreadable.len()
    );
    clean_and_report(cfg, &args.analysis, &loaded.games, &loaded.unreadable, None)
}

/// Clean candidate rows and write the tidy table, summary and sweep.
///
/// The files are written even when nothing survives, so the account of
/// what was discarded is never lost.
pub fn clean_and_report(
    cfg: &Config,
    analysis: &AnalysisArgs,
    raw: &[RawGame],
    unreadable: &[RowError],
    extracted: Option<&ExtractedText>,
) -> Result<CleanReport> {
    let report = clean_games(raw, &cfg.clean_options(analysis));

    dataset::write_clean_games(&cfg.outdir.join(CLEAN_FILE), &report.games, &report.sources)?;
    dataset::write_final_games(&cfg.outdir.join(FINAL_FILE), &report.games)?;

    let summary = summarize(&report.games);
    let mut text = render_summary(&summary, &report, unreadable);
    if let Some(ex) = extracted {
        text.push_str("\n=== Extraction ===\n");
        text.push_str(&render_extraction(ex));
    }
    write_text(&cfg.outdir.join(SUMMARY_FILE), &text)?;

    let rows = sweep(&report.games, analysis.dmax);
    write_text(
        &cfg.outdir.join(FLIPS_FILE),
        &render_flips(&report.games, &rows, &analysis.detail_swings),
    )?;

    if report.games.is_empty() {
        warn!(
            "No games survived cleaning ({} rejected, {} unreadable); \
             check --season-start/--season-end and score bounds. See {}",
            report.rejected.len(),
            unreadable.len(),
            SUMMARY_FILE
        );
    } else {
        info!(
            "Season {}-{} over {} game(s); wrote {}, {} and {}",
            summary.wins,
            summary.losses,
            summary.games,
            FINAL_FILE,
            SUMMARY_FILE,
            FLIPS_FILE
        );
    }
    Ok(report)
}

// ── ask ──────────────────────────────────────────────────────────────────────

pub async fn run_ask(cfg: &Config, args: &AskArgs) -> Result<()> {
    let inp = args
        .inp
        .clone()
        .unwrap_or_else(|| cfg.outdir.join(FINAL_FILE));
    let loaded = dataset::read_games(&inp, &cfg.window(), cfg.default_venue)?;
    for e in &loaded.unreadable {
        warn!("Skipping {}: {}", inp.display(), e);
    }
    // already tidy, so this only derives results and ordering
    let report = clean_games(&loaded.games, &cfg.clean_options(&no_analysis()));
    if report.games.is_empty() {
        bail!("{} holds no usable games", inp.display());
    }

    let backend = llm_backend(&args.llm)?;
    ask_and_report(cfg, &backend, &report.games, &args.questions).await
}

fn no_analysis() -> AnalysisArgs {
    AnalysisArgs {
        dmax: 1,
        detail_swings: Vec::new(),
        expected_games: None,
        window_exclusion_warn: usize::MAX,
    }
}

fn llm_backend(llm: &LlmArgs) -> Result<LlmClient> {
    LlmClient::new(
        &llm.llm_api_url,
        llm.llm_api_key.clone(),
        &llm.llm_model,
        llm.timeout(),
        llm.llm_max_retries,
    )
}

/// Ask the free questions and, if requested, the cross-check set; write
/// everything to `qa_report.txt`.
pub async fn ask_and_report(
    cfg: &Config,
    backend: &dyn QaBackend,
    games: &[GameRecord],
    questions: &QuestionArgs,
) -> Result<()> {
    let csv = dataset::final_csv_string(games)?;
    let mut text = format!("Backend: {}\n\n", backend.name());

    if !questions.questions.is_empty() {
        let answers = qa::ask_questions(backend, &csv, &questions.questions).await;
        text.push_str(&qa::render_answers(&answers));
    }
    if questions.crosscheck {
        let checks = qa::standard_checks(games, questions.flip_swing);
        let outcomes = qa::run_crosschecks(backend, &csv, checks).await;
        text.push_str(&qa::render_crosschecks(&outcomes));
    }

    let path = cfg.outdir.join(QA_FILE);
    write_text(&path, &text)?;
    info!("Wrote {}", path.display());
    Ok(())
}

// ── run ──────────────────────────────────────────────────────────────────────

pub async fn run_all(cfg: &Config, args: &RunArgs) -> Result<()> {
    let extracted = run_extract(cfg, &args.extract).await?;
    let report = clean_and_report(
        cfg,
        &args.analysis,
        &extracted.extraction.games,
        &[],
        Some(&extracted),
    )?;

    if args.questions.will_ask() {
        if report.games.is_empty() {
            warn!("Nothing to ask about: no games survived cleaning");
            return Ok(());
        }
        let backend = llm_backend(&args.llm)?;
        ask_and_report(cfg, &backend, &report.games, &args.questions).await?;
    }
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}
