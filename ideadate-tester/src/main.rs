//! Automated QA harness for the Idea-Date journey engine.
//!
//! Runs the built-in seed plans through recompute and refinement, prints a
//! colored report, checks the engine's hard caps and determinism, and can
//! export the results as JSON for downstream tooling.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use ideadate_engine::{
    IdeaDateMode, JourneyEngine, Plan, PrefTilt, SuggestOptions, SuggestionPack, seeds,
    suggestion_notes,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScenarioArg {
    Clean,
    Messy,
    Crowded,
    Compact,
    All,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Default,
    TouristDay,
    Family,
    AnniversaryIntimate,
    FirstDateLowPressure,
}

impl From<ModeArg> for IdeaDateMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Default => Self::Default,
            ModeArg::TouristDay => Self::TouristDay,
            ModeArg::Family => Self::Family,
            ModeArg::AnniversaryIntimate => Self::AnniversaryIntimate,
            ModeArg::FirstDateLowPressure => Self::FirstDateLowPressure,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "ideadate-tester", version)]
#[command(about = "Automated QA for the Idea-Date journey engine")]
struct Args {
    /// Seed scenario to run
    #[arg(long, value_enum, default_value_t = ScenarioArg::All)]
    scenario: ScenarioArg,

    /// Mode preset applied to refinement
    #[arg(long, value_enum, default_value_t = ModeArg::Default)]
    mode: ModeArg,

    /// Pref tilt as "vibe,walking,peak", each in -1..=1
    #[arg(long)]
    tilt: Option<String>,

    /// Write the full report as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print per-stop metrics and telemetry
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioReport {
    scenario: String,
    journey_score100: u8,
    hard_constraints: usize,
    soft_constraints: usize,
    suggestion_ids: Vec<String>,
    pass_used: String,
    pack: SuggestionPack,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    generated_at: String,
    scenarios: Vec<ScenarioReport>,
}

fn parse_tilt(raw: &str) -> Result<PrefTilt> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 3 {
        bail!("tilt must be three comma-separated values, got '{raw}'");
    }
    let mut values = [0i8; 3];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .with_context(|| format!("invalid tilt component '{part}'"))?;
    }
    Ok(PrefTilt {
        vibe: values[0],
        walking: values[1],
        peak: values[2],
    }
    .sanitized())
}

fn selected_seeds(scenario: ScenarioArg) -> Vec<(&'static str, Plan)> {
    let wanted = match scenario {
        ScenarioArg::Clean => "clean",
        ScenarioArg::Messy => "messy",
        ScenarioArg::Crowded => "crowded",
        ScenarioArg::Compact => "compact",
        ScenarioArg::All => {
            return seeds::all_seeds();
        }
    };
    seeds::all_seeds()
        .into_iter()
        .filter(|(name, _)| *name == wanted)
        .collect()
}

fn check_caps(pack: &SuggestionPack) -> Result<()> {
    let stats = pack
        .debug_refine_stats
        .as_ref()
        .context("pack is missing refine stats")?;
    if stats.pass_breakdown.primary.seen > 60 {
        bail!("primary pass saw {} candidates", stats.pass_breakdown.primary.seen);
    }
    if stats.pass_breakdown.repair.seen > 90 {
        bail!("repair pass saw {} candidates", stats.pass_breakdown.repair.seen);
    }
    if stats.pass_breakdown.reorder_repair.evaluated > 12 {
        bail!(
            "reorder-repair evaluated {} orders",
            stats.pass_breakdown.reorder_repair.evaluated
        );
    }
    if pack.suggestions.len() > 3 {
        bail!("pack kept {} suggestions", pack.suggestions.len());
    }
    Ok(())
}

fn check_determinism(first: &SuggestionPack, second: &SuggestionPack) -> Result<()> {
    let first_ids: Vec<&str> = first.suggestions.iter().map(|s| s.id.as_str()).collect();
    let second_ids: Vec<&str> = second.suggestions.iter().map(|s| s.id.as_str()).collect();
    if first_ids != second_ids {
        bail!("suggestion ids drifted between runs: {first_ids:?} vs {second_ids:?}");
    }
    if first.computed.constraint_narratives != second.computed.constraint_narratives {
        bail!("constraint narratives drifted between runs");
    }
    Ok(())
}

fn print_report(name: &str, pack: &SuggestionPack, verbose: bool) {
    let score = pack.computed.journey_score100;
    let score_text = format!("{score:>3}");
    let score_colored = if score >= 70 {
        score_text.green()
    } else if score >= 50 {
        score_text.yellow()
    } else {
        score_text.red()
    };
    println!(
        "{} {} score {}  hard {}  soft {}",
        "scenario".bold(),
        name.cyan(),
        score_colored,
        pack.computed.constraint_hard_count,
        pack.computed.constraint_soft_count
    );
    for narrative in &pack.computed.constraint_narratives {
        println!("  {} {narrative}", "risk".yellow());
    }
    for suggestion in &pack.suggestions {
        println!(
            "  {} {} ({:?})",
            "suggest".bold(),
            suggestion.id,
            suggestion.reason_code
        );
        for line in suggestion_notes(suggestion) {
            println!("    {line}");
        }
    }
    if verbose {
        for (index, (contribution, narrative)) in pack
            .computed
            .arc_contribution_by_index
            .iter()
            .zip(&pack.computed.arc_narratives_by_index)
            .enumerate()
        {
            println!("  stop {index}: arc {contribution:.3} - {narrative}");
        }
        if let Some(stats) = &pack.debug_refine_stats {
            println!(
                "  telemetry: {} candidates, {} evaluated, {} discarded, pass {:?}",
                stats.candidate_count,
                stats.evaluated_count,
                stats.discarded_count,
                stats.pass_used
            );
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let engine = JourneyEngine::new();
    let mut options = SuggestOptions {
        mode: Some(args.mode.into()),
        ..SuggestOptions::default()
    };
    if let Some(raw) = &args.tilt {
        options.pref_tilt = Some(parse_tilt(raw)?);
    }

    let mut reports = Vec::new();
    for (name, plan) in selected_seeds(args.scenario) {
        log::info!("running scenario {name}");
        let pack = engine
            .suggestion_pack(&plan, &options)
            .await
            .with_context(|| format!("scenario {name} failed"))?;
        let second = engine
            .suggestion_pack(&plan, &options)
            .await
            .with_context(|| format!("scenario {name} rerun failed"))?;
        check_caps(&pack).with_context(|| format!("cap check failed for {name}"))?;
        check_determinism(&pack, &second)
            .with_context(|| format!("determinism check failed for {name}"))?;

        print_report(name, &pack, args.verbose);
        let stats = pack.debug_refine_stats.as_ref();
        reports.push(ScenarioReport {
            scenario: name.to_string(),
            journey_score100: pack.computed.journey_score100,
            hard_constraints: pack.computed.constraint_hard_count,
            soft_constraints: pack.computed.constraint_soft_count,
            suggestion_ids: pack.suggestions.iter().map(|s| s.id.clone()).collect(),
            pass_used: stats
                .map_or_else(|| "none".to_string(), |s| format!("{:?}", s.pass_used)),
            pack,
        });
    }

    if let Some(path) = &args.json {
        let report = RunReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            scenarios: reports,
        };
        let file = File::create(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &report)?;
        writer.flush()?;
        println!("{} wrote {}", "report".bold(), path.display());
    }

    println!("{}", "all checks passed".green().bold());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    run(args).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilt_parser_accepts_triples() {
        let tilt = parse_tilt("1,-1,0").unwrap();
        assert_eq!((tilt.vibe, tilt.walking, tilt.peak), (1, -1, 0));
        assert!(parse_tilt("1,2").is_err());
        assert!(parse_tilt("a,b,c").is_err());
        // Out-of-range components clamp rather than fail.
        let clamped = parse_tilt("5,-5,0").unwrap();
        assert_eq!((clamped.vibe, clamped.walking), (1, -1));
    }

    #[test]
    fn seed_selection_filters_by_name() {
        assert_eq!(selected_seeds(ScenarioArg::All).len(), 4);
        let only = selected_seeds(ScenarioArg::Messy);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].0, "messy");
    }
}
