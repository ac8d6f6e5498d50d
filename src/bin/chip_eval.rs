//! Evaluate a saved page through the relevance gates.
//!
//! Usage:
//!   chip-eval --url https://shop.example.com/product/1 --html page.html
//!   chip-eval --snapshot page.json --lane commerce --json

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chip_gate::{
    ContentSnapshot, DisplayState, GateConfig, GateOrchestrator, Lane, LaneEvaluation,
    MemoryStore, StaticSnapshot, SystemClock,
};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chip-eval")]
#[command(author, version, about = "Run the chip relevance gates against a page", long_about = None)]
struct Args {
    /// Page URL (used with --html)
    #[arg(long, requires = "html", conflicts_with = "snapshot")]
    url: Option<String>,

    /// File holding the rendered page markup
    #[arg(long, requires = "url")]
    html: Option<PathBuf>,

    /// JSON file with {"url", "html", "visible_text"}
    #[arg(long, required_unless_present = "url")]
    snapshot: Option<PathBuf>,

    /// commerce, informational or all
    #[arg(long, default_value = "all")]
    lane: String,

    /// Emit JSON instead of a text summary
    #[arg(long)]
    json: bool,
}

#[derive(Serialize, Debug)]
struct LaneReport {
    lane: Lane,
    state: DisplayState,
    archetype: Option<String>,
    rule: Option<String>,
    score: Option<f32>,
    threshold: Option<f32>,
    fired: Vec<String>,
    tags: Vec<String>,
    subject: Option<String>,
    method: Option<String>,
}

impl LaneReport {
    fn from_evaluation(lane: Lane, state: DisplayState, evaluation: Option<LaneEvaluation>) -> Self {
        let evaluation = evaluation.as_ref();
        let intent = evaluation.and_then(|e| e.intent.as_ref());
        Self {
            lane,
            state,
            archetype: evaluation.and_then(|e| e.archetype).map(|a| a.as_str().to_string()),
            rule: evaluation
                .and_then(|e| e.classification_rule)
                .map(|a| a.as_str().to_string()),
            score: intent.map(|i| i.score),
            threshold: intent.map(|i| i.threshold),
            fired: intent
                .map(|i| {
                    i.signals
                        .fired
                        .iter()
                        .filter(|(_, fired)| **fired)
                        .map(|(signal, _)| format!("{signal:?}"))
                        .collect()
                })
                .unwrap_or_default(),
            tags: intent.map(|i| i.signals.tags.clone()).unwrap_or_default(),
            subject: evaluation.and_then(|e| e.subject.clone()),
            method: evaluation
                .and_then(|e| e.extraction.as_ref())
                .map(|x| x.extraction_method.clone()),
        }
    }
}

fn load_snapshot(args: &Args) -> Result<ContentSnapshot> {
    if let Some(path) = &args.snapshot {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        let snapshot: ContentSnapshot = serde_json::from_str(&raw)
            .with_context(|| format!("parsing snapshot {}", path.display()))?;
        if snapshot.visible_text.trim().is_empty() {
            return Ok(ContentSnapshot::from_html(snapshot.url, snapshot.html));
        }
        // Re-apply the visible text cap.
        return Ok(ContentSnapshot::new(snapshot.url, snapshot.html, snapshot.visible_text));
    }
    let (Some(url), Some(html)) = (&args.url, &args.html) else {
        anyhow::bail!("either --snapshot or --url with --html is required");
    };
    let markup = std::fs::read_to_string(html)
        .with_context(|| format!("reading markup {}", html.display()))?;
    Ok(ContentSnapshot::from_html(url.clone(), markup))
}

fn lanes(arg: &str) -> Result<Vec<Lane>> {
    if arg.eq_ignore_ascii_case("all") {
        return Ok(Lane::ALL.to_vec());
    }
    Ok(vec![arg.parse::<Lane>()?])
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = GateConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.runtime.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let lanes = lanes(&args.lane)?;
    let snapshot = load_snapshot(&args)?;
    let orchestrator = GateOrchestrator::new(
        Arc::new(StaticSnapshot::new(snapshot)),
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        config,
    );

    let mut reports = Vec::with_capacity(lanes.len());
    for lane in lanes {
        let state = orchestrator.evaluate(lane).await;
        let evaluation = orchestrator.last_evaluation(lane).await;
        reports.push(LaneReport::from_evaluation(lane, state, evaluation));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        let state = match &report.state {
            DisplayState::Hidden { reason } => format!("hidden ({reason})"),
            DisplayState::ReadyConfirmed { subject } => format!("ready: {subject}"),
            DisplayState::ReadyEditable {
                subject,
                fail_reason,
            } => match fail_reason {
                Some(reason) => format!("editable: {subject} [{reason}]"),
                None => format!("editable: {subject}"),
            },
        };
        println!("{:<14} {}", report.lane.as_str(), state);
        println!(
            "  archetype={} rule={}",
            report.archetype.as_deref().unwrap_or("-"),
            report.rule.as_deref().unwrap_or("-")
        );
        if let (Some(score), Some(threshold)) = (report.score, report.threshold) {
            println!("  score={score:.2} threshold={threshold:.2} fired={:?}", report.fired);
        }
        if let Some(method) = &report.method {
            println!(
                "  subject={} method={}",
                report.subject.as_deref().unwrap_or("-"),
                method
            );
        }
    }
    Ok(())
}
