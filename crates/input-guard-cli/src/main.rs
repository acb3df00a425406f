mod cli;
mod config;

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use audit_log::{AuditEntry, AuditEventType, AuditSink, AuditSource};
use input_guard::{InputGuard, MatchRecord, SanitizeConfig, Verdict};

use crate::cli::Cli;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One line of stdout per evaluated input.
#[derive(Debug, Serialize)]
struct Report<'a> {
    cleaned: &'a str,
    score: u32,
    verdict: Verdict,
    truncated: bool,
    matches: &'a [MatchRecord],
}

fn evaluate_line(
    guard: &InputGuard,
    config: &SanitizeConfig,
    line: &str,
    out: &mut impl Write,
) -> Result<()> {
    let result = guard.evaluate_and_clean(line, config)?;
    let report = Report {
        cleaned: result.cleaned_text(),
        score: result.total_score(),
        verdict: result.verdict(guard.thresholds()),
        truncated: result.truncated(),
        matches: result.matches(),
    };
    serde_json::to_writer(&mut *out, &report)?;
    out.write_all(b"\n")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let mut cfg = config::load(&cli.config)?;

    if let Some(policy) = cli.remove_specials {
        cfg.sanitizer.remove_specials = policy;
    }
    if cli.escape_html {
        cfg.sanitizer.escape_html = true;
    }
    if let Some(ref path) = cli.audit_log {
        cfg.logging.audit_log_path = path.clone();
    }

    // 3. Init tracing-subscriber with JSON format on stderr; stdout carries
    //    the reports.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(
        config_file = %cli.config.display(),
        audit_log = %cfg.logging.audit_log_path.display(),
        remove_specials = %cfg.sanitizer.remove_specials,
        "input-guard starting"
    );

    // 4. Start audit logger once; the engine gets a handle to it.
    let (audit, audit_handle) = AuditSink::start(&cfg.logging.audit_log_path)
        .await
        .context("failed to start audit logger")?;

    audit
        .log(AuditEntry::new(
            AuditEventType::ProcessStarted,
            AuditSource::new("input-guard-cli"),
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "config_file": cli.config.display().to_string(),
            }),
        ))
        .await;

    // 5. Build the engine.
    let guard = InputGuard::new()
        .context("failed to initialize input guard")?
        .with_thresholds(cfg.thresholds)
        .context("invalid thresholds")?
        .with_audit(audit.clone());

    // 6. Evaluate. Reading stdin blocks, so it runs off the async workers.
    let sanitizer = cfg.sanitizer.clone();
    let evaluated = tokio::task::spawn_blocking(move || -> Result<u64> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();

        if let Some(text) = cli.text {
            evaluate_line(&guard, &sanitizer, &text, &mut out)?;
            return Ok(1);
        }

        let mut count = 0;
        for line in std::io::stdin().lock().lines() {
            let line = line.context("failed to read stdin")?;
            evaluate_line(&guard, &sanitizer, &line, &mut out)?;
            count += 1;
        }
        Ok(count)
    })
    .await
    .context("evaluation task panicked")?;

    // 7. Log shutdown and drain the audit writer.
    info!("input-guard shutting down");

    audit
        .log(AuditEntry::new(
            AuditEventType::ProcessStopped,
            AuditSource::new("input-guard-cli"),
            serde_json::json!({
                "result": format!("{:?}", evaluated),
            }),
        ))
        .await;

    drop(audit);
    audit_handle.await.context("audit writer task failed")?;

    let count = evaluated?;
    info!(inputs = count, "done");
    Ok(())
}
