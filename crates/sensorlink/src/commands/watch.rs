//! `watch <device>`: follow a live feed until interrupted.
//!
//! Table/plain output prints one status line whenever the rendered view
//! changes; JSON and YAML stream one document per change.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::debug;

use sensorlink_core::{ConnectionState, Dashboard, DeviceId, FeedSnapshot, SensorField};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

// ── Rendering ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Good,
    Pending,
    Bad,
}

/// Link indicator for a snapshot.
fn status(snap: &FeedSnapshot) -> (String, Tone) {
    if snap.offline {
        return ("offline".into(), Tone::Bad);
    }
    match snap.link {
        ConnectionState::Open => ("live".into(), Tone::Good),
        ConnectionState::Idle | ConnectionState::Connecting => {
            ("connecting".into(), Tone::Pending)
        }
        ConnectionState::Closed => match snap.reconnect_in {
            Some(delay) => (format!("retry in {}s", delay.as_secs()), Tone::Pending),
            None => ("closed".into(), Tone::Bad),
        },
    }
}

fn paint(text: &str, tone: Tone, color: bool) -> String {
    if !color {
        return format!("[{text}]");
    }
    match tone {
        Tone::Good => format!("[{}]", text.green()),
        Tone::Pending => format!("[{}]", text.yellow()),
        Tone::Bad => format!("[{}]", text.red()),
    }
}

/// Value summary: latest reading plus the range of the charted window.
fn summary(snap: &FeedSnapshot) -> String {
    let chart = &snap.chart;
    let Some(latest) = chart.latest() else {
        return if snap.loading {
            "loading history".into()
        } else {
            "No data".into()
        };
    };
    let unit = chart.unit();
    let mut line = format!("{}: {latest} {unit}", chart.label());
    if let Some((min, max)) = chart.extremes() {
        line.push_str(&format!(
            "  (min {} / max {} over {})",
            min.value,
            max.value,
            chart.values.len()
        ));
    }
    line
}

fn render_line(snap: &FeedSnapshot, color: bool) -> String {
    let (text, tone) = status(snap);
    format!("{} {}", paint(&text, tone, color), summary(snap))
}

/// Structured form for JSON/YAML streaming.
#[derive(Debug, PartialEq, Serialize)]
struct WatchLine<'a> {
    device_id: DeviceId,
    link: ConnectionState,
    loading: bool,
    offline: bool,
    reconnect_in_secs: Option<u64>,
    field: Option<SensorField>,
    unit: &'static str,
    latest: Option<f64>,
    latest_at: Option<DateTime<Utc>>,
    readings: usize,
    ingested: u64,
    last_error: Option<&'a str>,
}

impl<'a> WatchLine<'a> {
    fn new(snap: &'a FeedSnapshot) -> Self {
        Self {
            device_id: snap.device_id,
            link: snap.link,
            loading: snap.loading,
            offline: snap.offline,
            reconnect_in_secs: snap.reconnect_in.map(|d| d.as_secs()),
            field: snap.chart.field,
            unit: snap.chart.unit(),
            latest: snap.chart.latest(),
            latest_at: snap.latest().map(|r| r.timestamp),
            readings: snap.readings.len(),
            ingested: snap.ingested,
            last_error: snap.last_error.as_deref(),
        }
    }
}

fn render_structured(snap: &FeedSnapshot, format: OutputFormat) -> Result<String, CliError> {
    let line = WatchLine::new(snap);
    Ok(match format {
        OutputFormat::Yaml => format!("---\n{}", serde_yaml::to_string(&line).unwrap_or_default()),
        _ => serde_json::to_string(&line)?,
    })
}

/// Whether `-n` is satisfied. Only streamed readings count.
fn count_reached(limit: Option<u64>, snap: &FeedSnapshot) -> bool {
    limit.is_some_and(|n| snap.ingested >= n)
}

fn loading_spinner(id: DeviceId) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("loading history for device {id}"));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let id = DeviceId(args.device);
    let feed = dashboard.watch(id)?;
    let mut rx = feed.subscribe();

    let human = matches!(global.output, OutputFormat::Table | OutputFormat::Plain);
    let color = human && output::should_color(global.color);
    let mut spinner = (human && !global.quiet).then(|| loading_spinner(id));

    let mut last_rendered = String::new();
    let mut last_error: Option<String> = None;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        let snap = Arc::clone(&rx.borrow_and_update());

        if !snap.loading {
            if let Some(spinner) = spinner.take() {
                spinner.finish_and_clear();
            }
        }

        if snap.last_error != last_error {
            if let Some(ref err) = snap.last_error {
                if human && !global.quiet {
                    eprintln!("warning: {err}");
                }
            }
            last_error.clone_from(&snap.last_error);
        }

        let rendered = if human {
            render_line(&snap, color)
        } else {
            render_structured(&snap, global.output)?
        };
        if rendered != last_rendered && !(human && snap.loading) {
            output::print_output(&rendered, global.quiet);
            last_rendered = rendered;
        }

        if snap.offline {
            break Err(CliError::Offline {
                device: args.device,
                attempts: feed.link().attempt_count(),
            });
        }
        if count_reached(args.count, &snap) {
            debug!(device = %id, ingested = snap.ingested, "reading count reached");
            break Ok(());
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
            _ = &mut ctrl_c => {
                debug!(device = %id, "interrupted");
                break Ok(());
            }
        }
    };

    if let Some(spinner) = spinner.take() {
        spinner.finish_and_clear();
    }
    feed.shutdown();
    outcome
}
