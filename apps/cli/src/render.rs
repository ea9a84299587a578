//! Terminal adapter: prints `ViewDirective`s and chart series.

use std::{io::Write, sync::Arc};

use anyhow::{Context, Result};
use client_core::RequestController;
use presentation::{prediction_series, project, ChartSeries, ColorHint, ViewDirective};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

const BAR_WIDTH: usize = 40;

/// Submits `raw_symbol` and prints every directive until the request
/// settles. Returns the final directive.
pub async fn run_prediction(
    controller: &Arc<RequestController>,
    raw_symbol: &str,
    out: &mut impl Write,
) -> Result<ViewDirective> {
    let mut states = controller.subscribe();
    let in_flight = controller
        .submit(raw_symbol)
        .await
        .context("prediction request not submitted")?;

    loop {
        let state = match states.recv().await {
            Ok(state) => state,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "state observer lagged; re-reading snapshot");
                controller.current_state().await
            }
            Err(RecvError::Closed) => break,
        };

        let directive = project(&state);
        render_directive(&directive, out)?;
        if is_settled(&directive) {
            return Ok(directive);
        }
    }

    in_flight.settled().await;
    Ok(project(&controller.current_state().await))
}

fn is_settled(directive: &ViewDirective) -> bool {
    matches!(
        directive,
        ViewDirective::ShowResult { .. } | ViewDirective::ShowError { .. }
    )
}

pub fn render_directive(directive: &ViewDirective, out: &mut impl Write) -> Result<()> {
    match directive {
        ViewDirective::ShowIdle => writeln!(out, "Ready.")?,
        ViewDirective::ShowLoading { symbol } => {
            writeln!(out, "Requesting prediction for {symbol}...")?
        }
        ViewDirective::ShowResult {
            symbol,
            predicted_return,
            current_price,
            estimated_price,
            confidence,
            color_hint,
            last_updated,
        } => {
            writeln!(out, "Symbol:           {symbol}")?;
            writeln!(
                out,
                "Predicted return: {predicted_return} {}",
                hint_marker(*color_hint)
            )?;
            if let Some(price) = current_price {
                writeln!(out, "Current price:    {price}")?;
            }
            if let Some(price) = estimated_price {
                writeln!(out, "Estimated price:  {price}")?;
            }
            if !confidence.is_empty() {
                writeln!(out, "Confidence:       {confidence}")?;
            }
            writeln!(
                out,
                "Last updated:     {}",
                last_updated.format("%Y-%m-%d %H:%M:%S UTC")
            )?;
            if let Some(series) = prediction_series(directive) {
                render_series(&series, out)?;
            }
        }
        ViewDirective::ShowError { message } => writeln!(out, "Error: {message}")?,
    }
    Ok(())
}

fn hint_marker(hint: ColorHint) -> &'static str {
    match hint {
        ColorHint::Positive => "(up)",
        ColorHint::Negative => "(down)",
    }
}

/// Horizontal bar chart scaled to the largest magnitude in the series.
pub fn render_series(series: &ChartSeries, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", series.name)?;
    if series.points.is_empty() {
        writeln!(out, "  (no data)")?;
        return Ok(());
    }

    let label_width = series
        .points
        .iter()
        .map(|p| p.label.chars().count())
        .max()
        .unwrap_or(0);
    let max_abs = series
        .points
        .iter()
        .map(|p| p.value.abs())
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);

    for point in &series.points {
        let len = if max_abs > 0.0 && point.value.is_finite() {
            ((point.value.abs() / max_abs) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let fill = if point.value < 0.0 { '-' } else { '#' };
        writeln!(
            out,
            "  {:<label_width$} | {:<BAR_WIDTH$} {}",
            point.label,
            fill.to_string().repeat(len),
            point.value
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
