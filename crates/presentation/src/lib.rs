//! Rendering-agnostic projection of the request lifecycle.
//!
//! `project` is a pure function of `RequestState`; front ends translate the
//! resulting `ViewDirective` into whatever widgets they own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{Figure, RequestState};

pub mod chart;

pub use chart::{historical_series, prediction_series, ChartPoint, ChartSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorHint {
    Positive,
    Negative,
}

impl ColorHint {
    /// Zero counts as positive. A return with no numeric reading is negative.
    pub fn for_return(predicted_return: &Figure) -> Self {
        match predicted_return.value() {
            Some(value) if value >= 0.0 => ColorHint::Positive,
            _ => ColorHint::Negative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewDirective {
    ShowIdle,
    ShowLoading {
        symbol: String,
    },
    ShowResult {
        symbol: String,
        predicted_return: Figure,
        current_price: Option<Figure>,
        estimated_price: Option<Figure>,
        confidence: String,
        color_hint: ColorHint,
        last_updated: DateTime<Utc>,
    },
    ShowError {
        message: String,
    },
}

/// Which panels and controls an adapter should show for a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelVisibility {
    pub result: bool,
    pub error: bool,
    pub busy: bool,
    pub submit_enabled: bool,
}

impl ViewDirective {
    pub fn panels(&self) -> PanelVisibility {
        match self {
            ViewDirective::ShowIdle => PanelVisibility {
                result: false,
                error: false,
                busy: false,
                submit_enabled: true,
            },
            ViewDirective::ShowLoading { .. } => PanelVisibility {
                result: false,
                error: false,
                busy: true,
                submit_enabled: false,
            },
            ViewDirective::ShowResult { .. } => PanelVisibility {
                result: true,
                error: false,
                busy: false,
                submit_enabled: true,
            },
            ViewDirective::ShowError { .. } => PanelVisibility {
                result: false,
                error: true,
                busy: false,
                submit_enabled: true,
            },
        }
    }
}

pub fn project(state: &RequestState) -> ViewDirective {
    match state {
        RequestState::Idle => ViewDirective::ShowIdle,
        RequestState::Pending { request } => ViewDirective::ShowLoading {
            symbol: request.symbol().to_string(),
        },
        RequestState::Succeeded {
            result,
            resolved_at,
            ..
        } => ViewDirective::ShowResult {
            symbol: result.symbol.clone(),
            predicted_return: result.predicted_return.clone(),
            current_price: result.current_price.clone(),
            estimated_price: result.estimated_price.clone(),
            confidence: result.confidence.clone(),
            color_hint: ColorHint::for_return(&result.predicted_return),
            last_updated: *resolved_at,
        },
        RequestState::Failed { message, .. } => ViewDirective::ShowError {
            message: message.clone(),
        },
    }
}
