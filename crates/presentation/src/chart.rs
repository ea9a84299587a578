use serde::{Deserialize, Serialize};
use shared::protocol::HistoricalBar;

use crate::{ColorHint, ViewDirective};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<ChartPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hint: Option<ColorHint>,
}

/// Two-point before/after series for a shown result.
///
/// `None` for any other directive, or when the return has no numeric reading.
pub fn prediction_series(directive: &ViewDirective) -> Option<ChartSeries> {
    let ViewDirective::ShowResult {
        predicted_return,
        color_hint,
        ..
    } = directive
    else {
        return None;
    };
    let predicted = predicted_return.value()?;

    Some(ChartSeries {
        name: "Predicted Return".to_string(),
        points: vec![
            ChartPoint {
                label: "Current".to_string(),
                value: 0.0,
            },
            ChartPoint {
                label: "Predicted".to_string(),
                value: predicted,
            },
        ],
        color_hint: Some(*color_hint),
    })
}

/// Close prices keyed by date, in the order the service returned them.
pub fn historical_series(bars: &[HistoricalBar]) -> ChartSeries {
    ChartSeries {
        name: "Close Price".to_string(),
        points: bars
            .iter()
            .map(|bar| ChartPoint {
                label: bar.date.clone(),
                value: bar.close,
            })
            .collect(),
        color_hint: None,
    }
}
