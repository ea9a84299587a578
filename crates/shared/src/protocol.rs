use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{Figure, PredictionResult},
    error::{ApiError, ErrorCode, DEFAULT_PREDICTION_FAILURE},
};

/// Body of `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictBody {
    pub symbol: String,
}

/// Success body of `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolPredictionResponse {
    pub symbol: String,
    pub predicted_return: Figure,
    #[serde(default)]
    pub confidence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Figure>,
}

impl From<SymbolPredictionResponse> for PredictionResult {
    fn from(value: SymbolPredictionResponse) -> Self {
        Self {
            symbol: value.symbol,
            predicted_return: value.predicted_return,
            current_price: value.current_price,
            estimated_price: None,
            confidence: value.confidence,
        }
    }
}

/// Body of the symbol-less `GET /predict` daily index endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPredictionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Figure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Figure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_price: Option<Figure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DailyPredictionResponse {
    /// Converts the envelope into a result for `symbol`, surfacing
    /// `success: false` as a rejected call.
    pub fn into_result(self, symbol: &str) -> Result<PredictionResult, ApiError> {
        if !self.success {
            let message = self
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PREDICTION_FAILURE.to_string());
            return Err(ApiError::new(ErrorCode::Rejected, message));
        }

        let Some(predicted_return) = self.prediction else {
            return Err(ApiError::new(
                ErrorCode::Decode,
                DEFAULT_PREDICTION_FAILURE,
            ));
        };

        Ok(PredictionResult {
            symbol: symbol.to_string(),
            predicted_return,
            current_price: self.current_price,
            estimated_price: self.estimated_price,
            confidence: String::new(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainedModelsResponse {
    #[serde(default)]
    pub models: Vec<String>,
}

/// One row of `GET /historical/{symbol}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalBar {
    pub date: String,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// Pulls a human-readable message out of an error body.
///
/// Looks at `detail`, then `error`, then `message`. A `detail` list (the
/// shape of request validation failures) yields its first `msg`.
pub fn error_message_from_body(body: &Value) -> Option<String> {
    for key in ["detail", "error", "message"] {
        let Some(field) = body.get(key) else {
            continue;
        };
        if let Some(message) = message_from_field(field) {
            return Some(message);
        }
    }
    None
}

fn message_from_field(field: &Value) -> Option<String> {
    match field {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::Object(_) => item.get("msg").and_then(message_from_field),
            other => message_from_field(other),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn symbol_response_accepts_string_or_numeric_return() {
        let text: SymbolPredictionResponse = serde_json::from_value(json!({
            "symbol": "AAPL",
            "predicted_return": "2.3%",
            "confidence": "High"
        }))
        .expect("text return");
        assert_eq!(text.predicted_return.text(), "2.3%");
        assert!(text.current_price.is_none());

        let numeric: SymbolPredictionResponse = serde_json::from_value(json!({
            "symbol": "NVDA",
            "predicted_return": -0.5,
            "confidence": "Low",
            "current_price": 120.5
        }))
        .expect("numeric return");
        let result = PredictionResult::from(numeric);
        assert_eq!(result.predicted_return.value(), Some(-0.5));
        assert_eq!(result.current_price.map(|p| p.text().to_string()), Some("120.5".to_string()));
    }

    #[test]
    fn daily_failure_surfaces_error_field() {
        let response: DailyPredictionResponse = serde_json::from_value(json!({
            "success": false,
            "error": "market data unavailable"
        }))
        .expect("decode");
        let err = response.into_result("^GSPC").expect_err("must fail");
        assert_eq!(err.code, ErrorCode::Rejected);
        assert_eq!(err.message, "market data unavailable");
    }

    #[test]
    fn daily_failure_without_error_uses_default() {
        let response: DailyPredictionResponse =
            serde_json::from_value(json!({ "success": false })).expect("decode");
        let err = response.into_result("^GSPC").expect_err("must fail");
        assert_eq!(err.message, DEFAULT_PREDICTION_FAILURE);
    }

    #[test]
    fn daily_success_keeps_prices() {
        let response: DailyPredictionResponse = serde_json::from_value(json!({
            "success": true,
            "prediction": "0.1234%",
            "current_price": "$5000.00",
            "estimated_price": "$5006.17"
        }))
        .expect("decode");
        let result = response.into_result("^GSPC").expect("result");
        assert_eq!(result.symbol, "^GSPC");
        assert_eq!(result.predicted_return.value(), Some(0.1234));
        assert_eq!(
            result.estimated_price.map(|p| p.text().to_string()),
            Some("$5006.17".to_string())
        );
    }

    #[test]
    fn error_message_prefers_detail_then_error_then_message() {
        assert_eq!(
            error_message_from_body(&json!({ "detail": "symbol not found", "error": "x" })),
            Some("symbol not found".to_string())
        );
        assert_eq!(
            error_message_from_body(&json!({ "error": "bad things" })),
            Some("bad things".to_string())
        );
        assert_eq!(
            error_message_from_body(&json!({ "message": "try later" })),
            Some("try later".to_string())
        );
        assert_eq!(
            error_message_from_body(&json!({
                "detail": [{ "loc": ["body", "symbol"], "msg": "field required" }]
            })),
            Some("field required".to_string())
        );
        assert_eq!(error_message_from_body(&json!({ "detail": "" })), None);
        assert_eq!(error_message_from_body(&json!("plain")), None);
    }
}
