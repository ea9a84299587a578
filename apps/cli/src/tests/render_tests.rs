use super::*;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use client_core::PredictionService;
use presentation::historical_series;
use shared::{
    domain::{Figure, PredictionRequest, PredictionResult},
    error::{ApiError, ErrorCode, ValidationError},
    protocol::HistoricalBar,
};

/// Answers immediately with a canned reply keyed by symbol.
struct CannedService;

#[async_trait]
impl PredictionService for CannedService {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, ApiError> {
        let predicted_return = match request.symbol() {
            "AAPL" => "2.3%",
            "MSFT" => "-1.1%",
            _ => {
                return Err(
                    ApiError::new(ErrorCode::Status, "symbol not found").with_status(400)
                )
            }
        };
        Ok(PredictionResult {
            symbol: request.symbol().to_string(),
            predicted_return: Figure::from_text(predicted_return),
            current_price: None,
            estimated_price: None,
            confidence: "High".to_string(),
        })
    }
}

fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).expect("utf8")
}

#[tokio::test]
async fn positive_prediction_renders_result_and_chart() {
    let controller = RequestController::new(Arc::new(CannedService));
    let mut buf = Vec::new();

    let directive = run_prediction(&controller, "aapl", &mut buf)
        .await
        .expect("prediction");

    match &directive {
        ViewDirective::ShowResult {
            symbol,
            predicted_return,
            color_hint,
            ..
        } => {
            assert_eq!(symbol, "AAPL");
            assert_eq!(predicted_return.text(), "2.3%");
            assert_eq!(*color_hint, ColorHint::Positive);
        }
        other => panic!("unexpected directive: {other:?}"),
    }

    let text = output(buf);
    assert!(text.starts_with("Requesting prediction for AAPL..."));
    assert!(text.contains("Predicted return: 2.3% (up)"));
    assert!(text.contains("Confidence:       High"));
    assert!(text.contains("Predicted Return"));
}

#[tokio::test]
async fn negative_prediction_gets_negative_hint() {
    let controller = RequestController::new(Arc::new(CannedService));
    let mut buf = Vec::new();

    let directive = run_prediction(&controller, "msft", &mut buf)
        .await
        .expect("prediction");

    assert!(matches!(
        directive,
        ViewDirective::ShowResult {
            color_hint: ColorHint::Negative,
            ..
        }
    ));
    assert!(output(buf).contains("-1.1% (down)"));
}

#[tokio::test]
async fn service_failure_renders_detail() {
    let controller = RequestController::new(Arc::new(CannedService));
    let mut buf = Vec::new();

    let directive = run_prediction(&controller, "xyz", &mut buf)
        .await
        .expect("settled");

    assert_eq!(
        directive,
        ViewDirective::ShowError {
            message: "symbol not found".to_string()
        }
    );
    assert!(output(buf).ends_with("Error: symbol not found\n"));
}

#[tokio::test]
async fn empty_symbol_is_refused_before_submission() {
    let controller = RequestController::new(Arc::new(CannedService));
    let mut buf = Vec::new();

    let err = run_prediction(&controller, "   ", &mut buf)
        .await
        .expect_err("must refuse");

    assert_eq!(
        err.downcast_ref::<ValidationError>(),
        Some(&ValidationError::EmptySymbol)
    );
    assert!(buf.is_empty());
}

#[test]
fn result_lists_optional_prices_and_timestamp() {
    let directive = ViewDirective::ShowResult {
        symbol: "^GSPC".to_string(),
        predicted_return: Figure::from_text("0.1234%"),
        current_price: Some(Figure::from_text("$5000.00")),
        estimated_price: Some(Figure::from_text("$5006.17")),
        confidence: String::new(),
        color_hint: ColorHint::Positive,
        last_updated: Utc
            .with_ymd_and_hms(2024, 5, 6, 21, 0, 0)
            .single()
            .expect("timestamp"),
    };
    let mut buf = Vec::new();
    render_directive(&directive, &mut buf).expect("render");

    let text = output(buf);
    assert!(text.contains("Current price:    $5000.00"));
    assert!(text.contains("Estimated price:  $5006.17"));
    assert!(text.contains("Last updated:     2024-05-06 21:00:00 UTC"));
    assert!(!text.contains("Confidence"));
}

#[test]
fn series_bars_scale_to_largest_value() {
    let bars = vec![
        HistoricalBar {
            date: "2024-01-02".to_string(),
            close: 50.0,
            open: None,
            high: None,
            low: None,
            volume: None,
        },
        HistoricalBar {
            date: "2024-01-03".to_string(),
            close: 100.0,
            open: None,
            high: None,
            low: None,
            volume: None,
        },
    ];
    let mut buf = Vec::new();
    render_series(&historical_series(&bars), &mut buf).expect("render");

    let text = output(buf);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Close Price");
    assert_eq!(lines[1].matches('#').count(), BAR_WIDTH / 2);
    assert_eq!(lines[2].matches('#').count(), BAR_WIDTH);

    let mut empty = Vec::new();
    render_series(&historical_series(&[]), &mut empty).expect("render");
    assert!(output(empty).contains("(no data)"));
}
