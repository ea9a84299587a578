use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(RequestId);

/// Trims and upper-cases a user-entered ticker. Returns `None` when nothing
/// is left after trimming.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_ascii_uppercase())
}

/// One accepted submission. The id is the identity checked when the
/// asynchronous call resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    id: RequestId,
    symbol: String,
}

impl PredictionRequest {
    /// Builds a request from raw input, or `None` if the symbol is blank.
    pub fn new(id: RequestId, raw_symbol: &str) -> Option<Self> {
        normalize_symbol(raw_symbol).map(|symbol| Self { id, symbol })
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

/// A value the service may send either as display text (`"2.30%"`,
/// `"$412.10"`) or as a bare number.
///
/// The display text is kept verbatim; `value` is the leading numeric prefix,
/// parsed the same lenient way a browser's `parseFloat` does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FigureRepr", into = "FigureRepr")]
pub struct Figure {
    text: String,
    value: Option<f64>,
}

impl Figure {
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let value = parse_leading_float(&text);
        Self { text, value }
    }

    pub fn from_number(value: f64) -> Self {
        Self {
            text: value.to_string(),
            value: if value.is_nan() { None } else { Some(value) },
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

impl fmt::Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FigureRepr {
    Number(f64),
    Text(String),
}

impl From<FigureRepr> for Figure {
    fn from(value: FigureRepr) -> Self {
        match value {
            FigureRepr::Number(n) => Figure::from_number(n),
            FigureRepr::Text(s) => Figure::from_text(s),
        }
    }
}

impl From<Figure> for FigureRepr {
    fn from(value: Figure) -> Self {
        FigureRepr::Text(value.text)
    }
}

fn parse_leading_float(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        let negative = bytes.first() == Some(&b'-');
        return Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// Outcome of a successful prediction call, normalised across the service's
/// response shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub symbol: String,
    pub predicted_return: Figure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Figure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_price: Option<Figure>,
    #[serde(default)]
    pub confidence: String,
}

/// Lifecycle of the controller's single request slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestState {
    Idle,
    Pending {
        request: PredictionRequest,
    },
    Succeeded {
        request: PredictionRequest,
        result: PredictionResult,
        resolved_at: DateTime<Utc>,
    },
    Failed {
        request: PredictionRequest,
        message: String,
        resolved_at: DateTime<Utc>,
    },
}

impl RequestState {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending { .. })
    }

    pub fn request(&self) -> Option<&PredictionRequest> {
        match self {
            RequestState::Idle => None,
            RequestState::Pending { request }
            | RequestState::Succeeded { request, .. }
            | RequestState::Failed { request, .. } => Some(request),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::Pending { .. } => "pending",
            RequestState::Succeeded { .. } => "succeeded",
            RequestState::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_symbol_by_trimming_and_uppercasing() {
        assert_eq!(normalize_symbol("  aapl \n"), Some("AAPL".to_string()));
        assert_eq!(normalize_symbol("brk.b"), Some("BRK.B".to_string()));
        assert_eq!(normalize_symbol("   "), None);
        assert_eq!(normalize_symbol(""), None);
    }

    #[test]
    fn request_keeps_normalized_symbol_and_id() {
        let request = PredictionRequest::new(RequestId(4), " tsla").expect("request");
        assert_eq!(request.symbol(), "TSLA");
        assert_eq!(request.id(), RequestId(4));
        assert!(PredictionRequest::new(RequestId(5), "\t").is_none());
    }

    #[test]
    fn figure_parses_leading_number_like_parse_float() {
        assert_eq!(Figure::from_text("2.3%").value(), Some(2.3));
        assert_eq!(Figure::from_text("-1.10%").value(), Some(-1.1));
        assert_eq!(Figure::from_text(" 0.00%").value(), Some(0.0));
        assert_eq!(Figure::from_text(".5").value(), Some(0.5));
        assert_eq!(Figure::from_text("1e2x").value(), Some(100.0));
        assert_eq!(Figure::from_text("3.").value(), Some(3.0));
        assert_eq!(Figure::from_text("$412.10").value(), None);
        assert_eq!(Figure::from_text("n/a").value(), None);
        assert_eq!(Figure::from_text("-").value(), None);
    }

    #[test]
    fn figure_accepts_numbers_and_strings_on_the_wire() {
        let from_number: Figure = serde_json::from_str("1.25").expect("number");
        assert_eq!(from_number.text(), "1.25");
        assert_eq!(from_number.value(), Some(1.25));

        let from_text: Figure = serde_json::from_str("\"-0.42%\"").expect("text");
        assert_eq!(from_text.text(), "-0.42%");
        assert_eq!(from_text.value(), Some(-0.42));
    }

    #[test]
    fn request_state_exposes_its_request() {
        let request = PredictionRequest::new(RequestId(1), "nvda").expect("request");
        assert_eq!(RequestState::Idle.request(), None);
        let pending = RequestState::Pending {
            request: request.clone(),
        };
        assert!(pending.is_pending());
        assert_eq!(pending.request(), Some(&request));
        assert_eq!(pending.label(), "pending");
    }
}
