//! reqwest binding of the inference service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use shared::{
    domain::{PredictionRequest, PredictionResult},
    error::{
        ApiError, ErrorCode, DEFAULT_HISTORY_FAILURE, DEFAULT_MODELS_FAILURE,
        DEFAULT_PREDICTION_FAILURE,
    },
    protocol::{
        error_message_from_body, DailyPredictionResponse, HistoricalBar, PredictBody,
        SymbolPredictionResponse, TrainedModelsResponse,
    },
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::PredictionService;

/// Which `/predict` contract the server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiShape {
    /// `POST /predict` with `{"symbol": ...}`.
    #[default]
    SymbolPost,
    /// Symbol-less `GET /predict` returning a `success` envelope.
    DailyGet,
}

impl std::str::FromStr for ApiShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "symbol_post" | "symbol" | "post" => Ok(ApiShape::SymbolPost),
            "daily_get" | "daily" | "get" => Ok(ApiShape::DailyGet),
            other => Err(format!("unknown api shape '{other}'")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientConfigError {
    #[error("invalid server url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("server url '{0}' cannot carry a path")]
    NotABase(String),
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Predict,
    TrainedModels,
    Historical,
}

impl Endpoint {
    fn name(self) -> &'static str {
        match self {
            Endpoint::Predict => "predict",
            Endpoint::TrainedModels => "trained_models",
            Endpoint::Historical => "historical",
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            Endpoint::Predict => DEFAULT_PREDICTION_FAILURE,
            Endpoint::TrainedModels => DEFAULT_MODELS_FAILURE,
            Endpoint::Historical => DEFAULT_HISTORY_FAILURE,
        }
    }
}

pub struct HttpPredictionClient {
    http: Client,
    base_url: Url,
    shape: ApiShape,
}

impl HttpPredictionClient {
    pub fn new(
        server_url: &str,
        shape: ApiShape,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientConfigError> {
        let base_url = Url::parse(server_url.trim()).map_err(|source| {
            ClientConfigError::InvalidUrl {
                url: server_url.to_string(),
                source,
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientConfigError::NotABase(server_url.to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            shape,
        })
    }

    pub fn shape(&self) -> ApiShape {
        self.shape
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Symbols that have a trained model on the server.
    pub async fn list_trained_models(&self) -> Result<Vec<String>, ApiError> {
        let endpoint = Endpoint::TrainedModels;
        let response = self
            .http
            .get(self.endpoint(&["trained-models"]))
            .send()
            .await
            .map_err(|err| transport_error(endpoint, &err))?;
        let body: TrainedModelsResponse = decode(endpoint, response).await?;
        debug!(count = body.models.len(), "fetched trained models");
        Ok(body.models)
    }

    pub async fn historical_series(&self, symbol: &str) -> Result<Vec<HistoricalBar>, ApiError> {
        let endpoint = Endpoint::Historical;
        let response = self
            .http
            .get(self.endpoint(&["historical", symbol]))
            .send()
            .await
            .map_err(|err| transport_error(endpoint, &err))?;
        let bars: Vec<HistoricalBar> = decode(endpoint, response).await?;
        debug!(symbol, count = bars.len(), "fetched historical series");
        Ok(bars)
    }

    async fn predict_symbol(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResult, ApiError> {
        let endpoint = Endpoint::Predict;
        let response = self
            .http
            .post(self.endpoint(&["predict"]))
            .json(&PredictBody {
                symbol: request.symbol().to_string(),
            })
            .send()
            .await
            .map_err(|err| transport_error(endpoint, &err))?;
        let body: SymbolPredictionResponse = decode(endpoint, response).await?;
        Ok(body.into())
    }

    async fn predict_daily(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResult, ApiError> {
        let endpoint = Endpoint::Predict;
        let response = self
            .http
            .get(self.endpoint(&["predict"]))
            .send()
            .await
            .map_err(|err| transport_error(endpoint, &err))?;
        let body: DailyPredictionResponse = decode(endpoint, response).await?;
        body.into_result(request.symbol()).inspect_err(|err| {
            warn!(
                endpoint = endpoint.name(),
                detail = %err.message,
                "service reported unsuccessful prediction"
            );
        })
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, ApiError> {
        info!(
            request_id = %request.id(),
            symbol = request.symbol(),
            shape = ?self.shape,
            "requesting prediction"
        );
        match self.shape {
            ApiShape::SymbolPost => self.predict_symbol(request).await,
            ApiShape::DailyGet => self.predict_daily(request).await,
        }
    }
}

fn transport_error(endpoint: Endpoint, err: &reqwest::Error) -> ApiError {
    warn!(endpoint = endpoint.name(), error = %err, "request to prediction service failed");
    if err.is_timeout() {
        return match endpoint {
            Endpoint::Predict => ApiError::timeout(),
            _ => ApiError::new(ErrorCode::Timeout, endpoint.default_message()),
        };
    }
    ApiError::new(ErrorCode::Transport, endpoint.default_message())
}

async fn decode<T: DeserializeOwned>(endpoint: Endpoint, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|err| transport_error(endpoint, &err))?;

    if !status.is_success() {
        let message = serde_json::from_slice::<Value>(&bytes)
            .ok()
            .as_ref()
            .and_then(error_message_from_body)
            .unwrap_or_else(|| endpoint.default_message().to_string());
        warn!(
            endpoint = endpoint.name(),
            status = status.as_u16(),
            detail = %message,
            "prediction service returned an error status"
        );
        return Err(ApiError::new(ErrorCode::Status, message).with_status(status.as_u16()));
    }

    serde_json::from_slice::<T>(&bytes).map_err(|err| {
        warn!(
            endpoint = endpoint.name(),
            error = %err,
            "unexpected response body from prediction service"
        );
        ApiError::new(ErrorCode::Decode, endpoint.default_message()).with_status(status.as_u16())
    })
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
