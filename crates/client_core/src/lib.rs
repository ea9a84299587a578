use async_trait::async_trait;
use shared::{
    domain::{PredictionRequest, PredictionResult},
    error::ApiError,
};

pub mod controller;
pub mod http;

pub use controller::{ControllerOptions, InFlight, OverlapPolicy, RequestController};
pub use http::{ApiShape, ClientConfigError, HttpPredictionClient};

/// The remote inference call the controller drives.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, ApiError>;
}
