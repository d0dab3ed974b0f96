use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairsError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid {transform} transform: {reason}")]
    InvalidTransform { transform: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Degenerate input in {context}: zero variance")]
    DegenerateInput { context: String },

    #[error("Degenerate spread in {context}: zero standard deviation")]
    DegenerateSpread { context: String },

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Stationarity test error: {reason}")]
    StationarityTestError { reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PairsError {
    fn from(e: serde_json::Error) -> Self {
        PairsError::SerializationError(e.to_string())
    }
}
