// Error taxonomy shared by the loader, the model pipelines and the service facade.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmissionsError>;

#[derive(Error, Debug)]
pub enum EmissionsError {
    /// Required columns are missing, or a persisted bundle was fit on another feature schema.
    #[error("schema error: {0}")]
    Schema(String),

    #[error("model must be trained before {0}")]
    NotTrained(&'static str),

    #[error("no data loaded")]
    NoData,

    #[error("insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("linear fit failed: {0}")]
    LinearFit(#[from] linfa_linear::LinearError<f64>),

    #[error("chart error: {0}")]
    Chart(String),
}
