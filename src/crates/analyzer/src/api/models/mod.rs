//! API request and response models

pub mod health;
pub mod history;

pub use health::HealthResponse;
pub use history::{
    DeleteHistoryResponse, HistoryDetail, HistoryItem, RenameHistoryRequest, SaveHistoryRequest,
    UpdateStatusRequest,
};
