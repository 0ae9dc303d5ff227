//! Database row models

pub mod history;

pub use history::HistoryRow;
