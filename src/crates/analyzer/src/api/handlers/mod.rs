//! API endpoint handlers

pub mod analyze;
pub mod health;
pub mod history;
pub mod stream;

pub use analyze::analyze;
pub use health::health;
pub use history::{
    delete_history, get_history, list_history, rename_history, save_history,
    update_history_status,
};
pub use stream::analyze_stream;
