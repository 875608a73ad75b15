pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod hours;
pub mod ledger;
pub mod models;
pub mod offline;
pub mod pages;
pub mod stale;
pub mod state;
pub mod storage;
pub mod tips;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::load_store;
