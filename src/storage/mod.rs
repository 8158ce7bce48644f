// storage/mod.rs
// Database operations module

pub mod migrations;
pub mod pool;
pub mod runs;
pub mod state;
pub mod suggestions;

// Re-export commonly used items
pub use migrations::run_migrations;
pub use pool::init_db_pool_with_path;
pub use runs::{insert_run_metadata, update_run_stats};
pub use state::{clear_crawl_state, load_crawl_state, save_crawl_state};
pub use suggestions::SqliteSuggestionStore;
