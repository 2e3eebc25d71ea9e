//! CLI command handlers.

mod crawl;
mod info;
mod queries;
mod setdiff;

pub use crawl::run_crawl_command;
pub use info::run_info_command;
pub use queries::run_queries_command;
pub use setdiff::run_setdiff_command;
