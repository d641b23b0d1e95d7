// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    GenerateTarget, InitOutcome, build_filter, format_resolution, generate_for_catalog,
    init_tracing, initialize, open_database, parse_report_format, resolve_path,
};

// Re-export reindex functionality from permalink-core
pub use permalink_core::reindex::{
    ReindexOptions, ReindexProgressCallback, ReindexSummary, execute_reindex,
};
