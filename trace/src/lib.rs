use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt;

pub fn setup_tracing_to_stdout(filter: impl Into<LevelFilter>) {
    fmt().with_max_level(filter).init();
}
