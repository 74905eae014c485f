use std::path::PathBuf;
use std::sync::OnceLock;

use aum_common::observability::{init_logging, LogConfig};

static INIT_PATH: OnceLock<PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| init_logging(LogConfig::for_tests()).unwrap_or_default());
}
