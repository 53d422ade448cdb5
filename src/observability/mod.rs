//! 可观测性：tracing 订阅者初始化（默认 info，可通过 RUST_LOG 覆盖）
//!
//! 日志写到 stderr，stdout 留给调用结果。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // 重复初始化（例如测试中）直接忽略
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
