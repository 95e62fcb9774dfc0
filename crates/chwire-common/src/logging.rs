//! 日志初始化模块

/// 初始化 tracing 日志
///
/// # Brief
/// 安装全局 tracing subscriber。`RUST_LOG` 环境变量优先，否则使用 `level`。
/// 重复调用时保持第一次安装的 subscriber。
///
/// # Arguments
/// * `level` - 默认日志级别过滤表达式，例如 `"info"` 或 `"chwire_types=trace"`
pub fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true))
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging("chwire_types=trace");
        init_logging("info");
        tracing::trace!(target: "chwire_types", "logging initialised");
    }
}
