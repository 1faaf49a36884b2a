//! 日志系统初始化模块

/// 初始化全局日志系统
///
/// 使用 `tracing-subscriber`，支持环境变量 `RUST_LOG` 控制日志级别；
/// 未设置时使用 `default_level`。
///
/// # 使用方式
///
/// ```bash
/// RUST_LOG=info cargo run          # info 及以上级别
/// RUST_LOG=debug cargo run         # debug 及以上级别
/// RUST_LOG=beat_lanes=trace cargo run
/// ```
pub fn init_logging(default_level: &str) {
    use tracing_subscriber::fmt::time::FormatTime;
    use tracing_subscriber::{EnvFilter, fmt};

    // 只显示 HH:MM:SS.毫秒
    struct ClockTime;

    impl FormatTime for ClockTime {
        fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default();

            let total_secs = now.as_secs();
            let h = (total_secs / 3600) % 24;
            let m = (total_secs / 60) % 60;
            let s = total_secs % 60;

            write!(w, "{h:02}:{m:02}:{s:02}.{:03}", now.subsec_millis())
        }
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(true)
        .with_timer(ClockTime)
        .compact()
        .try_init();
}
