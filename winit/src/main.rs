//! # Beat Lanes 主程序

use std::{
    path::PathBuf,
    sync::mpsc,
    thread,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use beat_lanes::{
    config::{Sys, load_sys},
    logging,
    loops::{ControlMsg, RawInputMsg, VisualMsg, main_loop},
};

#[derive(Parser)]
/// 命令行参数
struct ExecArgs {
    #[arg(long, default_value = "config_sys.toml")]
    /// 系统配置文件路径，不存在时使用默认配置
    config: PathBuf,
    #[arg(long, default_value = "info")]
    /// 未设置 `RUST_LOG` 时的日志级别
    log_level: String,
}

fn main() -> Result<()> {
    let args = ExecArgs::parse();
    logging::init_logging(&args.log_level);
    let sys = if args.config.exists() {
        load_sys(&args.config)
            .with_context(|| format!("加载配置失败: {}", args.config.display()))?
    } else {
        warn!(path = %args.config.display(), "配置文件不存在，使用默认配置");
        Sys::default()
    };
    info!(
        beat_interval_ms = sys.rhythm.beat_interval.as_millis() as u64,
        success_window_ms = sys.rhythm.success_window.as_millis() as u64,
        infinite = sys.rhythm.infinite_loop,
        "配置已加载"
    );

    let (control_tx, control_rx) = mpsc::sync_channel::<ControlMsg>(4);
    let (visual_tx, visual_rx) = mpsc::sync_channel::<VisualMsg>(2);
    let (raw_input_tx, raw_input_rx) = mpsc::sync_channel::<RawInputMsg>(64);

    let key_codes = sys.key_codes();
    let main_thread = thread::Builder::new()
        .name("main-loop".into())
        .spawn(move || main_loop::run(&sys, control_rx, raw_input_rx, visual_tx))?;

    beat_lanes_winit::run(control_tx, raw_input_tx, visual_rx, key_codes)?;
    if main_thread.join().is_err() {
        warn!("主循环线程异常退出");
    }
    Ok(())
}
