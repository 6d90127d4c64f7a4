//! 批量 patch 提取工具.
//!
//! 用法: `patchgen [配置文件路径]`, 缺省读取 `resources/config.json`.

use std::process::ExitCode;
use wsi_berry::prelude::*;

const DEFAULT_CONFIG: &str = "resources/config.json";

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("日志初始化失败");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_owned());

    // 配置不可用对整次运行致命.
    let config = match PatchConfig::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            log::error!("无法加载配置 {config_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let sink = FsPatchSink::new(config.output_dir.clone());
    let mut pipeline = SlidePipeline::new(config, sink);

    match pipeline.run() {
        Ok(summary) => {
            println!(
                "处理完成: {} 张切片, {} 个 patch; 跳过 {}, 失败 {}",
                summary.slides, summary.patches, summary.skipped, summary.failed
            );
            if summary.failed > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            log::error!("批量运行失败: {err}");
            ExitCode::FAILURE
        }
    }
}
