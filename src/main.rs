use blunav_guide::config::PositioningConfig;
use blunav_guide::error::ScanError;
use blunav_guide::logging::init_logging;
use blunav_guide::scanner::BleScanner;
use blunav_guide::{CycleReport, PositioningSession, ReferencePointLibrary, run_session};
use std::io::Write;
use std::process::ExitCode;
use tokio::sync::mpsc;

const USAGE: &str = "用法: blunav-guide <config.json> <library.json>";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [config_path, library_path] = args.as_slice() else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    if let Err(e) = init_logging() {
        eprintln!("日志初始化失败: {}", e);
    }

    match run(config_path, library_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "定位服务退出");
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: &str, library_path: &str) -> blunav_guide::Result<()> {
    let config = PositioningConfig::load_from(config_path)?;
    let library = ReferencePointLibrary::load_json(library_path)?;
    let scanner = BleScanner::new(config.scanner.clone())?;
    let session = PositioningSession::new(&config, library);

    let (sender, receiver) = mpsc::channel(16);
    let scan_task = tokio::spawn(scanner.run(sender, shutdown_signal()));

    let cycles = run_session(session, receiver, print_report).await;
    tracing::info!(cycles, "定位会话已结束");

    match scan_task.await {
        Ok(Ok(())) | Ok(Err(ScanError::ChannelClosed)) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(e) => {
            tracing::error!(error = %e, "扫描任务异常终止");
            Ok(())
        }
    }
}

/// Ctrl-C 时完成。无法注册信号处理时永不完成
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("收到 Ctrl-C，正在停止"),
        Err(e) => {
            tracing::warn!(error = %e, "无法注册 Ctrl-C 处理");
            std::future::pending::<()>().await;
        }
    }
}

/// 有稳定参考点或展品确认时输出一行 JSON
fn print_report(report: &CycleReport) {
    if report.stable_ref_point.is_none() && report.exhibit.is_none() {
        return;
    }
    match serde_json::to_string(report) {
        Ok(line) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{}", line) {
                tracing::warn!(error = %e, "写出报告失败");
            }
        }
        Err(e) => tracing::warn!(error = %e, "报告序列化失败"),
    }
}
