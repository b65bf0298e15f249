/// 日志初始化
///
/// 日志写到 stderr，stdout 留给逐行 JSON 报告。
/// 未设置 `RUST_LOG` 时默认 `info` 级别。

use std::io;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// 安装全局 tracing 订阅者，重复调用返回错误
pub fn init_logging() -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // 同一进程只能安装一个全局订阅者
        let first = init_logging();
        let second = init_logging();
        assert!(first.is_ok());
        assert!(second.is_err());
    }
}
