//! 日志初始化
//!
//! SDK 内部统一使用 `tracing`；依赖 `log` 的第三方库通过 `tracing-log` 桥接。

use tracing_subscriber::EnvFilter;

/// 安装全局 fmt subscriber
///
/// `RUST_LOG` 优先；未设置时使用 `default_directive`（如 `"humanoid_sdk=info"`）。
/// 重复调用无副作用，返回是否由本次调用完成安装。
///
/// ```
/// humanoid_sdk::init_logging("info");
/// ```
pub fn init_logging(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();

    // 已有 logger 时桥接失败不影响 tracing 输出
    let _ = tracing_log::LogTracer::init();
    tracing::subscriber::set_global_default(subscriber).is_ok()
}
