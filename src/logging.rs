//! ログ出力の初期化
//!
//! `tracing` のサブスクライバを標準エラー出力向けに設定します。
//! 評価結果などユーザー向けの出力は標準出力に出すため、ログとは分けています。

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// ログ設定
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 表示する最小レベル
    pub level: Level,
    /// モジュールパスを表示するか
    pub include_target: bool,
    /// ANSIカラー
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            include_target: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// デバッグ用
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            include_target: true,
            ..Self::default()
        }
    }

    /// エラーのみ
    pub fn quiet() -> Self {
        Self {
            level: Level::ERROR,
            ..Self::default()
        }
    }

    /// CLIフラグから決定（quietが優先）
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Self::quiet()
        } else if verbose {
            Self::verbose()
        } else {
            Self::default()
        }
    }
}

/// グローバルなサブスクライバを設定
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level)
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
