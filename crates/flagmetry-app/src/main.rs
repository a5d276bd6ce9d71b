//! # flagmetry-app
//!
//! Flagmetry CLI 진입점.
//! 설정 로드(파일 → 환경변수 → CLI 인자), 제출기/리포터 와이어링.

mod commands;
mod lifecycle;

use anyhow::Result;
use clap::{Parser, Subcommand};
use flagmetry_core::config::AppConfig;
use flagmetry_core::config_manager::ConfigManager;
use flagmetry_network::submitter::SubmitOutcome;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 피처 플래그 사용량 텔레메트리 제출 도구
#[derive(Parser, Debug)]
#[command(name = "flagmetry")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// 수집 서버 토큰 (설정 파일/환경변수보다 우선)
    #[arg(long, global = true)]
    token: Option<String>,

    /// 수집 서버 기본 URL (예: https://www.flippercloud.io/adapter)
    #[arg(long, global = true)]
    url: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// JSON 스냅샷을 한 번 제출
    Submit {
        /// `enabled_metrics` 배열 형식의 JSON 파일
        #[arg(long, short = 'f')]
        file: PathBuf,
    },
    /// 표준 입력의 `name,true|false` 줄을 모아 주기적으로 제출
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "flagmetry={},flagmetry_app={},flagmetry_core={},flagmetry_network={}",
        args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    let config = resolve_config(&args)?;
    info!("텔레메트리 대상: {}", config.cloud.telemetry_url());

    match &args.command {
        Command::Submit { file } => {
            let outcome = commands::submit(&config, file).await?;
            if matches!(outcome, SubmitOutcome::Discarded(_)) {
                std::process::exit(2);
            }
        }
        Command::Watch => {
            let exit = commands::watch(&config).await?;
            info!("종료: {exit:?}");
        }
    }

    Ok(())
}

/// 설정 결정: 설정 파일 → 환경변수 → CLI 인자 순으로 덮어쓴 뒤 검증
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new()?,
    };
    info!("설정 파일: {}", manager.config_path().display());

    let mut config = manager.effective();
    apply_cli_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

fn apply_cli_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(token) = &args.token {
        config.cloud.token = token.clone();
    }
    if let Some(url) = &args.url {
        config.cloud.base_url = url.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submit_with_globals() {
        let args = Args::try_parse_from([
            "flagmetry",
            "submit",
            "--file",
            "counts.json",
            "--token",
            "asdf",
            "--url",
            "http://localhost:5000/adapter",
        ])
        .unwrap();

        let Command::Submit { file } = &args.command else {
            panic!("submit 명령이어야 함: {:?}", args.command);
        };
        assert_eq!(file, &PathBuf::from("counts.json"));
        assert_eq!(args.token.as_deref(), Some("asdf"));
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn cli_overrides_win() {
        let args = Args::try_parse_from(["flagmetry", "--token", "cli", "watch"]).unwrap();
        let mut config = AppConfig::default_config();
        config.cloud.token = "file".to_string();

        apply_cli_overrides(&mut config, &args);

        assert_eq!(config.cloud.token, "cli");
        assert_eq!(config.cloud.base_url, AppConfig::default_config().cloud.base_url);
    }

    #[test]
    fn resolve_config_creates_file_and_applies_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let path_arg = path.to_string_lossy().to_string();

        let args =
            Args::try_parse_from(["flagmetry", "--config", &path_arg, "--token", "asdf", "watch"])
                .unwrap();

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.cloud.token, "asdf");
        assert!(path.exists());
    }
}
