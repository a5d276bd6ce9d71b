//! 설정 파일 관리.
//!
//! `AppConfig`를 JSON 파일로 보관한다. 파일에 토큰이 들어가므로
//! 임시 파일에 쓴 뒤 rename으로 교체하고, unix에서는 소유자만 읽을 수 있게 둔다.

use crate::config::AppConfig;
use crate::error::CoreError;
use directories::ProjectDirs;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "config.json";

/// 설정 관리자
///
/// 복제본은 같은 설정을 공유한다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    current: Arc<RwLock<AppConfig>>,
    path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 설정 디렉토리의 `config.json` 사용
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// 지정 경로 사용. 파일이 없으면 기본 설정으로 만든다
    pub fn with_path(path: PathBuf) -> Result<Self, CoreError> {
        let config = if path.exists() {
            read_config(&path)?
        } else {
            let defaults = AppConfig::default_config();
            write_config(&path, &defaults)?;
            info!("기본 설정 파일 생성: {}", path.display());
            defaults
        };

        Ok(Self {
            current: Arc::new(RwLock::new(config)),
            path,
        })
    }

    /// 파일 기준 설정 (복제본)
    pub fn get(&self) -> AppConfig {
        self.current.read().clone()
    }

    /// 파일 설정에 환경변수를 덮어쓴 실행용 설정. 파일은 바꾸지 않는다
    pub fn effective(&self) -> AppConfig {
        let mut config = self.get();
        config.apply_env_overrides();
        config
    }

    /// 설정 교체 후 저장
    ///
    /// 저장에 실패하면 메모리의 설정도 그대로 둔다.
    pub fn update(&self, config: AppConfig) -> Result<(), CoreError> {
        write_config(&self.path, &config)?;
        *self.current.write() = config;
        Ok(())
    }

    /// 일부 필드만 고쳐 저장하고 결과 반환
    pub fn update_with<F>(&self, edit: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.get();
        edit(&mut config);
        self.update(config.clone())?;
        Ok(config)
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// 파일을 다시 읽는다
    pub fn reload(&self) -> Result<(), CoreError> {
        let config = read_config(&self.path)?;
        *self.current.write() = config;
        debug!("설정 다시 로드: {}", self.path.display());
        Ok(())
    }

    /// 플랫폼별 설정 디렉토리
    ///
    /// - Linux: `~/.config/flagmetry`
    /// - macOS: `~/Library/Application Support/io.flagmetry.flagmetry`
    /// - Windows: `%APPDATA%\flagmetry\flagmetry\config`
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("io", "flagmetry", "flagmetry")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }
}

fn read_config(path: &Path) -> Result<AppConfig, CoreError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("{} 읽기 실패: {e}", path.display())))?;
    let config: AppConfig = serde_json::from_str(&raw)
        .map_err(|e| CoreError::Config(format!("{} 파싱 실패: {e}", path.display())))?;
    debug!("설정 파일 로드: {}", path.display());
    Ok(config)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| CoreError::Config(format!("{} 생성 실패: {e}", dir.display())))?;
    }

    let body = serde_json::to_vec_pretty(config)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, body)
        .map_err(|e| CoreError::Config(format!("{} 쓰기 실패: {e}", staging.display())))?;
    restrict_permissions(&staging)?;
    fs::rename(&staging, path)
        .map_err(|e| CoreError::Config(format!("{} 교체 실패: {e}", path.display())))?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}
