//! 설정 파일 로드.
//!
//! JSON 설정 파일을 읽어 [`BridgeConfig`]로 파싱하고, 타깃별
//! [`EffectiveConfig`] 목록으로 검증/병합한다.

use crate::config::{BridgeConfig, EffectiveConfig};
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 기본 설정 파일 이름
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// 설정 로더
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// 지정된 경로로 로더 생성
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// 설정 파일 경로
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 파일에서 원본 설정 로드
    pub fn load(&self) -> Result<BridgeConfig, ConfigError> {
        let content = fs::read_to_string(&self.config_path).map_err(|e| ConfigError::Read {
            path: self.config_path.display().to_string(),
            source: e,
        })?;

        let config = Self::parse(&content)?;
        debug!("설정 파일 로드 완료: {}", self.config_path.display());
        Ok(config)
    }

    /// 로드 + 검증 + 타깃별 병합
    pub fn load_effective(&self) -> Result<Vec<EffectiveConfig>, ConfigError> {
        let configs = self.load()?.effective_configs()?;
        info!(
            "설정 검증 완료: {} ({}개 타깃)",
            self.config_path.display(),
            configs.len()
        );
        Ok(configs)
    }

    /// JSON 문자열 파싱
    pub fn parse(content: &str) -> Result<BridgeConfig, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
