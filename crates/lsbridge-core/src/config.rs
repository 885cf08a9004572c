//! 브리지 설정 구조체와 3단계 병합.
//!
//! 설정 파일은 최상위 전송 설정, `global` 기본값, `targets` 목록으로 구성된다.
//! 타깃별 [`EffectiveConfig`]는 타깃 필드 → global 필드 → 스키마 기본값 순서로
//! 병합되며, 병합과 동시에 범위 검증을 통과해야 한다.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Lightstep 공개 API 기본 URL (프로젝트 경로 직전까지)
pub const DEFAULT_LIGHTSTEP_API_URL: &str =
    "https://api.lightstep.com/public/v0.1/Sumologic/projects/";

/// 스키마 기본값
pub const DEFAULT_RUN_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_RETRIES: u32 = 5;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.2;
pub const DEFAULT_RESOLUTION_MS: u64 = 60_000;
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// 최소/최대 제약
const MIN_RESOLUTION_MS: i64 = 60_000;
const MIN_WINDOW_SECONDS: i64 = 60;
const MIN_RUN_INTERVAL_SECONDS: i64 = 1;
const MIN_RETRIES: i64 = 1;
const MAX_RETRIES: i64 = 20;

// ============================================================
// 원본 설정 (파일 형태 그대로)
// ============================================================

/// 설정 파일 최상위 구조
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Sumo Logic HTTP 소스 URL
    #[serde(default)]
    pub sumo_http_url: Option<String>,
    /// Lightstep API 키 (Bearer 토큰)
    #[serde(default)]
    pub lightstep_api_key: Option<String>,
    /// Lightstep API 기본 URL
    #[serde(default)]
    pub lightstep_api_url: Option<String>,
    /// HTTP 요청 타임아웃 (초)
    #[serde(default)]
    pub request_timeout_secs: Option<i64>,
    /// 모든 타깃에 상속되는 기본값
    #[serde(default)]
    pub global: Overrides,
    /// 타깃 목록 (1개 이상)
    #[serde(default)]
    pub targets: Option<Vec<TargetConfig>>,
    /// 스키마에 없는 키 (검증 시 거부)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// 타깃 한 개의 원본 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Lightstep 프로젝트 이름 (작업 ID로도 사용)
    #[serde(default)]
    pub project: Option<String>,
    /// 조회할 저장 검색(search) 이름 목록
    #[serde(default)]
    pub searches: Option<Vec<String>>,
    /// 요청할 지연시간 백분위 목록
    #[serde(default)]
    pub percentiles: Option<Vec<Percentile>>,
    /// global을 덮어쓰는 필드
    #[serde(flatten)]
    pub overrides: Overrides,
}

/// global과 타깃이 공유하는 상속 가능 필드
///
/// 정수 필드는 음수 입력을 필드 경로와 함께 보고하기 위해 `i64`로 받는다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    pub run_interval_seconds: Option<i64>,
    #[serde(default)]
    pub batch_size: Option<i64>,
    #[serde(default)]
    pub retries: Option<i64>,
    #[serde(default)]
    pub backoff_factor: Option<f64>,
    #[serde(default)]
    pub resolution_ms: Option<i64>,
    #[serde(default)]
    pub window_seconds: Option<i64>,
    #[serde(default)]
    pub include_ops_counts: Option<bool>,
    #[serde(default)]
    pub include_error_counts: Option<bool>,
    #[serde(default)]
    pub source_category: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub source_host: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub dimensions: Option<String>,
    /// 스키마에 없는 키 (검증 시 거부)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// 백분위 값: 숫자 또는 숫자 문자열("99.9")을 허용한다
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Percentile {
    Number(f64),
    Text(String),
}

impl Percentile {
    fn coerce(&self, field: &str) -> Result<f64, ConfigError> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                ConfigError::invalid(field, format!("숫자로 변환할 수 없음: {s:?}"))
            })?,
        };
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(ConfigError::invalid(field, "0..=100 범위여야 함"));
        }
        Ok(value)
    }
}

// ============================================================
// 병합 결과
// ============================================================

/// Sumo 수집 요청에 붙는 선택적 라우팅 값
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRouting {
    pub source_category: Option<String>,
    pub source_name: Option<String>,
    pub source_host: Option<String>,
    pub metadata: Option<String>,
    pub dimensions: Option<String>,
}

impl SourceRouting {
    /// 타깃 값 우선, 없으면 global 값
    fn layered(target: &Overrides, global: &Overrides) -> Self {
        let pick = |t: &Option<String>, g: &Option<String>| t.clone().or_else(|| g.clone());
        Self {
            source_category: pick(&target.source_category, &global.source_category),
            source_name: pick(&target.source_name, &global.source_name),
            source_host: pick(&target.source_host, &global.source_host),
            metadata: pick(&target.metadata, &global.metadata),
            dimensions: pick(&target.dimensions, &global.dimensions),
        }
    }

    /// 설정 키와 값 쌍 (값이 있는 것만)
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("source_category", &self.source_category),
            ("source_name", &self.source_name),
            ("source_host", &self.source_host),
            ("metadata", &self.metadata),
            ("dimensions", &self.dimensions),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
    }
}

/// 모든 타깃이 공유하는 전송 설정 (검증 완료)
#[derive(Clone, PartialEq)]
pub struct DeliverySettings {
    pub sumo_http_url: Url,
    pub lightstep_api_key: String,
    pub lightstep_api_url: Url,
    pub request_timeout: Duration,
}

impl fmt::Debug for DeliverySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliverySettings")
            .field("sumo_http_url", &self.sumo_http_url.as_str())
            .field("lightstep_api_key", &"<redacted>")
            .field("lightstep_api_url", &self.lightstep_api_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// 타깃 한 개의 최종 설정. 생성 후 불변이며 하나의 스케줄 작업이 소유한다.
#[derive(Clone, PartialEq)]
pub struct EffectiveConfig {
    pub sumo_http_url: Url,
    pub lightstep_api_key: String,
    pub lightstep_api_url: Url,
    pub request_timeout: Duration,
    pub project: String,
    pub searches: Vec<String>,
    pub percentiles: Vec<f64>,
    pub resolution_ms: u64,
    pub window_seconds: u64,
    pub include_ops_counts: bool,
    pub include_error_counts: bool,
    pub run_interval_seconds: u64,
    pub batch_size: usize,
    pub retries: u32,
    pub backoff_factor: f64,
    pub routing: SourceRouting,
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveConfig")
            .field("project", &self.project)
            .field("searches", &self.searches)
            .field("percentiles", &self.percentiles)
            .field("resolution_ms", &self.resolution_ms)
            .field("window_seconds", &self.window_seconds)
            .field("include_ops_counts", &self.include_ops_counts)
            .field("include_error_counts", &self.include_error_counts)
            .field("run_interval_seconds", &self.run_interval_seconds)
            .field("batch_size", &self.batch_size)
            .field("retries", &self.retries)
            .field("backoff_factor", &self.backoff_factor)
            .field("routing", &self.routing)
            .field("sumo_http_url", &self.sumo_http_url.as_str())
            .field("lightstep_api_key", &"<redacted>")
            .field("lightstep_api_url", &self.lightstep_api_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl EffectiveConfig {
    /// 실행 주기
    pub fn run_interval(&self) -> Duration {
        Duration::from_secs(self.run_interval_seconds)
    }
}

// ============================================================
// 검증된 상속 레이어
// ============================================================

/// 범위 검증을 통과한 [`Overrides`]
#[derive(Debug, Clone, Default, PartialEq)]
struct Layer {
    run_interval_seconds: Option<u64>,
    batch_size: Option<usize>,
    retries: Option<u32>,
    backoff_factor: Option<f64>,
    resolution_ms: Option<u64>,
    window_seconds: Option<u64>,
}

fn at_least(scope: &str, field: &str, value: Option<i64>, min: i64) -> Result<Option<u64>, ConfigError> {
    match value {
        None => Ok(None),
        Some(v) if v < min => Err(ConfigError::invalid(
            format!("{scope}.{field}"),
            format!("{min} 이상이어야 함 (입력: {v})"),
        )),
        Some(v) => Ok(Some(v.unsigned_abs())),
    }
}

/// 알 수 없는 키가 있으면 첫 번째 키를 경로와 함께 거부
fn reject_unknown(
    scope: Option<&str>,
    extra: &BTreeMap<String, serde_json::Value>,
) -> Result<(), ConfigError> {
    let Some(key) = extra.keys().next() else {
        return Ok(());
    };
    let field = match scope {
        Some(scope) => format!("{scope}.{key}"),
        None => key.clone(),
    };
    Err(ConfigError::invalid(field, "알 수 없는 설정 키"))
}

/// 앞뒤 공백 없는 비어 있지 않은 문자열만 허용
fn exact_text(field: &str, value: &str) -> Result<String, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::invalid(field, "빈 문자열"));
    }
    if value.trim() != value {
        return Err(ConfigError::invalid(field, "앞뒤 공백 불허"));
    }
    Ok(value.to_string())
}

impl Overrides {
    fn validate(&self, scope: &str) -> Result<Layer, ConfigError> {
        reject_unknown(Some(scope), &self.extra)?;

        let retries = match self.retries {
            Some(v) if !(MIN_RETRIES..=MAX_RETRIES).contains(&v) => {
                return Err(ConfigError::invalid(
                    format!("{scope}.retries"),
                    format!("{MIN_RETRIES}..={MAX_RETRIES} 범위여야 함 (입력: {v})"),
                ));
            }
            Some(v) => Some(v.unsigned_abs() as u32),
            None => None,
        };

        let backoff_factor = match self.backoff_factor {
            Some(v) if !v.is_finite() || v < 0.0 => {
                return Err(ConfigError::invalid(
                    format!("{scope}.backoff_factor"),
                    format!("0 이상의 유한한 값이어야 함 (입력: {v})"),
                ));
            }
            other => other,
        };

        let batch_size = at_least(scope, "batch_size", self.batch_size, 1)?
            .map(|v| usize::try_from(v).unwrap_or(usize::MAX));

        Ok(Layer {
            run_interval_seconds: at_least(
                scope,
                "run_interval_seconds",
                self.run_interval_seconds,
                MIN_RUN_INTERVAL_SECONDS,
            )?,
            batch_size,
            retries,
            backoff_factor,
            resolution_ms: at_least(scope, "resolution_ms", self.resolution_ms, MIN_RESOLUTION_MS)?,
            window_seconds: at_least(scope, "window_seconds", self.window_seconds, MIN_WINDOW_SECONDS)?,
        })
    }
}

fn parse_http_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::invalid(field, format!("URL 형식 오류: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            field,
            format!("http/https URL만 허용: {}", url.scheme()),
        ));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ConfigError::invalid(field, "호스트가 없는 URL"));
    }
    Ok(url)
}

impl BridgeConfig {
    /// 최상위 전송 설정 검증
    pub fn delivery_settings(&self) -> Result<DeliverySettings, ConfigError> {
        let sumo_raw = self
            .sumo_http_url
            .as_deref()
            .ok_or_else(|| ConfigError::Missing {
                field: "sumo_http_url".to_string(),
            })?;
        let sumo_http_url = parse_http_url("sumo_http_url", sumo_raw)?;

        let lightstep_api_key = exact_text(
            "lightstep_api_key",
            self.lightstep_api_key
                .as_deref()
                .ok_or_else(|| ConfigError::Missing {
                    field: "lightstep_api_key".to_string(),
                })?,
        )?;

        let lightstep_api_url = parse_http_url(
            "lightstep_api_url",
            self.lightstep_api_url
                .as_deref()
                .unwrap_or(DEFAULT_LIGHTSTEP_API_URL),
        )?;

        let timeout_secs = at_least(
            "config",
            "request_timeout_secs",
            self.request_timeout_secs,
            1,
        )
        .map_err(|_| ConfigError::invalid("request_timeout_secs", "1 이상이어야 함"))?
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(DeliverySettings {
            sumo_http_url,
            lightstep_api_key,
            lightstep_api_url,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// 모든 타깃의 최종 설정 생성
    ///
    /// 하나라도 위반하면 첫 번째 위반을 반환한다. 스케줄링 전에 호출해야 한다.
    pub fn effective_configs(&self) -> Result<Vec<EffectiveConfig>, ConfigError> {
        reject_unknown(None, &self.extra)?;
        let delivery = self.delivery_settings()?;

        let targets = self.targets.as_ref().ok_or_else(|| ConfigError::Missing {
            field: "targets".to_string(),
        })?;
        if targets.is_empty() {
            return Err(ConfigError::invalid("targets", "타깃이 1개 이상 필요함"));
        }

        let mut seen = HashSet::new();
        let mut configs = Vec::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            let config = effective_config(&delivery, &self.global, target, index)?;
            if !seen.insert(config.project.clone()) {
                return Err(ConfigError::invalid(
                    format!("targets[{index}].project"),
                    format!("중복된 프로젝트: {}", config.project),
                ));
            }
            configs.push(config);
        }
        Ok(configs)
    }
}

/// 타깃 필드 → global 필드 → 스키마 기본값 순서로 병합
pub fn effective_config(
    delivery: &DeliverySettings,
    global: &Overrides,
    target: &TargetConfig,
    index: usize,
) -> Result<EffectiveConfig, ConfigError> {
    let scope = format!("targets[{index}]");
    let global_layer = global.validate("global")?;
    let target_layer = target.overrides.validate(&scope)?;

    let project = exact_text(
        &format!("{scope}.project"),
        target
            .project
            .as_deref()
            .ok_or_else(|| ConfigError::Missing {
                field: format!("{scope}.project"),
            })?,
    )?;

    let searches = target.searches.clone().ok_or_else(|| ConfigError::Missing {
        field: format!("{scope}.searches"),
    })?;
    if searches.is_empty() {
        return Err(ConfigError::invalid(
            format!("{scope}.searches"),
            "검색이 1개 이상 필요함",
        ));
    }
    if let Some(pos) = searches.iter().position(|s| s.trim().is_empty()) {
        return Err(ConfigError::invalid(
            format!("{scope}.searches[{pos}]"),
            "빈 문자열",
        ));
    }

    let raw_percentiles = target
        .percentiles
        .as_ref()
        .ok_or_else(|| ConfigError::Missing {
            field: format!("{scope}.percentiles"),
        })?;
    if raw_percentiles.is_empty() {
        return Err(ConfigError::invalid(
            format!("{scope}.percentiles"),
            "백분위가 1개 이상 필요함",
        ));
    }
    let percentiles = raw_percentiles
        .iter()
        .enumerate()
        .map(|(i, p)| p.coerce(&format!("{scope}.percentiles[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    let t = &target.overrides;
    Ok(EffectiveConfig {
        sumo_http_url: delivery.sumo_http_url.clone(),
        lightstep_api_key: delivery.lightstep_api_key.clone(),
        lightstep_api_url: delivery.lightstep_api_url.clone(),
        request_timeout: delivery.request_timeout,
        project,
        searches,
        percentiles,
        resolution_ms: target_layer
            .resolution_ms
            .or(global_layer.resolution_ms)
            .unwrap_or(DEFAULT_RESOLUTION_MS),
        window_seconds: target_layer
            .window_seconds
            .or(global_layer.window_seconds)
            .unwrap_or(DEFAULT_WINDOW_SECONDS),
        include_ops_counts: t
            .include_ops_counts
            .or(global.include_ops_counts)
            .unwrap_or(true),
        include_error_counts: t
            .include_error_counts
            .or(global.include_error_counts)
            .unwrap_or(true),
        run_interval_seconds: target_layer
            .run_interval_seconds
            .or(global_layer.run_interval_seconds)
            .unwrap_or(DEFAULT_RUN_INTERVAL_SECONDS),
        batch_size: target_layer
            .batch_size
            .or(global_layer.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE),
        retries: target_layer
            .retries
            .or(global_layer.retries)
            .unwrap_or(DEFAULT_RETRIES),
        backoff_factor: target_layer
            .backoff_factor
            .or(global_layer.backoff_factor)
            .unwrap_or(DEFAULT_BACKOFF_FACTOR),
        routing: SourceRouting::layered(t, global),
    })
}
