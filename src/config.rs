/// 定位配置
///
/// 从 JSON 文件加载，缺省字段使用默认值：
///
/// ```json
/// {
///   "dwell": { "window_ms": 5000 },
///   "exhibit": { "max_distance_m": 3.0, "empty_cycle_policy": { "mode": "retain" } },
///   "scanner": { "uuid_pattern": "^fda50693" }
/// }
/// ```

use crate::algorithms::{
    DEFAULT_MAX_DISTANCE_M, DEFAULT_MIN_DWELL_MS, DEFAULT_WINDOW_MS, EmptyCyclePolicy, MIN_HITS,
};
use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 默认扫描周期（毫秒）
pub const DEFAULT_CYCLE_PERIOD_MS: u64 = 1100;

/// 默认外设轮询间隔（毫秒）
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// RSSI 滑动平均的默认采样窗口（毫秒）
pub const DEFAULT_RSSI_WINDOW_MS: u64 = 20_000;

/// 默认路径损耗指数
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 2.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintSettings {
    /// 参考点参与比较所需的最少共有信标数，0 表示不限制
    pub min_overlap: usize,
}

impl Default for FingerprintSettings {
    fn default() -> Self {
        FingerprintSettings { min_overlap: 1 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellSettings {
    pub window_ms: u64,
    pub min_count: usize,
}

impl Default for DwellSettings {
    fn default() -> Self {
        DwellSettings {
            window_ms: DEFAULT_WINDOW_MS,
            min_count: MIN_HITS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearestSettings {
    /// 排序前丢弃未测得距离的信标
    pub ignore_unmeasured: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExhibitSettings {
    pub max_distance_m: f64,
    pub min_dwell_ms: u64,
    pub empty_cycle_policy: EmptyCyclePolicy,
}

impl Default for ExhibitSettings {
    fn default() -> Self {
        ExhibitSettings {
            max_distance_m: DEFAULT_MAX_DISTANCE_M,
            min_dwell_ms: DEFAULT_MIN_DWELL_MS,
            empty_cycle_policy: EmptyCyclePolicy::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub cycle_period_ms: u64,
    pub poll_interval_ms: u64,
    pub rssi_window_ms: u64,
    pub path_loss_exponent: f64,
    /// 只接收 UUID 匹配的 iBeacon（小写带连字符格式）
    pub uuid_pattern: Option<String>,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        ScannerSettings {
            cycle_period_ms: DEFAULT_CYCLE_PERIOD_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            rssi_window_ms: DEFAULT_RSSI_WINDOW_MS,
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
            uuid_pattern: None,
        }
    }
}

impl ScannerSettings {
    /// 编译 UUID 过滤正则
    pub fn uuid_regex(&self) -> Result<Option<Regex>, ConfigError> {
        self.uuid_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
                    field: "scanner.uuid_pattern",
                    value: pattern.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }
}

/// 定位配置
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositioningConfig {
    pub fingerprint: FingerprintSettings,
    pub dwell: DwellSettings,
    pub nearest: NearestSettings,
    pub exhibit: ExhibitSettings,
    pub scanner: ScannerSettings,
}

fn invalid(field: &'static str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl PositioningConfig {
    /// 解析 JSON 字符串并校验
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PositioningConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载，文件不存在时使用默认配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// 校验配置的合理性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dwell.window_ms == 0 {
            return Err(invalid("dwell.window_ms", 0, "时间窗口必须大于 0"));
        }
        if self.dwell.min_count == 0 {
            return Err(invalid("dwell.min_count", 0, "最少次数必须大于 0"));
        }
        if !(self.exhibit.max_distance_m.is_finite() && self.exhibit.max_distance_m > 0.0) {
            return Err(invalid(
                "exhibit.max_distance_m",
                self.exhibit.max_distance_m,
                "展品距离必须为正数",
            ));
        }
        if let EmptyCyclePolicy::ResetAfter { cycles: 0 } = self.exhibit.empty_cycle_policy {
            return Err(invalid(
                "exhibit.empty_cycle_policy.cycles",
                0,
                "空周期数必须大于 0",
            ));
        }
        if self.scanner.cycle_period_ms == 0 {
            return Err(invalid("scanner.cycle_period_ms", 0, "扫描周期必须大于 0"));
        }
        if self.scanner.poll_interval_ms == 0 {
            return Err(invalid("scanner.poll_interval_ms", 0, "轮询间隔必须大于 0"));
        }
        if self.scanner.rssi_window_ms == 0 {
            return Err(invalid("scanner.rssi_window_ms", 0, "采样窗口必须大于 0"));
        }
        if !(self.scanner.path_loss_exponent.is_finite() && self.scanner.path_loss_exponent > 0.0) {
            return Err(invalid(
                "scanner.path_loss_exponent",
                self.scanner.path_loss_exponent,
                "路径损耗指数必须为正数",
            ));
        }
        self.scanner.uuid_regex()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PositioningConfig::default();
        assert_eq!(config.dwell.window_ms, 5000);
        assert_eq!(config.dwell.min_count, 2);
        assert_eq!(config.exhibit.max_distance_m, 3.0);
        assert_eq!(config.exhibit.min_dwell_ms, 3000);
        assert_eq!(config.fingerprint.min_overlap, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PositioningConfig::from_json_str(
            r#"{"dwell": {"window_ms": 3000}, "exhibit": {"empty_cycle_policy": {"mode": "retain"}}}"#,
        )
        .unwrap();
        assert_eq!(config.dwell.window_ms, 3000);
        assert_eq!(config.dwell.min_count, 2);
        assert_eq!(config.exhibit.empty_cycle_policy, EmptyCyclePolicy::Retain);
        assert_eq!(config.scanner.cycle_period_ms, DEFAULT_CYCLE_PERIOD_MS);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = PositioningConfig::from_json_str(r#"{"dwell": {"window_ms": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "dwell.window_ms", .. }));

        let err =
            PositioningConfig::from_json_str(r#"{"scanner": {"uuid_pattern": "(["}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "scanner.uuid_pattern", .. }));

        let err = PositioningConfig::from_json_str(r#"{"exhibit": {"max_distance_m": -1.0}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = PositioningConfig::load_from(dir.path().join("missing.json")).unwrap();
        assert_eq!(config, PositioningConfig::default());
    }
}
