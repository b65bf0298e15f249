/// RSSI 到距离转换模型
///
/// 对数路径损耗模型: RSSI(d) = A + B * log10(d)，距离单位为米。

use crate::error::ConfigError;
use std::fmt;

/// RSSI 转距离模型
#[derive(Clone, Debug, PartialEq)]
pub struct RssiModel {
    /// 截距 A (dBm) - 1 米处的参考功率
    pub a: f64,
    /// 斜率 B - 衰减速率
    pub b: f64,
    /// 路径损耗指数 n
    pub n: f64,
}

impl RssiModel {
    /// 创建对数路径损耗模型
    ///
    /// # 参数
    /// - `a`: 截距 (dBm)
    /// - `b`: 斜率
    pub fn log_distance(a: f64, b: f64) -> Self {
        RssiModel { a, b, n: -b / 10.0 }
    }

    /// 由信标广播的 1 米处功率和路径损耗指数创建
    ///
    /// A = measured_power, B = -10 * n
    pub fn from_tx_power(measured_power: f64, n: f64) -> Self {
        RssiModel {
            a: measured_power,
            b: -10.0 * n,
            n,
        }
    }

    /// 根据 RSSI 计算距离（米）
    ///
    /// 反解对数距离模型: d = 10^((RSSI - A) / B)
    pub fn rssi_to_distance(&self, rssi: f64) -> f64 {
        let exponent = (rssi - self.a) / self.b;
        10_f64.powf(exponent)
    }

    /// 根据距离（米）计算 RSSI
    pub fn distance_to_rssi(&self, distance: f64) -> f64 {
        if distance <= 0.0 {
            return f64::NEG_INFINITY;
        }
        self.a + self.b * distance.log10()
    }

    /// 验证 RSSI 模型的合理性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.b >= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "rssi_model.b",
                value: self.b.to_string(),
                reason: "斜率 B 应为负数（RSSI 随距离增加而减小）".to_string(),
            });
        }
        if self.a > 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "rssi_model.a",
                value: self.a.to_string(),
                reason: "截距 A 通常为负（功率以 dBm 表示）".to_string(),
            });
        }
        Ok(())
    }

    /// 获取模型描述
    pub fn description(&self) -> String {
        format!(
            "RSSI模型 - A={:.2} dBm, B={:.2}, n={:.2}",
            self.a, self.b, self.n
        )
    }
}

impl Default for RssiModel {
    fn default() -> Self {
        // iBeacon 常见的 1 米功率
        RssiModel::from_tx_power(-59.0, 2.0)
    }
}

impl fmt::Display for RssiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
