/// 定位结果数据结构
///
/// 包含指纹匹配、展品确认以及每个扫描周期的汇总报告

use crate::algorithms::{BeaconId, BeaconObservation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 指纹匹配结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// 最近参考点名称
    pub name: String,
    /// 单位平方差
    pub score: f64,
    /// 快照与该参考点共有的信标数
    pub overlap: usize,
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (score {:.2}, 共有信标 {})",
            self.name, self.score, self.overlap
        )
    }
}

/// 展品确认事件：最近信标在阈值距离内停留足够长时间
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExhibitConfirmed {
    pub beacon: BeaconId,
    /// 本周期的距离（米）
    pub distance: f64,
    /// 已停留时间（毫秒）
    pub dwell_ms: u64,
}

impl fmt::Display for ExhibitConfirmed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "展品 {} @ {:.2} m, 停留 {} ms",
            self.beacon, self.distance, self.dwell_ms
        )
    }
}

/// 单个扫描周期的处理报告
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// 周期序号，从 1 开始
    pub cycle: u64,
    /// 单调时钟毫秒数
    pub now_ms: u64,
    /// 本周期信标数
    pub beacon_count: usize,
    /// 本周期指纹匹配结果
    pub matched: Option<MatchOutcome>,
    /// 逗留统计后的稳定参考点
    pub stable_ref_point: Option<String>,
    /// 本周期距离最近的信标
    pub nearest: Option<BeaconObservation>,
    /// 展品确认
    pub exhibit: Option<ExhibitConfirmed>,
    pub timestamp: DateTime<Utc>,
}

impl CycleReport {
    /// 获取详细描述
    pub fn detailed_description(&self) -> String {
        let matched = self
            .matched
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "无".to_string());
        let nearest = self
            .nearest
            .as_ref()
            .map(|n| format!("{} @ {:.2} m", n.id, n.distance))
            .unwrap_or_else(|| "无".to_string());
        format!(
            "周期 #{}: 信标数 {}, 匹配 {}, 稳定参考点 {}, 最近信标 {}, 展品 {}",
            self.cycle,
            self.beacon_count,
            matched,
            self.stable_ref_point.as_deref().unwrap_or("无"),
            nearest,
            self.exhibit
                .map(|e| e.beacon.to_string())
                .unwrap_or_else(|| "无".to_string())
        )
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {}",
            self.cycle,
            self.stable_ref_point.as_deref().unwrap_or("-"),
            self.exhibit
                .map(|e| e.beacon.to_string())
                .unwrap_or_else(|| "-".to_string())
        )
    }
}
