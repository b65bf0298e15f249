/// 展品定位
///
/// 展品信标需要同时满足：本周期距离最近、距离不超过阈值、连续逗留时间不少于最小停留时间。
/// 调用顺序由类型表达：先 [`NearestBeaconRanker::rank`](crate::algorithms::NearestBeaconRanker::rank)
/// 得到 [`NearestResult`]，再交给 [`ExhibitSelector::advance`]。
///
/// 逗留满足后每个周期都会返回同一个确认事件，是否只通知一次由调用方决定。

use crate::algorithms::{BeaconId, ExhibitConfirmed, NearestResult};
use serde::{Deserialize, Serialize};

/// 默认展品距离阈值（米）
pub const DEFAULT_MAX_DISTANCE_M: f64 = 3.0;

/// 默认最小停留时间（毫秒）
pub const DEFAULT_MIN_DWELL_MS: u64 = 3000;

/// 本周期没有发现任何信标时如何处理候选展品
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum EmptyCyclePolicy {
    /// 保留候选展品和计时
    Retain,
    /// 连续 `cycles` 个空周期后清除候选展品
    ResetAfter { cycles: u32 },
}

impl Default for EmptyCyclePolicy {
    /// 容忍一次扫描空档
    fn default() -> Self {
        EmptyCyclePolicy::ResetAfter { cycles: 2 }
    }
}

/// 展品选择状态
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExhibitPhase {
    /// 没有候选展品
    Idle,
    /// 候选展品计时中
    Candidate { beacon: BeaconId, since_ms: u64 },
    /// 上一周期确认了该展品，下一周期继续按候选计时
    Confirmed { beacon: BeaconId, since_ms: u64 },
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    beacon: BeaconId,
    since_ms: u64,
}

/// 展品选择状态机
#[derive(Clone, Debug)]
pub struct ExhibitSelector {
    max_distance_m: f64,
    min_dwell_ms: u64,
    empty_policy: EmptyCyclePolicy,
    candidate: Option<Candidate>,
    empty_cycles: u32,
    confirmed: bool,
}

impl ExhibitSelector {
    /// 使用默认距离阈值和最小停留时间
    pub fn new() -> Self {
        Self::with_params(DEFAULT_MAX_DISTANCE_M, DEFAULT_MIN_DWELL_MS)
    }

    pub fn with_params(max_distance_m: f64, min_dwell_ms: u64) -> Self {
        ExhibitSelector {
            max_distance_m,
            min_dwell_ms,
            empty_policy: EmptyCyclePolicy::default(),
            candidate: None,
            empty_cycles: 0,
            confirmed: false,
        }
    }

    pub fn with_empty_policy(mut self, policy: EmptyCyclePolicy) -> Self {
        self.empty_policy = policy;
        self
    }

    pub fn max_distance_m(&self) -> f64 {
        self.max_distance_m
    }

    pub fn set_max_distance_m(&mut self, max_distance_m: f64) {
        self.max_distance_m = max_distance_m;
    }

    pub fn min_dwell_ms(&self) -> u64 {
        self.min_dwell_ms
    }

    pub fn set_min_dwell_ms(&mut self, min_dwell_ms: u64) {
        self.min_dwell_ms = min_dwell_ms;
    }

    pub fn empty_policy(&self) -> EmptyCyclePolicy {
        self.empty_policy
    }

    pub fn phase(&self) -> ExhibitPhase {
        match self.candidate {
            None => ExhibitPhase::Idle,
            Some(Candidate { beacon, since_ms }) if self.confirmed => {
                ExhibitPhase::Confirmed { beacon, since_ms }
            }
            Some(Candidate { beacon, since_ms }) => ExhibitPhase::Candidate { beacon, since_ms },
        }
    }

    /// 用本周期的最近信标推进状态机，逗留满足时返回确认事件
    pub fn advance(&mut self, nearest: &NearestResult, now_ms: u64) -> Option<ExhibitConfirmed> {
        self.confirmed = false;

        let Some(observation) = nearest.nearest() else {
            self.empty_cycles = self.empty_cycles.saturating_add(1);
            if let EmptyCyclePolicy::ResetAfter { cycles } = self.empty_policy {
                if self.empty_cycles >= cycles && self.candidate.is_some() {
                    tracing::debug!(empty_cycles = self.empty_cycles, "连续空周期，清除候选展品");
                    self.candidate = None;
                }
            }
            return None;
        };
        self.empty_cycles = 0;

        // 最近信标超出展品距离或距离无效，本周期没有展品，候选保持不变
        if observation.distance.is_nan() || observation.distance > self.max_distance_m {
            return None;
        }

        match self.candidate {
            Some(candidate) if candidate.beacon == observation.id => {
                let dwell_ms = now_ms.saturating_sub(candidate.since_ms);
                if dwell_ms >= self.min_dwell_ms {
                    self.confirmed = true;
                    tracing::debug!(beacon = %observation.id, dwell_ms, "展品确认");
                    Some(ExhibitConfirmed {
                        beacon: observation.id,
                        distance: observation.distance,
                        dwell_ms,
                    })
                } else {
                    None
                }
            }
            previous => {
                // 第一次发现或最近信标已改变，重新计时，本周期不可能满足停留时间
                tracing::debug!(
                    beacon = %observation.id,
                    previous = ?previous.map(|c| c.beacon),
                    "新的候选展品"
                );
                self.candidate = Some(Candidate {
                    beacon: observation.id,
                    since_ms: now_ms,
                });
                None
            }
        }
    }
}

impl Default for ExhibitSelector {
    fn default() -> Self {
        Self::new()
    }
}
