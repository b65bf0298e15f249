/// 距离最近信标
///
/// 每个扫描周期按距离从小到大排列信标。距离相差小于 [`DISTANCE_EPSILON`] 视为相等，
/// 保持输入顺序，避免浮点抖动导致相邻周期的排序来回翻转。

use crate::algorithms::{BeaconId, BeaconObservation, ScanSnapshot};
use std::cmp::Ordering;

/// 距离比较精度（米）
pub const DISTANCE_EPSILON: f64 = 0.001;

/// 带精度的距离比较，NaN 排在最后
pub fn compare_distance(a: f64, b: f64) -> Ordering {
    if (a - b).abs() < DISTANCE_EPSILON {
        return Ordering::Equal;
    }
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// 稳定插入排序。精度比较不满足全序，不能交给标准库排序
fn sort_by_distance(observations: &mut [BeaconObservation]) {
    for i in 1..observations.len() {
        let mut j = i;
        while j > 0
            && compare_distance(observations[j - 1].distance, observations[j].distance)
                == Ordering::Greater
        {
            observations.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// 一个扫描周期的排序结果
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NearestResult {
    ranked: Vec<BeaconObservation>,
}

impl NearestResult {
    /// 没有信标的周期
    pub fn empty() -> Self {
        NearestResult { ranked: Vec::new() }
    }

    /// 距离最近的信标
    pub fn nearest(&self) -> Option<&BeaconObservation> {
        self.ranked.first()
    }

    pub fn nearest_id(&self) -> Option<BeaconId> {
        self.nearest().map(|o| o.id)
    }

    /// 全部信标，按距离从近到远
    pub fn ranked(&self) -> &[BeaconObservation] {
        &self.ranked
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// 最近信标排序器，保存本周期的最近信标
#[derive(Clone, Debug, Default)]
pub struct NearestBeaconRanker {
    ignore_unmeasured: bool,
    nearest: Option<BeaconObservation>,
}

impl NearestBeaconRanker {
    pub fn new() -> Self {
        NearestBeaconRanker {
            ignore_unmeasured: false,
            nearest: None,
        }
    }

    /// 排序前丢弃距离为 0、负数或 NaN 的信标
    pub fn ignoring_unmeasured(mut self, ignore: bool) -> Self {
        self.ignore_unmeasured = ignore;
        self
    }

    /// 对本周期的信标排序。快照为空时清除保存的最近信标
    pub fn rank(&mut self, snapshot: &ScanSnapshot) -> NearestResult {
        let mut ranked: Vec<BeaconObservation> = snapshot
            .iter()
            .filter(|o| !self.ignore_unmeasured || o.has_distance())
            .cloned()
            .collect();

        if ranked.is_empty() {
            self.nearest = None;
            return NearestResult::empty();
        }

        sort_by_distance(&mut ranked);
        self.nearest = ranked.first().cloned();
        if let Some(nearest) = &self.nearest {
            tracing::debug!(
                beacon = %nearest.id,
                distance = nearest.distance,
                candidates = ranked.len(),
                "最近信标"
            );
        }
        NearestResult { ranked }
    }

    /// 便捷方法：只返回最近信标
    pub fn nearest(&mut self, snapshot: &ScanSnapshot) -> Option<BeaconObservation> {
        self.rank(snapshot).nearest().cloned()
    }

    /// 上一次排序得到的最近信标
    pub fn current(&self) -> Option<&BeaconObservation> {
        self.nearest.as_ref()
    }

    /// 上一次排序得到的最近距离，没有信标时为 `None`
    pub fn current_distance(&self) -> Option<f64> {
        self.nearest.as_ref().map(|o| o.distance)
    }
}
