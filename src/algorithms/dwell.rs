/// 参考点逗留统计
///
/// 每个扫描周期结束，记录定位到最近参考点的时间；在一段时间窗口内统计次数最多的参考点，
/// 且次数不少于 [`MIN_HITS`]。单个周期的误判因此不会改变当前位置。

use std::fmt;

/// 默认时间窗口（毫秒）
pub const DEFAULT_WINDOW_MS: u64 = 5000;

/// 参考点成为当前位置所需的最少次数
pub const MIN_HITS: usize = 2;

/// 参考点名称 -> 时间戳序列
///
/// 按参考点首次记录的顺序保存，次数相同时先记录的参考点优先。
#[derive(Clone, Debug)]
pub struct DwellTracker {
    window_ms: u64,
    min_count: usize,
    records: Vec<(String, Vec<u64>)>,
}

impl DwellTracker {
    /// 使用默认窗口和最少次数
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW_MS)
    }

    pub fn with_window(window_ms: u64) -> Self {
        Self::with_params(window_ms, MIN_HITS)
    }

    pub fn with_params(window_ms: u64, min_count: usize) -> Self {
        DwellTracker {
            window_ms,
            min_count,
            records: Vec::new(),
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn set_window_ms(&mut self, window_ms: u64) {
        self.window_ms = window_ms;
    }

    pub fn min_count(&self) -> usize {
        self.min_count
    }

    /// 记录一次定位到参考点
    pub fn record(&mut self, label: &str, timestamp_ms: u64) {
        match self.records.iter_mut().find(|(name, _)| name == label) {
            Some((_, timestamps)) => timestamps.push(timestamp_ms),
            None => self.records.push((label.to_string(), vec![timestamp_ms])),
        }
    }

    /// 剔除窗口外的时间戳，返回次数最多且不少于最少次数的参考点
    pub fn query(&mut self, now_ms: u64) -> Option<String> {
        let window_ms = self.window_ms;
        let survivors: Vec<(String, Vec<u64>)> = std::mem::take(&mut self.records)
            .into_iter()
            .filter_map(|(label, timestamps)| {
                let kept: Vec<u64> = timestamps
                    .into_iter()
                    .filter(|&ts| now_ms.saturating_sub(ts) <= window_ms)
                    .collect();
                if kept.is_empty() {
                    tracing::trace!(ref_point = %label, "参考点已无有效时间戳，移除");
                    None
                } else {
                    Some((label, kept))
                }
            })
            .collect();
        self.records = survivors;

        let mut best: Option<(&str, usize)> = None;
        for (label, timestamps) in &self.records {
            let count = timestamps.len();
            if count >= self.min_count && best.is_none_or(|(_, max)| count > max) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label.to_string())
    }

    /// 当前跟踪的参考点名称
    pub fn tracked_labels(&self) -> Vec<&str> {
        self.records.iter().map(|(label, _)| label.as_str()).collect()
    }

    /// 参考点的时间戳序列
    pub fn hits(&self, label: &str) -> Option<&[u64]> {
        self.records
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, timestamps)| timestamps.as_slice())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for DwellTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// 输出 `[RP1:0,1000][RP2:500]`
impl fmt::Display for DwellTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, timestamps) in &self.records {
            let joined = timestamps
                .iter()
                .map(|ts| ts.to_string())
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "[{}:{}]", label, joined)?;
        }
        Ok(())
    }
}
