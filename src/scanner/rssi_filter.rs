/// RSSI 平滑
///
/// 单次广播的 RSSI 抖动很大。每个信标保存采样窗口内的测量值，
/// 去掉最高和最低各 10% 后取平均。

use std::collections::VecDeque;

/// 可替换的 RSSI 测量与滤波
pub trait RssiFilter {
    /// 添加测量值
    fn add_measurement(&mut self, rssi: i16, now_ms: u64);
    /// true: 采样窗口内无测量值
    fn no_measurements_available(&self) -> bool;
    /// 每个扫描周期结束，计算 RSSI 均值
    fn calculate_rssi(&mut self, now_ms: u64) -> Option<f64>;
}

/// 采样窗口内的截尾平均
#[derive(Clone, Debug)]
pub struct RunningAverageRssiFilter {
    window_ms: u64,
    /// (时间戳, RSSI)，按时间顺序
    measurements: VecDeque<(u64, i16)>,
}

impl RunningAverageRssiFilter {
    pub fn new(window_ms: u64) -> Self {
        RunningAverageRssiFilter {
            window_ms,
            measurements: VecDeque::new(),
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// 最近一次测量的时间
    pub fn last_seen_ms(&self) -> Option<u64> {
        self.measurements.back().map(|(ts, _)| *ts)
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    fn prune(&mut self, now_ms: u64) {
        while let Some(&(ts, _)) = self.measurements.front() {
            if now_ms.saturating_sub(ts) > self.window_ms {
                self.measurements.pop_front();
            } else {
                break;
            }
        }
    }
}

impl RssiFilter for RunningAverageRssiFilter {
    fn add_measurement(&mut self, rssi: i16, now_ms: u64) {
        self.measurements.push_back((now_ms, rssi));
    }

    fn no_measurements_available(&self) -> bool {
        self.measurements.is_empty()
    }

    fn calculate_rssi(&mut self, now_ms: u64) -> Option<f64> {
        self.prune(now_ms);
        if self.measurements.is_empty() {
            return None;
        }

        let mut values: Vec<i16> = self.measurements.iter().map(|(_, rssi)| *rssi).collect();
        values.sort_unstable();

        let len = values.len();
        let (start, end) = if len > 2 {
            (len / 10 + 1, len - len / 10 - 2)
        } else {
            (0, len - 1)
        };
        let kept = &values[start..=end];
        let sum: f64 = kept.iter().map(|&v| f64::from(v)).sum();
        Some(sum / kept.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter() {
        let mut filter = RunningAverageRssiFilter::new(20_000);
        assert!(filter.no_measurements_available());
        assert_eq!(filter.calculate_rssi(0), None);
    }

    #[test]
    fn test_small_sample_plain_average() {
        let mut filter = RunningAverageRssiFilter::new(20_000);
        filter.add_measurement(-60, 0);
        filter.add_measurement(-70, 100);
        assert_eq!(filter.calculate_rssi(200), Some(-65.0));
    }

    #[test]
    fn test_outliers_trimmed() {
        let mut filter = RunningAverageRssiFilter::new(20_000);
        for (i, rssi) in [-90, -60, -61, -62, -40].into_iter().enumerate() {
            filter.add_measurement(rssi, i as u64 * 100);
        }
        // 排序后 [-90, -62, -61, -60, -40]，保留中间三个
        assert_eq!(filter.calculate_rssi(1000), Some(-61.0));
    }

    #[test]
    fn test_window_expiry() {
        let mut filter = RunningAverageRssiFilter::new(1000);
        filter.add_measurement(-80, 0);
        filter.add_measurement(-60, 900);
        assert_eq!(filter.calculate_rssi(1500), Some(-60.0));
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.calculate_rssi(5000), None);
        assert!(filter.no_measurements_available());
    }
}
