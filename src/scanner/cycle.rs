/// 扫描周期组装
///
/// 一个周期内收到的广播按信标汇总：每个信标保留自己的 RSSI 滤波器，
/// 周期结束时输出本周期听到的信标，附带平均 RSSI 和模型估算的距离。

use crate::algorithms::{BeaconId, BeaconObservation, ScanSnapshot};
use crate::config::ScannerSettings;
use crate::error::ConfigError;
use crate::scanner::{IBeaconFrame, RssiFilter, RssiModel, RunningAverageRssiFilter};
use regex::Regex;
use std::collections::HashMap;

/// 一次 iBeacon 广播
#[derive(Clone, Debug, PartialEq)]
pub struct Advertisement {
    pub id: BeaconId,
    pub uuid: String,
    pub rssi: i16,
    pub measured_power: i8,
}

impl Advertisement {
    pub fn from_frame(frame: &IBeaconFrame, rssi: i16) -> Self {
        Advertisement {
            id: frame.id(),
            uuid: frame.uuid_string(),
            rssi,
            measured_power: frame.measured_power,
        }
    }
}

#[derive(Clone, Debug)]
struct Track {
    filter: RunningAverageRssiFilter,
    measured_power: i8,
}

/// 把广播流切分为逐周期快照
#[derive(Debug)]
pub struct CycleAssembler {
    window_ms: u64,
    path_loss_exponent: f64,
    uuid_filter: Option<Regex>,
    tracks: HashMap<BeaconId, Track>,
    /// 本周期听到的信标，按首次听到的顺序
    heard: Vec<BeaconId>,
}

impl CycleAssembler {
    pub fn new(window_ms: u64, path_loss_exponent: f64) -> Self {
        CycleAssembler {
            window_ms,
            path_loss_exponent,
            uuid_filter: None,
            tracks: HashMap::new(),
            heard: Vec::new(),
        }
    }

    pub fn from_settings(settings: &ScannerSettings) -> Result<Self, ConfigError> {
        let mut assembler = Self::new(settings.rssi_window_ms, settings.path_loss_exponent);
        assembler.uuid_filter = settings.uuid_regex()?;
        Ok(assembler)
    }

    /// 只接收 UUID 匹配的信标
    pub fn with_uuid_filter(mut self, filter: Regex) -> Self {
        self.uuid_filter = Some(filter);
        self
    }

    /// 记录一次广播，被 UUID 过滤掉时返回 false
    pub fn observe(&mut self, advertisement: &Advertisement, now_ms: u64) -> bool {
        if let Some(filter) = &self.uuid_filter {
            if !filter.is_match(&advertisement.uuid) {
                return false;
            }
        }

        let window_ms = self.window_ms;
        let track = self.tracks.entry(advertisement.id).or_insert_with(|| Track {
            filter: RunningAverageRssiFilter::new(window_ms),
            measured_power: advertisement.measured_power,
        });
        track.measured_power = advertisement.measured_power;
        track.filter.add_measurement(advertisement.rssi, now_ms);

        if !self.heard.contains(&advertisement.id) {
            self.heard.push(advertisement.id);
        }
        true
    }

    /// 结束本周期，输出快照并清理长时间未出现的信标
    pub fn finish_cycle(&mut self, now_ms: u64) -> ScanSnapshot {
        let mut snapshot = ScanSnapshot::new();

        for id in std::mem::take(&mut self.heard) {
            let Some(track) = self.tracks.get_mut(&id) else {
                continue;
            };
            let Some(rssi) = track.filter.calculate_rssi(now_ms) else {
                continue;
            };
            let distance = if track.measured_power == 0 {
                -1.0
            } else {
                RssiModel::from_tx_power(f64::from(track.measured_power), self.path_loss_exponent)
                    .rssi_to_distance(rssi)
            };
            snapshot.push(BeaconObservation {
                id,
                distance,
                rssi,
            });
        }

        let window_ms = self.window_ms;
        self.tracks.retain(|id, track| {
            let alive = track
                .filter
                .last_seen_ms()
                .is_some_and(|ts| now_ms.saturating_sub(ts) <= window_ms);
            if !alive {
                tracing::debug!(beacon = %id, "信标超时，移除 RSSI 滤波器");
            }
            alive
        });

        snapshot
    }

    /// 正在跟踪的信标数
    pub fn tracked(&self) -> usize {
        self.tracks.len()
    }
}
