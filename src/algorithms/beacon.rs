/// 蓝牙信标观测数据结构
///
/// 每个扫描周期由上游的信标检测服务产出一个 [`ScanSnapshot`]，
/// 其中每个信标已附带平滑后的 RSSI 和估算距离。核心算法只读这些数据。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 信标标识：(major, minor)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeaconId {
    pub major: u16,
    pub minor: u16,
}

impl BeaconId {
    pub fn new(major: u16, minor: u16) -> Self {
        BeaconId { major, minor }
    }

    /// 指纹库中使用的键，格式 `major_minor`
    pub fn key(&self) -> String {
        format!("{}_{}", self.major, self.minor)
    }
}

impl fmt::Display for BeaconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.major, self.minor)
    }
}

/// 单个信标在一个扫描周期内的观测
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeaconObservation {
    #[serde(flatten)]
    pub id: BeaconId,
    /// 距离（米），未测得时可能为 0 或负数
    pub distance: f64,
    /// RSSI 滑动平均值 (dBm)
    pub rssi: f64,
}

impl BeaconObservation {
    /// 创建新的观测
    pub fn new(major: u16, minor: u16, distance: f64, rssi: f64) -> Self {
        BeaconObservation {
            id: BeaconId::new(major, minor),
            distance,
            rssi,
        }
    }

    /// 从元组创建 (major, minor, distance, rssi)
    pub fn from_tuple((major, minor, distance, rssi): (u16, u16, f64, f64)) -> Self {
        Self::new(major, minor, distance, rssi)
    }

    pub fn key(&self) -> String {
        self.id.key()
    }

    /// 距离是否为有效测量值
    pub fn has_distance(&self) -> bool {
        self.distance.is_finite() && self.distance > 0.0
    }
}

/// 一个扫描周期内发现的全部信标
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "Vec<BeaconObservation>",
    into = "Vec<BeaconObservation>"
)]
pub struct ScanSnapshot {
    observations: Vec<BeaconObservation>,
}

impl ScanSnapshot {
    /// 创建空快照
    pub fn new() -> Self {
        ScanSnapshot {
            observations: Vec::new(),
        }
    }

    /// 从观测向量创建。同一信标重复出现时以后者为准
    pub fn from_vec(observations: Vec<BeaconObservation>) -> Self {
        observations.into_iter().collect()
    }

    /// 从 (major, minor, distance, rssi) 元组创建
    pub fn from_tuples(tuples: Vec<(u16, u16, f64, f64)>) -> Self {
        Self::from_vec(tuples.into_iter().map(BeaconObservation::from_tuple).collect())
    }

    /// 添加观测。同一信标重复出现时以后者为准
    pub fn push(&mut self, observation: BeaconObservation) {
        match self.observations.iter_mut().find(|o| o.id == observation.id) {
            Some(existing) => *existing = observation,
            None => self.observations.push(observation),
        }
    }

    pub fn get(&self, id: BeaconId) -> Option<&BeaconObservation> {
        self.observations.iter().find(|o| o.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BeaconObservation> {
        self.observations.iter()
    }

    pub fn as_slice(&self) -> &[BeaconObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl FromIterator<BeaconObservation> for ScanSnapshot {
    fn from_iter<I: IntoIterator<Item = BeaconObservation>>(iter: I) -> Self {
        let mut snapshot = ScanSnapshot::new();
        for observation in iter {
            snapshot.push(observation);
        }
        snapshot
    }
}

impl From<Vec<BeaconObservation>> for ScanSnapshot {
    fn from(observations: Vec<BeaconObservation>) -> Self {
        Self::from_vec(observations)
    }
}

impl From<ScanSnapshot> for Vec<BeaconObservation> {
    fn from(snapshot: ScanSnapshot) -> Self {
        snapshot.observations
    }
}

impl<'a> IntoIterator for &'a ScanSnapshot {
    type Item = &'a BeaconObservation;
    type IntoIter = std::slice::Iter<'a, BeaconObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}
