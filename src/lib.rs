//! 基于 BLE 信标的室内定位
//!
//! 把逐周期的信标扫描快照转换为稳定的定位决策：
//! 指纹匹配得到参考点，逗留统计过滤抖动，最近信标驱动展品确认。

pub mod algorithms;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod positioning;
pub mod scanner;

pub use algorithms::{
    BeaconId, BeaconObservation, CycleReport, DwellTracker, ExhibitConfirmed, ExhibitSelector,
    FingerprintMatcher, MatchOutcome, NearestBeaconRanker, ReferencePointLibrary,
    ReferencePointProfile, ScanSnapshot,
};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::PositioningConfig;
pub use error::{Error, Result};
pub use positioning::{PositioningSession, SharedSession, run_session};
