/// 定位会话
///
/// 每个扫描周期按顺序执行：
/// - 指纹匹配 → 记录参考点 → 逗留统计得到稳定参考点
/// - 最近信标排序 → 展品状态机
///
/// 会话由调用方显式创建和持有，没有进程级单例。

use crate::algorithms::{
    CycleReport, DwellTracker, ExhibitSelector, FingerprintMatcher, NearestBeaconRanker,
    ReferencePointLibrary, ScanSnapshot,
};
use crate::clock::{Clock, MonotonicClock};
use crate::config::PositioningConfig;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// 定位会话：持有指纹库、逗留统计和展品状态
pub struct PositioningSession<C: Clock = MonotonicClock> {
    library: ReferencePointLibrary,
    matcher: FingerprintMatcher,
    dwell: DwellTracker,
    ranker: NearestBeaconRanker,
    exhibit: ExhibitSelector,
    clock: C,
    cycles: u64,
}

impl PositioningSession<MonotonicClock> {
    /// 使用单调时钟创建会话
    pub fn new(config: &PositioningConfig, library: ReferencePointLibrary) -> Self {
        Self::with_clock(config, library, MonotonicClock::new())
    }
}

impl<C: Clock> PositioningSession<C> {
    pub fn with_clock(config: &PositioningConfig, library: ReferencePointLibrary, clock: C) -> Self {
        PositioningSession {
            library,
            matcher: FingerprintMatcher::new(config.fingerprint.min_overlap),
            dwell: DwellTracker::with_params(config.dwell.window_ms, config.dwell.min_count),
            ranker: NearestBeaconRanker::new()
                .ignoring_unmeasured(config.nearest.ignore_unmeasured),
            exhibit: ExhibitSelector::with_params(
                config.exhibit.max_distance_m,
                config.exhibit.min_dwell_ms,
            )
            .with_empty_policy(config.exhibit.empty_cycle_policy),
            clock,
            cycles: 0,
        }
    }

    /// 处理一个扫描周期，时间取自会话时钟
    pub fn process(&mut self, snapshot: &ScanSnapshot) -> CycleReport {
        let now_ms = self.clock.now_millis();
        self.process_at(snapshot, now_ms)
    }

    /// 处理一个扫描周期，使用给定的单调时间
    pub fn process_at(&mut self, snapshot: &ScanSnapshot, now_ms: u64) -> CycleReport {
        self.cycles += 1;

        let matched = self.matcher.match_snapshot(snapshot, &self.library);
        if let Some(outcome) = &matched {
            self.dwell.record(&outcome.name, now_ms);
        }
        let stable_ref_point = self.dwell.query(now_ms);

        let nearest = self.ranker.rank(snapshot);
        let exhibit = self.exhibit.advance(&nearest, now_ms);

        let report = CycleReport {
            cycle: self.cycles,
            now_ms,
            beacon_count: snapshot.len(),
            matched,
            stable_ref_point,
            nearest: nearest.nearest().cloned(),
            exhibit,
            timestamp: Utc::now(),
        };
        tracing::debug!(report = %report, "扫描周期处理完成");
        report
    }

    pub fn library(&self) -> &ReferencePointLibrary {
        &self.library
    }

    /// 替换指纹库，逗留统计保留
    pub fn set_library(&mut self, library: ReferencePointLibrary) {
        self.library = library;
    }

    pub fn dwell(&self) -> &DwellTracker {
        &self.dwell
    }

    pub fn ranker(&self) -> &NearestBeaconRanker {
        &self.ranker
    }

    pub fn exhibit(&self) -> &ExhibitSelector {
        &self.exhibit
    }

    /// 已处理的扫描周期数
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

/// 多线程共享的会话，所有可变状态由一把锁保护
pub struct SharedSession<C: Clock = MonotonicClock> {
    inner: Arc<Mutex<PositioningSession<C>>>,
}

impl<C: Clock> Clone for SharedSession<C> {
    fn clone(&self) -> Self {
        SharedSession {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock> SharedSession<C> {
    pub fn new(session: PositioningSession<C>) -> Self {
        SharedSession {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// 处理一个扫描周期
    pub fn process(&self, snapshot: &ScanSnapshot) -> CycleReport {
        self.with_session(|session| session.process(snapshot))
    }

    /// 在锁内访问会话。某个回调线程 panic 后仍然继续使用会话状态
    pub fn with_session<R>(&self, f: impl FnOnce(&mut PositioningSession<C>) -> R) -> R {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *guard)
    }
}

/// 从通道逐个接收快照并处理，通道关闭后返回处理的周期数
///
/// `on_report` 收到每个周期的报告，例如输出展品确认事件。
pub async fn run_session<C, F>(
    mut session: PositioningSession<C>,
    mut snapshots: mpsc::Receiver<ScanSnapshot>,
    mut on_report: F,
) -> u64
where
    C: Clock,
    F: FnMut(&CycleReport),
{
    tracing::info!(profiles = session.library().len(), "定位会话启动");

    while let Some(snapshot) = snapshots.recv().await {
        let report = session.process(&snapshot);
        if let Some(exhibit) = &report.exhibit {
            tracing::info!(cycle = report.cycle, exhibit = %exhibit, "展品确认");
        }
        if let Some(label) = &report.stable_ref_point {
            tracing::debug!(cycle = report.cycle, ref_point = %label, "稳定参考点");
        }
        on_report(&report);
    }

    tracing::info!(cycles = session.cycles(), "快照通道关闭，定位会话结束");
    session.cycles()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::BeaconId;
    use crate::clock::ManualClock;

    fn library() -> ReferencePointLibrary {
        ReferencePointLibrary::from_records([("RP1", "1_1:-60,1_2:-70"), ("RP2", "1_1:-80,1_2:-50")])
            .unwrap()
    }

    #[test]
    fn test_session_cycle_flow() {
        let mut config = PositioningConfig::default();
        config.dwell.window_ms = 3000;
        let clock = ManualClock::new(0);
        let mut session = PositioningSession::with_clock(&config, library(), clock.clone());
        let snapshot = ScanSnapshot::from_tuples(vec![(1, 1, 0.8, -60.0), (1, 2, 2.5, -70.0)]);

        let first = session.process(&snapshot);
        assert_eq!(first.matched.as_ref().map(|m| m.name.as_str()), Some("RP1"));
        assert_eq!(first.stable_ref_point, None);
        assert_eq!(first.nearest.as_ref().map(|n| n.id), Some(BeaconId::new(1, 1)));

        clock.set(1000);
        let second = session.process(&snapshot);
        assert_eq!(second.stable_ref_point.as_deref(), Some("RP1"));
        assert!(second.exhibit.is_none());

        clock.set(3000);
        let third = session.process(&snapshot);
        assert_eq!(third.exhibit.map(|e| e.beacon), Some(BeaconId::new(1, 1)));
        assert_eq!(session.cycles(), 3);
    }

    #[test]
    fn test_empty_cycle_report() {
        let mut session =
            PositioningSession::with_clock(&PositioningConfig::default(), library(), ManualClock::new(0));
        let report = session.process(&ScanSnapshot::new());
        assert_eq!(report.beacon_count, 0);
        assert!(report.matched.is_none());
        assert!(report.nearest.is_none());
        assert!(session.dwell().is_empty());
    }

    #[test]
    fn test_shared_session_across_threads() {
        let shared = SharedSession::new(PositioningSession::with_clock(
            &PositioningConfig::default(),
            library(),
            ManualClock::new(0),
        ));
        let snapshot = ScanSnapshot::from_tuples(vec![(1, 1, 0.8, -80.0), (1, 2, 2.5, -50.0)]);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                let snapshot = snapshot.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        shared.process(&snapshot);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        shared.with_session(|session| {
            assert_eq!(session.cycles(), 20);
            assert_eq!(session.dwell().hits("RP2").map(|h| h.len()), Some(20));
        });
    }
}
