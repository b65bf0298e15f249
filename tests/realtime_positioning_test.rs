/// 实时定位流程测试
///
/// 模拟扫描器按周期通过 mpsc 通道发送快照，定位会话逐个处理：
/// - 参考点逗留统计
/// - 展品确认
/// - 扫描器侧的周期组装

use blunav_guide::algorithms::{BeaconId, CycleReport, ReferencePointLibrary, ScanSnapshot};
use blunav_guide::clock::ManualClock;
use blunav_guide::config::PositioningConfig;
use blunav_guide::positioning::{PositioningSession, SharedSession, run_session};
use blunav_guide::scanner::{Advertisement, CycleAssembler};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};

/// 模拟信号源：(周期时间, 快照)
fn simulated_walk() -> Vec<(u64, ScanSnapshot)> {
    let at_entrance = ScanSnapshot::from_tuples(vec![(1, 1, 1.0, -60.0), (1, 2, 5.0, -78.0)]);
    let at_painting = ScanSnapshot::from_tuples(vec![(1, 1, 4.5, -77.0), (1, 2, 0.8, -57.0)]);

    let mut walk = Vec::new();
    for i in 0..3 {
        walk.push((i * 1000, at_entrance.clone()));
    }
    // 一个空周期
    walk.push((3000, ScanSnapshot::new()));
    for i in 4..9 {
        walk.push((i * 1000, at_painting.clone()));
    }
    walk
}

fn library() -> ReferencePointLibrary {
    ReferencePointLibrary::from_records([("Entrance", "1_1:-60,1_2:-78"), ("Painting", "1_1:-77,1_2:-57")])
        .unwrap()
}

/// 信号源任务：每个周期先推进时钟再发送快照
async fn drive(clock: ManualClock, sender: mpsc::Sender<ScanSnapshot>) {
    for (t, snapshot) in simulated_walk() {
        clock.set(t);
        if sender.send(snapshot).await.is_err() {
            return;
        }
        // 等会话处理完再推进时钟
        sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_realtime_session_over_channel() {
    let clock = ManualClock::new(0);
    let session = PositioningSession::with_clock(&PositioningConfig::default(), library(), clock.clone());
    let (sender, receiver) = mpsc::channel(1);

    let source = tokio::spawn(drive(clock, sender));

    let mut reports: Vec<CycleReport> = Vec::new();
    let cycles = run_session(session, receiver, |report| reports.push(report.clone())).await;
    source.await.unwrap();

    assert_eq!(cycles, 9);
    assert_eq!(reports.len(), 9);

    // 入口处第二个周期起稳定
    assert_eq!(reports[0].stable_ref_point, None);
    assert_eq!(reports[1].stable_ref_point.as_deref(), Some("Entrance"));

    // 空周期不匹配，但逗留统计仍然保留入口
    assert_eq!(reports[3].beacon_count, 0);
    assert!(reports[3].matched.is_none());
    assert_eq!(reports[3].stable_ref_point.as_deref(), Some("Entrance"));

    // 5000 ms 窗口内 Painting 次数超过 Entrance 后切换
    assert_eq!(reports[8].stable_ref_point.as_deref(), Some("Painting"));

    // 展品：1_1 距离 1.0 米，停留 2000 ms 后离开，不会确认
    assert!(reports[..4].iter().all(|r| r.exhibit.is_none()));
    // 1_2 从 4000 开始计时，7000 时确认
    let confirmations: Vec<u64> = reports
        .iter()
        .filter(|r| r.exhibit.is_some())
        .map(|r| r.now_ms)
        .collect();
    assert_eq!(confirmations, vec![7000, 8000]);
    assert_eq!(reports[7].exhibit.unwrap().beacon, BeaconId::new(1, 2));
}

#[tokio::test]
async fn test_session_ends_when_sender_dropped() {
    let session = PositioningSession::with_clock(&PositioningConfig::default(), library(), ManualClock::new(0));
    let (sender, receiver) = mpsc::channel::<ScanSnapshot>(4);
    drop(sender);

    let cycles = run_session(session, receiver, |_| {}).await;
    assert_eq!(cycles, 0);
}

#[tokio::test]
async fn test_shared_session_from_tasks() {
    let clock = ManualClock::new(0);
    let shared = SharedSession::new(PositioningSession::with_clock(
        &PositioningConfig::default(),
        library(),
        clock.clone(),
    ));
    let snapshot = ScanSnapshot::from_tuples(vec![(1, 1, 1.0, -60.0), (1, 2, 5.0, -78.0)]);

    let mut handles = Vec::new();
    for _ in 0..3 {
        let shared = shared.clone();
        let snapshot = snapshot.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..4 {
                shared.process(&snapshot);
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let (cycles, stable) = shared.with_session(|session| {
        (session.cycles(), session.dwell().hits("Entrance").map(|h| h.len()))
    });
    assert_eq!(cycles, 12);
    assert_eq!(stable, Some(12));
}

#[test]
fn test_assembled_cycles_drive_session() {
    // 扫描器侧：广播 → 周期快照 → 会话
    tokio_test::block_on(async {
        let mut assembler = CycleAssembler::new(20_000, 2.0);
        let session = PositioningSession::with_clock(
            &PositioningConfig::default(),
            library(),
            ManualClock::new(0),
        );
        let (sender, receiver) = mpsc::channel(8);

        for cycle in 0..3u64 {
            let t = cycle * 1100;
            for (minor, rssi) in [(1, -60), (2, -78)] {
                let advertisement = Advertisement {
                    id: BeaconId::new(1, minor),
                    uuid: "fda50693-a4e2-4fb1-afcf-c6eb07647825".to_string(),
                    rssi,
                    measured_power: -59,
                };
                assembler.observe(&advertisement, t);
            }
            sender.send(assembler.finish_cycle(t + 1000)).await.unwrap();
        }
        drop(sender);

        let mut matched = Vec::new();
        let cycles = run_session(session, receiver, |report| {
            matched.push(report.matched.as_ref().map(|m| m.name.clone()));
        })
        .await;

        assert_eq!(cycles, 3);
        assert!(matched.iter().all(|m| m.as_deref() == Some("Entrance")));
    });
}
