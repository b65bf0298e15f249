/// 蓝牙扫描适配器
///
/// 轮询适配器的外设列表，读取 iBeacon 厂商数据和 RSSI，
/// 按扫描周期把快照发送给定位会话。收到停止信号后停止扫描并关闭通道。

use crate::algorithms::ScanSnapshot;
use crate::clock::{Clock, MonotonicClock};
use crate::config::ScannerSettings;
use crate::error::{ConfigError, DecodeError, ScanError};
use crate::scanner::{Advertisement, CycleAssembler, IBeaconFrame};
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager as PlatformManager};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};

/// 广播来源：每次轮询返回当前可见的 iBeacon 广播
pub trait AdvertisementSource {
    fn poll(&mut self) -> impl Future<Output = Result<Vec<Advertisement>, ScanError>> + Send;
}

/// btleplug 适配器上的广播来源
pub struct AdapterSource {
    adapter: Adapter,
}

impl AdapterSource {
    pub fn new(adapter: Adapter) -> Self {
        AdapterSource { adapter }
    }
}

impl AdvertisementSource for AdapterSource {
    /// 读取一次外设列表，每个外设只查询一次 properties
    fn poll(&mut self) -> impl Future<Output = Result<Vec<Advertisement>, ScanError>> + Send {
        async move {
            let mut advertisements = Vec::new();

            for peripheral in self.adapter.peripherals().await? {
                let properties = match peripheral.properties().await {
                    Ok(Some(properties)) => properties,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::debug!(address = %peripheral.address(), error = %e, "读取外设属性失败");
                        continue;
                    }
                };
                let Some(rssi) = properties.rssi else {
                    continue;
                };

                match IBeaconFrame::from_manufacturer_data(&properties.manufacturer_data) {
                    Ok(frame) => advertisements.push(Advertisement::from_frame(&frame, rssi)),
                    Err(DecodeError::MissingAppleData | DecodeError::NotIBeacon(_)) => {}
                    Err(e) => {
                        tracing::debug!(address = %peripheral.address(), error = %e, "iBeacon 帧解析失败");
                    }
                }
            }
            Ok(advertisements)
        }
    }
}

/// iBeacon 扫描器
pub struct BleScanner<C: Clock = MonotonicClock> {
    settings: ScannerSettings,
    assembler: CycleAssembler,
    clock: C,
}

impl BleScanner<MonotonicClock> {
    pub fn new(settings: ScannerSettings) -> Result<Self, ConfigError> {
        Self::with_clock(settings, MonotonicClock::new())
    }
}

impl<C: Clock> BleScanner<C> {
    pub fn with_clock(settings: ScannerSettings, clock: C) -> Result<Self, ConfigError> {
        let assembler = CycleAssembler::from_settings(&settings)?;
        Ok(BleScanner {
            settings,
            assembler,
            clock,
        })
    }

    /// 在第一个蓝牙适配器上扫描，直到 `shutdown` 完成、出错或接收端关闭
    ///
    /// 无论哪种退出方式都会停止扫描。接收端关闭时返回 [`ScanError::ChannelClosed`]。
    pub async fn run<F>(
        mut self,
        sender: mpsc::Sender<ScanSnapshot>,
        shutdown: F,
    ) -> Result<(), ScanError>
    where
        F: Future<Output = ()>,
    {
        let manager = PlatformManager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(ScanError::NoAdapter)?;

        adapter.start_scan(ScanFilter::default()).await?;
        tracing::info!(
            cycle_period_ms = self.settings.cycle_period_ms,
            poll_interval_ms = self.settings.poll_interval_ms,
            "蓝牙扫描已启动"
        );

        let mut source = AdapterSource::new(adapter);
        let result = self.drive(&mut source, sender, shutdown).await;

        match source.adapter.stop_scan().await {
            Ok(()) => tracing::info!("蓝牙扫描已停止"),
            Err(e) => tracing::warn!(error = %e, "停止扫描失败"),
        }
        result
    }

    /// 按轮询间隔读取广播，按扫描周期发送快照
    ///
    /// `shutdown` 完成时返回 `Ok(())`，`sender` 随之释放，接收端的会话自然结束。
    pub async fn drive<S, F>(
        &mut self,
        source: &mut S,
        sender: mpsc::Sender<ScanSnapshot>,
        shutdown: F,
    ) -> Result<(), ScanError>
    where
        S: AdvertisementSource,
        F: Future<Output = ()>,
    {
        let mut poll = interval(Duration::from_millis(self.settings.poll_interval_ms.max(1)));
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycle = interval(Duration::from_millis(self.settings.cycle_period_ms.max(1)));
        cycle.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次 tick 立即完成
        cycle.tick().await;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("收到停止信号，结束扫描");
                    return Ok(());
                }
                _ = poll.tick() => {
                    let now_ms = self.clock.now_millis();
                    for advertisement in source.poll().await? {
                        self.assembler.observe(&advertisement, now_ms);
                    }
                }
                _ = cycle.tick() => {
                    let snapshot = self.assembler.finish_cycle(self.clock.now_millis());
                    tracing::debug!(beacons = snapshot.len(), "扫描周期结束");
                    sender
                        .send(snapshot)
                        .await
                        .map_err(|_| ScanError::ChannelClosed)?;
                }
            }
        }
    }
}
