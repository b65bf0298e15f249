/// 扫描适配器：iBeacon 帧解析、RSSI 平滑、距离估算和周期组装
pub mod ble;
pub mod cycle;
pub mod ibeacon;
pub mod rssi_filter;
pub mod rssi_model;

pub use ble::*;
pub use cycle::*;
pub use ibeacon::*;
pub use rssi_filter::*;
pub use rssi_model::*;
