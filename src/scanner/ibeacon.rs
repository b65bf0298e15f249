/// iBeacon 广播帧解析
///
/// Apple 厂商数据 (公司 ID 0x004C) 布局，btleplug 已去掉公司 ID：
///
/// | 偏移 | 长度 | 内容 |
/// |---|---|---|
/// | 0 | 2 | 0x02 0x15 |
/// | 2 | 16 | proximity UUID |
/// | 18 | 2 | major (大端) |
/// | 20 | 2 | minor (大端) |
/// | 22 | 1 | 1 米处功率 (有符号 dBm) |

use crate::algorithms::BeaconId;
use crate::error::DecodeError;
use std::collections::HashMap;
use std::fmt::Write;

/// Apple 公司 ID
pub const APPLE_COMPANY_ID: u16 = 0x004C;

const IBEACON_PREFIX: [u8; 2] = [0x02, 0x15];
const IBEACON_LEN: usize = 23;

/// 解析后的 iBeacon 帧
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IBeaconFrame {
    pub uuid: [u8; 16],
    pub major: u16,
    pub minor: u16,
    /// 1 米处功率 (dBm)
    pub measured_power: i8,
}

impl IBeaconFrame {
    /// 解析 Apple 厂商数据
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < 2 {
            return Err(DecodeError::InvalidLength {
                expected: IBEACON_LEN,
                actual: data.len(),
            });
        }
        let prefix = [data[0], data[1]];
        if prefix != IBEACON_PREFIX {
            return Err(DecodeError::NotIBeacon(prefix));
        }
        if data.len() < IBEACON_LEN {
            return Err(DecodeError::InvalidLength {
                expected: IBEACON_LEN,
                actual: data.len(),
            });
        }

        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&data[2..18]);
        Ok(IBeaconFrame {
            uuid,
            major: u16::from_be_bytes([data[18], data[19]]),
            minor: u16::from_be_bytes([data[20], data[21]]),
            measured_power: i8::from_be_bytes([data[22]]),
        })
    }

    /// 从外设的厂商数据表中查找 iBeacon 帧
    pub fn from_manufacturer_data(data: &HashMap<u16, Vec<u8>>) -> Result<Self, DecodeError> {
        let apple = data
            .get(&APPLE_COMPANY_ID)
            .ok_or(DecodeError::MissingAppleData)?;
        Self::decode(apple)
    }

    pub fn id(&self) -> BeaconId {
        BeaconId::new(self.major, self.minor)
    }

    /// 小写带连字符的 UUID 字符串
    pub fn uuid_string(&self) -> String {
        let mut out = String::with_capacity(36);
        for (i, byte) in self.uuid.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                out.push('-');
            }
            let _ = write!(out, "{:02x}", byte);
        }
        out
    }
}
