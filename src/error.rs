/// 错误类型定义
///
/// 匹配、排序、逗留统计这些算法本身不会失败（缺数据时返回 `None`），
/// 只有参考点指纹库解析、配置加载和蓝牙扫描会产生错误。

use thiserror::Error;

/// 参考点指纹库解析错误
#[derive(Debug, Error)]
pub enum ProfileError {
    /// 条目缺少 `:` 分隔符，格式应为 `major_minor:rssi`
    #[error("参考点 {name} 的条目 '{entry}' 格式错误，应为 major_minor:rssi")]
    MalformedEntry { name: String, entry: String },

    /// 信标键不是 `major_minor` 形式
    #[error("参考点 {name} 的信标键 '{key}' 无效，应为 major_minor")]
    InvalidKey { name: String, key: String },

    /// RSSI 数值无法解析
    #[error("参考点 {name} 的信标 {key} RSSI 值 '{value}' 无法解析")]
    InvalidRssi {
        name: String,
        key: String,
        value: String,
    },

    /// 参考点名称重复
    #[error("参考点名称重复: {0}")]
    DuplicateName(String),

    /// JSON 解析失败
    #[error("指纹库 JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 读取指纹库文件失败
    #[error("读取指纹库文件失败: {0}")]
    Io(#[from] std::io::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置文件 JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 配置值不合法
    #[error("配置无效: {field} = {value} - {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// iBeacon 广播帧解码错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("厂商数据中没有 Apple (0x004C) 条目")]
    MissingAppleData,

    #[error("iBeacon 帧长度错误: 需要 {expected} 字节，实际 {actual} 字节")]
    InvalidLength { expected: usize, actual: usize },

    #[error("不是 iBeacon 帧: 前缀 {0:02X?}")]
    NotIBeacon([u8; 2]),
}

/// 蓝牙扫描错误
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("蓝牙操作失败: {0}")]
    Bluetooth(#[from] btleplug::Error),

    #[error("未找到蓝牙适配器")]
    NoAdapter,

    #[error("快照通道已关闭")]
    ChannelClosed,
}

/// crate 顶层错误，供二进制程序汇总使用
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
