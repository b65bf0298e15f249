/// 定位核心算法模块
///
/// 该模块把逐周期的带噪声信标快照转换为稳定的定位决策：
/// - 位置指纹匹配（最小单位平方差）
/// - 时间窗口内的多数表决（参考点逗留统计）
/// - 最近信标排序与基于停留时间的展品确认

pub mod beacon;
pub mod dwell;
pub mod exhibit;
pub mod fingerprint;
pub mod nearest;
pub mod results;

pub use beacon::*;
pub use dwell::*;
pub use exhibit::*;
pub use fingerprint::*;
pub use nearest::*;
pub use results::*;
