/// 位置指纹匹配
///
/// 指纹训练阶段在每个定位参考点记录各信标的 RSSI 平均值；定位阶段把本周期的
/// 快照与指纹库逐一比较，单位平方差最小的参考点即为最近参考点。

use crate::algorithms::{MatchOutcome, ScanSnapshot};
use crate::error::ProfileError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

static BEACON_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,5})_(\d{1,5})$").expect("信标键正则表达式无效")
});

/// 校验 `major_minor` 形式的信标键，major/minor 必须在 u16 范围内
fn is_valid_key(key: &str) -> bool {
    BEACON_KEY
        .captures(key)
        .map(|caps| caps[1].parse::<u16>().is_ok() && caps[2].parse::<u16>().is_ok())
        .unwrap_or(false)
}

// ============================================================================
// 参考点指纹
// ============================================================================

/// 定位参考点的指纹：信标键 -> RSSI 平均值
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePointProfile {
    /// 参考点名称（唯一）
    pub name: String,
    pub rssi_by_key: HashMap<String, f64>,
}

impl ReferencePointProfile {
    /// 从 (信标键, RSSI) 对创建，不做键校验
    pub fn from_pairs(name: impl Into<String>, pairs: Vec<(&str, f64)>) -> Self {
        ReferencePointProfile {
            name: name.into(),
            rssi_by_key: pairs
                .into_iter()
                .map(|(key, rssi)| (key.to_string(), rssi))
                .collect(),
        }
    }

    /// 解析数据库记录格式 `major_minor:rssi,major_minor:rssi,...`
    ///
    /// 空字符串得到空指纹；任何一个条目格式错误都会返回错误，不做默认值替换。
    pub fn parse(name: impl Into<String>, encoded: &str) -> Result<Self, ProfileError> {
        let name = name.into();
        let mut rssi_by_key = HashMap::new();

        for entry in encoded.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) =
                entry
                    .split_once(':')
                    .ok_or_else(|| ProfileError::MalformedEntry {
                        name: name.clone(),
                        entry: entry.to_string(),
                    })?;
            let key = key.trim();
            if !is_valid_key(key) {
                return Err(ProfileError::InvalidKey {
                    name: name.clone(),
                    key: key.to_string(),
                });
            }
            let rssi = value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ProfileError::InvalidRssi {
                    name: name.clone(),
                    key: key.to_string(),
                    value: value.trim().to_string(),
                })?;
            rssi_by_key.insert(key.to_string(), rssi);
        }

        Ok(ReferencePointProfile { name, rssi_by_key })
    }

    /// 编码为记录格式，键按字典序输出
    pub fn encode(&self) -> String {
        let mut keys: Vec<&String> = self.rssi_by_key.keys().collect();
        keys.sort();
        keys.iter()
            .map(|key| format!("{}:{}", key, self.rssi_by_key[*key]))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// 获取信标的 RSSI 平均值
    pub fn get(&self, key: &str) -> Option<f64> {
        self.rssi_by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.rssi_by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rssi_by_key.is_empty()
    }

    fn validate_keys(&self) -> Result<(), ProfileError> {
        match self.rssi_by_key.keys().find(|key| !is_valid_key(key)) {
            Some(key) => Err(ProfileError::InvalidKey {
                name: self.name.clone(),
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// 指纹库 JSON 条目：键值表形式或数据库记录形式
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileRecord {
    #[serde(rename_all = "camelCase")]
    Map {
        name: String,
        rssi_by_key: HashMap<String, f64>,
    },
    Encoded { name: String, rssis: String },
}

// ============================================================================
// 指纹库
// ============================================================================

/// 参考点指纹库，按加载顺序保存（匹配分数相同时先出现者优先）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferencePointLibrary {
    profiles: Vec<ReferencePointProfile>,
}

impl ReferencePointLibrary {
    pub fn new() -> Self {
        ReferencePointLibrary {
            profiles: Vec::new(),
        }
    }

    /// 从指纹向量创建，名称必须唯一
    pub fn from_profiles(profiles: Vec<ReferencePointProfile>) -> Result<Self, ProfileError> {
        let mut library = ReferencePointLibrary::new();
        for profile in profiles {
            if library.get(&profile.name).is_some() {
                return Err(ProfileError::DuplicateName(profile.name));
            }
            library.profiles.push(profile);
        }
        Ok(library)
    }

    /// 从数据库记录 (名称, `major_minor:rssi,...`) 创建
    pub fn from_records<'a, I>(records: I) -> Result<Self, ProfileError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let profiles = records
            .into_iter()
            .map(|(name, encoded)| ReferencePointProfile::parse(name, encoded))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_profiles(profiles)
    }

    /// 解析 JSON 数组，条目可以是
    /// `{"name": "RP1", "rssiByKey": {"1_1": -60.0}}` 或 `{"name": "RP1", "rssis": "1_1:-60"}`
    pub fn from_json_str(json: &str) -> Result<Self, ProfileError> {
        let records: Vec<ProfileRecord> = serde_json::from_str(json)?;
        let profiles = records
            .into_iter()
            .map(|record| match record {
                ProfileRecord::Map { name, rssi_by_key } => {
                    let profile = ReferencePointProfile { name, rssi_by_key };
                    profile.validate_keys()?;
                    Ok(profile)
                }
                ProfileRecord::Encoded { name, rssis } => {
                    ReferencePointProfile::parse(name, &rssis)
                }
            })
            .collect::<Result<Vec<_>, ProfileError>>()?;
        Self::from_profiles(profiles)
    }

    /// 从 JSON 文件加载
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let library = Self::from_json_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            profiles = library.len(),
            "指纹库加载完成"
        );
        Ok(library)
    }

    /// 添加或更新参考点，已存在时原位替换
    pub fn upsert(&mut self, profile: ReferencePointProfile) {
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    /// 删除参考点
    pub fn remove(&mut self, name: &str) -> Option<ReferencePointProfile> {
        let index = self.profiles.iter().position(|p| p.name == name)?;
        Some(self.profiles.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&ReferencePointProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferencePointProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// 清空指纹库
    pub fn clear(&mut self) {
        self.profiles.clear();
    }
}

// ============================================================================
// 指纹训练
// ============================================================================

/// 在一个参考点累积多个扫描周期，计算各信标 RSSI 平均值
#[derive(Clone, Debug)]
pub struct ProfileBuilder {
    name: String,
    /// 信标键 -> (RSSI 之和, 次数)
    sums: HashMap<String, (f64, u32)>,
    samples: usize,
}

impl ProfileBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ProfileBuilder {
            name: name.into(),
            sums: HashMap::new(),
            samples: 0,
        }
    }

    /// 累积一个扫描周期
    pub fn add_snapshot(&mut self, snapshot: &ScanSnapshot) {
        for observation in snapshot {
            let entry = self.sums.entry(observation.key()).or_insert((0.0, 0));
            entry.0 += observation.rssi;
            entry.1 += 1;
        }
        self.samples += 1;
    }

    /// 已累积的扫描周期数
    pub fn sample_count(&self) -> usize {
        self.samples
    }

    /// 生成指纹，每个信标取其出现周期内的平均值
    pub fn build(self) -> ReferencePointProfile {
        ReferencePointProfile {
            name: self.name,
            rssi_by_key: self
                .sums
                .into_iter()
                .map(|(key, (sum, count))| (key, sum / count as f64))
                .collect(),
        }
    }
}

// ============================================================================
// 指纹匹配
// ============================================================================

/// 最小单位平方差指纹匹配器，无状态
#[derive(Clone, Copy, Debug)]
pub struct FingerprintMatcher {
    /// 参与比较所需的最少共有信标数
    min_overlap: usize,
}

impl FingerprintMatcher {
    pub fn new(min_overlap: usize) -> Self {
        FingerprintMatcher { min_overlap }
    }

    pub fn min_overlap(&self) -> usize {
        self.min_overlap
    }

    /// 计算快照与单个参考点的单位平方差，返回 (分数, 共有信标数)
    ///
    /// 指纹中没有的信标不计入分数。
    pub fn score(profile: &ReferencePointProfile, snapshot: &ScanSnapshot) -> (f64, usize) {
        let n = snapshot.len() as f64;
        let mut diff_sum = 0.0;
        let mut overlap = 0;

        for observation in snapshot {
            let key = observation.key();
            match profile.get(&key) {
                Some(stored) => {
                    let diff = observation.rssi - stored;
                    diff_sum += diff * diff / n;
                    overlap += 1;
                }
                None => {
                    tracing::debug!(ref_point = %profile.name, key = %key, "指纹库中无此信标");
                }
            }
        }

        (diff_sum, overlap)
    }

    /// 找出最近参考点
    ///
    /// 快照为空或没有符合条件的参考点时返回 `None`。分数相同时保留先出现的参考点。
    pub fn match_snapshot(
        &self,
        snapshot: &ScanSnapshot,
        library: &ReferencePointLibrary,
    ) -> Option<MatchOutcome> {
        if snapshot.is_empty() {
            tracing::debug!("本周期没有信标，跳过指纹匹配");
            return None;
        }

        let mut best: Option<MatchOutcome> = None;
        for profile in library.iter() {
            let (score, overlap) = Self::score(profile, snapshot);
            if overlap < self.min_overlap {
                continue;
            }
            if !score.is_finite() {
                tracing::debug!(ref_point = %profile.name, "匹配分数无效，跳过");
                continue;
            }
            if best.as_ref().is_none_or(|b| score < b.score) {
                best = Some(MatchOutcome {
                    name: profile.name.clone(),
                    score,
                    overlap,
                });
            }
        }

        match &best {
            Some(outcome) => tracing::debug!(
                ref_point = %outcome.name,
                score = outcome.score,
                overlap = outcome.overlap,
                "最近参考点"
            ),
            None => tracing::debug!(profiles = library.len(), "没有符合条件的参考点"),
        }
        best
    }
}

impl Default for FingerprintMatcher {
    fn default() -> Self {
        FingerprintMatcher::new(1)
    }
}
