//! 核心数据模型定义

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::distance_km;

/// 标准血型列表
pub const STANDARD_BLOOD_GROUPS: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

/// 缺少医院坐标时使用的默认位置
pub const DEFAULT_HOSPITAL: Coordinate = Coordinate {
    lat: 12.9606,
    lng: 77.6416,
};

/// 缺少医院名称时展示的默认名称
pub const DEFAULT_HOSPITAL_NAME: &str = "Manipal Hospital";

/// 地理坐标（十进制度数）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// 到另一点的大圆距离（公里）
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_km(self.lat, self.lng, other.lat, other.lng)
    }
}

/// 血型
///
/// 以字符串形式保存并按大小写精确比较，非标准取值也会原样保留。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BloodGroup(String);

impl BloodGroup {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 是否属于标准血型集合
    pub fn is_standard(&self) -> bool {
        STANDARD_BLOOD_GROUPS.contains(&self.0.as_str())
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BloodGroup {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// 献血者档案，会话期间不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorProfile {
    pub id: String,
    pub name: String,
    pub blood_group: BloodGroup,
    pub lat: f64,
    pub lng: f64,
}

impl DonorProfile {
    pub fn location(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    /// 头像首字母
    pub fn initial(&self) -> Option<char> {
        self.name.chars().next()
    }
}

impl Default for DonorProfile {
    fn default() -> Self {
        Self {
            id: "D-101".to_string(),
            name: "Rahul Sharma".to_string(),
            blood_group: BloodGroup::new("A+"),
            lat: 12.965,
            lng: 77.65,
        }
    }
}

/// 献血请求（规范化后的内存表示）
///
/// 由 [`crate::StoredRequest::normalize`] 生成，业务逻辑只读取这里的字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationRequest {
    pub id: String,
    pub hospital_name: Option<String>,
    pub hospital: Coordinate,
    pub blood_group: Option<BloodGroup>,
    pub urgency_hours: Option<u32>,
    pub component: Option<String>,
    pub accepted_donors: Vec<String>,
}

impl DonationRequest {
    /// 指定献血者是否已接受该请求
    pub fn is_accepted_by(&self, donor_id: &str) -> bool {
        self.accepted_donors.iter().any(|id| id == donor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blood_group_is_case_sensitive() {
        assert_ne!(BloodGroup::new("A+"), BloodGroup::new("a+"));
        assert!(BloodGroup::new("AB-").is_standard());
        assert!(!BloodGroup::new("ab-").is_standard());
    }

    #[test]
    fn test_donor_profile_wire_format() {
        let json = r#"{"id":"D-7","name":"Asha","bloodGroup":"O-","lat":12.9,"lng":77.6}"#;
        let profile: DonorProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.blood_group.as_str(), "O-");
        assert_eq!(profile.location(), Coordinate::new(12.9, 77.6));
        assert_eq!(profile.initial(), Some('A'));

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["bloodGroup"], "O-");
    }

    #[test]
    fn test_is_accepted_by() {
        let request = DonationRequest {
            id: "r1".to_string(),
            hospital_name: None,
            hospital: DEFAULT_HOSPITAL,
            blood_group: None,
            urgency_hours: None,
            component: None,
            accepted_donors: vec!["D-1".to_string()],
        };

        assert!(request.is_accepted_by("D-1"));
        assert!(!request.is_accepted_by("D-2"));
    }
}
