//! 存储记录与规范化
//!
//! 医院端写入的请求记录存在两种历史结构（血型字段为 `bloodGroup` 或 `group`），
//! 坐标等字段也可能缺失或以字符串形式出现。`StoredRequest` 原样保存记录的全部字段，
//! 回写时除 `acceptedDonors` 外不做任何改动；`normalize` 在存储边界把记录映射为
//! 唯一的规范化表示 [`DonationRequest`]。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{BloodGroup, Coordinate, DonationRequest};

pub const FIELD_ID: &str = "id";
pub const FIELD_HOSPITAL_NAME: &str = "hospitalName";
pub const FIELD_HOSPITAL_LAT: &str = "hospitalLat";
pub const FIELD_HOSPITAL_LON: &str = "hospitalLon";
pub const FIELD_BLOOD_GROUP: &str = "bloodGroup";
pub const FIELD_LEGACY_GROUP: &str = "group";
pub const FIELD_URGENCY: &str = "urgency";
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_ACCEPTED_DONORS: &str = "acceptedDonors";

/// 存储中的请求记录
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredRequest(Map<String, Value>);

impl StoredRequest {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// 请求ID；数字ID按其十进制文本比较
    pub fn id(&self) -> String {
        match self.0.get(FIELD_ID) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// 已接受的献血者ID，忽略非字符串元素
    pub fn accepted_donors(&self) -> Vec<String> {
        match self.0.get(FIELD_ACCEPTED_DONORS) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// 追加献血者ID
    ///
    /// 列表缺失时先初始化为空；已存在时不做修改。返回是否发生了追加。
    pub fn append_accepted_donor(&mut self, donor_id: &str) -> bool {
        let slot = self
            .0
            .entry(FIELD_ACCEPTED_DONORS)
            .or_insert_with(|| Value::Array(Vec::new()));

        if !slot.is_array() {
            tracing::warn!(
                "Replacing non-list acceptedDonors value {} with an empty list",
                slot
            );
            *slot = Value::Array(Vec::new());
        }

        let Value::Array(donors) = slot else {
            return false;
        };

        if donors.iter().any(|d| d.as_str() == Some(donor_id)) {
            return false;
        }

        donors.push(Value::String(donor_id.to_string()));
        true
    }

    /// 有效血型：`bloodGroup` 为真值时优先，否则取 `group`
    ///
    /// 非字符串的真值按其 JSON 文本保留，不会与任何标准血型相等。
    pub fn effective_blood_group(&self) -> Option<BloodGroup> {
        truthy_text(self.0.get(FIELD_BLOOD_GROUP))
            .or_else(|| truthy_text(self.0.get(FIELD_LEGACY_GROUP)))
            .map(BloodGroup::new)
    }

    /// 映射为规范化请求，缺失的坐标轴分别以 `default_hospital` 对应分量替代
    pub fn normalize(&self, default_hospital: Coordinate) -> DonationRequest {
        let lat = coordinate_axis(self.0.get(FIELD_HOSPITAL_LAT)).unwrap_or(default_hospital.lat);
        let lng = coordinate_axis(self.0.get(FIELD_HOSPITAL_LON)).unwrap_or(default_hospital.lng);

        DonationRequest {
            id: self.id(),
            hospital_name: non_empty_text(self.0.get(FIELD_HOSPITAL_NAME)),
            hospital: Coordinate::new(lat, lng),
            blood_group: self.effective_blood_group(),
            urgency_hours: urgency_hours(self.0.get(FIELD_URGENCY)),
            component: non_empty_text(self.0.get(FIELD_COMPONENT)),
            accepted_donors: self.accepted_donors(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |x| x != 0.0 && !x.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn truthy_text(value: Option<&Value>) -> Option<String> {
    match value.filter(|v| is_truthy(v))? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn coordinate_axis(value: Option<&Value>) -> Option<f64> {
    let value = value.filter(|v| is_truthy(v))?;
    let axis = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    axis.filter(|x| x.is_finite())
}

fn urgency_hours(value: Option<&Value>) -> Option<u32> {
    let hours = match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(hours).ok().filter(|h| *h > 0)
}
