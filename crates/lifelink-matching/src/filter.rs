//! 资格过滤
//!
//! 请求对献血者可见，当且仅当：血型完全一致且距离不超过半径，或献血者已接受该请求。
//! 过滤保持输入顺序，不按距离或紧急程度排序。

use lifelink_core::{utils::format_distance, DonationRequest, DonorProfile};
use serde::{Deserialize, Serialize};

/// 默认匹配半径（公里），边界包含在内
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// 对某位献血者可见的请求及其距离
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRequest {
    pub request: DonationRequest,
    pub distance_km: f64,
    pub accepted: bool,
}

impl MatchedRequest {
    /// 一位小数的距离文本
    pub fn distance_display(&self) -> String {
        format_distance(self.distance_km)
    }
}

/// 资格过滤器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibilityFilter {
    radius_km: f64,
}

impl EligibilityFilter {
    pub fn new(radius_km: f64) -> Self {
        Self { radius_km }
    }

    /// 可见性规则
    pub fn is_visible(&self, blood_group_matches: bool, distance_km: f64, accepted: bool) -> bool {
        (blood_group_matches && distance_km <= self.radius_km) || accepted
    }

    /// 评估单个请求，不可见时返回 `None`
    pub fn evaluate(&self, donor: &DonorProfile, request: &DonationRequest) -> Option<MatchedRequest> {
        let distance_km = donor.location().distance_to(&request.hospital);
        let blood_group_matches = request.blood_group.as_ref() == Some(&donor.blood_group);
        let accepted = request.is_accepted_by(&donor.id);

        self.is_visible(blood_group_matches, distance_km, accepted)
            .then(|| MatchedRequest {
                request: request.clone(),
                distance_km,
                accepted,
            })
    }

    /// 稳定过滤整个请求列表
    pub fn filter(&self, donor: &DonorProfile, requests: &[DonationRequest]) -> Vec<MatchedRequest> {
        let matches: Vec<MatchedRequest> = requests
            .iter()
            .filter_map(|request| self.evaluate(donor, request))
            .collect();

        tracing::debug!(
            "Donor {} sees {} of {} requests",
            donor.id,
            matches.len(),
            requests.len()
        );
        matches
    }
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_KM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifelink_core::{BloodGroup, Coordinate, DEFAULT_HOSPITAL};

    /// 一公里对应的纬度差
    const DEG_PER_KM: f64 = 1.0 / 111.194_926_644_558_73;

    fn donor() -> DonorProfile {
        DonorProfile::default()
    }

    fn request_at(id: &str, group: Option<&str>, km_north: f64) -> DonationRequest {
        let donor = donor();
        DonationRequest {
            id: id.to_string(),
            hospital_name: None,
            hospital: Coordinate::new(donor.lat + km_north * DEG_PER_KM, donor.lng),
            blood_group: group.map(BloodGroup::new),
            urgency_hours: Some(4),
            component: Some("Whole Blood".to_string()),
            accepted_donors: Vec::new(),
        }
    }

    #[test]
    fn test_radius_threshold() {
        let filter = EligibilityFilter::default();
        let donor = donor();

        assert!(filter.evaluate(&donor, &request_at("near", Some("A+"), 5.0)).is_some());
        assert!(filter.evaluate(&donor, &request_at("far", Some("A+"), 11.0)).is_none());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let filter = EligibilityFilter::default();
        assert!(filter.is_visible(true, 10.0, false));
        assert!(!filter.is_visible(true, 10.000_001, false));

        // 半径恰好等于实际距离时仍可见
        let donor = donor();
        let request = request_at("edge", Some("A+"), 7.5);
        let exact = donor.location().distance_to(&request.hospital);
        assert!(EligibilityFilter::new(exact).evaluate(&donor, &request).is_some());
    }

    #[test]
    fn test_blood_group_must_match_exactly() {
        let filter = EligibilityFilter::default();
        let donor = donor();

        assert!(filter.evaluate(&donor, &request_at("r", Some("B+"), 1.0)).is_none());
        assert!(filter.evaluate(&donor, &request_at("r", Some("a+"), 1.0)).is_none());
        assert!(filter.evaluate(&donor, &request_at("r", None, 1.0)).is_none());
    }

    #[test]
    fn test_acceptance_overrides_match_and_distance() {
        let filter = EligibilityFilter::default();
        let donor = donor();
        let mut request = request_at("r", Some("O-"), 4000.0);
        request.accepted_donors.push(donor.id.clone());

        let matched = filter.evaluate(&donor, &request).unwrap();
        assert!(matched.accepted);
        assert!(matched.distance_km > 3000.0);
    }

    #[test]
    fn test_other_donor_acceptance_does_not_grant_visibility() {
        let filter = EligibilityFilter::default();
        let mut request = request_at("r", Some("O-"), 1.0);
        request.accepted_donors.push("D-999".to_string());

        assert!(filter.evaluate(&donor(), &request).is_none());
    }

    #[test]
    fn test_filter_is_stable_and_annotated() {
        let filter = EligibilityFilter::default();
        let requests = vec![
            request_at("c", Some("A+"), 8.0),
            request_at("x", Some("B-"), 1.0),
            request_at("a", Some("A+"), 2.0),
            request_at("b", Some("A+"), 20.0),
        ];

        let matches = filter.filter(&donor(), &requests);
        let ids: Vec<_> = matches.iter().map(|m| m.request.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert!((matches[0].distance_km - 8.0).abs() < 1e-6);
        assert_eq!(matches[1].distance_display(), "2.0");
        assert_eq!(requests.len(), 4);
    }

    #[test]
    fn test_default_hospital_distance() {
        let mut request = request_at("r", Some("A+"), 0.0);
        request.hospital = DEFAULT_HOSPITAL;

        let matched = EligibilityFilter::default().evaluate(&donor(), &request).unwrap();
        assert_eq!(matched.distance_display(), "1.0");
    }

    #[test]
    fn test_nan_distance_is_not_visible_unless_accepted() {
        let filter = EligibilityFilter::default();
        let donor = donor();
        let mut request = request_at("r", Some("A+"), 1.0);
        request.hospital = Coordinate::new(f64::NAN, 77.0);

        assert!(filter.evaluate(&donor, &request).is_none());

        request.accepted_donors.push(donor.id.clone());
        assert!(filter.evaluate(&donor, &request).is_some());
    }
}
