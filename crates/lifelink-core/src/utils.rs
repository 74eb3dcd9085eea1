//! 通用工具函数

/// 地球平均半径（公里）
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// 计算两点之间的大圆距离（公里），使用半正矢公式
///
/// 输入为十进制度数，不做范围校验；NaN 会沿计算自然传播。
pub fn distance_km(origin_lat: f64, origin_lng: f64, dest_lat: f64, dest_lng: f64) -> f64 {
    let to_rad = std::f64::consts::PI / 180.0;
    let d_lat = (dest_lat - origin_lat) * to_rad;
    let d_lng = (dest_lng - origin_lng) * to_rad;

    let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
        + (origin_lat * to_rad).cos()
            * (dest_lat * to_rad).cos()
            * (d_lng / 2.0).sin()
            * (d_lng / 2.0).sin();

    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// 按一位小数格式化距离，用于展示
pub fn format_distance(km: f64) -> String {
    format!("{:.1}", km)
}
