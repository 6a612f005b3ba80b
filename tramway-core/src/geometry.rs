//! Coordinate helpers: distances between coordinates and conversions between
//! latitude/longitude and the 31-bit tile space used by the map data.

use std::f64::consts::PI;

use geo::{Distance, Haversine, Point};

const MAX_LATITUDE: f64 = 85.0511;
const TILE_31_SIZE: f64 = (1_u64 << 31) as f64;

/// Distance in meters between two coordinates.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Haversine.distance(Point::new(lon1, lat1), Point::new(lon2, lat2))
}

/// Distance in meters between two points (x = longitude, y = latitude).
pub fn point_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    Haversine.distance(a, b)
}

fn check_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        return longitude;
    }
    let mut lon = longitude;
    while lon <= -180.0 {
        lon += 360.0;
    }
    while lon > 180.0 {
        lon -= 360.0;
    }
    lon
}

fn check_latitude(latitude: f64) -> f64 {
    latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE)
}

fn mercator(latitude: f64) -> f64 {
    let rad = latitude.to_radians();
    let eval = (rad.tan() + 1.0 / rad.cos()).ln();
    if eval.is_finite() {
        eval
    } else {
        let lat = if latitude < 0.0 { -89.9_f64 } else { 89.9_f64 }.to_radians();
        (lat.tan() + 1.0 / lat.cos()).ln()
    }
}

/// Number of tiles along one axis at the given zoom.
pub fn pow_zoom(zoom: f64) -> f64 {
    2_f64.powf(zoom)
}

#[allow(clippy::cast_possible_truncation)]
pub fn get_31_tile_number_x(longitude: f64) -> i32 {
    let lon = check_longitude(longitude);
    let x = (lon + 180.0) / 360.0 * TILE_31_SIZE;
    x.min(TILE_31_SIZE - 1.0) as i32
}

#[allow(clippy::cast_possible_truncation)]
pub fn get_31_tile_number_y(latitude: f64) -> i32 {
    let lat = check_latitude(latitude);
    let y = (1.0 - mercator(lat) / PI) / 2.0 * TILE_31_SIZE;
    y.clamp(0.0, TILE_31_SIZE - 1.0) as i32
}

pub fn get_longitude_from_tile(zoom: f64, x: f64) -> f64 {
    x / pow_zoom(zoom) * 360.0 - 180.0
}

pub fn get_latitude_from_tile(zoom: f64, y: f64) -> f64 {
    let n = PI - 2.0 * PI * y / pow_zoom(zoom);
    n.sinh().atan().to_degrees()
}

pub fn get_31_longitude_x(x31: i32) -> f64 {
    get_longitude_from_tile(31.0, f64::from(x31))
}

pub fn get_31_latitude_y(y31: i32) -> f64 {
    get_latitude_from_tile(31.0, f64::from(y31))
}

/// Width in meters of one tile at `zoom`, measured at latitude 30.
pub fn tile_distance_width(zoom: f64) -> f64 {
    let lat = 30.0;
    distance(
        lat,
        get_longitude_from_tile(zoom, 0.0),
        lat,
        get_longitude_from_tile(zoom, 1.0),
    )
}
