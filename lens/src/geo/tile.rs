use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A `z/x/y` tile. `x` and `y` are signed so that out-of-range addresses
/// produced from extreme coordinates stay representable; clamping is left
/// to callers through [`TileAddress::clamp_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileAddress {
    pub z: u32,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

/// Tile bounds in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BBox {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.west..=self.east).contains(&lon) && (self.south..=self.north).contains(&lat)
    }
}

impl TileAddress {
    pub const fn new(z: u32, x: i64, y: i64) -> Self {
        Self { z, x, y }
    }

    /// Largest valid `x`/`y` at this zoom.
    pub fn max_index(&self) -> i64 {
        if self.z >= 63 {
            i64::MAX
        } else {
            (1_i64 << self.z) - 1
        }
    }

    pub fn is_valid(&self) -> bool {
        let max = self.max_index();
        (0..=max).contains(&self.x) && (0..=max).contains(&self.y)
    }

    /// Clamps the zoom into `[min_z, max_z]`, then `x`/`y` into the valid
    /// range at the resulting zoom. The flag is `true` when anything moved.
    pub fn clamp_to(self, min_z: u32, max_z: u32) -> (Self, bool) {
        let z = self.z.clamp(min_z, max_z);
        let max = (1_i64 << z) - 1;
        let clamped = Self {
            z,
            x: self.x.clamp(0, max),
            y: self.y.clamp(0, max),
        };
        (clamped, clamped != self)
    }

    pub fn top_left(&self) -> LonLat {
        tile_top_left(self.z, self.x as f64, self.y as f64)
    }

    pub fn center(&self) -> LonLat {
        tile_center(self.z, self.x, self.y)
    }

    pub fn bbox(&self) -> BBox {
        tile_bbox(self.z, self.x, self.y)
    }
}

fn tiles_per_side(z: u32) -> f64 {
    2_f64.powi(z as i32)
}

/// Web-Mercator tile containing `(lon, lat)`. Inputs outside the projection
/// yield out-of-range indices rather than an error.
pub fn lon_lat_to_tile(lon: f64, lat: f64, z: u32) -> TileAddress {
    let n = tiles_per_side(z);
    let x = ((lon + 180.0) / 360.0 * n).floor();

    let lat_rad = lat.to_radians();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

    TileAddress {
        z,
        x: x as i64,
        y: y as i64,
    }
}

/// North-west corner of the tile. Fractional `x`/`y` address points inside it.
pub fn tile_top_left(z: u32, x: f64, y: f64) -> LonLat {
    let n = tiles_per_side(z);
    let lon = x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    LonLat { lon, lat }
}

pub fn tile_center(z: u32, x: i64, y: i64) -> LonLat {
    tile_top_left(z, x as f64 + 0.5, y as f64 + 0.5)
}

pub fn tile_bbox(z: u32, x: i64, y: i64) -> BBox {
    let north_west = tile_top_left(z, x as f64, y as f64);
    let south_east = tile_top_left(z, x as f64 + 1.0, y as f64 + 1.0);
    BBox {
        west: north_west.lon,
        south: south_east.lat,
        east: south_east.lon,
        north: north_west.lat,
    }
}

/// Wraps a longitude into `[-180, 180]`.
pub fn normalize_longitude(lon: f64) -> f64 {
    if !lon.is_finite() || (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // east of the antimeridian wraps onto 180, west of it onto -180
    if lon > 180.0 && wrapped <= -180.0 {
        180.0
    } else {
        wrapped
    }
}
