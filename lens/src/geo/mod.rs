//! Geometry helpers: XYZ web-map tiles, great-circle distance and the
//! averaged position of GeoJSON geometries.

mod centroid;
mod distance;
mod tile;

pub use centroid::average_coordinates;
pub use distance::{EARTH_RADIUS_KM, haversine_km};
pub use tile::{
    BBox, LonLat, TileAddress, lon_lat_to_tile, normalize_longitude, tile_bbox, tile_center,
    tile_top_left,
};
