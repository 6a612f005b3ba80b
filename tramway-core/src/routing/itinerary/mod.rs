//! Presentation of planned itineraries.

mod to_geojson;
