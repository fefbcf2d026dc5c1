//! The set of country features currently on the globe, plus the free-text
//! "fly to country" lookup over it.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::aliases::{fold, resolve};
use crate::error::{Result, WorldPulseError};
use crate::types::{CountryKey, GeometryLabel};

/// Properties checked, in order, for a feature's display name.
const LABEL_PROPERTIES: [&str; 6] = ["name", "ADMIN", "NAME", "NAME_LONG", "formal_en", "sovereignt"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Handle to a feature in a [`WorldAtlas`]. Only the atlas hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FeatureRef(usize);

impl FeatureRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct CountryFeature {
    pub label: GeometryLabel,
    /// `label` resolved through the alias table.
    pub key: CountryKey,
    pub centroid: LatLng,
    pub geometry: Value,
}

impl CountryFeature {
    pub fn new(label: GeometryLabel, geometry: Value) -> Self {
        let key = resolve(&label);
        let centroid = centroid(&geometry);
        Self {
            label,
            key,
            centroid,
            geometry,
        }
    }

    /// Build from one GeoJSON `Feature` object.
    pub fn from_geojson(feature: &Value) -> Self {
        let props = feature.get("properties");
        let label = LABEL_PROPERTIES
            .iter()
            .filter_map(|prop| props.and_then(|p| p.get(*prop)).and_then(Value::as_str))
            .find(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| match feature.get("id") {
                Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "Unknown".to_string());

        let geometry = feature.get("geometry").cloned().unwrap_or(Value::Null);
        Self::new(GeometryLabel::new(label), geometry)
    }
}

/// Mean of every ring vertex of a `Polygon` or `MultiPolygon`. Origin when the
/// geometry carries no usable coordinates.
fn centroid(geometry: &Value) -> LatLng {
    let coords = geometry.get("coordinates");
    let polygons: Vec<&Value> = match geometry.get("type").and_then(Value::as_str) {
        Some("Polygon") => coords.into_iter().collect(),
        Some("MultiPolygon") => coords
            .and_then(Value::as_array)
            .map(|polys| polys.iter().collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    let (mut sum_lat, mut sum_lng, mut count) = (0.0, 0.0, 0usize);
    let rings = polygons.into_iter().filter_map(Value::as_array).flatten();
    for point in rings.filter_map(Value::as_array).flatten() {
        if let Some([lng, lat, ..]) = point.as_array().map(Vec::as_slice) {
            if let (Some(lng), Some(lat)) = (lng.as_f64(), lat.as_f64()) {
                if lat.is_finite() && lng.is_finite() {
                    sum_lat += lat;
                    sum_lng += lng;
                    count += 1;
                }
            }
        }
    }

    if count == 0 {
        return LatLng::default();
    }
    LatLng {
        lat: sum_lat / count as f64,
        lng: sum_lng / count as f64,
    }
}

/// Loaded country features with a case-insensitive name index.
#[derive(Debug, Clone, Default)]
pub struct WorldAtlas {
    features: Vec<CountryFeature>,
    by_name: HashMap<String, usize>,
}

impl WorldAtlas {
    pub fn new(features: Vec<CountryFeature>) -> Self {
        let mut by_name = HashMap::with_capacity(features.len() * 2);
        // Later features win on collisions.
        for (idx, feature) in features.iter().enumerate() {
            by_name.insert(fold(feature.label.as_str()), idx);
            by_name.insert(fold(feature.key.as_str()), idx);
        }
        Self { features, by_name }
    }

    /// Parse a GeoJSON `FeatureCollection`.
    pub fn from_geojson(collection: &Value) -> Result<Self> {
        let features = collection
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                WorldPulseError::Validation("GeoJSON has no `features` array".to_string())
            })?;
        Ok(Self::new(
            features.iter().map(CountryFeature::from_geojson).collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature(&self, feature: FeatureRef) -> Option<&CountryFeature> {
        self.features.get(feature.0)
    }

    pub fn features(&self) -> impl Iterator<Item = (FeatureRef, &CountryFeature)> {
        self.features
            .iter()
            .enumerate()
            .map(|(idx, f)| (FeatureRef(idx), f))
    }

    /// Free-text lookup. Trims and lower-cases the query and matches it against
    /// every feature's label and resolved key, also lower-cased.
    pub fn find(&self, query: &str) -> Option<FeatureRef> {
        let folded = fold(query);
        if folded.is_empty() {
            return None;
        }
        self.by_name.get(&folded).copied().map(FeatureRef)
    }

    /// Sorted, de-duplicated resolved keys: suggestions for the fly-to input.
    pub fn suggestions(&self) -> Vec<CountryKey> {
        self.features
            .iter()
            .map(|f| f.key.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Resolved keys in feature order, de-duplicated, capped at `limit`. Used
    /// when the backend cannot list its own keys.
    pub fn fallback_keys(&self, limit: usize) -> Vec<CountryKey> {
        let mut seen = BTreeSet::new();
        self.features
            .iter()
            .filter(|f| seen.insert(f.key.clone()))
            .map(|f| f.key.clone())
            .take(limit)
            .collect()
    }
}
