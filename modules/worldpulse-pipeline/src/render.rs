use serde::Serialize;
use worldpulse_common::{FeatureRef, GeometryLabel, SentimentBand, WorldAtlas};

use crate::index::IndexSnapshot;

const HIGHLIGHT_CAP: &str = "rgba(0, 255, 255, 0.9)";
const HIGHLIGHT_SIDE: &str = "rgba(0, 255, 255, 0.35)";
const DEFAULT_SIDE: &str = "rgba(0,0,0,0.2)";
const HIGHLIGHT_ALTITUDE: f64 = 0.08;
const DEFAULT_ALTITUDE: f64 = 0.01;

/// What the globe needs to draw one country polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolygonStyle {
    pub feature: FeatureRef,
    pub label: GeometryLabel,
    pub band: SentimentBand,
    pub cap_color: &'static str,
    pub side_color: &'static str,
    pub altitude: f64,
}

/// Project every feature of `atlas` against the current results. Features are
/// matched to records by resolved key only; unmatched features render neutral.
pub fn project(
    atlas: &WorldAtlas,
    snapshot: &IndexSnapshot,
    highlighted: Option<FeatureRef>,
) -> Vec<PolygonStyle> {
    atlas
        .features()
        .map(|(feature, country)| {
            let band = SentimentBand::from_score(snapshot.score(&country.key));
            let is_highlighted = highlighted == Some(feature);
            let (cap_color, side_color, altitude) = if is_highlighted {
                (HIGHLIGHT_CAP, HIGHLIGHT_SIDE, HIGHLIGHT_ALTITUDE)
            } else {
                (band.color(), DEFAULT_SIDE, DEFAULT_ALTITUDE)
            };
            PolygonStyle {
                feature,
                label: country.label.clone(),
                band,
                cap_color,
                side_color,
                altitude,
            }
        })
        .collect()
}
