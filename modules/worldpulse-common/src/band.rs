use serde::Serialize;

/// Four-band colour policy for a country's sentiment score.
///
/// | score            | band     |
/// |------------------|----------|
/// | no record        | Neutral  |
/// | `< -0.5`         | Alarm    |
/// | `[-0.5, 0.0)`    | Warning  |
/// | `[0.0, 0.5)`     | Caution  |
/// | `>= 0.5`         | Positive |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentBand {
    Neutral,
    Alarm,
    Warning,
    Caution,
    Positive,
}

impl SentimentBand {
    /// Scores are clamped to `[-1, 1]`; a non-finite score counts as 0.
    pub fn from_score(score: Option<f64>) -> Self {
        let Some(score) = score else {
            return Self::Neutral;
        };
        let s = if score.is_finite() {
            score.clamp(-1.0, 1.0)
        } else {
            0.0
        };

        if s < -0.5 {
            Self::Alarm
        } else if s < 0.0 {
            Self::Warning
        } else if s < 0.5 {
            Self::Caution
        } else {
            Self::Positive
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Neutral => "rgba(56, 189, 248, 0.15)",
            Self::Alarm => "#FF3131",
            Self::Warning => "#FFA500",
            Self::Caution => "#FFFF00",
            Self::Positive => "#39FF14",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Alarm => "alarm",
            Self::Warning => "warning",
            Self::Caution => "caution",
            Self::Positive => "positive",
        }
    }
}
