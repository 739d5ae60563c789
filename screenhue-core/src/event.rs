//! Color events published to subscribers

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, ScreenhueError};
use crate::reduce::{Algorithm, AlgorithmResults};
use crate::types::Color;

/// The colors computed from one frame
///
/// Immutable once built. The primary color is looked up from the results
/// at construction, so an event can never exist without one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorEvent {
    time: DateTime<Utc>,
    algorithm_results: AlgorithmResults,
    color: Color,
    #[serde(skip)]
    primary: Algorithm,
}

impl ColorEvent {
    /// Build an event, selecting `primary` as the representative color
    pub fn new(algorithm_results: AlgorithmResults, primary: Algorithm) -> Result<Self> {
        let color = *algorithm_results.get(&primary).ok_or_else(|| {
            ScreenhueError::config(format!(
                "Primary algorithm '{}' missing from results",
                primary
            ))
        })?;

        Ok(Self {
            time: Utc::now(),
            algorithm_results,
            color,
            primary,
        })
    }

    /// Representative color
    pub fn color(&self) -> Color {
        self.color
    }

    /// Algorithm that produced [`Self::color`]
    pub fn primary(&self) -> Algorithm {
        self.primary
    }

    /// Result for a specific algorithm, if it ran
    pub fn get(&self, algorithm: Algorithm) -> Option<Color> {
        self.algorithm_results.get(&algorithm).copied()
    }

    pub fn algorithm_results(&self) -> &AlgorithmResults {
        &self.algorithm_results
    }

    /// When the event was built
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// JSON form used by the stream transports
    pub fn to_json(&self) -> String {
        // Plain maps and strings only; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl std::fmt::Display for ColorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.color, self.primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_primary_fails() {
        let mut results = AlgorithmResults::new();
        results.insert(Algorithm::AverageRgb, Color::new(1, 2, 3));

        let err = ColorEvent::new(results, Algorithm::SquaredAverageRgb).unwrap_err();
        assert!(matches!(err, ScreenhueError::Config(_)));
        assert!(err.to_string().contains("squaredAvgRgb"));
    }

    #[test]
    fn test_primary_selected() {
        let mut results = AlgorithmResults::new();
        results.insert(Algorithm::AverageRgb, Color::new(1, 2, 3));
        results.insert(Algorithm::SquaredAverageRgb, Color::new(4, 5, 6));

        let event = ColorEvent::new(results, Algorithm::SquaredAverageRgb).unwrap();
        assert_eq!(event.color(), Color::new(4, 5, 6));
        assert_eq!(event.get(Algorithm::AverageRgb), Some(Color::new(1, 2, 3)));
        assert_eq!(event.get(Algorithm::AverageHue), None);
    }

    #[test]
    fn test_json_shape() {
        let mut results = AlgorithmResults::new();
        results.insert(Algorithm::SquaredAverageRgb, Color::new(10, 20, 30));
        let event = ColorEvent::new(results, Algorithm::SquaredAverageRgb).unwrap();

        let json: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(json["color"]["hexTriplet"], "#0a141e");
        assert_eq!(
            json["algorithmResults"]["squaredAvgRgb"]["hexTriplet"],
            "#0a141e"
        );
        assert!(json["time"].is_string());
        assert!(json.get("primary").is_none());
    }
}
