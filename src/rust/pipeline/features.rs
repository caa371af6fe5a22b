use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use serde::Serialize;

use super::error::PipelineError;

/// Number of inputs the fitted artifacts expect.
pub const FEATURE_COUNT: usize = 9;

/// One of the recognised sensor or environmental readings.
///
/// The declaration order is the column order the scaler and classifier were
/// fitted with. Reordering the variants silently corrupts every prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Temperature,
    Humidity,
    Pm25,
    Pm10,
    No2,
    So2,
    Co,
    ProximityToIndustrialAreas,
    PopulationDensity,
}

impl Feature {
    /// All features in fitting order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Temperature,
        Feature::Humidity,
        Feature::Pm25,
        Feature::Pm10,
        Feature::No2,
        Feature::So2,
        Feature::Co,
        Feature::ProximityToIndustrialAreas,
        Feature::PopulationDensity,
    ];

    /// Column name used by the training data and by input mappings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Pm25 => "PM2.5",
            Self::Pm10 => "PM10",
            Self::No2 => "NO2",
            Self::So2 => "SO2",
            Self::Co => "CO",
            Self::ProximityToIndustrialAreas => "Proximity_to_Industrial_Areas",
            Self::PopulationDensity => "Population_Density",
        }
    }

    /// Human readable label for forms and listings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Pm25 => "PM2.5",
            Self::Pm10 => "PM10",
            Self::No2 => "NO₂",
            Self::So2 => "SO₂",
            Self::Co => "CO",
            Self::ProximityToIndustrialAreas => "Proximity to Industrial Areas",
            Self::PopulationDensity => "Population Density",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity => "%",
            Self::Pm25 | Self::Pm10 => "µg/m³",
            Self::No2 | Self::So2 => "ppb",
            Self::Co => "ppm",
            Self::ProximityToIndustrialAreas => "km",
            Self::PopulationDensity => "people/km²",
        }
    }

    /// Inclusive bounds accepted by the input surface.
    ///
    /// The builder never enforces these; see [`Feature::check_range`].
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::Temperature => (0.0, 60.0),
            Self::Humidity => (0.0, 100.0),
            Self::Pm25 => (0.0, 500.0),
            Self::Pm10 => (0.0, 600.0),
            Self::No2 => (0.0, 100.0),
            Self::So2 => (0.0, 50.0),
            Self::Co => (0.0, 10.0),
            Self::ProximityToIndustrialAreas => (0.0, 30.0),
            Self::PopulationDensity => (100.0, 20000.0),
        }
    }

    /// Starting value of the reading form.
    pub fn default_value(&self) -> f64 {
        match self {
            Self::Temperature => 25.0,
            Self::Humidity => 60.0,
            Self::Pm25 => 50.0,
            Self::Pm10 => 100.0,
            Self::No2 => 25.0,
            Self::So2 => 5.0,
            Self::Co => 1.0,
            Self::ProximityToIndustrialAreas => 2.5,
            Self::PopulationDensity => 5000.0,
        }
    }

    /// Input granularity of the reading form.
    pub fn step(&self) -> f64 {
        match self {
            Self::Co => 0.01,
            Self::PopulationDensity => 100.0,
            _ => 0.1,
        }
    }

    /// Position of this feature in the fitted column order.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Validates a value against [`Feature::range`].
    ///
    /// Meant for input surfaces. Non-finite values are always rejected.
    pub fn check_range(&self, value: f64) -> Result<f64, PipelineError> {
        let (min, max) = self.range();
        if value.is_finite() && value >= min && value <= max {
            Ok(value)
        } else {
            Err(PipelineError::OutOfRange {
                field: self.name(),
                value,
                min,
                max,
            })
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|feature| feature.name() == s)
            .ok_or_else(|| PipelineError::UnknownField(s.to_string()))
    }
}

/// Canonical column names in fitting order.
pub fn feature_names() -> [&'static str; FEATURE_COUNT] {
    Feature::ALL.map(|feature| feature.name())
}

/// Raw readings in fitting order, ready for scaling.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "Vec<f64>")]
pub struct FeatureVector(Array1<f64>);

impl FeatureVector {
    /// Wraps values without checking their count.
    ///
    /// Vectors built this way may not match the fitted artifacts; the scaling
    /// stage rejects them with [`PipelineError::Scaling`].
    pub fn from_raw(values: Vec<f64>) -> Self {
        Self(Array1::from_vec(values))
    }

    /// The reading form's starting values.
    pub fn defaults() -> Self {
        Self(Feature::ALL.iter().map(Feature::default_value).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.0.get(feature.index()).copied()
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(vector: FeatureVector) -> Self {
        vector.0.to_vec()
    }
}

/// Assembles a [`FeatureVector`] from named readings.
///
/// `inputs` must name exactly the recognised features. Values pass through
/// unchanged: range checks belong to whatever collected them.
pub fn build(inputs: &HashMap<String, f64>) -> Result<FeatureVector, PipelineError> {
    let mut unknown: Vec<&str> = inputs
        .keys()
        .map(String::as_str)
        .filter(|name| name.parse::<Feature>().is_err())
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(PipelineError::UnknownField(unknown[0].to_string()));
    }

    let mut values = Vec::with_capacity(FEATURE_COUNT);
    for feature in Feature::ALL {
        let value = inputs
            .get(feature.name())
            .ok_or(PipelineError::MissingField(feature.name()))?;
        values.push(*value);
    }

    Ok(FeatureVector::from_raw(values))
}
