//! Display categories for classifier output.

use std::fmt;

use serde::{Serialize, Serializer};

use super::model::ClassId;

/// Air-quality category shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityLabel {
    Good,
    Moderate,
    Poor,
    /// Class id the label table does not cover.
    Unknown,
}

impl QualityLabel {
    /// Labels the classifier is expected to produce.
    pub const MAPPED: [(ClassId, QualityLabel); 3] = [
        (ClassId(0), QualityLabel::Good),
        (ClassId(1), QualityLabel::Moderate),
        (ClassId(2), QualityLabel::Poor),
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::Unknown => "Unknown",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Good => "✅",
            Self::Moderate => "⚠️",
            Self::Poor => "🔥",
            Self::Unknown => "❓",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Good => "green",
            Self::Moderate => "orange",
            Self::Poor => "red",
            Self::Unknown => "gray",
        }
    }

    /// `(name, icon, color)` triple.
    pub fn parts(&self) -> (&'static str, &'static str, &'static str) {
        (self.name(), self.icon(), self.color())
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.icon(), self.name())
    }
}

impl Serialize for QualityLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("QualityLabel", 3)?;
        state.serialize_field("name", self.name())?;
        state.serialize_field("icon", self.icon())?;
        state.serialize_field("color", self.color())?;
        state.end()
    }
}

/// Maps a class id to its display label. Ids outside the table resolve to
/// [`QualityLabel::Unknown`]; this never fails.
pub fn resolve(class_id: ClassId) -> QualityLabel {
    match class_id.0 {
        0 => QualityLabel::Good,
        1 => QualityLabel::Moderate,
        2 => QualityLabel::Poor,
        _ => QualityLabel::Unknown,
    }
}

/// Declared class ids that would fall back to [`QualityLabel::Unknown`].
pub fn unmapped(classes: &[i64]) -> Vec<i64> {
    classes
        .iter()
        .copied()
        .filter(|&id| resolve(ClassId(id)) == QualityLabel::Unknown)
        .collect()
}
