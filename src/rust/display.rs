//! Plain-text rendering for the command line.

use airox::{ContextInfo, Feature, Prediction};

const TITLE: &str = "💨 AIROX";

fn format_value(feature: Feature, value: f64) -> String {
    if feature.step() >= 1.0 {
        format!("{:.0}", value)
    } else if feature.step() < 0.1 {
        format!("{:.2}", value)
    } else {
        format!("{:.1}", value)
    }
}

pub fn render_prediction(prediction: &Prediction) -> String {
    let mut out = String::new();
    out.push_str(TITLE);
    out.push_str("\n\nInputs\n");
    for feature in Feature::ALL {
        if let Some(value) = prediction.features.get(feature) {
            out.push_str(&format!(
                "  {:<32} {:>10} {}\n",
                feature.label(),
                format_value(feature, value),
                feature.unit()
            ));
        }
    }
    out.push_str("\nPrediction Result\n");
    out.push_str(&format!(
        "  The Predicted Air Quality is: {} ({}, class {})\n",
        prediction.label,
        prediction.label.color(),
        prediction.class_id
    ));
    out
}

pub fn render_info(info: &ContextInfo) -> String {
    let mut out = String::new();
    out.push_str(&format!("Classifier:   {}\n", info.classifier_kind));
    out.push_str(&format!("Features:     {}\n", info.n_features));
    if info.classes.is_empty() {
        out.push_str("Classes:      (not declared by the artifact)\n");
    } else {
        out.push_str(&format!("Classes:      {:?}\n", info.classes));
    }
    if !info.unmapped_classes.is_empty() {
        out.push_str(&format!(
            "Unlabelled:   {:?} (shown as Unknown)\n",
            info.unmapped_classes
        ));
    }
    if let Some(path) = &info.scaler_path {
        out.push_str(&format!("Scaler:       {}\n", path.display()));
    }
    if let Some(path) = &info.classifier_path {
        out.push_str(&format!("Model:        {}\n", path.display()));
    }
    out
}

pub fn render_fields() -> String {
    let mut out = format!(
        "{:<32} {:<12} {:>8} {:>8} {:>8}  {}\n",
        "FIELD", "UNIT", "MIN", "MAX", "DEFAULT", "FLAG"
    );
    for feature in Feature::ALL {
        let (min, max) = feature.range();
        out.push_str(&format!(
            "{:<32} {:<12} {:>8} {:>8} {:>8}  --{}\n",
            feature.name(),
            feature.unit(),
            format_value(feature, min),
            format_value(feature, max),
            format_value(feature, feature.default_value()),
            flag_name(feature)
        ));
    }
    out
}

/// Command-line flag for each reading.
pub fn flag_name(feature: Feature) -> &'static str {
    match feature {
        Feature::Temperature => "temperature",
        Feature::Humidity => "humidity",
        Feature::Pm25 => "pm25",
        Feature::Pm10 => "pm10",
        Feature::No2 => "no2",
        Feature::So2 => "so2",
        Feature::Co => "co",
        Feature::ProximityToIndustrialAreas => "proximity",
        Feature::PopulationDensity => "population-density",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Feature::Co, 1.0), "1.00");
        assert_eq!(format_value(Feature::PopulationDensity, 5000.0), "5000");
        assert_eq!(format_value(Feature::Humidity, 60.0), "60.0");
    }

    #[test]
    fn test_render_fields_lists_every_feature() {
        let table = render_fields();
        for feature in Feature::ALL {
            assert!(table.contains(feature.name()));
        }
        assert!(table.contains("--population-density"));
    }
}
