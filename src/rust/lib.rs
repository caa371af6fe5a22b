//! Air-quality category inference from sensor and environmental readings.
//!
//! Nine readings are assembled into a fixed-order vector, robust-scaled with a
//! pre-fitted scaler, classified by a pre-fitted multi-class model and mapped
//! to a display label. Both fitted artifacts are produced offline and loaded
//! once at startup.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::collections::HashMap;
//! use airox::{ArtifactStore, PredictionContext};
//!
//! let context = PredictionContext::load(&ArtifactStore::new("artifacts"))?;
//!
//! let inputs: HashMap<String, f64> = [
//!     ("Temperature", 25.0),
//!     ("Humidity", 60.0),
//!     ("PM2.5", 50.0),
//!     ("PM10", 100.0),
//!     ("NO2", 25.0),
//!     ("SO2", 5.0),
//!     ("CO", 1.0),
//!     ("Proximity_to_Industrial_Areas", 2.5),
//!     ("Population_Density", 5000.0),
//! ]
//! .into_iter()
//! .map(|(name, value)| (name.to_string(), value))
//! .collect();
//!
//! let prediction = context.predict(&inputs)?;
//! println!("{}", prediction.label);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! [`PredictionContext`] is immutable and `Send + Sync`; clone it (or wrap it
//! in `Arc`) to share the loaded artifacts between request handlers.

pub mod artifacts;
pub mod config;
pub mod pipeline;
#[cfg(feature = "onnx")]
mod runtime;

pub use artifacts::ArtifactStore;
pub use config::Config;
pub use pipeline::{
    build, classify, resolve, scale, ArtifactError, ClassId, Classifier, ContextInfo, Feature,
    FeatureVector, PipelineError, Prediction, PredictionContext, PredictionService,
    QualityLabel, RobustScaler, ScaledVector, FEATURE_COUNT,
};
#[cfg(feature = "onnx")]
pub use runtime::{create_session_builder, RuntimeConfig};

/// Installs `env_logger` with a `warn` default filter, overridable through
/// `RUST_LOG`. Later calls are no-ops.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}
