use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use airox::{ArtifactStore, Config, Feature, PredictionContext};
use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use log::info;

mod display;

#[derive(Parser)]
#[command(author, version, about = "Predict the air-quality category from sensor readings", long_about = None)]
struct Args {
    /// Directory holding the fitted scaler and classifier
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Scaler file name inside the artifacts directory
    #[arg(long, global = true)]
    scaler: Option<String>,

    /// Classifier file name inside the artifacts directory
    #[arg(long, global = true)]
    classifier: Option<String>,

    /// Do not check artifacts against manifest.json
    #[arg(long, global = true)]
    skip_verify: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one set of readings
    Predict(PredictArgs),
    /// Describe the loaded artifacts
    Info {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List recognised input fields with units, ranges and defaults
    Fields,
}

#[derive(ClapArgs)]
struct PredictArgs {
    /// Temperature (°C)
    #[arg(long, default_value_t = 25.0, value_parser = reading::<0>)]
    temperature: f64,
    /// Humidity (%)
    #[arg(long, default_value_t = 60.0, value_parser = reading::<1>)]
    humidity: f64,
    /// PM2.5 (µg/m³)
    #[arg(long, default_value_t = 50.0, value_parser = reading::<2>)]
    pm25: f64,
    /// PM10 (µg/m³)
    #[arg(long, default_value_t = 100.0, value_parser = reading::<3>)]
    pm10: f64,
    /// NO₂ (ppb)
    #[arg(long, default_value_t = 25.0, value_parser = reading::<4>)]
    no2: f64,
    /// SO₂ (ppb)
    #[arg(long, default_value_t = 5.0, value_parser = reading::<5>)]
    so2: f64,
    /// CO (ppm)
    #[arg(long, default_value_t = 1.0, value_parser = reading::<6>)]
    co: f64,
    /// Proximity to industrial areas (km)
    #[arg(long, default_value_t = 2.5, value_parser = reading::<7>)]
    proximity: f64,
    /// Population density (people/km²)
    #[arg(long, default_value_t = 5000.0, value_parser = reading::<8>)]
    population_density: f64,

    /// JSON object mapping field names to values; replaces the flags above
    #[arg(long)]
    input: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl PredictArgs {
    fn readings(&self) -> HashMap<String, f64> {
        let values = [
            self.temperature,
            self.humidity,
            self.pm25,
            self.pm10,
            self.no2,
            self.so2,
            self.co,
            self.proximity,
            self.population_density,
        ];
        Feature::ALL
            .iter()
            .zip(values)
            .map(|(feature, value)| (feature.name().to_string(), value))
            .collect()
    }
}

/// Parses a flag value and holds it to the field's accepted range.
fn reading<const INDEX: usize>(raw: &str) -> Result<f64, String> {
    let feature = Feature::ALL[INDEX];
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    feature.check_range(value).map_err(|e| e.to_string())
}

/// Reads an input file and range-checks every recognised field in it.
///
/// Unrecognised names are left for the pipeline to reject.
fn read_input_file(path: &Path) -> anyhow::Result<HashMap<String, f64>> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let readings: HashMap<String, f64> = serde_json::from_slice(&bytes)
        .with_context(|| format!("{} is not a JSON object of numbers", path.display()))?;
    for (name, value) in &readings {
        if let Ok(feature) = name.parse::<Feature>() {
            feature.check_range(*value)?;
        }
    }
    Ok(readings)
}

fn load_context(args: &Args) -> anyhow::Result<PredictionContext> {
    let mut config = Config::default().with_verify_manifest(!args.skip_verify);
    if let Some(dir) = &args.artifacts {
        config = config.with_artifacts_dir(dir);
    }
    if let Some(name) = &args.scaler {
        config = config.with_scaler_file(name);
    }
    if let Some(name) = &args.classifier {
        config = config.with_classifier_file(name);
    }

    let store = ArtifactStore::from_config(&config);
    PredictionContext::load(&store).with_context(|| {
        format!(
            "FATAL: model or scaler could not be loaded; ensure {} and {} exist",
            store.scaler_path().display(),
            store.classifier_path().display()
        )
    })
}

fn main() -> anyhow::Result<()> {
    airox::init_logger();
    let args = Args::parse();

    match &args.command {
        Command::Fields => {
            print!("{}", display::render_fields());
        }
        Command::Info { json } => {
            let context = load_context(&args)?;
            let info = context.info();
            if *json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print!("{}", display::render_info(&info));
            }
        }
        Command::Predict(predict) => {
            let context = load_context(&args)?;
            let readings = match &predict.input {
                Some(path) => read_input_file(path)?,
                None => predict.readings(),
            };
            info!("Calculating prediction...");
            let prediction = context.predict(&readings)?;
            if predict.json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                print!("{}", display::render_prediction(&prediction));
            }
        }
    }

    Ok(())
}
