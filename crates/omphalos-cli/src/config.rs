//! Layered configuration for the `omphalos` binary.
//!
//! Resolution order (highest priority first):
//! 1. CLI flags (applied via [`OmphalosConfig::apply_cli_overrides`])
//! 2. Environment variables (`OMPHALOS_DATA_DIR`, `OMPHALOS_WEIGHTS`)
//! 3. `omphalos.toml` in the working directory, or the file given by `--config`
//! 4. Compiled defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use omphalos_logic::export::DEFAULT_PRECISION;
use omphalos_logic::features::GeometryReference;
use omphalos_logic::geometry::{COLINEAR_EPSILON, DEFAULT_ANGLE_TOLERANCE_DEG, DISTANCE_EPSILON};
use omphalos_logic::pipeline::PipelineConfig;
use omphalos_logic::records::Position;
use omphalos_logic::scoring::Weights;

pub const CONFIG_FILE_NAME: &str = "omphalos.toml";
pub const ENV_DATA_DIR: &str = "OMPHALOS_DATA_DIR";
pub const ENV_WEIGHTS: &str = "OMPHALOS_WEIGHTS";

/// Highest accepted `scoring.precision`.
pub const MAX_PRECISION: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Invalid value for {field}: {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Config file not found: {path}")]
    FileNotFound { path: String },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// ── Sections ───────────────────────────────────────────────────────────

/// Input and output locations. File names resolve against `data_dir`
/// unless they are absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub systems_csv: PathBuf,
    pub lore_json: PathBuf,
    pub anomalies_jsonl: PathBuf,
    pub jumps_jsonl: PathBuf,
    pub scores_json: PathBuf,
    pub viz_json: PathBuf,
    /// Second, independent dataset exported as the `guardian` layer.
    pub guardian_csv: PathBuf,
    pub guardian_viz_json: PathBuf,
    /// Directory of plain-text lore samples for the `lore` command.
    pub lore_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            systems_csv: PathBuf::from("omphalos_systems.csv"),
            lore_json: PathBuf::from("lore_connections.json"),
            anomalies_jsonl: PathBuf::from("anomalies.jsonl"),
            jumps_jsonl: PathBuf::from("witchspace_jumps.jsonl"),
            scores_json: PathBuf::from("rli_scores.json"),
            viz_json: PathBuf::from("omphalos_map.json"),
            guardian_csv: PathBuf::from("guardian_systems.csv"),
            guardian_viz_json: PathBuf::from("guardian_map.json"),
            lore_dir: PathBuf::from("lore_samples"),
        }
    }
}

impl PathsConfig {
    pub fn resolve(&self, file: &Path) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn systems(&self) -> PathBuf {
        self.resolve(&self.systems_csv)
    }

    pub fn lore(&self) -> PathBuf {
        self.resolve(&self.lore_json)
    }

    pub fn anomalies(&self) -> PathBuf {
        self.resolve(&self.anomalies_jsonl)
    }

    pub fn jumps(&self) -> PathBuf {
        self.resolve(&self.jumps_jsonl)
    }

    pub fn scores(&self) -> PathBuf {
        self.resolve(&self.scores_json)
    }

    pub fn viz(&self) -> PathBuf {
        self.resolve(&self.viz_json)
    }

    pub fn guardian(&self) -> PathBuf {
        self.resolve(&self.guardian_csv)
    }

    pub fn guardian_viz(&self) -> PathBuf {
        self.resolve(&self.guardian_viz_json)
    }

    /// A lore sample by file name, relative to `lore_dir`.
    pub fn lore_sample(&self, file: &Path) -> PathBuf {
        self.resolve(&self.lore_dir).join(file)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightsConfig {
    pub geometry: f64,
    pub lore: f64,
    pub anomaly: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Weights::default().into()
    }
}

impl From<Weights> for WeightsConfig {
    fn from(w: Weights) -> Self {
        Self {
            geometry: w.geometry,
            lore: w.lore,
            anomaly: w.anomaly,
        }
    }
}

impl From<WeightsConfig> for Weights {
    fn from(w: WeightsConfig) -> Self {
        Weights::new(w.geometry, w.lore, w.anomaly)
    }
}

/// `reference = "centroid"` or `reference = [x, y, z]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceSetting {
    Named(String),
    Point([f64; 3]),
}

impl Default for ReferenceSetting {
    fn default() -> Self {
        Self::Named("centroid".to_string())
    }
}

impl ReferenceSetting {
    pub fn to_reference(&self) -> Result<GeometryReference, ConfigError> {
        match self {
            Self::Named(name) if name.eq_ignore_ascii_case("centroid") => {
                Ok(GeometryReference::Centroid)
            }
            Self::Named(name) => Err(ConfigError::invalid(
                "scoring.reference",
                format!("unknown reference {:?}; expected \"centroid\" or [x, y, z]", name),
            )),
            Self::Point(p) if p.iter().all(|v| v.is_finite()) => {
                Ok(GeometryReference::Point(Position::from(*p)))
            }
            Self::Point(_) => Err(ConfigError::invalid(
                "scoring.reference",
                "coordinates must be finite",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub reference: ReferenceSetting,
    /// Decimal places in exported scores.
    pub precision: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            reference: ReferenceSetting::default(),
            precision: DEFAULT_PRECISION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub distance_tolerance: f64,
    pub colinear_epsilon: f64,
    pub angle_tolerance_deg: f64,
    pub k_neighbors: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            distance_tolerance: DISTANCE_EPSILON,
            colinear_epsilon: COLINEAR_EPSILON,
            angle_tolerance_deg: DEFAULT_ANGLE_TOLERANCE_DEG,
            k_neighbors: 3,
        }
    }
}

// ── Top level ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OmphalosConfig {
    pub paths: PathsConfig,
    pub weights: WeightsConfig,
    pub scoring: ScoringConfig,
    pub geometry: GeometryConfig,
}

/// Values given on the command line that override every other layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub data_dir: Option<PathBuf>,
    pub weights: Option<Weights>,
}

impl OmphalosConfig {
    /// Resolve the full configuration.
    ///
    /// An explicit `config_path` must exist; otherwise `omphalos.toml` in
    /// `cwd` is read when present.
    pub fn load(
        config_path: Option<&Path>,
        cwd: &Path,
        cli: Option<&CliOverrides>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = cwd.join(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        if let Some(cli) = cli {
            config.apply_cli_overrides(cli);
        }
        config.validate()?;
        tracing::debug!(data_dir = %config.paths.data_dir.display(), "configuration resolved");
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Apply `OMPHALOS_*` variables read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.paths.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(raw) = lookup(ENV_WEIGHTS).filter(|v| !v.trim().is_empty()) {
            let weights = parse_weights(&raw).map_err(|e| match e {
                ConfigError::ValidationFailed { message, .. } => {
                    ConfigError::invalid(ENV_WEIGHTS, message)
                }
                other => other,
            })?;
            self.weights = weights.into();
        }
        Ok(())
    }

    pub fn apply_cli_overrides(&mut self, cli: &CliOverrides) {
        if let Some(dir) = &cli.data_dir {
            self.paths.data_dir = dir.clone();
        }
        if let Some(w) = cli.weights {
            self.weights = w.into();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Weights::from(self.weights)
            .validate()
            .map_err(|e| ConfigError::invalid("weights", e.to_string()))?;

        for (field, value) in [
            ("geometry.distance_tolerance", self.geometry.distance_tolerance),
            ("geometry.colinear_epsilon", self.geometry.colinear_epsilon),
            ("geometry.angle_tolerance_deg", self.geometry.angle_tolerance_deg),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::invalid(field, "must be greater than 0"));
            }
        }

        if self.scoring.precision > MAX_PRECISION {
            return Err(ConfigError::invalid(
                "scoring.precision",
                format!("must be at most {}", MAX_PRECISION),
            ));
        }
        self.scoring.reference.to_reference()?;
        Ok(())
    }

    /// Immutable settings for one scoring run.
    pub fn pipeline(&self) -> Result<PipelineConfig, ConfigError> {
        Ok(PipelineConfig {
            weights: self.weights.into(),
            reference: self.scoring.reference.to_reference()?,
        })
    }
}

/// Parse `"g,l,a"` into weights. Negative values are rejected here too.
pub fn parse_weights(raw: &str) -> Result<Weights, ConfigError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(ConfigError::invalid(
            "weights",
            format!("expected three comma-separated numbers, got {:?}", raw),
        ));
    }
    let mut values = [0.0f64; 3];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| ConfigError::invalid("weights", format!("{:?} is not a number", part)))?;
    }
    let weights = Weights::new(values[0], values[1], values[2]);
    weights
        .validate()
        .map_err(|e| ConfigError::invalid("weights", e.to_string()))?;
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = OmphalosConfig::default();
        assert_eq!(cfg.paths.systems(), PathBuf::from("data/omphalos_systems.csv"));
        assert_eq!(cfg.paths.viz(), PathBuf::from("data/omphalos_map.json"));
        assert_eq!(cfg.paths.guardian(), PathBuf::from("data/guardian_systems.csv"));
        assert_eq!(
            cfg.paths.lore_sample(Path::new("toast.txt")),
            PathBuf::from("data/lore_samples/toast.txt")
        );
        assert_eq!(Weights::from(cfg.weights), Weights::default());
        assert_eq!(cfg.scoring.precision, 4);
        assert_eq!(cfg.geometry.k_neighbors, 3);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.pipeline().unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = OmphalosConfig::from_toml(
            r#"
            [paths]
            guardian_csv = "/hunt/guardian_export.csv"

            [weights]
            lore = 0.4

            [scoring]
            reference = [0.0, 0.0, 0.0]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.weights.lore, 0.4);
        assert_eq!(cfg.weights.geometry, 1.0);
        assert_eq!(
            cfg.pipeline().unwrap().reference,
            GeometryReference::Point(Position::ORIGIN)
        );
        assert_eq!(cfg.geometry.distance_tolerance, DISTANCE_EPSILON);
        assert_eq!(cfg.paths.guardian(), PathBuf::from("/hunt/guardian_export.csv"));
        assert_eq!(cfg.paths.viz(), PathBuf::from("data/omphalos_map.json"));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = OmphalosConfig::from_toml("[weights\nlore = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let cfg = OmphalosConfig::from_toml("[weights]\nanomaly = -0.5").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { ref field, .. } if field == "weights"));
    }

    #[test]
    fn test_validate_rejects_zero_tolerance() {
        let cfg = OmphalosConfig::from_toml("[geometry]\ncolinear_epsilon = 0.0").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationFailed { ref field, .. } if field == "geometry.colinear_epsilon")
        );
    }

    #[test]
    fn test_validate_rejects_large_precision() {
        let cfg = OmphalosConfig::from_toml("[scoring]\nprecision = 11").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_unknown_reference_name() {
        let cfg = OmphalosConfig::from_toml("[scoring]\nreference = \"sol\"").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = OmphalosConfig::default();
        cfg.apply_env_overrides(|key| match key {
            ENV_DATA_DIR => Some("/srv/hunt".to_string()),
            ENV_WEIGHTS => Some("0.3, 0.4, 0.3".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.paths.data_dir, PathBuf::from("/srv/hunt"));
        assert_eq!(Weights::from(cfg.weights), Weights::new(0.3, 0.4, 0.3));
    }

    #[test]
    fn test_bad_env_weights_names_variable() {
        let mut cfg = OmphalosConfig::default();
        let err = cfg
            .apply_env_overrides(|key| (key == ENV_WEIGHTS).then(|| "1,2".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { ref field, .. } if field == ENV_WEIGHTS));
    }

    #[test]
    fn test_cli_beats_env() {
        let mut cfg = OmphalosConfig::default();
        cfg.apply_env_overrides(|key| (key == ENV_WEIGHTS).then(|| "2,2,2".to_string()))
            .unwrap();
        cfg.apply_cli_overrides(&CliOverrides {
            data_dir: Some(PathBuf::from("elsewhere")),
            weights: Some(Weights::new(0.0, 1.0, 0.0)),
        });
        assert_eq!(Weights::from(cfg.weights), Weights::new(0.0, 1.0, 0.0));
        assert_eq!(cfg.pipeline().unwrap().weights, Weights::new(0.0, 1.0, 0.0));
        assert_eq!(cfg.paths.scores(), PathBuf::from("elsewhere/rli_scores.json"));
    }

    #[test]
    fn test_parse_weights() {
        assert_eq!(parse_weights("0.3,0.4,0.3").unwrap(), Weights::new(0.3, 0.4, 0.3));
        assert!(parse_weights("0.3,0.4").is_err());
        assert!(parse_weights("a,b,c").is_err());
        assert!(parse_weights("-1,0,0").is_err());
    }

    #[test]
    fn test_explicit_missing_file() {
        let err = OmphalosConfig::load(
            Some(Path::new("/definitely/not/here/omphalos.toml")),
            Path::new("."),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
