//! Stage configuration and its RON/TOML/JSON loader.
//!
//! Every field has a default, so a config file only names what a page
//! changes. The format is chosen by file extension.

use crate::id::Millis;
use crate::particles::ParticleConfig;
use crate::ramp::RampGroup;
use crate::router::Binding;
use crate::scheduler::{DEFAULT_FRAME_INTERVAL_MS, DEFAULT_STEP_LIMIT};
use crate::sequencer::RevealGroup;
use crate::watcher::WatchOptions;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("{group}: threshold {threshold} is outside [0, 1] or margin is not finite")]
    InvalidWatch { group: String, threshold: f64 },

    #[error("{group}: no classes to watch")]
    EmptySelector { group: String },

    #[error("frame interval must be at least 1ms")]
    InvalidFrameInterval,

    #[error("page-scroll fraction {fraction} is not a finite number")]
    InvalidScrollFraction { fraction: f64 },

    #[error("particles: {field} = {value} must be finite and within [0, {max}]")]
    InvalidParticles {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Config
// ===========================================================================

/// Everything a [`Stage`](crate::stage::Stage) needs at ready time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub frame_interval_ms: Millis,
    /// Seed for decorative randomness.
    pub seed: u64,
    /// Ring buffer capacity per event kind.
    pub event_capacity: usize,
    /// Cap on tasks run by a single advance or flush.
    pub step_limit: usize,
    pub reveals: Vec<RevealGroup>,
    pub ramps: Vec<RampGroup>,
    pub bindings: Vec<Binding>,
    pub particles: Option<ParticleConfig>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            seed: 0,
            event_capacity: 256,
            step_limit: DEFAULT_STEP_LIMIT,
            reveals: Vec::new(),
            ramps: Vec::new(),
            bindings: Vec::new(),
            particles: None,
        }
    }
}

impl StageConfig {
    /// Check the values serde cannot: thresholds in range, non-empty class
    /// lists, a usable frame interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::InvalidFrameInterval);
        }
        for (i, group) in self.reveals.iter().enumerate() {
            let name = format!("reveals[{i}]");
            check_group(&name, &group.classes, &group.watch)?;
        }
        for (i, group) in self.ramps.iter().enumerate() {
            let name = format!("ramps[{i}]");
            check_group(&name, &group.classes, &group.watch)?;
        }
        for binding in &self.bindings {
            if let Binding::PageScroll { fraction, .. } = binding
                && !fraction.is_finite()
            {
                return Err(ConfigError::InvalidScrollFraction {
                    fraction: *fraction,
                });
            }
        }
        if let Some(particles) = &self.particles {
            check_particles(particles)?;
        }
        Ok(())
    }
}

/// Longest delay or fall a particle may be configured with.
pub const MAX_PARTICLE_MS: f64 = 3_600_000.0;

/// Largest particle size in pixels.
pub const MAX_PARTICLE_PX: f64 = 10_000.0;

fn check_particles(cfg: &ParticleConfig) -> Result<(), ConfigError> {
    let fields = [
        ("min_duration_ms", cfg.min_duration_ms, MAX_PARTICLE_MS),
        ("duration_spread_ms", cfg.duration_spread_ms, MAX_PARTICLE_MS),
        ("max_start_delay_ms", cfg.max_start_delay_ms, MAX_PARTICLE_MS),
        ("linger_ms", cfg.linger_ms as f64, MAX_PARTICLE_MS),
        ("min_size_px", cfg.min_size_px, MAX_PARTICLE_PX),
        ("size_spread_px", cfg.size_spread_px, MAX_PARTICLE_PX),
    ];
    for (field, value, max) in fields {
        if !value.is_finite() || !(0.0..=max).contains(&value) {
            return Err(ConfigError::InvalidParticles { field, value, max });
        }
    }
    Ok(())
}

fn check_group(name: &str, classes: &[String], watch: &WatchOptions) -> Result<(), ConfigError> {
    if classes.is_empty() || classes.iter().any(|c| c.trim().is_empty()) {
        return Err(ConfigError::EmptySelector {
            group: name.to_string(),
        });
    }
    if !watch.is_valid() {
        return Err(ConfigError::InvalidWatch {
            group: name.to_string(),
            threshold: watch.threshold,
        });
    }
    Ok(())
}

// ===========================================================================
// Loading
// ===========================================================================

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file from its extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

fn deserialize<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, ConfigError> {
    let parse_err = |detail: String| ConfigError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Parse and validate a config held in memory.
pub fn parse_config(content: &str, format: Format) -> Result<StageConfig, ConfigError> {
    let config: StageConfig = deserialize(content, format, Path::new("<inline>"))?;
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<StageConfig, ConfigError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let config: StageConfig = deserialize(&content, format, path)?;
    config.validate()?;
    log::debug!(
        "loaded {} ({} reveal groups, {} ramp groups, {} bindings)",
        path.display(),
        config.reveals.len(),
        config.ramps.len(),
        config.bindings.len()
    );
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "unveil_config_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn detect_formats() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("a.yaml")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("config")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn empty_json_is_all_defaults() {
        let config = parse_config("{}", Format::Json).unwrap();
        assert_eq!(config, StageConfig::default());
    }

    #[test]
    fn load_ron_file() {
        let dir = make_test_dir("ron");
        let path = dir.join("cards.ron");
        fs::write(
            &path,
            r#"(
                seed: 21,
                reveals: [
                    (classes: ["card"], watch: (threshold: 0.12), enter_class: "visible"),
                ],
                bindings: [Anchors, Navigate(id: "to21index", href: "./21index.html")],
            )"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.seed, 21);
        assert_eq!(config.reveals[0].enter_class, "visible");
        assert_eq!(config.reveals[0].watch.threshold, 0.12);
        assert_eq!(config.bindings.len(), 2);
        assert_eq!(config.frame_interval_ms, DEFAULT_FRAME_INTERVAL_MS);

        cleanup(&dir);
    }

    #[test]
    fn load_toml_file() {
        let dir = make_test_dir("toml");
        let path = dir.join("stats.toml");
        fs::write(
            &path,
            r#"
frame_interval_ms = 20

[[ramps]]
classes = ["stat-number"]
duration_ms = 1500

[ramps.grouping]
separator = "."
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.frame_interval_ms, 20);
        assert_eq!(config.ramps[0].duration_ms, 1500);
        assert_eq!(config.ramps[0].attribute, "data-target");
        assert_eq!(config.ramps[0].grouping.format(1234), "1.234");

        cleanup(&dir);
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = make_test_dir("bad");
        let path = dir.join("bad.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let err = load_config(&path).unwrap_err();
        match err {
            ConfigError::Parse { file, .. } => assert_eq!(file, path),
            other => panic!("expected parse error, got {other:?}"),
        }

        cleanup(&dir);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_config(Path::new("/nonexistent/unveil/config.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn validation_rejects_bad_groups() {
        let bad_threshold = r#"{ "reveals": [ { "classes": ["card"], "watch": { "threshold": 1.5 } } ] }"#;
        assert!(matches!(
            parse_config(bad_threshold, Format::Json),
            Err(ConfigError::InvalidWatch { .. })
        ));

        let no_classes = r#"{ "ramps": [ { "classes": [] } ] }"#;
        let err = parse_config(no_classes, Format::Json).unwrap_err();
        assert_eq!(err.to_string(), "ramps[0]: no classes to watch");

        assert!(matches!(
            parse_config(r#"{ "frame_interval_ms": 0 }"#, Format::Json),
            Err(ConfigError::InvalidFrameInterval)
        ));
    }

    #[test]
    fn validation_rejects_unbounded_particles() {
        let mut config = StageConfig {
            particles: Some(ParticleConfig {
                min_duration_ms: 1e30,
                ..ParticleConfig::default()
            }),
            ..StageConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParticles { field: "min_duration_ms", .. }
        ));

        config.particles = Some(ParticleConfig {
            max_start_delay_ms: f64::NAN,
            ..ParticleConfig::default()
        });
        assert!(config.validate().is_err());

        config.particles = Some(ParticleConfig {
            size_spread_px: -1.0,
            ..ParticleConfig::default()
        });
        assert!(config.validate().is_err());

        config.particles = Some(ParticleConfig::emoji_rain());
        assert!(config.validate().is_ok());
    }
}
