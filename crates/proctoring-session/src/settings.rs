//! Session configuration loading

use std::path::Path;

use audio_monitor::AudioConfig;
use config::{Config, Environment, File};
use event_guard::GuardConfig;
use media_capture::{CameraConstraints, MicrophoneConstraints};
use presence::PresenceConfig;
use serde::{Deserialize, Serialize};
use tracing::info;
use violation_ledger::LedgerConfig;

use crate::SessionError;

/// Environment prefix for overrides, e.g. `PROCTOR__LEDGER__MAX_VIOLATIONS=5`
const ENV_PREFIX: &str = "PROCTOR";

/// Full policy for one proctoring session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctoringConfig {
    pub ledger: LedgerConfig,
    pub presence: PresenceConfig,
    pub audio: AudioConfig,
    pub guard: GuardConfig,
    pub camera: CameraConstraints,
    pub microphone: MicrophoneConstraints,
}

impl From<config::ConfigError> for SessionError {
    fn from(err: config::ConfigError) -> Self {
        SessionError::Config(err.to_string())
    }
}

impl ProctoringConfig {
    /// Defaults, then an optional TOML/JSON file, then `PROCTOR__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, SessionError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            info!("Loading proctoring config from {}", path.display());
            builder = builder.add_source(File::from(path));
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// One strike, tighter presence vote
    pub fn strict() -> Self {
        Self {
            ledger: LedgerConfig::strict(),
            presence: PresenceConfig::strict(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        self.ledger.validate()?;

        if self.presence.interval_ms == 0 || self.audio.interval_ms == 0 {
            return Err(SessionError::Config("sampling intervals must be non-zero".into()));
        }
        if self.presence.max_no_face_count == 0 {
            return Err(SessionError::Config("max_no_face_count must be at least 1".into()));
        }
        if self.presence.min_conditions > 4 {
            return Err(SessionError::Config(format!(
                "min_conditions {} exceeds the 4 presence conditions",
                self.presence.min_conditions
            )));
        }

        let ratios = [
            ("presence.skin_ratio_min", self.presence.skin_ratio_min),
            ("presence.skin_ratio_max", self.presence.skin_ratio_max),
            ("presence.max_bright_ratio", self.presence.max_bright_ratio),
            ("presence.max_dark_ratio", self.presence.max_dark_ratio),
            ("audio.threshold", self.audio.threshold),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(SessionError::Config(format!(
                    "{} = {} outside [0, 1]",
                    name, value
                )));
            }
        }

        Ok(())
    }
}
