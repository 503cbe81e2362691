use crate::camera::{Facing, Lens};
use crate::location::ProviderKind;
use crate::session::Privacy;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlaceSnapConfig {
    pub session: SessionConfig,
    pub camera: CameraConfig,
    pub location: LocationConfig,
    pub upload: UploadConfig,
    pub system: SystemConfig,
}

/// Settings snapshot handed to each new capture session
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Camera facing used when a session starts
    #[serde(default = "default_facing")]
    pub default_facing: Facing,

    /// Visibility preselected for new check-ins
    #[serde(default = "default_privacy")]
    pub default_privacy: Privacy,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Directory where captured photos are written before upload
    #[serde(default = "default_capture_dir")]
    pub capture_dir: String,

    /// Simulated sensor latency per capture
    #[serde(default = "default_capture_delay_ms")]
    pub capture_delay_ms: u64,

    /// Lenses reported by the front device (empty = no front camera)
    #[serde(default = "default_front_lenses")]
    pub front_lenses: Vec<Lens>,

    /// Lenses reported by the back device (empty = no back camera)
    #[serde(default = "default_back_lenses")]
    pub back_lenses: Vec<Lens>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LocationConfig {
    /// Geocoding backend used to format addresses
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    pub google_api_key: Option<String>,

    #[serde(default = "default_google_base_url")]
    pub google_base_url: String,

    pub mapbox_access_token: Option<String>,

    #[serde(default = "default_mapbox_base_url")]
    pub mapbox_base_url: String,

    /// Language requested from providers that support it
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fix reported by the simulated position source (lat, lon)
    #[serde(default = "default_simulated_position")]
    pub simulated_position: (f64, f64),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadConfig {
    /// Check-in endpoint; the simulated gateway is used when unset
    pub endpoint: Option<String>,

    pub auth_token: Option<String>,

    #[serde(default = "default_upload_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_simulated_delay_ms")]
    pub simulated_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl PlaceSnapConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("placesnap.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("session.default_facing", default_facing().as_str())?
            .set_default("session.default_privacy", default_privacy().as_str())?
            .set_default("camera.capture_dir", default_capture_dir())?
            .set_default("camera.capture_delay_ms", default_capture_delay_ms())?
            .set_default(
                "camera.front_lenses",
                lens_names(&default_front_lenses()),
            )?
            .set_default("camera.back_lenses", lens_names(&default_back_lenses()))?
            .set_default("location.provider", default_provider().as_str())?
            .set_default("location.google_base_url", default_google_base_url())?
            .set_default("location.mapbox_base_url", default_mapbox_base_url())?
            .set_default("location.language", default_language())?
            .set_default(
                "location.request_timeout_secs",
                default_request_timeout_secs(),
            )?
            .set_default(
                "location.simulated_position",
                vec![
                    default_simulated_position().0,
                    default_simulated_position().1,
                ],
            )?
            .set_default("upload.timeout_secs", default_upload_timeout_secs())?
            .set_default("upload.simulated_delay_ms", default_simulated_delay_ms())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // PLACESNAP_LOCATION__GOOGLE_API_KEY etc.
            .add_source(
                Environment::with_prefix("PLACESNAP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: PlaceSnapConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.capture_dir.trim().is_empty() {
            return Err(ConfigError::Message(
                "Camera capture_dir must not be empty".to_string(),
            ));
        }

        let (lat, lon) = self.location.simulated_position;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ConfigError::Message(format!(
                "Simulated position ({}, {}) is out of range",
                lat, lon
            )));
        }

        if self.location.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Location request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.upload.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Upload timeout_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(endpoint) = &self.upload.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::Message(format!(
                    "Upload endpoint must be an http(s) URL: {}",
                    endpoint
                )));
            }
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PlaceSnapConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig {
                default_facing: default_facing(),
                default_privacy: default_privacy(),
            },
            camera: CameraConfig {
                capture_dir: default_capture_dir(),
                capture_delay_ms: default_capture_delay_ms(),
                front_lenses: default_front_lenses(),
                back_lenses: default_back_lenses(),
            },
            location: LocationConfig {
                provider: default_provider(),
                google_api_key: None,
                google_base_url: default_google_base_url(),
                mapbox_access_token: None,
                mapbox_base_url: default_mapbox_base_url(),
                language: default_language(),
                request_timeout_secs: default_request_timeout_secs(),
                simulated_position: default_simulated_position(),
            },
            upload: UploadConfig {
                endpoint: None,
                auth_token: None,
                timeout_secs: default_upload_timeout_secs(),
                simulated_delay_ms: default_simulated_delay_ms(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

fn lens_names(lenses: &[Lens]) -> Vec<&'static str> {
    lenses.iter().map(|lens| lens.as_str()).collect()
}

// Default value functions
fn default_facing() -> Facing {
    Facing::Back
}
fn default_privacy() -> Privacy {
    Privacy::Friends
}

fn default_capture_dir() -> String {
    "./captures".to_string()
}
fn default_capture_delay_ms() -> u64 {
    150
}
fn default_front_lenses() -> Vec<Lens> {
    vec![Lens::Normal]
}
fn default_back_lenses() -> Vec<Lens> {
    vec![Lens::Normal, Lens::UltraWide]
}

fn default_provider() -> ProviderKind {
    ProviderKind::Mapbox
}
fn default_google_base_url() -> String {
    "https://maps.googleapis.com".to_string()
}
fn default_mapbox_base_url() -> String {
    "https://api.mapbox.com".to_string()
}
fn default_language() -> String {
    "vi".to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_simulated_position() -> (f64, f64) {
    (10.7769, 106.7009)
}

fn default_upload_timeout_secs() -> u64 {
    30
}
fn default_simulated_delay_ms() -> u64 {
    2000
}

fn default_event_bus_capacity() -> usize {
    100
}
