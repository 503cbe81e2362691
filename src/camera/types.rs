use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the device the sensor faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Front,
    Back,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::Front => "front",
            Facing::Back => "back",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical lens on a multi-camera device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lens {
    Normal,
    UltraWide,
    Telephoto,
}

impl Lens {
    /// Cycling order used when more than one lens is available
    pub const CYCLE_ORDER: [Lens; 3] = [Lens::Normal, Lens::UltraWide, Lens::Telephoto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lens::Normal => "normal",
            Lens::UltraWide => "ultra_wide",
            Lens::Telephoto => "telephoto",
        }
    }

    /// Zoom label shown on the lens toggle
    pub fn label(&self) -> &'static str {
        match self {
            Lens::UltraWide => "0.5x",
            Lens::Normal => "1x",
            Lens::Telephoto => "2x",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashMode {
    Off,
    On,
    Auto,
}

impl FlashMode {
    /// Off -> On -> Auto -> Off
    pub fn next(self) -> Self {
        match self {
            FlashMode::Off => FlashMode::On,
            FlashMode::On => FlashMode::Auto,
            FlashMode::Auto => FlashMode::Off,
        }
    }
}

/// What the platform reports about the device for one facing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: String,
    pub facing: Facing,
    pub lenses: Vec<Lens>,
}

impl DeviceDescriptor {
    pub fn new<S: Into<String>>(id: S, facing: Facing, lenses: Vec<Lens>) -> Self {
        Self {
            id: id.into(),
            facing,
            lenses,
        }
    }
}

/// Lenses the bound device actually supports, in cycling order.
///
/// Always contains `Lens::Normal`; a device that reports nothing usable still
/// gets the main lens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedLenses(Vec<Lens>);

impl SupportedLenses {
    pub fn from_descriptor(descriptor: &DeviceDescriptor) -> Self {
        let lenses = Lens::CYCLE_ORDER
            .iter()
            .copied()
            .filter(|lens| *lens == Lens::Normal || descriptor.lenses.contains(lens))
            .collect();
        Self(lenses)
    }

    pub fn contains(&self, lens: Lens) -> bool {
        self.0.contains(&lens)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn can_cycle(&self) -> bool {
        self.0.len() > 1
    }

    /// Lens following `current`; unknown lenses restart at the first entry
    pub fn next_after(&self, current: Lens) -> Lens {
        match self.0.iter().position(|lens| *lens == current) {
            Some(index) => self.0[(index + 1) % self.0.len()],
            None => self.0[0],
        }
    }

    pub fn as_slice(&self) -> &[Lens] {
        &self.0
    }
}

/// Hardware binding as seen by the rest of the system
#[derive(Debug, Clone, PartialEq)]
pub struct CameraDeviceState {
    pub facing: Facing,
    pub lens: Lens,
    pub flash: FlashMode,
    /// Preview mirroring, only meaningful for the front camera
    pub mirrored: bool,
    /// Sensor bound and streaming
    pub is_active: bool,
}

impl CameraDeviceState {
    pub fn new(facing: Facing) -> Self {
        Self {
            facing,
            lens: Lens::Normal,
            flash: FlashMode::Off,
            mirrored: facing == Facing::Front,
            is_active: false,
        }
    }
}

/// `Unbound -> Binding -> Active <-> Paused -> Unbound`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Unbound,
    Binding,
    Active,
    Paused,
}

/// Device problems surfaced as state instead of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraCondition {
    /// Needs the user to grant access in system settings
    PermissionDenied,
    /// No device for the current facing; switching facing may help
    DeviceUnavailable,
}

/// Snapshot returned by every controller operation that can change binding
#[derive(Debug, Clone, PartialEq)]
pub struct CameraStatus {
    pub device: CameraDeviceState,
    pub lifecycle: LifecycleState,
    pub condition: Option<CameraCondition>,
    pub lens_cycling_enabled: bool,
}

impl CameraStatus {
    pub fn is_active(&self) -> bool {
        self.device.is_active
    }
}

/// Parameters the backend needs for a single shot
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub facing: Facing,
    pub lens: Lens,
    pub flash: FlashMode,
    pub mirrored: bool,
}

impl From<&CameraDeviceState> for CaptureSettings {
    fn from(device: &CameraDeviceState) -> Self {
        Self {
            facing: device.facing,
            lens: device.lens,
            flash: device.flash,
            mirrored: device.mirrored,
        }
    }
}
