//! Device viewport model: the fixed registry of device profiles and the
//! sizes they take on in each orientation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Device pixel ratio requested for every snapshot.
pub const SNAPSHOT_DPR: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceId {
    Mobile,
    Tablet,
    Laptop,
    Desktop,
}

impl DeviceId {
    pub const ALL: [DeviceId; 4] = [
        DeviceId::Mobile,
        DeviceId::Tablet,
        DeviceId::Laptop,
        DeviceId::Desktop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceId::Mobile => "mobile",
            DeviceId::Tablet => "tablet",
            DeviceId::Laptop => "laptop",
            DeviceId::Desktop => "desktop",
        }
    }

    /// The static profile registered for this device.
    pub fn profile(self) -> &'static DeviceProfile {
        match self {
            DeviceId::Mobile => &DEVICES[0],
            DeviceId::Tablet => &DEVICES[1],
            DeviceId::Laptop => &DEVICES[2],
            DeviceId::Desktop => &DEVICES[3],
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        DeviceId::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::Other(format!("unknown device '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Portrait => Orientation::Landscape,
            Orientation::Landscape => Orientation::Portrait,
        }
    }
}

/// A device frame's nominal viewport. Constant for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub id: DeviceId,
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub can_rotate: bool,
}

/// Every device frame, in display order.
pub static DEVICES: [DeviceProfile; 4] = [
    DeviceProfile {
        id: DeviceId::Mobile,
        name: "Mobile (iPhone 14)",
        width: 390,
        height: 844,
        can_rotate: true,
    },
    DeviceProfile {
        id: DeviceId::Tablet,
        name: "Tablet (Standard)",
        width: 768,
        height: 1024,
        can_rotate: true,
    },
    DeviceProfile {
        id: DeviceId::Laptop,
        name: "Laptop (Standard)",
        width: 1366,
        height: 768,
        can_rotate: false,
    },
    DeviceProfile {
        id: DeviceId::Desktop,
        name: "Desktop (Ultra-Wide)",
        width: 1920,
        height: 1080,
        can_rotate: false,
    },
];

impl DeviceProfile {
    /// Width and height as displayed in the given orientation.
    pub fn effective_size(&self, orientation: Orientation) -> (u32, u32) {
        match orientation {
            Orientation::Portrait => (self.width, self.height),
            Orientation::Landscape => (self.height, self.width),
        }
    }

    /// Orientation actually used for this device; devices that cannot rotate
    /// stay in portrait regardless of what is requested.
    pub fn pinned(&self, requested: Orientation) -> Orientation {
        if self.can_rotate {
            requested
        } else {
            Orientation::Portrait
        }
    }

    pub fn metrics(&self, orientation: Orientation) -> DeviceMetrics {
        let (width, height) = self.effective_size(self.pinned(orientation));
        DeviceMetrics {
            width,
            height,
            dpr: SNAPSHOT_DPR,
            mobile: self.id == DeviceId::Mobile,
            touch: matches!(self.id, DeviceId::Mobile | DeviceId::Tablet),
        }
    }

    /// Frame caption such as `844px × 390px (Landscape)`.
    pub fn size_label(&self, orientation: Orientation) -> String {
        let orientation = self.pinned(orientation);
        let (w, h) = self.effective_size(orientation);
        match orientation {
            Orientation::Portrait => format!("{}px × {}px", w, h),
            Orientation::Landscape => format!("{}px × {}px (Landscape)", w, h),
        }
    }
}

/// Emulation parameters handed to the snapshot backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceMetrics {
    pub width: u32,
    pub height: u32,
    pub dpr: f32,
    pub mobile: bool,
    pub touch: bool,
}

/// Free function form of [`DeviceProfile::effective_size`].
pub fn effective_size(profile: &DeviceProfile, orientation: Orientation) -> (u32, u32) {
    profile.effective_size(orientation)
}
