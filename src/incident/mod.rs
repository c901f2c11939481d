//! Incident domain model
//!
//! ## Responsibilities
//!
//! - Closed enumerations for incident kind and damage level
//! - Per-frame observation input shape
//! - Classification rules (classifier submodule)
//! - Active-incident registry (registry submodule)

mod classifier;
mod registry;

pub use classifier::{classify_frame, FrameObservation};
pub use registry::IncidentRegistry;

use crate::geometry::BBox;
use serde::{Deserialize, Serialize};

/// Object classes treated as vehicles for crash/jam/person-hit rules
pub const VEHICLE_CLASSES: [&str; 5] = ["car", "bicycle", "truck", "bus", "motorcycle"];

/// Object classes treated as fixed obstacles for the crash rule
pub const OBSTACLE_CLASSES: [&str; 5] = ["pottedplant", "chair", "diningtable", "sofa", "tvmonitor"];

/// Maximum center distance for two boxes to count as one traffic cluster
pub const CLUSTER_MAX_DISTANCE: f32 = 0.15;

/// Minimum cluster size that qualifies as a traffic jam
pub const JAM_CLUSTER_SIZE: usize = 4;

/// IoU threshold for the person-hit rule
pub const PERSON_HIT_IOU: f32 = 0.05;

/// Incident kinds, one active entry per kind at most
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Fire,
    PersonHit,
    Crash,
    Jam,
    NormalFlow,
}

impl IncidentKind {
    /// Lowercase key used for resource-directory lookups
    pub fn key(&self) -> &'static str {
        match self {
            IncidentKind::Fire => "fire",
            IncidentKind::PersonHit => "person hit",
            IncidentKind::Crash => "crash",
            IncidentKind::Jam => "jam",
            IncidentKind::NormalFlow => "normal flow",
        }
    }
}

impl std::fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IncidentKind::Fire => "Fire",
            IncidentKind::PersonHit => "Person Hit",
            IncidentKind::Crash => "Crash",
            IncidentKind::Jam => "Jam",
            IncidentKind::NormalFlow => "Normal Flow",
        };
        write!(f, "{}", s)
    }
}

/// Damage assessment attached to an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageLevel {
    None,
    Low,
    High,
    Extreme,
}

impl DamageLevel {
    /// Numeric severity for report logging (0..3)
    pub fn severity(&self) -> i32 {
        match self {
            DamageLevel::None => 0,
            DamageLevel::Low => 1,
            DamageLevel::High => 2,
            DamageLevel::Extreme => 3,
        }
    }
}

/// A classified incident. Immutable once created; the registry owns
/// its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub kind: IncidentKind,
    pub damage: DamageLevel,
    /// 1 (highest) .. 4 (lowest)
    pub priority: u8,
}

impl Incident {
    pub fn fire() -> Self {
        Self {
            kind: IncidentKind::Fire,
            damage: DamageLevel::Extreme,
            priority: 1,
        }
    }

    pub fn person_hit() -> Self {
        Self {
            kind: IncidentKind::PersonHit,
            damage: DamageLevel::Extreme,
            priority: 1,
        }
    }

    pub fn crash() -> Self {
        Self {
            kind: IncidentKind::Crash,
            damage: DamageLevel::High,
            priority: 1,
        }
    }

    pub fn jam() -> Self {
        Self {
            kind: IncidentKind::Jam,
            damage: DamageLevel::Low,
            priority: 3,
        }
    }

    pub fn normal_flow() -> Self {
        Self {
            kind: IncidentKind::NormalFlow,
            damage: DamageLevel::None,
            priority: 4,
        }
    }
}

/// A single detection box tagged with its object class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorBox {
    pub class_label: String,
    pub bbox: BBox,
}
