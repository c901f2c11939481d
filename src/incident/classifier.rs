//! Per-frame incident classification rules
//!
//! Rules fire independently on one frame's detections; the registry decides
//! which candidates actually enter the active set. A kind that is already
//! active is never re-emitted.

use super::{
    ActorBox, Incident, IncidentKind, CLUSTER_MAX_DISTANCE, JAM_CLUSTER_SIZE, PERSON_HIT_IOU,
    VEHICLE_CLASSES,
};
use crate::geometry::{largest_cluster, overlaps_significantly, touches_or_overlaps, BBox};
use serde::{Deserialize, Serialize};

/// One frame's worth of detector output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameObservation {
    /// Every detected class label, duplicates included
    pub objects: Vec<String>,
    /// Vehicle and person boxes, tagged with class
    pub actors: Vec<ActorBox>,
    /// Fixed-obstacle boxes
    pub obstacles: Vec<BBox>,
    /// Fire-colored regions from the external color/segmentation step
    pub fire_regions: Vec<BBox>,
}

/// Classify one frame against the current active set.
///
/// Returns new incident candidates only; kinds in `active_kinds` are
/// suppressed. Normal Flow appears only when no rule fired and nothing is
/// active.
pub fn classify_frame(observation: &FrameObservation, active_kinds: &[IncidentKind]) -> Vec<Incident> {
    let mut candidates = Vec::new();

    // Fire: any region suffices, count does not matter
    if !observation.fire_regions.is_empty() {
        candidates.push(Incident::fire());
    }

    let person_boxes: Vec<&BBox> = observation
        .actors
        .iter()
        .filter(|a| a.class_label == "person")
        .map(|a| &a.bbox)
        .collect();
    let vehicle_boxes: Vec<&BBox> = observation
        .actors
        .iter()
        .filter(|a| VEHICLE_CLASSES.contains(&a.class_label.as_str()))
        .map(|a| &a.bbox)
        .collect();

    // Person hit: first overlapping person/vehicle pair ends the search,
    // one candidate per frame regardless of how many pairs overlap
    'person_hit: for p in &person_boxes {
        for v in &vehicle_boxes {
            if overlaps_significantly(p, v, PERSON_HIT_IOU) {
                candidates.push(Incident::person_hit());
                break 'person_hit;
            }
        }
    }

    // Crash: vehicle-vehicle contact first, vehicle-obstacle as fallback
    let mut crash = false;
    if vehicle_boxes.len() >= 2 {
        'vehicle_pair: for i in 0..vehicle_boxes.len() {
            for j in (i + 1)..vehicle_boxes.len() {
                if touches_or_overlaps(vehicle_boxes[i], vehicle_boxes[j]) {
                    crash = true;
                    break 'vehicle_pair;
                }
            }
        }
    }
    if !crash {
        'obstacle: for v in &vehicle_boxes {
            for o in &observation.obstacles {
                if touches_or_overlaps(v, o) {
                    crash = true;
                    break 'obstacle;
                }
            }
        }
    }
    if crash {
        candidates.push(Incident::crash());
    }

    // Jam: transitive clustering over all actor boxes (persons included)
    let actor_bboxes: Vec<BBox> = observation.actors.iter().map(|a| a.bbox).collect();
    if largest_cluster(&actor_bboxes, CLUSTER_MAX_DISTANCE) >= JAM_CLUSTER_SIZE {
        candidates.push(Incident::jam());
    }

    // Normal flow: default only when nothing fired and nothing is active
    if candidates.is_empty() && active_kinds.is_empty() {
        candidates.push(Incident::normal_flow());
    }

    candidates.retain(|c| !active_kinds.contains(&c.kind));
    candidates
}
