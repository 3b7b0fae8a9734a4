//! Narrative variations.
//!
//! Successive incidents rotate through a fixed set of substitutions so each
//! trigger reads as a different case while sharing one alert template.

use crate::templates::{AlertTemplate, Vehicle};

/// One set of narrative substitutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variation {
    /// Name of the missing child.
    pub child_name: &'static str,
    /// Last known location.
    pub location: &'static str,
    /// Vehicle as `"<color> <make> <model...>"`.
    pub vehicle: &'static str,
}

/// The rotation, in trigger order.
pub const VARIATIONS: [Variation; 5] = [
    Variation {
        child_name: "Emma Rodriguez",
        location: "Gatineau Park",
        vehicle: "Blue Honda Civic",
    },
    Variation {
        child_name: "James Wilson",
        location: "Downtown Ottawa",
        vehicle: "Red Toyota Camry",
    },
    Variation {
        child_name: "Sophie Chen",
        location: "Rideau Centre",
        vehicle: "White Ford Escape",
    },
    Variation {
        child_name: "Michael Brown",
        location: "ByWard Market",
        vehicle: "Black Chevrolet Malibu",
    },
    Variation {
        child_name: "Olivia Martinez",
        location: "Parliament Hill",
        vehicle: "Silver Nissan Altima",
    },
];

impl Variation {
    /// Variation used by the `trigger_number`-th trigger (1-based).
    pub fn for_trigger(trigger_number: u64) -> &'static Self {
        let [first, ..] = &VARIATIONS;
        let len = u64::try_from(VARIATIONS.len()).unwrap_or(1);
        let slot = trigger_number.saturating_sub(1).checked_rem(len).unwrap_or(0);
        let index = usize::try_from(slot).unwrap_or(0);
        VARIATIONS.get(index).unwrap_or(first)
    }

    /// Split [`Variation::vehicle`] into color, make, and model. The model
    /// keeps every word after the make.
    pub fn vehicle_parts(&self) -> Vehicle {
        let mut words = self.vehicle.split_whitespace();
        let color = words.next().unwrap_or_default().to_owned();
        let make = words.next().unwrap_or_default().to_owned();
        let model = words.collect::<Vec<_>>().join(" ");
        Vehicle {
            color,
            make,
            model,
            plate: None,
        }
    }

    /// Apply this variation to a base alert, keeping every field the
    /// variation does not substitute.
    pub fn apply(&self, base: &AlertTemplate) -> AlertTemplate {
        let mut alert = base.clone();
        alert.child.name = self.child_name.to_owned();
        let parts = self.vehicle_parts();
        alert.vehicle.color = parts.color;
        alert.vehicle.make = parts.make;
        alert.vehicle.model = parts.model;
        alert.last_known.location = self.location.to_owned();
        alert
    }
}
