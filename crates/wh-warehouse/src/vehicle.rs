//! Items moved through the warehouse.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use serde::Serialize;

/// First id handed out by a default [`VehicleFactory`].
pub const FIRST_VEHICLE_ID: u64 = 1000;

/// Anything that can render itself as a multi-line report block.
pub trait Describe {
    fn describe(&self) -> String;
}

/// The two kinds of vehicle the warehouse stocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VehicleKind {
    Car,
    Truck,
}

impl VehicleKind {
    pub fn model(self) -> &'static str {
        match self {
            Self::Car => "Audi",
            Self::Truck => "Scania",
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::Car => "Car",
            Self::Truck => "Truck",
        }
    }

    pub fn property(self) -> &'static str {
        match self {
            Self::Car => "Max 5 Passengers",
            Self::Truck => "Max 4000kg",
        }
    }
}

/// A single stocked vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vehicle {
    id: u64,
    kind: VehicleKind,
}

impl Vehicle {
    pub fn new(id: u64, kind: VehicleKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> VehicleKind {
        self.kind
    }
}

impl Describe for Vehicle {
    fn describe(&self) -> String {
        format!(
            "{} id: {}\nModel: {}\nType: {}\nProperty: {}",
            self.kind.type_name(),
            self.id,
            self.kind.model(),
            self.kind.type_name(),
            self.kind.property()
        )
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Builds vehicles with ascending ids.
///
/// Shared by reference between producer threads; ids stay unique across them.
#[derive(Debug)]
pub struct VehicleFactory {
    next_id: AtomicU64,
}

impl VehicleFactory {
    pub fn new(first_id: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first_id),
        }
    }

    /// Build a car or a truck with equal probability.
    pub fn next<R: Rng>(&self, rng: &mut R) -> Vehicle {
        let kind = if rng.gen_bool(0.5) {
            VehicleKind::Car
        } else {
            VehicleKind::Truck
        };
        self.build(kind)
    }

    /// Build a vehicle of a fixed kind.
    pub fn build(&self, kind: VehicleKind) -> Vehicle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Vehicle::new(id, kind)
    }
}

impl Default for VehicleFactory {
    fn default() -> Self {
        Self::new(FIRST_VEHICLE_ID)
    }
}
