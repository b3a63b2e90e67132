// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Part,
    Vehicle,
    Garage,
    Service,
    ServicePackage,
    Manufacturer,
    FuelType,
}

impl EntityKind {
    pub const ALL: [Self; 7] = [
        Self::Part,
        Self::Vehicle,
        Self::Garage,
        Self::Service,
        Self::ServicePackage,
        Self::Manufacturer,
        Self::FuelType,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Part => "part",
            Self::Vehicle => "vehicle",
            Self::Garage => "garage",
            Self::Service => "service",
            Self::ServicePackage => "service_package",
            Self::Manufacturer => "manufacturer",
            Self::FuelType => "fuel_type",
        }
    }

    /// Accepts the singular name, the plural collection name, and dashed or
    /// underscored spellings (`fuel-types`, `fuel_type`).
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "part" | "parts" => Some(Self::Part),
            "vehicle" | "vehicles" => Some(Self::Vehicle),
            "garage" | "garages" => Some(Self::Garage),
            "service" | "services" => Some(Self::Service),
            "service_package" | "service_packages" | "package" | "packages" => {
                Some(Self::ServicePackage)
            }
            "manufacturer" | "manufacturers" => Some(Self::Manufacturer),
            "fuel_type" | "fuel_types" | "fuel" => Some(Self::FuelType),
            _ => None,
        }
    }

    /// REST collection segment, e.g. `GET {base}/service-packages`.
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Part => "parts",
            Self::Vehicle => "vehicles",
            Self::Garage => "garages",
            Self::Service => "services",
            Self::ServicePackage => "service-packages",
            Self::Manufacturer => "manufacturers",
            Self::FuelType => "fuel-types",
        }
    }

    /// Response field the backend uses for this collection's list. The
    /// endpoints never agreed on one name.
    pub const fn list_field(self) -> &'static str {
        match self {
            Self::Part => "parts",
            Self::Vehicle => "vehicles",
            Self::Garage => "garages",
            Self::Service | Self::ServicePackage => "data",
            Self::Manufacturer => "manufacturers",
            Self::FuelType => "fuelTypes",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Part => "Parts",
            Self::Vehicle => "Vehicles",
            Self::Garage => "Garages",
            Self::Service => "Services",
            Self::ServicePackage => "Service packages",
            Self::Manufacturer => "Manufacturers",
            Self::FuelType => "Fuel types",
        }
    }
}

/// A record that can appear in a paginated selector.
pub trait Entity {
    fn entity_id(&self) -> EntityId;
    fn label(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(rename = "_id", alias = "id")]
    pub id: PartId,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub manufacturer: Option<ManufacturerId>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(rename = "_id", alias = "id")]
    pub id: VehicleId,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<ManufacturerId>,
    #[serde(default)]
    pub fuel_type: Option<FuelTypeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Garage {
    #[serde(rename = "_id", alias = "id")]
    pub id: GarageId,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub geo: Option<GeoPoint>,
    #[serde(default)]
    pub contact: Contact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "_id", alias = "id")]
    pub id: ServiceId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default, rename = "duration")]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub parts: Vec<PartId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePackage {
    #[serde(rename = "_id", alias = "id")]
    pub id: ServicePackageId,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub discount_price: Option<f64>,
    #[serde(default)]
    pub services: Vec<ServiceId>,
    #[serde(default)]
    pub garages: Vec<GarageId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manufacturer {
    #[serde(rename = "_id", alias = "id")]
    pub id: ManufacturerId,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelType {
    #[serde(rename = "_id", alias = "id")]
    pub id: FuelTypeId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Entity for Part {
    fn entity_id(&self) -> EntityId {
        EntityId::from(&self.id)
    }

    fn label(&self) -> String {
        match &self.sku {
            Some(sku) if !sku.is_empty() => format!("{} ({sku})", self.name),
            _ => self.name.clone(),
        }
    }
}

impl Entity for Vehicle {
    fn entity_id(&self) -> EntityId {
        EntityId::from(&self.id)
    }

    fn label(&self) -> String {
        match self.year {
            Some(year) => format!("{year} {} {}", self.make, self.model),
            None => format!("{} {}", self.make, self.model),
        }
    }
}

impl Entity for Garage {
    fn entity_id(&self) -> EntityId {
        EntityId::from(&self.id)
    }

    fn label(&self) -> String {
        if self.address.is_empty() {
            return self.name.clone();
        }
        format!("{} -- {}", self.name, self.address)
    }
}

impl Entity for Service {
    fn entity_id(&self) -> EntityId {
        EntityId::from(&self.id)
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Entity for ServicePackage {
    fn entity_id(&self) -> EntityId {
        EntityId::from(&self.id)
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Entity for Manufacturer {
    fn entity_id(&self) -> EntityId {
        EntityId::from(&self.id)
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Entity for FuelType {
    fn entity_id(&self) -> EntityId {
        EntityId::from(&self.id)
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}
