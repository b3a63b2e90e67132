// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use garagedesk_app::{
    Contact, Entity, EntityKind, FetchError, FormValues, FuelType, FuelTypeId, Garage, GarageId,
    GeoPoint, Manufacturer, ManufacturerId, Page, PageQuery, PageSource, Part, PartId, Service,
    ServiceId, ServicePackage, ServicePackageId, Vehicle, VehicleId, page_count,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Mutex;

const REFERENCE_YEAR: i32 = 2026;

const MANUFACTURERS: [(&str, &str); 8] = [
    ("Bosch", "Germany"),
    ("Denso", "Japan"),
    ("Valeo", "France"),
    ("Brembo", "Italy"),
    ("Mahle", "Germany"),
    ("NGK", "Japan"),
    ("Delphi", "United Kingdom"),
    ("ACDelco", "United States"),
];

const FUEL_TYPES: [(&str, &str); 5] = [
    ("Petrol", "Unleaded gasoline"),
    ("Diesel", "Road diesel"),
    ("Electric", "Battery electric"),
    ("Hybrid", "Petrol with electric assist"),
    ("LPG", "Liquefied petroleum gas"),
];

const PART_NOUNS: [&str; 12] = [
    "Brake pad",
    "Brake disc",
    "Oil filter",
    "Air filter",
    "Spark plug",
    "Timing belt",
    "Wiper blade",
    "Alternator",
    "Starter motor",
    "Radiator",
    "Shock absorber",
    "Headlight bulb",
];

const PART_GRADES: [&str; 4] = ["Standard", "Premium", "Heavy duty", "Eco"];

const VEHICLE_MODELS: [(&str, &str); 10] = [
    ("Toyota", "Corolla"),
    ("Volkswagen", "Golf"),
    ("Ford", "Focus"),
    ("Honda", "Civic"),
    ("BMW", "320i"),
    ("Renault", "Clio"),
    ("Tesla", "Model 3"),
    ("Skoda", "Octavia"),
    ("Kia", "Ceed"),
    ("Mazda", "CX-5"),
];

const GARAGE_NAMES: [&str; 8] = [
    "Northside", "Harbor", "Riverside", "Hilltop", "Central", "Westgate", "Old Town", "Airport",
];

const STREETS: [&str; 8] = [
    "Main St",
    "Station Rd",
    "Mill Lane",
    "Park Ave",
    "Bridge St",
    "Church Rd",
    "High St",
    "Elm Grove",
];

const SERVICE_NAMES: [(&str, u32); 10] = [
    ("Oil change", 30),
    ("Brake inspection", 45),
    ("Full brake service", 120),
    ("Tyre rotation", 30),
    ("Battery check", 15),
    ("Air conditioning recharge", 60),
    ("Timing belt replacement", 240),
    ("Wheel alignment", 60),
    ("Annual inspection", 90),
    ("Diagnostics scan", 30),
];

const VIN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPRSTUVWXYZ0123456789";

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of plausible garage back-office records.
#[derive(Debug, Clone)]
pub struct GarageFaker {
    rng: DeterministicRng,
}

impl GarageFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn part(&mut self, index: usize, manufacturer: &ManufacturerId) -> Part {
        let noun = self.pick(&PART_NOUNS);
        let grade = self.pick(&PART_GRADES);
        let prefix: String = noun
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .collect::<String>()
            .to_ascii_uppercase();
        Part {
            id: PartId::new(format!("part-{index:03}")),
            name: format!("{grade} {}", noun.to_ascii_lowercase()),
            sku: Some(format!("{prefix}-{:04}", 100 + index)),
            price: self.int_range(5, 400) as f64 + self.int_n(100) as f64 / 100.0,
            stock: Some(self.int_range(0, 120) as i64),
            manufacturer: Some(manufacturer.clone()),
            image_url: None,
        }
    }

    pub fn vehicle(
        &mut self,
        index: usize,
        manufacturer: &ManufacturerId,
        fuel_type: &FuelTypeId,
    ) -> Vehicle {
        let (make, model) = self.pick(&VEHICLE_MODELS);
        Vehicle {
            id: VehicleId::new(format!("vehicle-{index:03}")),
            make: make.to_owned(),
            model: model.to_owned(),
            year: Some(self.int_range(2005, REFERENCE_YEAR as usize) as i32),
            vin: Some(self.vin()),
            manufacturer: Some(manufacturer.clone()),
            fuel_type: Some(fuel_type.clone()),
        }
    }

    pub fn garage(&mut self, index: usize) -> Garage {
        let name = GARAGE_NAMES[index % GARAGE_NAMES.len()];
        let street = self.pick(&STREETS);
        let slug = name.to_ascii_lowercase().replace(' ', "");
        Garage {
            id: GarageId::new(format!("garage-{index:03}")),
            name: format!("{name} Garage"),
            address: format!("{} {street}", self.int_range(1, 250)),
            geo: Some(GeoPoint {
                lat: 50.0 + self.int_n(1000) as f64 / 1000.0,
                lng: -1.0 + self.int_n(2000) as f64 / 1000.0,
            }),
            contact: Contact {
                phone: Some(format!(
                    "+44 {:04} {:06}",
                    self.int_range(1000, 9999),
                    self.int_range(100_000, 999_999)
                )),
                email: Some(format!("{slug}@garagedesk.example")),
            },
        }
    }

    pub fn service(&mut self, index: usize, parts: &[PartId]) -> Service {
        let (name, duration) = SERVICE_NAMES[index % SERVICE_NAMES.len()];
        let mut picked = Vec::new();
        for _ in 0..self.int_range(1, 3) {
            if parts.is_empty() {
                break;
            }
            let part = parts[self.int_n(parts.len())].clone();
            if !picked.contains(&part) {
                picked.push(part);
            }
        }
        Service {
            id: ServiceId::new(format!("service-{index:03}")),
            name: name.to_owned(),
            description: Some(format!("{name} carried out by a certified technician")),
            price: self.int_range(20, 600) as f64,
            duration_minutes: Some(duration),
            parts: picked,
        }
    }

    fn vin(&mut self) -> String {
        (0..17)
            .map(|_| char::from(VIN_ALPHABET[self.int_n(VIN_ALPHABET.len())]))
            .collect()
    }

    fn int_range(&mut self, low: usize, high: usize) -> usize {
        low + self.int_n(high - low + 1)
    }

    fn pick<T: Copy>(&mut self, options: &[T]) -> T {
        options[self.int_n(options.len())]
    }
}

/// In-memory copy of every collection, for tests and `--demo`.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoCatalog {
    pub parts: Vec<Part>,
    pub vehicles: Vec<Vehicle>,
    pub garages: Vec<Garage>,
    pub services: Vec<Service>,
    pub service_packages: Vec<ServicePackage>,
    pub manufacturers: Vec<Manufacturer>,
    pub fuel_types: Vec<FuelType>,
}

impl DemoCatalog {
    pub fn generate(seed: u64) -> Self {
        let mut faker = GarageFaker::new(seed);

        let manufacturers = MANUFACTURERS
            .iter()
            .enumerate()
            .map(|(index, (name, country))| Manufacturer {
                id: ManufacturerId::new(format!("manufacturer-{index:03}")),
                name: (*name).to_owned(),
                country: Some((*country).to_owned()),
                logo_url: None,
            })
            .collect::<Vec<_>>();
        let fuel_types = FUEL_TYPES
            .iter()
            .enumerate()
            .map(|(index, (name, description))| FuelType {
                id: FuelTypeId::new(format!("fuel-type-{index:03}")),
                name: (*name).to_owned(),
                description: Some((*description).to_owned()),
            })
            .collect::<Vec<_>>();

        let parts = (0..36)
            .map(|index| {
                let maker = &manufacturers[faker.int_n(manufacturers.len())].id;
                faker.part(index, maker)
            })
            .collect::<Vec<_>>();
        let vehicles = (0..24)
            .map(|index| {
                let maker = &manufacturers[faker.int_n(manufacturers.len())].id;
                let fuel = &fuel_types[faker.int_n(fuel_types.len())].id;
                faker.vehicle(index, maker, fuel)
            })
            .collect::<Vec<_>>();
        let garages = (0..GARAGE_NAMES.len())
            .map(|index| faker.garage(index))
            .collect::<Vec<_>>();

        let part_ids = parts.iter().map(|part| part.id.clone()).collect::<Vec<_>>();
        let services = (0..SERVICE_NAMES.len())
            .map(|index| faker.service(index, &part_ids))
            .collect::<Vec<_>>();

        let service_packages = ["Winter check", "Summer check", "Fleet care", "New driver"]
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let included = services
                    .iter()
                    .skip(index)
                    .step_by(3)
                    .take(3)
                    .collect::<Vec<_>>();
                let price = included.iter().map(|service| service.price).sum::<f64>();
                ServicePackage {
                    id: ServicePackageId::new(format!("package-{index:03}")),
                    name: (*name).to_owned(),
                    price,
                    discount_price: Some((price * 0.85).floor()),
                    services: included.iter().map(|service| service.id.clone()).collect(),
                    garages: garages
                        .iter()
                        .skip(index)
                        .step_by(2)
                        .map(|garage| garage.id.clone())
                        .collect(),
                }
            })
            .collect();

        Self {
            parts,
            vehicles,
            garages,
            services,
            service_packages,
            manufacturers,
            fuel_types,
        }
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Part => self.parts.len(),
            EntityKind::Vehicle => self.vehicles.len(),
            EntityKind::Garage => self.garages.len(),
            EntityKind::Service => self.services.len(),
            EntityKind::ServicePackage => self.service_packages.len(),
            EntityKind::Manufacturer => self.manufacturers.len(),
            EntityKind::FuelType => self.fuel_types.len(),
        }
    }
}

impl Default for DemoCatalog {
    fn default() -> Self {
        Self::generate(7)
    }
}

/// [`PageSource`] over a fixed list. Search matches the record label
/// case-insensitively; every call is recorded.
#[derive(Debug)]
pub struct MemorySource<T> {
    rows: Vec<T>,
    calls: Mutex<Vec<PageQuery>>,
}

impl<T> MemorySource<T>
where
    T: Entity + Clone,
{
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            rows,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<PageQuery> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn matching(&self, search: &str) -> Vec<&T> {
        let needle = search.trim().to_lowercase();
        self.rows
            .iter()
            .filter(|row| needle.is_empty() || row.label().to_lowercase().contains(&needle))
            .collect()
    }
}

impl<T> PageSource<T> for MemorySource<T>
where
    T: Entity + Clone + Send + Sync,
{
    fn fetch_page(&self, query: &PageQuery) -> Result<Page<T>, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.clone());
        }

        let limit = query.limit.max(1);
        let matching = self.matching(&query.search);
        let pages = page_count(matching.len(), limit);
        let page = query.page.clamp(1, pages);
        let items = matching
            .iter()
            .skip((page - 1) * limit)
            .take(limit)
            .map(|row| (*row).clone())
            .collect();
        Ok(Page {
            items,
            page,
            pages,
            total: matching.len(),
            limit,
        })
    }
}

/// [`PageSource`] that always fails with the same message.
#[derive(Debug, Clone)]
pub struct FailingSource {
    message: String,
}

impl FailingSource {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<T> PageSource<T> for FailingSource {
    fn fetch_page(&self, _query: &PageQuery) -> Result<Page<T>, FetchError> {
        Err(FetchError::new(self.message.clone()))
    }
}

/// Form values that pass the schema of `kind`.
pub fn valid_form(kind: EntityKind) -> FormValues {
    let raw = match kind {
        EntityKind::Part => json!({
            "name": "Premium brake pad",
            "sku": "BP-0101",
            "price": "42.50",
            "stock": "12",
        }),
        EntityKind::Vehicle => json!({
            "make": "Toyota",
            "model": "Corolla",
            "year": 2019,
            "vin": "JTDBR32E720123456",
            "manufacturer": "manufacturer-000",
            "fuelType": "fuel-type-000",
        }),
        EntityKind::Garage => json!({
            "name": "Northside Garage",
            "address": "12 Main St",
            "geo": {"lat": 51.5, "lng": -0.12},
            "contact": {"email": "north@garagedesk.example", "phone": "+44 1234 567890"},
        }),
        EntityKind::Service => json!({
            "name": "Oil change",
            "price": 59,
            "duration": 30,
            "parts": ["part-000"],
        }),
        EntityKind::ServicePackage => json!({
            "name": "Winter check",
            "price": 120,
            "discountPrice": 99,
            "services": ["service-000"],
            "garages": ["garage-000"],
        }),
        EntityKind::Manufacturer => json!({"name": "Bosch", "country": "Germany"}),
        EntityKind::FuelType => json!({"name": "Diesel", "description": "Road diesel"}),
    };
    FormValues::from_value(raw).unwrap_or_default()
}

/// Fresh directory plus the path `config.toml` would take inside it. The
/// file itself is not created.
pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("config.toml");
    Ok((dir, path))
}
