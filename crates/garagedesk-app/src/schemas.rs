// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use regex::Regex;
use time::OffsetDateTime;

use crate::EntityKind;
use crate::rules::{FieldRules, ValidationSchema, parse_number};

pub const MAX_PART_IMAGE_SIZE: u64 = 5 << 20;
pub const MAX_LOGO_SIZE: u64 = 2 << 20;

const IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
const LOGO_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/svg+xml"];

const EARLIEST_MODEL_YEAR: i32 = 1900;

impl EntityKind {
    /// Validation schema for the create/edit form of this entity.
    pub fn schema(self) -> ValidationSchema {
        match self {
            Self::Part => part_schema(),
            Self::Vehicle => vehicle_schema(OffsetDateTime::now_utc().year()),
            Self::Garage => garage_schema(),
            Self::Service => service_schema(),
            Self::ServicePackage => service_package_schema(),
            Self::Manufacturer => manufacturer_schema(),
            Self::FuelType => fuel_type_schema(),
        }
    }
}

pub fn part_schema() -> ValidationSchema {
    let sku = Regex::new(r"^[A-Z0-9-]{3,32}$").expect("sku pattern is valid");
    ValidationSchema::new()
        .field(
            "name",
            FieldRules::text()
                .required()
                .min_length(2)
                .max_length(100)
                .label("Name"),
        )
        .field(
            "sku",
            FieldRules::text()
                .pattern(sku, "must be 3-32 uppercase letters, digits or dashes")
                .label("SKU"),
        )
        .field(
            "price",
            FieldRules::number().required().min(0.0).label("Price"),
        )
        .field(
            "stock",
            FieldRules::number().integer().min(0.0).label("Stock"),
        )
        .field(
            "image",
            FieldRules::file()
                .max_size(MAX_PART_IMAGE_SIZE)
                .allowed_types(IMAGE_TYPES)
                .label("Image"),
        )
}

/// `current_year` bounds the model year; next year's models are accepted.
pub fn vehicle_schema(current_year: i32) -> ValidationSchema {
    let vin = Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").expect("vin pattern is valid");
    ValidationSchema::new()
        .field("make", FieldRules::text().required().max_length(50).label("Make"))
        .field(
            "model",
            FieldRules::text().required().max_length(50).label("Model"),
        )
        .field(
            "year",
            FieldRules::number()
                .integer()
                .min(f64::from(EARLIEST_MODEL_YEAR))
                .max(f64::from(current_year + 1))
                .label("Year"),
        )
        .field(
            "vin",
            FieldRules::text()
                .pattern(vin, "must be 17 characters without I, O or Q")
                .label("VIN"),
        )
        .field(
            "manufacturer",
            FieldRules::text().required().label("Manufacturer"),
        )
        .field("fuelType", FieldRules::text().required().label("Fuel type"))
}

pub fn garage_schema() -> ValidationSchema {
    let phone = Regex::new(r"^\+?[0-9 ()-]{7,20}$").expect("phone pattern is valid");
    ValidationSchema::new()
        .field("name", FieldRules::text().required().max_length(100).label("Name"))
        .field(
            "address",
            FieldRules::text().required().max_length(200).label("Address"),
        )
        .field(
            "geo.lat",
            FieldRules::number().min(-90.0).max(90.0).label("Latitude"),
        )
        .field(
            "geo.lng",
            FieldRules::number().min(-180.0).max(180.0).label("Longitude"),
        )
        .field("contact.email", FieldRules::email().label("Email"))
        .field(
            "contact.phone",
            FieldRules::text()
                .pattern(phone, "must be a valid phone number")
                .label("Phone"),
        )
}

pub fn service_schema() -> ValidationSchema {
    ValidationSchema::new()
        .field("name", FieldRules::text().required().max_length(100).label("Name"))
        .field(
            "description",
            FieldRules::text().max_length(1000).label("Description"),
        )
        .field(
            "price",
            FieldRules::number().required().min(0.0).label("Price"),
        )
        .field(
            "duration",
            FieldRules::number()
                .integer()
                .min(1.0)
                .max(1440.0)
                .label("Duration"),
        )
        .field("parts", FieldRules::text().required().label("Parts"))
}

pub fn service_package_schema() -> ValidationSchema {
    ValidationSchema::new()
        .field("name", FieldRules::text().required().max_length(100).label("Name"))
        .field(
            "price",
            FieldRules::number().required().min(0.0).label("Price"),
        )
        .field(
            "discountPrice",
            FieldRules::number()
                .min(0.0)
                .label("Discount price")
                .custom(|value, all| {
                    let price = all.lookup("price").and_then(parse_number)?;
                    let discount = parse_number(value)?;
                    (discount > price)
                        .then(|| "Discount price must not exceed the package price".to_owned())
                }),
        )
        .field("services", FieldRules::text().required().label("Services"))
        .field("garages", FieldRules::text().required().label("Garages"))
}

pub fn manufacturer_schema() -> ValidationSchema {
    ValidationSchema::new()
        .field("name", FieldRules::text().required().max_length(100).label("Name"))
        .field("country", FieldRules::text().max_length(56).label("Country"))
        .field(
            "logo",
            FieldRules::file()
                .max_size(MAX_LOGO_SIZE)
                .allowed_types(LOGO_TYPES)
                .label("Logo"),
        )
}

pub fn fuel_type_schema() -> ValidationSchema {
    ValidationSchema::new()
        .field("name", FieldRules::text().required().max_length(50).label("Name"))
        .field(
            "description",
            FieldRules::text().max_length(500).label("Description"),
        )
}
