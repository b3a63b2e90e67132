// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier shared by every entity collection. Selection sets and
/// form fields that reference other records store these.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<$name> for EntityId {
            fn from(value: $name) -> Self {
                EntityId(value.0)
            }
        }

        impl From<&$name> for EntityId {
            fn from(value: &$name) -> Self {
                EntityId(value.0.clone())
            }
        }
    };
}

entity_id!(PartId);
entity_id!(VehicleId);
entity_id!(GarageId);
entity_id!(ServiceId);
entity_id!(ServicePackageId);
entity_id!(ManufacturerId);
entity_id!(FuelTypeId);

#[cfg(test)]
mod tests {
    use super::{EntityId, GarageId, PartId};

    #[test]
    fn typed_ids_convert_into_entity_ids() {
        let part = PartId::new("p-1");
        assert_eq!(EntityId::from(&part), EntityId::new("p-1"));
        assert_eq!(EntityId::from(GarageId::from("g-9")).as_str(), "g-9");
    }

    #[test]
    fn entity_ids_serialize_as_plain_strings() {
        let encoded = serde_json::to_string(&EntityId::new("abc")).expect("id should serialize");
        assert_eq!(encoded, "\"abc\"");
    }
}
