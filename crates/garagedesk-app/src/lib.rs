// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod debounce;
pub mod driver;
pub mod forms;
pub mod ids;
pub mod model;
pub mod page;
pub mod path;
pub mod rules;
pub mod schemas;
pub mod selection;
pub mod selector;

pub use debounce::*;
pub use driver::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use page::*;
pub use path::*;
pub use rules::{CustomRule, FieldRules, FileMeta, ValidationSchema, ValueKind};
pub use selection::*;
pub use selector::*;
