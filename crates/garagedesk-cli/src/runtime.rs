// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use garagedesk_api::{Client, EntitySource};
use garagedesk_app::{
    Entity, EntityKind, FormState, FormValues, FuelType, Garage, IdSet, Manufacturer, PageSource,
    Part, SelectionController, SelectorDriver, Service, ServicePackage, Vehicle,
};
use garagedesk_testkit::{DemoCatalog, MemorySource};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListArgs {
    pub search: String,
    pub page: usize,
    pub limit: Option<usize>,
}

impl Default for ListArgs {
    fn default() -> Self {
        Self {
            search: String::new(),
            page: 1,
            limit: None,
        }
    }
}

enum Backend {
    Demo(DemoCatalog),
    Remote(Client),
}

pub struct Runtime {
    backend: Backend,
    page_size: usize,
    debounce: Duration,
    wait: Duration,
}

/// Record types the CLI can list.
trait Listable: Entity + Clone + DeserializeOwned + Send + Sync + 'static {
    fn demo_rows(catalog: &DemoCatalog) -> &[Self];
}

macro_rules! listable {
    ($($ty:ty => $field:ident),+ $(,)?) => {
        $(
            impl Listable for $ty {
                fn demo_rows(catalog: &DemoCatalog) -> &[Self] {
                    &catalog.$field
                }
            }
        )+
    };
}

listable! {
    Part => parts,
    Vehicle => vehicles,
    Garage => garages,
    Service => services,
    ServicePackage => service_packages,
    Manufacturer => manufacturers,
    FuelType => fuel_types,
}

impl Runtime {
    pub fn demo(catalog: DemoCatalog, page_size: usize, debounce: Duration) -> Self {
        Self {
            backend: Backend::Demo(catalog),
            page_size,
            debounce,
            wait: debounce + Duration::from_secs(2),
        }
    }

    pub fn remote(client: Client, page_size: usize, debounce: Duration) -> Self {
        let wait = debounce + client.timeout() * 2;
        Self {
            backend: Backend::Remote(client),
            page_size,
            debounce,
            wait,
        }
    }

    /// Drives a selector through open, search and page change, then prints
    /// the page it settled on.
    pub fn list<W: Write>(&self, kind: EntityKind, args: &ListArgs, out: &mut W) -> Result<()> {
        match kind {
            EntityKind::Part => self.list_as::<Part, W>(kind, args, out),
            EntityKind::Vehicle => self.list_as::<Vehicle, W>(kind, args, out),
            EntityKind::Garage => self.list_as::<Garage, W>(kind, args, out),
            EntityKind::Service => self.list_as::<Service, W>(kind, args, out),
            EntityKind::ServicePackage => self.list_as::<ServicePackage, W>(kind, args, out),
            EntityKind::Manufacturer => self.list_as::<Manufacturer, W>(kind, args, out),
            EntityKind::FuelType => self.list_as::<FuelType, W>(kind, args, out),
        }
    }

    fn list_as<T, W>(&self, kind: EntityKind, args: &ListArgs, out: &mut W) -> Result<()>
    where
        T: Listable,
        W: Write,
    {
        let source: Arc<dyn PageSource<T>> = match &self.backend {
            Backend::Demo(catalog) => Arc::new(MemorySource::new(T::demo_rows(catalog).to_vec())),
            Backend::Remote(client) => Arc::new(EntitySource::<T>::new(client.clone(), kind)),
        };
        let limit = args.limit.unwrap_or(self.page_size).max(1);
        let controller = SelectionController::with_debounce(limit, self.debounce);
        let mut driver = SelectorDriver::new(controller, source);

        driver.open(IdSet::new());
        self.settle(&mut driver, kind)?;

        let search = args.search.trim();
        if !search.is_empty() {
            driver.set_search_text(search, Instant::now());
            self.settle(&mut driver, kind)?;
        }

        if args.page != driver.controller().page() {
            let pages = driver.controller().pages();
            if !(1..=pages).contains(&args.page) {
                driver.cancel();
                bail!(
                    "page {} is out of range for {}; there are {} page(s)",
                    args.page,
                    kind.collection(),
                    pages
                );
            }
            driver.change_page(args.page);
            self.settle(&mut driver, kind)?;
        }

        let controller = driver.controller();
        writeln!(
            out,
            "{} -- page {}/{}, {} total",
            kind.title(),
            controller.page(),
            controller.pages(),
            controller.total()
        )?;
        for item in controller.items() {
            writeln!(out, "{}\t{}", item.entity_id(), item.label())?;
        }
        driver.cancel();
        Ok(())
    }

    fn settle<T>(&self, driver: &mut SelectorDriver<T>, kind: EntityKind) -> Result<()>
    where
        T: Entity + Send + 'static,
    {
        if !driver.wait_idle(self.wait) {
            driver.cancel();
            bail!(
                "timed out after {:?} waiting for {}",
                self.wait,
                kind.collection()
            );
        }
        if let Some(error) = driver.controller().error() {
            let message = error.to_owned();
            driver.cancel();
            bail!("list {}: {message}", kind.collection());
        }
        Ok(())
    }

    /// Runs the entity schema through a submit that sends nothing. Prints
    /// one line per failing field and returns whether the values passed.
    pub fn validate<W: Write>(
        &self,
        kind: EntityKind,
        values: FormValues,
        out: &mut W,
    ) -> Result<bool> {
        let mut form = FormState::new(kind.schema(), values);
        if form.submit(|_| Ok(())) {
            writeln!(out, "{} record is valid", kind.as_str())?;
            return Ok(true);
        }
        print_errors(&form, out)?;
        Ok(false)
    }

    /// Validates, then creates or updates the record. Returns false when
    /// validation blocked the submit.
    pub fn submit<W: Write>(&self, kind: EntityKind, values: FormValues, out: &mut W) -> Result<bool> {
        let mut form = FormState::new(kind.schema(), values);
        let Some(payload) = form.begin_submit() else {
            print_errors(&form, out)?;
            return Ok(false);
        };

        let result = match &self.backend {
            Backend::Remote(client) => client.save(kind, &payload),
            Backend::Demo(_) => Ok(demo_echo(&payload)),
        };
        let record = match result {
            Ok(record) => {
                form.finish_submit(Ok(()));
                record
            }
            Err(error) => {
                let message = format!("{error:#}");
                form.finish_submit(Err(error));
                bail!("submit {}: {message}", kind.collection());
            }
        };

        info!(collection = kind.collection(), "record saved");
        if matches!(self.backend, Backend::Demo(_)) {
            writeln!(out, "demo mode: nothing was sent")?;
        }
        writeln!(
            out,
            "{}",
            serde_json::to_string_pretty(&record).context("encode saved record")?
        )?;
        Ok(true)
    }
}

fn demo_echo(values: &FormValues) -> Value {
    values.clone().into_value()
}

fn print_errors<W: Write>(form: &FormState, out: &mut W) -> Result<()> {
    debug!(errors = form.errors().len(), "validation failed");
    for (field, message) in form.errors() {
        writeln!(out, "{field}: {message}")?;
    }
    Ok(())
}

pub fn read_form(path: &Path) -> Result<FormValues> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read record file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parse JSON record {}", path.display()))?;
    FormValues::from_value(value)
        .ok_or_else(|| anyhow!("{} must contain a JSON object", path.display()))
}
