// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Scripted in-memory provider for reconciler tests.
//!
//! Holds zones and records in maps, records every call it receives, and can
//! be told to fail specific operations or to return the update-integrity
//! `None`. Test-only.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{ProviderClient, ProviderError, Record, Zone};

#[derive(Default)]
struct Inner {
    zones: HashMap<String, Zone>,
    records: HashMap<String, Record>,
    fail_ops: HashSet<&'static str>,
    update_returns_none: bool,
    next_id: u32,
    calls: Vec<String>,
}

/// Configurable mock provider.
#[derive(Default)]
pub struct MockClient {
    inner: Mutex<Inner>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a zone, keyed by its name.
    pub fn with_zone(self, zone: Zone) -> Self {
        self.inner
            .lock()
            .unwrap()
            .zones
            .insert(zone.name.clone(), zone);
        self
    }

    /// Seed a record, keyed by its id.
    pub fn with_record(self, record: Record) -> Self {
        self.inner
            .lock()
            .unwrap()
            .records
            .insert(record.id.clone(), record);
        self
    }

    /// Force an operation (`"GetZone"`, `"Create"`, ...) to fail.
    pub fn failing(self, op: &'static str) -> Self {
        self.inner.lock().unwrap().fail_ops.insert(op);
        self
    }

    /// Make `update` return `Ok(None)` (integrity failure).
    pub fn update_returning_none(self) -> Self {
        self.inner.lock().unwrap().update_returns_none = true;
        self
    }

    /// Every call received so far, in order, formatted as `Op(args)`.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Current record set, for asserting deletions.
    pub fn records(&self) -> Vec<Record> {
        self.inner.lock().unwrap().records.values().cloned().collect()
    }

    fn check_fail(inner: &Inner, op: &'static str) -> Result<(), ProviderError> {
        if inner.fail_ops.contains(op) {
            return Err(ProviderError::Api {
                status: 500,
                message: format!("scripted {op} failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderClient for MockClient {
    async fn get_zone(&self, zone_name: &str) -> Result<Option<Zone>, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("GetZone({zone_name})"));
        Self::check_fail(&inner, "GetZone")?;
        Ok(inner.zones.get(zone_name).cloned())
    }

    async fn get_by_name(
        &self,
        name: &str,
        zone_id: &str,
    ) -> Result<Option<Record>, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("GetByName({name}, {zone_id})"));
        Self::check_fail(&inner, "GetByName")?;
        Ok(inner
            .records
            .values()
            .find(|r| r.name == name && r.zone_id == zone_id)
            .cloned())
    }

    async fn get(&self, id: &str, zone_id: &str) -> Result<Option<Record>, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("Get({id}, {zone_id})"));
        Self::check_fail(&inner, "Get")?;
        Ok(inner.records.get(id).cloned())
    }

    async fn create(
        &self,
        name: &str,
        zone_id: &str,
        record_type: &str,
        records: &[String],
        ttl: i64,
    ) -> Result<Record, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("Create({name}, {zone_id})"));
        Self::check_fail(&inner, "Create")?;

        inner.next_id += 1;
        let zone_name = inner
            .zones
            .values()
            .find(|z| z.id == zone_id)
            .map(|z| z.name.clone())
            .unwrap_or_default();
        let record = Record {
            id: format!("mock-{}", inner.next_id),
            name: name.to_string(),
            r#type: record_type.to_string(),
            records: records.to_vec(),
            ttl,
            zone_id: zone_id.to_string(),
            zone_name: zone_name.clone(),
            fqdn: format!("{name}.{zone_name}."),
            activated: true,
        };
        inner.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        zone_id: &str,
        record_type: &str,
        records: &[String],
        ttl: i64,
    ) -> Result<Option<Record>, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("Update({id}, {zone_id})"));
        Self::check_fail(&inner, "Update")?;
        if inner.update_returns_none {
            return Ok(None);
        }

        let Some(record) = inner.records.get_mut(id) else {
            return Ok(None);
        };
        record.r#type = record_type.to_string();
        record.records = records.to_vec();
        record.ttl = ttl;
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: &str, zone_id: &str) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("Delete({id}, {zone_id})"));
        Self::check_fail(&inner, "Delete")?;
        // deleting an absent record is success
        inner.records.remove(id);
        Ok(())
    }
}
