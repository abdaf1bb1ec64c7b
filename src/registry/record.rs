//! Settlement record
//!
//! One peer-contributed settlement tuple.

use std::fmt;

use crate::error::{RegistryError, Result};

/// A settlement shared by a connected client
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementRecord {
    /// Id of the owning client
    pub client_id: u32,

    /// Settlement name
    pub name: String,

    /// Settlement template, e.g. "Mars Direct Base (phase 1)"
    pub template: String,

    /// Number of settlers
    pub population: u32,

    /// Number of robots
    pub num_robots: u32,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,
}

impl SettlementRecord {
    /// Create a validated record
    ///
    /// Text fields are trimmed and must be non-empty and free of the
    /// `&` separator and line breaks; coordinates must be finite.
    pub fn new(
        client_id: u32,
        name: impl Into<String>,
        template: impl Into<String>,
        population: u32,
        num_robots: u32,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self> {
        let record = Self {
            client_id,
            name: name.into().trim().to_string(),
            template: template.into().trim().to_string(),
            population,
            num_robots,
            latitude,
            longitude,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check that the record can travel over the wire unchanged
    pub fn validate(&self) -> Result<()> {
        if self.client_id == 0 {
            return Err(RegistryError::InvalidRecord(
                "client id must be positive".to_string(),
            ));
        }
        check_text("name", &self.name)?;
        check_text("template", &self.template)?;
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(RegistryError::InvalidRecord(format!(
                "coordinates must be finite (lat={}, lon={})",
                self.latitude, self.longitude
            )));
        }
        Ok(())
    }

    /// Same record with a different owner
    pub fn with_client_id(mut self, client_id: u32) -> Self {
        self.client_id = client_id;
        self
    }
}

fn check_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RegistryError::InvalidRecord(format!("{} is empty", field)));
    }
    if value.contains('&') || value.contains('\n') || value.contains('\r') {
        return Err(RegistryError::InvalidRecord(format!(
            "{} contains a separator or line break: {:?}",
            field, value
        )));
    }
    Ok(())
}

impl fmt::Display for SettlementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} ({}) pop={} bots={} at ({}, {})",
            self.client_id,
            self.name,
            self.template,
            self.population,
            self.num_robots,
            self.latitude,
            self.longitude
        )
    }
}
