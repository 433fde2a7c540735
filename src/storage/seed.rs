// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service catalog seeding.
//!
//! The catalog has no write endpoint. Operators provide it as a JSON array
//! of services:
//!
//! ```json
//! [
//!   {"serviceId": "svc1", "name": "GPU Inference", "provider": "Acme AI",
//!    "price": 2.5, "priceInAITK": 10, "active": true}
//! ]
//! ```

use std::path::Path;

use super::records::Service;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid seed file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate serviceId in seed file: {0}")]
    DuplicateId(String),
}

/// Read the services listed in a seed file.
pub fn load_services(path: &Path) -> Result<Vec<Service>, SeedError> {
    let data = std::fs::read_to_string(path)?;
    parse_services(&data)
}

fn parse_services(data: &str) -> Result<Vec<Service>, SeedError> {
    let services: Vec<Service> = serde_json::from_str(data)?;

    let mut seen = std::collections::HashSet::new();
    for service in &services {
        if !seen.insert(service.service_id.as_str()) {
            return Err(SeedError::DuplicateId(service.service_id.clone()));
        }
    }

    Ok(services)
}
