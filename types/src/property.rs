//! Property-side records: the business, its units, and their residents.
//!
//! The voting engine only reads these; they are owned by the tenant
//! management side of the system.

use serde::{Deserialize, Serialize};

use crate::{BusinessId, Coefficient, PropertyUnitId, ResidentId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyUnit {
    pub id: PropertyUnitId,
    pub business_id: BusinessId,
    /// Display number, e.g. `"A10"` or `"302"`.
    pub number: String,
    pub participation_coefficient: Coefficient,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resident {
    pub id: ResidentId,
    pub name: String,
    /// National identity document number, used to prove identity.
    pub dni: String,
    pub property_unit_id: PropertyUnitId,
    #[serde(default)]
    pub is_main_resident: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Resident {
    /// Whether `dni` matches this resident's document, ignoring case and
    /// surrounding whitespace.
    pub fn dni_matches(&self, dni: &str) -> bool {
        self.dni.trim().eq_ignore_ascii_case(dni.trim())
    }
}

fn default_true() -> bool {
    true
}
