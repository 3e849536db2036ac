//! Property storage trait (businesses, units, residents). Read-only here.

use crate::StoreError;
use agora_types::{Business, BusinessId, PropertyUnit, PropertyUnitId, Resident, ResidentId};

pub trait PropertyStore {
    fn get_business(&self, id: BusinessId) -> Result<Business, StoreError>;

    fn get_property_unit(&self, id: PropertyUnitId) -> Result<PropertyUnit, StoreError>;

    /// All units of a business, in storage order.
    fn list_property_units(&self, business: BusinessId) -> Result<Vec<PropertyUnit>, StoreError>;

    fn get_resident(&self, id: ResidentId) -> Result<Resident, StoreError>;

    /// Residents registered in one unit, active or not.
    fn list_unit_residents(&self, unit: PropertyUnitId) -> Result<Vec<Resident>, StoreError>;
}
