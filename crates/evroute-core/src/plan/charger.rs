//! Charger metadata attached to charge stops

use serde::{Deserialize, Serialize};

/// A charging station
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Charger {
    /// Charger id, stable across plans
    pub id: u64,
    /// Name in `"Name [Operator]"` form
    #[serde(default)]
    pub name: String,
    /// Charging network the charger belongs to
    #[serde(default)]
    pub network_id: Option<u64>,
    /// Outlet groups
    #[serde(default)]
    pub outlets: Vec<Outlet>,
}

impl Charger {
    /// `(available, total)` stalls for outlets of `outlet_type`.
    ///
    /// Matching is case-insensitive; with no type every outlet counts.
    /// Outlets that do not report availability contribute to the total only.
    /// Returns `None` when nothing matches or no outlet reports availability.
    pub fn occupancy(&self, outlet_type: Option<&str>) -> Option<(u32, u32)> {
        let mut available: u32 = 0;
        let mut total: u32 = 0;
        let mut reported = false;

        for outlet in self
            .outlets
            .iter()
            .filter(|o| outlet_type.map_or(true, |t| o.outlet_type.eq_ignore_ascii_case(t)))
        {
            total = total.saturating_add(outlet.stalls);
            if let Some(free) = outlet.available {
                available = available.saturating_add(free.min(outlet.stalls));
                reported = true;
            }
        }

        (reported && total > 0).then_some((available, total))
    }
}

/// A group of identical outlets at a charger
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Outlet {
    /// Connector type, e.g. `"ccs"`, `"chademo"`, `"type2"`
    pub outlet_type: String,
    /// Number of stalls
    pub stalls: u32,
    /// Stalls currently free, if the operator reports it
    #[serde(default)]
    pub available: Option<u32>,
}
