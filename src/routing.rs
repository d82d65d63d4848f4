//! # Channel Routing Module
//!
//! Maps a row's `channel_id` to a bucket tag. Two tables exist:
//!
//! - the **web** table: exact match against a few literal codes, everything else overflows;
//! - the **broker** table: numeric ids grouped by tag, non-numeric and unmapped ids overflow.
//!
//! Both tables are total. They are versioned data: the built-in version mirrors the current
//! business rules, and operators can supply a JSON file instead (see [`RoutingTables::load`]).
//!
//! ## JSON format
//!
//! ```json
//! {
//!   "version": "2025-10",
//!   "web": {
//!     "codes": [{ "code": "15883", "fragment": "ББ" }],
//!     "overflow": "ББ ДОП_3"
//!   },
//!   "broker": {
//!     "groups": [{ "fragment": "КР 1", "ids": [12063] }],
//!     "overflow": "КР ДОП_10"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::info;

use crate::errors::PipelineError;

/// Version label of the built-in tables
pub const BUILTIN_VERSION: &str = "builtin-2025-07";

/// Which routing table a split file uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelTable {
    Web,
    Broker,
}

/// A literal channel code of the web table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCode {
    pub code: String,
    pub fragment: String,
}

/// Exact-match table with an overflow fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebRoutingTable {
    pub codes: Vec<ChannelCode>,
    pub overflow: String,
}

impl WebRoutingTable {
    /// Route a channel id; surrounding whitespace is ignored
    pub fn route(&self, channel_id: &str) -> &str {
        let channel_id = channel_id.trim();
        self.codes
            .iter()
            .find(|entry| entry.code == channel_id)
            .map(|entry| entry.fragment.as_str())
            .unwrap_or(&self.overflow)
    }
}

impl Default for WebRoutingTable {
    fn default() -> Self {
        let codes = [("15883", "ББ"), ("15686", "ББ ДОП_1"), ("15273", "ББ ДОП_2")]
            .into_iter()
            .map(|(code, fragment)| ChannelCode {
                code: code.to_string(),
                fragment: fragment.to_string(),
            })
            .collect();

        Self {
            codes,
            overflow: "ББ ДОП_3".to_string(),
        }
    }
}

/// A tag of the broker table with the numeric channel ids routed to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerGroup {
    pub fragment: String,
    pub ids: BTreeSet<u64>,
}

/// Ordered list of id groups with an overflow fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerRoutingTable {
    pub groups: Vec<BrokerGroup>,
    pub overflow: String,
}

impl BrokerRoutingTable {
    /// Route a channel id.
    ///
    /// Only ids made entirely of ASCII digits are looked up; anything else, and any id
    /// missing from every group, goes to the overflow fragment.
    pub fn route(&self, channel_id: &str) -> &str {
        let channel_id = channel_id.trim();
        let numeric = !channel_id.is_empty() && channel_id.bytes().all(|b| b.is_ascii_digit());
        if !numeric {
            return &self.overflow;
        }

        // Digit strings too long for u64 cannot be in any group
        let Ok(id) = channel_id.parse::<u64>() else {
            return &self.overflow;
        };

        self.groups
            .iter()
            .find(|group| group.ids.contains(&id))
            .map(|group| group.fragment.as_str())
            .unwrap_or(&self.overflow)
    }
}

impl Default for BrokerRoutingTable {
    fn default() -> Self {
        let groups: [(&str, &[u64]); 9] = [
            ("КР ДОП_3", &[915, 917, 918, 919]),
            ("КР 1", &[12063]),
            ("КР 2", &[11896]),
            ("КР ДОП_4", &[3587, 7389, 7553, 8614, 8732]),
            (
                "КР ДОП_5",
                &[
                    9189, 9190, 9191, 9192, 9193, 9194, 9413, 9441, 9443, 9453, 9889, 9899,
                ],
            ),
            ("КР ДОП_6", &[10141, 10240]),
            ("КР ДОП_7", &[11682, 11729]),
            ("КР ДОП_8", &[12873]),
            ("КР ДОП_9", &[16263]),
        ];

        Self {
            groups: groups
                .into_iter()
                .map(|(fragment, ids)| BrokerGroup {
                    fragment: fragment.to_string(),
                    ids: ids.iter().copied().collect(),
                })
                .collect(),
            overflow: "КР ДОП_10".to_string(),
        }
    }
}

/// Both routing tables, with a version label for traceability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTables {
    pub version: String,
    pub web: WebRoutingTable,
    pub broker: BrokerRoutingTable,
}

impl Default for RoutingTables {
    fn default() -> Self {
        Self {
            version: BUILTIN_VERSION.to_string(),
            web: WebRoutingTable::default(),
            broker: BrokerRoutingTable::default(),
        }
    }
}

impl RoutingTables {
    /// Parse and validate tables from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        let tables: RoutingTables = serde_json::from_str(json)?;
        tables.validate()?;
        Ok(tables)
    }

    /// Load and validate tables from a JSON file
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Routing(format!("cannot read {}: {e}", path.display()))
        })?;
        let tables = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            version = %tables.version,
            broker_groups = tables.broker.groups.len(),
            "Loaded routing tables"
        );
        Ok(tables)
    }

    /// Route a channel id through the given table. Missing ids overflow.
    pub fn route(&self, table: ChannelTable, channel_id: Option<&str>) -> &str {
        match (table, channel_id) {
            (ChannelTable::Web, Some(id)) => self.web.route(id),
            (ChannelTable::Web, None) => &self.web.overflow,
            (ChannelTable::Broker, Some(id)) => self.broker.route(id),
            (ChannelTable::Broker, None) => &self.broker.overflow,
        }
    }

    /// Check the invariants every table version must keep.
    ///
    /// - fragments are non-empty and never contain `(`, which would break file name parsing
    /// - web codes are unique
    /// - broker id sets are pairwise disjoint
    pub fn validate(&self) -> Result<(), PipelineError> {
        let fragments = self
            .web
            .codes
            .iter()
            .map(|entry| entry.fragment.as_str())
            .chain(std::iter::once(self.web.overflow.as_str()))
            .chain(self.broker.groups.iter().map(|group| group.fragment.as_str()))
            .chain(std::iter::once(self.broker.overflow.as_str()));

        for fragment in fragments {
            if fragment.trim().is_empty() {
                return Err(PipelineError::Routing("empty fragment".to_string()));
            }
            if fragment.contains('(') {
                return Err(PipelineError::Routing(format!(
                    "fragment '{fragment}' must not contain '('"
                )));
            }
        }

        let mut codes = HashSet::new();
        for entry in &self.web.codes {
            if !codes.insert(entry.code.trim()) {
                return Err(PipelineError::Routing(format!(
                    "web code '{}' listed twice",
                    entry.code
                )));
            }
        }

        let mut owners: HashMap<u64, &str> = HashMap::new();
        for group in &self.broker.groups {
            for id in &group.ids {
                if let Some(owner) = owners.insert(*id, &group.fragment) {
                    return Err(PipelineError::Routing(format!(
                        "broker id {id} belongs to both '{owner}' and '{}'",
                        group.fragment
                    )));
                }
            }
        }

        Ok(())
    }
}
