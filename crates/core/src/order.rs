use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Number of executor slots on every order.
pub const EXECUTOR_SLOTS: usize = 6;

/// Lifecycle status. Only the relational backend ever wrote anything but
/// `Active`; records without a status deserialize as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Active,
    /// Soft-deleted: kept in the store, hidden from exports and listings.
    Deleted,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "" => Some(Self::Active),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Production step bound to an executor slot. The slot index is the role;
/// there is no label stored on the executor itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorRole {
    Welder,
    Stamping,
    Flanging,
    Calibration,
    PlugWelder,
    Cutter,
}

impl ExecutorRole {
    pub const ALL: [ExecutorRole; EXECUTOR_SLOTS] = [
        Self::Welder,
        Self::Stamping,
        Self::Flanging,
        Self::Calibration,
        Self::PlugWelder,
        Self::Cutter,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::Welder => 0,
            Self::Stamping => 1,
            Self::Flanging => 2,
            Self::Calibration => 3,
            Self::PlugWelder => 4,
            Self::Cutter => 5,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Stable machine key, used by the CLI (`--executor welder=...`).
    pub fn key(&self) -> &'static str {
        match self {
            Self::Welder => "welder",
            Self::Stamping => "stamping",
            Self::Flanging => "flanging",
            Self::Calibration => "calibration",
            Self::PlugWelder => "plug-welder",
            Self::Cutter => "cutter",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL.iter().copied().find(|r| r.key() == key)
    }
}

impl std::fmt::Display for ExecutorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Executor {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
}

static EMPTY_EXECUTOR: Executor = Executor { name: String::new(), date: String::new() };

impl Executor {
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        Self { name: name.into(), date: date.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.date.is_empty()
    }
}

/// Pad or truncate to exactly [`EXECUTOR_SLOTS`] entries.
pub fn normalize_executors(mut executors: Vec<Executor>) -> Vec<Executor> {
    executors.truncate(EXECUTOR_SLOTS);
    executors.resize_with(EXECUTOR_SLOTS, Executor::default);
    executors
}

fn default_executors() -> Vec<Executor> {
    normalize_executors(Vec::new())
}

fn deserialize_executors<'de, D>(deserializer: D) -> Result<Vec<Executor>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<Vec<Option<Executor>>> = Option::deserialize(deserializer)?;
    let slots = raw
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();
    Ok(normalize_executors(slots))
}

/// Accepts a string, a number or a bool as its text form; `null` reads as "".
/// Backups written by other clients carry numeric dimensions and null dates.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct LenientString;

    impl<'de> serde::de::Visitor<'de> for LenientString {
        type Value = String;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a string, number, bool or null")
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: serde::de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<String, E> {
            // 1200.0 prints as "1200", the way a browser would write it.
            if v.fract() == 0.0 && v.abs() < 1e15 {
                Ok((v as i64).to_string())
            } else {
                Ok(v.to_string())
            }
        }

        fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }

        fn visit_some<D: serde::Deserializer<'de>>(self, d: D) -> Result<String, D::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(LenientString)
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<OrderStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<OrderStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// A manufacturing order as stored and exported.
///
/// Every attribute except the identity is a free-form string; the stores do
/// not interpret dimensions or dates. Field names serialize in camelCase,
/// which is also the backup file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_number: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub diameter: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub thickness: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub type_size: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cutting: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bottom_number: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub material: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub heat_treatment: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub treatment_date: String,
    #[serde(default = "default_executors", deserialize_with = "deserialize_executors")]
    pub executors: Vec<Executor>,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: String,
}

impl Order {
    /// Empty active order with a fresh id and no timestamps.
    pub fn new(order_number: impl Into<String>) -> Self {
        Self {
            id: new_order_id(),
            date: String::new(),
            order_number: order_number.into(),
            diameter: String::new(),
            thickness: String::new(),
            type_size: String::new(),
            cutting: String::new(),
            bottom_number: String::new(),
            material: String::new(),
            heat_treatment: String::new(),
            treatment_date: String::new(),
            executors: default_executors(),
            status: OrderStatus::Active,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    pub fn executor(&self, role: ExecutorRole) -> &Executor {
        self.executors.get(role.index()).unwrap_or(&EMPTY_EXECUTOR)
    }

    pub fn executor_mut(&mut self, role: ExecutorRole) -> &mut Executor {
        if self.executors.len() != EXECUTOR_SLOTS {
            self.executors = normalize_executors(std::mem::take(&mut self.executors));
        }
        &mut self.executors[role.index()]
    }

    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    /// String value of a top-level field, for sorting and lookups.
    pub fn field(&self, field: OrderField) -> &str {
        match field {
            OrderField::Id => &self.id,
            OrderField::Date => &self.date,
            OrderField::OrderNumber => &self.order_number,
            OrderField::Diameter => &self.diameter,
            OrderField::Thickness => &self.thickness,
            OrderField::TypeSize => &self.type_size,
            OrderField::Cutting => &self.cutting,
            OrderField::BottomNumber => &self.bottom_number,
            OrderField::Material => &self.material,
            OrderField::HeatTreatment => &self.heat_treatment,
            OrderField::TreatmentDate => &self.treatment_date,
            OrderField::Status => self.status.as_str(),
            OrderField::CreatedAt => &self.created_at,
            OrderField::UpdatedAt => &self.updated_at,
        }
    }
}

/// Scalar order fields addressable by name (sorting, lookups, CSV columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderField {
    Id,
    Date,
    OrderNumber,
    Diameter,
    Thickness,
    TypeSize,
    Cutting,
    BottomNumber,
    Material,
    HeatTreatment,
    TreatmentDate,
    Status,
    CreatedAt,
    UpdatedAt,
}

impl OrderField {
    pub const ALL: [OrderField; 14] = [
        Self::Id,
        Self::Date,
        Self::OrderNumber,
        Self::Diameter,
        Self::Thickness,
        Self::TypeSize,
        Self::Cutting,
        Self::BottomNumber,
        Self::Material,
        Self::HeatTreatment,
        Self::TreatmentDate,
        Self::Status,
        Self::CreatedAt,
        Self::UpdatedAt,
    ];

    /// camelCase key as used in JSON.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Date => "date",
            Self::OrderNumber => "orderNumber",
            Self::Diameter => "diameter",
            Self::Thickness => "thickness",
            Self::TypeSize => "typeSize",
            Self::Cutting => "cutting",
            Self::BottomNumber => "bottomNumber",
            Self::Material => "material",
            Self::HeatTreatment => "heatTreatment",
            Self::TreatmentDate => "treatmentDate",
            Self::Status => "status",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.key().eq_ignore_ascii_case(key))
    }
}

impl std::fmt::Display for OrderField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Business key used to find an existing record during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LookupField {
    #[default]
    OrderNumber,
    BottomNumber,
}

impl LookupField {
    pub fn field(&self) -> OrderField {
        match self {
            Self::OrderNumber => OrderField::OrderNumber,
            Self::BottomNumber => OrderField::BottomNumber,
        }
    }
}

impl std::fmt::Display for LookupField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field().key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Opaque record id (UUID v4).
pub fn new_order_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current UTC time, millisecond precision, `Z` suffix.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
