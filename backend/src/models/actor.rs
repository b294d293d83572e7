//! Actor kinds and the per-kind table conventions used to validate and
//! enrich activity log entries.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AuditError;

/// The three identities that can perform a logged action.
///
/// At the API boundary citizens are spelled `"user"`; that spelling is kept
/// for every string conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKind {
    Admin,
    Staff,
    Citizen,
}

impl ActorKind {
    pub const ALL: [ActorKind; 3] = [ActorKind::Admin, ActorKind::Staff, ActorKind::Citizen];

    /// Returns the boundary spelling of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::Admin => "admin",
            ActorKind::Staff => "staff",
            ActorKind::Citizen => "user",
        }
    }

    /// Table layout and active-status convention for this kind.
    pub fn table(&self) -> &'static ActorTable {
        match self {
            ActorKind::Admin => &ADMIN_TABLE,
            ActorKind::Staff => &STAFF_TABLE,
            ActorKind::Citizen => &CITIZEN_TABLE,
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ActorKind::Admin),
            "staff" => Ok(ActorKind::Staff),
            "user" => Ok(ActorKind::Citizen),
            other => Err(AuditError::UnknownActorKind(other.to_string())),
        }
    }
}

impl Serialize for ActorKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActorKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| serde::de::Error::unknown_variant(&s, &["admin", "staff", "user"]))
    }
}

/// A reference to exactly one actor record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ActorRef {
    Admin(i64),
    Staff(i64),
    #[serde(rename = "user")]
    Citizen(i64),
}

impl ActorRef {
    pub fn new(kind: ActorKind, id: i64) -> Self {
        match kind {
            ActorKind::Admin => ActorRef::Admin(id),
            ActorKind::Staff => ActorRef::Staff(id),
            ActorKind::Citizen => ActorRef::Citizen(id),
        }
    }

    pub fn kind(&self) -> ActorKind {
        match self {
            ActorRef::Admin(_) => ActorKind::Admin,
            ActorRef::Staff(_) => ActorKind::Staff,
            ActorRef::Citizen(_) => ActorKind::Citizen,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            ActorRef::Admin(id) | ActorRef::Staff(id) | ActorRef::Citizen(id) => *id,
        }
    }

    /// Splits the reference into the `(admin_id, staff_id, user_id)` column
    /// triple stored on an activity log row. Exactly one is `Some`.
    pub fn columns(&self) -> (Option<i64>, Option<i64>, Option<i64>) {
        match self {
            ActorRef::Admin(id) => (Some(*id), None, None),
            ActorRef::Staff(id) => (None, Some(*id), None),
            ActorRef::Citizen(id) => (None, None, Some(*id)),
        }
    }

    /// Rebuilds a reference from a stored column triple. Returns `None` when
    /// the row does not carry exactly one reference.
    pub fn from_columns(
        admin_id: Option<i64>,
        staff_id: Option<i64>,
        user_id: Option<i64>,
    ) -> Option<Self> {
        match (admin_id, staff_id, user_id) {
            (Some(id), None, None) => Some(ActorRef::Admin(id)),
            (None, Some(id), None) => Some(ActorRef::Staff(id)),
            (None, None, Some(id)) => Some(ActorRef::Citizen(id)),
            _ => None,
        }
    }
}

/// Where an actor kind lives and how that table marks a row as active.
///
/// The three tables grew independently, so each has its own status
/// representation and display-name column.
#[derive(Debug)]
pub struct ActorTable {
    /// Actor table name.
    pub table: &'static str,
    /// Short alias used when the table is joined into activity log queries.
    pub alias: &'static str,
    /// Column on `activity_logs` referencing this table.
    pub reference_column: &'static str,
    /// Column holding the actor's display name.
    pub name_column: &'static str,
    /// SQL predicate (unqualified) selecting active rows.
    pub active_predicate: &'static str,
}

static ADMIN_TABLE: ActorTable = ActorTable {
    table: "admins",
    alias: "a",
    reference_column: "admin_id",
    name_column: "name",
    active_predicate: "status = 'active'",
};

static STAFF_TABLE: ActorTable = ActorTable {
    table: "staff",
    alias: "s",
    reference_column: "staff_id",
    name_column: "name",
    active_predicate: "is_active = TRUE",
};

static CITIZEN_TABLE: ActorTable = ActorTable {
    table: "users",
    alias: "u",
    reference_column: "user_id",
    name_column: "full_name",
    active_predicate: "status = 'active'",
};
