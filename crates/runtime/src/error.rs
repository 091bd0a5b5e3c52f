//! Error types.

use geoplace_topology::TopologyError;
use thiserror::Error;

use crate::entity::EntityKind;

/// Errors surfaced by the registry, the loader and the placement core.
///
/// Unreachable regions and services that fit nowhere are not errors: they are scored as SLA
/// violations by [World::compute_metrics](crate::world::World::compute_metrics).
#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} {id} not found")]
    EntityNotFound { kind: EntityKind, id: usize },

    #[error("relationship '{relationship}' of {kind} {id} is invalid: {reason}")]
    InvalidRelationship {
        kind: EntityKind,
        id: usize,
        relationship: String,
        reason: String,
    },

    #[error("attributes of {kind} {id} are invalid: {reason}")]
    InvalidAttribute { kind: EntityKind, id: usize, reason: String },

    #[error("unknown component class '{0}'")]
    UnknownComponentClass(String),

    #[error("data center {data_center} has no allocation cost for service kind '{label}'")]
    MissingAllocationCost { data_center: usize, label: String },

    #[error("invalid placement: {0}")]
    InvalidPlacement(String),

    #[error("unknown placement strategy '{0}'")]
    UnknownStrategy(String),

    #[error("experiment failed: {0}")]
    Experiment(String),

    #[error("invalid value '{value}' for parameter '{name}'")]
    InvalidParameter { name: String, value: String },

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
