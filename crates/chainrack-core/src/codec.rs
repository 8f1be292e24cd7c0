//! Deterministic conversion between live instances and plain records.
//!
//! Records carry only the type id, enabled flag, parameters and routing.
//! Contexts are never serialized; deserializing always constructs a fresh
//! instance through the registry and replays parameters through
//! `set_parameters`, so every value is re-clamped on the way in.

use crate::error::{ConstructionError, Result};
use crate::events::{EngineEvent, EventSender};
use crate::parameter::ParameterMap;
use crate::pipeline::Pipeline;
use crate::pipeline_set::Selector;
use crate::plugin::PluginInstance;
use crate::registry::PluginRegistry;
use crate::routing::BusRouting;
use serde::{Deserialize, Serialize};

/// Serialized form of one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRecord {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub parameters: ParameterMap,
}

fn default_enabled() -> bool {
    true
}

impl PluginRecord {
    pub fn new(type_id: impl Into<String>, parameters: ParameterMap) -> Self {
        Self {
            type_id: type_id.into(),
            enabled: true,
            parameters,
        }
    }
}

/// A record plus its bus routing, as stored in presets and history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPlugin {
    #[serde(flatten)]
    pub record: PluginRecord,
    #[serde(flatten)]
    pub routing: BusRouting,
}

impl From<PluginRecord> for PersistedPlugin {
    fn from(record: PluginRecord) -> Self {
        Self {
            record,
            routing: BusRouting::default(),
        }
    }
}

/// Both pipelines and the active selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    pub a: Vec<PersistedPlugin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<Vec<PersistedPlugin>>,
    #[serde(default)]
    pub active: Selector,
}

/// Outcome of a tolerant load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub instances: Vec<PluginInstance>,
    /// Type ids of records that could not be constructed.
    pub skipped: Vec<String>,
}

pub fn serialize(instance: &PluginInstance) -> PluginRecord {
    PluginRecord {
        type_id: instance.type_id().to_string(),
        enabled: instance.is_enabled(),
        parameters: instance.parameters(),
    }
}

/// Construct a fresh instance from a record.
pub fn deserialize(
    record: &PluginRecord,
    registry: &PluginRegistry,
) -> std::result::Result<PluginInstance, ConstructionError> {
    let instance = registry.create_with(&record.type_id, &record.parameters)?;
    instance.set_enabled(record.enabled);
    Ok(instance)
}

fn deserialize_persisted(
    persisted: &PersistedPlugin,
    registry: &PluginRegistry,
) -> std::result::Result<PluginInstance, ConstructionError> {
    let mut instance = deserialize(&persisted.record, registry)?;
    instance.set_routing(persisted.routing);
    Ok(instance)
}

/// Records for every instance in pipeline order.
pub fn serialize_pipeline(pipeline: &Pipeline) -> Vec<PluginRecord> {
    pipeline.iter().map(serialize).collect()
}

/// Strict counterpart of [`serialize_pipeline`]: fails on the first record
/// that cannot be constructed.
pub fn deserialize_pipeline(
    records: &[PluginRecord],
    registry: &PluginRegistry,
) -> std::result::Result<Pipeline, ConstructionError> {
    let instances = records
        .iter()
        .map(|record| deserialize(record, registry))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Pipeline::from_instances(instances))
}

pub fn serialize_for_persistence(pipeline: &Pipeline) -> Vec<PersistedPlugin> {
    pipeline
        .iter()
        .map(|instance| PersistedPlugin {
            record: serialize(instance),
            routing: instance.routing(),
        })
        .collect()
}

/// Build instances from persisted records, skipping any whose type cannot be
/// constructed. Skips are logged and, if `events` is given, reported.
pub fn load_from_persistence(
    records: &[PersistedPlugin],
    registry: &PluginRegistry,
    events: Option<&EventSender>,
) -> LoadReport {
    let mut report = LoadReport::default();
    for persisted in records {
        match deserialize_persisted(persisted, registry) {
            Ok(instance) => report.instances.push(instance),
            Err(e) => {
                tracing::warn!(
                    "Skipping persisted plugin '{}': {}",
                    persisted.record.type_id,
                    e
                );
                if let Some(events) = events {
                    events.emit(EngineEvent::RecordSkipped {
                        type_id: persisted.record.type_id.clone(),
                    });
                }
                report.skipped.push(persisted.record.type_id.clone());
            }
        }
    }
    report
}

pub fn to_json(records: &[PersistedPlugin]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

pub fn from_json(json: &str) -> Result<Vec<PersistedPlugin>> {
    Ok(serde_json::from_str(json)?)
}
