//! Dual A/B pipelines.
//!
//! Pipeline A always exists; B is created on demand (the first toggle copies
//! A into it). Switching is a pointer swap of cached generations. Neither
//! pipeline is touched by switching.

use crate::codec::{self, SetRecord};
use crate::error::{Error, Result};
use crate::events::EventSender;
use crate::pipeline::Pipeline;
use crate::registry::PluginRegistry;
use serde::{Deserialize, Serialize};

/// Which pipeline is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selector {
    #[default]
    A,
    B,
}

impl Selector {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

#[derive(Debug, Default)]
pub struct PipelineSet {
    a: Pipeline,
    b: Option<Pipeline>,
    active: Selector,
}

impl PipelineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selector(&self) -> Selector {
        self.active
    }

    pub fn a(&self) -> &Pipeline {
        &self.a
    }

    pub fn b(&self) -> Option<&Pipeline> {
        self.b.as_ref()
    }

    pub fn has_b(&self) -> bool {
        self.b.is_some()
    }

    pub fn pipeline(&self, selector: Selector) -> Option<&Pipeline> {
        match selector {
            Selector::A => Some(&self.a),
            Selector::B => self.b.as_ref(),
        }
    }

    pub fn pipeline_mut(&mut self, selector: Selector) -> Option<&mut Pipeline> {
        match selector {
            Selector::A => Some(&mut self.a),
            Selector::B => self.b.as_mut(),
        }
    }

    pub fn active(&self) -> &Pipeline {
        match (self.active, &self.b) {
            (Selector::B, Some(b)) => b,
            _ => &self.a,
        }
    }

    pub fn active_mut(&mut self) -> &mut Pipeline {
        match (self.active, &mut self.b) {
            (Selector::B, Some(b)) => b,
            _ => &mut self.a,
        }
    }

    /// Make `selector` active.
    ///
    /// Returns `false` (and changes nothing) when switching to a B that does
    /// not exist. Switching to the already-active pipeline returns `true`.
    pub fn switch_active(&mut self, selector: Selector) -> bool {
        if selector == Selector::B && self.b.is_none() {
            return false;
        }
        self.active = selector;
        true
    }

    /// Flip between A and B, creating B as a copy of A first if needed.
    pub fn toggle(&mut self, registry: &PluginRegistry) -> Result<Selector> {
        if self.b.is_none() {
            self.b = Some(Self::copy_of(&self.a, registry)?);
        }
        self.active = self.active.other();
        Ok(self.active)
    }

    /// Replace B with a deep copy of A and make B active.
    pub fn copy_a_to_b(&mut self, registry: &PluginRegistry) -> Result<()> {
        self.b = Some(Self::copy_of(&self.a, registry)?);
        self.active = Selector::B;
        Ok(())
    }

    /// Replace A with a deep copy of B and make A active.
    pub fn copy_b_to_a(&mut self, registry: &PluginRegistry) -> Result<()> {
        let b = self.b.as_ref().ok_or(Error::MissingPipelineB)?;
        self.a = Self::copy_of(b, registry)?;
        self.active = Selector::A;
        Ok(())
    }

    fn copy_of(source: &Pipeline, registry: &PluginRegistry) -> Result<Pipeline> {
        let records = codec::serialize_for_persistence(source);
        let report = codec::load_from_persistence(&records, registry, None);
        if let Some(type_id) = report.skipped.first() {
            return Err(crate::ConstructionError::UnknownType(type_id.clone()).into());
        }
        Ok(Pipeline::from_instances(report.instances))
    }

    pub fn to_record(&self) -> SetRecord {
        SetRecord {
            a: codec::serialize_for_persistence(&self.a),
            b: self.b.as_ref().map(codec::serialize_for_persistence),
            active: self.active,
        }
    }

    /// Rebuild both pipelines from a record. Unavailable types are skipped.
    ///
    /// Returns the type ids that were skipped.
    pub fn load_record(
        &mut self,
        record: &SetRecord,
        registry: &PluginRegistry,
        events: Option<&EventSender>,
    ) -> Vec<String> {
        let a = codec::load_from_persistence(&record.a, registry, events);
        let mut skipped = a.skipped;
        self.a.replace_all(a.instances);
        self.a.set_master_bypass(false);

        match &record.b {
            Some(records) => {
                let b = codec::load_from_persistence(records, registry, events);
                skipped.extend(b.skipped);
                match self.b.as_mut() {
                    Some(existing) => {
                        existing.replace_all(b.instances);
                        existing.set_master_bypass(false);
                    }
                    None => self.b = Some(Pipeline::from_instances(b.instances)),
                }
            }
            None => self.b = None,
        }

        self.active = if record.active == Selector::B && self.b.is_some() {
            Selector::B
        } else {
            Selector::A
        };
        skipped
    }
}
