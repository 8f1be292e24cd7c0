//! Section marker. Groups the plugins that follow it until the next marker.

use chainrack_core::{
    AudioBlock, FormatDescriptor, ParamKind, ParameterMap, ParameterSet, Plugin, PluginRole,
};

pub const SECTION_TYPE: &str = "Section";

pub struct Section {
    params: ParameterSet,
}

impl Section {
    pub fn new() -> Self {
        Self {
            params: ParameterSet::new().with(
                "name",
                ParamKind::Text {
                    default: "Section".to_string(),
                },
            ),
        }
    }

    pub fn name(&self) -> &str {
        self.params.text("name")
    }
}

impl Default for Section {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for Section {
    fn type_id(&self) -> &str {
        SECTION_TYPE
    }

    fn role(&self) -> PluginRole {
        PluginRole::Section
    }

    fn parameters(&self) -> ParameterMap {
        self.params.snapshot()
    }

    fn parameter_set(&self) -> Option<&ParameterSet> {
        Some(&self.params)
    }

    fn set_parameters(&mut self, partial: &ParameterMap) {
        self.params.apply(partial);
    }

    fn process(&mut self, _block: &mut AudioBlock<'_>, _format: &FormatDescriptor) {}
}
