//! Example schema: a mixer with N inputs and M outputs, each with a gain and
//! a mute.
//!
//! ```text
//! /entity                      entity descriptor and its names/properties
//! /configuration               configuration object name
//! /input/1/gain .. /input/N/gain
//! /input/1/mute .. /input/N/mute
//! /output/1/gain .. /output/M/gain
//! /output/1/mute .. /output/M/mute
//! ```

use controlconf::MixerConfig;
use controlplane::descriptor::{control_types, control_value_types};
use controlplane::{
    values, ControlContainer, ControlValue, Descriptor, DescriptorCounts, DescriptorId, DescriptorTree, EntityInfo,
    Schema,
};
use tracing::info;

#[derive(Debug, Clone)]
pub struct MixerLayout {
    pub inputs: u16,
    pub outputs: u16,
    pub entity: EntityInfo,
}

impl MixerLayout {
    pub fn new(inputs: u16, outputs: u16) -> Self {
        Self {
            inputs,
            outputs,
            entity: EntityInfo {
                entity_name: "Example Mixer".into(),
                group_name: String::new(),
                firmware_version: env!("CARGO_PKG_VERSION").into(),
                serial_number: "0000001".into(),
                entity_id: 0x001b_92ff_fe00_0001,
                entity_model_id: 0x001b_92ff_fe00_0000,
            },
        }
    }
}

impl Default for MixerLayout {
    fn default() -> Self {
        let config = MixerConfig::default();
        Self::new(config.inputs, config.outputs)
    }
}

impl From<&MixerConfig> for MixerLayout {
    fn from(config: &MixerConfig) -> Self {
        Self::new(config.inputs, config.outputs)
    }
}

struct Generator {
    tree: DescriptorTree,
    root: ControlContainer,
    configuration: DescriptorId,
}

impl Generator {
    fn channel(&mut self, section: &str, prefix: &str, channel: u16) {
        let name = channel.to_string();
        let description = format!("{} {}", prefix, name);

        let gain = self.tree.insert_child(
            self.configuration,
            Descriptor::control(
                control_types::GAIN,
                format!("{} Gain", description),
                control_value_types::LINEAR_INT32,
                vec![ControlValue::new("gain", values::gain())],
            ),
        );
        let mute = self.tree.insert_child(
            self.configuration,
            Descriptor::control(
                control_types::MUTE,
                format!("{} Mute", description),
                control_value_types::LINEAR_UINT8,
                vec![ControlValue::new("mute", values::mute())],
            ),
        );
        self.root.add_item(&[section, name.as_str(), "gain"], gain);
        self.root.add_item(&[section, name.as_str(), "mute"], mute);
    }
}

/// Build, count and collect the mixer schema.
pub fn generate(layout: &MixerLayout) -> Schema {
    let mut tree = DescriptorTree::new();
    let entity = tree.insert(Descriptor::entity("Entity", &layout.entity));
    let configuration = tree.insert_child(entity, Descriptor::configuration("Configuration", "Default"));

    let mut root = ControlContainer::new();
    root.add_item(&["entity"], entity);
    root.add_item(&["configuration"], configuration);

    let mut generator = Generator {
        tree,
        root,
        configuration,
    };
    for channel in 1..=layout.inputs {
        generator.channel("input", "Input", channel);
    }
    for channel in 1..=layout.outputs {
        generator.channel("output", "Output", channel);
    }

    let Generator { mut tree, root, .. } = generator;
    tree.collect_owned_descriptors(entity, &mut DescriptorCounts::new());
    info!(inputs = layout.inputs, outputs = layout.outputs, descriptors = tree.len(), "mixer generated");
    Schema::new(tree, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use controlplane::{SchemaAddress, Section, Value};

    fn address(s: &str) -> SchemaAddress {
        s.parse().unwrap()
    }

    #[test]
    fn test_channel_addresses() {
        let schema = generate(&MixerLayout::new(2, 3));
        let addresses: Vec<String> = schema.addresses().iter().map(|a| a.to_string()).collect();
        assert!(addresses.contains(&"/input/2/mute".to_string()));
        assert!(addresses.contains(&"/output/3/gain".to_string()));
        assert!(!addresses.contains(&"/output/4/gain".to_string()));
        // 5 channels x 2 controls, entity 1 + 6, configuration 1 + 1
        assert_eq!(schema.len(), 5 * 2 + 7 + 2);
    }

    #[test]
    fn test_indices_follow_channel_order() {
        let schema = generate(&MixerLayout::new(2, 1));
        let index = |s: &str| schema.identity_for_address(&address(s)).unwrap().descriptor_index;
        assert_eq!(index("/input/1/gain"), 0);
        assert_eq!(index("/input/1/mute"), 1);
        assert_eq!(index("/input/2/gain"), 2);
        assert_eq!(index("/output/1/mute"), 5);
    }

    #[test]
    fn test_defaults() {
        let schema = generate(&MixerLayout::new(1, 1));
        let gain = schema.identity_for_address(&address("/input/1/gain")).unwrap();
        assert_eq!(gain.section, Section::DescriptorLevel);
        assert_eq!(schema.get_value(&gain).unwrap(), Value::Float(0.0));
        let name = schema.identity_for_address(&address("/entity/entity_name")).unwrap();
        assert_eq!(schema.get_value(&name).unwrap(), Value::Text("Example Mixer".into()));
    }
}
