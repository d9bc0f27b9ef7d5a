//! Descriptor tree: the ownership and protocol-indexing view of a device.
//!
//! Descriptors live in a [`DescriptorTree`] arena and refer to each other by
//! [`DescriptorId`]. Indices are not known at construction; they are assigned
//! by [`DescriptorTree::collect_owned_descriptors`], a depth-first counting
//! pass that runs before any address is published.

use std::collections::{BTreeMap, HashMap};

use crate::comparator::IdentitySet;
use crate::identity::{ControlIdentity, Section};
use crate::ranged_value::RangedValue;
use crate::values;

/// AEM descriptor type codes.
pub mod types {
    pub const ENTITY: u16 = 0x0000;
    pub const CONFIGURATION: u16 = 0x0001;
    pub const AUDIO_UNIT: u16 = 0x0002;
    pub const VIDEO_UNIT: u16 = 0x0003;
    pub const SENSOR_UNIT: u16 = 0x0004;
    pub const STREAM_INPUT: u16 = 0x0005;
    pub const STREAM_OUTPUT: u16 = 0x0006;
    pub const JACK_INPUT: u16 = 0x0007;
    pub const JACK_OUTPUT: u16 = 0x0008;
    pub const AVB_INTERFACE: u16 = 0x0009;
    pub const CLOCK_SOURCE: u16 = 0x000a;
    pub const MEMORY_OBJECT: u16 = 0x000b;
    pub const LOCALE: u16 = 0x000c;
    pub const STRINGS: u16 = 0x000d;
    pub const STREAM_PORT_INPUT: u16 = 0x000e;
    pub const STREAM_PORT_OUTPUT: u16 = 0x000f;
    pub const EXTERNAL_PORT_INPUT: u16 = 0x0010;
    pub const EXTERNAL_PORT_OUTPUT: u16 = 0x0011;
    pub const INTERNAL_PORT_INPUT: u16 = 0x0012;
    pub const INTERNAL_PORT_OUTPUT: u16 = 0x0013;
    pub const AUDIO_CLUSTER: u16 = 0x0014;
    pub const VIDEO_CLUSTER: u16 = 0x0015;
    pub const SENSOR_CLUSTER: u16 = 0x0016;
    pub const AUDIO_MAP: u16 = 0x0017;
    pub const VIDEO_MAP: u16 = 0x0018;
    pub const SENSOR_MAP: u16 = 0x0019;
    pub const CONTROL: u16 = 0x001a;
    pub const SIGNAL_SELECTOR: u16 = 0x001b;
    pub const MIXER: u16 = 0x001c;
    pub const MATRIX: u16 = 0x001d;
    pub const MATRIX_SIGNAL: u16 = 0x001e;
    pub const SIGNAL_SPLITTER: u16 = 0x001f;
    pub const SIGNAL_COMBINER: u16 = 0x0020;
    pub const SIGNAL_DEMULTIPLEXER: u16 = 0x0021;
    pub const SIGNAL_MULTIPLEXER: u16 = 0x0022;
    pub const SIGNAL_TRANSCODER: u16 = 0x0023;
    pub const CLOCK_DOMAIN: u16 = 0x0024;
    pub const CONTROL_BLOCK: u16 = 0x0025;
    pub const INVALID: u16 = 0xffff;
}

/// AEM control types: the IEEE OUI 90-E0-F0 followed by a 40 bit value.
pub mod control_types {
    pub const ENABLE: u64 = 0x90e0_f000_0000_0000;
    pub const IDENTIFY: u64 = 0x90e0_f000_0000_0001;
    pub const MUTE: u64 = 0x90e0_f000_0000_0002;
    pub const INVERT: u64 = 0x90e0_f000_0000_0003;
    pub const GAIN: u64 = 0x90e0_f000_0000_0004;
    pub const ATTENUATE: u64 = 0x90e0_f000_0000_0005;
    pub const DELAY: u64 = 0x90e0_f000_0000_0006;
}

/// AEM control value types.
pub mod control_value_types {
    pub const LINEAR_INT8: u16 = 0x0000;
    pub const LINEAR_UINT8: u16 = 0x0001;
    pub const LINEAR_INT16: u16 = 0x0002;
    pub const LINEAR_UINT16: u16 = 0x0003;
    pub const LINEAR_INT32: u16 = 0x0004;
    pub const LINEAR_UINT32: u16 = 0x0005;
    pub const LINEAR_INT64: u16 = 0x0006;
    pub const LINEAR_UINT64: u16 = 0x0007;
    pub const LINEAR_FLOAT: u16 = 0x0008;
    pub const LINEAR_DOUBLE: u16 = 0x0009;
    pub const UTF8: u16 = 0x0013;
    /// Descriptors that carry no control value of their own.
    pub const NONE: u16 = 0xffff;
}

/// Most signal sources a matrix signal descriptor can carry.
pub const MAX_MATRIX_SIGNALS: usize = 84;

/// Index of a descriptor in its [`DescriptorTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorId(pub usize);

/// A named value exposed by a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlValue {
    pub name: String,
    pub value: RangedValue,
}

impl ControlValue {
    pub fn new(name: impl Into<String>, value: RangedValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Identity and description strings of an entity descriptor.
#[derive(Debug, Clone, Default)]
pub struct EntityInfo {
    pub entity_name: String,
    pub group_name: String,
    pub firmware_version: String,
    pub serial_number: String,
    pub entity_id: u64,
    pub entity_model_id: u64,
}

#[derive(Debug, Clone)]
pub struct Descriptor {
    description: String,
    descriptor_type: u16,
    descriptor_index: u16,
    control_type: u64,
    control_value_type: u16,
    properties: Vec<ControlValue>,
    property_index: HashMap<String, usize>,
    /// Indices into `properties` of the values that are also names.
    names: Vec<usize>,
    /// Indices into `properties` that protocol writes may not change.
    read_only: Vec<usize>,
    children: BTreeMap<u16, Vec<DescriptorId>>,
    /// Value grid, indexed `[h][w][item]`.
    grid: Vec<Vec<Vec<ControlValue>>>,
    signals: Vec<(DescriptorId, u16)>,
}

impl Descriptor {
    pub fn new(description: impl Into<String>, descriptor_type: u16) -> Self {
        Self {
            description: description.into(),
            descriptor_type,
            descriptor_index: 0,
            control_type: 0,
            control_value_type: 0,
            properties: Vec::new(),
            property_index: HashMap::new(),
            names: Vec::new(),
            read_only: Vec::new(),
            children: BTreeMap::new(),
            grid: Vec::new(),
            signals: Vec::new(),
        }
    }

    /// A CONTROL descriptor holding one or more flat values.
    pub fn control(
        control_type: u64,
        description: impl Into<String>,
        control_value_type: u16,
        values: Vec<ControlValue>,
    ) -> Self {
        let mut d = Self::new(description, types::CONTROL);
        d.control_type = control_type;
        d.control_value_type = control_value_type;
        d.grid = vec![vec![values]];
        d
    }

    /// An empty MATRIX descriptor; fill it with `add_row`, `add_column` and
    /// `add_value`.
    pub fn matrix(control_type: u64, description: impl Into<String>, control_value_type: u16) -> Self {
        let mut d = Self::new(description, types::MATRIX);
        d.control_type = control_type;
        d.control_value_type = control_value_type;
        d.add_name("object_name", values::descriptor_string(""));
        d
    }

    pub fn matrix_signal() -> Self {
        Self::new("", types::MATRIX_SIGNAL)
    }

    /// A STREAM_INPUT descriptor: one `object_name`, no values.
    pub fn stream_input(description: impl Into<String>, object_name: &str) -> Self {
        Self::named_object(types::STREAM_INPUT, description, object_name)
    }

    pub fn stream_output(description: impl Into<String>, object_name: &str) -> Self {
        Self::named_object(types::STREAM_OUTPUT, description, object_name)
    }

    /// A JACK_INPUT descriptor. Controls on the jack are inserted as its
    /// children and are counted with it.
    pub fn jack_input(description: impl Into<String>, object_name: &str) -> Self {
        Self::named_object(types::JACK_INPUT, description, object_name)
    }

    pub fn jack_output(description: impl Into<String>, object_name: &str) -> Self {
        Self::named_object(types::JACK_OUTPUT, description, object_name)
    }

    /// A stream, external or internal port. Ports carry no names and no
    /// values; they only take part in counting. Returns `None` for any other
    /// descriptor type.
    pub fn port(descriptor_type: u16, description: impl Into<String>) -> Option<Self> {
        match descriptor_type {
            types::STREAM_PORT_INPUT
            | types::STREAM_PORT_OUTPUT
            | types::EXTERNAL_PORT_INPUT
            | types::EXTERNAL_PORT_OUTPUT
            | types::INTERNAL_PORT_INPUT
            | types::INTERNAL_PORT_OUTPUT => {
                let mut d = Self::new(description, descriptor_type);
                d.control_value_type = control_value_types::NONE;
                Some(d)
            }
            _ => None,
        }
    }

    fn named_object(descriptor_type: u16, description: impl Into<String>, object_name: &str) -> Self {
        let mut d = Self::new(description, descriptor_type);
        d.control_value_type = control_value_types::NONE;
        d.add_name("object_name", values::descriptor_string(object_name));
        d
    }

    pub fn configuration(description: impl Into<String>, object_name: &str) -> Self {
        let mut d = Self::new(description, types::CONFIGURATION);
        d.control_value_type = control_value_types::UTF8;
        d.add_name("object_name", values::descriptor_string(object_name));
        d
    }

    pub fn entity(description: impl Into<String>, info: &EntityInfo) -> Self {
        let mut d = Self::new(description, types::ENTITY);
        d.control_value_type = control_value_types::UTF8;
        d.add_name("entity_name", values::descriptor_string(&info.entity_name));
        d.add_name("group_name", values::descriptor_string(&info.group_name));
        for (name, value) in [
            ("firmware_version", values::descriptor_string(&info.firmware_version)),
            ("serial_number", values::descriptor_string(&info.serial_number)),
            ("entity_id", values::eui64(info.entity_id)),
            ("entity_model_id", values::eui64(info.entity_model_id)),
        ] {
            let i = d.add_property(name, value);
            d.mark_read_only(i);
        }
        d
    }

    /// Protect property `i` from protocol writes.
    pub fn mark_read_only(&mut self, i: usize) {
        if i < self.properties.len() && !self.read_only.contains(&i) {
            self.read_only.push(i);
        }
    }

    /// Add the identities of this descriptor's protected properties to `set`.
    pub fn fill_write_access(&self, set: &IdentitySet) {
        for &i in &self.read_only {
            set.add(self.identity_for_property(i as u16));
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn descriptor_type(&self) -> u16 {
        self.descriptor_type
    }

    pub fn descriptor_index(&self) -> u16 {
        self.descriptor_index
    }

    pub fn control_type(&self) -> u64 {
        self.control_type
    }

    pub fn control_value_type(&self) -> u16 {
        self.control_value_type
    }

    /// Add a named property. A property of the same name is replaced.
    pub fn add_property(&mut self, name: impl Into<String>, value: RangedValue) -> usize {
        let name = name.into();
        if let Some(&i) = self.property_index.get(&name) {
            self.properties[i].value = value;
            return i;
        }
        let i = self.properties.len();
        self.property_index.insert(name.clone(), i);
        self.properties.push(ControlValue::new(name, value));
        i
    }

    /// Add a name slot. Names are also reachable as properties.
    pub fn add_name(&mut self, name: impl Into<String>, value: RangedValue) -> usize {
        let i = self.add_property(name, value);
        if !self.names.contains(&i) {
            self.names.push(i);
        }
        self.names.len() - 1
    }

    pub fn num_properties(&self) -> u16 {
        self.properties.len() as u16
    }

    pub fn num_names(&self) -> u16 {
        self.names.len() as u16
    }

    pub fn property(&self, i: usize) -> Option<&ControlValue> {
        self.properties.get(i)
    }

    pub fn property_mut(&mut self, i: usize) -> Option<&mut ControlValue> {
        self.properties.get_mut(i)
    }

    pub fn property_named(&self, name: &str) -> Option<&ControlValue> {
        self.property_index.get(name).map(|&i| &self.properties[i])
    }

    pub fn name(&self, i: usize) -> Option<&ControlValue> {
        self.names.get(i).map(|&p| &self.properties[p])
    }

    pub fn name_mut(&mut self, i: usize) -> Option<&mut ControlValue> {
        let p = *self.names.get(i)?;
        self.properties.get_mut(p)
    }

    pub fn set_name(&mut self, i: usize, value: &str) -> bool {
        match self.name_mut(i) {
            Some(cv) => cv.value.set_value_with_clamp(value).unwrap_or(false),
            None => false,
        }
    }

    pub fn add_row(&mut self) {
        self.grid.push(Vec::new());
    }

    /// Add a column to the last row.
    pub fn add_column(&mut self) {
        if self.grid.is_empty() {
            self.add_row();
        }
        if let Some(row) = self.grid.last_mut() {
            row.push(Vec::new());
        }
    }

    /// Add a value to the last column of the last row.
    pub fn add_value(&mut self, value: ControlValue) {
        if self.grid.last().map_or(true, |row| row.is_empty()) {
            self.add_column();
        }
        if let Some(cell) = self.grid.last_mut().and_then(|row| row.last_mut()) {
            cell.push(value);
        }
    }

    pub fn height(&self) -> u16 {
        self.grid.len() as u16
    }

    pub fn width(&self) -> u16 {
        self.grid.last().map_or(0, |row| row.len()) as u16
    }

    pub fn num_values(&self) -> u16 {
        self.grid
            .last()
            .and_then(|row| row.last())
            .map_or(0, |cell| cell.len()) as u16
    }

    pub fn value(&self, item: usize, w: usize, h: usize) -> Option<&ControlValue> {
        self.grid.get(h)?.get(w)?.get(item)
    }

    pub fn value_mut(&mut self, item: usize, w: usize, h: usize) -> Option<&mut ControlValue> {
        self.grid.get_mut(h)?.get_mut(w)?.get_mut(item)
    }

    /// Attach a signal source to a matrix signal descriptor. Returns false once
    /// the descriptor is full. Sources are plain ids, never owners.
    pub fn add_signal(&mut self, source: DescriptorId, signal_output: u16) -> bool {
        if self.signals.len() < MAX_MATRIX_SIGNALS {
            self.signals.push((source, signal_output));
            true
        } else {
            false
        }
    }

    pub fn signals(&self) -> &[(DescriptorId, u16)] {
        &self.signals
    }

    pub fn children(&self) -> &BTreeMap<u16, Vec<DescriptorId>> {
        &self.children
    }

    pub fn children_of_type(&self, descriptor_type: u16) -> &[DescriptorId] {
        self.children
            .get(&descriptor_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn control_identity(&self) -> ControlIdentity {
        ControlIdentity::descriptor(self.descriptor_type, self.descriptor_index)
    }

    /// Identity of property `i`. Properties that are names get the identity
    /// of their name slot.
    pub fn identity_for_property(&self, i: u16) -> ControlIdentity {
        match self.names.iter().position(|&p| p == i as usize) {
            Some(n) => self.identity_for_name(n as u16),
            None => self.control_identity().with_section(Section::Property, i),
        }
    }

    /// Identity of the property called `name`, or the descriptor identity when
    /// there is none.
    pub fn identity_for_property_named(&self, name: &str) -> ControlIdentity {
        match self.property_index.get(name) {
            Some(&i) => self.identity_for_property(i as u16),
            None => self.control_identity(),
        }
    }

    pub fn identity_for_name(&self, i: u16) -> ControlIdentity {
        self.control_identity().with_section(Section::Name, i)
    }

    /// Identity of a value in the grid. Cells of a matrix with more than one
    /// row and column are row level identities.
    pub fn identity_for_item(&self, item: u16, h: u16, w: u16) -> ControlIdentity {
        let section = if self.height() > 1 && self.width() > 1 {
            Section::HPosLevel
        } else {
            Section::DescriptorLevel
        };
        self.control_identity()
            .with_section(section, item)
            .with_position(h, w)
    }

    pub fn property_name(&self, i: u16) -> Option<&str> {
        self.properties.get(i as usize).map(|p| p.name.as_str())
    }

    /// Resolve the value an identity refers to, offset by a request position.
    ///
    /// Name and property identities index their lists. Grid identities add the
    /// request offsets to their own coordinates. Anything unresolved falls back
    /// to the first name, then the first property.
    pub(crate) fn resolve(&self, identity: &ControlIdentity, item: u16, w: u16, h: u16) -> Option<(ResolvedSlot, &RangedValue)> {
        let direct = match identity.section {
            Section::Name => {
                let i = item as usize + identity.item as usize;
                self.names.get(i).map(|&p| ResolvedSlot::Property(p))
            }
            Section::Property => {
                let i = item as usize + identity.item as usize;
                (i < self.properties.len()).then_some(ResolvedSlot::Property(i))
            }
            Section::DescriptorLevel | Section::HPosLevel | Section::WPosLevel => {
                let item = item as usize + identity.item as usize;
                let w = w as usize + identity.w_pos as usize;
                let h = h as usize + identity.h_pos as usize;
                self.value(item, w, h).map(|_| ResolvedSlot::Grid { item, w, h })
            }
        };
        let slot = direct
            .or_else(|| self.names.first().map(|&p| ResolvedSlot::Property(p)))
            .or_else(|| (!self.properties.is_empty()).then_some(ResolvedSlot::Property(0)))?;
        self.slot(slot).map(|v| (slot, v))
    }

    pub(crate) fn slot(&self, slot: ResolvedSlot) -> Option<&RangedValue> {
        match slot {
            ResolvedSlot::Property(i) => self.properties.get(i).map(|p| &p.value),
            ResolvedSlot::Grid { item, w, h } => self.value(item, w, h).map(|v| &v.value),
        }
    }

    pub(crate) fn slot_value(&self, slot: ResolvedSlot) -> Option<&ControlValue> {
        match slot {
            ResolvedSlot::Property(i) => self.properties.get(i),
            ResolvedSlot::Grid { item, w, h } => self.value(item, w, h),
        }
    }

    pub(crate) fn slot_mut(&mut self, slot: ResolvedSlot) -> Option<&mut RangedValue> {
        match slot {
            ResolvedSlot::Property(i) => self.properties.get_mut(i).map(|p| &mut p.value),
            ResolvedSlot::Grid { item, w, h } => self.value_mut(item, w, h).map(|v| &mut v.value),
        }
    }
}

/// Where a resolved value lives inside its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolvedSlot {
    Property(usize),
    Grid { item: usize, w: usize, h: usize },
}

/// Per-configuration, per-type index counters.
#[derive(Debug, Clone)]
pub struct DescriptorCounts {
    configurations: Vec<HashMap<u16, u16>>,
}

impl Default for DescriptorCounts {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorCounts {
    pub fn new() -> Self {
        Self {
            configurations: vec![HashMap::new()],
        }
    }

    /// Start a fresh set of counters. Returns the configuration number.
    pub fn add_configuration(&mut self) -> u16 {
        self.configurations.push(HashMap::new());
        (self.configurations.len() - 1) as u16
    }

    pub fn num_configurations(&self) -> usize {
        self.configurations.len()
    }

    pub fn count(&self, descriptor_type: u16) -> u16 {
        self.configurations
            .last()
            .and_then(|c| c.get(&descriptor_type).copied())
            .unwrap_or(0)
    }

    pub fn count_and_increment(&mut self, descriptor_type: u16) -> u16 {
        if self.configurations.is_empty() {
            self.configurations.push(HashMap::new());
        }
        let last = self.configurations.len() - 1;
        let counter = self.configurations[last].entry(descriptor_type).or_insert(0);
        let current = *counter;
        *counter = counter.saturating_add(1);
        current
    }
}

/// Arena owning every descriptor of a device.
#[derive(Debug, Clone, Default)]
pub struct DescriptorTree {
    nodes: Vec<Descriptor>,
    /// Owner of each node, parallel to `nodes`.
    parents: Vec<Option<DescriptorId>>,
}

impl DescriptorTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: Descriptor) -> DescriptorId {
        self.nodes.push(descriptor);
        self.parents.push(None);
        DescriptorId(self.nodes.len() - 1)
    }

    /// Insert `descriptor` as a child of `parent`.
    pub fn insert_child(&mut self, parent: DescriptorId, descriptor: Descriptor) -> DescriptorId {
        let child = self.insert(descriptor);
        self.add_child(parent, child);
        child
    }

    /// Make `child` owned by `parent`. Returns false, changing nothing, when
    /// either id is unknown, `child` already has an owner, or `child` is
    /// `parent` or one of its ancestors.
    pub fn add_child(&mut self, parent: DescriptorId, child: DescriptorId) -> bool {
        if parent.0 >= self.nodes.len() || self.parents.get(child.0) != Some(&None) {
            return false;
        }
        if self.ancestors(parent).any(|a| a == child) {
            return false;
        }
        let child_type = self.nodes[child.0].descriptor_type;
        self.nodes[parent.0].children.entry(child_type).or_default().push(child);
        self.parents[child.0] = Some(parent);
        true
    }

    pub fn parent(&self, id: DescriptorId) -> Option<DescriptorId> {
        self.parents.get(id.0).copied().flatten()
    }

    /// `id` itself, then each owner up to the root.
    fn ancestors(&self, id: DescriptorId) -> impl Iterator<Item = DescriptorId> + '_ {
        std::iter::successors(Some(id), move |&current| self.parent(current))
    }

    pub fn get(&self, id: DescriptorId) -> Option<&Descriptor> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: DescriptorId) -> Option<&mut Descriptor> {
        self.nodes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DescriptorId> {
        (0..self.nodes.len()).map(DescriptorId)
    }

    /// Assign indices depth-first from `root`: the node's own index, then its
    /// children by ascending type in insertion order. A configuration opens a
    /// fresh counter set for its subtree.
    pub fn collect_owned_descriptors(&mut self, root: DescriptorId, counts: &mut DescriptorCounts) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id.0) else {
                continue;
            };
            if node.descriptor_type == types::CONFIGURATION {
                counts.add_configuration();
                // a configuration counts itself among its siblings only
                node.descriptor_index = (counts.num_configurations() - 2) as u16;
            } else {
                node.descriptor_index = counts.count_and_increment(node.descriptor_type);
            }
            let next: Vec<DescriptorId> = node.children.values().flatten().copied().collect();
            stack.extend(next.into_iter().rev());
        }
    }
}
