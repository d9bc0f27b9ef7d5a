//! The schema: descriptor tree, address tree and the maps between them.
//!
//! Construction runs one collection pass over the [`ControlContainer`],
//! publishing an address for every property, name, matrix cell and flat value
//! of every leaf descriptor. The pass fills a [`SchemaIndex`] with
//! `address -> identity`, `identity -> address` and `identity -> descriptor`.
//!
//! Reads and writes resolve an identity to a [`RangedValue`] inside the tree.
//! A write that changes a value is reported to the schema's
//! [`ChangeNotifierManager`] after the schema's lock is released.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, info, info_span, warn};

use crate::comparator::{AllControls, ControlIdentityComparator, IdentitySet};
use crate::container::{ControlContainer, SchemaAddress};
use crate::descriptor::{ControlValue, Descriptor, DescriptorId, DescriptorTree};
use crate::encoding::EncodedValue;
use crate::error::{SchemaError, ValueError};
use crate::identity::ControlIdentity;
use crate::manager::ChangeNotifierManager;
use crate::ranged_value::{RangedValue, Value};
use crate::Milliseconds;

/// Offsets within a descriptor's value grid, added to an identity's own
/// item and positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValuePosition {
    pub item: u16,
    pub w: u16,
    pub h: u16,
}

impl ValuePosition {
    pub fn new(item: u16, w: u16, h: u16) -> Self {
        Self { item, w, h }
    }
}

/// Maps derived by collection.
#[derive(Debug, Default)]
pub struct SchemaIndex {
    address_map: BTreeMap<SchemaAddress, ControlIdentity>,
    identity_map: BTreeMap<ControlIdentity, SchemaAddress>,
    descriptor_map: BTreeMap<ControlIdentity, DescriptorId>,
}

impl SchemaIndex {
    fn insert(&mut self, address: SchemaAddress, identity: ControlIdentity, descriptor: DescriptorId) {
        self.descriptor_map.insert(identity.descriptor_level(), descriptor);
        self.identity_map.insert(identity, address.clone());
        self.address_map.insert(address, identity);
    }

    pub fn contains_identity(&self, identity: &ControlIdentity) -> bool {
        self.identity_map.contains_key(identity)
    }

    pub fn identities(&self) -> impl Iterator<Item = ControlIdentity> + '_ {
        self.address_map.values().copied()
    }

    pub fn identity_for_address(&self, address: &SchemaAddress) -> Option<ControlIdentity> {
        self.address_map.get(address).copied()
    }

    pub fn address_for_identity(&self, identity: &ControlIdentity) -> Option<&SchemaAddress> {
        self.identity_map.get(identity)
    }

    pub fn descriptor_for(&self, identity: &ControlIdentity) -> Option<DescriptorId> {
        self.descriptor_map.get(&identity.descriptor_level()).copied()
    }

    pub fn len(&self) -> usize {
        self.address_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.address_map.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&SchemaAddress, &ControlIdentity)> {
        self.address_map.iter()
    }
}

struct SchemaState {
    tree: DescriptorTree,
    container: ControlContainer,
}

pub struct Schema {
    state: Mutex<SchemaState>,
    index: Arc<RwLock<SchemaIndex>>,
    manager: Arc<ChangeNotifierManager>,
}

impl Schema {
    /// Build a schema over a counted tree and its address container.
    pub fn new(tree: DescriptorTree, container: ControlContainer) -> Self {
        Self::with_manager(tree, container, Arc::new(ChangeNotifierManager::new()))
    }

    pub fn with_manager(tree: DescriptorTree, mut container: ControlContainer, manager: Arc<ChangeNotifierManager>) -> Self {
        let _span = info_span!("collect").entered();
        expand_leaves(&tree, &mut container);
        let mut state = SchemaState { tree, container };
        let index = build_index(&mut state);
        info!(addresses = index.len(), descriptors = state.tree.len(), "schema collected");
        Self {
            state: Mutex::new(state),
            index: Arc::new(RwLock::new(index)),
            manager,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SchemaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_index(&self) -> RwLockReadGuard<'_, SchemaIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn manager(&self) -> &Arc<ChangeNotifierManager> {
        &self.manager
    }

    /// A comparator matching every identity this schema publishes.
    pub fn all_controls(&self) -> ControlIdentityComparator {
        ControlIdentityComparator::All(AllControls::new(Arc::clone(&self.index)))
    }

    /// Recount descriptor indices from `root` and rebuild the maps.
    pub fn recount(&self, root: DescriptorId) {
        let mut state = self.lock_state();
        let mut counts = crate::descriptor::DescriptorCounts::new();
        state.tree.collect_owned_descriptors(root, &mut counts);
        self.rebuild(&mut state);
    }

    /// Refresh identities from the tree and rebuild the maps.
    pub fn recollect(&self) {
        let mut state = self.lock_state();
        self.rebuild(&mut state);
    }

    fn rebuild(&self, state: &mut SchemaState) {
        let _span = info_span!("collect").entered();
        let index = build_index(state);
        info!(addresses = index.len(), "schema recollected");
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = index;
    }

    pub fn descriptor_id(&self, identity: &ControlIdentity) -> Result<DescriptorId, SchemaError> {
        self.read_index()
            .descriptor_for(identity)
            .ok_or(SchemaError::NoSuchDescriptor {
                descriptor_type: identity.descriptor_type,
                descriptor_index: identity.descriptor_index,
            })
    }

    /// Run `f` on the descriptor owning `identity`.
    pub fn with_descriptor<R>(&self, identity: &ControlIdentity, f: impl FnOnce(&Descriptor) -> R) -> Result<R, SchemaError> {
        let id = self.descriptor_id(identity)?;
        let state = self.lock_state();
        let descriptor = state.tree.get(id).ok_or(SchemaError::NoSuchDescriptor {
            descriptor_type: identity.descriptor_type,
            descriptor_index: identity.descriptor_index,
        })?;
        Ok(f(descriptor))
    }

    /// Run `f` on the value `identity` resolves to at `pos`.
    pub fn with_ranged_value<R>(
        &self,
        identity: &ControlIdentity,
        pos: ValuePosition,
        f: impl FnOnce(&RangedValue) -> R,
    ) -> Result<R, SchemaError> {
        self.with_descriptor(identity, |d| {
            d.resolve(identity, pos.item, pos.w, pos.h)
                .map(|(_, value)| f(value))
                .ok_or(SchemaError::NoSuchControlIdentity(*identity))
        })?
    }

    /// Like [`Schema::with_ranged_value`], also passing the value's field name.
    pub fn with_control_value<R>(
        &self,
        identity: &ControlIdentity,
        pos: ValuePosition,
        f: impl FnOnce(&ControlValue) -> R,
    ) -> Result<R, SchemaError> {
        self.with_descriptor(identity, |d| {
            d.resolve(identity, pos.item, pos.w, pos.h)
                .and_then(|(slot, _)| d.slot_value(slot))
                .map(f)
                .ok_or(SchemaError::NoSuchControlIdentity(*identity))
        })?
    }

    pub fn ranged_value(&self, identity: &ControlIdentity, pos: ValuePosition) -> Result<RangedValue, SchemaError> {
        self.with_ranged_value(identity, pos, RangedValue::clone)
    }

    pub fn get_value(&self, identity: &ControlIdentity) -> Result<Value, SchemaError> {
        self.get_value_at(identity, ValuePosition::default())
    }

    pub fn get_value_at(&self, identity: &ControlIdentity, pos: ValuePosition) -> Result<Value, SchemaError> {
        self.with_ranged_value(identity, pos, RangedValue::value)
    }

    /// Set the value at `identity`, rejecting out of range values.
    ///
    /// NOTE: `write_validator` lists the *protected* identities. A write is
    /// rejected with [`SchemaError::ReadOnly`] when the validator contains
    /// the identity, not when it lacks it.
    pub fn set_value(
        &self,
        write_validator: Option<&ControlIdentityComparator>,
        now: Milliseconds,
        value: impl Into<Value>,
        identity: &ControlIdentity,
    ) -> Result<bool, SchemaError> {
        self.set_value_at(write_validator, now, value, identity, ValuePosition::default())
    }

    pub fn set_value_at(
        &self,
        write_validator: Option<&ControlIdentityComparator>,
        now: Milliseconds,
        value: impl Into<Value>,
        identity: &ControlIdentity,
        pos: ValuePosition,
    ) -> Result<bool, SchemaError> {
        let value = value.into();
        self.write(write_validator, now, identity, pos, |v| v.set_value(value, false))
    }

    /// Like [`Schema::set_value_at`], saturating at the declared bounds.
    pub fn set_value_with_clamp(
        &self,
        write_validator: Option<&ControlIdentityComparator>,
        now: Milliseconds,
        value: impl Into<Value>,
        identity: &ControlIdentity,
        pos: ValuePosition,
    ) -> Result<bool, SchemaError> {
        let value = value.into();
        self.write(write_validator, now, identity, pos, |v| v.set_value_with_clamp(value))
    }

    /// Set from a wire value, rejecting out of range values.
    pub fn set_encoded_value(
        &self,
        write_validator: Option<&ControlIdentityComparator>,
        now: Milliseconds,
        value: &EncodedValue,
        identity: &ControlIdentity,
        pos: ValuePosition,
    ) -> Result<bool, SchemaError> {
        self.write(write_validator, now, identity, pos, |v| v.set_from_encoded(value, false))
    }

    fn write<F>(
        &self,
        write_validator: Option<&ControlIdentityComparator>,
        now: Milliseconds,
        identity: &ControlIdentity,
        pos: ValuePosition,
        mutate: F,
    ) -> Result<bool, SchemaError>
    where
        F: FnOnce(&mut RangedValue) -> Result<bool, ValueError>,
    {
        // containment in the validator *blocks* the write
        if write_validator.is_some_and(|v| v.contains(identity)) {
            warn!(identity = %identity, "write rejected: read only");
            return Err(SchemaError::ReadOnly(*identity));
        }

        let id = self.descriptor_id(identity)?;
        let changed = {
            let mut state = self.lock_state();
            let descriptor = state.tree.get_mut(id).ok_or(SchemaError::NoSuchDescriptor {
                descriptor_type: identity.descriptor_type,
                descriptor_index: identity.descriptor_index,
            })?;
            let slot = descriptor
                .resolve(identity, pos.item, pos.w, pos.h)
                .map(|(slot, _)| slot)
                .ok_or(SchemaError::NoSuchControlIdentity(*identity))?;
            let value = descriptor
                .slot_mut(slot)
                .ok_or(SchemaError::NoSuchControlIdentity(*identity))?;
            mutate(value)?
        };

        debug!(identity = %identity, changed, "set value");
        if changed {
            self.manager.control_changed(now, *identity);
        }
        Ok(changed)
    }

    pub fn identity_for_address(&self, address: &SchemaAddress) -> Result<ControlIdentity, SchemaError> {
        self.read_index()
            .identity_for_address(address)
            .ok_or_else(|| SchemaError::NoSuchDescriptorForAddress(address.to_string()))
    }

    pub fn address_for_identity(&self, identity: &ControlIdentity) -> Result<SchemaAddress, SchemaError> {
        self.read_index()
            .address_for_identity(identity)
            .cloned()
            .ok_or(SchemaError::NoSuchControlIdentity(*identity))
    }

    /// Every published address, in order.
    pub fn addresses(&self) -> Vec<SchemaAddress> {
        self.read_index().address_map.keys().cloned().collect()
    }

    /// Every published `(address, identity)` pair, in address order.
    pub fn entries(&self) -> Vec<(SchemaAddress, ControlIdentity)> {
        self.read_index()
            .entries()
            .map(|(a, i)| (a.clone(), *i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_index().is_empty()
    }

    /// Add every descriptor's protected identities to `set`.
    pub fn fill_write_access(&self, set: &IdentitySet) {
        let ids: Vec<DescriptorId> = self.read_index().descriptor_map.values().copied().collect();
        let state = self.lock_state();
        for id in ids {
            if let Some(d) = state.tree.get(id) {
                d.fill_write_access(set);
            }
        }
    }

    pub fn with_container<R>(&self, f: impl FnOnce(&ControlContainer) -> R) -> R {
        f(&self.lock_state().container)
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("addresses", &self.len())
            .finish_non_exhaustive()
    }
}

/// Publish an address for each property, matrix cell and flat value under
/// every leaf.
fn expand_leaves(tree: &DescriptorTree, container: &mut ControlContainer) {
    let mut leaves = Vec::new();
    container.enumerate(|address, point| leaves.push((address.clone(), point.descriptor)));

    for (address, id) in leaves {
        let Some(d) = tree.get(id) else {
            continue;
        };
        let mut published = Vec::new();
        for i in 0..d.num_properties() {
            if let Some(name) = d.property_name(i) {
                published.push((address.child(name), d.identity_for_property(i)));
            }
        }

        let (height, width, values) = (d.height(), d.width(), d.num_values());
        if height > 1 && width > 1 && values > 0 {
            for h in 0..height {
                for w in 0..width {
                    let cell = address.child((h + 1).to_string()).child((w + 1).to_string());
                    if values == 1 {
                        published.push((cell, d.identity_for_item(0, h, w)));
                    } else {
                        for i in 0..values {
                            published.push((cell.child((i + 1).to_string()), d.identity_for_item(i, h, w)));
                        }
                    }
                }
            }
        } else if height == 1 && width == 1 && values > 1 {
            // each value gets its own address; the bare leaf would alias item 0
            container.remove_leaf(address.elements());
            for i in 0..values {
                published.push((address.child((i + 1).to_string()), d.identity_for_item(i, 0, 0)));
            }
        } else if height == 1 && width == 1 && values == 1 {
            published.push((address.clone(), d.identity_for_item(0, 0, 0)));
        }

        for (path, identity) in published {
            container.add_item_with_identity(path.elements(), id, identity);
        }
    }
}

fn build_index(state: &mut SchemaState) -> SchemaIndex {
    state.container.update_control_identities(&state.tree);
    let mut index = SchemaIndex::default();
    state.container.enumerate(|address, point| {
        index.insert(address.clone(), point.identity, point.descriptor);
    });
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{control_types, control_value_types, ControlValue, DescriptorCounts, EntityInfo};
    use crate::identity::Section;
    use crate::values;
    use pretty_assertions::assert_eq;

    fn gain_control(tree: &mut DescriptorTree, parent: DescriptorId, name: &str) -> DescriptorId {
        tree.insert_child(
            parent,
            Descriptor::control(
                control_types::GAIN,
                name,
                control_value_types::LINEAR_INT32,
                vec![ControlValue::new("gain", values::gain())],
            ),
        )
    }

    fn small_schema() -> Schema {
        let mut tree = DescriptorTree::new();
        let entity = tree.insert(Descriptor::entity(
            "Entity",
            &EntityInfo {
                entity_name: "Box".into(),
                ..Default::default()
            },
        ));
        let config = tree.insert_child(entity, Descriptor::configuration("Config", "Default"));
        let g1 = gain_control(&mut tree, config, "In 1 Gain");
        let g2 = gain_control(&mut tree, config, "In 2 Gain");
        let eq = tree.insert_child(
            config,
            Descriptor::control(
                control_types::GAIN,
                "EQ",
                control_value_types::LINEAR_INT32,
                vec![
                    ControlValue::new("low", values::gain()),
                    ControlValue::new("high", values::gain()),
                ],
            ),
        );
        let mut mix = Descriptor::matrix(control_types::GAIN, "Mix", control_value_types::LINEAR_INT32);
        for _ in 0..2 {
            mix.add_row();
            for _ in 0..2 {
                mix.add_column();
                mix.add_value(ControlValue::new("gain", values::gain()));
            }
        }
        let mix = tree.insert_child(config, mix);
        tree.collect_owned_descriptors(entity, &mut DescriptorCounts::new());

        let mut root = ControlContainer::new();
        root.add_item(&["entity"], entity);
        root.add_item(&["input", "1", "gain"], g1);
        root.add_item(&["input", "2", "gain"], g2);
        root.add_item(&["eq"], eq);
        root.add_item(&["mix"], mix);
        Schema::new(tree, root)
    }

    fn address(s: &str) -> SchemaAddress {
        s.parse().unwrap()
    }

    #[test]
    fn test_collect_publishes_expected_addresses() {
        let schema = small_schema();
        let addresses: Vec<String> = schema.addresses().iter().map(|a| a.to_string()).collect();
        assert_eq!(
            addresses,
            vec![
                "/entity",
                "/entity/entity_id",
                "/entity/entity_model_id",
                "/entity/entity_name",
                "/entity/firmware_version",
                "/entity/group_name",
                "/entity/serial_number",
                "/eq/1",
                "/eq/2",
                "/input/1/gain",
                "/input/2/gain",
                "/mix",
                "/mix/1/1",
                "/mix/1/2",
                "/mix/2/1",
                "/mix/2/2",
                "/mix/object_name",
            ]
        );
    }

    #[test]
    fn test_streams_and_jacks_publish_their_object_name() {
        use crate::descriptor::types;

        let mut tree = DescriptorTree::new();
        let config = tree.insert(Descriptor::configuration("Config", "Default"));
        let stream = tree.insert_child(config, Descriptor::stream_input("Stream", "AVB In 1"));
        let jack = tree.insert_child(config, Descriptor::jack_output("Jack", "Phones"));
        let level = gain_control(&mut tree, jack, "Phones Level");
        tree.collect_owned_descriptors(config, &mut DescriptorCounts::new());

        let mut root = ControlContainer::new();
        root.add_item(&["stream", "in", "1"], stream);
        root.add_item(&["jack", "out", "1"], jack);
        root.add_item(&["jack", "out", "1", "level"], level);
        let schema = Schema::new(tree, root);

        let addresses: Vec<String> = schema.addresses().iter().map(|a| a.to_string()).collect();
        assert_eq!(
            addresses,
            vec![
                "/jack/out/1",
                "/jack/out/1/level",
                "/jack/out/1/object_name",
                "/stream/in/1",
                "/stream/in/1/object_name",
            ]
        );

        let name = schema.identity_for_address(&address("/stream/in/1/object_name")).unwrap();
        assert_eq!(name.descriptor_type, types::STREAM_INPUT);
        assert_eq!(name.descriptor_index, 0);
        assert_eq!((name.section, name.item), (Section::Name, 0));
        assert_eq!(schema.get_value(&name).unwrap(), Value::Text("AVB In 1".into()));

        let jack_name = schema.identity_for_address(&address("/jack/out/1/object_name")).unwrap();
        assert_eq!(jack_name.descriptor_type, types::JACK_OUTPUT);
        assert!(schema.set_value(None, 1, "Headphones", &jack_name).unwrap());
        assert_eq!(schema.get_value(&jack_name).unwrap(), Value::Text("Headphones".into()));

        let level = schema.identity_for_address(&address("/jack/out/1/level")).unwrap();
        assert_eq!(level.descriptor_type, types::CONTROL);
        assert_eq!(schema.get_value(&level).unwrap(), Value::Float(0.0));
    }

    #[test]
    fn test_address_identity_bijection() {
        let schema = small_schema();
        let entries = schema.entries();
        let identities: std::collections::BTreeSet<_> = entries.iter().map(|(_, id)| *id).collect();
        assert_eq!(identities.len(), entries.len());
        for (address, identity) in entries {
            assert_eq!(schema.identity_for_address(&address).unwrap(), identity);
            assert_eq!(schema.address_for_identity(&identity).unwrap(), address);
        }
    }

    #[test]
    fn test_identities_refreshed_after_counting() {
        let schema = small_schema();
        let g2 = schema.identity_for_address(&address("/input/2/gain")).unwrap();
        assert_eq!(g2.descriptor_type, crate::descriptor::types::CONTROL);
        assert_eq!(g2.descriptor_index, 1);
        let cell = schema.identity_for_address(&address("/mix/2/1")).unwrap();
        assert_eq!(cell.section, Section::HPosLevel);
        assert_eq!((cell.h_pos, cell.w_pos), (1, 0));
        let name = schema.identity_for_address(&address("/entity/group_name")).unwrap();
        assert_eq!((name.section, name.item), (Section::Name, 1));
    }

    #[test]
    fn test_get_and_set_by_identity() {
        let schema = small_schema();
        let id = schema.identity_for_address(&address("/input/1/gain")).unwrap();
        assert_eq!(schema.get_value(&id).unwrap(), Value::Float(0.0));
        assert!(schema.set_value(None, 5, -20.5, &id).unwrap());
        assert_eq!(schema.get_value(&id).unwrap(), Value::Float(-20.5));
        assert!(!schema.set_value(None, 6, -20.5, &id).unwrap());

        let err = schema.set_value(None, 7, 50.0, &id).unwrap_err();
        assert!(matches!(err, SchemaError::Value(ref e) if e.is_range_error()));
        assert_eq!(schema.get_value(&id).unwrap(), Value::Float(-20.5));
        assert!(schema.set_value_with_clamp(None, 8, 50.0, &id, ValuePosition::default()).unwrap());
        assert_eq!(schema.get_value(&id).unwrap(), Value::Float(10.0));
    }

    #[test]
    fn test_position_offsets_select_cells() {
        let schema = small_schema();
        let row = schema.identity_for_address(&address("/mix/2/1")).unwrap();
        let cell = schema.identity_for_address(&address("/mix/2/2")).unwrap();
        schema.set_value(None, 0, -3.0, &cell).unwrap();
        // the row identity plus a column offset reaches the same cell
        assert_eq!(
            schema.get_value_at(&row, ValuePosition::new(0, 1, 0)).unwrap(),
            Value::Float(-3.0)
        );
    }

    #[test]
    fn test_unresolved_position_falls_back_to_name() {
        let schema = small_schema();
        let mix = schema.identity_for_address(&address("/mix")).unwrap();
        let fallback = schema
            .with_ranged_value(&mix, ValuePosition::new(0, 9, 9), |v| v.is_string())
            .unwrap();
        assert!(fallback);
    }

    #[test]
    fn test_lookup_errors() {
        let schema = small_schema();
        let err = schema.identity_for_address(&address("/input/9/gain")).unwrap_err();
        assert_eq!(err, SchemaError::NoSuchDescriptorForAddress("/input/9/gain".into()));

        let missing = ControlIdentity::descriptor(0x1a, 99);
        assert!(matches!(
            schema.get_value(&missing),
            Err(SchemaError::NoSuchDescriptor { descriptor_index: 99, .. })
        ));
    }

    #[test]
    fn test_write_validator_blocks_contained_identities() {
        let schema = small_schema();
        let y = schema.identity_for_address(&address("/input/1/gain")).unwrap();
        let z = schema.identity_for_address(&address("/input/2/gain")).unwrap();
        let protected = ControlIdentityComparator::set([y].into_iter().collect());

        assert_eq!(
            schema.set_value(Some(&protected), 0, -1.0, &y).unwrap_err(),
            SchemaError::ReadOnly(y)
        );
        assert!(schema.set_value(Some(&protected), 0, -1.0, &z).unwrap());
    }

    #[test]
    fn test_entity_write_access() {
        let schema = small_schema();
        let protected = IdentitySet::new();
        schema.fill_write_access(&protected);
        let serial = schema.identity_for_address(&address("/entity/serial_number")).unwrap();
        let name = schema.identity_for_address(&address("/entity/entity_name")).unwrap();
        assert!(protected.contains(&serial));
        assert!(!protected.contains(&name));

        let validator = ControlIdentityComparator::set(protected);
        assert!(schema.set_value(Some(&validator), 0, "X", &serial).is_err());
        assert!(schema.set_value(Some(&validator), 0, "Stage", &name).unwrap());
        assert_eq!(schema.get_value(&name).unwrap(), Value::Text("Stage".into()));
    }

    #[test]
    fn test_all_controls_tracks_index() {
        let schema = small_schema();
        let all = schema.all_controls();
        assert_eq!(all.matched().len(), schema.len());
        assert!(all.contains(&schema.identity_for_address(&address("/eq/2")).unwrap()));
        assert!(!all.contains(&ControlIdentity::descriptor(0x1a, 99)));
    }

    #[test]
    fn test_recollect_is_stable() {
        let schema = small_schema();
        let before = schema.entries();
        schema.recollect();
        assert_eq!(schema.entries(), before);
    }
}
