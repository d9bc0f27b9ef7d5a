//! Addressing a [`Schema`] by a protocol's own key type.
//!
//! A protocol front-end picks an address representation (identities for a
//! binary protocol, path strings for a text one) and gets the schema's
//! operations keyed by it. The address maps are built once from the schema's
//! collected index; call [`SchemaAdaptor::refresh`] after a recollect.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::comparator::ControlIdentityComparator;
use crate::container::SchemaAddress;
use crate::encoding::EncodingType;
use crate::error::SchemaError;
use crate::identity::ControlIdentity;
use crate::notifier::ChangeNotifier;
use crate::ranged_value::{RangedValue, Value};
use crate::schema::{Schema, ValuePosition};
use crate::Milliseconds;

/// An address representation a [`SchemaAdaptor`] can be keyed by.
pub trait SchemaAddressKey: Ord + Clone + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// The key for a collected `(identity, address)` pair.
    fn from_schema(identity: &ControlIdentity, address: &SchemaAddress) -> Self;
}

impl SchemaAddressKey for ControlIdentity {
    fn from_schema(identity: &ControlIdentity, _address: &SchemaAddress) -> Self {
        *identity
    }
}

/// A slash separated path such as `/input/1/gain`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextAddress(pub String);

impl TextAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SchemaAddressKey for TextAddress {
    fn from_schema(_identity: &ControlIdentity, address: &SchemaAddress) -> Self {
        Self(address.to_string())
    }
}

impl fmt::Display for TextAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TextAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl FromStr for TextAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdaptorError {
    #[error("address not found: {0}")]
    AddressNotFound(String),

    #[error("read only: {0}")]
    ReadOnly(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug)]
struct AddressMaps<A> {
    by_address: BTreeMap<A, ControlIdentity>,
    by_identity: BTreeMap<ControlIdentity, A>,
}

impl<A: SchemaAddressKey> AddressMaps<A> {
    fn collect(schema: &Schema) -> Self {
        let mut by_address = BTreeMap::new();
        let mut by_identity = BTreeMap::new();
        for (address, identity) in schema.entries() {
            let key = A::from_schema(&identity, &address);
            by_identity.insert(identity, key.clone());
            by_address.insert(key, identity);
        }
        Self {
            by_address,
            by_identity,
        }
    }

    fn keys_for(&self, identities: &BTreeSet<ControlIdentity>) -> BTreeSet<A> {
        identities
            .iter()
            .filter_map(|id| self.by_identity.get(id).cloned())
            .collect()
    }
}

pub struct SchemaAdaptor<A> {
    schema: Arc<Schema>,
    maps: Arc<AddressMaps<A>>,
}

impl<A: SchemaAddressKey> SchemaAdaptor<A> {
    pub fn new(schema: Arc<Schema>) -> Self {
        let maps = Arc::new(AddressMaps::collect(&schema));
        Self { schema, maps }
    }

    /// Rebuild the address maps from the schema's current index.
    pub fn refresh(&mut self) {
        self.maps = Arc::new(AddressMaps::collect(&self.schema));
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn addresses(&self) -> impl Iterator<Item = &A> {
        self.maps.by_address.keys()
    }

    pub fn lookup_identity_for_address(&self, address: &A) -> Result<ControlIdentity, AdaptorError> {
        self.maps
            .by_address
            .get(address)
            .copied()
            .ok_or_else(|| AdaptorError::AddressNotFound(address.to_string()))
    }

    pub fn lookup_address_for_identity(&self, identity: &ControlIdentity) -> Option<&A> {
        self.maps.by_identity.get(identity)
    }

    pub fn ranged_value(&self, address: &A) -> Result<RangedValue, AdaptorError> {
        let identity = self.lookup_identity_for_address(address)?;
        Ok(self.schema.ranged_value(&identity, ValuePosition::default())?)
    }

    fn with_value<R>(&self, address: &A, f: impl FnOnce(&RangedValue) -> R) -> Result<R, AdaptorError> {
        let identity = self.lookup_identity_for_address(address)?;
        Ok(self.schema.with_ranged_value(&identity, ValuePosition::default(), f)?)
    }

    pub fn encoding_type(&self, address: &A) -> Result<EncodingType, AdaptorError> {
        self.with_value(address, RangedValue::encoding_type)
    }

    pub fn storage_type(&self, address: &A) -> Result<EncodingType, AdaptorError> {
        self.with_value(address, RangedValue::storage_type)
    }

    pub fn is_storage_type_string(&self, address: &A) -> Result<bool, AdaptorError> {
        self.with_value(address, RangedValue::is_string)
    }

    pub fn get_value(&self, address: &A) -> Result<Value, AdaptorError> {
        self.with_value(address, RangedValue::value)
    }

    pub fn get_value_string(&self, address: &A, with_units: bool) -> Result<String, AdaptorError> {
        self.with_value(address, |v| v.value_string(with_units))
    }

    /// Set the value at `address`. See [`Schema::set_value`] for how
    /// `write_validator` is applied.
    pub fn set_value(
        &self,
        write_validator: Option<&ControlIdentityComparator>,
        now: Milliseconds,
        address: &A,
        value: impl Into<Value>,
    ) -> Result<bool, AdaptorError> {
        let identity = self.lookup_identity_for_address(address)?;
        self.schema
            .set_value(write_validator, now, value, &identity)
            .map_err(|e| Self::address_error(e, address))
    }

    pub fn set_value_with_clamp(
        &self,
        write_validator: Option<&ControlIdentityComparator>,
        now: Milliseconds,
        address: &A,
        value: impl Into<Value>,
    ) -> Result<bool, AdaptorError> {
        let identity = self.lookup_identity_for_address(address)?;
        self.schema
            .set_value_with_clamp(write_validator, now, value, &identity, ValuePosition::default())
            .map_err(|e| Self::address_error(e, address))
    }

    fn address_error(err: SchemaError, address: &A) -> AdaptorError {
        match err {
            SchemaError::ReadOnly(_) => AdaptorError::ReadOnly(address.to_string()),
            other => other.into(),
        }
    }

    /// A notifier registered with the schema's manager, keyed by `A`.
    pub fn change_notifier(&self, min_scan_period: Milliseconds) -> ChangeNotifierAdaptor<A> {
        ChangeNotifierAdaptor {
            notifier: self.schema.manager().create_notifier(min_scan_period),
            schema: Arc::clone(&self.schema),
            maps: Arc::clone(&self.maps),
        }
    }
}

impl<A> fmt::Debug for SchemaAdaptor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaAdaptor")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Address keyed subscriptions on a notifier owned by this adaptor.
///
/// The notifier is removed from the schema's manager on drop.
pub struct ChangeNotifierAdaptor<A: SchemaAddressKey> {
    schema: Arc<Schema>,
    notifier: Arc<ChangeNotifier>,
    maps: Arc<AddressMaps<A>>,
}

impl<A: SchemaAddressKey> ChangeNotifierAdaptor<A> {
    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    fn subscribe<F>(
        &self,
        comparator: ControlIdentityComparator,
        max_update_period: Milliseconds,
        min_update_period: Milliseconds,
        now: Milliseconds,
        callback: F,
    ) where
        F: Fn(Milliseconds, &BTreeSet<A>) + Send + Sync + 'static,
    {
        let maps = Arc::clone(&self.maps);
        self.notifier.add_subscription(
            comparator,
            max_update_period,
            min_update_period,
            now,
            move |time, _, identities| callback(time, &maps.keys_for(identities)),
        );
    }

    /// Subscribe to one address. Returns the comparator the subscription is
    /// keyed by.
    pub fn add_address_subscription<F>(
        &self,
        address: &A,
        max_update_period: Milliseconds,
        min_update_period: Milliseconds,
        now: Milliseconds,
        callback: F,
    ) -> Result<ControlIdentityComparator, AdaptorError>
    where
        F: Fn(Milliseconds, &BTreeSet<A>) + Send + Sync + 'static,
    {
        let identity = self
            .maps
            .by_address
            .get(address)
            .copied()
            .ok_or_else(|| AdaptorError::AddressNotFound(address.to_string()))?;
        let comparator = ControlIdentityComparator::unique(identity);
        debug!(address = %address, "address subscription");
        self.subscribe(comparator.clone(), max_update_period, min_update_period, now, callback);
        Ok(comparator)
    }

    /// Returns whether a subscription for `address` existed.
    pub fn remove_address_subscription(&self, address: &A) -> Result<bool, AdaptorError> {
        let identity = self
            .maps
            .by_address
            .get(address)
            .copied()
            .ok_or_else(|| AdaptorError::AddressNotFound(address.to_string()))?;
        Ok(self
            .notifier
            .remove_subscription(&ControlIdentityComparator::unique(identity)))
    }

    /// Subscribe to every address the schema publishes.
    pub fn add_all_subscription<F>(
        &self,
        max_update_period: Milliseconds,
        min_update_period: Milliseconds,
        now: Milliseconds,
        callback: F,
    ) -> ControlIdentityComparator
    where
        F: Fn(Milliseconds, &BTreeSet<A>) + Send + Sync + 'static,
    {
        let comparator = self.schema.all_controls();
        self.subscribe(comparator.clone(), max_update_period, min_update_period, now, callback);
        comparator
    }

    pub fn tick(&self, now: Milliseconds) {
        self.notifier.tick(now);
    }
}

impl<A: SchemaAddressKey> Drop for ChangeNotifierAdaptor<A> {
    fn drop(&mut self) {
        self.schema.manager().remove_change_notifier(self.notifier.id());
    }
}

impl<A: SchemaAddressKey> fmt::Debug for ChangeNotifierAdaptor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifierAdaptor")
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ControlContainer;
    use crate::descriptor::{control_types, control_value_types, ControlValue, Descriptor, DescriptorCounts, DescriptorTree, EntityInfo};
    use crate::values;
    use std::sync::Mutex;

    fn schema() -> Arc<Schema> {
        let mut tree = DescriptorTree::new();
        let entity = tree.insert(Descriptor::entity("Entity", &EntityInfo::default()));
        let config = tree.insert_child(entity, Descriptor::configuration("Config", "Default"));
        let gain = tree.insert_child(
            config,
            Descriptor::control(
                control_types::GAIN,
                "Gain",
                control_value_types::LINEAR_INT32,
                vec![ControlValue::new("gain", values::gain())],
            ),
        );
        let mute = tree.insert_child(
            config,
            Descriptor::control(
                control_types::MUTE,
                "Mute",
                control_value_types::LINEAR_UINT8,
                vec![ControlValue::new("mute", values::mute())],
            ),
        );
        tree.collect_owned_descriptors(entity, &mut DescriptorCounts::new());
        let mut root = ControlContainer::new();
        root.add_item(&["entity"], entity);
        root.add_item(&["input", "1", "gain"], gain);
        root.add_item(&["input", "1", "mute"], mute);
        Arc::new(Schema::new(tree, root))
    }

    fn text(s: &str) -> TextAddress {
        TextAddress::from(s)
    }

    #[test]
    fn test_text_addresses() {
        let adaptor = SchemaAdaptor::<TextAddress>::new(schema());
        let addresses: Vec<&str> = adaptor.addresses().map(TextAddress::as_str).collect();
        assert!(addresses.contains(&"/input/1/gain"));
        assert!(addresses.contains(&"/entity/serial_number"));

        let id = adaptor.lookup_identity_for_address(&text("/input/1/mute")).unwrap();
        assert_eq!(adaptor.lookup_address_for_identity(&id), Some(&text("/input/1/mute")));
        assert_eq!(
            adaptor.lookup_identity_for_address(&text("/nope")).unwrap_err(),
            AdaptorError::AddressNotFound("/nope".into())
        );
    }

    #[test]
    fn test_get_and_set() {
        let adaptor = SchemaAdaptor::<TextAddress>::new(schema());
        let gain = text("/input/1/gain");
        assert_eq!(adaptor.encoding_type(&gain).unwrap(), EncodingType::Int32);
        assert_eq!(adaptor.storage_type(&gain).unwrap(), EncodingType::Float);
        assert!(!adaptor.is_storage_type_string(&gain).unwrap());
        assert!(adaptor.set_value(None, 0, &gain, "-6").unwrap());
        assert_eq!(adaptor.get_value_string(&gain, true).unwrap(), "-6 dB");
        assert_eq!(adaptor.get_value(&gain).unwrap(), Value::Float(-6.0));
    }

    #[test]
    fn test_read_only_carries_address() {
        let schema = schema();
        let adaptor = SchemaAdaptor::<TextAddress>::new(Arc::clone(&schema));
        let protected = crate::comparator::IdentitySet::new();
        schema.fill_write_access(&protected);
        let validator = ControlIdentityComparator::set(protected);
        let serial = text("/entity/serial_number");
        assert_eq!(
            adaptor.set_value(Some(&validator), 0, &serial, "SN1").unwrap_err(),
            AdaptorError::ReadOnly("/entity/serial_number".into())
        );
    }

    #[test]
    fn test_identity_adaptor() {
        let schema = schema();
        let adaptor = SchemaAdaptor::<ControlIdentity>::new(Arc::clone(&schema));
        assert_eq!(adaptor.addresses().count(), schema.len());
        let first = *adaptor.addresses().next().unwrap();
        assert_eq!(adaptor.lookup_identity_for_address(&first).unwrap(), first);
    }

    #[test]
    fn test_notifier_adaptor_delivers_addresses_and_unregisters() {
        let schema = schema();
        let adaptor = SchemaAdaptor::<TextAddress>::new(Arc::clone(&schema));
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let notifications = adaptor.change_notifier(0);
            assert_eq!(schema.manager().notifier_count(), 1);
            let sink = Arc::clone(&seen);
            notifications
                .add_address_subscription(&text("/input/1/mute"), 30, 0, 0, move |t, addresses| {
                    sink.lock().unwrap().push((t, addresses.clone()));
                })
                .unwrap();
            adaptor.set_value(None, 5, &text("/input/1/mute"), true).unwrap();
            schema.manager().tick(20);
            assert!(seen.lock().unwrap().is_empty());
            schema.manager().tick(30);
            assert_eq!(
                *seen.lock().unwrap(),
                vec![(30, BTreeSet::from([text("/input/1/mute")]))]
            );
            assert!(notifications.remove_address_subscription(&text("/input/1/mute")).unwrap());
            assert!(!notifications.remove_address_subscription(&text("/input/1/mute")).unwrap());
        }
        assert_eq!(schema.manager().notifier_count(), 0);
    }

    #[test]
    fn test_all_subscription_heartbeat() {
        let schema = schema();
        let adaptor = SchemaAdaptor::<TextAddress>::new(Arc::clone(&schema));
        let notifications = adaptor.change_notifier(0);
        let count = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&count);
        notifications.add_all_subscription(0, 1000, 0, move |_, addresses| {
            *sink.lock().unwrap() = addresses.len();
        });
        notifications.tick(1000);
        assert_eq!(*count.lock().unwrap(), adaptor.addresses().count());
    }
}
