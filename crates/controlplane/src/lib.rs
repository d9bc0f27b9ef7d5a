//! AVDECC control-plane data model.
//!
//! The crate models the controls of an audio device the way IEEE 1722.1
//! describes them, independent of any wire format:
//!
//! - **Values** ([`RangedValue`]): typed, bounded controls with a decoded
//!   application view and an encoded wire view (`decoded = encoded * 10^power`).
//! - **Descriptors** ([`DescriptorTree`]): the device tree, indexed per type
//!   and per configuration by a counting pass.
//! - **Addresses** ([`ControlContainer`]): a human readable tree parallel to
//!   the descriptors (`/input/3/gain`).
//! - **Schema** ([`Schema`]): resolves identities and addresses to values and
//!   reports every change to the [`ChangeNotifierManager`].
//! - **Notification** ([`ChangeNotifier`]): per-subscriber, rate-limited
//!   delivery driven by an external clock.
//!
//! # Usage
//!
//! ```rust
//! use controlplane::descriptor::{control_types, control_value_types};
//! use controlplane::{values, ControlContainer, ControlValue, Descriptor, DescriptorCounts, DescriptorTree, Schema};
//!
//! let mut tree = DescriptorTree::new();
//! let gain = tree.insert(Descriptor::control(
//!     control_types::GAIN,
//!     "Input 1 Gain",
//!     control_value_types::LINEAR_INT32,
//!     vec![ControlValue::new("gain", values::gain())],
//! ));
//! tree.collect_owned_descriptors(gain, &mut DescriptorCounts::new());
//!
//! let mut root = ControlContainer::new();
//! root.add_item(&["input", "1", "gain"], gain);
//! let schema = Schema::new(tree, root);
//!
//! let id = schema.identity_for_address(&"/input/1/gain".parse().unwrap()).unwrap();
//! schema.set_value(None, 0, -6.5, &id).unwrap();
//! assert_eq!(schema.get_value(&id).unwrap().to_string(), "-6.5");
//! ```

pub mod adaptor;
pub mod comparator;
pub mod container;
pub mod descriptor;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod manager;
pub mod notifier;
pub mod ranged_value;
pub mod schema;
pub mod units;
pub mod values;

/// Milliseconds on the caller's monotonic clock.
pub type Milliseconds = u64;

pub use adaptor::{AdaptorError, ChangeNotifierAdaptor, SchemaAdaptor, SchemaAddressKey, TextAddress};
pub use comparator::{AllControls, ControlIdentityComparator, IdentitySet};
pub use container::{ControlContainer, ControlPoint, SchemaAddress};
pub use descriptor::{ControlValue, Descriptor, DescriptorCounts, DescriptorId, DescriptorTree, EntityInfo};
pub use encoding::{EncodedValue, EncodingType};
pub use error::{SchemaError, ValueError};
pub use identity::{ControlIdentity, Section};
pub use manager::{ChangeNotifierManager, ChangeNotifierManagerHold};
pub use notifier::{ChangeCallback, ChangeNotificationState, ChangeNotifier, DEFAULT_MIN_SCAN_PERIOD};
pub use ranged_value::{BoolValue, Eui64Value, Numeric, Primitive, RangedValue, TextValue, Value};
pub use schema::{Schema, SchemaIndex, ValuePosition};
pub use units::UnitsCode;
