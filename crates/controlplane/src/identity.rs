//! Structural control identities.

use std::fmt;

use crate::descriptor::types::INVALID;

/// Which part of a descriptor an identity addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Section {
    /// The descriptor as a whole, or one of its flat values.
    #[default]
    DescriptorLevel,
    /// A named property.
    Property,
    /// A name slot.
    Name,
    /// A row cell of a matrix-shaped descriptor.
    HPosLevel,
    /// A column cell of a matrix-shaped descriptor.
    WPosLevel,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::DescriptorLevel => "descriptor",
            Section::Property => "property",
            Section::Name => "name",
            Section::HPosLevel => "h_pos",
            Section::WPosLevel => "w_pos",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable key of one value in the descriptor tree.
///
/// Ordering is lexicographic over the fields in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControlIdentity {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub section: Section,
    pub item: u16,
    pub h_pos: u16,
    pub w_pos: u16,
}

impl Default for ControlIdentity {
    fn default() -> Self {
        Self {
            descriptor_type: INVALID,
            descriptor_index: 0,
            section: Section::DescriptorLevel,
            item: 0,
            h_pos: 0,
            w_pos: 0,
        }
    }
}

impl ControlIdentity {
    /// Identity of a descriptor as a whole.
    pub fn descriptor(descriptor_type: u16, descriptor_index: u16) -> Self {
        Self {
            descriptor_type,
            descriptor_index,
            section: Section::DescriptorLevel,
            item: 0,
            h_pos: 0,
            w_pos: 0,
        }
    }

    pub fn with_section(mut self, section: Section, item: u16) -> Self {
        self.section = section;
        self.item = item;
        self
    }

    pub fn with_position(mut self, h_pos: u16, w_pos: u16) -> Self {
        self.h_pos = h_pos;
        self.w_pos = w_pos;
        self
    }

    /// Same descriptor with section, item and positions zeroed.
    pub fn descriptor_level(&self) -> Self {
        Self::descriptor(self.descriptor_type, self.descriptor_index)
    }

    pub fn is_valid(&self) -> bool {
        self.descriptor_type != INVALID
    }
}

impl fmt::Display for ControlIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ {:#06x}, {}, {}, {}, {}, {} }}",
            self.descriptor_type,
            self.descriptor_index,
            self.section,
            self.item,
            self.h_pos,
            self.w_pos
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_field_order() {
        let a = ControlIdentity::descriptor(0x1a, 0);
        let b = ControlIdentity::descriptor(0x1a, 1);
        let c = a.with_section(Section::Property, 0);
        let d = a.with_section(Section::Property, 1);
        let e = ControlIdentity::descriptor(0x1b, 0);
        let mut ids = vec![e, d, c, b, a];
        ids.sort();
        assert_eq!(ids, vec![a, c, d, b, e]);
    }

    #[test]
    fn test_descriptor_level_normalizes() {
        let id = ControlIdentity::descriptor(0x1d, 2)
            .with_section(Section::HPosLevel, 3)
            .with_position(1, 4);
        assert_eq!(id.descriptor_level(), ControlIdentity::descriptor(0x1d, 2));
    }

    #[test]
    fn test_default_is_invalid() {
        assert!(!ControlIdentity::default().is_valid());
        assert!(ControlIdentity::descriptor(0, 0).is_valid());
    }

    #[test]
    fn test_display() {
        let id = ControlIdentity::descriptor(0x1a, 3).with_section(Section::Name, 1);
        assert_eq!(id.to_string(), "{ 0x001a, 3, name, 1, 0, 0 }");
    }

    #[test]
    fn test_display_follows_field_order() {
        let id = ControlIdentity::descriptor(0x1d, 0)
            .with_section(Section::HPosLevel, 2)
            .with_position(5, 7);
        assert_eq!((id.h_pos, id.w_pos), (5, 7));
        assert_eq!(id.to_string(), "{ 0x001d, 0, h_pos, 2, 5, 7 }");
    }
}
