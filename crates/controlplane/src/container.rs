//! Human-readable hierarchical addressing.
//!
//! A [`ControlContainer`] is a string-keyed tree parallel to the descriptor
//! tree. Leaves bind a path such as `/input/3/gain` to a descriptor and an
//! identity. The same key may name both a sub-container and a leaf, which is
//! how a control's properties hang below the control itself.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::descriptor::{DescriptorId, DescriptorTree};
use crate::identity::ControlIdentity;

/// A path through a [`ControlContainer`], one element per level.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaAddress(pub Vec<String>);

impl SchemaAddress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[String] {
        &self.0
    }

    pub fn push(&mut self, element: impl Into<String>) {
        self.0.push(element.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    pub fn child(&self, element: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.push(element);
        next
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SchemaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for element in &self.0 {
            write!(f, "/{}", element)?;
        }
        Ok(())
    }
}

impl FromStr for SchemaAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(
            s.split('/')
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect(),
        ))
    }
}

impl<S: Into<String>> FromIterator<S> for SchemaAddress {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A leaf binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPoint {
    pub descriptor: DescriptorId,
    pub identity: ControlIdentity,
}

#[derive(Debug, Clone, Default)]
pub struct ControlContainer {
    containers: BTreeMap<String, ControlContainer>,
    leaves: BTreeMap<String, ControlPoint>,
}

impl ControlContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the container at `path`.
    pub fn add_container<S: AsRef<str>>(&mut self, path: &[S]) -> &mut ControlContainer {
        let mut node = self;
        for element in path {
            node = node
                .containers
                .entry(element.as_ref().to_string())
                .or_default();
        }
        node
    }

    /// Bind `path` to a descriptor with a not yet refreshed identity.
    pub fn add_item<S: AsRef<str>>(&mut self, path: &[S], descriptor: DescriptorId) {
        self.add_item_with_identity(path, descriptor, ControlIdentity::default());
    }

    /// Bind `path` to a descriptor and identity, replacing any previous leaf.
    pub fn add_item_with_identity<S: AsRef<str>>(
        &mut self,
        path: &[S],
        descriptor: DescriptorId,
        identity: ControlIdentity,
    ) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        self.add_container(parents).leaves.insert(
            last.as_ref().to_string(),
            ControlPoint {
                descriptor,
                identity,
            },
        );
    }

    /// Remove the leaf and the sub-container at `path`.
    pub fn remove_item<S: AsRef<str>>(&mut self, path: &[S]) -> Option<ControlPoint> {
        let (last, parents) = path.split_last()?;
        let parent = self.find_container_mut(parents)?;
        parent.containers.remove(last.as_ref());
        parent.leaves.remove(last.as_ref())
    }

    /// Remove only the leaf at `path`, keeping any sub-container of the
    /// same name.
    pub fn remove_leaf<S: AsRef<str>>(&mut self, path: &[S]) -> Option<ControlPoint> {
        let (last, parents) = path.split_last()?;
        self.find_container_mut(parents)?.leaves.remove(last.as_ref())
    }

    pub fn find_leaf<S: AsRef<str>>(&self, path: &[S]) -> Option<&ControlPoint> {
        let (last, parents) = path.split_last()?;
        self.find_container(parents)?.leaves.get(last.as_ref())
    }

    pub fn find_descriptor<S: AsRef<str>>(&self, path: &[S]) -> Option<DescriptorId> {
        self.find_leaf(path).map(|leaf| leaf.descriptor)
    }

    pub fn find_container<S: AsRef<str>>(&self, path: &[S]) -> Option<&ControlContainer> {
        let mut node = self;
        for element in path {
            node = node.containers.get(element.as_ref())?;
        }
        Some(node)
    }

    fn find_container_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut ControlContainer> {
        let mut node = self;
        for element in path {
            node = node.containers.get_mut(element.as_ref())?;
        }
        Some(node)
    }

    pub fn container_keys(&self) -> impl Iterator<Item = &str> {
        self.containers.keys().map(String::as_str)
    }

    pub fn leaf_keys(&self) -> impl Iterator<Item = &str> {
        self.leaves.keys().map(String::as_str)
    }

    /// Visit every leaf depth-first: sub-containers before leaves, keys in
    /// lexical order.
    pub fn enumerate<F>(&self, mut callback: F)
    where
        F: FnMut(&SchemaAddress, &ControlPoint),
    {
        let mut working = SchemaAddress::new();
        self.enumerate_from(&mut working, &mut callback);
    }

    fn enumerate_from<F>(&self, working: &mut SchemaAddress, callback: &mut F)
    where
        F: FnMut(&SchemaAddress, &ControlPoint),
    {
        for (key, container) in &self.containers {
            working.push(key.as_str());
            container.enumerate_from(working, callback);
            working.pop();
        }
        for (key, leaf) in &self.leaves {
            working.push(key.as_str());
            callback(&*working, leaf);
            working.pop();
        }
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
            + self
                .containers
                .values()
                .map(ControlContainer::num_leaves)
                .sum::<usize>()
    }

    /// Refresh each leaf's descriptor type and index from the tree, keeping
    /// its section, item and positions.
    pub fn update_control_identities(&mut self, tree: &DescriptorTree) {
        for container in self.containers.values_mut() {
            container.update_control_identities(tree);
        }
        for leaf in self.leaves.values_mut() {
            if let Some(d) = tree.get(leaf.descriptor) {
                leaf.identity.descriptor_type = d.descriptor_type();
                leaf.identity.descriptor_index = d.descriptor_index();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{types, Descriptor, DescriptorCounts};
    use crate::identity::Section;

    fn collect_paths(root: &ControlContainer) -> Vec<String> {
        let mut paths = Vec::new();
        root.enumerate(|address, _| paths.push(address.to_string()));
        paths
    }

    #[test]
    fn test_address_parse_and_display() {
        let a: SchemaAddress = "/input/3/gain".parse().unwrap();
        assert_eq!(a.elements(), ["input", "3", "gain"]);
        assert_eq!(a.to_string(), "/input/3/gain");
        assert_eq!(SchemaAddress::new().to_string(), "/");
        assert_eq!(a.child("x").len(), 4);
    }

    #[test]
    fn test_enumerate_order() {
        let mut root = ControlContainer::new();
        root.add_item(&["zeta"], DescriptorId(0));
        root.add_item(&["input", "2", "gain"], DescriptorId(1));
        root.add_item(&["input", "1", "mute"], DescriptorId(2));
        root.add_item(&["input", "1", "gain"], DescriptorId(3));
        root.add_item(&["alpha"], DescriptorId(4));

        assert_eq!(
            collect_paths(&root),
            vec![
                "/input/1/gain",
                "/input/1/mute",
                "/input/2/gain",
                "/alpha",
                "/zeta"
            ]
        );
        assert_eq!(root.num_leaves(), 5);
    }

    #[test]
    fn test_leaf_and_container_share_key() {
        let mut root = ControlContainer::new();
        root.add_item(&["mix"], DescriptorId(0));
        root.add_item(&["mix", "object_name"], DescriptorId(0));
        assert_eq!(collect_paths(&root), vec!["/mix/object_name", "/mix"]);

        // replacing the leaf keeps the sub-container
        root.add_item(&["mix"], DescriptorId(1));
        assert_eq!(root.find_descriptor(&["mix"]), Some(DescriptorId(1)));
        assert!(root.find_container(&["mix"]).is_some());
    }

    #[test]
    fn test_find_and_remove() {
        let mut root = ControlContainer::new();
        root.add_item(&["output", "1", "gain"], DescriptorId(7));
        assert_eq!(root.find_descriptor(&["output", "1", "gain"]), Some(DescriptorId(7)));
        assert_eq!(root.find_descriptor(&["output", "2", "gain"]), None);
        assert!(root.find_container(&["output", "1"]).is_some());

        let removed = root.remove_item(&["output", "1", "gain"]).unwrap();
        assert_eq!(removed.descriptor, DescriptorId(7));
        assert_eq!(root.num_leaves(), 0);
        assert!(root.remove_item(&["output", "1", "gain"]).is_none());
    }

    #[test]
    fn test_update_control_identities_keeps_section() {
        let mut tree = DescriptorTree::new();
        let a = tree.insert(Descriptor::new("a", types::CONTROL));
        let b = tree.insert(Descriptor::new("b", types::CONTROL));
        let root_id = tree.insert(Descriptor::new("root", types::AUDIO_UNIT));
        tree.add_child(root_id, a);
        tree.add_child(root_id, b);
        tree.collect_owned_descriptors(root_id, &mut DescriptorCounts::new());

        let mut root = ControlContainer::new();
        root.add_item_with_identity(
            &["b", "name"],
            b,
            ControlIdentity::default().with_section(Section::Name, 0),
        );
        root.update_control_identities(&tree);

        let leaf = root.find_leaf(&["b", "name"]).unwrap();
        assert_eq!(leaf.identity.descriptor_type, types::CONTROL);
        assert_eq!(leaf.identity.descriptor_index, 1);
        assert_eq!(leaf.identity.section, Section::Name);
    }
}
