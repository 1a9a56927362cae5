//! The directory tree.
//!
//! On disk a storage's children form a binary tree threaded through the
//! left/right/child indices of flat 128-byte records. In memory the tree is
//! an arena of nodes addressed by [`EntryId`], each directory keeping its
//! children sorted with [`compare_names`]. The on-disk threading is only
//! rebuilt when the table is serialized.

use super::order::{compare_names, names_match};
use super::record::{empty_record, validate_name, Property, PropertyType};
use crate::common::error::{CorruptLocation, PoifsError, Result};
use crate::poifs::block_size::BigBlockSize;
use crate::poifs::consts::*;
use crate::poifs::entry::EntryId;
use fixedbitset::FixedBitSet;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct Node {
    property: Property,
    parent: Option<EntryId>,
    children: Vec<EntryId>,
}

/// Arena of directory entries rooted at [`EntryId::ROOT`].
#[derive(Debug, Clone)]
pub struct PropertyTable {
    nodes: Vec<Option<Node>>,
}

impl Default for PropertyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyTable {
    /// A table holding only an empty root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node {
                property: Property::new_root(),
                parent: None,
                children: Vec::new(),
            })],
        }
    }

    /// Decode a directory stream and rebuild the tree.
    ///
    /// Record 0 must be the root. Empty and unsupported records are skipped
    /// without following their links. Records not reachable from the root
    /// are dropped.
    pub fn parse(data: &[u8], block_size: BigBlockSize) -> Result<Self> {
        let mut records: Vec<Option<Property>> = Vec::with_capacity(data.len() / DIRENTRY_SIZE);
        for (index, chunk) in data.chunks_exact(DIRENTRY_SIZE).enumerate() {
            records.push(Property::parse(chunk, index as u32, block_size)?);
        }

        match records.first() {
            Some(Some(root)) if root.kind == PropertyType::Root => {},
            Some(_) => {
                return Err(PoifsError::corrupt_entry(0, "first directory entry is not the root"));
            },
            None => {
                return Err(PoifsError::corrupt(
                    CorruptLocation::Directory,
                    "directory stream holds no entries",
                ));
            },
        }

        let count = records.len();
        let mut claimed = FixedBitSet::with_capacity(count);
        claimed.insert(0);
        let mut nodes: Vec<Option<Node>> = vec![None; count];
        nodes[0] = records[0].take().map(|property| Node {
            property,
            parent: None,
            children: Vec::new(),
        });

        let mut storages = vec![0u32];
        while let Some(parent) = storages.pop() {
            let Some(first_child) = nodes[parent as usize].as_ref().map(|n| n.property.child) else {
                continue;
            };
            let mut children = Vec::new();
            let mut pending = vec![first_child];
            while let Some(index) = pending.pop() {
                if index == NOSTREAM {
                    continue;
                }
                if index == 0 || index as usize >= count {
                    return Err(PoifsError::corrupt_entry(
                        parent,
                        format!("invalid link to entry {} ({} entries)", index, count),
                    ));
                }
                let Some(property) = &records[index as usize] else {
                    if claimed.contains(index as usize) {
                        return Err(PoifsError::corrupt_entry(
                            index,
                            "entry is linked more than once; the directory tree has a cycle",
                        ));
                    }
                    continue;
                };
                if claimed.put(index as usize) {
                    return Err(PoifsError::corrupt_entry(
                        index,
                        "entry is linked more than once; the directory tree has a cycle",
                    ));
                }
                if property.kind == PropertyType::Root {
                    return Err(PoifsError::corrupt_entry(index, "second root entry"));
                }
                pending.push(property.left);
                pending.push(property.right);
                if property.is_directory() {
                    storages.push(index);
                }
                children.push(EntryId(index));
            }

            let name_of = |id: &EntryId| records[id.index()].as_ref().map_or("", |p| p.name.as_str());
            children.sort_by(|a, b| compare_names(name_of(a), name_of(b)));
            for pair in children.windows(2) {
                let (a, b) = (name_of(&pair[0]), name_of(&pair[1]));
                if a == b {
                    return Err(PoifsError::corrupt_entry(
                        pair[1].0,
                        format!("duplicate name {:?} in one storage", b),
                    ));
                }
                if names_match(a, b) {
                    warn!(first = %a, second = %b, "names differ only by case");
                }
            }
            for &child in &children {
                nodes[child.index()] = records[child.index()].take().map(|property| Node {
                    property,
                    parent: Some(EntryId(parent)),
                    children: Vec::new(),
                });
            }
            if let Some(node) = nodes[parent as usize].as_mut() {
                node.children = children;
            }
        }

        let orphans = records.iter().skip(1).flatten().count();
        if orphans > 0 {
            warn!(orphans, "dropping directory entries not reachable from the root");
        }
        debug!(entries = count - orphans, "parsed directory");

        Ok(Self { nodes })
    }

    fn node(&self, id: EntryId) -> Result<&Node> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| PoifsError::NotFound(format!("entry {}", id)))
    }

    fn node_mut(&mut self, id: EntryId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| PoifsError::NotFound(format!("entry {}", id)))
    }

    /// The root entry.
    pub fn root(&self) -> Result<&Property> {
        self.get(EntryId::ROOT)
    }

    /// Property of an entry.
    pub fn get(&self, id: EntryId) -> Result<&Property> {
        Ok(&self.node(id)?.property)
    }

    /// Mutable property of an entry.
    ///
    /// Renaming through this handle bypasses ordering; use [`rename`](Self::rename).
    pub fn get_mut(&mut self, id: EntryId) -> Result<&mut Property> {
        Ok(&mut self.node_mut(id)?.property)
    }

    /// Parent storage, `None` for the root.
    pub fn parent(&self, id: EntryId) -> Result<Option<EntryId>> {
        Ok(self.node(id)?.parent)
    }

    /// Children of a storage, in directory order.
    pub fn children(&self, id: EntryId) -> Result<&[EntryId]> {
        let node = self.node(id)?;
        if !node.property.is_directory() {
            return Err(PoifsError::NotADirectory(node.property.name.clone()));
        }
        Ok(&node.children)
    }

    /// Find a child by name; an exact match wins over a case-insensitive one.
    pub fn find_child(&self, dir: EntryId, name: &str) -> Result<Option<EntryId>> {
        let children = self.children(dir)?;
        let mut folded = None;
        for &child in children {
            let child_name = &self.get(child)?.name;
            if child_name == name {
                return Ok(Some(child));
            }
            if folded.is_none() && names_match(child_name, name) {
                folded = Some(child);
            }
        }
        Ok(folded)
    }

    fn insert_sorted(&mut self, dir: EntryId, id: EntryId) -> Result<()> {
        let name = self.get(id)?.name.clone();
        let position = {
            let children = self.children(dir)?;
            let mut position = children.len();
            for (i, &child) in children.iter().enumerate() {
                if compare_names(&name, &self.get(child)?.name).is_lt() {
                    position = i;
                    break;
                }
            }
            position
        };
        self.node_mut(dir)?.children.insert(position, id);
        Ok(())
    }

    /// Add `property` under storage `parent`.
    pub fn add(&mut self, parent: EntryId, mut property: Property) -> Result<EntryId> {
        if property.kind == PropertyType::Root {
            return Err(PoifsError::InvalidOperation("cannot add a second root".into()));
        }
        validate_name(&property.name)?;
        if self.find_child(parent, &property.name)?.is_some() {
            return Err(PoifsError::AlreadyExists(property.name));
        }

        let id = EntryId(self.nodes.len() as u32);
        property.index = NOSTREAM;
        self.nodes.push(Some(Node {
            property,
            parent: Some(parent),
            children: Vec::new(),
        }));
        self.insert_sorted(parent, id)?;
        Ok(id)
    }

    /// Remove an entry. Storages must be empty.
    pub fn remove(&mut self, id: EntryId) -> Result<Property> {
        let node = self.node(id)?;
        let Some(parent) = node.parent else {
            return Err(PoifsError::InvalidOperation("cannot delete the root entry".into()));
        };
        if !node.children.is_empty() {
            return Err(PoifsError::DirectoryNotEmpty(node.property.name.clone()));
        }

        self.node_mut(parent)?.children.retain(|&c| c != id);
        let node = self.nodes[id.index()]
            .take()
            .ok_or_else(|| PoifsError::NotFound(format!("entry {}", id)))?;
        Ok(node.property)
    }

    /// Rename an entry, keeping its parent's children sorted.
    pub fn rename(&mut self, id: EntryId, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        let Some(parent) = self.parent(id)? else {
            return Err(PoifsError::InvalidOperation("cannot rename the root entry".into()));
        };
        for &sibling in self.children(parent)? {
            if sibling != id && names_match(&self.get(sibling)?.name, new_name) {
                return Err(PoifsError::AlreadyExists(new_name.to_string()));
            }
        }

        self.node_mut(parent)?.children.retain(|&c| c != id);
        self.node_mut(id)?.property.name = new_name.to_string();
        self.insert_sorted(parent, id)
    }

    /// Path components from the root (exclusive) down to `id`.
    pub fn path(&self, id: EntryId) -> Result<Vec<String>> {
        let mut components = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current)? {
            components.push(self.get(current)?.name.clone());
            current = parent;
        }
        components.reverse();
        Ok(components)
    }

    /// Every live entry in pre-order, root first.
    pub fn pre_order(&self) -> Vec<EntryId> {
        let mut order = Vec::new();
        let mut stack = vec![EntryId::ROOT];
        while let Some(id) = stack.pop() {
            let Ok(node) = self.node(id) else { continue };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// True when the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize into a directory stream padded to whole blocks.
    ///
    /// Entries are renumbered in pre-order. Each storage points at its
    /// middle child; earlier siblings hang off to the left and later ones to
    /// the right. Every node is black.
    pub fn to_bytes(&self, block_size: BigBlockSize) -> Vec<u8> {
        let order = self.pre_order();
        let mut renumbered = vec![NOSTREAM; self.nodes.len()];
        for (new_index, id) in order.iter().enumerate() {
            renumbered[id.index()] = new_index as u32;
        }

        let mut records: Vec<Property> = Vec::with_capacity(order.len());
        for &id in &order {
            if let Ok(node) = self.node(id) {
                let mut property = node.property.clone();
                property.color = COLOR_BLACK;
                property.left = NOSTREAM;
                property.right = NOSTREAM;
                property.child = NOSTREAM;
                records.push(property);
            }
        }

        for (position, &id) in order.iter().enumerate() {
            let Ok(node) = self.node(id) else { continue };
            let sorted: Vec<u32> = node
                .children
                .iter()
                .map(|c| renumbered[c.index()])
                .collect();
            if sorted.is_empty() {
                continue;
            }
            let midpoint = sorted.len() / 2;
            records[position].child = sorted[midpoint];
            for j in 1..=midpoint {
                records[sorted[j] as usize].left = sorted[j - 1];
            }
            for j in midpoint..sorted.len() - 1 {
                records[sorted[j] as usize].right = sorted[j + 1];
            }
        }

        let per_block = block_size.properties_per_block();
        let padded = records.len().div_ceil(per_block) * per_block;
        let mut out = Vec::with_capacity(padded * DIRENTRY_SIZE);
        for property in &records {
            out.extend_from_slice(&property.to_bytes());
        }
        for _ in records.len()..padded {
            out.extend_from_slice(&empty_record());
        }
        debug!(entries = records.len(), blocks = padded / per_block, "serialized directory");
        out
    }
}
