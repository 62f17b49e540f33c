//! Descriptor patches
//!
//! Provides [`DescriptorPatch`]: an ordered list of marker additions and
//! removals computed against one type. Applying a patch never touches the
//! source descriptor; it yields a new one.

use crate::class::ClassName;
use crate::descriptor::{MethodSignature, TypeDescriptor};
use crate::marker::{Marker, MarkerKind, MarkerSet};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Target of a patch operation within a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "member", rename_all = "snake_case")]
pub enum MemberPath {
    /// The type itself (class-level markers)
    Type,

    /// A field, by name
    Field {
        /// Field name
        name: String,
    },

    /// A method, by signature
    Method {
        /// Method identity
        signature: MethodSignature,
    },
}

impl MemberPath {
    /// Path to a field
    #[inline]
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field { name: name.into() }
    }

    /// Path to a method
    #[inline]
    #[must_use]
    pub fn method(signature: MethodSignature) -> Self {
        Self::Method { signature }
    }
}

impl Display for MemberPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => f.write_str("<type>"),
            Self::Field { name } => write!(f, "field {name}"),
            Self::Method { signature } => write!(f, "method {signature}"),
        }
    }
}

/// Single marker change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "marker", rename_all = "snake_case")]
pub enum PatchOp {
    /// Add marker (no-op if already present)
    Add(Marker),

    /// Remove every marker of this kind (no-op if absent)
    Remove(MarkerKind),
}

/// Patch entry: operation plus target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchEntry {
    /// Member the operation targets
    pub target: MemberPath,

    /// The operation
    pub op: PatchOp,
}

/// Ordered set of marker changes for one type
///
/// # Invariants
/// - Entries apply in insertion order
/// - A patch only applies to the class it was computed for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorPatch {
    class: ClassName,
    entries: Vec<PatchEntry>,
}

impl DescriptorPatch {
    /// Create empty patch for a class
    #[inline]
    #[must_use]
    pub fn new(class: ClassName) -> Self {
        Self {
            class,
            entries: Vec::new(),
        }
    }

    /// Empty patch computed against a descriptor
    #[inline]
    #[must_use]
    pub fn for_type(descriptor: &TypeDescriptor) -> Self {
        Self::new(descriptor.class().clone())
    }

    /// Class this patch was computed for
    #[inline]
    #[must_use]
    pub fn class(&self) -> &ClassName {
        &self.class
    }

    /// Entries in application order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if patch changes nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append operation
    pub fn push(&mut self, target: MemberPath, op: PatchOp) {
        self.entries.push(PatchEntry { target, op });
    }

    /// Add class-level marker
    pub fn add_to_type(&mut self, marker: Marker) {
        self.push(MemberPath::Type, PatchOp::Add(marker));
    }

    /// Remove class-level marker kind
    pub fn remove_from_type(&mut self, kind: MarkerKind) {
        self.push(MemberPath::Type, PatchOp::Remove(kind));
    }

    /// Add marker to field
    pub fn add_to_field(&mut self, name: impl Into<String>, marker: Marker) {
        self.push(MemberPath::field(name), PatchOp::Add(marker));
    }

    /// Add marker to method
    pub fn add_to_method(&mut self, signature: MethodSignature, marker: Marker) {
        self.push(MemberPath::method(signature), PatchOp::Add(marker));
    }

    /// Remove marker kind from method
    pub fn remove_from_method(&mut self, signature: MethodSignature, kind: MarkerKind) {
        self.push(MemberPath::method(signature), PatchOp::Remove(kind));
    }

    /// Entries targeting one member
    pub fn entries_for<'a>(&'a self, target: &'a MemberPath) -> impl Iterator<Item = &'a PatchOp> {
        self.entries
            .iter()
            .filter(move |e| &e.target == target)
            .map(|e| &e.op)
    }

    /// Concatenate another patch for the same class
    ///
    /// # Errors
    /// Returns error if `other` was computed for a different class
    pub fn merge(mut self, other: DescriptorPatch) -> Result<Self, PatchError> {
        if self.class != other.class {
            return Err(PatchError::ClassMismatch {
                expected: self.class,
                actual: other.class,
            });
        }
        self.entries.extend(other.entries);
        Ok(self)
    }
}

impl TypeDescriptor {
    /// Apply patch, producing a new descriptor
    ///
    /// The receiver is left untouched.
    ///
    /// # Errors
    /// - `PatchError::ClassMismatch` if the patch targets another class
    /// - `PatchError::MemberNotFound` if a target member does not exist
    pub fn apply(&self, patch: &DescriptorPatch) -> Result<TypeDescriptor, PatchError> {
        if self.class() != patch.class() {
            return Err(PatchError::ClassMismatch {
                expected: self.class().clone(),
                actual: patch.class().clone(),
            });
        }

        let mut next = self.clone();
        for entry in patch.entries() {
            let markers = next.markers_at(&entry.target).ok_or_else(|| {
                PatchError::MemberNotFound {
                    class: patch.class().clone(),
                    member: entry.target.clone(),
                }
            })?;
            match &entry.op {
                PatchOp::Add(marker) => {
                    markers.insert(marker.clone());
                }
                PatchOp::Remove(kind) => {
                    markers.remove_kind(*kind);
                }
            }
        }
        Ok(next)
    }

    fn markers_at(&mut self, target: &MemberPath) -> Option<&mut MarkerSet> {
        match target {
            MemberPath::Type => Some(self.markers_mut()),
            MemberPath::Field { name } => self.field_mut(name).map(|f| &mut f.markers),
            MemberPath::Method { signature } => self.method_mut(signature).map(|m| &mut m.markers),
        }
    }
}

/// Errors applying or combining patches
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatchError {
    /// Patch computed for another class
    #[error("patch computed for {actual} cannot apply to {expected}")]
    ClassMismatch {
        /// Class of the receiving descriptor
        expected: ClassName,
        /// Class the patch was computed for
        actual: ClassName,
    },

    /// Target member does not exist
    #[error("{member} not found in {class}")]
    MemberNotFound {
        /// Owning class
        class: ClassName,
        /// Missing member
        member: MemberPath,
    },
}
