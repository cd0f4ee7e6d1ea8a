//! Type descriptors: the codec's single source of truth for layout.
//!
//! A [`TypeDescriptor`] is built once per type per [`DynSsz`](crate::DynSsz)
//! instance, by combining the type's structure (supplied by the `Encode` /
//! `Decode` derives or the built-in implementations) with the field
//! annotations and the instance's spec registry. The recursive encode and
//! decode paths consume descriptors, never live type queries.

use crate::error::{Error, ErrorKind};
use crate::spec::SpecValues;
use crate::tag::{parse_dynamic_tag, parse_static_tag, DynamicDim, StaticDim};
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::any::TypeId;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::Arc;

/// Sentinel for a list dimension with no declared maximum.
pub(crate) const UNBOUNDED: u64 = u64::max_value();

/// The closed set of SSZ type kinds the codec handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SszKind {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uint128,
    Uint256,
    Vector,
    ByteVector,
    List,
    ByteList,
    BitVector,
    BitList,
    Container,
    Union,
}

/// The resolved size of one collection dimension.
///
/// `is_spec_derived` is true when the value came from a `dynamic_size`
/// expression; `is_dynamic` is true when the resolved value differs from the
/// dimension's static default, which forces the dynamic codec path at this
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHint {
    pub value: u64,
    pub is_dynamic: bool,
    pub is_spec_derived: bool,
}

impl SizeHint {
    /// A hint that restates the static default.
    pub fn fixed(value: u64) -> Self {
        Self {
            value,
            is_dynamic: false,
            is_spec_derived: false,
        }
    }

    /// A hint resolved from a `dynamic_size` expression.
    pub fn resolved(value: u64, is_dynamic: bool) -> Self {
        Self {
            value,
            is_dynamic,
            is_spec_derived: true,
        }
    }
}

/// Returns true if any dimension at or below this boundary was overridden.
pub fn hints_are_dynamic(hints: &[SizeHint]) -> bool {
    hints.iter().any(|hint| hint.is_dynamic)
}

/// Splits the hint for the outermost dimension from the hints that apply to
/// the element type.
pub(crate) fn split_hints(hints: &[SizeHint]) -> (Option<SizeHint>, &[SizeHint]) {
    match hints.split_first() {
        Some((hint, rest)) => (Some(*hint), rest),
        None => (None, &[]),
    }
}

/// One field of a container type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub desc: Arc<TypeDescriptor>,
    /// Per-dimension size hints, outermost first. Dimensions deeper than the
    /// annotations keep their type-level defaults.
    pub hints: SmallVec<[SizeHint; 2]>,
    /// The field's serialized size under the hints in force, if fixed.
    pub fixed_len: Option<usize>,
}

impl FieldDescriptor {
    /// True when this field cannot take the static fast path: either a
    /// dimension was overridden or the field's type itself needs the dynamic
    /// path.
    pub fn needs_dynamic(&self) -> bool {
        hints_are_dynamic(&self.hints) || self.desc.needs_dynamic
    }
}

/// One variant of a union type. `elem` is `None` for a declared `Null`
/// variant (only legal at selector zero).
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDescriptor {
    pub name: &'static str,
    pub elem: Option<Arc<TypeDescriptor>>,
}

/// A memoized description of one reflected type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub kind: SszKind,
    /// The serialized size of the type if it is fixed-length, `None` for
    /// variable-length types. For containers this is the sum of the fields'
    /// effective sizes, so it already reflects spec overrides.
    pub static_size: Option<usize>,
    /// Collections: the declared length (vectors) or maximum (lists), `None`
    /// for an uncapped list.
    pub default_len: Option<u64>,
    /// Collections: the element type.
    pub elem: Option<Arc<TypeDescriptor>>,
    /// Containers: the fields, in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Unions: the variants, in selector order.
    pub variants: Vec<VariantDescriptor>,
    /// True when any dimension of any field (transitively) was overridden by
    /// a spec value, meaning the static fast path must not be used.
    pub needs_dynamic: bool,
    /// True when the type provides the static codec.
    pub fast_path: bool,
}

impl TypeDescriptor {
    fn leaf(kind: SszKind, size: usize) -> Self {
        Self {
            kind,
            static_size: Some(size),
            default_len: None,
            elem: None,
            fields: Vec::new(),
            variants: Vec::new(),
            needs_dynamic: false,
            fast_path: true,
        }
    }

    pub fn bool_type() -> Self {
        Self::leaf(SszKind::Bool, 1)
    }

    pub fn uint(bits: usize) -> Self {
        let kind = match bits {
            8 => SszKind::Uint8,
            16 => SszKind::Uint16,
            32 => SszKind::Uint32,
            64 => SszKind::Uint64,
            128 => SszKind::Uint128,
            256 => SszKind::Uint256,
            _ => unreachable!("unsupported uint width"),
        };
        Self::leaf(kind, bits / 8)
    }

    /// A fixed blob of `len` bytes (`H256`, `[u8; N]`, `FixedVector<u8, N>`).
    pub fn byte_vector(len: usize) -> Self {
        Self {
            kind: SszKind::ByteVector,
            static_size: Some(len),
            default_len: Some(len as u64),
            elem: Some(Arc::new(Self::uint(8))),
            fields: Vec::new(),
            variants: Vec::new(),
            needs_dynamic: false,
            fast_path: true,
        }
    }

    pub fn vector(elem: Arc<TypeDescriptor>, len: u64) -> Result<Self, Error> {
        let kind = if elem.kind == SszKind::Uint8 {
            SszKind::ByteVector
        } else {
            SszKind::Vector
        };
        let static_size = match elem.static_size {
            Some(elem_size) => Some(mul_len(len, elem_size)?),
            None => None,
        };
        Ok(Self {
            kind,
            static_size,
            default_len: Some(len),
            needs_dynamic: elem.needs_dynamic,
            fast_path: elem.fast_path,
            elem: Some(elem),
            fields: Vec::new(),
            variants: Vec::new(),
        })
    }

    pub fn list(elem: Arc<TypeDescriptor>, max: Option<u64>) -> Self {
        let kind = if elem.kind == SszKind::Uint8 {
            SszKind::ByteList
        } else {
            SszKind::List
        };
        Self {
            kind,
            static_size: None,
            default_len: max,
            needs_dynamic: elem.needs_dynamic,
            fast_path: elem.fast_path,
            elem: Some(elem),
            fields: Vec::new(),
            variants: Vec::new(),
        }
    }

    pub fn bit_vector(len: u64) -> Self {
        Self {
            kind: SszKind::BitVector,
            static_size: Some(bytes_for_bit_len_u64(len)),
            default_len: Some(len),
            elem: None,
            fields: Vec::new(),
            variants: Vec::new(),
            needs_dynamic: false,
            fast_path: true,
        }
    }

    pub fn bit_list(max: u64) -> Self {
        Self {
            kind: SszKind::BitList,
            static_size: None,
            default_len: Some(max),
            elem: None,
            fields: Vec::new(),
            variants: Vec::new(),
            needs_dynamic: false,
            fast_path: true,
        }
    }

    pub fn container(fields: Vec<FieldDescriptor>) -> Result<Self, Error> {
        let needs_dynamic = fields.iter().any(|field| field.needs_dynamic());
        let fast_path = fields.iter().all(|field| field.desc.fast_path);
        let mut static_size = Some(0usize);
        for field in &fields {
            static_size = match (static_size, field.fixed_len) {
                (Some(sum), Some(len)) => {
                    Some(sum.checked_add(len).ok_or_else(Error::overflow)?)
                }
                _ => None,
            };
        }
        Ok(Self {
            kind: SszKind::Container,
            static_size,
            default_len: None,
            elem: None,
            fields,
            variants: Vec::new(),
            needs_dynamic,
            fast_path,
        })
    }

    pub fn union(variants: Vec<VariantDescriptor>) -> Self {
        let needs_dynamic = variants
            .iter()
            .filter_map(|variant| variant.elem.as_ref())
            .any(|elem| elem.needs_dynamic);
        let fast_path = variants
            .iter()
            .filter_map(|variant| variant.elem.as_ref())
            .all(|elem| elem.fast_path);
        Self {
            kind: SszKind::Union,
            static_size: None,
            default_len: None,
            elem: None,
            fields: Vec::new(),
            variants,
            needs_dynamic,
            fast_path,
        }
    }

    /// Marks the type as not providing the static codec, forcing the dynamic
    /// path even when no spec override is in force.
    pub fn without_fast_path(mut self) -> Self {
        self.fast_path = false;
        self
    }

    /// True iff the type serializes to a value-independent number of bytes.
    pub fn is_fixed_len(&self) -> bool {
        self.static_size.is_some()
    }
}

/// The number of nested collection dimensions annotations may address on this
/// type: collections contribute one dimension each and recurse through their
/// element type; containers, unions and primitives terminate the chain.
pub(crate) fn collection_depth(desc: &TypeDescriptor) -> usize {
    match desc.kind {
        SszKind::Vector | SszKind::ByteVector | SszKind::List | SszKind::ByteList => {
            1 + desc.elem.as_ref().map_or(0, |elem| collection_depth(elem))
        }
        SszKind::BitVector | SszKind::BitList => 1,
        _ => 0,
    }
}

/// The type-level default for each collection dimension, outermost first.
fn default_dims(desc: &TypeDescriptor, depth: usize) -> Vec<Option<u64>> {
    let mut dims = Vec::with_capacity(depth);
    let mut current = Some(desc);
    while let Some(desc) = current {
        match desc.kind {
            SszKind::Vector | SszKind::ByteVector | SszKind::List | SszKind::ByteList => {
                dims.push(desc.default_len);
                current = desc.elem.as_deref();
            }
            SszKind::BitVector | SszKind::BitList => {
                dims.push(desc.default_len);
                current = None;
            }
            _ => current = None,
        }
    }
    dims
}

/// The serialized size of a value of this type under `hints`, if fixed.
///
/// Hints rescale fixed collection dimensions; they never change whether a
/// type is fixed or variable.
pub(crate) fn effective_fixed_len(
    desc: &TypeDescriptor,
    hints: &[SizeHint],
) -> Result<Option<usize>, Error> {
    let static_size = match desc.static_size {
        Some(size) => size,
        None => return Ok(None),
    };
    if hints.is_empty() {
        return Ok(Some(static_size));
    }
    match desc.kind {
        SszKind::Vector | SszKind::ByteVector => {
            let (hint, elem_hints) = hints.split_first().expect("hints is non-empty");
            let len = hint.value;
            let elem = desc.elem.as_ref().expect("vectors have an element type");
            let elem_len = effective_fixed_len(elem, elem_hints)?
                .expect("a fixed vector has a fixed element type");
            Ok(Some(mul_len(len, elem_len)?))
        }
        SszKind::BitVector => Ok(Some(bytes_for_bit_len_u64(hints[0].value))),
        _ => Ok(Some(static_size)),
    }
}

/// Combines a field type's descriptor with the field's annotations, producing
/// the per-dimension hints and the field's effective fixed size.
pub fn resolve_field(
    specs: &SpecValues,
    desc: Arc<TypeDescriptor>,
    name: &'static str,
    static_tag: Option<&str>,
    dynamic_tag: Option<&str>,
) -> Result<FieldDescriptor, Error> {
    resolve_field_inner(specs, desc, name, static_tag, dynamic_tag)
        .map_err(|e| e.with_field(name))
}

fn resolve_field_inner(
    specs: &SpecValues,
    desc: Arc<TypeDescriptor>,
    name: &'static str,
    static_tag: Option<&str>,
    dynamic_tag: Option<&str>,
) -> Result<FieldDescriptor, Error> {
    let static_dims = match static_tag {
        Some(tag) => parse_static_tag(tag).map_err(Error::from)?,
        None => Vec::new(),
    };
    let dynamic_dims = match dynamic_tag {
        Some(tag) => parse_dynamic_tag(tag).map_err(Error::from)?,
        None => Vec::new(),
    };

    if static_tag.is_some() && dynamic_tag.is_some() && static_dims.len() != dynamic_dims.len() {
        return Err(tag_error(
            "static_size and dynamic_size declare different dimension counts",
        ));
    }

    let depth = collection_depth(&desc);
    let num_dims = static_dims.len().max(dynamic_dims.len());
    if num_dims > depth {
        return Err(tag_error(
            "size annotation declares more dimensions than the type has",
        ));
    }

    let defaults = default_dims(&desc, depth);
    let mut hints: SmallVec<[SizeHint; 2]> = SmallVec::new();
    for dim in 0..num_dims {
        let baseline = match static_dims.get(dim) {
            Some(StaticDim::Size(size)) => {
                if let Some(declared) = defaults[dim] {
                    if *size != declared {
                        return Err(tag_error(
                            "static_size disagrees with the type's declared length",
                        ));
                    }
                }
                Some(*size)
            }
            Some(StaticDim::Variable) => None,
            None => defaults[dim],
        };

        let hint = match dynamic_dims.get(dim) {
            Some(DynamicDim::Expr(expr)) => {
                let value = expr.eval(specs).map_err(Error::from)?;
                SizeHint::resolved(value, baseline != Some(value))
            }
            _ => SizeHint::fixed(baseline.unwrap_or(UNBOUNDED)),
        };
        hints.push(hint);
    }

    let fixed_len = effective_fixed_len(&desc, &hints)?;
    Ok(FieldDescriptor {
        name,
        desc,
        hints,
        fixed_len,
    })
}

fn tag_error(message: &str) -> Error {
    Error::new(ErrorKind::Expression(message.to_string()))
}

fn mul_len(len: u64, elem_size: usize) -> Result<usize, Error> {
    let len = usize::try_from(len).map_err(|_| Error::overflow())?;
    len.checked_mul(elem_size).ok_or_else(Error::overflow)
}

pub(crate) fn bytes_for_bit_len(bit_len: usize) -> usize {
    (bit_len + 7) / 8
}

fn bytes_for_bit_len_u64(bit_len: u64) -> usize {
    ((bit_len + 7) / 8) as usize
}

/// Per-instance memo of built descriptors.
///
/// Reads of an already-built descriptor take the read lock only; a build
/// happens outside the lock (descriptor construction recurses into component
/// types) and the first completed build for a type wins.
#[derive(Default)]
pub(crate) struct DescriptorCache {
    map: RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>,
}

impl DescriptorCache {
    pub fn get<T: 'static>(&self) -> Option<Arc<TypeDescriptor>> {
        self.map.read().get(&TypeId::of::<T>()).cloned()
    }

    pub fn insert<T: 'static>(&self, desc: TypeDescriptor) -> Arc<TypeDescriptor> {
        self.map
            .write()
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(desc))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(pairs: &[(&str, u64)]) -> SpecValues {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn roots_vector() -> Arc<TypeDescriptor> {
        // Vector[Vector[u8, 32], 8192], the classic block-roots shape.
        let root = Arc::new(TypeDescriptor::byte_vector(32));
        Arc::new(TypeDescriptor::vector(root, 8192).unwrap())
    }

    #[test]
    fn static_only_matches_declared() {
        let field = resolve_field(
            &specs(&[]),
            roots_vector(),
            "block_roots",
            Some("8192,32"),
            None,
        )
        .unwrap();

        assert_eq!(field.hints.len(), 2);
        assert!(!field.needs_dynamic());
        assert_eq!(field.fixed_len, Some(8192 * 32));
    }

    #[test]
    fn static_disagreement_is_rejected() {
        let err = resolve_field(
            &specs(&[]),
            roots_vector(),
            "block_roots",
            Some("4096,32"),
            None,
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Expression(_)));
    }

    #[test]
    fn dimension_count_mismatch_is_rejected() {
        let err = resolve_field(
            &specs(&[("X", 64)]),
            roots_vector(),
            "block_roots",
            Some("8192,32"),
            Some("X"),
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Expression(_)));
    }

    #[test]
    fn too_many_dimensions_is_rejected() {
        let err = resolve_field(
            &specs(&[]),
            Arc::new(TypeDescriptor::uint(64)),
            "slot",
            Some("8"),
            None,
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Expression(_)));
    }

    #[test]
    fn dynamic_override_rescales_fixed_len() {
        let field = resolve_field(
            &specs(&[("SLOTS_PER_HISTORICAL_ROOT", 64)]),
            roots_vector(),
            "block_roots",
            Some("8192,32"),
            Some("SLOTS_PER_HISTORICAL_ROOT,32"),
        )
        .unwrap();

        assert_eq!(
            field.hints[0],
            SizeHint {
                value: 64,
                is_dynamic: true,
                is_spec_derived: true,
            }
        );
        // The inner dimension restates its default.
        assert!(!field.hints[1].is_dynamic);
        assert!(field.hints[1].is_spec_derived);
        assert!(field.needs_dynamic());
        assert_eq!(field.fixed_len, Some(64 * 32));
    }

    #[test]
    fn dynamic_matching_default_is_not_dynamic() {
        let field = resolve_field(
            &specs(&[("SLOTS_PER_HISTORICAL_ROOT", 8192)]),
            roots_vector(),
            "block_roots",
            None,
            Some("SLOTS_PER_HISTORICAL_ROOT,32"),
        )
        .unwrap();

        assert!(!field.needs_dynamic());
        assert_eq!(field.fixed_len, Some(8192 * 32));
    }

    #[test]
    fn unknown_spec_surfaces_by_name() {
        let err = resolve_field(
            &specs(&[]),
            roots_vector(),
            "block_roots",
            None,
            Some("MISSING,32"),
        )
        .unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::UnknownSpec("MISSING".to_string())
        );
        assert_eq!(err.path(), "block_roots");
    }

    #[test]
    fn container_static_size_uses_effective_lengths() {
        let slots = specs(&[("SLOTS", 16)]);
        let field = resolve_field(&slots, roots_vector(), "roots", None, Some("SLOTS,32")).unwrap();
        let slot_field = resolve_field(
            &slots,
            Arc::new(TypeDescriptor::uint(64)),
            "slot",
            None,
            None,
        )
        .unwrap();

        let container = TypeDescriptor::container(vec![slot_field, field]).unwrap();
        assert!(container.needs_dynamic);
        assert_eq!(container.static_size, Some(8 + 16 * 32));
    }
}
