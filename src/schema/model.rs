//! The in-memory schema graph produced by [`loader`](super::loader)
//!
//! There is no arena: a [`Schema`] owns a `Vec<Type>` directly, each `Type`
//! owns its `String` name and `Vec<Field>`, and each `Field` owns its own
//! `String` name. Cross-type references (a `STRUCT` field's `sub_type`, a
//! protocol's `request`/`response`) are plain `usize` indices into
//! [`Schema::types`](Schema) rather than pointers, which is what lets the
//! loader fill in forward and cyclic references without unsafe code: a
//! reference only needs the *index* of its target to be valid, not the
//! target's contents, so it can point at a slot that hasn't been filled in
//! yet.

/// A loaded schema: an ordered table of record types and an ordered table of
/// RPC protocols
///
/// Immutable once built. Dropping it drops every [`Type`], [`Field`],
/// [`Protocol`] and name string it owns.
#[derive(Debug)]
pub struct Schema {
	pub(super) types: Vec<Type>,
	/// Sorted by `tag` ascending (invariant enforced by the loader)
	pub(super) protocols: Vec<Protocol>,
}

/// A named record type: an ordered, tag-ascending list of [`Field`]s
#[derive(Debug)]
pub struct Type {
	pub(super) name: String,
	/// Sorted by `tag` ascending (invariant enforced by the loader)
	pub(super) fields: Vec<Field>,
	pub(super) base: Base,
	/// Worst-case number of `u16` header slots needed to encode this type:
	/// one per field, plus one extra per gap in the tag sequence to hold a
	/// skip entry
	pub(super) max_n: usize,
}

/// Whether a type's field tags are dense enough for O(1) lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Base {
	/// Tags form the contiguous range `[base, base + fields.len())`
	Dense(i32),
	/// Tags have gaps; [`field_by_tag`](TypeRef::field_by_tag) binary searches
	Sparse,
}

/// One member of a [`Type`]
#[derive(Debug)]
pub struct Field {
	pub(super) tag: i32,
	pub(super) name: String,
	pub(super) kind: FieldKind,
	pub(super) array: bool,
	/// Index into the owning [`Schema`]'s type table; only meaningful when
	/// `kind == FieldKind::Struct`
	pub(super) sub_type: Option<usize>,
	/// The "main index" hint callers use to treat an array of structs as a
	/// map, keyed by one of the struct's own fields
	pub(super) key: Option<i32>,
	/// `INTEGER`: decimal scaling exponent `k` (caller divides by `10^k`).
	/// `STRING`: `0` for utf8, `1` for binary. Otherwise unused (`0`).
	pub(super) extra: i32,
}

/// The primitive kind of a [`Field`], independent of whether it is an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
	Integer,
	Boolean,
	String,
	Struct,
}

/// A named RPC message pair
#[derive(Debug)]
pub struct Protocol {
	pub(super) name: String,
	pub(super) tag: i32,
	pub(super) request: Option<usize>,
	pub(super) response: Option<usize>,
	pub(super) confirm: bool,
}

/// Which half of a [`Protocol`] to fetch from
/// [`protocol_query`](Schema::protocol_query)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
	Request,
	Response,
}

/// A borrowed reference to a [`Type`] inside a [`Schema`]
///
/// Cheap to copy; carries the `&Schema` lifetime so it cannot outlive the
/// schema it points into.
#[derive(Clone, Copy)]
pub struct TypeRef<'s> {
	pub(super) schema: &'s Schema,
	pub(super) idx: usize,
}

impl<'s> TypeRef<'s> {
	fn ty(self) -> &'s Type {
		&self.schema.types[self.idx]
	}

	pub fn name(self) -> &'s str {
		&self.ty().name
	}

	pub fn fields(self) -> impl ExactSizeIterator<Item = FieldRef<'s>> {
		(0..self.ty().fields.len()).map(move |field_idx| FieldRef {
			schema: self.schema,
			type_idx: self.idx,
			field_idx,
		})
	}

	pub(crate) fn idx(self) -> usize {
		self.idx
	}

	pub(crate) fn max_n(self) -> usize {
		self.ty().max_n
	}
}

impl std::fmt::Debug for TypeRef<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("TypeRef").field(&self.name()).finish()
	}
}

/// A borrowed reference to a [`Field`] inside a [`Schema`]
#[derive(Clone, Copy)]
pub struct FieldRef<'s> {
	pub(super) schema: &'s Schema,
	pub(super) type_idx: usize,
	pub(super) field_idx: usize,
}

impl<'s> FieldRef<'s> {
	fn field(self) -> &'s Field {
		&self.schema.types[self.type_idx].fields[self.field_idx]
	}

	pub fn tag(self) -> i32 {
		self.field().tag
	}

	pub fn name(self) -> &'s str {
		&self.field().name
	}

	pub fn kind(self) -> FieldKind {
		self.field().kind
	}

	pub fn is_array(self) -> bool {
		self.field().array
	}

	pub fn sub_type(self) -> Option<TypeRef<'s>> {
		self.field().sub_type.map(|idx| TypeRef {
			schema: self.schema,
			idx,
		})
	}

	pub fn key(self) -> Option<i32> {
		self.field().key
	}

	pub fn extra(self) -> i32 {
		self.field().extra
	}
}

impl std::fmt::Debug for FieldRef<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FieldRef")
			.field("name", &self.name())
			.field("tag", &self.tag())
			.field("kind", &self.kind())
			.field("array", &self.is_array())
			.finish()
	}
}
