//! Lookups over an already-loaded [`Schema`](super::Schema)
//!
//! None of these mutate anything; they're all read-only traversals over the
//! tables [`loader`](super::loader) built. Complexity choices mirror the
//! reference implementation exactly: name lookups are linear scans (the
//! wire format carries no name index and schemas are small), tag lookups on
//! fields are O(1) when the type's tags are dense and O(log n) otherwise,
//! and protocol-by-tag lookups binary search the tag-sorted protocol table.

use super::model::{FieldRef, Schema, TypeRef, Which};

impl Schema {
	pub fn type_by_name(&self, name: &str) -> Option<TypeRef<'_>> {
		self.types
			.iter()
			.position(|t| t.name == name)
			.map(|idx| TypeRef { schema: self, idx })
	}

	pub fn protocol_tag(&self, name: &str) -> Option<i32> {
		self.protocols.iter().find(|p| p.name == name).map(|p| p.tag)
	}

	pub fn protocol_name(&self, tag: i32) -> Option<&str> {
		self.find_protocol(tag).map(|p| p.name.as_str())
	}

	pub fn protocol_query(&self, tag: i32, which: Which) -> Option<TypeRef<'_>> {
		let idx = match which {
			Which::Request => self.find_protocol(tag)?.request,
			Which::Response => self.find_protocol(tag)?.response,
		}?;
		Some(TypeRef { schema: self, idx })
	}

	pub fn protocol_has_response(&self, tag: i32) -> bool {
		match self.find_protocol(tag) {
			Some(p) => p.response.is_some() || p.confirm,
			None => false,
		}
	}

	/// Binary search over the protocol table; relies on the loader's
	/// strictly-ascending-tag invariant.
	fn find_protocol(&self, tag: i32) -> Option<&super::model::Protocol> {
		self.protocols
			.binary_search_by_key(&tag, |p| p.tag)
			.ok()
			.map(|idx| &self.protocols[idx])
	}
}

impl<'s> TypeRef<'s> {
	pub fn field_by_name(self, name: &str) -> Option<FieldRef<'s>> {
		self.fields().find(|f| f.name() == name)
	}

	/// O(1) for a dense type, O(log n) binary search otherwise.
	pub fn field_by_tag(self, tag: i32) -> Option<FieldRef<'s>> {
		let ty = &self.schema.types[self.idx];
		let field_idx = match ty.base {
			super::model::Base::Dense(base) => {
				let field_idx = usize::try_from(tag - base).ok()?;
				(field_idx < ty.fields.len()).then_some(field_idx)?
			}
			super::model::Base::Sparse => ty.fields.binary_search_by_key(&tag, |f| f.tag).ok()?,
		};
		Some(FieldRef {
			schema: self.schema,
			type_idx: self.idx,
			field_idx,
		})
	}
}
