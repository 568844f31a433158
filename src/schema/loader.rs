//! Parses a compiled bundle into a [`Schema`](super::Schema)
//!
//! The bundle is itself shaped like an ordinary encoded message — `{ types:
//! *Type, protocols: *Protocol }` — so this loader reuses the same
//! [`wire`](crate::wire) primitives the message codec does, with the
//! type/field/protocol layouts hard-coded instead of looked up in a schema.
//!
//! Because a `STRUCT` field can name a type that appears later in the bundle
//! (or, transitively, itself), type parsing is two phases: first the type
//! table is allocated with one placeholder slot per declared type so every
//! index is valid, then each slot is filled in bundle order. A `sub_type`
//! is stored as the `usize` index of its slot, never the slot's contents, so
//! nothing is dereferenced until the whole table is built.

use super::error::SchemaError;
use super::model::{Base, Field, FieldKind, Protocol, Schema, Type};
use crate::wire::{DataBlocks, Entry, StructRecord};

pub(crate) fn parse_bundle(bytes: &[u8]) -> Result<Schema, SchemaError> {
	let top = StructRecord::parse(bytes).ok_or_else(|| SchemaError::truncated("bundle header"))?;
	if top.field_count() > 2 {
		return Err(SchemaError::new("bundle header declares more than 2 fields"));
	}

	let mut blocks = DataBlocks::new(top.data());
	let mut type_items: Vec<&[u8]> = Vec::new();
	let mut protocol_items: Vec<&[u8]> = Vec::new();
	for i in 0..top.field_count() {
		let block = match top.entry(i) {
			Entry::Pointer => blocks
				.next_block()
				.ok_or_else(|| SchemaError::truncated("bundle array"))?,
			_ => return Err(SchemaError::new("bundle header field must be a pointer")),
		};
		let items = split_array(block)?;
		match i {
			0 => type_items = items,
			1 => protocol_items = items,
			_ => unreachable!("field_count() <= 2"),
		}
	}

	let type_n = type_items.len();
	let mut types: Vec<Type> = (0..type_n)
		.map(|_| Type {
			name: String::new(),
			fields: Vec::new(),
			base: Base::Sparse,
			max_n: 0,
		})
		.collect();
	for (idx, item) in type_items.iter().enumerate() {
		types[idx] = parse_type(item, type_n)?;
	}

	let mut protocols = Vec::with_capacity(protocol_items.len());
	for item in &protocol_items {
		protocols.push(parse_protocol(item, type_n)?);
	}
	for pair in protocols.windows(2) {
		if pair[1].tag <= pair[0].tag {
			return Err(SchemaError::new("protocol tags are not strictly ascending"));
		}
	}

	Ok(Schema { types, protocols })
}

/// Splits a bundle array block (`u32 length || length-prefixed items...`)
/// into the byte slice of each item, without interpreting them
fn split_array(block: &[u8]) -> Result<Vec<&[u8]>, SchemaError> {
	let mut blocks = DataBlocks::new(block);
	let mut items = Vec::new();
	while !blocks.remaining().is_empty() {
		items.push(
			blocks
				.next_block()
				.ok_or_else(|| SchemaError::truncated("bundle array element"))?,
		);
	}
	Ok(items)
}

/// One resolved header entry, irrespective of which positional/tag scheme
/// the enclosing record uses to assign it meaning
enum EntryValue<'a> {
	Inline(i32),
	Pointer(&'a [u8]),
}

/// Walks `record`'s entries by an implicit, skip-aware tag cursor (the
/// scheme `import_field` uses): skip entries advance the cursor without a
/// callback, everything else is reported at its resolved tag
fn walk_by_tag<'a>(
	record: &StructRecord<'a>,
	mut visit: impl FnMut(i32, EntryValue<'a>) -> Result<(), SchemaError>,
) -> Result<(), SchemaError> {
	let mut blocks = DataBlocks::new(record.data());
	let mut tag: i32 = -1;
	for i in 0..record.field_count() {
		tag += 1;
		match record.entry(i) {
			Entry::Skip { delta } => tag += delta - 1,
			Entry::Inline { value } => visit(tag, EntryValue::Inline(value))?,
			Entry::Pointer => {
				let block = blocks
					.next_block()
					.ok_or_else(|| SchemaError::truncated("field data block"))?;
				visit(tag, EntryValue::Pointer(block))?;
			}
		}
	}
	Ok(())
}

/// Walks `record`'s entries by raw position (the scheme `import_protocol`
/// uses): a skip consumes a position without reassigning the ones after it
fn walk_by_position<'a>(
	record: &StructRecord<'a>,
	mut visit: impl FnMut(usize, EntryValue<'a>) -> Result<(), SchemaError>,
) -> Result<(), SchemaError> {
	let mut blocks = DataBlocks::new(record.data());
	for i in 0..record.field_count() {
		match record.entry(i) {
			Entry::Skip { .. } => continue,
			Entry::Inline { value } => visit(i, EntryValue::Inline(value))?,
			Entry::Pointer => {
				let block = blocks
					.next_block()
					.ok_or_else(|| SchemaError::truncated("protocol data block"))?;
				visit(i, EntryValue::Pointer(block))?;
			}
		}
	}
	Ok(())
}

fn import_string(block: &[u8]) -> String {
	String::from_utf8_lossy(block).into_owned()
}

/// `.type { name 0: string, fields 1: *field }`
///
/// Unlike field and protocol records, a type's own two entries are strictly
/// positional with no skipping allowed: `name` is always entry 0 and
/// `fields` is always entry 1, and both must be data pointers.
fn parse_type(record: &[u8], type_n: usize) -> Result<Type, SchemaError> {
	let record = StructRecord::parse(record).ok_or_else(|| SchemaError::truncated("type record"))?;
	let field_count = record.field_count();
	if field_count == 0 || field_count > 2 {
		return Err(SchemaError::new("type record must declare 1 or 2 fields"));
	}

	let mut blocks = DataBlocks::new(record.data());
	let mut take_pointer = |i: usize| -> Result<&[u8], SchemaError> {
		match record.entry(i) {
			Entry::Pointer => blocks
				.next_block()
				.ok_or_else(|| SchemaError::truncated("type data block")),
			_ => Err(SchemaError::new("type name/fields entry must be a pointer")),
		}
	};

	let name = import_string(take_pointer(0)?);
	if field_count == 1 {
		return Ok(Type {
			name,
			fields: Vec::new(),
			base: Base::Sparse,
			max_n: 0,
		});
	}

	let fields_block = take_pointer(1)?;
	let mut fields = Vec::new();
	let mut last_tag = -1;
	for item in split_array(fields_block)? {
		let field = parse_field(item, type_n)?;
		if field.tag <= last_tag {
			return Err(SchemaError::new("field tags must be strictly ascending"));
		}
		last_tag = field.tag;
		fields.push(field);
	}

	let (base, max_n) = dense_layout(&fields);
	Ok(Type {
		name,
		fields,
		base,
		max_n,
	})
}

fn dense_layout(fields: &[Field]) -> (Base, usize) {
	if fields.is_empty() {
		return (Base::Sparse, 0);
	}
	let mut max_n = fields.len();
	let mut last = -1;
	for field in fields {
		if field.tag > last + 1 {
			max_n += 1;
		}
		last = field.tag;
	}
	let first = fields[0].tag;
	let base = if last - first + 1 == fields.len() as i32 {
		Base::Dense(first)
	} else {
		Base::Sparse
	};
	(base, max_n)
}

/// `.field { name 0: string, buildin 1: integer, type 2: integer, tag 3:
/// integer, array 4: boolean, key 5: integer }`
fn parse_field(record: &[u8], type_n: usize) -> Result<Field, SchemaError> {
	let record = StructRecord::parse(record).ok_or_else(|| SchemaError::truncated("field record"))?;

	let mut name = None;
	let mut kind: Option<FieldKind> = None;
	let mut sub_type = None;
	let mut extra = 0;
	let mut tag = None;
	let mut array = false;
	let mut key = None;

	walk_by_tag(&record, |t, value| {
		match (t, value) {
			(0, EntryValue::Pointer(block)) => name = Some(import_string(block)),
			(0, EntryValue::Inline(_)) => return Err(SchemaError::new("field name entry must be a pointer")),
			(1, EntryValue::Inline(v)) => {
				kind = Some(match v {
					0 => FieldKind::Integer,
					1 => FieldKind::Boolean,
					2 => FieldKind::String,
					_ => return Err(SchemaError::new("unknown builtin field kind")),
				});
			}
			(2, EntryValue::Inline(v)) => match kind {
				Some(FieldKind::Integer) => {
					extra = 10i32
						.checked_pow(v as u32)
						.ok_or_else(|| SchemaError::new("integer field decimal exponent overflows"))?;
				}
				Some(FieldKind::String) => extra = v,
				None => {
					let idx = usize::try_from(v).ok().filter(|&idx| idx < type_n);
					sub_type = Some(idx.ok_or_else(|| SchemaError::new("struct field type index out of range"))?);
					kind = Some(FieldKind::Struct);
				}
				Some(_) => return Err(SchemaError::new("field cannot combine a builtin kind with a type index")),
			},
			(3, EntryValue::Inline(v)) => tag = Some(v),
			(4, EntryValue::Inline(v)) => array = v != 0,
			(5, EntryValue::Inline(v)) => key = Some(v),
			(1..=5, EntryValue::Pointer(_)) => return Err(SchemaError::new("field entry must be inline")),
			_ => return Err(SchemaError::new("unknown field entry tag")),
		}
		Ok(())
	})?;

	Ok(Field {
		tag: tag.ok_or_else(|| SchemaError::new("field is missing its tag"))?,
		name: name.ok_or_else(|| SchemaError::new("field is missing its name"))?,
		kind: kind.ok_or_else(|| SchemaError::new("field declares neither a builtin kind nor a type index"))?,
		array,
		sub_type,
		key,
		extra,
	})
}

/// `.protocol { name 0: string, tag 1: integer, request 2: integer, response
/// 3: integer, confirm 4: boolean }`
///
/// Entries are matched by raw position, not by a skip-aware tag cursor: a
/// protocol record with only `name` and `tag` simply has `field_count() ==
/// 2` and no request/response, it never skips ahead to reach them.
fn parse_protocol(record: &[u8], type_n: usize) -> Result<Protocol, SchemaError> {
	let record = StructRecord::parse(record).ok_or_else(|| SchemaError::truncated("protocol record"))?;

	let mut name = None;
	let mut tag = None;
	let mut request = None;
	let mut response = None;
	let mut confirm = false;

	walk_by_position(&record, |i, value| {
		let sub_type_index = |v: i32| -> Result<usize, SchemaError> {
			usize::try_from(v)
				.ok()
				.filter(|&idx| idx < type_n)
				.ok_or_else(|| SchemaError::new("protocol request/response type index out of range"))
		};
		match (i, value) {
			(0, EntryValue::Pointer(block)) => name = Some(import_string(block)),
			(1, EntryValue::Inline(v)) => tag = Some(v),
			(2, EntryValue::Inline(v)) => request = Some(sub_type_index(v)?),
			(3, EntryValue::Inline(v)) => response = Some(sub_type_index(v)?),
			(4, EntryValue::Inline(v)) => confirm = v != 0,
			_ => return Err(SchemaError::new("malformed protocol entry")),
		}
		Ok(())
	})?;

	Ok(Protocol {
		name: name.ok_or_else(|| SchemaError::new("protocol is missing its name"))?,
		tag: tag.ok_or_else(|| SchemaError::new("protocol is missing its tag"))?,
		request,
		response,
		confirm,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entry_skip(delta: i32) -> u16 {
		((delta - 1) * 2 + 1) as u16
	}

	fn entry_inline(value: i32) -> u16 {
		((value + 1) * 2) as u16
	}

	fn block(bytes: &[u8]) -> Vec<u8> {
		let mut out = (bytes.len() as u32).to_le_bytes().to_vec();
		out.extend_from_slice(bytes);
		out
	}

	fn record(entries: &[u16], data_blocks: &[&[u8]]) -> Vec<u8> {
		let mut out = (entries.len() as u16).to_le_bytes().to_vec();
		for e in entries {
			out.extend_from_slice(&e.to_le_bytes());
		}
		for b in data_blocks {
			out.extend_from_slice(&block(b));
		}
		out
	}

	/// Builds the *content* of an array data block: each item length-prefixed
	/// and concatenated. `record()` adds the one outer length prefix that
	/// turns this into an actual data block.
	fn array_of(items: &[Vec<u8>]) -> Vec<u8> {
		let mut body = Vec::new();
		for item in items {
			body.extend_from_slice(&block(item));
		}
		body
	}

	/// Builds a field record. Header positions are fixed by the field
	/// descriptor schema itself (0=name, 1=builtin, 2=type_idx, 3=tag,
	/// 4=array), independent of `tag`, the *value* carried at position 3.
	fn field_record(name: &str, builtin: i32, tag: i32, array: bool, type_idx: Option<i32>) -> Vec<u8> {
		let mut entries = vec![0u16, entry_inline(builtin)];
		match type_idx {
			Some(idx) => entries.push(entry_inline(idx)),
			// absent type_idx leaves a one-tag gap (position 2) before "tag" (position 3)
			None => entries.push(entry_skip(1)),
		}
		entries.push(entry_inline(tag));
		if array {
			entries.push(entry_inline(1));
		}
		record(&entries, &[name.as_bytes()])
	}

	#[test]
	fn parses_flat_type_with_two_dense_fields() {
		let x = field_record("x", 0, 0, false, None);
		let y = field_record("y", 0, 1, false, None);
		let type_record = record(&[0, 0], &[b"Point", &array_of(&[x, y])]);
		let ty = parse_type(&type_record, 0).unwrap();
		assert_eq!(ty.name, "Point");
		assert_eq!(ty.fields.len(), 2);
		assert_eq!(ty.fields[0].tag, 0);
		assert_eq!(ty.fields[1].tag, 1);
		assert!(matches!(ty.base, Base::Dense(0)));
		assert_eq!(ty.max_n, 2);
	}

	#[test]
	fn sparse_type_gets_sparse_base_and_gap_slots() {
		let a = field_record("a", 0, 0, false, None);
		let b = field_record("b", 0, 3, false, None);
		let type_record = record(&[0, 0], &[b"T", &array_of(&[a, b])]);
		let ty = parse_type(&type_record, 0).unwrap();
		assert_eq!(ty.base, Base::Sparse);
		assert_eq!(ty.max_n, 3);
	}

	#[test]
	fn rejects_non_ascending_protocol_tags() {
		let p0 = record(&[0, entry_inline(5)], &[b"a"]);
		let p1 = record(&[0, entry_inline(2)], &[b"b"]);
		let top = record(&[0, 0], &[&array_of(&[]), &array_of(&[p0, p1])]);
		assert!(parse_bundle(&top).is_err());
	}
}
