//! Parses wire bytes for a schema type, delivering resolved fields to a
//! visitor callback once per scalar field or array element
//!
//! Mirrors `sproto_decode` / `decode_array` / `decode_array_object` from the
//! reference implementation. Unknown tags (present on the wire but absent
//! from `ty`) are silently dropped — this is the forward-compatibility
//! mechanism the wire format relies on instead of a version field.

use super::error::CodecError;
use crate::schema::{FieldKind, FieldRef, TypeRef};
use crate::wire::{sign_extend_u32, DataBlocks, Entry, StructRecord};

/// One resolved field or array element handed to the visitor
pub struct DecodeArg<'a> {
	pub tagname: &'a str,
	pub tagid: i32,
	/// The field's kind, with the array flag already stripped off
	pub kind: FieldKind,
	pub subtype: Option<TypeRef<'a>>,
	/// `0` for a scalar field, `1..=n` for an array element, `-1` to signal
	/// "this array is present but empty"
	pub index: i32,
	pub mainindex: Option<i32>,
	pub extra: i32,
	pub value: DecodedValue<'a>,
}

/// A delivered value, already converted out of its wire representation
#[derive(Debug)]
pub enum DecodedValue<'a> {
	/// `INTEGER`, sign-extended to 64 bits if the wire value was 4 bytes
	Integer(i64),
	Boolean(bool),
	/// `STRING`/`STRUCT`, borrowed straight out of the input buffer — no
	/// allocation happens on the decode side
	Bytes(&'a [u8]),
	/// The `index == -1` empty-array signal; carries no payload
	None,
}

fn arg_for<'a>(field: FieldRef<'a>, index: i32, value: DecodedValue<'a>) -> DecodeArg<'a> {
	DecodeArg {
		tagname: field.name(),
		tagid: field.tag(),
		kind: field.kind(),
		subtype: field.sub_type(),
		index,
		mainindex: field.key(),
		extra: field.extra(),
		value,
	}
}

/// Decodes `data` as a message of type `ty`, calling `visitor` once per
/// resolved field or array element, and returns the number of bytes of
/// `data` that were consumed
pub fn decode<'a>(
	ty: TypeRef<'a>,
	data: &'a [u8],
	mut visitor: impl FnMut(DecodeArg<'a>) -> Result<(), CodecError>,
) -> Result<usize, CodecError> {
	let record = StructRecord::parse(data).ok_or_else(|| CodecError::malformed("truncated message header"))?;
	let data_region = record.data();
	let mut blocks = DataBlocks::new(data_region);

	let mut tag = -1i32;
	for i in 0..record.field_count() {
		tag += 1;
		match record.entry(i) {
			Entry::Skip { delta } => tag += delta - 1,
			Entry::Inline { value } => {
				if let Some(field) = ty.field_by_tag(tag) {
					deliver_inline(field, value, &mut visitor)?;
				}
			}
			Entry::Pointer => {
				let block = blocks
					.next_block()
					.ok_or_else(|| CodecError::malformed("header declares more data blocks than are present"))?;
				if let Some(field) = ty.field_by_tag(tag) {
					deliver_pointer(field, block, &mut visitor)?;
				}
			}
		}
	}

	let header_len = 2 + record.field_count() * 2;
	Ok(header_len + blocks.consumed(data_region.len()))
}

/// Convenience wrapper with the same call shape as
/// [`encode_to_vec`](super::encode_to_vec): given a full message buffer,
/// runs [`decode`] once
pub fn decode_from_slice<'a>(
	ty: TypeRef<'a>,
	data: &'a [u8],
	visitor: impl FnMut(DecodeArg<'a>) -> Result<(), CodecError>,
) -> Result<usize, CodecError> {
	decode(ty, data, visitor)
}

/// An inline header entry can only ever be a non-array `INTEGER` or
/// `BOOLEAN` — everything else, including an array of either, must go
/// through a data pointer instead
fn deliver_inline<'a>(
	field: FieldRef<'a>,
	value: i32,
	visitor: &mut impl FnMut(DecodeArg<'a>) -> Result<(), CodecError>,
) -> Result<(), CodecError> {
	if field.is_array() {
		return Err(CodecError::malformed("inline value on an array field"));
	}
	let decoded = match field.kind() {
		FieldKind::Integer => DecodedValue::Integer(value as i64),
		FieldKind::Boolean => DecodedValue::Boolean(value != 0),
		FieldKind::String | FieldKind::Struct => {
			return Err(CodecError::malformed("inline value on a non-integer/boolean field"))
		}
	};
	visitor(arg_for(field, 0, decoded))
}

fn deliver_pointer<'a>(
	field: FieldRef<'a>,
	block: &'a [u8],
	visitor: &mut impl FnMut(DecodeArg<'a>) -> Result<(), CodecError>,
) -> Result<(), CodecError> {
	if field.is_array() {
		return decode_array(field, block, visitor);
	}
	match field.kind() {
		FieldKind::Integer => {
			let v = match block.len() {
				4 => sign_extend_u32(u32::from_le_bytes(block.try_into().unwrap())) as i64,
				8 => u64::from_le_bytes(block.try_into().unwrap()) as i64,
				_ => return Err(CodecError::malformed("integer data block length must be 4 or 8")),
			};
			visitor(arg_for(field, 0, DecodedValue::Integer(v)))
		}
		FieldKind::String | FieldKind::Struct => visitor(arg_for(field, 0, DecodedValue::Bytes(block))),
		FieldKind::Boolean => Err(CodecError::malformed("boolean field cannot be a data pointer")),
	}
}

fn decode_array<'a>(
	field: FieldRef<'a>,
	block: &'a [u8],
	visitor: &mut impl FnMut(DecodeArg<'a>) -> Result<(), CodecError>,
) -> Result<(), CodecError> {
	if block.is_empty() {
		return visitor(arg_for(field, -1, DecodedValue::None));
	}
	match field.kind() {
		FieldKind::Integer => {
			let intlen = block[0];
			let elements = &block[1..];
			match intlen {
				4 => {
					if elements.len() % 4 != 0 {
						return Err(CodecError::malformed("integer array body isn't a multiple of 4 bytes"));
					}
					for (i, chunk) in elements.chunks_exact(4).enumerate() {
						let v = sign_extend_u32(u32::from_le_bytes(chunk.try_into().unwrap())) as i64;
						visitor(arg_for(field, i as i32 + 1, DecodedValue::Integer(v)))?;
					}
				}
				8 => {
					if elements.len() % 8 != 0 {
						return Err(CodecError::malformed("integer array body isn't a multiple of 8 bytes"));
					}
					for (i, chunk) in elements.chunks_exact(8).enumerate() {
						let v = u64::from_le_bytes(chunk.try_into().unwrap()) as i64;
						visitor(arg_for(field, i as i32 + 1, DecodedValue::Integer(v)))?;
					}
				}
				_ => return Err(CodecError::malformed("integer array declares an invalid element width")),
			}
		}
		FieldKind::Boolean => {
			for (i, &b) in block.iter().enumerate() {
				visitor(arg_for(field, i as i32 + 1, DecodedValue::Boolean(b != 0)))?;
			}
		}
		FieldKind::String | FieldKind::Struct => {
			let mut blocks = DataBlocks::new(block);
			let mut i = 1i32;
			while !blocks.remaining().is_empty() {
				let item = blocks
					.next_block()
					.ok_or_else(|| CodecError::malformed("truncated array element"))?;
				visitor(arg_for(field, i, DecodedValue::Bytes(item)))?;
				i += 1;
			}
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::Schema;

	fn entry_inline(value: i32) -> u16 {
		((value + 1) * 2) as u16
	}

	fn entry_skip(delta: i32) -> u16 {
		((delta - 1) * 2 + 1) as u16
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

	fn array_of(items: &[Vec<u8>]) -> Vec<u8> {
		let mut body = Vec::new();
		for item in items {
			body.extend_from_slice(&block(item));
		}
		body
	}

	fn field_record(name: &str, tag: i32) -> Vec<u8> {
		record(
			&[0, entry_inline(0), entry_skip(1), entry_inline(tag)],
			&[name.as_bytes()],
		)
	}

	fn schema_with(fields: &[Vec<u8>]) -> Schema {
		let ty = record(&[0, 0], &[b"Point", &array_of(fields)]);
		let bundle = record(&[0], &[&array_of(&[ty])]);
		Schema::from_bundle(&bundle).unwrap()
	}

	/// S6: a 4-byte data-pointer integer of `0xffffffff` sign-extends to -1.
	#[test]
	fn s6_four_byte_integer_block_sign_extends() {
		let schema = schema_with(&[field_record("x", 0)]);
		let ty = schema.type_by_name("Point").unwrap();
		let message = record(&[0], &[&0xffffffffu32.to_le_bytes()]);

		let mut seen = None;
		let n = decode(ty, &message, |arg| {
			if let DecodedValue::Integer(v) = arg.value {
				seen = Some(v);
			}
			Ok(())
		})
		.unwrap();
		assert_eq!(seen, Some(-1));
		assert_eq!(n, message.len());
	}

	#[test]
	fn inline_small_integer_round_trips() {
		let schema = schema_with(&[field_record("x", 0), field_record("y", 1)]);
		let ty = schema.type_by_name("Point").unwrap();
		let message = record(&[entry_inline(1), entry_inline(2)], &[]);

		let mut xs = Vec::new();
		decode(ty, &message, |arg| {
			if let DecodedValue::Integer(v) = arg.value {
				xs.push((arg.tagid, v));
			}
			Ok(())
		})
		.unwrap();
		assert_eq!(xs, vec![(0, 1), (1, 2)]);
	}

	#[test]
	fn unknown_tags_are_silently_dropped() {
		// superset schema: x(0), y(1), z(2); subset only knows x, y
		let full = schema_with(&[field_record("x", 0), field_record("y", 1), field_record("z", 2)]);
		let full_ty = full.type_by_name("Point").unwrap();
		let message = record(&[entry_inline(1), entry_inline(2), entry_inline(3)], &[]);
		let mut full_seen = Vec::new();
		decode(full_ty, &message, |arg| {
			if let DecodedValue::Integer(v) = arg.value {
				full_seen.push((arg.tagid, v));
			}
			Ok(())
		})
		.unwrap();
		assert_eq!(full_seen, vec![(0, 1), (1, 2), (2, 3)]);

		let subset = schema_with(&[field_record("x", 0), field_record("y", 1)]);
		let subset_ty = subset.type_by_name("Point").unwrap();
		let mut subset_seen = Vec::new();
		decode(subset_ty, &message, |arg| {
			if let DecodedValue::Integer(v) = arg.value {
				subset_seen.push((arg.tagid, v));
			}
			Ok(())
		})
		.unwrap();
		assert_eq!(subset_seen, vec![(0, 1), (1, 2)]);
	}

	#[test]
	fn truncated_header_is_a_clean_error() {
		let schema = schema_with(&[field_record("x", 0)]);
		let ty = schema.type_by_name("Point").unwrap();
		let err = decode(ty, &[3, 0], |_| Ok(())).unwrap_err();
		assert!(matches!(err, CodecError::WireMalformed(_)));
	}
}
