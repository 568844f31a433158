//! Produces wire bytes for a schema type by driving a visitor callback once
//! per scalar field or array element
//!
//! Mirrors `sproto_encode` / `encode_array` / `encode_integer_array` from the
//! reference implementation. The header is written at a fixed worst-case
//! size (`2 + max_n * 2` bytes) up front, fields are appended to the data
//! region that follows it, and once every field has been visited the data
//! region is shifted left to sit flush against however many header entries
//! actually got used.

use super::error::CodecError;
use crate::schema::{FieldKind, FieldRef, TypeRef};
use crate::wire::{sign_extend_u32, write_u16, write_u32};

/// What a visitor handed back for one field or array element
pub enum Provide {
	/// The value is present; it was written into [`EncodeArg::value_mut`]'s
	/// buffer, using this many bytes
	Wrote(usize),
	/// The field (or, inside an array, the element) is absent; stop here
	Nil,
	/// The whole array/field doesn't exist at all, as opposed to existing
	/// and being empty
	NoArray,
}

/// What the visitor is being asked to provide
///
/// Borrows from the output buffer (via [`value_mut`](EncodeArg::value_mut))
/// so the visitor can write its value directly into place instead of
/// allocating; from the schema, for `tagname`/`subtype`; and is re-created
/// fresh for every call, so `index` alone tells a visitor position within an
/// array (`0` for a scalar field, `1..=n` for array elements).
pub struct EncodeArg<'a> {
	pub tagname: &'a str,
	pub tagid: i32,
	/// The field's kind, with the array flag already stripped off
	pub kind: FieldKind,
	pub subtype: Option<TypeRef<'a>>,
	/// `0` for a scalar field, `1..=n` while walking an array
	pub index: i32,
	pub mainindex: Option<i32>,
	pub extra: i32,
	value: &'a mut [u8],
}

impl<'a> EncodeArg<'a> {
	/// The buffer to write this value's bytes into
	///
	/// For `INTEGER` this is 4 or 8 little-endian bytes; for `BOOLEAN`, one
	/// byte (`0` or `1`); for `STRING`, raw bytes; for `STRUCT`, the output
	/// of a nested [`encode`] call against [`EncodeArg::subtype`].
	pub fn value_mut(&mut self) -> &mut [u8] {
		self.value
	}
}

fn arg_for<'a>(field: FieldRef<'a>, index: i32, value: &'a mut [u8]) -> EncodeArg<'a> {
	EncodeArg {
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

/// What happened while resolving one schema field, in terms of the header
/// entry (if any) it contributes
enum FieldWrite {
	/// The field is absent; no header entry, try the next field
	None,
	/// An array/scalar field reported [`Provide::NoArray`] at the top level:
	/// the whole message doesn't exist
	Abort,
	/// Emit this resolved `u16` header entry (`0` for a data pointer, the
	/// inlined value otherwise)
	Entry(u16),
}

/// Encodes `ty` into `out`, calling `visitor` once per scalar field and once
/// per array element, and returns the number of bytes written
pub fn encode(
	ty: TypeRef<'_>,
	out: &mut [u8],
	mut visitor: impl FnMut(EncodeArg<'_>) -> Result<Provide, CodecError>,
) -> Result<usize, CodecError> {
	let header_sz = 2 + ty.max_n() * 2;
	if out.len() < header_sz {
		return Err(CodecError::BufferTooSmall);
	}

	let mut data_len = 0usize;
	let mut index = 0usize;
	let mut last_tag: i32 = -1;

	for field in ty.fields() {
		let outcome = if field.is_array() {
			encode_array(field, out, header_sz, &mut data_len, &mut visitor)?
		} else {
			match field.kind() {
				FieldKind::Integer | FieldKind::Boolean => {
					encode_number(field, out, header_sz, &mut data_len, &mut visitor)?
				}
				FieldKind::String | FieldKind::Struct => {
					encode_object(field, out, header_sz, &mut data_len, &mut visitor)?
				}
			}
		};

		match outcome {
			FieldWrite::None => continue,
			FieldWrite::Abort => return Ok(0),
			FieldWrite::Entry(value) => {
				let gap = field.tag() - last_tag - 1;
				if gap > 0 {
					let skip = (gap - 1) * 2 + 1;
					let skip: u16 = skip
						.try_into()
						.map_err(|_| CodecError::malformed("field tag gap too large to skip"))?;
					write_u16(out, 2 + index * 2, skip);
					index += 1;
				}
				write_u16(out, 2 + index * 2, value);
				index += 1;
				last_tag = field.tag();
			}
		}
	}

	write_u16(out, 0, index as u16);
	let header_end = 2 + index * 2;
	if header_end < header_sz {
		out.copy_within(header_sz..header_sz + data_len, header_end);
	}
	Ok(header_end + data_len)
}

/// Encodes a growing buffer until `visitor` fits, then truncates to the
/// actual length written
///
/// `visitor` may be invoked more than once if the initial guess at capacity
/// is too small; it must be safe to call repeatedly and produce the same
/// sequence of values each time (the same expectation the reference
/// implementation places on callers that retry after a `BufferTooSmall`).
pub fn encode_to_vec(
	ty: TypeRef<'_>,
	mut visitor: impl FnMut(EncodeArg<'_>) -> Result<Provide, CodecError>,
) -> Result<Vec<u8>, CodecError> {
	let mut cap = (2 + ty.max_n() * 2).max(64);
	loop {
		let mut buf = vec![0u8; cap];
		match encode(ty, &mut buf, &mut visitor) {
			Ok(written) => {
				buf.truncate(written);
				return Ok(buf);
			}
			Err(CodecError::BufferTooSmall) => cap *= 2,
			Err(err) => return Err(err),
		}
	}
}

/// `INTEGER`/`BOOLEAN` scalar fields: the visitor writes into a stack
/// scratch buffer (never `out` directly) because the result may end up
/// inlined in the header instead of ever reaching the data region
fn encode_number(
	field: FieldRef<'_>,
	out: &mut [u8],
	header_sz: usize,
	data_len: &mut usize,
	visitor: &mut impl FnMut(EncodeArg<'_>) -> Result<Provide, CodecError>,
) -> Result<FieldWrite, CodecError> {
	let mut scratch = [0u8; 8];
	let provide = visitor(arg_for(field, 0, &mut scratch))?;
	let written = match provide {
		Provide::Nil => return Ok(FieldWrite::None),
		Provide::NoArray => return Ok(FieldWrite::Abort),
		Provide::Wrote(n) => n,
	};

	match field.kind() {
		FieldKind::Boolean => {
			if written != 1 {
				return Err(CodecError::VisitorBadSize);
			}
			Ok(FieldWrite::Entry(inline_value(scratch[0] as u32)))
		}
		FieldKind::Integer => match written {
			4 => {
				let v = u32::from_le_bytes(scratch[..4].try_into().unwrap());
				if v < 0x7fff {
					Ok(FieldWrite::Entry(inline_value(v)))
				} else {
					write_integer_block(out, header_sz, data_len, &scratch[..4])
				}
			}
			8 => write_integer_block(out, header_sz, data_len, &scratch[..8]),
			_ => Err(CodecError::VisitorBadSize),
		},
		FieldKind::String | FieldKind::Struct => {
			unreachable!("encode_number is only called for Integer/Boolean fields")
		}
	}
}

fn inline_value(v: u32) -> u16 {
	((v + 1) * 2) as u16
}

/// Appends `u32 length || bytes` to the data region for an out-of-line
/// `INTEGER` value (either a 4-byte value too large to inline, or any
/// 8-byte value)
fn write_integer_block(
	out: &mut [u8],
	header_sz: usize,
	data_len: &mut usize,
	bytes: &[u8],
) -> Result<FieldWrite, CodecError> {
	let data_start = header_sz + *data_len;
	let total = 4 + bytes.len();
	if out.len() < data_start + total {
		return Err(CodecError::BufferTooSmall);
	}
	write_u32(out, data_start, bytes.len() as u32);
	out[data_start + 4..data_start + total].copy_from_slice(bytes);
	*data_len += total;
	Ok(FieldWrite::Entry(0))
}

/// `STRING`/`STRUCT` scalar fields: the visitor writes straight into the
/// output buffer's data region (zero-copy on the way out), reserving 4
/// bytes ahead of it for the length prefix
fn encode_object(
	field: FieldRef<'_>,
	out: &mut [u8],
	header_sz: usize,
	data_len: &mut usize,
	visitor: &mut impl FnMut(EncodeArg<'_>) -> Result<Provide, CodecError>,
) -> Result<FieldWrite, CodecError> {
	let data_start = header_sz + *data_len;
	if out.len() < data_start + 4 {
		return Err(CodecError::BufferTooSmall);
	}
	let body_start = data_start + 4;
	let cap = out.len() - body_start;
	let provide = visitor(arg_for(field, 0, &mut out[body_start..body_start + cap]))?;
	match provide {
		Provide::Nil => Ok(FieldWrite::None),
		Provide::NoArray => Err(CodecError::malformed("NOARRAY is not valid for a non-array field")),
		Provide::Wrote(n) => {
			if n > cap {
				return Err(CodecError::BufferTooSmall);
			}
			write_u32(out, data_start, n as u32);
			*data_len += 4 + n;
			Ok(FieldWrite::Entry(0))
		}
	}
}

fn encode_array(
	field: FieldRef<'_>,
	out: &mut [u8],
	header_sz: usize,
	data_len: &mut usize,
	visitor: &mut impl FnMut(EncodeArg<'_>) -> Result<Provide, CodecError>,
) -> Result<FieldWrite, CodecError> {
	let data_start = header_sz + *data_len;
	if out.len() < data_start + 4 {
		return Err(CodecError::BufferTooSmall);
	}
	let body_start = data_start + 4;

	let body_len = match field.kind() {
		FieldKind::Integer => match encode_integer_array(field, body_start, out.len(), visitor)? {
			Some(body) => {
				if out.len() < body_start + body.len() {
					return Err(CodecError::BufferTooSmall);
				}
				out[body_start..body_start + body.len()].copy_from_slice(&body);
				body.len()
			}
			None => return Ok(FieldWrite::None),
		},
		FieldKind::Boolean => match encode_boolean_array(field, out, body_start, visitor)? {
			Some(n) => n,
			None => return Ok(FieldWrite::None),
		},
		FieldKind::String | FieldKind::Struct => {
			match encode_object_array(field, out, body_start, visitor)? {
				Some(n) => n,
				None => return Ok(FieldWrite::None),
			}
		}
	};

	write_u32(out, data_start, body_len as u32);
	*data_len += 4 + body_len;
	Ok(FieldWrite::Entry(0))
}

/// One element of an in-progress integer array body, before the leading
/// `intlen` byte is known
enum IntWidth {
	Four,
	Eight,
}

/// Builds the `u8 intlen || elements` body for an `INTEGER` array
///
/// Starts at 4-byte elements and widens to 8 bytes in place the first time
/// an element needs it, rewriting every element already collected — the
/// same promotion the reference implementation does directly on the output
/// buffer. This builds into a scratch `Vec` first (bounded only by
/// `out.len() - body_start`, checked before it's ever copied into `out`)
/// rather than mutating `out` in place, so a `BufferTooSmall` partway
/// through never leaves a half-rewritten array behind.
fn encode_integer_array(
	field: FieldRef<'_>,
	body_start: usize,
	out_len: usize,
	visitor: &mut impl FnMut(EncodeArg<'_>) -> Result<Provide, CodecError>,
) -> Result<Option<Vec<u8>>, CodecError> {
	if out_len <= body_start {
		return Err(CodecError::BufferTooSmall);
	}
	let cap = out_len - body_start - 1; // minus the intlen byte itself

	let mut width = IntWidth::Four;
	let mut elements: Vec<u8> = Vec::new();
	let mut index = 1i32;
	loop {
		let mut scratch = [0u8; 8];
		match visitor(arg_for(field, index, &mut scratch))? {
			Provide::Nil => break,
			Provide::NoArray => return Ok(None),
			Provide::Wrote(4) => {
				let v = u32::from_le_bytes(scratch[..4].try_into().unwrap());
				match width {
					IntWidth::Four => elements.extend_from_slice(&v.to_le_bytes()),
					IntWidth::Eight => elements.extend_from_slice(&sign_extend_u32(v).to_le_bytes()),
				}
			}
			Provide::Wrote(8) => {
				let v = u64::from_le_bytes(scratch[..8].try_into().unwrap());
				if let IntWidth::Four = width {
					let narrow = std::mem::take(&mut elements);
					for chunk in narrow.chunks_exact(4) {
						let old = u32::from_le_bytes(chunk.try_into().unwrap());
						elements.extend_from_slice(&sign_extend_u32(old).to_le_bytes());
					}
					width = IntWidth::Eight;
				}
				elements.extend_from_slice(&v.to_le_bytes());
			}
			Provide::Wrote(_) => return Err(CodecError::VisitorBadSize),
		}
		if elements.len() > cap {
			return Err(CodecError::BufferTooSmall);
		}
		index += 1;
	}

	if elements.is_empty() {
		return Ok(Some(Vec::new()));
	}
	let intlen: u8 = match width {
		IntWidth::Four => 4,
		IntWidth::Eight => 8,
	};
	let mut body = Vec::with_capacity(1 + elements.len());
	body.push(intlen);
	body.extend_from_slice(&elements);
	Ok(Some(body))
}

fn encode_boolean_array(
	field: FieldRef<'_>,
	out: &mut [u8],
	body_start: usize,
	visitor: &mut impl FnMut(EncodeArg<'_>) -> Result<Provide, CodecError>,
) -> Result<Option<usize>, CodecError> {
	let mut n = 0usize;
	let mut index = 1i32;
	loop {
		if body_start + n >= out.len() {
			return Err(CodecError::BufferTooSmall);
		}
		let mut scratch = [0u8; 1];
		match visitor(arg_for(field, index, &mut scratch))? {
			Provide::Nil => break,
			Provide::NoArray => return Ok(None),
			Provide::Wrote(1) => {
				out[body_start + n] = if scratch[0] != 0 { 1 } else { 0 };
				n += 1;
			}
			Provide::Wrote(_) => return Err(CodecError::VisitorBadSize),
		}
		index += 1;
	}
	Ok(Some(n))
}

fn encode_object_array(
	field: FieldRef<'_>,
	out: &mut [u8],
	body_start: usize,
	visitor: &mut impl FnMut(EncodeArg<'_>) -> Result<Provide, CodecError>,
) -> Result<Option<usize>, CodecError> {
	let mut n = 0usize;
	let mut index = 1i32;
	loop {
		let elem_start = body_start + n;
		if out.len() < elem_start + 4 {
			return Err(CodecError::BufferTooSmall);
		}
		let elem_body_start = elem_start + 4;
		let cap = out.len() - elem_body_start;
		match visitor(arg_for(field, index, &mut out[elem_body_start..elem_body_start + cap]))? {
			Provide::Nil => break,
			Provide::NoArray => return Ok(None),
			Provide::Wrote(sz) => {
				if sz > cap {
					return Err(CodecError::BufferTooSmall);
				}
				write_u32(out, elem_start, sz as u32);
				n += 4 + sz;
			}
		}
		index += 1;
	}
	Ok(Some(n))
}
