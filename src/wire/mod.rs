//! Byte-level primitives shared by the schema loader and the message codec
//!
//! Both consumers speak the same little-endian, tag/length struct-record
//! framing (see the crate-level docs), so the low-level cursor lives here
//! once instead of being duplicated.

mod struct_record;

pub(crate) use struct_record::{DataBlocks, Entry, StructRecord};

/// Sign-extends a little-endian 32-bit wire integer to 64 bits
///
/// Shared by the array width-promotion routine in [`crate::codec::encode`]
/// and the data-pointer integer path in [`crate::codec::decode`]: a 4-byte
/// field value is never zero-extended on this wire, only sign-extended,
/// matching the reference implementation's `expand64`.
pub(crate) fn sign_extend_u32(v: u32) -> u64 {
	v as i32 as i64 as u64
}

/// Reads a little-endian `u16` from the start of `bytes`
pub(crate) fn read_u16(bytes: &[u8]) -> Option<u16> {
	Some(u16::from_le_bytes(bytes.get(..2)?.try_into().ok()?))
}

/// Reads a little-endian `u32` from the start of `bytes`
pub(crate) fn read_u32(bytes: &[u8]) -> Option<u32> {
	Some(u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?))
}

/// Splits `bytes` into a length-prefixed record (the `u32 length || bytes`
/// shape used everywhere a "record" appears) and whatever follows it
pub(crate) fn take_record(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
	let len = read_u32(bytes)? as usize;
	let rest = bytes.get(4..)?;
	if len > rest.len() {
		return None;
	}
	Some(rest.split_at(len))
}

/// Writes a little-endian `u16` at `offset`
///
/// Panics if `offset + 2 > buf.len()`; callers only reach here after a
/// capacity check against the same offset.
pub(crate) fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
	buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Writes a little-endian `u32` at `offset`
pub(crate) fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
	buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
