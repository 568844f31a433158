//! Byte-oriented 0-run compression ("0-pack") for sparse sproto payloads
//!
//! The source is treated as 8-byte groups (the final group zero-padded).
//! Each ordinary group is emitted as a bitmask header byte plus its nonzero
//! bytes. A group of all 8 nonzero bytes opens an "FF run": `0xFF`, a count
//! byte, then the raw bytes of every group absorbed into the run, up to 256
//! groups. Once a run is open, groups with 6 or 7 nonzero bytes are also
//! absorbed (to avoid breaking the run over a single near-full group), but
//! they never *start* one on their own.

use crate::codec::CodecError;

const GROUP: usize = 8;

pub fn pack(src: &[u8], dst: &mut [u8]) -> usize {
	let mut out = 0usize;
	let mut run: Vec<u8> = Vec::new();

	for chunk in src.chunks(GROUP) {
		let mut group = [0u8; GROUP];
		group[..chunk.len()].copy_from_slice(chunk);
		let nonzero = group.iter().filter(|&&b| b != 0).count();

		if !run.is_empty() {
			if nonzero >= 6 && run.len() / GROUP < 256 {
				run.extend_from_slice(&group);
				if run.len() / GROUP == 256 {
					emit_ff(dst, &mut out, &run);
					run.clear();
				}
				continue;
			}
			emit_ff(dst, &mut out, &run);
			run.clear();
		}

		if nonzero == GROUP {
			run.extend_from_slice(&group);
		} else {
			emit_literal(dst, &mut out, &group, nonzero);
		}
	}
	if !run.is_empty() {
		emit_ff(dst, &mut out, &run);
	}
	out
}

fn emit_literal(dst: &mut [u8], out: &mut usize, group: &[u8; GROUP], nonzero: usize) {
	let mut header = 0u8;
	let mut payload = Vec::with_capacity(nonzero);
	for (i, &b) in group.iter().enumerate() {
		if b != 0 {
			header |= 1 << i;
			payload.push(b);
		}
	}
	write(dst, out, &[header]);
	write(dst, out, &payload);
}

fn emit_ff(dst: &mut [u8], out: &mut usize, run: &[u8]) {
	let groups = run.len() / GROUP;
	write(dst, out, &[0xff, (groups - 1) as u8]);
	write(dst, out, run);
}

fn write(dst: &mut [u8], out: &mut usize, bytes: &[u8]) {
	let n = bytes.len();
	if *out + n <= dst.len() {
		dst[*out..*out + n].copy_from_slice(bytes);
	}
	*out += n;
}

/// Convenience wrapper that sizes, allocates, then packs in one call.
pub fn pack_to_vec(src: &[u8]) -> Vec<u8> {
	let needed = pack(src, &mut []);
	let mut dst = vec![0u8; needed];
	pack(src, &mut dst);
	dst
}

pub fn unpack(src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
	let mut out = 0usize;
	let mut i = 0;
	while i < src.len() {
		let header = src[i];
		i += 1;
		if header == 0xff {
			let count = *src.get(i).ok_or(CodecError::BufferTooSmall)?;
			i += 1;
			let n = (count as usize + 1) * GROUP;
			let bytes = src.get(i..i + n).ok_or(CodecError::BufferTooSmall)?;
			if out + n <= dst.len() {
				dst[out..out + n].copy_from_slice(bytes);
			}
			out += n;
			i += n;
		} else {
			for bit in 0..GROUP {
				let byte = if header & (1 << bit) != 0 {
					let b = *src.get(i).ok_or(CodecError::BufferTooSmall)?;
					i += 1;
					b
				} else {
					0
				};
				if out < dst.len() {
					dst[out] = byte;
				}
				out += 1;
			}
		}
	}
	Ok(out)
}

/// Convenience wrapper that sizes, allocates, then unpacks in one call.
pub fn unpack_to_vec(src: &[u8]) -> Result<Vec<u8>, CodecError> {
	let needed = unpack(src, &mut [])?;
	let mut dst = vec![0u8; needed];
	unpack(src, &mut dst)?;
	Ok(dst)
}
