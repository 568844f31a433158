use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sproto::{decode, encode, pack, unpack, DecodedValue, Provide, Schema};

/// Builds the wire bytes for a compiled bundle directly, bypassing the (out
/// of scope) schema compiler: one record `{ id: int #0, name: string #1,
/// tags: *int #2 }`.
fn person_bundle() -> Vec<u8> {
	fn record(entries: &[u16], data_blocks: &[&[u8]]) -> Vec<u8> {
		let mut out = (entries.len() as u16).to_le_bytes().to_vec();
		for e in entries {
			out.extend_from_slice(&e.to_le_bytes());
		}
		for b in data_blocks {
			out.extend_from_slice(&(b.len() as u32).to_le_bytes());
			out.extend_from_slice(b);
		}
		out
	}
	fn inline(v: i32) -> u16 {
		((v + 1) * 2) as u16
	}
	fn skip(delta: i32) -> u16 {
		((delta - 1) * 2 + 1) as u16
	}
	fn field(name: &str, builtin: i32, tag: i32, array: bool) -> Vec<u8> {
		let mut entries = vec![0, inline(builtin), skip(1), inline(tag)];
		if array {
			entries.push(inline(1));
		}
		record(&entries, &[name.as_bytes()])
	}
	fn block_array(items: &[Vec<u8>]) -> Vec<u8> {
		let mut body = Vec::new();
		for item in items {
			body.extend_from_slice(&(item.len() as u32).to_le_bytes());
			body.extend_from_slice(item);
		}
		body
	}

	const BUILTIN_INTEGER: i32 = 0;
	const BUILTIN_STRING: i32 = 2;
	let fields = block_array(&[
		field("id", BUILTIN_INTEGER, 0, false),
		field("name", BUILTIN_STRING, 1, false),
		field("tags", BUILTIN_INTEGER, 2, true),
	]);
	let ty = record(&[0, 0], &[b"Person", &fields]);
	let types = block_array(&[ty]);
	record(&[0], &[&types])
}

fn bench_encode(c: &mut Criterion) {
	let schema = Schema::from_bundle(&person_bundle()).unwrap();
	let ty = schema.type_by_name("Person").unwrap();
	let tags = [1i64, 2, 3, 4, 5];

	c.bench_function("sproto_encode_person", |b| {
		b.iter(|| {
			encode(ty, &mut [0u8; 256], |mut arg| {
				if arg.tagname == "tags" {
					if arg.index < 1 || arg.index as usize > tags.len() {
						return Ok(Provide::Nil);
					}
					arg.value_mut()[..4].copy_from_slice(&(tags[arg.index as usize - 1] as u32).to_le_bytes());
					return Ok(Provide::Wrote(4));
				}
				match arg.tagid {
					0 => {
						arg.value_mut()[..4].copy_from_slice(&42u32.to_le_bytes());
						Ok(Provide::Wrote(4))
					}
					1 => {
						let name = b"John Doe";
						arg.value_mut()[..name.len()].copy_from_slice(name);
						Ok(Provide::Wrote(name.len()))
					}
					_ => unreachable!(),
				}
			})
		})
	});
}

fn bench_decode(c: &mut Criterion) {
	let schema = Schema::from_bundle(&person_bundle()).unwrap();
	let ty = schema.type_by_name("Person").unwrap();
	let tags = [1i64, 2, 3, 4, 5];
	let mut buf = [0u8; 256];
	let n = encode(ty, &mut buf, |mut arg| {
		if arg.tagname == "tags" {
			if arg.index < 1 || arg.index as usize > tags.len() {
				return Ok(Provide::Nil);
			}
			arg.value_mut()[..4].copy_from_slice(&(tags[arg.index as usize - 1] as u32).to_le_bytes());
			return Ok(Provide::Wrote(4));
		}
		match arg.tagid {
			0 => {
				arg.value_mut()[..4].copy_from_slice(&42u32.to_le_bytes());
				Ok(Provide::Wrote(4))
			}
			1 => {
				let name = b"John Doe";
				arg.value_mut()[..name.len()].copy_from_slice(name);
				Ok(Provide::Wrote(name.len()))
			}
			_ => unreachable!(),
		}
	})
	.unwrap();
	let message = &buf[..n];

	c.bench_function("sproto_decode_person", |b| {
		b.iter(|| {
			decode(ty, message, |arg| {
				let _ = match arg.value {
					DecodedValue::Integer(v) => v,
					_ => 0,
				};
				Ok(())
			})
		})
	});
}

fn bench_pack_unpack(c: &mut Criterion) {
	for &(name, zero_ratio) in &[("sparse", 0.95), ("dense", 0.1)] {
		let src: Vec<u8> = (0..4096u32)
			.map(|i| if (i as f64 * 0.6180339887) % 1.0 < zero_ratio { 0 } else { (i % 251) as u8 })
			.collect();
		let mut packed_buf = vec![0u8; src.len() * 2 + 16];
		let packed_len = pack(&src, &mut packed_buf);
		packed_buf.truncate(packed_len);

		c.bench_with_input(BenchmarkId::new("sproto_pack", name), &src, |b, src| {
			let mut dst = vec![0u8; src.len() * 2 + 16];
			b.iter(|| pack(src, &mut dst))
		});
		c.bench_with_input(BenchmarkId::new("sproto_unpack", name), &packed_buf, |b, packed| {
			let mut dst = vec![0u8; src.len()];
			b.iter(|| unpack(packed, &mut dst).unwrap())
		});
	}
}

criterion_group!(benches, bench_encode, bench_decode, bench_pack_unpack);
criterion_main!(benches);
