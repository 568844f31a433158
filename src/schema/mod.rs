//! Loading and querying a compiled schema bundle
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("example.spb")?;
//! let schema = sproto::Schema::from_bundle(&bytes)?;
//! let point = schema.type_by_name("Point").expect("schema declares Point");
//! let x = point.field_by_name("x").expect("Point has a field named x");
//! println!("x has tag {}", x.tag());
//! # Ok(())
//! # }
//! ```

mod error;
mod loader;
mod model;
mod registry;

pub use error::SchemaError;
pub use model::{Field, FieldKind, FieldRef, Protocol, Schema, Type, TypeRef, Which};

impl Schema {
	/// Parses a compiled bundle into a queryable schema
	///
	/// The bundle is produced by an external schema compiler; this does not
	/// validate anything about *how* that compiler was invoked, only that
	/// its output is well-formed.
	pub fn from_bundle(bytes: &[u8]) -> Result<Schema, SchemaError> {
		loader::parse_bundle(bytes)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

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

	fn type_record(name: &str, fields: &[Vec<u8>]) -> Vec<u8> {
		record(&[0, 0], &[name.as_bytes(), &array_of(fields)])
	}

	#[test]
	fn round_trips_a_two_field_type_through_from_bundle() {
		let point = type_record("Point", &[field_record("x", 0), field_record("y", 1)]);
		let bundle = record(&[0], &[&array_of(&[point])]);

		let schema = Schema::from_bundle(&bundle).unwrap();
		let ty = schema.type_by_name("Point").unwrap();
		assert_eq!(ty.name(), "Point");
		assert_eq!(ty.fields().len(), 2);
		assert_eq!(ty.field_by_tag(0).unwrap().name(), "x");
		assert_eq!(ty.field_by_name("y").unwrap().tag(), 1);
	}

	#[test]
	fn truncated_bundle_is_a_clean_error() {
		assert!(Schema::from_bundle(&[1, 2]).is_err());
	}
}
