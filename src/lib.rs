//! A compact schema-driven binary wire format, optimized for small integers
//! and sparse records
//!
//! Comparable in role to Protocol Buffers, but with a wire format tuned for
//! messages where most fields are absent or small: fields are addressed by
//! an ascending integer tag rather than by position, unpopulated fields cost
//! nothing on the wire, and small non-negative integers and booleans are
//! inlined directly into the per-field header entry instead of spilling
//! into a length-prefixed data block.
//!
//! # Getting started
//!
//! A [`Schema`] is loaded once from a precompiled bundle (produced by an
//! external schema compiler, out of scope for this crate) and is immutable
//! and `Sync` thereafter:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("example.spb")?;
//! let schema = sproto::Schema::from_bundle(&bytes)?;
//! let point = schema.type_by_name("Point").expect("schema declares Point");
//!
//! let mut buf = [0u8; 64];
//! let n = sproto::encode(point, &mut buf, |mut arg| {
//! 	arg.value_mut()[..4].copy_from_slice(&1u32.to_le_bytes());
//! 	Ok(sproto::Provide::Wrote(4))
//! })?;
//!
//! sproto::decode(point, &buf[..n], |arg| {
//! 	println!("{} (tag {}) = {:?}", arg.tagname, arg.tagid, arg.value);
//! 	Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! # Module overview
//!
//! - [`Schema::from_bundle`] loads a compiled bundle; [`Schema::type_by_name`]
//!   and [`TypeRef::field_by_name`]/[`TypeRef::field_by_tag`] query it.
//! - [`encode`]/[`decode`] translate between a schema [`TypeRef`] and wire
//!   bytes by driving a visitor closure once per scalar field or array
//!   element; [`encode_to_vec`]/[`decode_from_slice`] are convenience
//!   wrappers around them.
//! - [`pack`]/[`unpack`] are an orthogonal byte-level compression typically
//!   run over [`encode`]'s output before it goes on the wire, and over
//!   [`decode`]'s input after it comes off the wire.
//!
//! # Wire format invariants this crate does not check for you
//!
//! Schema evolution beyond what the wire format already tolerates (adding
//! higher-tagged fields, letting [`decode`] silently drop tags it doesn't
//! recognize) is the caller's responsibility: this crate neither validates
//! nor forbids removing or renumbering fields across schema versions.

mod codec;
mod pack;
mod schema;
mod wire;

pub use codec::{decode, decode_from_slice, encode, encode_to_vec, CodecError, DecodeArg, DecodedValue, EncodeArg, Provide};
pub use pack::{pack, pack_to_vec, unpack, unpack_to_vec};
pub use schema::{Field, FieldKind, FieldRef, Protocol, Schema, SchemaError, Type, TypeRef, Which};
