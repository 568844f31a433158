//! Encoding and decoding messages against a loaded [`Schema`](crate::Schema)
//!
//! Both directions drive a caller-supplied visitor: [`encode`] calls it once
//! per scalar field or array element to *obtain* a value, [`decode`] calls it
//! once per resolved field or array element to *deliver* one. Neither side
//! allocates on the caller's behalf except for [`encode_to_vec`], which is a
//! convenience wrapper around [`encode`].

mod decode;
mod encode;
mod error;

pub use decode::{decode, decode_from_slice, DecodeArg, DecodedValue};
pub use encode::{encode, encode_to_vec, EncodeArg, Provide};
pub use error::CodecError;
