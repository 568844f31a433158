use std::borrow::Cow;

/// Any error that may happen while encoding or decoding a message, or while
/// packing/unpacking a buffer
#[derive(thiserror::Error)]
pub enum CodecError {
	/// The output buffer ran out of room, or an input buffer ended before a
	/// length it declared said it should.
	BufferTooSmall,
	/// The wire bytes don't match the shape the schema says they should:
	/// an integer data block of a length other than 4 or 8, an inline value
	/// on a field that isn't `INTEGER`/`BOOLEAN`, a header shorter than its
	/// declared field count, or a data region shorter than the header
	/// implies.
	WireMalformed(Box<Cow<'static, str>>),
	/// The caller's visitor returned an error.
	Visitor(Box<dyn std::error::Error + Send + Sync + 'static>),
	/// The caller's visitor reported a value size inconsistent with the
	/// field's declared kind (e.g. an `INTEGER` write that isn't 4 or 8
	/// bytes).
	VisitorBadSize,
}

impl CodecError {
	pub(crate) fn malformed(s: &'static str) -> Self {
		CodecError::WireMalformed(Box::new(Cow::Borrowed(s)))
	}
}

impl std::fmt::Debug for CodecError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(self, f)
	}
}

impl std::fmt::Display for CodecError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			CodecError::BufferTooSmall => write!(f, "buffer too small"),
			CodecError::WireMalformed(msg) => write!(f, "malformed wire data: {msg}"),
			CodecError::Visitor(err) => write!(f, "visitor error: {err}"),
			CodecError::VisitorBadSize => write!(f, "visitor reported a size inconsistent with the field's kind"),
		}
	}
}
