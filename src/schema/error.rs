use std::borrow::Cow;

/// Any error that may happen while loading a [`Schema`](super::Schema) from a
/// compiled bundle
///
/// The bundle is produced by an external schema compiler (out of scope for
/// this crate); every variant here corresponds to that compiler having
/// emitted something this loader cannot make sense of, not to a bug a caller
/// can work around at the API level.
#[derive(thiserror::Error)]
pub struct SchemaError {
	inner: Box<Cow<'static, str>>,
}

impl SchemaError {
	pub(crate) fn new(s: &'static str) -> Self {
		Self {
			inner: Box::new(Cow::Borrowed(s)),
		}
	}

	pub(crate) fn msg(args: std::fmt::Arguments<'_>) -> Self {
		Self {
			inner: Box::new(Cow::Owned(args.to_string())),
		}
	}

	pub(crate) fn truncated(what: &'static str) -> Self {
		Self::msg(format_args!("Bundle truncated while reading {what}"))
	}
}

impl std::fmt::Debug for SchemaError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&*self.inner, f)
	}
}

impl std::fmt::Display for SchemaError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(&*self.inner, f)
	}
}
