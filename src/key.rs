use hyper::Method;
use std::fmt::{self, Display, Formatter};

/// The request methods a route node can declare handlers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MethodKey {
	Get,
	Put,
	Post,
	Delete,
}

impl MethodKey {
	pub const ALL: [MethodKey; 4] = [Self::Get, Self::Put, Self::Post, Self::Delete];

	/// Maps a hyper method onto a route key. Methods without a slot in the route tree map to
	/// `None` and are always served by a fallback.
	pub fn from_method(method: &Method) -> Option<Self> {
		match *method {
			Method::GET => Some(Self::Get),
			Method::PUT => Some(Self::Put),
			Method::POST => Some(Self::Post),
			Method::DELETE => Some(Self::Delete),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Put => "PUT",
			Self::Post => "POST",
			Self::Delete => "DELETE",
		}
	}

	pub(crate) fn index(self) -> usize {
		self as usize
	}
}

impl Display for MethodKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One step of a dispatch walk: either a path segment or the trailing method marker.
///
/// Keeping the two apart means a literal segment named `GET` can never be mistaken for the
/// method slot of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
	Segment(&'a str),
	Method(MethodKey),
}

/// Splits a request path into the non-empty segments used for dispatch.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
	path.split('/').filter(|segment| !segment.is_empty())
}

/// Builds the token sequence walked by the dispatcher: every path segment, then the method.
pub fn tokens<'a, I>(segments: I, method: Option<MethodKey>) -> impl Iterator<Item = Token<'a>>
where
	I: IntoIterator<Item = &'a str>,
{
	segments
		.into_iter()
		.map(Token::Segment)
		.chain(method.map(Token::Method))
}

#[cfg(test)]
mod test {
	use super::{segments, tokens, MethodKey, Token};
	use hyper::Method;

	#[test]
	fn maps_methods() {
		assert_eq!(MethodKey::from_method(&Method::GET), Some(MethodKey::Get));
		assert_eq!(MethodKey::from_method(&Method::DELETE), Some(MethodKey::Delete));
		assert_eq!(MethodKey::from_method(&Method::PATCH), None);
		assert_eq!(MethodKey::Post.to_string(), "POST");
	}

	#[test]
	fn skips_empty_segments() {
		let found: Vec<_> = segments("//users/42/").collect();
		assert_eq!(found, vec!["users", "42"]);
		assert_eq!(segments("/").count(), 0);
	}

	#[test]
	fn method_token_comes_last() {
		let found: Vec<_> = tokens(vec!["a", "b"], Some(MethodKey::Get)).collect();
		assert_eq!(
			found,
			vec![
				Token::Segment("a"),
				Token::Segment("b"),
				Token::Method(MethodKey::Get)
			]
		);
	}
}
