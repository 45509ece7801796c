//! URI validation and patterns.

use serde::{Deserialize, Serialize};

/// How a registered URI pattern is matched against concrete URIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
	#[default]
	Exact,
	Prefix,
	Wildcard,
}

/// A URI together with the policy used to match it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UriPattern {
	uri: String,
	policy: MatchPolicy,
}

impl UriPattern {
	/// Creates an exact-match pattern.
	pub fn exact(uri: impl Into<String>) -> Self {
		Self {
			uri: uri.into(),
			policy: MatchPolicy::Exact,
		}
	}

	/// Creates a pattern with an explicit match policy.
	pub fn with_policy(uri: impl Into<String>, policy: MatchPolicy) -> Self {
		Self {
			uri: uri.into(),
			policy,
		}
	}

	/// Returns the literal URI of this pattern.
	pub fn uri(&self) -> &str {
		&self.uri
	}

	pub fn policy(&self) -> MatchPolicy {
		self.policy
	}

	/// Returns true if the pattern is well-formed for its policy.
	///
	/// Wildcard patterns may leave components empty, but not all of them.
	pub fn is_valid(&self) -> bool {
		match self.policy {
			MatchPolicy::Exact | MatchPolicy::Prefix => is_valid_uri(&self.uri),
			MatchPolicy::Wildcard => {
				self.uri.split('.').any(|part| !part.is_empty())
					&& self.uri.split('.').all(is_valid_component)
			}
		}
	}
}

fn is_valid_component(part: &str) -> bool {
	!part.chars().any(|c| c.is_whitespace() || c == '#')
}

/// Returns true if `uri` is a well-formed WAMP URI.
///
/// A URI is one or more dot-separated components, none of them empty and none
/// containing whitespace or `#`.
pub fn is_valid_uri(uri: &str) -> bool {
	!uri.is_empty()
		&& uri
			.split('.')
			.all(|part| !part.is_empty() && is_valid_component(part))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_valid_uris() {
		assert!(is_valid_uri("com.example.topic"));
		assert!(is_valid_uri("topic"));
		assert!(is_valid_uri("wamp.error.runtime_error"));
	}

	#[test]
	fn test_invalid_uris() {
		assert!(!is_valid_uri(""));
		assert!(!is_valid_uri("com..example"));
		assert!(!is_valid_uri(".com.example"));
		assert!(!is_valid_uri("com.example."));
		assert!(!is_valid_uri("com.exa mple"));
		assert!(!is_valid_uri("com.#.example"));
	}

	#[test]
	fn test_exact_pattern() {
		let pattern = UriPattern::exact("com.example.error");
		assert_eq!(pattern.uri(), "com.example.error");
		assert_eq!(pattern.policy(), MatchPolicy::Exact);
	}

	#[test]
	fn test_wildcard_pattern_allows_empty_components() {
		assert!(UriPattern::with_policy("com..error", MatchPolicy::Wildcard).is_valid());
		assert!(!UriPattern::with_policy("..", MatchPolicy::Wildcard).is_valid());
		assert!(!UriPattern::with_policy("com..e rror", MatchPolicy::Wildcard).is_valid());
		assert!(!UriPattern::exact("com..error").is_valid());
		assert!(!UriPattern::with_policy("com..", MatchPolicy::Prefix).is_valid());
	}
}
