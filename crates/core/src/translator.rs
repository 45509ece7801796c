//! Translation between application errors and WAMP ERROR messages.
//!
//! The forward map answers "which URI does this error type go out as", the
//! reverse map answers "which error type does this URI come back as". Any URI
//! without a usable mapping comes back as [`ApplicationError`], so translating
//! an incoming ERROR never fails.

use std::any::TypeId;
use std::collections::HashMap;

use wamp_protocol::{ErrorMessage, Id, Payload, UriPattern, is_valid_uri};
use wamp_runtime::{
	ApplicationError, Error, FromPayload, PayloadError, RUNTIME_ERROR_URI, Result, WampError,
};

type Rebuild = fn(&Payload) -> std::result::Result<Box<dyn WampError>, PayloadError>;

fn rebuild<E: FromPayload>(
	payload: &Payload,
) -> std::result::Result<Box<dyn WampError>, PayloadError> {
	E::from_payload(payload).map(|error| Box::new(error) as Box<dyn WampError>)
}

struct ReverseEntry {
	type_name: &'static str,
	rebuild: Rebuild,
}

/// Bidirectional error type / error URI mapping owned by one session.
#[derive(Default)]
pub struct ErrorTranslator {
	forward: HashMap<TypeId, Vec<UriPattern>>,
	reverse: HashMap<String, ReverseEntry>,
}

impl ErrorTranslator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Maps the error type `E` to its URI patterns.
	///
	/// `uri` must be given exactly when `E` declares no URIs of its own.
	/// Incoming URIs are looked up literally, whatever the pattern's policy.
	pub fn define<E: FromPayload>(&mut self, uri: Option<&str>) -> Result<()> {
		let type_name = std::any::type_name::<E>();

		let patterns = match (E::declared_uris(), uri) {
			(Some(_), Some(uri)) => {
				return Err(Error::InvalidDefinition(format!(
					"{type_name} declares its own URIs and cannot also be mapped to '{uri}'"
				)));
			}
			(None, None) => {
				return Err(Error::InvalidDefinition(format!(
					"{type_name} declares no URIs, an error URI is required"
				)));
			}
			(Some(declared), None) if declared.is_empty() => {
				return Err(Error::InvalidDefinition(format!(
					"{type_name} declares an empty URI list"
				)));
			}
			(Some(declared), None) => declared,
			(None, Some(uri)) => vec![UriPattern::exact(uri)],
		};

		if let Some(bad) = patterns.iter().find(|p| !p.is_valid()) {
			return Err(Error::InvalidArgument(format!(
				"invalid error URI '{}' for {type_name}",
				bad.uri()
			)));
		}

		for pattern in &patterns {
			let previous = self.reverse.insert(
				pattern.uri().to_string(),
				ReverseEntry {
					type_name,
					rebuild: rebuild::<E>,
				},
			);
			if let Some(previous) = previous.filter(|p| p.type_name != type_name) {
				tracing::warn!(
					uri = pattern.uri(),
					previous = previous.type_name,
					current = type_name,
					"Error URI remapped to a different type"
				);
			}
		}

		tracing::debug!(
			"Defined error mapping: type={}, uris={:?}",
			type_name,
			patterns.iter().map(UriPattern::uri).collect::<Vec<_>>()
		);
		self.forward.insert(TypeId::of::<E>(), patterns);
		Ok(())
	}

	/// Returns true if `E` has a mapping.
	pub fn is_defined<E: WampError>(&self) -> bool {
		self.forward.contains_key(&TypeId::of::<E>())
	}

	/// Returns the URI an error goes out as.
	///
	/// That is the first declared pattern usable as a concrete URI; a type
	/// mapped only through wildcards goes out as [`RUNTIME_ERROR_URI`].
	pub fn uri_for<'a>(&'a self, error: &'a dyn WampError) -> &'a str {
		if let Some(application) = error.downcast_ref::<ApplicationError>() {
			return application.uri();
		}
		self.forward
			.get(&error.as_any().type_id())
			.and_then(|patterns| {
				patterns
					.iter()
					.map(UriPattern::uri)
					.find(|uri| is_valid_uri(uri))
			})
			.unwrap_or(RUNTIME_ERROR_URI)
	}

	/// Builds the ERROR message answering `request` with `error`.
	pub fn to_wire_error(&self, request: Id, error: &dyn WampError) -> ErrorMessage {
		ErrorMessage::new(request, self.uri_for(error), error.payload())
	}

	/// Rebuilds the application error carried by an ERROR message.
	pub fn from_wire_error(&self, message: &ErrorMessage) -> Box<dyn WampError> {
		if let Some(entry) = self.reverse.get(&message.error) {
			match (entry.rebuild)(&message.payload) {
				Ok(error) => return error,
				Err(e) => {
					tracing::debug!(
						uri = %message.error,
						error = %e,
						"Could not rebuild mapped error, using ApplicationError"
					);
				}
			}
		}
		Box::new(ApplicationError::new(message.error.clone(), message.payload.clone()))
	}
}
