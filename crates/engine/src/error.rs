use crate::annotation::AnnotationId;
use crate::host::DocumentKey;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// A host service call failed.
	#[error("host call failed: {0}")]
	Host(String),
	/// Settings could not be read or written.
	#[error("settings {key}: {message}")]
	Settings { key: String, message: String },
	/// Engine configuration text could not be parsed.
	#[error("invalid engine configuration: {0}")]
	Config(#[from] toml::de::Error),
	/// The host invoked a command id this engine does not provide.
	#[error("unknown command: {0}")]
	UnknownCommand(String),
	/// The command operates on an annotation but none was supplied.
	#[error("command {0} requires an annotation target")]
	MissingTarget(&'static str),
	/// The annotation was muted, dismissed or rebuilt away.
	#[error("no annotation {id} in {document}")]
	UnknownAnnotation { document: DocumentKey, id: AnnotationId },
	/// A UI context value did not have the `state:tokenType:canonicalValue` shape.
	#[error("malformed annotation tag: {0:?}")]
	InvalidTag(String),
}
