//! Error codes

/// Errors that can occur when using this library.
///
/// Expected authentication outcomes (admin bind failure, unknown user, bad
/// password) are deliberately not represented here. They are logged and
/// surfaced as `None`/`false` by the directory client so that callers cannot
/// distinguish between them.
#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// A local field name has no directory attribute in the configured alias
	/// table.
	#[error("no directory attribute configured for field `{0}`")]
	UnmappedField(String),
	/// A hook name from the configuration matched nothing in the registry.
	#[error("unknown hook `{0}`")]
	UnknownHook(String),
	/// The admin connection to the directory could not be established.
	#[error("could not connect to the LDAP server")]
	Connect,
	/// The local user store rejected an operation.
	#[error("user store error: {0}")]
	Store(String),
	/// The relation sync hook failed. This propagates instead of being
	/// swallowed, since silently losing relation data is worse than a
	/// failed sync run.
	#[error("user relation sync failed")]
	Relation(#[source] Box<dyn std::error::Error + Send + Sync>),
}
