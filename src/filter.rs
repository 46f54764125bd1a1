//! Injection-safe LDAP search filter construction.
use std::collections::BTreeMap;

use crate::{error::Error, hooks::FormatSearchFilter};

/// Upper-case hex digits for escape sequences.
const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Escapes text so it cannot interfere with an LDAP search filter.
///
/// Characters outside `[A-Za-z0-9 _\-.@:]` are replaced by a backslash
/// followed by the two-digit upper-case hex encoding of their byte value.
/// Characters that do not fit in a single byte are dropped. Note that `*`
/// is escaped, so values cannot smuggle wildcards into equality clauses.
///
/// Escaping is not idempotent: the backslash of an existing escape sequence
/// is itself escaped on a second pass.
#[must_use]
pub fn escape(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'A'..='Z' | 'a'..='z' | '0'..='9' | ' ' | '_' | '-' | '.' | '@' | ':' => out.push(c),
			c if (c as u32) <= 0xFF => {
				let byte = c as u32;
				out.push('\\');
				out.push(char::from(HEX[(byte >> 4) as usize]));
				out.push(char::from(HEX[(byte & 0xF) as usize]));
			}
			// Not representable as a single byte; dropped.
			_ => {}
		}
	}
	out
}

/// Builds an equality-AND search filter for the given local fields.
///
/// Each field name is translated to its directory attribute via `alias`
/// and formatted as one clause by the `format` hook; an `objectClass`
/// clause is appended last and the whole set is wrapped in `(&...)`.
/// An empty field mapping still yields a valid filter consisting of the
/// `objectClass` clause alone.
///
/// # Errors
/// [`Error::UnmappedField`] if a field has no entry in `alias`.
pub fn build_filter(
	fields: &BTreeMap<String, String>,
	object_class: &str,
	alias: &BTreeMap<String, String>,
	format: &dyn FormatSearchFilter,
) -> Result<String, Error> {
	let mut clauses = Vec::with_capacity(fields.len() + 1);
	for (field, value) in fields {
		let attribute =
			alias.get(field).ok_or_else(|| Error::UnmappedField(field.clone()))?;
		clauses.push(format.format_clause(attribute, value));
	}
	clauses.push(format.format_clause("objectClass", object_class));
	Ok(format!("(&{})", clauses.concat()))
}
