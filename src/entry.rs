//! Helper methods for extracting data from search results.
use ldap3::SearchEntry;

/// An extension trait for [`SearchEntry`] that provides the attribute
/// access conventions of this crate.
pub trait SearchEntryExt {
	/// Get the first value of an attribute. Multi-valued attributes
	/// deliberately collapse to their first value; secondary values are
	/// dropped.
	fn attr_first(&self, attr: &str) -> Option<&str>;

	/// The DN to rebind as when verifying this entry's password: the first
	/// value of the `distinguishedName` attribute when the server returns
	/// one (Active Directory does), otherwise the entry DN.
	fn bind_dn(&self) -> &str;
}

impl SearchEntryExt for SearchEntry {
	fn attr_first(&self, attr: &str) -> Option<&str> {
		self.attrs.get(attr)?.first().map(String::as_str)
	}

	fn bind_dn(&self) -> &str {
		self.attr_first("distinguishedName").unwrap_or(&self.dn)
	}
}
