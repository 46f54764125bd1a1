use std::{error::Error, sync::Arc};

use ldap3::LdapConnAsync;
use ldap_auth_sync::Config;
use url::Url;

/// Base DN of the test container.
pub const BASE: &str = "dc=example,dc=org";

/// Configuration matching the local OpenLDAP test container.
pub fn test_config() -> Result<Config, Box<dyn Error>> {
	Ok(Config {
		url: Url::parse("ldap://localhost:1389")?,
		admin_dn: format!("cn=admin,{BASE}"),
		admin_password: "adminpassword".to_owned(),
		user_search_base: format!("ou=users,{BASE}"),
		user_field_alias: [
			("username", "uid"),
			("first_name", "givenName"),
			("last_name", "sn"),
			("email", "mail"),
		]
		.into_iter()
		.map(|(field, attribute)| (field.to_owned(), attribute.to_owned()))
		.collect(),
		// Small pages so three users already exercise the paging control.
		page_size: 2,
		..Config::default()
	})
}

/// Lookup mapping for a single username.
pub fn lookup(username: &str) -> std::collections::BTreeMap<String, String> {
	[("username".to_owned(), username.to_owned())].into_iter().collect()
}

/// Shares one config between the test body and the services under test.
pub fn arc_config() -> Result<Arc<Config>, Box<dyn Error>> {
	Ok(Arc::new(test_config()?))
}

pub async fn ldap_connect() -> Result<ldap3::Ldap, Box<dyn Error>> {
	let (conn, mut ldap) = LdapConnAsync::new("ldap://localhost:1389").await?;
	let _handle = tokio::spawn(async move {
		if let Err(err) = conn.drive().await {
			panic!("Ldap connection error {err}");
		}
	});
	ldap.simple_bind(&format!("cn=admin,{BASE}"), "adminpassword").await?.success()?;
	Ok(ldap)
}

pub async fn ldap_add_organizational_unit(
	ldap: &mut ldap3::Ldap,
	ou: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.add(&format!("ou={ou},{BASE}"), vec![("objectClass", ["organizationalUnit"].into())])
		.await?
		.success()?;
	Ok(())
}

pub async fn ldap_delete_organizational_unit(
	ldap: &mut ldap3::Ldap,
	ou: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.delete(&format!("ou={ou},{BASE}")).await?.success()?;
	Ok(())
}

pub async fn ldap_add_user(
	ldap: &mut ldap3::Ldap,
	uid: &str,
	given_name: &str,
	surname: &str,
	mail: &str,
	password: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.add(
		&format!("uid={uid},ou=users,{BASE}"),
		vec![
			("objectClass", ["inetOrgPerson"].into()),
			("uid", [uid].into()),
			("cn", [given_name].into()),
			("givenName", [given_name].into()),
			("sn", [surname].into()),
			("mail", [mail].into()),
			("userPassword", [password].into()),
		],
	)
	.await?
	.success()?;
	Ok(())
}

pub async fn ldap_delete_user(ldap: &mut ldap3::Ldap, uid: &str) -> Result<(), Box<dyn Error>> {
	ldap.delete(&format!("uid={uid},ou=users,{BASE}")).await?.success()?;
	Ok(())
}
