//! Provider payload → [`CanonicalRecord`]
//!
//! Entries follow the Google People API `Person` shape. Each field resolves
//! to the first non-blank value among its entries.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{CanonicalRecord, UNKNOWN_CONTACT};

const AVATAR_BASE_URL: &str = "https://ui-avatars.com/api/";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawPerson {
    resource_name: Option<String>,
    names: Option<Vec<RawName>>,
    email_addresses: Option<Vec<RawValue>>,
    phone_numbers: Option<Vec<RawValue>>,
    photos: Option<Vec<RawPhoto>>,
    organizations: Option<Vec<RawOrganization>>,
    addresses: Option<Vec<RawAddress>>,
    biographies: Option<Vec<RawValue>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawName {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawValue {
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPhoto {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOrganization {
    name: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawAddress {
    formatted_value: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn first<T>(items: &Option<Vec<T>>, field: impl Fn(&T) -> Option<&str>) -> Option<String> {
    items
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find_map(field)
        .map(str::to_string)
}

/// Placeholder avatar URL derived only from `name`
pub fn generated_avatar(name: &str) -> String {
    let encoded: Vec<String> = name
        .split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect();

    format!(
        "{}?name={}&background=6366f1&color=fff&size=128",
        AVATAR_BASE_URL,
        encoded.join("+")
    )
}

fn to_record(person: RawPerson, fallback_id: String) -> CanonicalRecord {
    let name = first(&person.names, |n| non_blank(&n.display_name))
        .unwrap_or_else(|| UNKNOWN_CONTACT.to_string());

    let (organization, title) = person
        .organizations
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|o| non_blank(&o.name).is_some() || non_blank(&o.title).is_some())
        .map(|o| {
            (
                non_blank(&o.name).unwrap_or_default().to_string(),
                non_blank(&o.title).unwrap_or_default().to_string(),
            )
        })
        .unwrap_or_default();

    let avatar = first(&person.photos, |p| non_blank(&p.url)).unwrap_or_else(|| generated_avatar(&name));

    CanonicalRecord {
        id: non_blank(&person.resource_name)
            .map(str::to_string)
            .unwrap_or(fallback_id),
        email: first(&person.email_addresses, |e| non_blank(&e.value)).unwrap_or_default(),
        phone: first(&person.phone_numbers, |p| non_blank(&p.value)).unwrap_or_default(),
        address: first(&person.addresses, |a| non_blank(&a.formatted_value)).unwrap_or_default(),
        note: first(&person.biographies, |b| non_blank(&b.value)).unwrap_or_default(),
        organization,
        title,
        avatar,
        name,
    }
}

/// Normalize a raw provider payload.
///
/// Entries that do not match the expected shape are skipped with a warning.
/// Records with neither a name, an email nor a phone number are dropped.
/// Entries without a resource name get a positional `contact-{n}` id.
pub fn normalize(raw: &[Value]) -> Vec<CanonicalRecord> {
    let mut records: Vec<CanonicalRecord> = Vec::with_capacity(raw.len());

    for (position, entry) in raw.iter().enumerate() {
        let person = match RawPerson::deserialize(entry) {
            Ok(person) => person,
            Err(e) => {
                warn!(position, error = %e, "Skipping malformed contact entry");
                continue;
            }
        };

        let record = to_record(person, format!("contact-{}", records.len()));
        if record.is_meaningful() {
            records.push(record);
        } else {
            debug!(position, "Dropping contact without name, email or phone");
        }
    }

    records
}
