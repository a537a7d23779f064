//! Unit name codec.
//!
//! Every unit Deckhand launches carries its identity in the fleet unit
//! name:
//!
//! ```text
//! <service>:<version>:<timestamp>@<instance>.service
//! carousel:abc123:2006.01.02-15.04.05@1.service
//! ```
//!
//! Names without this structure (`vulcand.service`, `etcd@1.service`) are
//! foreign to Deckhand and every extractor returns `None` for them.

/// The four fields decoded from a managed unit name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitName<'a> {
    pub service: &'a str,
    pub version: &'a str,
    pub timestamp: &'a str,
    pub instance: &'a str,
}

/// Encode the four identity fields into a unit name.
pub fn encode(service: &str, version: &str, timestamp: &str, instance: &str) -> String {
    format!("{service}:{version}:{timestamp}@{instance}.service")
}

/// Decode a unit name, or `None` if it is not managed by Deckhand.
pub fn decode(name: &str) -> Option<UnitName<'_>> {
    let (head, tail) = name.split_once('@')?;
    if tail.contains('@') {
        return None;
    }

    let mut fields = head.split(':');
    let service = fields.next()?;
    let version = fields.next()?;
    let timestamp = fields.next()?;
    if fields.next().is_some() {
        return None;
    }

    let dot = tail.rfind('.')?;
    let instance = &tail[..dot];

    if service.is_empty() || instance.is_empty() {
        return None;
    }

    Some(UnitName {
        service,
        version,
        timestamp,
        instance,
    })
}

/// Whether the name follows the managed `service:version:timestamp@instance.service` layout.
pub fn is_managed(name: &str) -> bool {
    decode(name).is_some()
}

/// Substring before the first `:`.
pub fn extract_base_name(name: &str) -> Option<&str> {
    decode(name).map(|n| n.service)
}

/// Substring between the first and second `:`.
pub fn extract_version(name: &str) -> Option<&str> {
    decode(name).map(|n| n.version)
}

/// Substring between the second `:` and the `@`.
pub fn extract_timestamp(name: &str) -> Option<&str> {
    decode(name).map(|n| n.timestamp)
}

/// Substring between the `@` and the final `.`.
pub fn extract_instance(name: &str) -> Option<&str> {
    decode(name).map(|n| n.instance)
}
