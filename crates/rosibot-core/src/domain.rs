use std::fmt;

/// Phone number of the linked Signal account (E.164, e.g. `+4915112345678`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PhoneNumber(pub String);

/// Signal group id as configured or reported by the REST API.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub String);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A group resolved against the REST API.
///
/// `id` (`group.<base64>`) addresses outgoing messages, `internal_id` is what
/// shows up in incoming envelopes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedGroup {
    pub id: GroupId,
    pub internal_id: GroupId,
    pub name: String,
}

impl ResolvedGroup {
    /// Whether `group` refers to this group in either id form.
    pub fn matches(&self, group: &GroupId) -> bool {
        self.id == *group || self.internal_id == *group
    }
}
