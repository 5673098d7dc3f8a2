//! Resource payloads and their field rules.

mod blob;
mod group;
mod user;

pub use blob::BlobRef;
pub use group::{Group, GroupPatch};
pub use user::{User, UserPatch};

use c9_repo::{Entity, Patch, RecordId};
use serde::de::DeserializeOwned;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// A named JSON resource served from `/<COLLECTION>`.
pub trait Resource: Entity + Default + Serialize + Send + 'static {
    /// Partial update accepted by POST and PUT.
    type Patch: Patch<Self> + DeserializeOwned + Send + 'static;

    /// First path segment of the collection.
    const COLLECTION: &'static str;

    /// Path of this resource, by name when it has one.
    fn location(&self) -> String {
        match self.name() {
            Some(name) => format!("/{}/{name}", Self::COLLECTION),
            None => format!("/{}/{}", Self::COLLECTION, self.id()),
        }
    }
}

static NAME: LazyLock<Regex> = LazyLock::new(|| compile(r"^[A-Za-z][0-9A-Za-z]*$"));

static PRINTABLE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[\pL\pM\pN\pP\pS\pZ]*$"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)^[0-9a-z_.+-]+@[0-9a-z][0-9a-z_-]*(?:\.[0-9a-z][0-9a-z_-]*)+$")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"(?i)^https?://",
        r"(?:[0-9a-z][0-9a-z_-]*(?:\.[0-9a-z][0-9a-z_-]*)+",
        r"|[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+",
        r"|\[[0-9a-f:.]+\])",
        r"(?::[1-9][0-9]*)?",
        r"(?:/\PC*)?$",
    ))
});

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("field pattern must compile")
}

/// Whether `s` is a valid user or group name: an ASCII letter followed by
/// ASCII letters and digits.
#[must_use]
pub fn is_valid_name(s: &str) -> bool {
    NAME.is_match(s)
}

/// Letters, marks, numbers, punctuation, symbols and separators only.
pub(crate) fn is_printable(s: &str) -> bool {
    PRINTABLE.is_match(s)
}

pub(crate) fn is_valid_email(s: &str) -> bool {
    EMAIL.is_match(s)
}

/// HTTP(S) URL with a dotted host name, an IPv4 literal or a bracketed IPv6
/// literal, and an optional port.
pub(crate) fn is_valid_url(s: &str) -> bool {
    URL.is_match(s)
}

pub(crate) fn is_unset(id: &RecordId) -> bool {
    id.is_unset()
}
