//! User-Agent string sent with every request.

/// Default User-Agent identifying the harvester and its version.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("hansard-harvester/{version} (parliamentary-record-mirror)")
}
