//! Client filename convention.
//!
//! Config files are named `<family>-<name>-(<free text>)[-udp|-tcp].ovpn`
//! where `<family>` is `vpn` or `antizapret`. Only `<name>` is meaningful.

use regex::Regex;
use std::sync::LazyLock;

static CLIENT_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:vpn|antizapret)-(.+)-\(.*\)(?:-(?:udp|tcp))?\.ovpn$").unwrap()
});

/// Extract the client name from a config filename, or `None` for foreign files.
pub fn parse_client_name(filename: &str) -> Option<&str> {
    let caps = CLIENT_FILE_RE.captures(filename)?;
    caps.get(1).map(|m| m.as_str())
}
