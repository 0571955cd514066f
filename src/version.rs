//! Version information.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `User-Agent` sent by the built-in HTTP fetcher: `hoard/{version}`.
pub fn user_agent() -> String {
    format!("hoard/{PKG_VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_contains_pkg_version() {
        let ua = user_agent();
        assert!(ua.starts_with("hoard/"));
        assert!(ua.ends_with(PKG_VERSION));
    }
}
