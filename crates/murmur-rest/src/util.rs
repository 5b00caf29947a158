//! Small helpers shared by the handlers.

use crate::murmur::{Meta, MurmurResult, VirtualServer};

/// Port the first virtual server listens on when nothing else is configured.
const FALLBACK_PORT: i64 = 64738;

/// Effective configuration value: the server's own value, else the default
/// configuration's, else an empty string.
pub async fn server_conf(
    meta: &dyn Meta,
    server: &dyn VirtualServer,
    key: &str,
) -> MurmurResult<String> {
    let value = server.get_conf(key).await?;
    if !value.is_empty() {
        return Ok(value);
    }
    Ok(meta.get_default_conf().await?.remove(key).unwrap_or_default())
}

/// Port a server listens on.
///
/// Servers without an explicit port take the default port plus their ID minus one.
pub async fn server_port(meta: &dyn Meta, server: &dyn VirtualServer) -> MurmurResult<i64> {
    if let Ok(port) = server.get_conf("port").await?.trim().parse::<i64>() {
        return Ok(port);
    }

    let default_port = meta
        .get_default_conf()
        .await?
        .get("port")
        .and_then(|p| p.trim().parse::<i64>().ok())
        .unwrap_or(FALLBACK_PORT);

    Ok(default_port + i64::from(server.id()) - 1)
}

/// Format seconds as `H:MM:SS`, prefixed with `N day(s), ` past 24 hours.
pub fn humanize_uptime(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let days = seconds / 86_400;
    let rest = seconds % 86_400;
    let clock = format!("{}:{:02}:{:02}", rest / 3600, (rest % 3600) / 60, rest % 60);

    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}

/// Interpret a configuration value as a boolean flag. Unset counts as off.
pub fn conf_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

/// Whether `name` is safe to use as a JSONP callback: identifiers joined by dots.
pub fn is_valid_callback(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

/// Parse a comma-separated list of IDs. Blank segments are ignored.
pub fn parse_id_list(value: &str) -> Result<Vec<i32>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>().map_err(|_| format!("Invalid server ID: {s}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::murmur::MemoryMeta;

    #[test]
    fn test_humanize_uptime() {
        assert_eq!(humanize_uptime(0), "0:00:00");
        assert_eq!(humanize_uptime(59), "0:00:59");
        assert_eq!(humanize_uptime(3_725), "1:02:05");
        assert_eq!(humanize_uptime(86_400), "1 day, 0:00:00");
        assert_eq!(humanize_uptime(2 * 86_400 + 36_000 + 61), "2 days, 10:01:01");
        assert_eq!(humanize_uptime(-5), "0:00:00");
    }

    #[test]
    fn test_conf_flag() {
        for on in ["1", "true", "yes", "TRUE", "on"] {
            assert!(conf_flag(on), "{on} should be on");
        }
        for off in ["", " ", "0", "false", "False", "no", "off"] {
            assert!(!conf_flag(off), "{off:?} should be off");
        }
    }

    #[test]
    fn test_is_valid_callback() {
        assert!(is_valid_callback("cb"));
        assert!(is_valid_callback("jQuery123_456"));
        assert!(is_valid_callback("window.app.render"));
        assert!(is_valid_callback("$"));

        assert!(!is_valid_callback(""));
        assert!(!is_valid_callback("1abc"));
        assert!(!is_valid_callback("alert(1)"));
        assert!(!is_valid_callback("a..b"));
        assert!(!is_valid_callback("a;b"));
        assert!(!is_valid_callback("a.b."));
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("5,6,999").unwrap(), vec![5, 6, 999]);
        assert_eq!(parse_id_list(" 1 , ,2").unwrap(), vec![1, 2]);
        assert!(parse_id_list("1,x").is_err());
    }

    #[tokio::test]
    async fn test_server_conf_and_port_fallbacks() {
        let meta = MemoryMeta::new();
        meta.new_server().await.unwrap();
        let second = meta.new_server().await.unwrap();

        assert_eq!(server_conf(&meta, second.as_ref(), "users").await.unwrap(), "100");
        assert_eq!(server_conf(&meta, second.as_ref(), "x_cvp").await.unwrap(), "");
        assert_eq!(server_port(&meta, second.as_ref()).await.unwrap(), 64739);

        second.set_conf("port", "7000").await.unwrap();
        second.set_conf("users", "8").await.unwrap();
        assert_eq!(server_port(&meta, second.as_ref()).await.unwrap(), 7000);
        assert_eq!(server_conf(&meta, second.as_ref(), "users").await.unwrap(), "8");
    }
}
