//! Network target strings.
//!
//! A job names its peer as `host:port`. The sending side connects to the
//! host; the receiving side only uses the port and listens on all
//! interfaces.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A parsed `host:port` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host part; may be a dotted IPv4 address or a resolvable name.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Target {
    /// Parses a target string.
    ///
    /// The split happens on the last `:`, so for the receiving role anything
    /// before the port is accepted verbatim.
    ///
    /// # Errors
    /// - `MalformedTarget` if the string has no `:`
    /// - `InvalidPort` if the suffix is not a decimal `u16`
    pub fn parse(target: &str) -> Result<Self, ConfigError> {
        let Some((host, port)) = target.rsplit_once(':') else {
            return Err(ConfigError::MalformedTarget {
                target: target.to_string(),
            });
        };

        let invalid = || ConfigError::InvalidPort {
            target: target.to_string(),
            port: port.to_string(),
        };
        if !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let port_num = port.parse::<u16>().map_err(|_| invalid())?;

        Ok(Self {
            host: host.to_string(),
            port: port_num,
        })
    }
}

impl FromStr for Target {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        let t = Target::parse("127.0.0.1:9000").unwrap();
        assert_eq!(t.host, "127.0.0.1");
        assert_eq!(t.port, 9000);
        assert_eq!(t.to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn receive_side_uses_suffix_after_last_colon() {
        let t: Target = "anything:goes:8080".parse().unwrap();
        assert_eq!(t.port, 8080);
        assert_eq!(t.host, "anything:goes");
    }

    #[test]
    fn missing_separator_is_malformed() {
        let err = Target::parse("noport").unwrap_err();
        let ConfigError::MalformedTarget { target } = err else {
            panic!("expected MalformedTarget, got {err:?}");
        };
        assert_eq!(target, "noport");
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let err = Target::parse("localhost:http").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { ref port, .. } if port == "http"));

        assert!(Target::parse("localhost:70000").is_err());
        assert!(Target::parse("localhost:").is_err());
    }

    #[test]
    fn port_allows_no_whitespace_or_sign() {
        for bad in ["host: 9000", "host:9000 ", "host:+9000", "host:-1"] {
            let err = Target::parse(bad).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidPort { .. }), "{bad}: {err:?}");
        }
    }
}
