//! `/etc/os-release` parsing

use tracing::debug;

use crate::error::ProvisionError;

/// Remote command that prints the os-release file
pub const OS_RELEASE_COMMAND: &str = "cat /etc/os-release";

/// Identification fields of the host OS
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub id_like: String,
    pub name: String,
    pub version: String,
    pub version_id: String,
    pub pretty_name: String,
    pub home_url: String,
}

impl OsRelease {
    /// Parse the `KEY=value` format of os-release(5)
    ///
    /// Unknown keys and lines without `=` are skipped.
    ///
    /// # Errors
    /// Returns `ProvisionError::OsRelease` if there is no `ID` entry
    pub fn parse(content: &str) -> Result<Self, ProvisionError> {
        let mut os = OsRelease::default();

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                debug!(line, "skipping malformed os-release line");
                continue;
            };
            let value = unquote(value.trim()).to_string();
            match key.trim() {
                "ID" => os.id = value,
                "ID_LIKE" => os.id_like = value,
                "NAME" => os.name = value,
                "VERSION" => os.version = value,
                "VERSION_ID" => os.version_id = value,
                "PRETTY_NAME" => os.pretty_name = value,
                "HOME_URL" => os.home_url = value,
                _ => {}
            }
        }

        if os.id.is_empty() {
            return Err(ProvisionError::OsRelease("missing ID".to_string()));
        }

        Ok(os)
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rancheros() {
        let content = r#"NAME="RancherOS"
VERSION=v1.5.8
ID=rancheros
ID_LIKE=
VERSION_ID=v1.5.8
PRETTY_NAME="RancherOS v1.5.8"
HOME_URL="http://rancher.com/rancher-os/"
SUPPORT_URL="https://forums.rancher.com/c/rancher-os"
"#;

        let os = OsRelease::parse(content).unwrap();

        assert_eq!(os.id, "rancheros");
        assert_eq!(os.name, "RancherOS");
        assert_eq!(os.version_id, "v1.5.8");
        assert_eq!(os.pretty_name, "RancherOS v1.5.8");
        assert!(os.id_like.is_empty());
    }

    #[test]
    fn test_parse_skips_comments_and_garbage() {
        let content = "# generated\n\nnot a pair\nID='ubuntu'\nID_LIKE=\"debian linux\"\n";

        let os = OsRelease::parse(content).unwrap();

        assert_eq!(os.id, "ubuntu");
        assert_eq!(os.id_like, "debian linux");
    }

    #[test]
    fn test_parse_requires_id() {
        let err = OsRelease::parse("NAME=\"Mystery\"\n").unwrap_err();
        assert!(matches!(err, ProvisionError::OsRelease(_)));
    }
}
