//! A single versioned change-set.
//!
//! A migration file carries a `YYYYMMDDHHMMSS` version prefix in its name and
//! two SQL bodies split by marker lines:
//!
//! ```sql
//! -- up
//! CREATE TABLE t (id INTEGER);
//! -- down
//! DROP TABLE t;
//! ```
//!
//! Anything before the first marker belongs to the forward body.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{MigrateError, Result};

/// `chrono` layout of the version prefix.
pub const VERSION_FORMAT: &str = "%Y%m%d%H%M%S";

/// Marker line opening the forward section.
pub const UP_MARKER: &str = "-- up";

/// Marker line opening the reverse section.
pub const DOWN_MARKER: &str = "-- down";

/// Ordering key and durable identity of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(NaiveDateTime);

impl Version {
    /// Parses the leading digits of a migration file name.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let end = name
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(name.len());
        let digits = &name[..end];

        NaiveDateTime::parse_from_str(digits, VERSION_FORMAT)
            .map(Self)
            .map_err(|err| MigrateError::InvalidVersion {
                name: name.to_string(),
                message: format!("prefix {digits:?} is not a {VERSION_FORMAT} timestamp: {err}"),
            })
    }

    /// Returns the timestamp this version stands for.
    #[must_use]
    pub fn timestamp(&self) -> NaiveDateTime {
        self.0
    }
}

impl From<NaiveDateTime> for Version {
    fn from(timestamp: NaiveDateTime) -> Self {
        Self(timestamp)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(VERSION_FORMAT))
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One versioned pair of forward and reverse SQL bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// File name the migration was loaded from.
    pub name: String,
    /// Version parsed from the file name prefix.
    pub version: Version,
    /// SQL executed when applying.
    pub forward_body: String,
    /// SQL executed when reverting.
    pub reverse_body: String,
}

impl Migration {
    /// Builds a migration from a file name and its contents.
    pub fn parse(name: impl Into<String>, content: &str) -> Result<Self> {
        let name = name.into();
        let version = Version::from_file_name(&name)?;
        let (forward_body, reverse_body) = split_bodies(content);

        Ok(Self {
            name,
            version,
            forward_body,
            reverse_body,
        })
    }

    /// Returns the version as stored in the tracking table.
    #[must_use]
    pub fn version_string(&self) -> String {
        self.version.to_string()
    }
}

/// Splits file content into `(forward, reverse)` bodies.
fn split_bodies(content: &str) -> (String, String) {
    let (forward, reverse, _) = content.lines().fold(
        (String::new(), String::new(), true),
        |(mut forward, mut reverse, in_forward), line| {
            if line.starts_with(UP_MARKER) {
                return (forward, reverse, true);
            }
            if line.starts_with(DOWN_MARKER) {
                return (forward, reverse, false);
            }

            let body = if in_forward { &mut forward } else { &mut reverse };
            body.push_str(line);
            body.push('\n');
            (forward, reverse, in_forward)
        },
    );
    (forward, reverse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_from_file_name() {
        let version = Version::from_file_name("20230102030405_add_col.sql").unwrap();
        assert_eq!(version.to_string(), "20230102030405");
        assert_eq!(
            version.timestamp().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2023-01-02 03:04:05"
        );
    }

    #[test]
    fn test_version_without_prefix() {
        let err = Version::from_file_name("init.sql").unwrap_err();
        assert!(matches!(err, MigrateError::InvalidVersion { ref name, .. } if name == "init.sql"));
    }

    #[test]
    fn test_version_wrong_width() {
        assert!(Version::from_file_name("2023_init.sql").is_err());
        assert!(Version::from_file_name("202301010000001_init.sql").is_err());
    }

    #[test]
    fn test_version_out_of_range() {
        assert!(Version::from_file_name("20231301000000_bad_month.sql").is_err());
    }

    #[test]
    fn test_version_ordering() {
        let older = Version::from_file_name("20230101000000_a.sql").unwrap();
        let newer = Version::from_file_name("20230101000001_b.sql").unwrap();
        assert!(older < newer);
    }

    #[test]
    fn test_parse_both_sections() {
        let migration = Migration::parse(
            "20230101000000_init.sql",
            "-- up\nCREATE TABLE t(id int);\n-- down\nDROP TABLE t;\n",
        )
        .unwrap();

        assert_eq!(migration.name, "20230101000000_init.sql");
        assert_eq!(migration.version_string(), "20230101000000");
        assert_eq!(migration.forward_body, "CREATE TABLE t(id int);\n");
        assert_eq!(migration.reverse_body, "DROP TABLE t;\n");
    }

    #[test]
    fn test_parse_without_down_marker() {
        let migration =
            Migration::parse("20230101000000_init.sql", "-- up\nCREATE TABLE t(id int);").unwrap();

        assert_eq!(migration.forward_body, "CREATE TABLE t(id int);\n");
        assert!(migration.reverse_body.is_empty());
    }

    #[test]
    fn test_parse_content_before_markers_is_forward() {
        let migration = Migration::parse(
            "20230101000000_init.sql",
            "-- creates the t table\nCREATE TABLE t(id int);\n-- down\nDROP TABLE t;",
        )
        .unwrap();

        assert_eq!(
            migration.forward_body,
            "-- creates the t table\nCREATE TABLE t(id int);\n"
        );
        assert_eq!(migration.reverse_body, "DROP TABLE t;\n");
    }

    #[test]
    fn test_parse_markers_match_by_prefix() {
        let migration = Migration::parse(
            "20230101000000_init.sql",
            "-- upgrade\nA;\n-- down: undo\nB;\n-- up again\nC;\n",
        )
        .unwrap();

        assert_eq!(migration.forward_body, "A;\nC;\n");
        assert_eq!(migration.reverse_body, "B;\n");
    }

    #[test]
    fn test_parse_crlf_lines() {
        let migration = Migration::parse(
            "20230101000000_init.sql",
            "-- up\r\nA;\r\n-- down\r\nB;\r\n",
        )
        .unwrap();

        assert_eq!(migration.forward_body, "A;\n");
        assert_eq!(migration.reverse_body, "B;\n");
    }

    #[test]
    fn test_version_serializes_as_string() {
        let version = Version::from_file_name("20230101000000_init.sql").unwrap();
        assert_eq!(
            serde_json::to_string(&version).unwrap(),
            "\"20230101000000\""
        );
    }
}
