//! Job definitions as read from the `jobs` list of the configuration.
//!
//! A job is a name, a kind and a flat bag of string options. Which options a
//! kind needs lives in one table ([`JobKind::option_specs`]) so that every
//! handler skips on bad configuration the same way.

use crate::backup::redacted::{is_secret_option, REDACTED_PASSPHRASE};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;

use derive_more::{Deref, Display};
use getset::Getters;
use itertools::Itertools;
use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::result;
use std::sync::Arc;

/// Name of the reserved configuration scope that holds the global defaults.
pub static RESERVED_DEFAULTS_NAME: &str = "default";

/// Group used when a producing job declares none.
pub static DEFAULT_GROUP: &str = "/";

#[derive(Clone, Copy, Debug, Default, Display, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    #[serde(alias = "folder", alias = "dir")]
    #[display("directory")]
    Directory,
    #[serde(alias = "db")]
    #[display("database")]
    Database,
    #[serde(alias = "svn")]
    #[display("vcs")]
    Vcs,
    #[display("sync")]
    Sync,
    #[display("report")]
    Report,
    #[serde(alias = "dpkg")]
    #[display("package-list")]
    PackageList,
    #[serde(alias = "clean")]
    #[display("cleanup")]
    Cleanup,
    #[default]
    #[serde(other)]
    #[display("unknown")]
    Unknown,
}

/// One declared option of a job kind.
#[derive(Clone, Copy, Debug)]
pub struct OptionSpec {
    pub key: &'static str,
    pub required: bool,
    pub allowed: Option<&'static [&'static str]>,
}

impl OptionSpec {
    const fn required(key: &'static str) -> Self {
        Self {
            key,
            required: true,
            allowed: None,
        }
    }

    const fn one_of(key: &'static str, allowed: &'static [&'static str]) -> Self {
        Self {
            key,
            required: true,
            allowed: Some(allowed),
        }
    }
}

pub static DATABASE_DRIVERS: &[&str] = &["mysql", "pgsql", "mongodb"];
pub static SYNC_PROTOCOLS: &[&str] = &["archive", "copy", "rsync", "ftp"];

static DIRECTORY_OPTIONS: &[OptionSpec] = &[
    OptionSpec::required("folder"),
    OptionSpec::required("output"),
];
static DATABASE_OPTIONS: &[OptionSpec] = &[
    OptionSpec::one_of("driver", DATABASE_DRIVERS),
    OptionSpec::required("output"),
];
static VCS_OPTIONS: &[OptionSpec] = &[
    OptionSpec::required("folder"),
    OptionSpec::required("output"),
];
static SYNC_OPTIONS: &[OptionSpec] = &[OptionSpec::one_of("protocol", SYNC_PROTOCOLS)];
static REPORT_OPTIONS: &[OptionSpec] = &[OptionSpec::required("report")];
static PACKAGE_LIST_OPTIONS: &[OptionSpec] = &[OptionSpec::required("output")];

impl JobKind {
    pub fn option_specs(&self) -> &'static [OptionSpec] {
        match self {
            JobKind::Directory => DIRECTORY_OPTIONS,
            JobKind::Database => DATABASE_OPTIONS,
            JobKind::Vcs => VCS_OPTIONS,
            JobKind::Sync => SYNC_OPTIONS,
            JobKind::Report => REPORT_OPTIONS,
            JobKind::PackageList => PACKAGE_LIST_OPTIONS,
            JobKind::Cleanup | JobKind::Unknown => &[],
        }
    }

    /// Kinds whose `output` option is a base file name inside `defaults.output`.
    pub fn writes_into_output_dir(&self) -> bool {
        matches!(self, JobKind::Directory | JobKind::Database | JobKind::Vcs)
    }
}

/// A scalar option value, stored as the string the handlers consume.
///
/// Booleans and numbers are accepted and stringified, a sequence of scalars
/// is joined with `,` so `exclude: ["a", "b"]` reads like `exclude: a, b`.
#[derive(Clone, Debug, Deref, PartialEq, Eq)]
pub struct OptionValue(String);

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

struct OptionValueVisitor;

impl<'de> Visitor<'de> for OptionValueVisitor {
    type Value = OptionValue;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a scalar or a list of scalars")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> result::Result<Self::Value, E> {
        Ok(v.into())
    }

    fn visit_string<E: serde::de::Error>(self, v: String) -> result::Result<Self::Value, E> {
        Ok(v.into())
    }

    fn visit_bool<E: serde::de::Error>(self, v: bool) -> result::Result<Self::Value, E> {
        Ok(v.to_string().into())
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> result::Result<Self::Value, E> {
        Ok(v.to_string().into())
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> result::Result<Self::Value, E> {
        Ok(v.to_string().into())
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> result::Result<Self::Value, E> {
        Ok(v.to_string().into())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> result::Result<Self::Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<OptionValue>()? {
            items.push(item.0);
        }
        Ok(items.join(",").into())
    }
}

impl<'de> Deserialize<'de> for OptionValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        deserializer.deserialize_any(OptionValueVisitor)
    }
}

#[derive(Clone, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct Job {
    name: Arc<str>,
    #[serde(rename = "type", default)]
    kind: JobKind,
    #[serde(flatten)]
    options: BTreeMap<String, OptionValue>,
}

impl Job {
    pub fn new<N, I, K, V>(name: N, kind: JobKind, options: I) -> Self
    where
        N: Into<Arc<str>>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<OptionValue>,
    {
        Self {
            name: name.into(),
            kind,
            options: options
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(|v| v.as_str())
    }

    /// Fetches an option the kind declares as required.
    pub fn required_option(&self, key: &str) -> Result<&str> {
        self.option(key)
            .ok_or_else(|| Error::missing_option(self.name.as_ref(), key))
    }

    /// Comma separated option, trimmed, with empty items dropped.
    pub fn option_list(&self, key: &str) -> Vec<String> {
        self.option(key).map(split_list).unwrap_or_default()
    }

    /// `true`/`yes`/`1`, case insensitive.
    pub fn option_flag(&self, key: &str) -> bool {
        self.option(key)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "yes" | "1"))
            .unwrap_or(false)
    }

    /// The routing group of artifacts this job produces.
    pub fn group(&self) -> Arc<str> {
        self.option("group")
            .filter(|g| !g.trim().is_empty())
            .unwrap_or(DEFAULT_GROUP)
            .into()
    }

    /// Label used in report lines: `name`, else `folder`, else nothing.
    pub fn display_name(&self) -> &str {
        self.option("name")
            .or_else(|| self.option("folder"))
            .unwrap_or("")
    }

    /// Checks the job against its kind's option table.
    pub fn check_options(&self) -> Result<()> {
        for spec in self.kind.option_specs() {
            match self.option(spec.key) {
                None if spec.required => {
                    return Err(Error::missing_option(self.name.as_ref(), spec.key));
                }
                Some(value) => {
                    if let Some(allowed) = spec.allowed {
                        if !allowed.contains(&value) {
                            return Err(Error::UnsupportedOption {
                                job: self.name.to_string(),
                                option: spec.key.to_string(),
                                value: value.to_string(),
                                allowed: allowed.iter().join(", "),
                            });
                        }
                    }
                }
                None => {}
            }
        }
        Ok(())
    }
}

impl Debug for Job {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let options = self
            .options
            .iter()
            .map(|(k, v)| {
                if is_secret_option(k) {
                    (k.as_str(), REDACTED_PASSPHRASE)
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect::<BTreeMap<_, _>>();
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("options", &options)
            .finish()
    }
}

pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
