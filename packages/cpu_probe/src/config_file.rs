use std::fs;
use std::path::Path;
use std::str::FromStr;

use phased_bench::{RunConfigurationBuilder, StepPolicy, ThroughputBasis};
use toml::Value;
use tracing::{debug, warn};

use crate::CliError;

const WORDS_PER_MIB: usize = 1024 * 1024 / size_of::<u32>();

/// Settings read from a TOML configuration file. Every key is optional.
///
/// ```toml
/// warm_seconds = 2.5
/// repeat_count = 3
/// step_policy = "fixed"
/// throughput_basis = "wall"
/// local_buffer_mib = 64
/// shared_buffer_mib = 256
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileSettings {
    warm_seconds: Option<f64>,
    repeat_count: Option<u32>,
    step_policy: Option<StepPolicy>,
    throughput_basis: Option<ThroughputBasis>,
    local_buffer_words: Option<usize>,
    shared_buffer_words: Option<usize>,
}

impl FileSettings {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML or a known key has an
    /// invalid value. Unknown keys are logged and ignored.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let contents = fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let value: Value = toml::from_str(&contents).map_err(|source| CliError::ConfigSyntax {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "configuration file loaded");

        Self::from_value(&value)
    }

    fn from_value(value: &Value) -> Result<Self, CliError> {
        let Some(table) = value.as_table() else {
            return Err(value_error("(root)", "expected a table"));
        };

        let mut settings = Self::default();

        for (key, value) in table {
            match key.as_str() {
                "warm_seconds" => settings.warm_seconds = Some(seconds(key, value)?),
                "repeat_count" => {
                    settings.repeat_count = Some(
                        integer(key, value)?
                            .try_into()
                            .map_err(|_out_of_range| value_error(key, "out of range"))?,
                    );
                }
                "step_policy" => settings.step_policy = Some(parsed(key, value)?),
                "throughput_basis" => settings.throughput_basis = Some(parsed(key, value)?),
                "local_buffer_mib" => settings.local_buffer_words = Some(mib_as_words(key, value)?),
                "shared_buffer_mib" => {
                    settings.shared_buffer_words = Some(mib_as_words(key, value)?);
                }
                _ => warn!(key, "ignoring unknown configuration key"),
            }
        }

        Ok(settings)
    }

    /// Applies the settings present in the file on top of `builder`.
    #[must_use]
    pub fn apply(&self, mut builder: RunConfigurationBuilder) -> RunConfigurationBuilder {
        if let Some(seconds) = self.warm_seconds {
            builder = builder.warm_seconds(seconds);
        }

        if let Some(count) = self.repeat_count {
            builder = builder.repeat_count(count);
        }

        if let Some(policy) = self.step_policy {
            builder = builder.step_policy(policy);
        }

        if let Some(basis) = self.throughput_basis {
            builder = builder.throughput_basis(basis);
        }

        if let Some(words) = self.local_buffer_words {
            builder = builder.local_buffer_words(words);
        }

        if let Some(words) = self.shared_buffer_words {
            builder = builder.shared_buffer_words(words);
        }

        builder
    }
}

fn value_error(key: &str, problem: impl Into<String>) -> CliError {
    CliError::ConfigValue {
        key: key.to_string(),
        problem: problem.into(),
    }
}

fn seconds(key: &str, value: &Value) -> Result<f64, CliError> {
    match value {
        Value::Float(seconds) => Ok(*seconds),
        #[expect(
            clippy::cast_precision_loss,
            reason = "seconds in a configuration file are nowhere near 2^52"
        )]
        Value::Integer(seconds) => Ok(*seconds as f64),
        _ => Err(value_error(key, "expected a number of seconds")),
    }
}

fn integer(key: &str, value: &Value) -> Result<i64, CliError> {
    value
        .as_integer()
        .ok_or_else(|| value_error(key, "expected an integer"))
}

fn parsed<T>(key: &str, value: &Value) -> Result<T, CliError>
where
    T: FromStr<Err = String>,
{
    value
        .as_str()
        .ok_or_else(|| value_error(key, "expected a string"))?
        .parse()
        .map_err(|problem: String| value_error(key, problem))
}

fn mib_as_words(key: &str, value: &Value) -> Result<usize, CliError> {
    usize::try_from(integer(key, value)?)
        .ok()
        .and_then(|mib| mib.checked_mul(WORDS_PER_MIB))
        .ok_or_else(|| value_error(key, "expected a non-negative size that fits in memory"))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Write;

    use phased_bench::RunConfiguration;

    use super::*;

    fn settings(text: &str) -> Result<FileSettings, CliError> {
        FileSettings::from_value(&toml::from_str(text).unwrap())
    }

    #[test]
    fn all_keys() {
        let settings = settings(
            r#"
            warm_seconds = 1
            repeat_count = 2
            step_policy = "fixed"
            throughput_basis = "wall"
            local_buffer_mib = 1
            shared_buffer_mib = 3
            "#,
        )
        .unwrap();

        let config = settings.apply(RunConfiguration::builder()).build().unwrap();

        assert_eq!(config.warm_duration().as_secs(), 1);
        assert_eq!(config.repeat_count().get(), 2);
        assert_eq!(config.step_policy(), StepPolicy::FixedStride);
        assert_eq!(config.throughput_basis(), ThroughputBasis::WallClock);
        assert_eq!(config.local_buffer_words(), 262_144);
        assert_eq!(config.shared_buffer_words(), 3 * 262_144);
    }

    #[test]
    fn empty_file_changes_nothing() {
        let config = settings("").unwrap().apply(RunConfiguration::builder()).build();

        assert_eq!(config.unwrap(), RunConfiguration::default());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        assert_eq!(settings("colour = \"blue\"").unwrap(), FileSettings::default());
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(matches!(
            settings("repeat_count = \"five\""),
            Err(CliError::ConfigValue { key, .. }) if key == "repeat_count"
        ));
        assert!(matches!(
            settings("warm_seconds = true"),
            Err(CliError::ConfigValue { key, .. }) if key == "warm_seconds"
        ));
        assert!(matches!(
            settings("step_policy = \"sideways\""),
            Err(CliError::ConfigValue { key, .. }) if key == "step_policy"
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(settings("repeat_count = -1").is_err());
        assert!(settings("local_buffer_mib = -5").is_err());
        assert!(settings("shared_buffer_mib = 9223372036854775807").is_err());
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "repeat_count = 7").unwrap();

        let settings = FileSettings::load(file.path()).unwrap();

        assert_eq!(settings.repeat_count, Some(7));
    }

    #[test]
    fn load_reports_missing_file_and_bad_syntax() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            FileSettings::load(&dir.path().join("missing.toml")),
            Err(CliError::ConfigRead { .. })
        ));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "repeat_count = = 3").unwrap();

        assert!(matches!(
            FileSettings::load(&bad),
            Err(CliError::ConfigSyntax { .. })
        ));
    }
}
