// ABOUTME: Custom serde deserializers for configuration values.
// ABOUTME: Blank optional strings become None; security groups accept a string or a list.

use nonempty::NonEmpty;
use serde::Deserialize;

/// An optional string where blank means absent.
pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// One security group name or a list of them. At least one is required.
pub fn security_groups<'de, D>(deserializer: D) -> Result<NonEmpty<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let groups = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    };
    let groups: Vec<String> = groups
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();

    NonEmpty::from_vec(groups)
        .ok_or_else(|| serde::de::Error::custom("at least one security group is required"))
}
