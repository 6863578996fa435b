//! Access counting for invalidation groups.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::invalidation::InvalidationGroupError;
use crate::regeneration::md5_hex;

/// Key prefix under the base path where group state is persisted.
pub const STATE_PREFIX: &str = "_invalidation";

/// A configured group: urls matching `regex` share one counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationGroupConfig {
    pub regex: String,
    pub invalidation_path: String,
    pub max_access_number: u32,
}

/// Persisted group state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationGroup {
    #[serde(flatten)]
    pub config: InvalidationGroupConfig,
    pub current_number: u32,
}

/// Next state plus whether the group's path must be invalidated now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub group: InvalidationGroup,
    pub invalidate: bool,
}

impl InvalidationGroup {
    pub fn initial(config: InvalidationGroupConfig) -> Self {
        Self {
            config,
            current_number: 0,
        }
    }

    /// Count one access.
    pub fn advance(self) -> Advance {
        let next = self.current_number.saturating_add(1);

        if next >= self.config.max_access_number {
            Advance {
                group: Self::initial(self.config),
                invalidate: true,
            }
        } else {
            Advance {
                group: Self {
                    current_number: next,
                    ..self
                },
                invalidate: false,
            }
        }
    }
}

#[derive(Debug)]
struct CompiledGroup {
    pattern: Regex,
    config: InvalidationGroupConfig,
}

/// Configured groups with compiled patterns, in configuration order.
#[derive(Debug, Default)]
pub struct InvalidationGroupTracker {
    groups: Vec<CompiledGroup>,
}

impl InvalidationGroupTracker {
    pub fn new(configs: &[InvalidationGroupConfig]) -> Result<Self, InvalidationGroupError> {
        let groups = configs
            .iter()
            .map(|config| {
                let pattern = Regex::new(&config.regex).map_err(|source| {
                    InvalidationGroupError::InvalidPattern {
                        pattern: config.regex.clone(),
                        source,
                    }
                })?;
                Ok(CompiledGroup {
                    pattern,
                    config: config.clone(),
                })
            })
            .collect::<Result<Vec<_>, InvalidationGroupError>>()?;

        Ok(Self { groups })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// First group whose pattern matches anywhere in `url`.
    pub fn find_group(&self, url: &str) -> Option<&InvalidationGroupConfig> {
        self.groups
            .iter()
            .find(|group| group.pattern.is_match(url))
            .map(|group| &group.config)
    }
}

/// Store key of a group's persisted state.
pub fn state_key(base_path: &str, config: &InvalidationGroupConfig) -> String {
    format!("{base_path}/{STATE_PREFIX}/{}.json", md5_hex(&config.regex))
        .trim_start_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(regex: &str, max: u32) -> InvalidationGroupConfig {
        InvalidationGroupConfig {
            regex: regex.to_string(),
            invalidation_path: "/blog/*".to_string(),
            max_access_number: max,
        }
    }

    #[test]
    fn test_find_group_first_match_unanchored() {
        let tracker =
            InvalidationGroupTracker::new(&[config("blog", 5), config("^/blog/.*", 3)]).unwrap();

        assert_eq!(tracker.find_group("/en/blog/post").map(|g| g.max_access_number), Some(5));
        assert_eq!(tracker.find_group("/blog/post").map(|g| g.max_access_number), Some(5));
        assert!(tracker.find_group("/about").is_none());
        assert!(InvalidationGroupTracker::default().find_group("/blog").is_none());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = InvalidationGroupTracker::new(&[config("(", 1)]).unwrap_err();
        assert!(err.to_string().contains("invalid invalidation group pattern ("));
    }

    #[test]
    fn test_advance_increments_below_threshold() {
        let advance = InvalidationGroup::initial(config("blog", 3)).advance();
        assert_eq!(advance.group.current_number, 1);
        assert!(!advance.invalidate);

        let advance = advance.group.advance();
        assert_eq!(advance.group.current_number, 2);
        assert!(!advance.invalidate);
    }

    #[test]
    fn test_advance_resets_at_threshold() {
        let group = InvalidationGroup {
            config: config("blog", 3),
            current_number: 2,
        };
        let advance = group.advance();
        assert_eq!(advance.group.current_number, 0);
        assert!(advance.invalidate);
    }

    #[test]
    fn test_single_access_threshold_always_invalidates() {
        let advance = InvalidationGroup::initial(config("blog", 1)).advance();
        assert!(advance.invalidate);
        assert_eq!(advance.group.current_number, 0);
    }

    #[test]
    fn test_state_shape_and_key() {
        let group = InvalidationGroup::initial(config("blog", 3));
        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "regex": "blog",
                "invalidationPath": "/blog/*",
                "maxAccessNumber": 3,
                "currentNumber": 0
            })
        );

        let key = state_key("/app", &group.config);
        assert!(key.starts_with("app/_invalidation/"));
        assert!(key.ends_with(".json"));
    }
}
