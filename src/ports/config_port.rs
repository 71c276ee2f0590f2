//! Configuration access port trait.

use crate::domain::error::BartableError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;

    fn require_string(&self, section: &str, key: &str) -> Result<String, BartableError> {
        self.get_string(section, key)
            .ok_or_else(|| BartableError::ConfigMissing {
                section: section.into(),
                key: key.into(),
            })
    }

    /// A count of at least `min`, defaulting when the key is absent.
    fn get_count(
        &self,
        section: &str,
        key: &str,
        default: usize,
        min: usize,
    ) -> Result<usize, BartableError> {
        let value = self.get_int(section, key, default as i64);
        usize::try_from(value)
            .ok()
            .filter(|v| *v >= min)
            .ok_or_else(|| BartableError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: format!("must be at least {min}, got {value}"),
            })
    }
}
