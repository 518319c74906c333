//! User-supplied job identifiers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// `123`, `123_4` (array task), `123+1` (heterogeneous component),
/// each optionally followed by `.step`.
static JOB_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<numeric>[0-9]+)(?P<sub>[_+][0-9]+)?(?:\.(?P<step>[A-Za-z0-9_]+))?$")
        .expect("job id regex is valid")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobIdError {
    #[error("Job id is empty")]
    Empty,
    #[error("Invalid job id {0:?}: expected a numeric id, optionally with a .step suffix")]
    Invalid(String),
}

/// A validated job id as requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId {
    raw: String,
    base: String,
    step: Option<String>,
}

impl JobId {
    pub fn parse(s: &str) -> Result<Self, JobIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(JobIdError::Empty);
        }

        let caps = JOB_ID_RE
            .captures(s)
            .ok_or_else(|| JobIdError::Invalid(s.to_string()))?;

        let base = match caps.name("sub") {
            Some(sub) => format!("{}{}", &caps["numeric"], sub.as_str()),
            None => caps["numeric"].to_string(),
        };

        Ok(Self {
            raw: s.to_string(),
            base,
            step: caps.name("step").map(|m| m.as_str().to_string()),
        })
    }

    /// The id exactly as requested, including any step suffix.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Job part without the step suffix (`123_4.batch` → `123_4`).
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn step(&self) -> Option<&str> {
        self.step.as_deref()
    }

    /// Step ids whose live stats describe this request.
    ///
    /// sstat on a bare job id leaves out the batch step, so a whole-job
    /// request asks for both.
    pub fn live_stat_ids(&self) -> Vec<String> {
        match self.step {
            Some(_) => vec![self.raw.clone()],
            None => vec![self.base.clone(), format!("{}.batch", self.base)],
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
