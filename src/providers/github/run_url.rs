use std::str::FromStr;

use url::Url;

use crate::error::{CIDoctorError, Result};

const GITHUB_HOSTS: [&str; 2] = ["github.com", "www.github.com"];

/// Parsed `https://github.com/<owner>/<repo>/actions/runs/<id>` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRef {
    pub owner: String,
    pub repo: String,
    pub run_id: u64,
}

impl RunRef {
    /// Parses a GitHub Actions run URL. Trailing segments such as
    /// `/attempts/2` or `/job/<id>` are accepted and ignored.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| CIDoctorError::InvalidRunUrl(format!("{reason}: {input}"));

        let url = Url::parse(input.trim()).map_err(|_| invalid("not a URL"))?;

        if !url.host_str().is_some_and(|host| GITHUB_HOSTS.contains(&host)) {
            return Err(invalid("URL host is not github.com"));
        }

        let parts: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let [owner, repo, "actions", "runs", run_id, ..] = parts.as_slice() else {
            return Err(invalid("not a GitHub Actions run URL"));
        };

        let run_id = run_id
            .parse()
            .map_err(|_| invalid("run id is not a number"))?;

        Ok(Self {
            owner: (*owner).to_string(),
            repo: (*repo).to_string(),
            run_id,
        })
    }
}

impl FromStr for RunRef {
    type Err = CIDoctorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
