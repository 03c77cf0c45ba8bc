//! Application-level configuration constants.

// Navigation defaults
pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_VIEW: &str = "versions";
pub const HOME_TITLE: &str = "Exercism: Track maintenance tool - Select your track";

// Remote data
pub const ORGANISATION: &str = "exercism";
pub const PROBLEM_SPECIFICATIONS: &str = "problem-specifications";
pub const RAW_BASE_URL: &str = "https://raw.githubusercontent.com";
pub const API_BASE_URL: &str = "https://api.github.com";
pub const HTML_BASE_URL: &str = "https://github.com";
pub const TRACK_REPOSITORY_BRANCH: &str = "main";
pub const PROBE_DEFAULT_BRANCH: &str = "master";
pub const REQUEST_TIMEOUT_MS: u32 = 15_000;

// Derived data thresholds
pub const MINIMUM_STUB_LENGTH: usize = 1;
pub const TOPIC_DISTANCE_THRESHOLD: usize = 5;

// Substituted for a cross-reference the track does not configure
pub const MISSING_PLACEHOLDER: &str = "{}";

pub const LOG_LEVEL: log::Level = log::Level::Debug;

/// Hosts and repository coordinates used to build every remote URL.
///
/// The defaults point at GitHub; tests swap in fake hosts so the
/// [`crate::transport::Transport`] can be matched on exact URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Raw file delivery, e.g. `https://raw.githubusercontent.com`
    pub raw_base: String,
    /// REST API root, e.g. `https://api.github.com`
    pub api_base: String,
    /// Human-facing repository browser
    pub html_base: String,
    pub organisation: String,
    pub problem_specifications: String,
    /// Branch of the track repositories that config and stubs are read from
    pub track_branch: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            raw_base: RAW_BASE_URL.to_string(),
            api_base: API_BASE_URL.to_string(),
            html_base: HTML_BASE_URL.to_string(),
            organisation: ORGANISATION.to_string(),
            problem_specifications: PROBLEM_SPECIFICATIONS.to_string(),
            track_branch: TRACK_REPOSITORY_BRANCH.to_string(),
        }
    }
}

impl Endpoints {
    /// Raw URL of `path` inside `repository` at `branch`.
    pub fn raw(&self, repository: &str, branch: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base, self.organisation, repository, branch, path
        )
    }

    /// Repository browser URL of `path` inside `repository` at `branch`.
    pub fn blob(&self, repository: &str, branch: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/blob/{}/{}",
            self.html_base, self.organisation, repository, branch, path
        )
    }

    /// Directory listing of the problem specifications root at `reference`.
    pub fn spec_contents(&self, reference: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents?ref={}",
            self.api_base, self.organisation, self.problem_specifications, reference
        )
    }

    pub fn spec_raw(&self, reference: &str, path: &str) -> String {
        self.raw(&self.problem_specifications, reference, path)
    }

    pub fn track_raw(&self, track_id: &str, path: &str) -> String {
        self.raw(track_id, &self.track_branch, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoints_build_github_urls() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.track_raw("ruby", "config.json"),
            "https://raw.githubusercontent.com/exercism/ruby/main/config.json"
        );
        assert_eq!(
            endpoints.spec_contents("master"),
            "https://api.github.com/repos/exercism/problem-specifications/contents?ref=master"
        );
        assert_eq!(
            endpoints.blob("ruby-analyzer", "master", "Dockerfile"),
            "https://github.com/exercism/ruby-analyzer/blob/master/Dockerfile"
        );
    }
}
