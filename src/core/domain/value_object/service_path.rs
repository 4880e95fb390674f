/// Path of the Web Services root on the Director.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePath(String);

impl ServicePath {
    /// Where GridServer publishes its admin web services.
    pub const DEFAULT: &'static str = "/livecluster/webservices";

    /// Normalizes a user supplied path.
    ///
    /// An empty path, `/` and a bare `livecluster` all map to the default
    /// path; anything else only loses its trailing slashes.
    pub fn clean(path: &str) -> Self {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() || trimmed == "livecluster" {
            return Self(Self::DEFAULT.to_string());
        }
        Self(path.trim_end_matches('/').to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path() {
        let cases = [
            ("/livecluster/webservices", "/livecluster/webservices"),
            ("/livecluster/webservices/", "/livecluster/webservices"),
            ("/", "/livecluster/webservices"),
            ("", "/livecluster/webservices"),
            ("/livecluster", "/livecluster/webservices"),
            ("/livecluster/", "/livecluster/webservices"),
            ("/proxy", "/proxy"),
            ("/proxy/", "/proxy"),
            ("/proxy//", "/proxy"),
        ];

        for (input, expected) in cases {
            assert_eq!(ServicePath::clean(input).as_str(), expected, "input {:?}", input);
        }
    }
}
