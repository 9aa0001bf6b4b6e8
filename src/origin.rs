/// Used when no trusted origins are configured.
pub const DEFAULT_TRUSTED_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginTrust {
    Trusted,
    Untrusted,
}

/// OriginPolicy
///
/// Allow-list of origins permitted to call the portal.
///
/// A request without an `Origin` header is trusted: same-origin navigations and
/// server-to-server calls routinely omit it. Only a declared origin that is not on
/// the list is treated as a violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPolicy {
    trusted: Vec<String>,
}

impl OriginPolicy {
    /// Builds the policy, falling back to `DEFAULT_TRUSTED_ORIGIN` when the
    /// configured list is empty.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut trusted: Vec<String> = origins
            .into_iter()
            .map(Into::into)
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        if trusted.is_empty() {
            trusted.push(DEFAULT_TRUSTED_ORIGIN.to_string());
        }

        Self { trusted }
    }

    /// Exact, case-sensitive match against the allow-list.
    pub fn check(&self, origin: Option<&str>) -> OriginTrust {
        match origin {
            None => OriginTrust::Trusted,
            Some(origin) if self.trusted.iter().any(|trusted| trusted == origin) => {
                OriginTrust::Trusted
            }
            Some(_) => OriginTrust::Untrusted,
        }
    }

    pub fn is_trusted(&self, origin: Option<&str>) -> bool {
        self.check(origin) == OriginTrust::Trusted
    }

    pub fn origins(&self) -> &[String] {
        &self.trusted
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}
