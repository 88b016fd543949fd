//! Source address policy

use std::net::IpAddr;

/// Refuses clients whose address text starts with one of the denied
/// prefixes (e.g. `"10."`). Empty by default, which permits everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressPolicy {
    denied_prefixes: Vec<String>,
}

impl AddressPolicy {
    pub fn new<I, S>(denied_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            denied_prefixes: denied_prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    pub fn permits(&self, addr: IpAddr) -> bool {
        if self.denied_prefixes.is_empty() {
            return true;
        }
        let text = addr.to_string();
        !self.denied_prefixes.iter().any(|prefix| text.starts_with(prefix.as_str()))
    }

    pub fn denied_prefixes(&self) -> &[String] {
        &self.denied_prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_permits_all() {
        let policy = AddressPolicy::default();
        assert!(policy.permits("10.1.2.3".parse().unwrap()));
    }

    #[test]
    fn test_denied_prefix() {
        let policy = AddressPolicy::new(["10.", ""]);
        assert_eq!(policy.denied_prefixes(), &["10.".to_string()]);
        assert!(!policy.permits("10.1.2.3".parse().unwrap()));
        assert!(policy.permits("110.1.2.3".parse().unwrap()));
        assert!(policy.permits("192.168.0.1".parse().unwrap()));
    }
}
