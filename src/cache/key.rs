use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Normalized identity of a logical upstream query.
///
/// Parameter names are lowercased and values trimmed; parameters with empty
/// values are dropped. Parameters live in a `BTreeMap` so two keys built from
/// the same pairs in a different order compare and hash equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    endpoint: String,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new<I, K, V>(endpoint: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let params = params
            .into_iter()
            .filter_map(|(k, v)| {
                let name = k.as_ref().trim().to_lowercase();
                let value = v.as_ref().trim();
                if name.is_empty() || value.is_empty() {
                    None
                } else {
                    Some((name, value.to_string()))
                }
            })
            .collect();

        Self {
            endpoint: endpoint.trim().trim_matches('/').to_lowercase(),
            params,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Short hex digest of the canonical form, used to correlate log lines
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.to_string().as_bytes());
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{k}={v}")?;
        }
        Ok(())
    }
}
