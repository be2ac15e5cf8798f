//! Rewrite catalog data URLs into object-storage addresses.

use std::collections::BTreeSet;

use url::Url;

/// Suffixes of gridded files the ingestion layer knows how to open.
pub const DEFAULT_SUFFIXES: &[&str] = &[".nc", ".nc4", ".hdf"];

const OBJECT_SCHEME: &str = "s3";

/// Filters catalog URLs down to readable gridded files and maps them to `s3://`.
///
/// - `s3://` entries pass through unchanged.
/// - `http(s)://host/bucket/key` becomes `s3://bucket/key`, with the key
///   copied byte for byte.
/// - Anything else, or anything without a recognized suffix, is dropped.
///
/// The output is sorted so that equal inputs always produce equal cache keys.
#[derive(Debug, Clone)]
pub struct UrlRefiner {
    suffixes: Vec<String>,
}

impl Default for UrlRefiner {
    fn default() -> Self {
        Self::with_suffixes(DEFAULT_SUFFIXES.iter().copied())
    }
}

impl UrlRefiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom suffix list (matched case-insensitively).
    pub fn with_suffixes<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn refine<I, S>(&self, urls: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter()
            .filter_map(|u| self.refine_one(u.as_ref()))
            .collect()
    }

    /// Refine a single URL; `None` means it was filtered out.
    pub fn refine_one(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();

        // Suffix test runs on the address without query string or fragment.
        let bare = raw.split(|c: char| c == '?' || c == '#').next().unwrap_or(raw);
        if !self.has_known_suffix(bare) {
            return None;
        }

        let (scheme, rest) = bare.split_once("://")?;
        match scheme.to_ascii_lowercase().as_str() {
            OBJECT_SCHEME => Some(bare.to_string()),
            "http" | "https" => {
                Url::parse(raw).ok()?.host_str()?;
                let (_host, key) = rest.split_once('/')?;
                if key.is_empty() {
                    return None;
                }
                Some(format!("{}://{}", OBJECT_SCHEME, key))
            }
            _ => None,
        }
    }

    fn has_known_suffix(&self, address: &str) -> bool {
        let lower = address.to_lowercase();
        self.suffixes.iter().any(|s| lower.ends_with(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refine_mixed_input() {
        let refiner = UrlRefiner::default();
        let out = refiner.refine(["s3://a.nc", "http://host/x/y/b.nc4", "s3://c.txt"]);

        let expected: BTreeSet<String> = ["s3://a.nc", "s3://x/y/b.nc4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_refine_empty() {
        let refiner = UrlRefiner::default();
        assert!(refiner.refine(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_podaac_protected_url() {
        let refiner = UrlRefiner::default();
        let out = refiner.refine_one(
            "https://archive.podaac.earthdata.nasa.gov/podaac-ops-cumulus-protected/MUR-JPL-L4-GLOB-v4.1/20190518-JPL.nc",
        );
        assert_eq!(
            out.as_deref(),
            Some("s3://podaac-ops-cumulus-protected/MUR-JPL-L4-GLOB-v4.1/20190518-JPL.nc")
        );
    }

    #[test]
    fn test_other_schemes_dropped() {
        let refiner = UrlRefiner::default();
        assert!(refiner.refine_one("ftp://host/data/file.nc").is_none());
        assert!(refiner.refine_one("/local/path/file.nc").is_none());
        assert!(refiner.refine_one("not a url").is_none());
    }

    #[test]
    fn test_query_string_ignored_for_suffix() {
        let refiner = UrlRefiner::default();
        assert_eq!(
            refiner.refine_one("https://host/bucket/f.HDF?token=abc").as_deref(),
            Some("s3://bucket/f.HDF")
        );
    }

    #[test]
    fn test_output_sorted_and_deduplicated() {
        let refiner = UrlRefiner::default();
        let out: Vec<_> = refiner
            .refine(["s3://b/z.nc", "https://h/b/a.nc", "s3://b/z.nc"])
            .into_iter()
            .collect();
        assert_eq!(out, vec!["s3://b/a.nc".to_string(), "s3://b/z.nc".to_string()]);
    }

    #[test]
    fn test_key_copied_verbatim() {
        let refiner = UrlRefiner::default();
        assert_eq!(
            refiner.refine_one("https://host/bucket/dir/a b.nc").as_deref(),
            Some("s3://bucket/dir/a b.nc")
        );
        assert_eq!(
            refiner.refine_one("https://host/bucket/caf%C3%A9.nc").as_deref(),
            Some("s3://bucket/caf%C3%A9.nc")
        );
        assert!(refiner.refine_one("https://host/.nc").is_some());
        assert!(refiner.refine_one("https://host.nc").is_none());
    }

    #[test]
    fn test_custom_suffixes() {
        let refiner = UrlRefiner::with_suffixes([".h5"]);
        assert!(refiner.refine_one("s3://b/f.h5").is_some());
        assert!(refiner.refine_one("s3://b/f.nc").is_none());
    }
}
