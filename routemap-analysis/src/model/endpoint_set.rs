//! De-duplicating endpoint accumulator.
//!
//! Workers build per-file vectors independently; the driver merges them here
//! (partitioned append + merge), so no locking is needed during extraction.

use routemap_core::types::collections::FxHashSet;

use super::endpoint::{Endpoint, EndpointKey};
use super::http_method::HttpMethod;

#[derive(Debug, Clone, Default)]
pub struct EndpointSet {
    endpoints: Vec<Endpoint>,
    keys: FxHashSet<EndpointKey>,
}

impl EndpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an endpoint, dropping any combination already present.
    ///
    /// If the primary is a duplicate but some variants are new, the first new
    /// variant becomes the primary. Returns whether anything was added.
    pub fn insert(&mut self, mut endpoint: Endpoint) -> bool {
        let variants = std::mem::take(&mut endpoint.variants);
        let mut fresh: Vec<Endpoint> = Vec::with_capacity(variants.len() + 1);
        for candidate in std::iter::once(endpoint).chain(variants) {
            if self.keys.insert(candidate.key()) {
                fresh.push(candidate);
            }
        }
        let mut fresh = fresh.into_iter();
        match fresh.next() {
            Some(mut primary) => {
                primary.variants = fresh.collect();
                self.endpoints.push(primary);
                true
            }
            None => false,
        }
    }

    pub fn extend<I: IntoIterator<Item = Endpoint>>(&mut self, endpoints: I) {
        for endpoint in endpoints {
            self.insert(endpoint);
        }
    }

    pub fn merge(&mut self, other: EndpointSet) {
        self.extend(other.endpoints);
    }

    pub fn contains(&self, key: &EndpointKey) -> bool {
        self.keys.contains(key)
    }

    /// Number of primary endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Number of endpoints including variants.
    pub fn variant_count(&self) -> usize {
        self.keys.len()
    }

    /// One representative endpoint per declaration site.
    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }

    /// Every declared method/path combination.
    pub fn iter_all(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().flat_map(|e| e.all_variants())
    }

    /// Endpoints whose template matches `url`, optionally restricted to a method.
    pub fn find_matching(&self, url: &str, method: Option<HttpMethod>) -> Vec<&Endpoint> {
        self.iter_all()
            .filter(|e| method.map_or(true, |m| e.http_method == m))
            .filter(|e| e.matches_path(url))
            .collect()
    }

    /// Endpoints declared in `relative_file` whose line range covers `line`.
    pub fn find_by_location(&self, relative_file: &str, line: u32) -> Vec<&Endpoint> {
        self.iter()
            .filter(|e| e.relative_file_path == relative_file && e.contains_line(line))
            .collect()
    }

    /// Primaries sorted by file, line, path and method.
    pub fn into_sorted_vec(self) -> Vec<Endpoint> {
        let mut endpoints = self.endpoints;
        endpoints.sort_by(|a, b| {
            (&a.relative_file_path, a.start_line, &a.path_template, a.http_method).cmp(&(
                &b.relative_file_path,
                b.start_line,
                &b.path_template,
                b.http_method,
            ))
        });
        endpoints
    }
}

impl FromIterator<Endpoint> for EndpointSet {
    fn from_iter<I: IntoIterator<Item = Endpoint>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::endpoint::test_endpoint;

    #[test]
    fn test_duplicate_dropped() {
        let mut set = EndpointSet::new();
        assert!(set.insert(test_endpoint("/users", HttpMethod::Get)));
        assert!(!set.insert(test_endpoint("/users", HttpMethod::Get)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_new_variant_promoted() {
        let mut set = EndpointSet::new();
        set.insert(test_endpoint("/users", HttpMethod::Get));

        let mut second = test_endpoint("/users", HttpMethod::Get);
        second.add_variant(test_endpoint("/users", HttpMethod::Post));
        assert!(set.insert(second));

        assert_eq!(set.len(), 2);
        assert_eq!(set.variant_count(), 2);
        let promoted = set.iter().nth(1).unwrap();
        assert_eq!(promoted.http_method, HttpMethod::Post);
        assert!(promoted.variants.is_empty());
    }

    #[test]
    fn test_find_matching() {
        let mut primary = test_endpoint("/users/{id}", HttpMethod::Get);
        primary.add_variant(test_endpoint("/users/{id}", HttpMethod::Delete));
        let set: EndpointSet = [primary, test_endpoint("/users", HttpMethod::Get)]
            .into_iter()
            .collect();

        assert_eq!(set.find_matching("/users/7", None).len(), 2);
        let deletes = set.find_matching("/users/7", Some(HttpMethod::Delete));
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].http_method, HttpMethod::Delete);
        assert!(set.find_matching("/orders", None).is_empty());
    }

    #[test]
    fn test_merge_and_sort() {
        let mut a = EndpointSet::new();
        let mut late = test_endpoint("/b", HttpMethod::Get);
        late.start_line = 50;
        a.insert(late);
        let mut b = EndpointSet::new();
        b.insert(test_endpoint("/a", HttpMethod::Get));
        a.merge(b);
        let sorted = a.into_sorted_vec();
        assert_eq!(sorted[0].path_template, "/a");
        assert_eq!(sorted[1].path_template, "/b");
    }
}
