//! Prefix index over coin names and symbols
//!
//! A character trie keyed by lowercased names and ticker symbols. Each
//! generation is built single-threaded by the index builder, then frozen and
//! shared behind an `Arc`; readers never observe a partially built trie.
//!
//! `insert` is O(|key|) and `search` is O(|prefix| + nodes visited in the
//! matching subtree), so lookups stay cheap regardless of how many coins are
//! indexed.

use std::collections::BTreeMap;

use crate::types::CoinSummary;

#[derive(Debug, Default)]
struct TrieNode {
    /// Children ordered by character, giving searches a deterministic
    /// traversal order across generations.
    children: BTreeMap<char, TrieNode>,
    terminal: bool,
    entries: Vec<CoinSummary>,
}

/// One immutable generation of the search index
#[derive(Debug, Default)]
pub struct PrefixIndex {
    root: TrieNode,
    entry_count: usize,
}

impl PrefixIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a summary under the lowercased key
    ///
    /// Duplicate keys append; the same summary may legitimately appear under
    /// both its name and its symbol. An empty key appends to the root's
    /// entry list, which only `search("")` can observe.
    pub fn insert(&mut self, key: &str, summary: CoinSummary) {
        let mut node = &mut self.root;
        for ch in key.to_lowercase().chars() {
            node = node.children.entry(ch).or_default();
        }
        node.terminal = true;
        node.entries.push(summary);
        self.entry_count += 1;
    }

    /// Returns up to `limit` summaries whose key starts with `prefix`
    ///
    /// Matching is case-insensitive. Results are collected depth-first in
    /// character order, so a fixed insert sequence always produces the same
    /// output. A prefix with no matching path yields an empty vec; an empty
    /// prefix yields only entries inserted under the empty key. Non-positive
    /// limits are clamped to 1.
    pub fn search(&self, prefix: &str, limit: usize) -> Vec<CoinSummary> {
        let limit = limit.max(1);
        let lowered = prefix.to_lowercase();

        if lowered.is_empty() {
            return self.root.entries.iter().take(limit).cloned().collect();
        }

        let mut node = &self.root;
        for ch in lowered.chars() {
            match node.children.get(&ch) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }

        let mut results = Vec::new();
        collect(node, limit, &mut results);
        results
    }

    /// Total number of insertions in this generation
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

fn collect(node: &TrieNode, limit: usize, out: &mut Vec<CoinSummary>) {
    if node.terminal {
        for entry in &node.entries {
            if out.len() >= limit {
                return;
            }
            out.push(entry.clone());
        }
    }

    for child in node.children.values() {
        if out.len() >= limit {
            return;
        }
        collect(child, limit, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::summary;

    fn index_with(entries: &[(&str, CoinSummary)]) -> PrefixIndex {
        let mut index = PrefixIndex::new();
        for (key, data) in entries {
            index.insert(key, data.clone());
        }
        index
    }

    #[test]
    fn finds_by_name_and_symbol_prefix() {
        let bitcoin = summary("bitcoin", "Bitcoin", "btc");
        let index = index_with(&[("Bitcoin", bitcoin.clone()), ("BTC", bitcoin.clone())]);

        let by_name = index.search("bit", 10);
        assert_eq!(by_name, vec![bitcoin.clone()]);

        let by_symbol = index.search("bt", 10);
        assert_eq!(by_symbol, vec![bitcoin]);

        assert!(index.search("xyz", 10).is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let eth = summary("ethereum", "Ethereum", "eth");
        let index = index_with(&[("Ethereum", eth.clone())]);

        assert_eq!(index.search("ETH", 10), vec![eth.clone()]);
        assert_eq!(index.search("eThEr", 10), vec![eth]);
    }

    #[test]
    fn limit_caps_results() {
        let mut index = PrefixIndex::new();
        for i in 0..20 {
            index.insert(
                &format!("doge{i}"),
                summary(&format!("doge{i}"), "Doge", "dg"),
            );
        }

        assert_eq!(index.search("doge", 5).len(), 5);
        assert_eq!(index.search("doge", 100).len(), 20);
        // non-positive limits are clamped to a single result
        assert_eq!(index.search("doge", 0).len(), 1);
    }

    #[test]
    fn returns_all_matches_under_limit() {
        let a = summary("a", "Cardano", "ada");
        let b = summary("b", "Cartesi", "ctsi");
        let index = index_with(&[("Cardano", a.clone()), ("Cartesi", b.clone())]);

        let results = index.search("car", 10);
        assert_eq!(results.len(), 2);
        assert!(results.contains(&a));
        assert!(results.contains(&b));
    }

    #[test]
    fn search_order_is_deterministic() {
        let entries = [
            ("Bitcoin", summary("bitcoin", "Bitcoin", "btc")),
            ("Bitcoin Cash", summary("bitcoin-cash", "Bitcoin Cash", "bch")),
            ("BitTorrent", summary("bittorrent", "BitTorrent", "btt")),
        ];
        let first = index_with(&entries);
        let second = index_with(&entries);

        assert_eq!(first.search("bit", 10), second.search("bit", 10));
    }

    #[test]
    fn empty_prefix_only_sees_empty_key_inserts() {
        let btc = summary("bitcoin", "Bitcoin", "btc");
        let index = index_with(&[("Bitcoin", btc)]);
        assert!(index.search("", 10).is_empty());

        let rooted = summary("root", "Root", "rt");
        let index = index_with(&[("", rooted.clone())]);
        assert_eq!(index.search("", 10), vec![rooted]);
    }

    #[test]
    fn counts_every_insertion() {
        let btc = summary("bitcoin", "Bitcoin", "btc");
        let mut index = PrefixIndex::new();
        index.insert("Bitcoin", btc.clone());
        index.insert("BTC", btc);

        assert_eq!(index.entry_count(), 2);
        assert!(!index.is_empty());
        assert!(PrefixIndex::new().is_empty());
    }

    #[test]
    fn duplicate_keys_append_in_insert_order() {
        let one = summary("one", "Same", "s1");
        let two = summary("two", "Same", "s2");
        let index = index_with(&[("Same", one.clone()), ("Same", two.clone())]);

        assert_eq!(index.search("same", 10), vec![one, two]);
    }
}
