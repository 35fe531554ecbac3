use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

/// One trie state: success transitions, failure link, output set
///
/// States live in an arena and refer to each other by index, which keeps
/// the structure serializable. Index 0 is the root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TrieNode {
    success: HashMap<char, usize>,
    failure: usize,
    emits: HashSet<String>,
}

/// Aho-Corasick multi-pattern matching automaton
///
/// Built once from a fixed pattern list; immutable and safe to share
/// read-only across concurrent searches afterwards. The automaton can be
/// persisted to disk and reloaded to skip rebuild cost across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcAutomaton {
    nodes: Vec<TrieNode>,
}

impl AcAutomaton {
    /// Builds the automaton: trie insertion, then breadth-first failure
    /// links with output-set propagation so nested and overlapping matches
    /// all surface in one scan.
    pub fn build<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut automaton = Self {
            nodes: vec![TrieNode::default()],
        };
        for pattern in patterns {
            automaton.insert(pattern.as_ref());
        }
        automaton.create_fail_path();
        automaton
    }

    fn insert(&mut self, pattern: &str) {
        let mut current = 0;
        for character in pattern.chars() {
            current = match self.nodes[current].success.get(&character) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[current].success.insert(character, next);
                    next
                }
            };
        }
        self.nodes[current].emits.insert(pattern.to_string());
    }

    fn create_fail_path(&mut self) {
        let mut queue: VecDeque<usize> = VecDeque::new();
        let roots: Vec<usize> = self.nodes[0].success.values().copied().collect();
        for node in roots {
            self.nodes[node].failure = 0;
            queue.push_back(node);
        }
        while let Some(current) = queue.pop_front() {
            let children: Vec<(char, usize)> = self.nodes[current]
                .success
                .iter()
                .map(|(&c, &n)| (c, n))
                .collect();
            for (character, child) in children {
                queue.push_back(child);
                let mut fallback = self.nodes[current].failure;
                let failure = loop {
                    if let Some(&next) = self.nodes[fallback].success.get(&character) {
                        break next;
                    }
                    if fallback == 0 {
                        break 0;
                    }
                    fallback = self.nodes[fallback].failure;
                };
                self.nodes[child].failure = failure;
                if !self.nodes[failure].emits.is_empty() {
                    let inherited = self.nodes[failure].emits.clone();
                    self.nodes[child].emits.extend(inherited);
                }
            }
        }
    }

    /// Scans `text` left to right and returns every pattern that occurs
    ///
    /// Single pass: success transitions advance the state, failure links
    /// back off when no transition exists. O(len(text) + matches).
    pub fn search(&self, text: &str) -> HashSet<String> {
        let mut result = HashSet::new();
        let mut state = 0;
        for character in text.chars() {
            loop {
                if let Some(&next) = self.nodes[state].success.get(&character) {
                    state = next;
                    break;
                }
                if state == 0 {
                    break;
                }
                state = self.nodes[state].failure;
            }
            if !self.nodes[state].emits.is_empty() {
                result.extend(self.nodes[state].emits.iter().cloned());
            }
        }
        result
    }

    /// Persists the automaton so later runs can skip construction
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let data = serde_json::to_vec(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, data)
    }

    /// Loads a previously saved automaton; `None` when the file is absent
    /// or unreadable, in which case the caller rebuilds from patterns
    pub fn load(path: &Path) -> Option<Self> {
        let data = std::fs::read(path).ok()?;
        serde_json::from_slice(&data).ok()
    }

    /// Loads from `path` when possible, otherwise builds fresh and saves
    pub fn load_or_build<S: AsRef<str>>(patterns: &[S], path: &Path) -> Self {
        if let Some(automaton) = Self::load(path) {
            return automaton;
        }
        let automaton = Self::build(patterns);
        if let Err(e) = automaton.save(path) {
            tracing::warn!("Failed to persist automaton to {}: {}", path.display(), e);
        }
        automaton
    }
}
