use std::collections::BTreeMap;

use rand::Rng;
use rand::prelude::IteratorRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Token carried by the root node.
///
/// Reserved value: it contains NUL bytes, so no tokenizer output can
/// ever collide with it.
pub(crate) const ROOT_TOKEN: &str = "\u{0}root\u{0}";

/// Handle to a node inside a [`Trie`] arena.
///
/// Ids are plain indices: cheap to copy, safe to store alongside a
/// mutable borrow of the trie, and stable for the lifetime of the trie
/// (nodes are never deleted individually; `clear` rebuilds the arena).
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct NodeId(usize);

/// A single node of the prefix tree.
///
/// Stored inside the arena and only reachable through [`Trie`] methods.
/// The parent link is a plain id, never an owning reference, and is used
/// exclusively to compute the sibling total that normalizes this node's
/// probability.
#[derive(Serialize, Deserialize, Clone, Debug)]
struct TrieNode {
	/// Token this node represents (case-sensitive, compared by exact value).
	token: String,
	/// Number of times this token was observed in this trie position.
	count: usize,
	/// Back-reference to the owning node; `None` only for the root.
	parent: Option<NodeId>,
	/// One child per distinct token value seen at this position.
	/// A `BTreeMap` keeps iteration deterministic for a fixed trie state.
	children: BTreeMap<String, NodeId>,
}

/// Arena-backed weighted prefix tree.
///
/// # Responsibilities
/// - Maintain per-token occurrence counts in context
/// - Answer child lookups and normalization denominators
/// - Select one child, uniformly or weighted by count, optionally
///   restricted by a regex filter
///
/// # Invariants
/// - Node 0 is the root and carries the reserved [`ROOT_TOKEN`]
/// - Every non-root node has a parent and a count >= 1
/// - `probability(v) == count(v) / child_count(parent(v))`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Trie {
	nodes: Vec<TrieNode>,
}

impl Trie {
	/// Creates a trie holding only the root node.
	pub fn new() -> Self {
		Self {
			nodes: vec![TrieNode {
				token: ROOT_TOKEN.to_owned(),
				count: 0,
				parent: None,
				children: BTreeMap::new(),
			}],
		}
	}

	/// Returns the id of the root node.
	pub fn root(&self) -> NodeId {
		NodeId(0)
	}

	/// Returns the token stored on `id`.
	pub fn token(&self, id: NodeId) -> &str {
		&self.nodes[id.0].token
	}

	/// Returns the occurrence count of `id`.
	pub fn count(&self, id: NodeId) -> usize {
		self.nodes[id.0].count
	}

	/// True if `id` has no children.
	pub fn is_leaf(&self, id: NodeId) -> bool {
		self.nodes[id.0].children.is_empty()
	}

	/// True if `id` is the root node.
	pub fn is_root(&self, id: NodeId) -> bool {
		self.nodes[id.0].parent.is_none()
	}

	/// Returns the child of `id` for `token`, if present. Never mutates.
	pub fn lookup<S: AsRef<str>>(&self, id: NodeId, token: S) -> Option<NodeId> {
		self.nodes[id.0].children.get(token.as_ref()).copied()
	}

	/// Iterates over the direct children of `id` as `(token, child)` pairs,
	/// in deterministic (lexicographic) order.
	pub fn children(&self, id: NodeId) -> impl Iterator<Item = (&str, NodeId)> {
		self.nodes[id.0]
			.children
			.iter()
			.map(|(token, child)| (token.as_str(), *child))
	}

	/// Returns the child of `parent` for `token`, creating it with
	/// `initial_count` if absent, else incrementing its count by 1.
	///
	/// # Notes
	/// - `initial_count` is the smoothing hook: callers pass 1 normally,
	///   2 when additive smoothing is enabled at first insertion.
	pub fn add_child(&mut self, parent: NodeId, token: &str, initial_count: usize) -> NodeId {
		if let Some(&child) = self.nodes[parent.0].children.get(token) {
			self.nodes[child.0].count += 1;
			return child;
		}
		self.insert(parent, token, initial_count)
	}

	/// Adds `amount` to the count of the child of `parent` for `token`,
	/// creating it with count `amount` if absent.
	///
	/// Used when merging tries, where counts are transferred wholesale
	/// rather than observed one occurrence at a time.
	pub(crate) fn raise_count(&mut self, parent: NodeId, token: &str, amount: usize) -> NodeId {
		if let Some(&child) = self.nodes[parent.0].children.get(token) {
			self.nodes[child.0].count += amount;
			return child;
		}
		self.insert(parent, token, amount)
	}

	fn insert(&mut self, parent: NodeId, token: &str, count: usize) -> NodeId {
		let id = NodeId(self.nodes.len());
		self.nodes.push(TrieNode {
			token: token.to_owned(),
			count,
			parent: Some(parent),
			children: BTreeMap::new(),
		});
		self.nodes[parent.0].children.insert(token.to_owned(), id);
		id
	}

	/// Sum of all direct children's counts; the normalization denominator
	/// for any one of those children. Returns 0 for a childless node.
	pub fn child_count(&self, id: NodeId) -> usize {
		self.nodes[id.0]
			.children
			.values()
			.map(|child| self.nodes[child.0].count)
			.sum()
	}

	/// Probability of `id` among its siblings:
	/// `count(id) / child_count(parent(id))`.
	///
	/// # Panics
	/// Panics when called on the root. The root is never weighted, so
	/// reaching this is a programming error, not a data condition.
	pub fn probability(&self, id: NodeId) -> f64 {
		let parent = self.nodes[id.0]
			.parent
			.expect("probability is undefined on the root node");
		self.nodes[id.0].count as f64 / self.child_count(parent) as f64
	}

	/// Selects one child of `id`, or `None` if no child matches.
	///
	/// # Parameters
	/// - `filter`: optional regex; only children whose token matches are
	///   candidates. `None` admits all children.
	/// - `probabilistic`: if true, weighted selection proportional to
	///   counts; otherwise uniform among candidates.
	/// - `rng`: the random source. A single candidate is returned without
	///   drawing from it.
	///
	/// # Panics
	/// Panics if the weighted scan runs out of candidates while selection
	/// mass remains. That would mean the counts changed mid-call, which
	/// the single-threaded contract rules out.
	pub fn select_child<R: Rng>(
		&self,
		id: NodeId,
		filter: Option<&Regex>,
		probabilistic: bool,
		rng: &mut R,
	) -> Option<NodeId> {
		let candidates: Vec<NodeId> = self.nodes[id.0]
			.children
			.values()
			.copied()
			.filter(|child| match filter {
				Some(pattern) => pattern.is_match(&self.nodes[child.0].token),
				None => true,
			})
			.collect();

		if candidates.is_empty() {
			return None;
		}
		if candidates.len() == 1 {
			return Some(candidates[0]);
		}
		if !probabilistic {
			return candidates.into_iter().choose(rng);
		}

		let total: usize = candidates.iter().map(|child| self.nodes[child.0].count).sum();
		let mut r = rng.random_range(0..total);
		for candidate in candidates {
			let count = self.nodes[candidate.0].count;
			if r < count {
				return Some(candidate);
			}
			r -= count;
		}

		unreachable!("weighted selection ran out of candidates with mass remaining");
	}
}
