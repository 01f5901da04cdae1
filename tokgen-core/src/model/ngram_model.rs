use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use serde::{Deserialize, Serialize};

use super::trie::{NodeId, Trie};

/// Reserved token marking the end of an input stream.
///
/// Inserted into the trie like any other token when a sliding window runs
/// past the end of the input; descent never continues below it. Contains
/// NUL bytes so it can never collide with a real token.
pub const END_TOKEN: &str = "\u{0}end\u{0}";

/// Token-level n-gram model over a weighted prefix tree.
///
/// The model ingests pre-tokenized sequences of strings (tokenization is a
/// collaborator's job) and answers probability, completion, and generation
/// queries over the observed n-grams.
///
/// # Responsibilities
/// - Accumulate sliding-window token counts into the trie (`load`)
/// - Resolve bounded-length contexts to trie nodes
/// - Answer probability and completion queries
/// - Merge with another model of the same configuration
///
/// # Invariants
/// - `order` is >= 1 and fixed at construction
/// - Every lookup path is at most `order` tokens deep
/// - Loading is incremental and additive; nodes are never removed
///   individually (`clear` discards the whole tree)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NgramModel {
	/// Maximum depth of any path from the root (context length + 1).
	order: usize,
	/// If true, newly created nodes start at count 2 instead of 1.
	///
	/// This is a local, non-renormalized bias applied only at first
	/// insertion, not a true additive-smoothing scheme over the full
	/// vocabulary. Repeat occurrences still increment by 1.
	smoothing: bool,
	pub(crate) trie: Trie,
}

impl NgramModel {
	/// Creates an empty model of the given order, without smoothing.
	///
	/// # Errors
	/// Returns an error if `order < 1`.
	pub fn new(order: usize) -> Result<Self, String> {
		Self::with_options(order, false)
	}

	/// Creates an empty model of the given order with smoothing enabled.
	///
	/// # Errors
	/// Returns an error if `order < 1`.
	pub fn with_smoothing(order: usize) -> Result<Self, String> {
		Self::with_options(order, true)
	}

	fn with_options(order: usize, smoothing: bool) -> Result<Self, String> {
		if order < 1 {
			return Err("Order must be >= 1".to_owned());
		}
		Ok(Self { order, smoothing, trie: Trie::new() })
	}

	/// Returns the configured order.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Returns whether smoothing was enabled at construction.
	pub fn smoothing(&self) -> bool {
		self.smoothing
	}

	/// True if nothing has been loaded since construction or `clear`.
	pub fn is_empty(&self) -> bool {
		self.trie.is_leaf(self.trie.root())
	}

	/// Loads one pre-tokenized sequence with weight 1.
	pub fn load<S: AsRef<str>>(&mut self, tokens: &[S]) {
		self.load_weighted(tokens, 1);
	}

	/// Loads one pre-tokenized sequence, repeating the insertion
	/// `multiplier` times to bias this input's influence on the counts.
	///
	/// For every start position a window of `order` tokens is inserted;
	/// positions past the end of the input fill with [`END_TOKEN`], and
	/// descent stops once the current node carries the sentinel (the rest
	/// of that window is not recorded). The sliding window means every
	/// suffix of every window is represented at some depth, so queries
	/// work for any context length up to `order - 1`.
	///
	/// A `multiplier` of 0 leaves the model unchanged.
	pub fn load_weighted<S: AsRef<str>>(&mut self, tokens: &[S], multiplier: usize) {
		let initial_count = if self.smoothing { 2 } else { 1 };
		for _ in 0..multiplier {
			for k in 0..tokens.len() {
				let mut node = self.trie.root();
				for j in 0..self.order {
					if self.trie.token(node) == END_TOKEN {
						break;
					}
					let token = tokens
						.get(k + j)
						.map(|t| t.as_ref())
						.unwrap_or(END_TOKEN);
					node = self.trie.add_child(node, token, initial_count);
				}
			}
		}
	}

	/// Discards all loaded data, keeping order and smoothing settings.
	pub fn clear(&mut self) {
		self.trie = Trie::new();
	}

	/// Resolves `path` to a trie node, keeping only the trailing `limit`
	/// tokens. Any miss along the way yields `None` (no partial matches).
	/// The empty path resolves to the root.
	pub(crate) fn resolve<S: AsRef<str>>(&self, path: &[S], limit: usize) -> Option<NodeId> {
		let skip = path.len().saturating_sub(limit);
		let mut node = self.trie.root();
		for token in &path[skip..] {
			node = self.trie.lookup(node, token.as_ref())?;
		}
		Some(node)
	}

	/// Probability of the final token of `path` given the tokens before it.
	///
	/// A single-token path yields that token's probability among the
	/// root's children. Paths longer than the order keep only the trailing
	/// `order` tokens. Returns 0.0 for an empty or unresolvable path.
	pub fn probability<S: AsRef<str>>(&self, path: &[S]) -> f64 {
		if path.is_empty() {
			return 0.0;
		}
		match self.resolve(path, self.order) {
			Some(node) => self.trie.probability(node),
			None => 0.0,
		}
	}

	/// Distribution over the tokens that can follow `path`.
	///
	/// `path` is truncated to the trailing `order - 1` tokens. The map
	/// includes the end-of-stream sentinel when observed, so the values
	/// sum to 1 whenever the context has at least one child. Empty map if
	/// the path cannot be resolved.
	pub fn probabilities<S: AsRef<str>>(&self, path: &[S]) -> HashMap<String, f64> {
		let mut out = HashMap::new();
		if let Some(node) = self.resolve(path, self.order.saturating_sub(1)) {
			let denominator = self.trie.child_count(node);
			if denominator > 0 {
				for (token, child) in self.trie.children(node) {
					out.insert(
						token.to_owned(),
						self.trie.count(child) as f64 / denominator as f64,
					);
				}
			}
		}
		out
	}

	/// Tokens producible after `pre`, ordered by descending probability.
	///
	/// Ties keep the deterministic child order, so the result is stable
	/// for a fixed trie state. The end-of-stream sentinel is never a
	/// producible token and is excluded. Empty list if `pre` cannot be
	/// resolved.
	pub fn completions<S: AsRef<str>>(&self, pre: &[S]) -> Vec<String> {
		let Some(node) = self.resolve(pre, self.order.saturating_sub(1)) else {
			return Vec::new();
		};
		let mut scored: Vec<(String, usize)> = self
			.trie
			.children(node)
			.filter(|(token, _)| *token != END_TOKEN)
			.map(|(token, child)| (token.to_owned(), self.trie.count(child)))
			.collect();
		// Stable sort: equal counts keep lexicographic child order
		scored.sort_by(|a, b| b.1.cmp(&a.1));
		scored.into_iter().map(|(token, _)| token).collect()
	}

	/// Tokens `w` such that `pre + [w] + post` resolves in the trie,
	/// in deterministic child order.
	///
	/// # Errors
	/// Returns an error when `pre.len() + post.len() >= order`: the middle
	/// slot would not be representable at the configured order, and
	/// silently truncating would answer a different question.
	pub fn completions_between<S: AsRef<str>, T: AsRef<str>>(
		&self,
		pre: &[S],
		post: &[T],
	) -> Result<Vec<String>, String> {
		if pre.len() + post.len() >= self.order {
			return Err(format!(
				"pre + post must be shorter than the order ({} + {} >= {})",
				pre.len(),
				post.len(),
				self.order
			));
		}
		let Some(node) = self.resolve(pre, self.order - 1) else {
			return Ok(Vec::new());
		};

		let mut out = Vec::new();
		'child: for (token, child) in self.trie.children(node) {
			if token == END_TOKEN {
				continue;
			}
			let mut current = child;
			for t in post {
				match self.trie.lookup(current, t.as_ref()) {
					Some(next) => current = next,
					None => continue 'child,
				}
			}
			out.push(token.to_owned());
		}
		Ok(out)
	}

	/// Merges another model into this one by summing counts node-by-node.
	///
	/// # Notes
	/// - Both models must share the same order and smoothing flag.
	/// - Counts are summed verbatim. With smoothing enabled, each side
	///   carries its own first-insertion bias, so merged counts are not
	///   identical to loading both inputs into one model.
	///
	/// # Errors
	/// Returns an error on an order or smoothing mismatch.
	pub fn merge(&mut self, other: &Self) -> Result<(), String> {
		if self.order != other.order {
			return Err("Order mismatch".to_owned());
		}
		if self.smoothing != other.smoothing {
			return Err("Smoothing mismatch".to_owned());
		}

		let mut pending = vec![(self.trie.root(), other.trie.root())];
		while let Some((mine, theirs)) = pending.pop() {
			for (token, their_child) in other.trie.children(theirs) {
				let my_child =
					self.trie
						.raise_count(mine, token, other.trie.count(their_child));
				pending.push((my_child, their_child));
			}
		}
		Ok(())
	}

	/// Builds a model from a batch of pre-tokenized sequences using one
	/// thread per chunk, then merges the partial models.
	///
	/// # Notes
	/// - Chunk count is derived from the CPU count; each thread loads its
	///   sequences into a private model, sent back over an mpsc channel.
	/// - `unwrap()` on the partial constructor is safe: the order was
	///   already validated when building the final model.
	///
	/// # Errors
	/// Returns an error if `order < 1`.
	pub fn from_sequences_parallel(
		order: usize,
		smoothing: bool,
		sequences: Vec<Vec<String>>,
	) -> Result<Self, String> {
		let mut model = Self::with_options(order, smoothing)?;
		if sequences.is_empty() {
			return Ok(model);
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = ((sequences.len() + chunks - 1) / chunks).max(1);

		let (tx, rx) = mpsc::channel();
		for chunk in sequences.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<Vec<String>> = chunk.to_vec();

			thread::spawn(move || {
				let mut partial = NgramModel::with_options(order, smoothing).unwrap();
				for sequence in chunk {
					partial.load(&sequence);
				}
				tx.send(partial).expect("Failed to send from thread");
			});
		}
		drop(tx);

		for partial in rx.iter() {
			model.merge(&partial)?;
		}
		Ok(model)
	}

	/// Serializes the model to a compact postcard byte vector.
	pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
		postcard::to_stdvec(self).map_err(|e| e.to_string())
	}

	/// Deserializes a model previously produced by [`Self::to_bytes`].
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
		postcard::from_bytes(bytes).map_err(|e| e.to_string())
	}

	/// Writes the serialized model to `path`.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
		let bytes = postcard::to_stdvec(self)?;
		std::fs::write(path, bytes)?;
		Ok(())
	}

	/// Reads a model previously written by [`Self::save`].
	pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
		let bytes = std::fs::read(path)?;
		Ok(postcard::from_bytes(&bytes)?)
	}
}
