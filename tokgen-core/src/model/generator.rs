use rand::Rng;
use regex::Regex;

use super::ngram_model::{END_TOKEN, NgramModel};

/// Upper bound on whole-sequence attempts before a generation call gives
/// up and returns its best partial result.
pub const MAX_ATTEMPTS: usize = 500;

/// Default minimum length for [`NgramModel::generate_until`].
pub const DEFAULT_MIN_LENGTH: usize = 1;

/// Default maximum length for [`NgramModel::generate_until`].
pub const DEFAULT_MAX_LENGTH: usize = 99;

/// Outcome of a generation call.
///
/// Generation over a sparse trie can legitimately fail to satisfy a
/// request, so exhaustion is an in-band result rather than an error:
/// callers treat an [`Exhausted`](Self::Exhausted) sequence as best-effort
/// output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationResult {
	/// The request was satisfied; the sequence is exactly as asked.
	Complete(Vec<String>),
	/// The attempt cap was reached; holds the longest partial sequence
	/// produced across all attempts (possibly empty).
	Exhausted(Vec<String>),
}

impl GenerationResult {
	/// The generated tokens, complete or not.
	pub fn tokens(&self) -> &[String] {
		match self {
			Self::Complete(tokens) | Self::Exhausted(tokens) => tokens,
		}
	}

	/// Consumes the result, returning the generated tokens.
	pub fn into_tokens(self) -> Vec<String> {
		match self {
			Self::Complete(tokens) | Self::Exhausted(tokens) => tokens,
		}
	}

	/// True if the request was fully satisfied.
	pub fn is_complete(&self) -> bool {
		matches!(self, Self::Complete(_))
	}
}

impl NgramModel {
	/// Weighted-selects the next token after `so_far`, using the trailing
	/// `order - 1` tokens as context.
	///
	/// `None` is a dead end: the context does not resolve, the context
	/// node has no children, or the draw landed on the end-of-stream
	/// sentinel.
	fn next_token<R: Rng>(&self, so_far: &[String], rng: &mut R) -> Option<String> {
		let context = self.resolve(so_far, self.order().saturating_sub(1))?;
		let child = self.trie.select_child(context, None, true, rng)?;
		let token = self.trie.token(child);
		if token == END_TOKEN {
			return None;
		}
		Some(token.to_owned())
	}

	/// One whole-sequence attempt: grow token by token until
	/// `target_length` is reached (`Ok`) or a dead end discards the
	/// attempt (`Err` with the partial sequence, for diagnostics).
	fn attempt_tokens<R: Rng>(
		&self,
		target_length: usize,
		rng: &mut R,
	) -> Result<Vec<String>, Vec<String>> {
		let mut tokens = Vec::with_capacity(target_length);
		while tokens.len() < target_length {
			match self.next_token(&tokens, rng) {
				Some(token) => tokens.push(token),
				None => return Err(tokens),
			}
		}
		Ok(tokens)
	}

	/// Generates exactly `target_length` tokens by probabilistic traversal
	/// of the trie, drawing from the process-wide random source.
	///
	/// See [`Self::generate_tokens_with`].
	pub fn generate_tokens(&self, target_length: usize) -> GenerationResult {
		self.generate_tokens_with(target_length, &mut rand::rng())
	}

	/// Generates exactly `target_length` tokens using the supplied random
	/// source.
	///
	/// Each attempt starts from a weighted pick among the root's children
	/// and extends on the trailing `order - 1` tokens of context. A dead
	/// end (unresolvable context, childless node, or the end-of-stream
	/// boundary) discards the whole partial sequence and retries from
	/// scratch, up to [`MAX_ATTEMPTS`] times.
	///
	/// Exhausting the cap is non-fatal: the longest partial sequence is
	/// returned as [`GenerationResult::Exhausted`] and a warning is
	/// logged. Never returns more than `target_length` tokens.
	pub fn generate_tokens_with<R: Rng>(
		&self,
		target_length: usize,
		rng: &mut R,
	) -> GenerationResult {
		let mut best: Vec<String> = Vec::new();
		for _ in 0..MAX_ATTEMPTS {
			match self.attempt_tokens(target_length, rng) {
				Ok(tokens) => return GenerationResult::Complete(tokens),
				Err(partial) => {
					if partial.len() > best.len() {
						best = partial;
					}
				}
			}
		}
		log::warn!(
			"generation gave up after {} attempts: produced {} of {} tokens",
			MAX_ATTEMPTS,
			best.len(),
			target_length
		);
		GenerationResult::Exhausted(best)
	}

	/// Generates tokens until one matches `pattern`, drawing from the
	/// process-wide random source.
	///
	/// See [`Self::generate_until_with`].
	pub fn generate_until(
		&self,
		pattern: &Regex,
		min_length: usize,
		max_length: usize,
	) -> GenerationResult {
		self.generate_until_with(pattern, min_length, max_length, &mut rand::rng())
	}

	/// Generates at least `min_length` tokens, then keeps extending one
	/// token at a time until the latest token matches `pattern` (success,
	/// inclusive of the matching token) or `max_length` is reached
	/// (attempt failed). A dead end anywhere aborts the entire attempt,
	/// not just the extension.
	///
	/// Bounded by [`MAX_ATTEMPTS`] whole-sequence attempts; exhaustion is
	/// non-fatal and returns the longest partial sequence, with a logged
	/// warning. A `min_length` of 0 is treated as 1.
	pub fn generate_until_with<R: Rng>(
		&self,
		pattern: &Regex,
		min_length: usize,
		max_length: usize,
		rng: &mut R,
	) -> GenerationResult {
		let min_length = min_length.max(1);
		let mut best: Vec<String> = Vec::new();
		for _ in 0..MAX_ATTEMPTS {
			let mut tokens = match self.attempt_tokens(min_length, rng) {
				Ok(tokens) => tokens,
				Err(partial) => {
					if partial.len() > best.len() {
						best = partial;
					}
					continue;
				}
			};

			loop {
				// min_length >= 1, so there is always a latest token
				let latest = tokens.last().map(String::as_str).unwrap_or_default();
				if pattern.is_match(latest) {
					return GenerationResult::Complete(tokens);
				}
				if tokens.len() >= max_length {
					break;
				}
				match self.next_token(&tokens, rng) {
					Some(token) => tokens.push(token),
					None => break,
				}
			}

			if tokens.len() > best.len() {
				best = tokens;
			}
		}
		log::warn!(
			"generation gave up after {} attempts without matching {}",
			MAX_ATTEMPTS,
			pattern
		);
		GenerationResult::Exhausted(best)
	}
}
