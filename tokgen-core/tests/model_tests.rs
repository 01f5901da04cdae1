//! Model-level tests: loading, probability queries, completions, merging,
//! and persistence.

use tokgen_core::model::ngram_model::{END_TOKEN, NgramModel};

const EPSILON: f64 = 1e-9;

fn assert_close(actual: f64, expected: f64) {
	assert!(
		(actual - expected).abs() < EPSILON,
		"expected {}, got {}",
		expected,
		actual
	);
}

fn bigram_model() -> NgramModel {
	let mut model = NgramModel::new(2).unwrap();
	model.load(&["a", "b", "a", "c"]);
	model
}

#[test]
fn order_must_be_positive() {
	assert!(NgramModel::new(0).is_err());
	assert!(NgramModel::with_smoothing(0).is_err());
	assert!(NgramModel::new(1).is_ok());
}

#[test]
fn root_distribution_after_loading() {
	// windows: [a,b] [b,a] [a,c] [c,END] -> root counts a:2, b:1, c:1
	let model = bigram_model();
	let empty: [&str; 0] = [];
	let root = model.probabilities(&empty);
	assert_close(root["a"], 0.5);
	assert_close(root["b"], 0.25);
	assert_close(root["c"], 0.25);
}

#[test]
fn single_token_probability() {
	let model = bigram_model();
	assert_close(model.probability(&["a"]), 0.5);
	assert_close(model.probability(&["b"]), 0.25);
	assert_close(model.probability(&["z"]), 0.0);
}

#[test]
fn path_probability() {
	let model = bigram_model();
	assert_close(model.probability(&["a", "b"]), 0.5);
	assert_close(model.probability(&["a", "c"]), 0.5);
	assert_close(model.probability(&["b", "a"]), 1.0);
	assert_close(model.probability(&["a", "z"]), 0.0);
	let empty: [&str; 0] = [];
	assert_close(model.probability(&empty), 0.0);
}

#[test]
fn probability_uses_trailing_window_only() {
	// longer than the order: only the trailing tokens count
	let model = bigram_model();
	assert_close(
		model.probability(&["z", "a", "b"]),
		model.probability(&["a", "b"]),
	);
}

#[test]
fn probabilities_after_context() {
	let model = bigram_model();
	let after_a = model.probabilities(&["a"]);
	assert_eq!(after_a.len(), 2);
	assert_close(after_a["b"], 0.5);
	assert_close(after_a["c"], 0.5);
	assert!(model.probabilities(&["z"]).is_empty());
}

#[test]
fn probabilities_include_stream_end() {
	// "c" is only seen last, so its sole continuation is the sentinel
	let model = bigram_model();
	let after_c = model.probabilities(&["c"]);
	assert_eq!(after_c.len(), 1);
	assert_close(after_c[END_TOKEN], 1.0);
}

#[test]
fn probabilities_sum_to_one() {
	let mut model = NgramModel::new(3).unwrap();
	model.load(&["the", "cat", "ate", "the", "mouse"]);
	for context in [vec!["the"], vec!["the", "cat"], vec!["cat"], vec!["mouse"]] {
		let distribution = model.probabilities(&context);
		assert!(!distribution.is_empty());
		let sum: f64 = distribution.values().sum();
		assert_close(sum, 1.0);
	}
}

#[test]
fn completions_order_and_exclusions() {
	let model = bigram_model();
	// tie at 0.5 each: stable lexicographic order
	assert_eq!(model.completions(&["a"]), vec!["b", "c"]);
	// the sentinel is not a producible token
	assert_eq!(model.completions(&["c"]), Vec::<String>::new());
	assert_eq!(model.completions(&["z"]), Vec::<String>::new());
}

#[test]
fn completions_sorted_by_descending_probability() {
	let mut model = NgramModel::new(2).unwrap();
	model.load(&["x", "b", "x", "a", "x", "a"]);
	// after "x": a seen twice, b once
	assert_eq!(model.completions(&["x"]), vec!["a", "b"]);
}

#[test]
fn completions_between_fills_the_middle_slot() {
	let mut model = NgramModel::new(3).unwrap();
	model.load(&["i", "eat", "fish", "and", "i", "eat", "meat"]);

	let between = model.completions_between(&["i"], &["fish"]).unwrap();
	assert_eq!(between, vec!["eat"]);
	// every answer must itself resolve in the trie
	for token in &between {
		assert!(model.probability(&["i", token.as_str(), "fish"]) > 0.0);
	}

	let no_match = model.completions_between(&["i"], &["and"]).unwrap();
	assert!(no_match.is_empty());
	let unresolved = model.completions_between(&["nope"], &["fish"]).unwrap();
	assert!(unresolved.is_empty());
}

#[test]
fn completions_between_rejects_oversized_context() {
	let mut model = NgramModel::new(3).unwrap();
	model.load(&["i", "eat", "fish"]);
	assert!(model.completions_between(&["i", "eat"], &["fish"]).is_err());
	assert!(model.completions_between(&["i"], &["eat", "fish"]).is_err());
}

#[test]
fn loading_twice_equals_multiplier_two() {
	let mut twice = NgramModel::new(2).unwrap();
	twice.load(&["a", "b", "a", "c"]);
	twice.load(&["a", "b", "a", "c"]);

	let mut weighted = NgramModel::new(2).unwrap();
	weighted.load_weighted(&["a", "b", "a", "c"], 2);

	assert_eq!(twice.to_bytes().unwrap(), weighted.to_bytes().unwrap());
	assert_close(twice.probability(&["a"]), weighted.probability(&["a"]));
}

#[test]
fn zero_multiplier_is_a_no_op() {
	let mut model = NgramModel::new(2).unwrap();
	model.load_weighted(&["a", "b"], 0);
	assert!(model.is_empty());
}

#[test]
fn loading_is_additive() {
	let mut model = bigram_model();
	assert_close(model.probability(&["a"]), 0.5);
	model.load(&["b", "b"]);
	// root counts now a:2, b:3, c:1
	assert_close(model.probability(&["a"]), 2.0 / 6.0);
	assert_close(model.probability(&["b"]), 3.0 / 6.0);
}

#[test]
fn tokens_are_case_sensitive() {
	let mut model = NgramModel::new(2).unwrap();
	model.load(&["Ab", "cd"]);
	assert!(model.probability(&["Ab"]) > 0.0);
	assert_close(model.probability(&["ab"]), 0.0);
}

#[test]
fn smoothing_seeds_new_nodes_at_two() {
	let mut smoothed = NgramModel::with_smoothing(2).unwrap();
	smoothed.load(&["a", "x"]);
	smoothed.load(&["a", "y"]);
	// root counts: a seeded at 2 then incremented (3), x and y seeded at 2
	assert_close(smoothed.probability(&["a"]), 3.0 / 7.0);

	let mut plain = NgramModel::new(2).unwrap();
	plain.load(&["a", "x"]);
	plain.load(&["a", "y"]);
	assert_close(plain.probability(&["a"]), 0.5);
}

#[test]
fn clear_discards_everything() {
	let mut model = bigram_model();
	assert!(!model.is_empty());
	model.clear();
	assert!(model.is_empty());
	assert_close(model.probability(&["a"]), 0.0);
	assert!(model.completions(&["a"]).is_empty());
	assert_eq!(model.order(), 2);
}

#[test]
fn merge_sums_counts() {
	let mut left = NgramModel::new(2).unwrap();
	left.load(&["a", "b"]);
	let mut right = NgramModel::new(2).unwrap();
	right.load(&["a", "c"]);

	left.merge(&right).unwrap();
	// root counts a:2, b:1, c:1
	assert_close(left.probability(&["a"]), 0.5);
	let after_a = left.probabilities(&["a"]);
	assert_close(after_a["b"], 0.5);
	assert_close(after_a["c"], 0.5);
}

#[test]
fn merge_rejects_mismatched_configuration() {
	let mut bigram = NgramModel::new(2).unwrap();
	let trigram = NgramModel::new(3).unwrap();
	assert!(bigram.merge(&trigram).is_err());

	let smoothed = NgramModel::with_smoothing(2).unwrap();
	assert!(bigram.merge(&smoothed).is_err());
}

#[test]
fn parallel_build_matches_sequential() {
	let sequences: Vec<Vec<String>> = (0..20)
		.map(|_| vec!["a".to_owned(), "b".to_owned(), "a".to_owned(), "c".to_owned()])
		.collect();

	let parallel = NgramModel::from_sequences_parallel(2, false, sequences.clone()).unwrap();

	let mut sequential = NgramModel::new(2).unwrap();
	for sequence in &sequences {
		sequential.load(sequence);
	}

	for path in [vec!["a"], vec!["b"], vec!["a", "b"], vec!["a", "c"]] {
		assert_close(parallel.probability(&path), sequential.probability(&path));
	}
}

#[test]
fn bytes_round_trip() {
	let model = bigram_model();
	let bytes = model.to_bytes().unwrap();
	let restored = NgramModel::from_bytes(&bytes).unwrap();
	assert_eq!(restored.order(), 2);
	assert!(!restored.smoothing());
	assert_close(restored.probability(&["a"]), 0.5);
	assert_eq!(restored.completions(&["a"]), vec!["b", "c"]);
}

#[test]
fn file_round_trip() {
	let model = bigram_model();
	let path = std::env::temp_dir().join("tokgen_model_round_trip.bin");
	model.save(&path).unwrap();
	let restored = NgramModel::load_from(&path).unwrap();
	std::fs::remove_file(&path).ok();
	assert_close(restored.probability(&["a"]), 0.5);
}

#[test]
fn order_one_model_predicts_from_the_root() {
	let mut model = NgramModel::new(1).unwrap();
	model.load(&["a", "b", "b"]);
	assert_close(model.probability(&["b"]), 2.0 / 3.0);
	// context is always empty at order 1
	assert_eq!(model.completions(&["a"]), vec!["b", "a"]);
}
