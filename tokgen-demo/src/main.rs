use regex::Regex;
use tokgen_core::io;
use tokgen_core::model::generator::{DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH};
use tokgen_core::model::ngram_model::NgramModel;

const SAMPLE: &str = "the cat sat on the mat . \
	the dog sat on the rug . \
	the cat saw the dog and the dog saw the cat . \
	a bird sat on the fence and the cat saw the bird .";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Tokenization is a collaborator's job; whitespace splitting is enough
    // here. Pass a corpus file as the first argument to use your own text
    // (one sequence per line).
    let sequences: Vec<Vec<String>> = match std::env::args().nth(1) {
        Some(path) => io::read_lines(&path)?
            .iter()
            .map(|line| line.split_whitespace().map(str::to_owned).collect())
            .collect(),
        None => vec![SAMPLE.split_whitespace().map(str::to_owned).collect()],
    };

    // Build a trigram model; every sequence contributes with weight 1
    let mut model = NgramModel::new(3)?;
    for sequence in &sequences {
        model.load(sequence);
    }

    // Single-token and path probabilities
    println!("p(the)       = {:.3}", model.probability(&["the"]));
    println!("p(the cat)   = {:.3}", model.probability(&["the", "cat"]));

    // Full distribution after a context
    for (token, probability) in model.probabilities(&["the"]) {
        println!("after 'the': {:?} -> {:.3}", token, probability);
    }

    // Completions, most probable first
    println!("completions(the) = {:?}", model.completions(&["the"]));

    // Fill the middle slot: tokens w such that "the w on" was observed
    println!(
        "between 'the' and 'on' = {:?}",
        model.completions_between(&["the"], &["on"])?
    );

    // Fixed-length generation; an under-length result is best-effort, not
    // an error
    for i in 0..5 {
        let result = model.generate_tokens(8);
        let marker = if result.is_complete() { "" } else { " (partial)" };
        println!("generated {}: {}{}", i + 1, result.tokens().join(" "), marker);
    }

    // Keep generating until a sentence-ending token shows up
    let terminator = Regex::new(r"[.!?]$")?;
    let sentence = model.generate_until(&terminator, DEFAULT_MIN_LENGTH, DEFAULT_MAX_LENGTH);
    println!("sentence: {}", sentence.tokens().join(" "));

    // Round-trip through the compact binary format
    let bytes = model.to_bytes()?;
    let restored = NgramModel::from_bytes(&bytes)?;
    println!(
        "restored model: order {}, p(the) = {:.3}",
        restored.order(),
        restored.probability(&["the"])
    );

    // When a corpus file was given, keep a binary model next to it
    if let Some(path) = std::env::args().nth(1) {
        let binary_path = io::build_output_path(&path, "bin")?;
        model.save(&binary_path)?;
        println!("saved binary model to {}", binary_path.display());
    }

    Ok(())
}
