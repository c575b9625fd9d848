//! Candidate generation roles.
//!
//! The engine is agnostic to what backs these calls; the built-in
//! [`TemplateSource`] draws from a family of packing-heuristic templates
//! with randomized coefficients, which is enough to drive the loop and to
//! exercise every downstream stage deterministically.

use rand::rngs::StdRng;
use rand::Rng;

/// Generator, mutator, and refiner roles behind one seam.
pub trait CandidateSource: Send + Sync {
    /// A fresh candidate from scratch.
    fn generate(&self, temperature: f64, rng: &mut StdRng) -> String;
    /// A variant of an existing candidate's source.
    fn mutate(&self, parent: &str, temperature: f64, rng: &mut StdRng) -> String;
    /// An improvement attempt on a scored candidate.
    fn refine(&self, parent: &str, score: f64, temperature: f64, rng: &mut StdRng) -> String;
}

/// Template-based source for scoring heuristics.
pub struct TemplateSource;

impl TemplateSource {
    fn template(&self, index: usize, w1: f64, w2: f64) -> String {
        match index {
            // Best fit: prefer the tightest remaining space.
            0 => format!(
                "fn score_bin(item, remaining, bin, step) {{\n    \
                 return -(remaining - item) * {w1:.4};\n}}"
            ),
            // Worst fit: keep bins evenly loaded.
            1 => format!(
                "fn score_bin(item, remaining, bin, step) {{\n    \
                 return (remaining - item) * {w1:.4};\n}}"
            ),
            // First fit: prefer low bin indices.
            2 => format!(
                "fn score_bin(item, remaining, bin, step) {{\n    \
                 return -bin * {w1:.4};\n}}"
            ),
            // Near-exact bonus on top of best fit.
            3 => format!(
                "fn score_bin(item, remaining, bin, step) {{\n    \
                 let gap = remaining - item;\n    \
                 if gap < {w2:.4} {{\n        return 1000.0 - gap;\n    }}\n    \
                 return -gap * {w1:.4};\n}}"
            ),
            // Damped best fit via a power curve.
            _ => format!(
                "use math;\n\nfn score_bin(item, remaining, bin, step) {{\n    \
                 let gap = remaining - item;\n    \
                 return -pow(gap + 1.0, {w1:.4}) - bin * {w2:.4};\n}}"
            ),
        }
    }
}

impl CandidateSource for TemplateSource {
    fn generate(&self, temperature: f64, rng: &mut StdRng) -> String {
        let index = rng.gen_range(0..5);
        let spread = temperature.max(0.05);
        let w1 = 1.0 + rng.gen_range(-spread..spread);
        let w2 = rng.gen_range(0.5..10.0);
        self.template(index, w1, w2)
    }

    fn mutate(&self, parent: &str, temperature: f64, rng: &mut StdRng) -> String {
        perturb_literals(parent, temperature.max(0.05) * 0.5, rng)
    }

    fn refine(&self, parent: &str, _score: f64, temperature: f64, rng: &mut StdRng) -> String {
        // Refinement is a conservative mutation: small nudges around the
        // current coefficients rather than a fresh draw.
        perturb_literals(parent, temperature.max(0.05) * 0.1, rng)
    }
}

/// Rewrite each numeric literal in `source` with a multiplicative nudge.
/// Leaves everything else byte-for-byte intact, so mutated candidates stay
/// parseable whenever the parent was.
pub fn perturb_literals(source: &str, spread: f64, rng: &mut StdRng) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if !c.is_ascii_digit() {
            out.push(c);
            continue;
        }
        // Literals directly attached to an identifier belong to a name, not
        // a number.
        let attached = source[..start]
            .chars()
            .next_back()
            .is_some_and(|p| p.is_ascii_alphanumeric() || p == '_');
        let mut end = start + 1;
        while let Some(&(i, n)) = chars.peek() {
            if n.is_ascii_digit() || n == '.' {
                end = i + n.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let literal = &source[start..end];
        match literal.parse::<f64>() {
            Ok(value) if !attached => {
                let nudged = value * (1.0 + rng.gen_range(-spread..=spread));
                out.push_str(&format!("{nudged:.4}"));
            }
            _ => out.push_str(literal),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_generated_templates_parse() {
        let source = TemplateSource;
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..30 {
            let code = source.generate(1.0, &mut rng);
            let program = crate::lang::parse(&code).unwrap();
            let entry = program.function("score_bin").unwrap();
            assert_eq!(entry.params.len(), 4);
        }
    }

    #[test]
    fn test_mutation_preserves_parseability() {
        let source = TemplateSource;
        let mut rng = StdRng::seed_from_u64(1);
        let parent = source.generate(1.0, &mut rng);
        for _ in 0..10 {
            let child = source.mutate(&parent, 1.0, &mut rng);
            assert!(crate::lang::parse(&child).is_ok());
        }
    }

    #[test]
    fn test_perturb_changes_only_literals() {
        let mut rng = StdRng::seed_from_u64(2);
        let out = perturb_literals("return gap2 - 3.0;", 0.5, &mut rng);
        // Identifier suffix digits survive; the literal moves.
        assert!(out.starts_with("return gap2 - "));
        assert!(out.ends_with(';'));
        assert_ne!(out, "return gap2 - 3.0;");
    }

    #[test]
    fn test_generation_is_deterministic_per_seed() {
        let source = TemplateSource;
        let a = source.generate(1.0, &mut StdRng::seed_from_u64(9));
        let b = source.generate(1.0, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
