//! Relocation rules and the single-pass prefix rewriter.

use crate::bundler::{Error, Result};
use serde::Serialize;

/// Maps an original namespace prefix to a private replacement.
///
/// Prefixes are stored in dotted form (`kotlinx.coroutines`); the slashed
/// form used by class files and entry paths is derived from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelocationRule {
    from: String,
    to: String,
}

impl RelocationRule {
    /// Creates a rule, accepting dotted or slashed prefixes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRelocationRule`] if either prefix is empty,
    /// has an empty segment, contains characters outside a package name, or
    /// if both prefixes are equal.
    pub fn new(from: &str, to: &str) -> Result<Self> {
        let from = normalize(from)?;
        let to = normalize(to)?;
        if from == to {
            return Err(Error::InvalidRelocationRule(format!(
                "`{from}` relocates onto itself"
            )));
        }
        Ok(Self { from, to })
    }

    /// Original prefix, dotted.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Replacement prefix, dotted.
    pub fn to(&self) -> &str {
        &self.to
    }
}

fn normalize(prefix: &str) -> Result<String> {
    let dotted = prefix.trim().trim_end_matches(['.', '/']).replace('/', ".");
    let valid = !dotted.is_empty()
        && dotted.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        });
    if valid {
        Ok(dotted)
    } else {
        Err(Error::InvalidRelocationRule(format!(
            "`{prefix}` is not a package prefix"
        )))
    }
}

struct Pattern {
    rule: usize,
    from: Vec<u8>,
    to: Vec<u8>,
}

/// Rewrites byte strings under a rule set, counting matches per rule.
///
/// A prefix matches only when followed by its separator (`kotlin.` or
/// `kotlin/`), so `kotlin` never matches `kotlinx`. It must also start at a
/// name boundary: the beginning of the input, after a character that cannot
/// be part of a qualified name, or after the `L` of a type descriptor such as
/// `(Lkotlin/Unit;)V`. Rewriting is a single left-to-right pass, so replaced
/// text is never rewritten again by another rule.
pub struct Relocator {
    rules: Vec<RelocationRule>,
    patterns: Vec<Pattern>,
    hits: Vec<usize>,
}

impl Relocator {
    /// Compiles `rules`; longer prefixes are tried first.
    pub fn new(rules: &[RelocationRule]) -> Self {
        let mut patterns = Vec::with_capacity(rules.len() * 2);
        for (idx, rule) in rules.iter().enumerate() {
            patterns.push(Pattern {
                rule: idx,
                from: format!("{}/", rule.from.replace('.', "/")).into_bytes(),
                to: format!("{}/", rule.to.replace('.', "/")).into_bytes(),
            });
            patterns.push(Pattern {
                rule: idx,
                from: format!("{}.", rule.from).into_bytes(),
                to: format!("{}.", rule.to).into_bytes(),
            });
        }
        patterns.sort_by(|a, b| b.from.len().cmp(&a.from.len()));

        Self {
            rules: rules.to_vec(),
            patterns,
            hits: vec![0; rules.len()],
        }
    }

    /// The compiled rules, in configuration order.
    pub fn rules(&self) -> &[RelocationRule] {
        &self.rules
    }

    /// Returns the rewritten bytes, or `None` if nothing matched.
    pub fn rewrite(&mut self, input: &[u8]) -> Option<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        let mut changed = false;
        let mut i = 0;

        while i < input.len() {
            if at_boundary(input, i) {
                let tail = &input[i..];
                if let Some(pattern) = self.patterns.iter().find(|p| tail.starts_with(&p.from)) {
                    out.extend_from_slice(&pattern.to);
                    i += pattern.from.len();
                    self.hits[pattern.rule] += 1;
                    changed = true;
                    continue;
                }
            }
            out.push(input[i]);
            i += 1;
        }

        changed.then_some(out)
    }

    /// String convenience over [`Relocator::rewrite`].
    pub fn rewrite_str(&mut self, input: &str) -> String {
        match self.rewrite(input.as_bytes()) {
            // Replacements are ASCII and splice at ASCII boundaries
            Some(bytes) => String::from_utf8(bytes).unwrap_or_else(|e| {
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }),
            None => input.to_string(),
        }
    }

    /// Returns and resets the per-rule match counters.
    pub fn take_hits(&mut self) -> Vec<usize> {
        std::mem::replace(&mut self.hits, vec![0; self.rules.len()])
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'/' | b'.' | b'-')
}

fn at_boundary(input: &[u8], i: usize) -> bool {
    match i {
        0 => true,
        1 => !is_name_byte(input[0]) || input[0] == b'L',
        _ => {
            let prev = input[i - 1];
            !is_name_byte(prev) || (prev == b'L' && !is_name_byte(input[i - 2]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relocator() -> Relocator {
        Relocator::new(&[
            RelocationRule::new("kotlinx.coroutines", "com.example.coroutines").unwrap(),
            RelocationRule::new("kotlin", "com.example.kotlin").unwrap(),
            RelocationRule::new("org/jetbrains/annotations", "com.example.annotations.jetbrains")
                .unwrap(),
        ])
    }

    fn rewrite(r: &mut Relocator, s: &str) -> String {
        r.rewrite_str(s)
    }

    #[test]
    fn internal_names_and_dotted_names() {
        let mut r = relocator();
        assert_eq!(rewrite(&mut r, "kotlin/Unit"), "com/example/kotlin/Unit");
        assert_eq!(rewrite(&mut r, "kotlin.Unit"), "com.example.kotlin.Unit");
        assert_eq!(
            rewrite(&mut r, "kotlinx/coroutines/Job"),
            "com/example/coroutines/Job"
        );
    }

    #[test]
    fn descriptors_are_rewritten_inside() {
        let mut r = relocator();
        assert_eq!(
            rewrite(&mut r, "(Lkotlin/jvm/functions/Function1;[Lkotlinx/coroutines/Job;)Lkotlin/Unit;"),
            "(Lcom/example/kotlin/jvm/functions/Function1;[Lcom/example/coroutines/Job;)Lcom/example/kotlin/Unit;"
        );
        assert_eq!(
            rewrite(&mut r, "Ljava/util/List<Lkotlin/Pair;>;"),
            "Ljava/util/List<Lcom/example/kotlin/Pair;>;"
        );
    }

    #[test]
    fn prefix_needs_separator_and_boundary() {
        let mut r = relocator();
        assert_eq!(rewrite(&mut r, "kotlinx/serialization/Json"), "kotlinx/serialization/Json");
        assert_eq!(rewrite(&mut r, "org/acme/kotlin/Thing"), "org/acme/kotlin/Thing");
        assert_eq!(rewrite(&mut r, "Xkotlin/Unit"), "Xkotlin/Unit");
        assert_eq!(rewrite(&mut r, "kotlin"), "kotlin");
    }

    #[test]
    fn replacements_are_not_rewritten_again() {
        let mut r = Relocator::new(&[
            RelocationRule::new("a", "b.a").unwrap(),
            RelocationRule::new("b", "c").unwrap(),
        ]);
        assert_eq!(rewrite(&mut r, "a/X"), "b/a/X");
    }

    #[test]
    fn hits_are_counted_per_rule() {
        let mut r = relocator();
        rewrite(&mut r, "kotlin/Unit");
        rewrite(&mut r, "(Lkotlin/Unit;Lkotlin/Any;)V");
        assert_eq!(r.take_hits(), vec![0, 3, 0]);
        assert_eq!(r.take_hits(), vec![0, 0, 0]);
    }

    #[test]
    fn invalid_rules_are_rejected() {
        assert!(RelocationRule::new("", "x").is_err());
        assert!(RelocationRule::new("a..b", "x").is_err());
        assert!(RelocationRule::new("a b", "x").is_err());
        assert!(RelocationRule::new("kotlin", "kotlin/").is_err());
        assert_eq!(RelocationRule::new("org/jetbrains/", "x.y").unwrap().from(), "org.jetbrains");
    }
}
