//! Property-based tests for the query lexer and parser.
use cql_lang::{AstExpr, Pattern};
use proptest::prelude::*;

fn count_attributes(expr: &AstExpr) -> usize {
    match expr {
        AstExpr::Binary { left, right, .. } => count_attributes(left) + count_attributes(right),
        AstExpr::Attribute(_) => 1,
    }
}

fn total_attributes(pattern: &Pattern) -> usize {
    pattern
        .tokens
        .iter()
        .filter_map(|t| t.expr.as_ref())
        .map(count_attributes)
        .sum()
}

mod strategies {
    use super::*;

    pub fn attribute() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["word", "lemma", "pos"]),
            prop::sample::select(vec!["=", "!="]),
            "[a-zA-Z.*]{0,8}",
        )
            .prop_map(|(name, op, value)| format!("{name}{op}\"{value}\""))
    }

    /// A flat `a & b | c` chain together with its number of attributes.
    pub fn expr() -> impl Strategy<Value = (String, usize)> {
        (
            attribute(),
            prop::collection::vec((prop::sample::select(vec!["&", "|"]), attribute()), 0..4),
        )
            .prop_map(|(first, rest)| {
                let n = rest.len() + 1;
                let text = rest
                    .into_iter()
                    .fold(first, |acc, (op, attr)| format!("{acc} {op} {attr}"));
                (text, n)
            })
    }
}

proptest! {
    #[test]
    fn test_parse_counts_every_attribute(tokens in prop::collection::vec(strategies::expr(), 1..5)) {
        let expected: usize = tokens.iter().map(|(_, n)| n).sum();
        let code = tokens.iter().map(|(text, _)| format!("[{text}]")).collect::<Vec<_>>().join(" ");
        let pattern = cql_lang::parse(&code).unwrap();

        prop_assert_eq!(pattern.tokens.len(), tokens.len());
        prop_assert_eq!(total_attributes(&pattern), expected);
    }

    #[test]
    fn test_parse_never_panics(code in "\\PC{0,40}") {
        let _ = cql_lang::parse(&code);
    }

    #[test]
    fn test_exact_quantifier(n in 0u32..1000) {
        let pattern = cql_lang::parse(&format!("[]{{{n}}}")).unwrap();
        prop_assert_eq!(pattern.tokens[0].repeat.map(|r| (r.min, r.max)), Some((n, Some(n))));
    }
}
