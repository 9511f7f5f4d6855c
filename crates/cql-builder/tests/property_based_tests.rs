//! Property-based tests for the editing API and the text round trip.
use cql_builder::{Comparator, NodeId, Operator, Predicate, Query, Settings};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    AddToken(String),
    AddPredicate {
        group: usize,
        anchor: Option<usize>,
        operator: Operator,
        predicate: Predicate,
    },
    AddGroup {
        group: usize,
        inner: Operator,
        operator: Operator,
        predicates: Vec<Predicate>,
    },
    Remove(usize),
    Move {
        node: usize,
        target: usize,
        anchor: Option<usize>,
        operator: Operator,
    },
    Repeat {
        token: usize,
        min: Option<u32>,
        max: Option<u32>,
    },
    Flags {
        token: usize,
        optional: bool,
        sentence_start: bool,
        sentence_end: bool,
    },
    RemoveToken(usize),
}

mod strategies {
    use super::*;

    pub fn operator() -> impl Strategy<Value = Operator> {
        prop_oneof![Just(Operator::And), Just(Operator::Or)]
    }

    pub fn value() -> impl Strategy<Value = String> {
        prop_oneof![
            3 => "[a-z]{1,5}",
            3 => "[a-cé\"\\\\.*|()?i-]{1,6}",
            1 => prop::sample::select(vec!["(?-i)", "(?c)", ".*", "|", "\\", "\"", "(?c).*", "a\\"])
                .prop_map(str::to_string),
            1 => ("(\\(\\?-i\\)|\\(\\?c\\))", "[a-z.*\\\\]{0,3}").prop_map(|(marker, rest)| marker + &rest),
        ]
    }

    pub fn predicate() -> impl Strategy<Value = Predicate> {
        (
            prop::sample::select(vec!["word", "lemma", "pos"]),
            prop::sample::select(Comparator::ALL.to_vec()),
            prop::collection::vec(value(), 1..3),
            any::<bool>(),
        )
            .prop_map(|(field, comparator, values, case_sensitive)| {
                Predicate::new(field, comparator, "")
                    .with_values(values)
                    .with_case_sensitive(case_sensitive)
            })
    }

    /// Boolean expression text with random operators and parenthesization.
    pub fn expression() -> impl Strategy<Value = String> {
        let leaf = "[a-z]{1,3}".prop_map(|value| format!("word=\"{value}\""));

        leaf.prop_recursive(6, 48, 4, |inner| {
            (
                prop::collection::vec(inner, 2..4),
                prop_oneof![Just(" & "), Just(" | ")],
                any::<bool>(),
            )
                .prop_map(|(operands, op, parens)| {
                    let joined = operands.join(op);
                    if parens { format!("({joined})") } else { joined }
                })
        })
    }

    pub fn edit() -> impl Strategy<Value = Edit> {
        prop_oneof![
            value().prop_map(Edit::AddToken),
            (any::<usize>(), prop::option::of(any::<usize>()), operator(), predicate()).prop_map(
                |(group, anchor, operator, predicate)| Edit::AddPredicate {
                    group,
                    anchor,
                    operator,
                    predicate,
                }
            ),
            (any::<usize>(), operator(), operator(), prop::collection::vec(predicate(), 2..4))
                .prop_map(|(group, inner, operator, predicates)| Edit::AddGroup {
                    group,
                    inner,
                    operator,
                    predicates,
                }),
            any::<usize>().prop_map(Edit::Remove),
            (any::<usize>(), any::<usize>(), prop::option::of(any::<usize>()), operator())
                .prop_map(|(node, target, anchor, operator)| Edit::Move {
                    node,
                    target,
                    anchor,
                    operator,
                }),
            (any::<usize>(), prop::option::of(0u32..5), prop::option::of(1u32..8))
                .prop_map(|(token, min, max)| Edit::Repeat { token, min, max }),
            (any::<usize>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
                |(token, optional, sentence_start, sentence_end)| Edit::Flags {
                    token,
                    optional,
                    sentence_start,
                    sentence_end,
                }
            ),
            any::<usize>().prop_map(Edit::RemoveToken),
        ]
    }
}

fn nodes(query: &Query) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = query
        .tokens()
        .map(|(_, token)| token.root())
        .collect::<Vec<_>>();

    while let Some(id) = stack.pop() {
        out.push(id);
        stack.extend(query.children(id).iter().copied());
    }

    out
}

fn pick<T: Copy>(items: &[T], index: usize) -> Option<T> {
    (!items.is_empty()).then(|| items[index % items.len()])
}

fn groups(query: &Query) -> Vec<NodeId> {
    nodes(query)
        .into_iter()
        .filter(|id| query.group(*id).is_some())
        .collect()
}

fn anchor_in(query: &Query, group: NodeId, anchor: Option<usize>) -> Option<NodeId> {
    anchor.and_then(|index| pick(query.children(group), index))
}

/// Adds a token whose initial empty predicate is filled in, since empty
/// predicates leave no trace in the text.
fn add_filled_token(query: &mut Query, value: &str) {
    let token = query.add_token();
    let root = query.token(token).map(|t| t.root()).unwrap();
    let empty = query.children(root)[0];
    query.set_value(empty, value).unwrap();
}

fn apply(query: &mut Query, edit: &Edit) {
    let tokens = query.token_ids().to_vec();

    match edit {
        Edit::AddToken(value) => add_filled_token(query, value),
        Edit::AddPredicate {
            group,
            anchor,
            operator,
            predicate,
        } => {
            if let Some(group) = pick(&groups(query), *group) {
                let anchor = anchor_in(query, group, *anchor);
                let _ = query.add_predicate(group, predicate.clone(), *operator, anchor);
            }
        }
        Edit::AddGroup {
            group,
            inner,
            operator,
            predicates,
        } => {
            if let Some(group) = pick(&groups(query), *group) {
                let _ = query.add_group(group, *inner, predicates.clone(), *operator, None);
            }
        }
        Edit::Remove(node) => {
            if let Some(node) = pick(&nodes(query), *node) {
                let _ = query.remove_node(node);
            }
        }
        Edit::Move {
            node,
            target,
            anchor,
            operator,
        } => {
            let all = nodes(query);
            if let (Some(node), Some(target)) = (pick(&all, *node), pick(&groups(query), *target)) {
                let anchor = anchor_in(query, target, *anchor);
                let _ = query.move_node(node, target, *operator, anchor);
            }
        }
        Edit::Repeat { token, min, max } => {
            if let Some(token) = pick(&tokens, *token).and_then(|id| query.token_mut(id)) {
                let _ = token.set_repeat(*min, *max);
            }
        }
        Edit::Flags {
            token,
            optional,
            sentence_start,
            sentence_end,
        } => {
            if let Some(token) = pick(&tokens, *token).and_then(|id| query.token_mut(id)) {
                token.set_optional(*optional);
                token.set_sentence_start(*sentence_start);
                token.set_sentence_end(*sentence_end);
            }
        }
        Edit::RemoveToken(token) => {
            if let Some(token) = pick(&tokens, *token).filter(|_| tokens.len() > 1) {
                let _ = query.remove_token(token);
            }
        }
    }
}

fn build(edits: &[Edit]) -> Query {
    let mut query = Query::default();
    let first = query.token_ids()[0];
    query.remove_token(first).unwrap();
    add_filled_token(&mut query, "start");

    for edit in edits {
        apply(&mut query, edit);
    }
    query
}

proptest! {
    #[test]
    fn test_invariants_hold_after_every_edit(edits in prop::collection::vec(strategies::edit(), 0..30)) {
        let mut query = Query::default();

        for edit in &edits {
            apply(&mut query, edit);
            prop_assert_eq!(query.check_invariants(), Ok(()), "after {:?}", edit);
        }
    }

    #[test]
    fn test_serialized_text_round_trips(edits in prop::collection::vec(strategies::edit(), 0..30)) {
        let query = build(&edits);
        let text = query.serialize();
        let parsed = cql_builder::parse(&text, &Settings::default());

        prop_assert!(parsed.is_ok(), "failed to parse `{}`: {:?}", text, parsed.as_ref().err());
        let parsed = parsed.unwrap();
        prop_assert_eq!(parsed.serialize(), text);
        prop_assert_eq!(parsed.len(), query.len());
        prop_assert_eq!(parsed.check_invariants(), Ok(()));
    }

    #[test]
    fn test_parsed_expressions_are_normalized(expr in strategies::expression()) {
        let text = format!("[{expr}]");
        let query = cql_builder::parse(&text, &Settings::default());

        prop_assert!(query.is_ok(), "failed to parse `{}`: {:?}", text, query.as_ref().err());
        let query = query.unwrap();
        prop_assert_eq!(query.check_invariants(), Ok(()));

        let normalized = query.serialize();
        let reparsed = cql_builder::parse(&normalized, &Settings::default()).unwrap();
        prop_assert_eq!(reparsed.serialize(), normalized);
    }

    #[test]
    fn test_parse_never_panics(text in "\\PC{0,40}") {
        let _ = cql_builder::parse(&text, &Settings::default());
    }

    #[test]
    fn test_failed_load_leaves_query_untouched(
        edits in prop::collection::vec(strategies::edit(), 0..10),
        text in "\\PC{0,20}",
    ) {
        let mut query = build(&edits);
        let before = query.serialize();

        if query.load(&text).is_err() {
            prop_assert_eq!(query.serialize(), before);
        }
    }
}
