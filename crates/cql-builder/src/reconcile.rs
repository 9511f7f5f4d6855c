//! Turns query text back into a [`Query`].
use cql_lang::{AstAttribute, AstExpr, CompareOp, Pattern, Tag, TokenExpr};

use crate::{
    Query,
    error::{ConstraintError, ParseFailure},
    node::{NodeId, Operator},
    predicate::{ALTERNATION, CASE_MARKER, CASE_MARKER_COMPAT, Comparator, Predicate, WILDCARD},
    query::Scope,
    settings::{FieldSpec, Settings},
};

const SENTENCE_TAG: &str = "s";

/// Parses `text` into a new query using the field registry of `settings`.
///
/// The text must be syntactically valid and representable: every field must
/// be registered, every comparator allowed for its field and the only
/// supported element tag is `<s>`.
pub fn parse(text: &str, settings: &Settings) -> Result<Query, ParseFailure> {
    cql_lang::parse(text)
        .map_err(ParseFailure::from)
        .and_then(|pattern| Reconciler::new(text, settings).build(&pattern))
        .inspect_err(|err| log::debug!("Rejected query `{text}`: {err}"))
}

impl Query {
    /// Replaces the content of this query with `text`. The query is left
    /// untouched when the text is rejected.
    pub fn load(&mut self, text: &str) -> Result<(), ParseFailure> {
        *self = parse(text, &self.settings)?;
        Ok(())
    }
}

struct Reconciler<'a> {
    text: &'a str,
    query: Query,
}

impl<'a> Reconciler<'a> {
    fn new(text: &'a str, settings: &Settings) -> Self {
        Self {
            text,
            query: Query::empty(settings.clone()),
        }
    }

    fn build(mut self, pattern: &Pattern) -> Result<Query, ParseFailure> {
        if let Some(within) = &pattern.within {
            self.query.set_scope(Scope::from_element(&within.element));
        }

        for token in &pattern.tokens {
            self.token(token)?;
        }

        debug_assert_eq!(self.query.check_invariants(), Ok(()));
        log::trace!(
            "Reconciled {} tokens from `{}`",
            self.query.len(),
            self.text
        );
        Ok(self.query)
    }

    fn fail(&self, range: &cql_lang::Range, cause: impl Into<ConstraintError>) -> ParseFailure {
        ParseFailure::constraint(self.text, range, cause)
    }

    fn sentence_tag(&self, tag: Option<&Tag>) -> Result<bool, ParseFailure> {
        match tag {
            None => Ok(false),
            Some(tag) if tag.name == SENTENCE_TAG => Ok(true),
            Some(tag) => Err(self.fail(
                &tag.range,
                ConstraintError::UnsupportedTag(tag.name.clone()),
            )),
        }
    }

    fn token(&mut self, expr: &TokenExpr) -> Result<(), ParseFailure> {
        let sentence_start = self.sentence_tag(expr.leading_tag.as_ref())?;
        let sentence_end = self.sentence_tag(expr.trailing_tag.as_ref())?;

        let token_id = self.query.create_bare_token();
        self.query.order.push(token_id);

        let Some(token) = self.query.tokens.get_mut(token_id) else {
            return Ok(());
        };
        token.set_sentence_start(sentence_start);
        token.set_sentence_end(sentence_end);
        token.set_optional(expr.optional);
        if let Some(repeat) = expr.repeat {
            token
                .set_repeat(Some(repeat.min), repeat.max)
                .map_err(|err| ParseFailure::constraint(self.text, &expr.range, err))?;
        }
        let root = token.root();

        match &expr.expr {
            Some(body) => self.walk(body, root, 0),
            None => Ok(()),
        }
    }

    /// Mirrors the expression tree into `group_id`. A chain of the same
    /// operator becomes one flat group; an operator change opens a nested one.
    ///
    /// Raw `attach` is enough to stay normalized: a nested group is only
    /// opened for a binary node, which hands it two operands, so it never
    /// ends up with fewer than two children, and it never shares its
    /// parent's operator. Parenthesized chains of the parent's operator
    /// land in the parent directly.
    fn walk(&mut self, expr: &AstExpr, group_id: NodeId, level: usize) -> Result<(), ParseFailure> {
        match expr {
            AstExpr::Binary { op, left, right } => {
                let operator = Operator::from(*op);
                let current = self.query.group(group_id).map(|group| group.operator());

                let target = if level == 0 {
                    if let Ok(group) = self.query.group_mut(group_id) {
                        group.operator = operator;
                    }
                    group_id
                } else if current == Some(operator) {
                    group_id
                } else {
                    let nested = self.query.create_group(operator);
                    self.query.attach(group_id, nested);
                    nested
                };

                self.walk(left, target, level + 1)?;
                self.walk(right, target, level + 1)
            }
            AstExpr::Attribute(attribute) => {
                let predicate = self.predicate(attribute)?;
                let node_id = self.query.create_predicate(predicate);
                self.query.attach(group_id, node_id);
                Ok(())
            }
        }
    }

    fn field(&self, attribute: &AstAttribute) -> Result<&FieldSpec, ParseFailure> {
        let settings = self.query.settings();
        let field = match &attribute.name {
            Some(name) => settings.field(name),
            None => settings.default_field(),
        };

        field.ok_or_else(|| {
            self.fail(
                &attribute.range,
                ConstraintError::UnknownField(attribute.name.clone().unwrap_or_default()),
            )
        })
    }

    fn predicate(&self, attribute: &AstAttribute) -> Result<Predicate, ParseFailure> {
        let field = self.field(attribute)?;

        let (case_sensitive, value) = if field.case_sensitive {
            strip_case_marker(&attribute.value)
        } else {
            (false, attribute.value.as_str())
        };

        let (comparator, value) = match attribute.op {
            CompareOp::Ne => (Comparator::NotEquals, value),
            CompareOp::Eq => match resugar(value) {
                (comparator, stripped) if field.allows(comparator) => (comparator, stripped),
                _ => (Comparator::Equals, value),
            },
        };
        if !field.allows(comparator) {
            return Err(self.fail(
                &attribute.range,
                ConstraintError::DisallowedComparator {
                    field: field.name.clone(),
                    comparator,
                },
            ));
        }

        let values = if value.is_empty() {
            Vec::new()
        } else if value.chars().all(|c| c == ALTERNATION) {
            vec![value.to_string()]
        } else {
            value.split(ALTERNATION).map(str::to_string).collect()
        };

        Ok(Predicate {
            field: field.name.clone(),
            comparator,
            case_sensitive,
            values,
        })
    }
}

// A marker with nothing after it is the value itself.
fn strip_case_marker(value: &str) -> (bool, &str) {
    [CASE_MARKER, CASE_MARKER_COMPAT]
        .iter()
        .find_map(|marker| value.strip_prefix(marker))
        .filter(|rest| !rest.is_empty())
        .map_or((false, value), |rest| (true, rest))
}

/// Recognizes a leading or trailing wildcard on a single value as
/// ends-with or starts-with.
fn resugar(value: &str) -> (Comparator, &str) {
    if value.len() < WILDCARD.len() || value.contains(ALTERNATION) {
        return (Comparator::Equals, value);
    }

    match (value.strip_prefix(WILDCARD), value.strip_suffix(WILDCARD)) {
        (Some(rest), _) if !rest.is_empty() => (Comparator::EndsWith, rest),
        (_, Some(rest)) if !rest.is_empty() => (Comparator::StartsWith, rest),
        _ => (Comparator::Equals, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn shape(query: &Query, node_id: NodeId) -> String {
        if let Some(predicate) = query.predicate(node_id) {
            return predicate.values.join("|");
        }

        let children = query
            .children(node_id)
            .iter()
            .map(|child| shape(query, *child))
            .collect::<Vec<_>>()
            .join(", ");
        let label = query
            .group(node_id)
            .map(|group| group.operator().label())
            .unwrap_or_default();
        format!("{label}({children})")
    }

    fn first_root(query: &Query) -> NodeId {
        query.tokens().next().map(|(_, token)| token.root()).unwrap()
    }

    #[rstest]
    #[case::single("[word=\"a\"]", "AND(a)")]
    #[case::and_chain("[word=\"a\" & word=\"b\" & word=\"c\"]", "AND(a, b, c)")]
    #[case::or_chain("[word=\"a\" | word=\"b\"]", "OR(a, b)")]
    #[case::precedence("[word=\"a\" | word=\"b\" & word=\"c\"]", "OR(a, AND(b, c))")]
    #[case::nested_left("[(word=\"a\" | word=\"b\") & word=\"c\"]", "AND(OR(a, b), c)")]
    #[case::nested_right("[word=\"c\" & (word=\"a\" | word=\"b\")]", "AND(c, OR(a, b))")]
    #[case::redundant_parens("[(word=\"a\" & word=\"b\") & word=\"c\"]", "AND(a, b, c)")]
    #[case::deep(
        "[word=\"a\" & (word=\"b\" | (word=\"c\" & word=\"d\"))]",
        "AND(a, OR(b, AND(c, d)))")]
    #[case::bare_value("[\"fish\"]", "AND(fish)")]
    #[case::empty_token("[]", "AND()")]
    fn test_tree_shape(#[case] text: &str, #[case] expected: &str) {
        let query = parse(text, &Settings::default()).unwrap();

        assert_eq!(shape(&query, first_root(&query)), expected);
        assert!(query.check_invariants().is_ok());
    }

    #[rstest]
    #[case::plain("[word=\"a\"]", "[word = \"a\"]")]
    #[case::two_tokens("[word=\"a\"][lemma!=\"b\"]", "[word = \"a\"][lemma != \"b\"]")]
    #[case::nested("[(word=\"a\"|word=\"b\")&word=\"c\"]", "[(word = \"a\" | word = \"b\") & word = \"c\"]")]
    #[case::decorations("<s>[]{2,5}?</s>", "<s>[]{2,5}?</s>")]
    #[case::star("[]*", "[]{0,}")]
    #[case::plus("[]+", "[]{1,}")]
    #[case::exactly_one("[]{1}", "[]")]
    #[case::zero_collapses("[]{0}", "[]{0,}")]
    #[case::within("[] within <s/>", "[] within <s/>")]
    #[case::within_only("within <p/>", "within <p/>")]
    #[case::compat_marker("[word=\"(?c)Foo\"]", "[word = \"(?-i)Foo\"]")]
    #[case::bare_value("[\"fish\"]", "[word = \"fish\"]")]
    fn test_normalized_text(#[case] text: &str, #[case] expected: &str) {
        let query = parse(text, &Settings::default()).unwrap();
        assert_eq!(query.serialize(), expected);
    }

    #[rstest]
    #[case::starts_with("lemma = \"run.*\"", Comparator::StartsWith, vec!["run"])]
    #[case::ends_with("word = \".*ing\"", Comparator::EndsWith, vec!["ing"])]
    #[case::wildcard_only("word = \".*\"", Comparator::Equals, vec![".*"])]
    #[case::double_wildcard("word = \".*.*\"", Comparator::EndsWith, vec![".*"])]
    #[case::only_separators("word = \"||\"", Comparator::Equals, vec!["||"])]
    #[case::empty_alternative("word = \"a|\"", Comparator::Equals, vec!["a", ""])]
    #[case::alternation("word = \"a.*|b\"", Comparator::Equals, vec!["a.*", "b"])]
    #[case::not_equals("pos != \"N.*\"", Comparator::NotEquals, vec!["N.*"])]
    #[case::too_short("word = \"x\"", Comparator::Equals, vec!["x"])]
    fn test_predicate_resugaring(
        #[case] attribute: &str,
        #[case] comparator: Comparator,
        #[case] values: Vec<&str>,
    ) {
        let query = parse(&format!("[{attribute}]"), &Settings::default()).unwrap();
        let root = first_root(&query);
        let predicate = query.predicate(query.children(root)[0]).unwrap();

        assert_eq!(predicate.comparator, comparator);
        assert_eq!(predicate.values, values);
    }

    #[test]
    fn test_resugaring_respects_allowed_comparators() {
        let mut settings = Settings::default();
        settings.fields[0].comparators = vec![Comparator::Equals];

        let query = parse("[word = \"run.*\"]", &settings).unwrap();
        let root = first_root(&query);
        let predicate = query.predicate(query.children(root)[0]).unwrap();

        assert_eq!(predicate.comparator, Comparator::Equals);
        assert_eq!(predicate.values, vec!["run.*"]);
    }

    #[rstest]
    #[case::modern("[word = \"(?-i)Foo\"]")]
    #[case::compat("[word = \"(?c)Foo\"]")]
    fn test_case_marker(#[case] text: &str) {
        let query = parse(text, &Settings::default()).unwrap();
        let root = first_root(&query);
        let predicate = query.predicate(query.children(root)[0]).unwrap();

        assert!(predicate.case_sensitive);
        assert_eq!(predicate.values, vec!["Foo"]);
    }

    #[rstest]
    #[case::marker_on_field_without_case("[pos = \"(?-i)N\"]", false, vec!["(?-i)N"])]
    #[case::compat_marker_on_field_without_case("[pos = \"(?c)N\"]", false, vec!["(?c)N"])]
    #[case::marker_alone("[word = \"(?-i)\"]", false, vec!["(?-i)"])]
    #[case::marker_before_wildcard("[word = \"(?-i).*\"]", true, vec![".*"])]
    fn test_literal_case_marker(
        #[case] text: &str,
        #[case] case_sensitive: bool,
        #[case] values: Vec<&str>,
    ) {
        let query = parse(text, &Settings::default()).unwrap();
        let root = first_root(&query);
        let predicate = query.predicate(query.children(root)[0]).unwrap();

        assert_eq!(predicate.case_sensitive, case_sensitive);
        assert_eq!(predicate.values, values);
    }

    #[rstest]
    #[case::trailing_backslash(Predicate::new("word", Comparator::Equals, "a\\"))]
    #[case::backslash_before_quote(Predicate::new("word", Comparator::Equals, "a\\\"b"))]
    #[case::backslash_run(Predicate::new("lemma", Comparator::StartsWith, "x\\\\"))]
    #[case::marker_without_case(Predicate::new("pos", Comparator::Equals, "(?-i)N"))]
    #[case::compat_marker_value(Predicate::new("word", Comparator::NotEquals, "(?c)N"))]
    #[case::marker_only(Predicate::new("lemma", Comparator::Equals, "(?-i)"))]
    #[case::wildcard_value(Predicate::new("word", Comparator::Equals, ".*"))]
    #[case::separator_value(Predicate::new("word", Comparator::Equals, "|"))]
    #[case::quote_and_unicode(Predicate::new("word", Comparator::EndsWith, "é\"").with_case_sensitive(true))]
    fn test_api_values_read_back(#[case] predicate: Predicate) {
        let mut query = Query::default();
        let root = first_root(&query);
        let empty = query.children(root)[0];
        query.remove_node(empty).unwrap();
        query.add_predicate(root, predicate, Operator::And, None).unwrap();

        let text = query.serialize();
        let parsed = parse(&text, &Settings::default()).unwrap();
        assert_eq!(parsed.serialize(), text);
    }

    #[rstest]
    #[case::unknown_field(
        "[color = \"red\"]",
        |e: &ConstraintError| matches!(e, ConstraintError::UnknownField(f) if f == "color"))]
    #[case::unsupported_tag(
        "<p>[]",
        |e: &ConstraintError| matches!(e, ConstraintError::UnsupportedTag(t) if t == "p"))]
    #[case::unsupported_closing_tag(
        "[]</p>",
        |e: &ConstraintError| matches!(e, ConstraintError::UnsupportedTag(_)))]
    fn test_constraint_failures(#[case] text: &str, #[case] check: fn(&ConstraintError) -> bool) {
        match parse(text, &Settings::default()) {
            Err(ParseFailure::Constraint { cause, .. }) => {
                assert!(check(&cause), "unexpected cause: {cause:?}")
            }
            other => panic!("expected a constraint failure, got {other:?}"),
        }
    }

    #[test]
    fn test_disallowed_comparator() {
        let settings = Settings::from_toml_str(
            "[[fields]]\nname = \"pos\"\ncomparators = [\"equals\"]\n",
        )
        .unwrap();

        assert!(matches!(
            parse("[pos != \"N\"]", &settings),
            Err(ParseFailure::Constraint {
                cause: ConstraintError::DisallowedComparator {
                    comparator: Comparator::NotEquals,
                    ..
                },
                ..
            })
        ));
    }

    #[rstest]
    #[case::unterminated("[word=".to_string())]
    #[case::empty(String::new())]
    #[case::garbage("]]".to_string())]
    #[case::deep_parens(format!("[{}word=\"a\"{}]", "(".repeat(20_000), ")".repeat(20_000)))]
    #[case::long_chain(format!("[{}]", vec!["word=\"a\""; 1_000].join(" & ")))]
    fn test_syntax_failures(#[case] text: String) {
        assert!(matches!(
            parse(&text, &Settings::default()),
            Err(ParseFailure::Syntax(_))
        ));
    }

    #[test]
    fn test_load_keeps_query_on_failure() {
        let mut query = Query::default();
        query.load("[word=\"a\"][word=\"b\"]").unwrap();
        let before = query.serialize();

        assert!(query.load("[word=").is_err());
        assert!(query.load("[color=\"red\"]").is_err());
        assert_eq!(query.serialize(), before);
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn test_load_keeps_settings() {
        let settings = Settings::from_toml_str("[[fields]]\nname = \"tag\"\n").unwrap();
        let mut query = Query::new(settings.clone());

        query.load("[\"NN\"]").unwrap();
        assert_eq!(query.settings(), &settings);
        assert_eq!(query.serialize(), "[tag = \"NN\"]");
    }

    #[test]
    fn test_within_only_has_no_tokens() {
        let query = parse("within <s/>", &Settings::default()).unwrap();

        assert!(query.is_empty());
        assert_eq!(query.scope(), &Scope::Sentence);
    }

    #[test]
    fn test_constraint_failure_points_at_attribute() {
        let text = "[word=\"a\" & color=\"red\"]";
        let Err(ParseFailure::Constraint { location, .. }) = parse(text, &Settings::default())
        else {
            panic!("expected a constraint failure");
        };

        assert_eq!(&text[location.offset()..location.offset() + location.len()], "color=\"red\"");
    }
}
