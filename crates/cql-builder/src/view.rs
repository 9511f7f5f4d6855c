use std::fmt::{self, Display, Formatter};

use crate::{
    Query,
    node::{NodeId, NodeKind},
    serialize::serialize_predicate,
};

const INDENT: &str = "  ";

/// Indented outline of a query, one line per token, group and predicate.
///
/// ```text
/// token 1 <s> {2,5}
///   AND
///     word = "a"
///     OR
///       lemma = "b"
///       pos = "N"
/// within <s/>
/// ```
pub struct TreeView<'a> {
    query: &'a Query,
}

impl<'a> TreeView<'a> {
    pub fn new(query: &'a Query) -> Self {
        Self { query }
    }

    fn fmt_node(&self, f: &mut Formatter<'_>, node_id: NodeId, depth: usize) -> fmt::Result {
        let Some(node) = self.query.node(node_id) else {
            return Ok(());
        };
        let indent = INDENT.repeat(depth);

        match node.kind() {
            NodeKind::Predicate(predicate) if predicate.is_empty() => {
                writeln!(f, "{indent}{} (any)", predicate.field)
            }
            NodeKind::Predicate(predicate) => writeln!(
                f,
                "{indent}{}",
                serialize_predicate(predicate, self.query.settings())
            ),
            NodeKind::Group(group) => {
                writeln!(f, "{indent}{}", group.operator().label())?;
                group
                    .children()
                    .iter()
                    .try_for_each(|child| self.fmt_node(f, *child, depth + 1))
            }
        }
    }
}

impl Display for TreeView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, (_, token)) in self.query.tokens().enumerate() {
            write!(f, "token {}", index + 1)?;
            if token.sentence_start() {
                write!(f, " <s>")?;
            }
            if let Some(quantifier) = token.quantifier() {
                write!(f, " {quantifier}")?;
            }
            if token.optional() {
                write!(f, " optional")?;
            }
            if token.sentence_end() {
                write!(f, " </s>")?;
            }
            writeln!(f)?;

            self.fmt_node(f, token.root(), 1)?;
        }

        match self.query.scope().element() {
            Some(element) => writeln!(f, "within <{element}/>"),
            None => Ok(()),
        }
    }
}

impl Query {
    pub fn tree_view(&self) -> TreeView<'_> {
        TreeView::new(self)
    }
}
