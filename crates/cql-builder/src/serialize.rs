use itertools::Itertools;

use crate::{
    Query,
    node::{NodeId, NodeKind},
    predicate::{ALTERNATION, CASE_MARKER, CASE_MARKER_COMPAT, Comparator, Predicate, WILDCARD},
    settings::Settings,
    token::Token,
};

// Inverse of the lexer's unescaping: backslash runs before a quote or at
// the end of the value are doubled, all others are written as is.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => {
                let mut run = 1;
                while chars.next_if_eq(&'\\').is_some() {
                    run += 1;
                }

                let doubled = matches!(chars.peek(), None | Some('"'));
                out.extend(std::iter::repeat_n('\\', if doubled { run * 2 } else { run }));
            }
            _ => out.push(c),
        }
    }

    out
}

/// `field op "value"`, or an empty string for an empty predicate.
pub fn serialize_predicate(predicate: &Predicate, settings: &Settings) -> String {
    if predicate.is_empty() {
        return String::new();
    }

    let value = predicate
        .values
        .iter()
        .map(|value| match predicate.comparator {
            Comparator::StartsWith => format!("{value}{WILDCARD}"),
            Comparator::EndsWith => format!("{WILDCARD}{value}"),
            Comparator::Equals | Comparator::NotEquals => value.clone(),
        })
        .join(&ALTERNATION.to_string());
    let supports_case = settings.supports_case(&predicate.field);
    let marker = if predicate.case_sensitive && supports_case {
        CASE_MARKER
    } else {
        ""
    };
    // A leading `(?c)` reads back as the marker, so it is written in the
    // form the reader produces.
    let value = if supports_case && marker.is_empty() && value.starts_with(CASE_MARKER_COMPAT) {
        value.replacen(CASE_MARKER_COMPAT, CASE_MARKER, 1)
    } else {
        value
    };

    format!(
        "{} {} \"{}{}\"",
        predicate.field,
        predicate.comparator.as_cql(),
        marker,
        escape(&value)
    )
}

impl Query {
    /// The query text for the whole model.
    pub fn serialize(&self) -> String {
        let tokens = self
            .tokens()
            .map(|(_, token)| self.serialize_token(token))
            .join("");

        match self.scope.element() {
            Some(element) if tokens.is_empty() => format!("within <{element}/>"),
            Some(element) => format!("{tokens} within <{element}/>"),
            None => tokens,
        }
    }

    pub fn serialize_token(&self, token: &Token) -> String {
        let mut out = String::new();

        if token.sentence_start() {
            out.push_str("<s>");
        }
        out.push('[');
        out.push_str(&self.serialize_node(token.root()));
        out.push(']');
        if let Some(quantifier) = token.quantifier() {
            out.push_str(&quantifier);
        }
        if token.optional() {
            out.push('?');
        }
        if token.sentence_end() {
            out.push_str("</s>");
        }

        out
    }

    /// Serializes a predicate or group; non-root groups are parenthesized.
    pub fn serialize_node(&self, node_id: NodeId) -> String {
        let Some(node) = self.nodes.get(node_id) else {
            return String::new();
        };

        match &node.kind {
            NodeKind::Predicate(predicate) => serialize_predicate(predicate, &self.settings),
            NodeKind::Group(group) => {
                let body = group
                    .children
                    .iter()
                    .map(|child| self.serialize_node(*child))
                    .filter(|text| !text.is_empty())
                    .join(&format!(" {} ", group.operator));

                if group.is_root || body.is_empty() {
                    body
                } else {
                    format!("({body})")
                }
            }
        }
    }
}
