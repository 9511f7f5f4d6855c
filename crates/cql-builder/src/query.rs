use std::fmt::{self, Display, Formatter};

use slotmap::SlotMap;
use smol_str::SmolStr;

use crate::{
    error::BuilderError,
    node::{Group, Node, NodeId, NodeKind},
    predicate::{Comparator, Predicate},
    settings::Settings,
    token::{Token, TokenId},
};

/// Element the whole pattern must be found within.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Document,
    Paragraph,
    Sentence,
    Element(SmolStr),
}

impl Scope {
    pub fn from_element(name: &str) -> Self {
        match name {
            "" => Scope::Document,
            "p" => Scope::Paragraph,
            "s" => Scope::Sentence,
            name => Scope::Element(SmolStr::new(name)),
        }
    }

    /// Element name written in the `within` clause, `None` for the whole document.
    pub fn element(&self) -> Option<&str> {
        match self {
            Scope::Document => None,
            Scope::Paragraph => Some("p"),
            Scope::Sentence => Some("s"),
            Scope::Element(name) if name.is_empty() => None,
            Scope::Element(name) => Some(name),
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Scope::Document => write!(f, "document"),
            Scope::Paragraph => write!(f, "paragraph"),
            Scope::Sentence => write!(f, "sentence"),
            Scope::Element(name) => write!(f, "<{name}/>"),
        }
    }
}

/// An editable token-sequence query.
///
/// Groups and predicates live in one arena and are addressed by [`NodeId`];
/// every token owns a root group that is never removed.
#[derive(Debug, Clone)]
pub struct Query {
    pub(crate) settings: Settings,
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) tokens: SlotMap<TokenId, Token>,
    pub(crate) order: Vec<TokenId>,
    pub(crate) scope: Scope,
}

impl Default for Query {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Query {
    /// A query holding one fresh token.
    pub fn new(settings: Settings) -> Self {
        let mut query = Self::empty(settings);
        query.add_token();
        query
    }

    pub(crate) fn empty(settings: Settings) -> Self {
        Self {
            settings,
            nodes: SlotMap::default(),
            tokens: SlotMap::default(),
            order: Vec::new(),
            scope: Scope::Document,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Back to a single fresh token searched in the whole document.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.tokens.clear();
        self.order.clear();
        self.scope = Scope::Document;
        self.add_token();
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn set_scope(&mut self, scope: Scope) {
        self.scope = scope;
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Appends a token whose root group holds one empty predicate.
    pub fn add_token(&mut self) -> TokenId {
        let token_id = self.create_token();
        self.order.push(token_id);
        token_id
    }

    pub fn insert_token(&mut self, index: usize) -> Result<TokenId, BuilderError> {
        if index > self.order.len() {
            return Err(BuilderError::TokenIndexOutOfRange {
                index,
                len: self.order.len(),
            });
        }

        let token_id = self.create_token();
        self.order.insert(index, token_id);
        Ok(token_id)
    }

    fn create_token(&mut self) -> TokenId {
        let field = self
            .settings
            .default_field()
            .map(|f| f.name.clone())
            .unwrap_or_default();
        let token_id = self.create_bare_token();
        let predicate = self.create_predicate(Predicate::empty(field));

        if let Some(root) = self.tokens.get(token_id).map(Token::root) {
            self.attach(root, predicate);
        }

        token_id
    }

    /// A token with an empty root group, not yet placed in the sequence.
    pub(crate) fn create_bare_token(&mut self) -> TokenId {
        let root = self.nodes.insert(Node::new(NodeKind::Group(Group::root(
            self.settings.root_operator,
        ))));
        self.tokens.insert(Token::new(root))
    }

    pub fn remove_token(&mut self, token_id: TokenId) -> Result<Token, BuilderError> {
        let token = self
            .tokens
            .remove(token_id)
            .ok_or(BuilderError::UnknownToken(token_id))?;

        self.order.retain(|id| *id != token_id);
        self.drop_subtree(token.root());
        Ok(token)
    }

    /// Moves a token so that it ends up at `index` in the sequence.
    pub fn move_token(&mut self, token_id: TokenId, index: usize) -> Result<(), BuilderError> {
        let from = self
            .order
            .iter()
            .position(|id| *id == token_id)
            .ok_or(BuilderError::UnknownToken(token_id))?;

        if index >= self.order.len() {
            return Err(BuilderError::TokenIndexOutOfRange {
                index,
                len: self.order.len(),
            });
        }

        let token_id = self.order.remove(from);
        self.order.insert(index, token_id);
        Ok(())
    }

    pub fn token(&self, token_id: TokenId) -> Option<&Token> {
        self.tokens.get(token_id)
    }

    pub fn token_mut(&mut self, token_id: TokenId) -> Option<&mut Token> {
        self.tokens.get_mut(token_id)
    }

    /// Tokens in sequence order.
    pub fn tokens(&self) -> impl Iterator<Item = (TokenId, &Token)> {
        self.order
            .iter()
            .filter_map(|id| self.tokens.get(*id).map(|token| (*id, token)))
    }

    pub fn token_ids(&self) -> &[TokenId] {
        &self.order
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn group(&self, node_id: NodeId) -> Option<&Group> {
        self.nodes.get(node_id).and_then(Node::as_group)
    }

    pub fn predicate(&self, node_id: NodeId) -> Option<&Predicate> {
        self.nodes.get(node_id).and_then(Node::as_predicate)
    }

    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id).and_then(Node::parent)
    }

    /// Children of a group, empty for predicates and unknown nodes.
    pub fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.group(node_id).map(Group::children).unwrap_or_default()
    }

    /// The token whose tree contains `node_id`.
    pub fn owning_token(&self, node_id: NodeId) -> Option<TokenId> {
        let root = self.ancestors(node_id).last()?;
        self.tokens()
            .find(|(_, token)| token.root() == root)
            .map(|(id, _)| id)
    }

    /// `node_id` followed by each of its ancestors up to the top.
    pub(crate) fn ancestors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(
            self.nodes.contains_key(node_id).then_some(node_id),
            |id| self.parent(*id),
        )
    }

    pub(crate) fn drop_subtree(&mut self, node_id: NodeId) {
        let mut stack = vec![node_id];

        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(id)
                && let NodeKind::Group(group) = node.kind
            {
                stack.extend(group.children);
            }
        }
    }

    fn predicate_mut(&mut self, node_id: NodeId) -> Result<&mut Predicate, BuilderError> {
        self.nodes
            .get_mut(node_id)
            .ok_or(BuilderError::UnknownNode(node_id))?
            .as_predicate_mut()
            .ok_or(BuilderError::NotAPredicate(node_id))
    }

    pub(crate) fn validate_predicate(&self, predicate: &Predicate) -> Result<(), BuilderError> {
        if self.settings.field(&predicate.field).is_none() {
            return Err(BuilderError::UnknownField(predicate.field.clone()));
        }

        if !self.settings.allows(&predicate.field, predicate.comparator) {
            return Err(BuilderError::DisallowedComparator {
                field: predicate.field.clone(),
                comparator: predicate.comparator,
            });
        }

        Ok(())
    }

    /// Switches the predicate to another registered field. The current
    /// comparator must be allowed on the new field.
    pub fn set_field(&mut self, node_id: NodeId, field: &str) -> Result<(), BuilderError> {
        let mut predicate = self.predicate_mut(node_id)?.clone();
        predicate.field = SmolStr::new(field);
        self.validate_predicate(&predicate)?;

        *self.predicate_mut(node_id)? = predicate;
        Ok(())
    }

    pub fn set_comparator(
        &mut self,
        node_id: NodeId,
        comparator: Comparator,
    ) -> Result<(), BuilderError> {
        let field = self.predicate_mut(node_id)?.field.clone();

        if !self.settings.allows(&field, comparator) {
            return Err(BuilderError::DisallowedComparator { field, comparator });
        }

        self.predicate_mut(node_id)?.comparator = comparator;
        Ok(())
    }

    pub fn set_case_sensitive(
        &mut self,
        node_id: NodeId,
        case_sensitive: bool,
    ) -> Result<(), BuilderError> {
        self.predicate_mut(node_id)?.case_sensitive = case_sensitive;
        Ok(())
    }

    pub fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<(), BuilderError> {
        self.predicate_mut(node_id)?.set_value(value);
        Ok(())
    }

    pub fn set_values(&mut self, node_id: NodeId, values: Vec<String>) -> Result<(), BuilderError> {
        self.predicate_mut(node_id)?.values = values;
        Ok(())
    }
}
