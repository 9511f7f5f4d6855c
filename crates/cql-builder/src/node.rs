use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;

slotmap::new_key_type! { pub struct NodeId; }

/// How the direct children of a group combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    #[default]
    #[serde(alias = "&")]
    And,
    #[serde(alias = "|")]
    Or,
}

impl Operator {
    pub fn label(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Operator::And => write!(f, "&"),
            Operator::Or => write!(f, "|"),
        }
    }
}

impl From<cql_lang::BoolOp> for Operator {
    fn from(op: cql_lang::BoolOp) -> Self {
        match op {
            cql_lang::BoolOp::And => Operator::And,
            cql_lang::BoolOp::Or => Operator::Or,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub(crate) operator: Operator,
    pub(crate) children: Vec<NodeId>,
    pub(crate) is_root: bool,
}

impl Group {
    pub(crate) fn new(operator: Operator) -> Self {
        Self {
            operator,
            children: Vec::new(),
            is_root: false,
        }
    }

    pub(crate) fn root(operator: Operator) -> Self {
        Self {
            is_root: true,
            ..Self::new(operator)
        }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub(crate) fn position(&self, child: NodeId) -> Option<usize> {
        self.children.iter().position(|id| *id == child)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Predicate(Predicate),
    Group(Group),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self { parent: None, kind }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_group(&self) -> Option<&Group> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            NodeKind::Predicate(_) => None,
        }
    }

    pub fn as_predicate(&self) -> Option<&Predicate> {
        match &self.kind {
            NodeKind::Predicate(predicate) => Some(predicate),
            NodeKind::Group(_) => None,
        }
    }

    pub(crate) fn as_group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.kind {
            NodeKind::Group(group) => Some(group),
            NodeKind::Predicate(_) => None,
        }
    }

    pub(crate) fn as_predicate_mut(&mut self) -> Option<&mut Predicate> {
        match &mut self.kind {
            NodeKind::Predicate(predicate) => Some(predicate),
            NodeKind::Group(_) => None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.as_group().is_some_and(Group::is_root)
    }
}
