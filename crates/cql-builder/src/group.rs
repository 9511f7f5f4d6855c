use slotmap::SecondaryMap;

use crate::{
    Query,
    error::{BuilderError, InvariantViolation},
    node::{Group, Node, NodeId, NodeKind, Operator},
    predicate::Predicate,
};

impl Query {
    /// Creates a detached predicate node, ready for [`Query::insert_child`].
    pub fn create_predicate(&mut self, predicate: Predicate) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Predicate(predicate)))
    }

    /// Creates a detached, empty group node.
    pub fn create_group(&mut self, operator: Operator) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Group(Group::new(operator))))
    }

    pub(crate) fn attach(&mut self, group_id: NodeId, child: NodeId) {
        if let Some(group) = self.nodes.get_mut(group_id).and_then(Node::as_group_mut) {
            group.children.push(child);
        }
        self.set_parent(child, group_id);
    }

    fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    pub(crate) fn group_mut(&mut self, node_id: NodeId) -> Result<&mut Group, BuilderError> {
        self.nodes
            .get_mut(node_id)
            .ok_or(BuilderError::UnknownNode(node_id))?
            .as_group_mut()
            .ok_or(BuilderError::NotAGroup(node_id))
    }

    fn expect_group(&self, node_id: NodeId) -> Result<&Group, BuilderError> {
        self.nodes
            .get(node_id)
            .ok_or(BuilderError::UnknownNode(node_id))?
            .as_group()
            .ok_or(BuilderError::NotAGroup(node_id))
    }

    fn check_anchor(&self, group_id: NodeId, anchor: Option<NodeId>) -> Result<(), BuilderError> {
        match anchor {
            Some(anchor) if self.expect_group(group_id)?.position(anchor).is_none() => {
                Err(BuilderError::AnchorNotChild {
                    anchor,
                    group: group_id,
                })
            }
            _ => self.expect_group(group_id).map(|_| ()),
        }
    }

    /// Places a detached node into `group_id`, combined with the existing
    /// children by `operator` and placed after `anchor` when one is given.
    ///
    /// When `operator` differs from the operator of a group that already has
    /// two or more children, a new group is created:
    ///
    /// * anchored: the anchor and the new node are wrapped together in a
    ///   group using `operator`, at the anchor's position.
    /// * unanchored: all current children move into a group keeping the old
    ///   operator, and `group_id` switches to `operator` holding that group
    ///   followed by the new node.
    ///
    /// Returns the group that now directly holds the node.
    pub fn insert_child(
        &mut self,
        group_id: NodeId,
        child: NodeId,
        operator: Operator,
        anchor: Option<NodeId>,
    ) -> Result<NodeId, BuilderError> {
        let node = self.nodes.get(child).ok_or(BuilderError::UnknownNode(child))?;

        if node.is_root() {
            return Err(BuilderError::RootGroup(child));
        }
        if node.parent.is_some() {
            return Err(BuilderError::AlreadyAttached(child));
        }
        if self.ancestors(group_id).any(|id| id == child) {
            return Err(BuilderError::CyclicMove {
                node: child,
                target: group_id,
            });
        }
        self.check_anchor(group_id, anchor)?;

        let holder = self.insert_unchecked(group_id, child, operator, anchor)?;
        self.normalize_around(holder);
        Ok(self.parent(child).unwrap_or(holder))
    }

    fn insert_unchecked(
        &mut self,
        group_id: NodeId,
        child: NodeId,
        operator: Operator,
        anchor: Option<NodeId>,
    ) -> Result<NodeId, BuilderError> {
        let group = self.group_mut(group_id)?;
        let anchor_position = anchor.and_then(|anchor| group.position(anchor));

        if group.children.len() <= 1 || group.operator == operator {
            if group.children.len() <= 1 {
                group.operator = operator;
            }
            match anchor_position {
                Some(position) => group.children.insert(position + 1, child),
                None => group.children.push(child),
            }
            self.set_parent(child, group_id);
            return Ok(group_id);
        }

        match anchor_position {
            Some(position) => {
                let anchor = group.children[position];
                let fresh = self.nodes.insert(Node {
                    parent: Some(group_id),
                    kind: NodeKind::Group(Group {
                        operator,
                        children: vec![anchor, child],
                        is_root: false,
                    }),
                });
                self.group_mut(group_id)?.children[position] = fresh;
                self.set_parent(anchor, fresh);
                self.set_parent(child, fresh);
                log::trace!("Wrapped anchor {anchor:?} into new {} group {fresh:?}", operator.label());

                Ok(fresh)
            }
            None => {
                let previous = group.operator;
                let moved = std::mem::take(&mut group.children);
                let fresh = self.nodes.insert(Node {
                    parent: Some(group_id),
                    kind: NodeKind::Group(Group {
                        operator: previous,
                        children: moved.clone(),
                        is_root: false,
                    }),
                });
                moved.iter().for_each(|id| self.set_parent(*id, fresh));

                let group = self.group_mut(group_id)?;
                group.operator = operator;
                group.children = vec![fresh, child];
                self.set_parent(child, group_id);
                log::trace!(
                    "Pushed children of {group_id:?} down into new {} group {fresh:?}",
                    previous.label()
                );

                Ok(group_id)
            }
        }
    }

    /// Normalizes `group_id` and its parent, whose operator may now match.
    fn normalize_around(&mut self, group_id: NodeId) {
        let parent = self.parent(group_id);
        self.normalize(group_id);
        if let Some(parent) = parent {
            self.normalize(parent);
        }
    }

    /// Folds nested groups that add no structure: a child group sharing
    /// this group's operator, or the only child of a root group.
    fn normalize(&mut self, group_id: NodeId) {
        let Some(group) = self.group(group_id) else {
            return;
        };
        let operator = group.operator;
        let children = group.children.clone();

        if group.is_root
            && let [only] = children.as_slice()
            && let Some(inner) = self.group(*only).filter(|g| g.children.len() >= 2).cloned()
        {
            inner.children.iter().for_each(|id| self.set_parent(*id, group_id));
            self.nodes.remove(*only);
            if let Ok(root) = self.group_mut(group_id) {
                root.operator = inner.operator;
                root.children = inner.children;
            }
            log::trace!("Root group {group_id:?} absorbed its only child {only:?}");
            return;
        }

        let mut flattened = Vec::with_capacity(children.len());
        let mut changed = false;

        for child in children {
            let absorbed = self
                .group(child)
                .filter(|g| !g.is_root && g.operator == operator && g.children.len() >= 2)
                .map(|g| g.children.clone());

            match absorbed {
                Some(grandchildren) => {
                    grandchildren.iter().for_each(|id| self.set_parent(*id, group_id));
                    flattened.extend(grandchildren);
                    self.nodes.remove(child);
                    changed = true;
                }
                None => flattened.push(child),
            }
        }

        if changed {
            log::trace!("Flattened same-operator groups into {group_id:?}");
            if let Ok(group) = self.group_mut(group_id) {
                group.children = flattened;
            }
        }
    }

    /// Restores the group invariants after a child left `group_id`. A
    /// non-root group left with one child or none is dissolved into its parent.
    pub(crate) fn on_child_removed(&mut self, group_id: NodeId) {
        let Some(node) = self.nodes.get(group_id) else {
            return;
        };
        let Some(group) = node.as_group() else {
            return;
        };

        if group.is_root {
            self.normalize(group_id);
            return;
        }
        if group.children.len() > 1 {
            return;
        }
        let Some(parent_id) = node.parent else {
            return;
        };
        let remaining = group.children.first().copied();

        let Ok(parent) = self.group_mut(parent_id) else {
            return;
        };
        let Some(position) = parent.position(group_id) else {
            return;
        };
        match remaining {
            Some(child) => parent.children[position] = child,
            None => {
                parent.children.remove(position);
            }
        }
        self.nodes.remove(group_id);
        log::trace!("Dissolved group {group_id:?} into {parent_id:?}");

        match remaining {
            Some(child) => {
                self.set_parent(child, parent_id);
                self.normalize(parent_id);
            }
            None => self.on_child_removed(parent_id),
        }
    }

    /// Takes `node_id` out of its parent without restoring the invariants.
    fn detach(&mut self, node_id: NodeId) -> Option<NodeId> {
        let parent_id = self.parent(node_id)?;

        if let Ok(parent) = self.group_mut(parent_id) {
            parent.children.retain(|id| *id != node_id);
        }
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.parent = None;
        }

        Some(parent_id)
    }

    /// Deletes a predicate or group together with everything below it.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<(), BuilderError> {
        let node = self.nodes.get(node_id).ok_or(BuilderError::UnknownNode(node_id))?;

        if node.is_root() {
            return Err(BuilderError::RootGroup(node_id));
        }

        let parent = self.detach(node_id);
        self.drop_subtree(node_id);
        if let Some(parent) = parent {
            self.on_child_removed(parent);
        }

        Ok(())
    }

    /// Relocates an attached node into `target`, possibly in another token.
    pub fn move_node(
        &mut self,
        node_id: NodeId,
        target: NodeId,
        operator: Operator,
        anchor: Option<NodeId>,
    ) -> Result<NodeId, BuilderError> {
        let node = self.nodes.get(node_id).ok_or(BuilderError::UnknownNode(node_id))?;

        if node.is_root() {
            return Err(BuilderError::RootGroup(node_id));
        }
        if self.ancestors(target).any(|id| id == node_id) {
            return Err(BuilderError::CyclicMove {
                node: node_id,
                target,
            });
        }
        self.check_anchor(target, anchor)?;
        if anchor == Some(node_id) {
            return Err(BuilderError::AnchorNotChild {
                anchor: node_id,
                group: target,
            });
        }

        let previous = self.detach(node_id);
        let holder = self.insert_unchecked(target, node_id, operator, anchor)?;
        self.normalize_around(holder);
        if let Some(previous) = previous {
            self.on_child_removed(previous);
        }

        Ok(self.parent(node_id).unwrap_or(holder))
    }

    /// Adds a predicate to `group_id`, see [`Query::insert_child`].
    pub fn add_predicate(
        &mut self,
        group_id: NodeId,
        predicate: Predicate,
        operator: Operator,
        anchor: Option<NodeId>,
    ) -> Result<NodeId, BuilderError> {
        self.validate_predicate(&predicate)?;
        self.check_anchor(group_id, anchor)?;

        let node_id = self.create_predicate(predicate);
        let holder = self.insert_unchecked(group_id, node_id, operator, anchor)?;
        self.normalize_around(holder);
        Ok(node_id)
    }

    /// Adds a nested group of at least two predicates combined by `inner`.
    /// Returns the group the predicates end up in, which is `group_id` or an
    /// existing group when the operators line up.
    pub fn add_group(
        &mut self,
        group_id: NodeId,
        inner: Operator,
        predicates: Vec<Predicate>,
        operator: Operator,
        anchor: Option<NodeId>,
    ) -> Result<NodeId, BuilderError> {
        if predicates.len() < 2 {
            return Err(BuilderError::TooFewChildren(predicates.len()));
        }
        predicates
            .iter()
            .try_for_each(|predicate| self.validate_predicate(predicate))?;
        self.check_anchor(group_id, anchor)?;

        let nested = self.create_group(inner);
        let first = predicates
            .into_iter()
            .map(|predicate| {
                let id = self.create_predicate(predicate);
                self.attach(nested, id);
                id
            })
            .collect::<Vec<_>>()
            .first()
            .copied();

        let holder = self.insert_unchecked(group_id, nested, operator, anchor)?;
        self.normalize_around(holder);

        Ok(first.and_then(|id| self.parent(id)).unwrap_or(nested))
    }

    /// Walks every token tree and reports the first broken structural rule.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen = SecondaryMap::new();

        for (token_id, token) in self.tokens() {
            let root = token.root();
            if !self.nodes.get(root).is_some_and(Node::is_root) {
                return Err(InvariantViolation::MissingRoot(token_id));
            }
            if self.parent(root).is_some() {
                return Err(InvariantViolation::MissingRoot(token_id));
            }

            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                if seen.insert(id, ()).is_some() {
                    return Err(InvariantViolation::SharedNode(id));
                }

                let Some(group) = self.group(id) else {
                    continue;
                };
                if !group.is_root && group.children.len() < 2 {
                    return Err(InvariantViolation::UndersizedGroup(id, group.children.len()));
                }

                for child in &group.children {
                    let node = self
                        .nodes
                        .get(*child)
                        .ok_or(InvariantViolation::DanglingNode(*child))?;
                    if node.parent != Some(id) {
                        return Err(InvariantViolation::ParentMismatch {
                            parent: id,
                            child: *child,
                        });
                    }
                    stack.push(*child);
                }
            }
        }

        Ok(())
    }
}
