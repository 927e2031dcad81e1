//! The relational join `left.field`.
//!
//! The left operand must be a concept; `field` is looked up by name among
//! the relations of the concept's ancestor closure. Linking processes the
//! left operand of a join before its right-hand name, so the left side is
//! already linked whenever this runs.

use log::trace;

use deon_types::ast::{NodeId, NodeKind};

use crate::ancestors::{find_relation, visible_relations};
use crate::checker::TypeChecker;
use crate::env::TypeEnv;
use crate::ty::{RelationType, SigType, TypeErrorKind, TypeTag};

impl<'t> TypeChecker<'t> {
    pub(crate) fn synth_join(&mut self, env: &TypeEnv, node: NodeId) -> TypeTag {
        let tree = self.tree;
        let NodeKind::Join { left, right } = tree.kind(node) else {
            return TypeTag::error(node, TypeErrorKind::Internal, "expected a join");
        };
        let left_ty = self.synth(env, *left);
        let TypeTag::Sig(sig) = &left_ty else {
            return TypeTag::error(
                node,
                TypeErrorKind::JoinOperand,
                format!("left side of a join must be a concept, not {left_ty}"),
            );
        };
        let field = match tree.kind(*right) {
            NodeKind::Reference { text, .. } => text.as_str(),
            other => {
                return TypeTag::error(
                    node,
                    TypeErrorKind::Internal,
                    format!("right side of a join must be a name, not a {}", other.label()),
                )
            }
        };

        let Some((found_on, relation)) = find_relation(tree, sig.decl, field) else {
            return TypeTag::error(
                node,
                TypeErrorKind::JoinTarget,
                format!("relatum '{field}' not found in {}", sig.name),
            );
        };
        trace!("join {node}: '{field}' found on {found_on} for {}", sig.name);

        match self.synth(env, relation) {
            TypeTag::Relation(rel) => join_on_left(node, found_on, &rel),
            other => TypeTag::error(
                node,
                TypeErrorKind::Internal,
                format!("expected '{field}' to have a relation type, found {other}"),
            ),
        }
    }

    /// Relations reachable from the left operand of `join`, as
    /// `(name, relation declaration)` pairs. Empty when the left side is not
    /// a concept.
    pub fn join_candidates(&mut self, env: &TypeEnv, join: NodeId) -> Vec<(String, NodeId)> {
        let tree = self.tree;
        let NodeKind::Join { left, .. } = tree.kind(join) else {
            return Vec::new();
        };
        match self.synth(env, *left) {
            TypeTag::Sig(sig) => relation_candidates(self.tree, &sig),
            _ => Vec::new(),
        }
    }
}

/// Result type of joining through `relation`, found on concept `found_on`.
///
/// The relation's declared owner must be the concept it was found on; any
/// other outcome means the ancestor lookup and relation typing disagree.
fn join_on_left(node: NodeId, found_on: NodeId, relation: &RelationType) -> TypeTag {
    if relation.owner.decl == found_on {
        relation.relatum.clone()
    } else {
        TypeTag::error(
            node,
            TypeErrorKind::Internal,
            format!(
                "join should have worked: '{}' is owned by {}",
                relation.name, relation.owner.name
            ),
        )
    }
}

fn relation_candidates(
    tree: &deon_types::ast::SyntaxTree,
    sig: &SigType,
) -> Vec<(String, NodeId)> {
    visible_relations(tree, sig.decl)
        .into_iter()
        .filter_map(|(_, relation)| tree.name_of(relation).map(|name| (name.to_string(), relation)))
        .collect()
}
