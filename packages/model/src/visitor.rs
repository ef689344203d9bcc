use crate::errors::ModelResult;
use crate::ids::{ConnectorIndex, NodeIndex};
use crate::model::NodeModel;
use crate::node::NodeKind;

/// Visitor pattern for traversing a node tree
///
/// This trait provides default implementations that walk the entire subtree.
/// Override specific visit_* methods to act on nodes. Visitors get mutable
/// access to the model because the traversals built on it (imitation
/// building, deletion) edit other trees while they walk.
pub trait ModelVisitor: Sized {
    fn visit_node(&mut self, model: &mut NodeModel, node: NodeIndex) -> ModelResult<()> {
        walk_node(self, model, node)
    }

    fn visit_connective(&mut self, model: &mut NodeModel, node: NodeIndex) -> ModelResult<()> {
        walk_connective(self, model, node)
    }

    fn visit_text(&mut self, _model: &mut NodeModel, _node: NodeIndex) -> ModelResult<()> {
        // Leaf node, no children to walk
        Ok(())
    }

    fn visit_void(&mut self, _model: &mut NodeModel, _node: NodeIndex) -> ModelResult<()> {
        // Leaf node, no children to walk
        Ok(())
    }

    fn visit_connector(&mut self, model: &mut NodeModel, connector: ConnectorIndex) -> ModelResult<()> {
        walk_connector(self, model, connector)
    }
}

/// Dispatch on the node variant
pub fn walk_node<V: ModelVisitor>(visitor: &mut V, model: &mut NodeModel, node: NodeIndex) -> ModelResult<()> {
    match model.node(node).kind() {
        NodeKind::Connective { .. } => visitor.visit_connective(model, node),
        NodeKind::Text { .. } => visitor.visit_text(model, node),
        NodeKind::Void => visitor.visit_void(model, node),
    }
}

/// Visit each connector of a connective node in template order
pub fn walk_connective<V: ModelVisitor>(
    visitor: &mut V,
    model: &mut NodeModel,
    node: NodeIndex,
) -> ModelResult<()> {
    for connector in model.node(node).connectors().to_vec() {
        visitor.visit_connector(model, connector)?;
    }
    Ok(())
}

/// Visit the node currently held by the connector
pub fn walk_connector<V: ModelVisitor>(
    visitor: &mut V,
    model: &mut NodeModel,
    connector: ConnectorIndex,
) -> ModelResult<()> {
    match model.connector(connector).connected_node() {
        Some(child) => visitor.visit_node(model, child),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;
    use crate::template::{ConnectorSlot, ConnectorTemplate, NodeTemplate, TemplateRegistry};
    use std::sync::Arc;

    #[derive(Default)]
    struct KindCounter {
        connective: usize,
        text: usize,
        void: usize,
        connectors: usize,
    }

    impl ModelVisitor for KindCounter {
        fn visit_connective(&mut self, model: &mut NodeModel, node: NodeIndex) -> ModelResult<()> {
            self.connective += 1;
            walk_connective(self, model, node)
        }

        fn visit_text(&mut self, _model: &mut NodeModel, _node: NodeIndex) -> ModelResult<()> {
            self.text += 1;
            Ok(())
        }

        fn visit_void(&mut self, _model: &mut NodeModel, _node: NodeIndex) -> ModelResult<()> {
            self.void += 1;
            Ok(())
        }

        fn visit_connector(&mut self, model: &mut NodeModel, connector: ConnectorIndex) -> ModelResult<()> {
            self.connectors += 1;
            walk_connector(self, model, connector)
        }
    }

    #[test]
    fn test_walks_whole_tree() {
        let templates = TemplateRegistry::new()
            .with_node(NodeTemplate::connective(
                "idIf",
                vec![ConnectorSlot::new("cnctrCond"), ConnectorSlot::new("cnctrBody")],
            ))
            .with_node(NodeTemplate::connective("idNot", vec![ConnectorSlot::new("cnctrCond")]))
            .with_node(NodeTemplate::text("idTrue", "true"))
            .with_node(NodeTemplate::void("idVoid"))
            .with_connector(ConnectorTemplate::new("cnctrCond", "idTrue"))
            .with_connector(ConnectorTemplate::new("cnctrBody", "idVoid").with_initial("idNot"));
        let mut model = NodeModel::new(Arc::new(templates));
        let root = model.create_node(&NodeId::from("idIf")).unwrap();

        let mut counter = KindCounter::default();
        counter.visit_node(&mut model, root).unwrap();

        assert_eq!(counter.connective, 2);
        assert_eq!(counter.text, 2);
        assert_eq!(counter.void, 0);
        assert_eq!(counter.connectors, 3);
    }
}
