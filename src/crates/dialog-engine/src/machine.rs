//! The interpreter core (spec §4.1). Ephemeral — reconstructed per
//! `Dialog::process` call from the script snapshot — and holds no
//! long-lived mutable state beyond `current_node`.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::node::{EvalContext, Node, NodeRegistry, ParseIssue};
use crate::nodes::MISSING_NEXT_NODE_KEY;
use crate::transition::Transition;
use regex::RegexBuilder;
use serde_json::Value;
use std::collections::HashMap;

/// A parsed, mutable graph of nodes plus the id of the node currently
/// dispatched for evaluation.
pub struct DialogMachine {
    nodes: HashMap<String, Box<dyn Node>>,
    order: Vec<String>,
    current_node: String,
    max_interrupt_scan_nodes: usize,
}

impl DialogMachine {
    /// Builds a machine from an ordered definition array (spec §4.1):
    /// parses every node, repairing missing next-node edges by inserting
    /// a sentinel `end` with id [`MISSING_NEXT_NODE_KEY`], then points
    /// `current_node` at the sole `begin` node.
    pub fn build(definition: &[Value], registry: &NodeRegistry, config: &EngineConfig) -> Result<Self> {
        let mut nodes: HashMap<String, Box<dyn Node>> = HashMap::new();
        let mut order = Vec::new();
        let mut sentinel_inserted = false;

        for raw in definition {
            let mut def = raw.clone();
            let type_name = def.get("type").and_then(Value::as_str).unwrap_or_default().to_string();
            let parser = registry
                .get(&type_name)
                .ok_or_else(|| EngineError::UnknownNodeType(type_name.clone()))?;

            let node = loop {
                match parser(&def) {
                    Ok(node) => break node,
                    Err(ParseIssue::Other(e)) => return Err(e),
                    Err(ParseIssue::MissingNextNode { field }) => {
                        if !sentinel_inserted && !nodes.contains_key(MISSING_NEXT_NODE_KEY) {
                            let sentinel = crate::nodes::End { id: MISSING_NEXT_NODE_KEY.to_string(), node_name: None };
                            nodes.insert(MISSING_NEXT_NODE_KEY.to_string(), Box::new(sentinel));
                            order.push(MISSING_NEXT_NODE_KEY.to_string());
                            sentinel_inserted = true;
                        }
                        def.as_object_mut()
                            .map(|m| m.insert(field.clone(), Value::String(MISSING_NEXT_NODE_KEY.to_string())));
                    }
                }
            };

            let id = node.id().to_string();
            if nodes.contains_key(&id) {
                return Err(EngineError::DuplicateNodeId(id));
            }
            order.push(id.clone());
            nodes.insert(id, node);
        }

        let begin_ids: Vec<&String> = order.iter().filter(|id| nodes.get(*id).map(|n| n.kind() == "begin").unwrap_or(false)).collect();
        if begin_ids.len() != 1 {
            return Err(EngineError::BadEntryCount(begin_ids.len()));
        }
        let current_node = begin_ids[0].clone();

        Ok(Self { nodes, order, current_node, max_interrupt_scan_nodes: config.max_interrupt_scan_nodes })
    }

    pub fn node(&self, id: &str) -> Option<&dyn Node> {
        self.nodes.get(id).map(|n| n.as_ref())
    }

    /// Every node id in the script, parse order — the order the linter and
    /// pre-dispatch interrupt scan walk.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn current_node_id(&self) -> &str {
        &self.current_node
    }

    /// Looks up `id`; a miss leaves `current_node` untouched (spec §4.1).
    pub fn advance_to(&mut self, id: &str) {
        if self.nodes.contains_key(id) {
            self.current_node = id.to_string();
        }
    }

    /// One tick: pre-dispatch interrupt scan, then dispatch to
    /// `current_node`, then compose actions from the transition found.
    pub async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        if let Some(transition) = self.scan_interrupts(ctx).await? {
            return Ok(Some(self.compose(transition)));
        }

        let current = self.nodes.get(&self.current_node).ok_or_else(|| EngineError::NoSuchNode(self.current_node.clone()))?;
        match current.evaluate(ctx).await? {
            Some(transition) => Ok(Some(self.compose(transition))),
            None => Ok(None),
        }
    }

    /// Walks every node in parse order looking for an `Interrupt` whose
    /// pattern matches the response, or a `TimeElapsedInterrupt` ready to
    /// fire (spec §4.1).
    async fn scan_interrupts(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        if self.order.len() > self.max_interrupt_scan_nodes {
            tracing::warn!(
                nodes = self.order.len(),
                limit = self.max_interrupt_scan_nodes,
                "script exceeds max_interrupt_scan_nodes, truncating interrupt scan"
            );
        }

        for id in self.order.iter().take(self.max_interrupt_scan_nodes) {
            let node = self.nodes.get(id).expect("order is in sync with nodes");

            if let (Some(response), Some(patterns)) = (ctx.response, node.interrupt_patterns()) {
                for pattern in patterns {
                    let matched = RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .build()
                        .map(|re| re.is_match(response))
                        .unwrap_or(false);
                    if matched {
                        let transition = crate::transition::Transition::to(node.id().to_string(), crate::transition::Reason::Interrupt)
                            .with_metadata("pattern", Value::String(pattern.clone()))
                            .with_metadata("response", Value::String(response.to_string()));
                        return Ok(Some(transition));
                    }
                }
            }

            if let Some(interrupt) = node.as_time_elapsed_interrupt() {
                if interrupt.should_fire(ctx).await? {
                    return Ok(Some(crate::transition::Transition::to(
                        node.id().to_string(),
                        crate::transition::Reason::InterruptTimeElapsed,
                    )));
                }
            }
        }
        Ok(None)
    }

    /// `transition.actions = exit_actions ++ destination.actions()`; an
    /// empty composed list becomes `None` (the "no side effects" sentinel,
    /// spec §4.1).
    fn compose(&self, mut transition: Transition) -> Transition {
        let mut composed = transition.exit_actions.clone();
        if let Some(destination_id) = &transition.new_state_id {
            if let Some(destination) = self.nodes.get(destination_id) {
                composed.extend(destination.actions());
            }
        }
        transition.actions = if composed.is_empty() { None } else { Some(composed) };
        transition
    }
}
