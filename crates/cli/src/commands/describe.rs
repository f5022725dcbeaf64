//! Resolved plan description: every feature instantiated once to read its
//! effective node config.

use std::sync::Arc;

use acquisition::SyntheticMicroscope;
use anyhow::{Context, Result};
use contracts::{AcquisitionPlan, FeatureSpec, NodeType, PlanElement, Value};
use feature_engine::{AcquisitionControl, FeatureContext, FeatureRegistry};
use serde::Serialize;

/// Effective node config of one feature reference
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub node_type: NodeType,
    pub device_related: bool,
    pub need_response: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
}

impl NodeSummary {
    /// Flags shown next to the name in tree output
    pub fn flags(&self) -> String {
        let mut flags = vec![self.node_type.to_string()];
        if self.device_related {
            flags.push("device".to_string());
        }
        if self.need_response {
            flags.push("response".to_string());
        }
        flags.join(", ")
    }
}

/// Resolved view of one plan element
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ElementInfo {
    Feature(NodeSummary),
    Sequence {
        items: Vec<ElementInfo>,
    },
    Loop {
        control: NodeSummary,
        body: Vec<ElementInfo>,
    },
    Branch {
        condition: NodeSummary,
        on_true: Vec<ElementInfo>,
        on_false: Vec<ElementInfo>,
    },
}

/// Node counts of a resolved plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanShape {
    pub nodes: usize,
    pub loops: usize,
    pub branches: usize,
    pub device_related: usize,
    pub need_response: usize,
}

impl PlanShape {
    pub fn of(elements: &[ElementInfo]) -> Self {
        let mut shape = Self::default();
        shape.visit(elements);
        shape
    }

    fn count(&mut self, node: &NodeSummary) {
        self.nodes += 1;
        self.device_related += usize::from(node.device_related);
        self.need_response += usize::from(node.need_response);
    }

    fn visit(&mut self, elements: &[ElementInfo]) {
        for element in elements {
            match element {
                ElementInfo::Feature(node) => self.count(node),
                ElementInfo::Sequence { items } => self.visit(items),
                ElementInfo::Loop { control, body } => {
                    self.loops += 1;
                    self.visit(body);
                    self.count(control);
                }
                ElementInfo::Branch {
                    condition,
                    on_true,
                    on_false,
                } => {
                    self.branches += 1;
                    self.count(condition);
                    self.visit(on_true);
                    self.visit(on_false);
                }
            }
        }
    }
}

/// Instantiate every feature of `plan` and collect its node config
pub fn describe_plan(registry: &FeatureRegistry, plan: &AcquisitionPlan) -> Result<Vec<ElementInfo>> {
    let ctx = FeatureContext::new(
        Arc::new(SyntheticMicroscope::default()),
        AcquisitionControl::new(),
    )
    .with_experiment(plan.experiment.clone());
    describe_elements(registry, &ctx, &plan.features)
}

fn describe_elements(
    registry: &FeatureRegistry,
    ctx: &FeatureContext,
    elements: &[PlanElement],
) -> Result<Vec<ElementInfo>> {
    elements
        .iter()
        .map(|element| {
            Ok(match element {
                PlanElement::Feature(spec) => ElementInfo::Feature(describe_node(registry, ctx, spec)?),
                PlanElement::Sequence(items) => ElementInfo::Sequence {
                    items: describe_elements(registry, ctx, items)?,
                },
                PlanElement::Loop(group) => ElementInfo::Loop {
                    control: describe_node(registry, ctx, &group.control)?,
                    body: describe_elements(registry, ctx, &group.body)?,
                },
                PlanElement::Branch(branch) => ElementInfo::Branch {
                    condition: describe_node(registry, ctx, &branch.condition)?,
                    on_true: describe_elements(registry, ctx, &branch.on_true)?,
                    on_false: describe_elements(registry, ctx, &branch.on_false)?,
                },
            })
        })
        .collect()
}

fn describe_node(registry: &FeatureRegistry, ctx: &FeatureContext, spec: &FeatureSpec) -> Result<NodeSummary> {
    let (_, config) = registry
        .descriptor(spec)?
        .instantiate(ctx)
        .with_context(|| format!("Failed to build feature '{}'", spec.name))?;
    Ok(NodeSummary {
        name: spec.name.clone(),
        node_type: config.node_type,
        device_related: config.device_related,
        need_response: config.need_response,
        args: spec.args.clone(),
    })
}

/// Print elements as a box-drawing tree
pub fn print_tree(elements: &[ElementInfo], indent: &str) {
    for (i, element) in elements.iter().enumerate() {
        let is_last = i == elements.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_indent = format!("{indent}{}", if is_last { "   " } else { "│  " });

        match element {
            ElementInfo::Feature(node) => {
                println!("{indent}{prefix} {} [{}]", node.name, node.flags());
            }
            ElementInfo::Sequence { items } => {
                println!("{indent}{prefix} (sequence)");
                print_tree(items, &child_indent);
            }
            ElementInfo::Loop { control, body } => {
                println!("{indent}{prefix} 🔁 loop while {} [{}]", control.name, control.flags());
                print_tree(body, &child_indent);
            }
            ElementInfo::Branch {
                condition,
                on_true,
                on_false,
            } => {
                println!("{indent}{prefix} ❓ branch on {} [{}]", condition.name, condition.flags());
                println!("{child_indent}├─ true");
                print_tree(on_true, &format!("{child_indent}│  "));
                println!("{child_indent}└─ false");
                print_tree(on_false, &format!("{child_indent}   "));
            }
        }
    }
}
