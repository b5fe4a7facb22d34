//! Visualization of timed automata and search trees in DOT format.
//!
//! The output can be rendered with [Graphviz](https://graphviz.org/). Timed
//! automata are drawn as transition graphs with guard and reset annotations;
//! search trees show every node's label and canonical words.

use syntra_automata::ta::TimedAutomaton;
use syntra_display_utils::{indent_all, join_iterator};
use syntra_search::canonical_word::display_word;
use syntra_search::tree::{NodeLabel, SearchTree};

/// Font setup shared by all graphs
const GRAPH_OPTIONS: &str = "\
rankdir=LR \
fontname=\"Helvetica,Arial,sans-serif\" \
node [fontname=\"Helvetica,Arial,sans-serif\"] \
edge [fontname=\"Helvetica,Arial,sans-serif\"];";

/// Options for the initial location
const INITIAL_LOC_OPTIONS: &str = "shape = doublecircle";
/// Options for ordinary locations
const LOC_OPTIONS: &str = "shape = circle";

/// Escape a label for use inside a DOT string
fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render a timed automaton as a DOT graph
pub fn ta_to_dot(ta: &TimedAutomaton, name: &str) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "node [{INITIAL_LOC_OPTIONS}];\n\"{}\";\n",
        escape_label(ta.initial_location().name())
    ));
    body.push_str(&format!("node [{LOC_OPTIONS}];\n"));
    for location in ta.locations() {
        if location != ta.initial_location() {
            body.push_str(&format!("\"{}\";\n", escape_label(location.name())));
        }
    }
    for transition in ta.transitions() {
        let guards = transition
            .guard
            .iter()
            .flat_map(|(clock, constraints)| {
                constraints.iter().map(move |constraint| {
                    format!("{clock} {}", constraint.to_string().trim_start_matches("x "))
                })
            })
            .collect::<Vec<_>>();
        let mut label = transition.action.to_string();
        if !guards.is_empty() {
            label.push_str(&format!(" / {}", guards.join(" ∧ ")));
        }
        if !transition.resets.is_empty() {
            label.push_str(&format!(
                " / {{{}}}",
                join_iterator(transition.resets.iter(), ", ")
            ));
        }
        body.push_str(&format!(
            "\"{}\" -> \"{}\" [label = \"{}\"];\n",
            escape_label(transition.source.name()),
            escape_label(transition.target.name()),
            escape_label(&label)
        ));
    }
    format!(
        "digraph \"{}\" {{\n{}\n{}}}\n",
        escape_label(name),
        indent_all(GRAPH_OPTIONS),
        indent_all(body)
    )
}

/// The fill color of a tree node by its label
fn label_color(label: NodeLabel) -> &'static str {
    match label {
        NodeLabel::Top => "palegreen",
        NodeLabel::Bottom => "lightpink",
        NodeLabel::Canceled => "lightblue",
        NodeLabel::Unknown => "white",
    }
}

/// Render a search tree as a DOT graph
pub fn search_tree_to_dot(tree: &SearchTree) -> String {
    let mut body = String::new();
    body.push_str("node [shape = box, style = filled];\n");
    for id in tree.ids() {
        let node = tree.node(id);
        let words = join_iterator(node.words.iter().map(display_word), "\\n");
        body.push_str(&format!(
            "\"{id}\" [label = \"{id}: {} {}\\n{}\", fillcolor = {}];\n",
            node.label,
            if node.expanded { "" } else { "(open)" },
            escape_label(&words),
            label_color(node.label)
        ));
        if let Some(parent) = node.parent {
            let edge_label = match &node.incoming {
                Some((increments, action)) => format!(
                    "({{{}}}, {action})",
                    join_iterator(increments.iter(), ", ")
                ),
                None => String::new(),
            };
            body.push_str(&format!(
                "\"{parent}\" -> \"{id}\" [label = \"{}\"];\n",
                escape_label(&edge_label)
            ));
        }
    }
    format!(
        "digraph search_tree {{\n{}\n{}}}\n",
        indent_all(GRAPH_OPTIONS),
        indent_all(body)
    )
}
