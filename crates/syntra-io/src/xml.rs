//! Reading and writing timed automata in the UPPAAL XML subset.
//!
//! The subset consists of a single template with `location`, `init` and
//! `transition` elements; transitions carry `label` children of kind
//! `guard`, `assignment` and `synchronisation`, and the declaration block
//! declares clocks. Guards are conjunctions `clock ⋈ int` joined by `&&`,
//! assignments reset clocks to 0, and the synchronisation label names the
//! action of a transition.

use std::collections::BTreeSet;

use anyhow::{anyhow, bail, Context, Error};
use log::debug;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use syntra_automata::ta::builder::TimedAutomatonBuilder;
use syntra_automata::ta::{TimedAutomaton, Transition};
use syntra_automata::{Action, ClockConstraint, Location};
use syntra_display_utils::join_iterator;

#[derive(Parser)]
#[grammar = "uppaal.pest"]
struct UppaalParser;

/// Escape a string for use in XML text and attributes
fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Undo [`escape`]
fn unescape(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Render a clock constraint in UPPAAL guard syntax
fn constraint_to_guard(clock: &str, constraint: &ClockConstraint) -> String {
    match constraint {
        ClockConstraint::LessThan(n) => format!("{clock} < {n}"),
        ClockConstraint::LessEqual(n) => format!("{clock} <= {n}"),
        ClockConstraint::EqualTo(n) => format!("{clock} == {n}"),
        ClockConstraint::GreaterEqual(n) => format!("{clock} >= {n}"),
        ClockConstraint::GreaterThan(n) => format!("{clock} > {n}"),
    }
}

/// Write a timed automaton as an UPPAAL XML document
pub fn ta_to_xml(ta: &TimedAutomaton, template_name: &str) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<nta>\n");
    if !ta.clocks().is_empty() {
        out.push_str(&format!(
            "  <declaration>clock {};</declaration>\n",
            join_iterator(ta.clocks().iter(), ", ")
        ));
    }
    out.push_str("  <template>\n");
    out.push_str(&format!("    <name>{}</name>\n", escape(template_name)));
    let location_id = |location: &Location| {
        format!(
            "id{}",
            ta.locations()
                .iter()
                .position(|l| l == location)
                .unwrap_or(0)
        )
    };
    for location in ta.locations() {
        out.push_str(&format!(
            "    <location id=\"{}\"><name>{}</name></location>\n",
            location_id(location),
            escape(location.name())
        ));
    }
    out.push_str(&format!(
        "    <init ref=\"{}\"/>\n",
        location_id(ta.initial_location())
    ));
    for transition in ta.transitions() {
        out.push_str("    <transition>\n");
        out.push_str(&format!(
            "      <source ref=\"{}\"/>\n",
            location_id(&transition.source)
        ));
        out.push_str(&format!(
            "      <target ref=\"{}\"/>\n",
            location_id(&transition.target)
        ));
        out.push_str(&format!(
            "      <label kind=\"synchronisation\">{}</label>\n",
            escape(transition.action.name())
        ));
        if !transition.guard.is_empty() {
            let guards = transition
                .guard
                .iter()
                .flat_map(|(clock, constraints)| {
                    constraints
                        .iter()
                        .map(move |constraint| constraint_to_guard(clock, constraint))
                })
                .collect::<Vec<_>>()
                .join(" && ");
            out.push_str(&format!(
                "      <label kind=\"guard\">{}</label>\n",
                escape(&guards)
            ));
        }
        if !transition.resets.is_empty() {
            let resets = transition
                .resets
                .iter()
                .map(|clock| format!("{clock} = 0"))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "      <label kind=\"assignment\">{}</label>\n",
                escape(&resets)
            ));
        }
        out.push_str("    </transition>\n");
    }
    out.push_str("  </template>\n");
    out.push_str("  <system>system controller;</system>\n");
    out.push_str("</nta>\n");
    out
}

/// A parsed XML element
#[derive(Debug)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    fn child_named<'a>(&'a self, name: &'a str) -> Option<&'a Element> {
        self.children_named(name).next()
    }
}

fn build_element(pair: Pair<Rule>) -> Result<Element, Error> {
    let mut name = String::new();
    let mut closing_name = None;
    let mut attributes = Vec::new();
    let mut children = Vec::new();
    let mut text = String::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::name => {
                if name.is_empty() {
                    name = inner.as_str().to_string();
                } else {
                    closing_name = Some(inner.as_str().to_string());
                }
            }
            Rule::attribute => {
                let mut parts = inner.into_inner();
                let key = parts
                    .next()
                    .ok_or_else(|| anyhow!("attribute without a name"))?
                    .as_str()
                    .to_string();
                let value = parts
                    .next()
                    .ok_or_else(|| anyhow!("attribute without a value"))?
                    .as_str()
                    .trim_matches('"')
                    .to_string();
                attributes.push((key, unescape(&value)));
            }
            Rule::content => {
                for content in inner.into_inner() {
                    match content.as_rule() {
                        Rule::element => children.push(build_element(content)?),
                        Rule::text => text.push_str(&unescape(content.as_str())),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    if let Some(closing) = closing_name {
        if closing != name {
            bail!("mismatched XML tags: <{name}> closed by </{closing}>");
        }
    }
    Ok(Element {
        name,
        attributes,
        children,
        text: text.trim().to_string(),
    })
}

/// Parse one `clock ⋈ int` atom of a guard
fn parse_guard_atom(input: &str) -> Result<(String, ClockConstraint), Error> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let [clock, op, bound] = tokens.as_slice() else {
        bail!("malformed guard '{input}', expected 'clock ⋈ int'");
    };
    let bound: u32 = bound
        .parse()
        .with_context(|| format!("malformed guard bound in '{input}'"))?;
    let constraint = match *op {
        "<" => ClockConstraint::LessThan(bound),
        "<=" | "≤" => ClockConstraint::LessEqual(bound),
        "==" | "=" => ClockConstraint::EqualTo(bound),
        ">=" | "≥" => ClockConstraint::GreaterEqual(bound),
        ">" => ClockConstraint::GreaterThan(bound),
        _ => bail!("unknown comparison operator '{op}' in guard '{input}'"),
    };
    Ok((clock.to_string(), constraint))
}

/// Parse the clocks of a declaration block (`clock x, y;`)
fn parse_declaration(input: &str) -> Vec<String> {
    let mut clocks = Vec::new();
    for statement in input.split(';') {
        let statement = statement.trim();
        if let Some(rest) = statement.strip_prefix("clock ") {
            clocks.extend(rest.split(',').map(|clock| clock.trim().to_string()));
        }
    }
    clocks
}

/// Read a timed automaton from an UPPAAL XML document
///
/// `final_locations` selects the accepting locations by name; when empty,
/// every location is accepting.
pub fn ta_from_xml(
    input: &str,
    final_locations: &BTreeSet<Location>,
) -> Result<TimedAutomaton, Error> {
    let mut pairs =
        UppaalParser::parse(Rule::document, input).with_context(|| "failed to parse XML input")?;
    let document = pairs
        .next()
        .ok_or_else(|| anyhow!("empty XML document"))?;
    let root_pair = document
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::element)
        .ok_or_else(|| anyhow!("XML document without a root element"))?;
    let nta = build_element(root_pair)?;
    if nta.name != "nta" {
        bail!("expected an <nta> document, found <{}>", nta.name);
    }
    let template = nta
        .child_named("template")
        .ok_or_else(|| anyhow!("the document contains no <template>"))?;

    let mut clocks = Vec::new();
    for declaration in nta
        .children_named("declaration")
        .chain(template.children_named("declaration"))
    {
        clocks.extend(parse_declaration(&declaration.text));
    }

    // Locations, indexed by their XML id.
    let mut locations = Vec::new();
    for location in template.children_named("location") {
        let id = location
            .attribute("id")
            .ok_or_else(|| anyhow!("a <location> has no id"))?
            .to_string();
        let name = location
            .child_named("name")
            .map(|name| name.text.clone())
            .unwrap_or_else(|| id.clone());
        locations.push((id, Location::new(name)));
    }
    let location_by_id = |id: &str| -> Result<Location, Error> {
        locations
            .iter()
            .find(|(location_id, _)| location_id == id)
            .map(|(_, location)| location.clone())
            .ok_or_else(|| anyhow!("reference to unknown location id '{id}'"))
    };

    let initial = template
        .child_named("init")
        .and_then(|init| init.attribute("ref"))
        .ok_or_else(|| anyhow!("the template declares no initial location"))?;
    let initial = location_by_id(initial)?;

    let mut transitions = Vec::new();
    let mut alphabet = BTreeSet::new();
    for transition in template.children_named("transition") {
        let source = transition
            .child_named("source")
            .and_then(|source| source.attribute("ref"))
            .ok_or_else(|| anyhow!("a <transition> has no source"))?;
        let target = transition
            .child_named("target")
            .and_then(|target| target.attribute("ref"))
            .ok_or_else(|| anyhow!("a <transition> has no target"))?;
        let mut action = None;
        let mut result =
            Transition::new(location_by_id(source)?, Action::new(""), location_by_id(target)?);
        for label in transition.children_named("label") {
            match label.attribute("kind") {
                Some("synchronisation") => {
                    let name = label.text.trim_end_matches(['!', '?']).to_string();
                    action = Some(Action::new(name));
                }
                Some("guard") => {
                    for atom in label.text.split("&&") {
                        let (clock, constraint) = parse_guard_atom(atom.trim())?;
                        result = result.with_guard(clock, constraint);
                    }
                }
                Some("assignment") => {
                    for assignment in label.text.split(',') {
                        let clock = assignment
                            .split('=')
                            .next()
                            .map(str::trim)
                            .unwrap_or_default();
                        if !clock.is_empty() {
                            result = result.with_reset(clock);
                        }
                    }
                }
                _ => {}
            }
        }
        let action =
            action.ok_or_else(|| anyhow!("a <transition> has no synchronisation label"))?;
        result.action = action.clone();
        alphabet.insert(action);
        transitions.push(result);
    }

    let finals: BTreeSet<Location> = if final_locations.is_empty() {
        locations.iter().map(|(_, location)| location.clone()).collect()
    } else {
        final_locations.clone()
    };
    debug!(
        "Parsed a template with {} locations and {} transitions",
        locations.len(),
        transitions.len()
    );

    TimedAutomatonBuilder::new()
        .with_locations(locations.iter().map(|(_, location)| location.clone()))
        .with_alphabet(alphabet)
        .with_clocks(clocks)
        .with_initial_location(initial)
        .with_final_locations(finals)
        .with_transitions(transitions)
        .build()
        .map_err(|err| anyhow!("invalid timed automaton: {err}"))
}
