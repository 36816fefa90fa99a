//! Which fields must be re-evaluated when another field changes.
//!
//! Edges run from a referenced field to the field whose visibility,
//! validation or derivation reads it. Evaluation order is a topological order
//! of that graph; fields caught in a cycle are appended in configuration order.

use crate::ast::VariablePath;
use crate::form::{FieldSpec, FormSpec};
use crate::validation::CustomCheck;
use ahash::{AHashMap, AHashSet};
use std::collections::{BTreeSet, VecDeque};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    order: Vec<String>,
    dependents: AHashMap<String, Vec<String>>,
    cyclic: Vec<String>,
}

impl DependencyGraph {
    pub fn build(form: &FormSpec) -> Self {
        let names: Vec<&str> = form.fields().map(|(_, field)| field.name.as_str()).collect();
        let position: AHashMap<&str, usize> =
            names.iter().enumerate().map(|(i, name)| (*name, i)).collect();

        let mut dependents: AHashMap<String, Vec<String>> = AHashMap::new();
        let mut in_degree = vec![0usize; names.len()];

        for (step, field) in form.fields() {
            let mut reads: AHashSet<&str> = AHashSet::new();
            let mut paths = Vec::new();
            collect_field_paths(field, &mut paths);
            if let Some(rule) = &step.visibility {
                paths.extend(rule.referenced_paths());
            }
            for path in paths {
                if let Some(source) = owning_field(path, form) {
                    reads.insert(source);
                }
            }
            for constraint in &field.validation.not_equal_to {
                if let Some(source) = owning_field(&VariablePath::parse(&constraint.other), form) {
                    reads.insert(source);
                }
            }

            let mut reads: Vec<&str> = reads.into_iter().collect();
            reads.sort_by_key(|name| position[name]);
            for source in reads {
                dependents
                    .entry(source.to_string())
                    .or_default()
                    .push(field.name.clone());
                in_degree[position[field.name.as_str()]] += 1;
            }
        }

        // Kahn's algorithm, always releasing the earliest-declared ready field.
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(names.len());
        let mut placed = vec![false; names.len()];
        while let Some(next) = ready.pop_first() {
            placed[next] = true;
            order.push(names[next].to_string());
            for dependent in dependents.get(names[next]).into_iter().flatten() {
                let idx = position[dependent.as_str()];
                in_degree[idx] -= 1;
                if in_degree[idx] == 0 {
                    ready.insert(idx);
                }
            }
        }

        let cyclic: Vec<String> = names
            .iter()
            .enumerate()
            .filter(|(i, _)| !placed[*i])
            .map(|(_, name)| name.to_string())
            .collect();
        if !cyclic.is_empty() {
            warn!(fields = ?cyclic, "field rules form a cycle; evaluating those fields in configuration order");
            order.extend(cyclic.iter().cloned());
        }

        Self {
            order,
            dependents,
            cyclic,
        }
    }

    /// All fields in evaluation order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Fields that read `name` directly.
    pub fn dependents(&self, name: &str) -> &[String] {
        self.dependents.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn cyclic_fields(&self) -> &[String] {
        &self.cyclic
    }

    /// Every field transitively affected by a change to `name`, in evaluation
    /// order. `name` itself is not included.
    pub fn affected_by(&self, name: &str) -> Vec<&str> {
        let mut seen: AHashSet<&str> = AHashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([name]);
        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents(current) {
                if seen.insert(dependent.as_str()) {
                    queue.push_back(dependent);
                }
            }
        }
        self.order
            .iter()
            .map(String::as_str)
            .filter(|field| *field != name && seen.contains(field))
            .collect()
    }
}

/// Paths read by the field's own rules and by its item fields' rules.
fn collect_field_paths<'f>(field: &'f FieldSpec, paths: &mut Vec<&'f VariablePath>) {
    for rule in [&field.visibility, &field.computed].into_iter().flatten() {
        paths.extend(rule.referenced_paths());
    }
    for constraint in &field.validation.custom {
        if let CustomCheck::Rule(rule) = &constraint.check {
            paths.extend(rule.referenced_paths());
        }
    }
    for item in &field.item_fields {
        collect_field_paths(item, paths);
    }
}

/// Maps a path to the declared field it reads: the whole path if that is a
/// field name, otherwise the longest leading run of segments that is.
pub(crate) fn owning_field<'a>(path: &VariablePath, form: &'a FormSpec) -> Option<&'a str> {
    if let Some(field) = form.field(path.as_str()) {
        return Some(field.name.as_str());
    }
    let segments = path.segments();
    (1..=segments.len())
        .rev()
        .find_map(|len| form.field(&segments[..len].join(".")))
        .map(|field| field.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldKind;
    use crate::interpreter::Interpreter;
    use serde_json::json;

    fn gated(name: &str, on: serde_json::Value, interpreter: &Interpreter) -> FieldSpec {
        FieldSpec::new(name, FieldKind::Text, name).visible_when(interpreter.compiler().compile_rule(&on))
    }

    #[test]
    fn dependents_come_after_their_sources() {
        let interpreter = Interpreter::new();
        let form = FormSpec::single_step(vec![
            gated("companyName", json!({"==": [{"var": "employed"}, "yes"]}), &interpreter),
            gated("employed", json!({">=": [{"var": "age"}, 18]}), &interpreter),
            FieldSpec::new("age", FieldKind::Number, "Age"),
        ]);
        let graph = DependencyGraph::build(&form);
        assert_eq!(graph.order(), ["age", "employed", "companyName"]);
        assert_eq!(graph.affected_by("age"), vec!["employed", "companyName"]);
        assert!(graph.affected_by("companyName").is_empty());
    }

    #[test]
    fn cycles_fall_back_to_configuration_order() {
        let interpreter = Interpreter::new();
        let form = FormSpec::single_step(vec![
            FieldSpec::new("first", FieldKind::Text, "First"),
            gated("a", json!({"var": "b"}), &interpreter),
            gated("b", json!({"var": "a"}), &interpreter),
        ]);
        let graph = DependencyGraph::build(&form);
        assert_eq!(graph.order(), ["first", "a", "b"]);
        assert_eq!(graph.cyclic_fields(), ["a", "b"]);
        assert_eq!(graph.affected_by("a"), vec!["b"]);
    }
}
