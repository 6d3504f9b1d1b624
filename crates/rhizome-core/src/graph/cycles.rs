//! Strongly connected components over a module adjacency map.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Tarjan's algorithm driven by an explicit frame stack.
///
/// Returns every component (singletons included), each sorted, in the order
/// Tarjan completes them. Nodes are visited in key order, successors in set order.
pub fn tarjan_scc(adjacency: &BTreeMap<String, BTreeSet<String>>) -> Vec<Vec<String>> {
    let labels: Vec<&str> = adjacency.keys().map(|k| k.as_str()).collect();
    let position: HashMap<&str, usize> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| (*label, i))
        .collect();
    // Successors as dense indices; targets missing from the key set are dropped
    let successors: Vec<Vec<usize>> = adjacency
        .values()
        .map(|targets| {
            targets
                .iter()
                .filter_map(|t| position.get(t.as_str()).copied())
                .collect()
        })
        .collect();

    let n = labels.len();
    let mut index_of: Vec<Option<usize>> = vec![None; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut components = Vec::new();

    // (node, next successor position)
    let mut frames: Vec<(usize, usize)> = Vec::new();

    for start in 0..n {
        if index_of[start].is_some() {
            continue;
        }
        index_of[start] = Some(next_index);
        lowlink[start] = next_index;
        next_index += 1;
        stack.push(start);
        on_stack[start] = true;
        frames.push((start, 0));

        while let Some(frame) = frames.last_mut() {
            let (v, pos) = *frame;
            if pos < successors[v].len() {
                frame.1 += 1;
                let w = successors[v][pos];
                match index_of[w] {
                    None => {
                        index_of[w] = Some(next_index);
                        lowlink[w] = next_index;
                        next_index += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        frames.push((w, 0));
                    }
                    Some(w_index) if on_stack[w] => {
                        lowlink[v] = lowlink[v].min(w_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }

            if Some(lowlink[v]) == index_of[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(labels[w].to_string());
                    if w == v {
                        break;
                    }
                }
                component.sort();
                components.push(component);
            }
        }
    }

    components
}

/// Modules that list themselves as a direct successor, sorted.
pub fn self_cycles(adjacency: &BTreeMap<String, BTreeSet<String>>) -> Vec<String> {
    adjacency
        .iter()
        .filter(|(module, targets)| targets.contains(*module))
        .map(|(module, _)| module.clone())
        .collect()
}
