//! Iterative Tarjan strongly-connected-component decomposition.

#![expect(
    clippy::indexing_slicing,
    reason = "vertices are dense indices into the adjacency list"
)]

const UNVISITED: usize = usize::MAX;

/// Returns the strongly connected components of `adjacency`.
///
/// Vertices are `0..adjacency.len()` and every successor must be a valid
/// vertex. Components are emitted in reverse topological order. The search
/// keeps its own call stack, so deep graphs cannot overflow the thread stack.
#[must_use]
pub fn strongly_connected_components(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let vertex_count = adjacency.len();
    let mut index = vec![UNVISITED; vertex_count];
    let mut lowlink = vec![0; vertex_count];
    let mut on_stack = vec![false; vertex_count];
    let mut stack = Vec::new();
    let mut components = Vec::new();
    let mut next_index = 0;
    // (vertex, position of the next successor to visit)
    let mut frames: Vec<(usize, usize)> = Vec::new();

    for root in 0..vertex_count {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        frames.push((root, 0));

        while let Some(&(vertex, cursor)) = frames.last() {
            if let Some(&successor) = adjacency[vertex].get(cursor) {
                if let Some(frame) = frames.last_mut() {
                    frame.1 += 1;
                }
                if index[successor] == UNVISITED {
                    index[successor] = next_index;
                    lowlink[successor] = next_index;
                    next_index += 1;
                    stack.push(successor);
                    on_stack[successor] = true;
                    frames.push((successor, 0));
                } else if on_stack[successor] {
                    lowlink[vertex] = lowlink[vertex].min(index[successor]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[vertex]);
            }
            if lowlink[vertex] == index[vertex] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component.push(member);
                    if member == vertex {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }

    components
}
