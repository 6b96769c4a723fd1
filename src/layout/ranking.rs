use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Longest-path ranks for `node_count` nodes joined by `(from, to)` index
/// pairs. Sources get rank 0 and every edge points at a higher rank, except
/// the edges dropped to break cycles.
pub(super) fn compute_ranks(node_count: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut indeg = vec![0usize; node_count];
    for &(from, to) in edges {
        adj[from].push(to);
        indeg[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..node_count)
        .filter(|&idx| indeg[idx] == 0)
        .map(Reverse)
        .collect();
    let mut processed = vec![false; node_count];
    let mut order = Vec::with_capacity(node_count);
    loop {
        while let Some(Reverse(idx)) = ready.pop() {
            if processed[idx] {
                continue;
            }
            processed[idx] = true;
            order.push(idx);
            for &next in &adj[idx] {
                if processed[next] {
                    continue;
                }
                indeg[next] = indeg[next].saturating_sub(1);
                if indeg[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() >= node_count {
            break;
        }

        // Cycle: restart from the earliest unprocessed node, its remaining
        // incoming edges become back edges.
        match (0..node_count).find(|&idx| !processed[idx]) {
            Some(idx) => ready.push(Reverse(idx)),
            None => break,
        }
    }

    let mut order_index = vec![0usize; node_count];
    for (pos, &idx) in order.iter().enumerate() {
        order_index[idx] = pos;
    }

    let mut ranks = vec![0usize; node_count];
    for &idx in &order {
        let rank = ranks[idx];
        for &next in &adj[idx] {
            if order_index[next] <= order_index[idx] {
                continue;
            }
            ranks[next] = ranks[next].max(rank + 1);
        }
    }
    ranks
}

/// Reorders every rank bucket by the median position of its neighbours,
/// sweeping down then up `passes` times.
pub(super) fn order_rank_nodes(rank_nodes: &mut [Vec<usize>], edges: &[(usize, usize)], passes: usize) {
    if rank_nodes.len() <= 1 {
        return;
    }
    let mut incoming: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut outgoing: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(from, to) in edges {
        outgoing.entry(from).or_default().push(to);
        incoming.entry(to).or_default().push(from);
    }

    let mut positions: HashMap<usize, usize> = HashMap::new();
    let update_positions = |rank_nodes: &[Vec<usize>], positions: &mut HashMap<usize, usize>| {
        positions.clear();
        for bucket in rank_nodes {
            for (pos, &idx) in bucket.iter().enumerate() {
                positions.insert(idx, pos);
            }
        }
    };
    update_positions(rank_nodes, &mut positions);

    let sort_bucket = |bucket: &mut Vec<usize>,
                       neighbors: &HashMap<usize, Vec<usize>>,
                       positions: &HashMap<usize, usize>| {
        let current: HashMap<usize, usize> = bucket
            .iter()
            .enumerate()
            .map(|(pos, &idx)| (idx, pos))
            .collect();
        bucket.sort_by(|&a, &b| {
            let a_score = median_position(a, neighbors, positions, &current);
            let b_score = median_position(b, neighbors, positions, &current);
            a_score
                .partial_cmp(&b_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| current.get(&a).cmp(&current.get(&b)))
                .then_with(|| a.cmp(&b))
        });
    };

    for _ in 0..passes.max(1) {
        for rank in 1..rank_nodes.len() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &incoming, &positions);
            update_positions(rank_nodes, &mut positions);
        }
        for rank in (0..rank_nodes.len() - 1).rev() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &outgoing, &positions);
            update_positions(rank_nodes, &mut positions);
        }
    }
}

fn median_position(
    idx: usize,
    neighbors: &HashMap<usize, Vec<usize>>,
    positions: &HashMap<usize, usize>,
    current: &HashMap<usize, usize>,
) -> f32 {
    let fallback = current.get(&idx).copied().unwrap_or(0) as f32;
    let Some(list) = neighbors.get(&idx) else {
        return fallback;
    };
    let mut values: Vec<f32> = list
        .iter()
        .filter_map(|neighbor| positions.get(neighbor))
        .map(|&pos| pos as f32)
        .collect();
    if values.is_empty() {
        return fallback;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) * 0.5
    }
}
