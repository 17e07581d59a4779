use std::collections::BTreeSet;

#[derive(Debug)]
struct Color {
    labels: Vec<usize>,
    indices: BTreeSet<usize>,
}

impl Color {
    fn new_with_subset(subset: &[usize], label: usize) -> Self {
        Self {
            labels: vec![label],
            indices: subset.iter().copied().collect(),
        }
    }

    fn try_add_subset(&mut self, subset: &[usize], label: usize, local_workspace_set: &mut BTreeSet<usize>) -> bool {
        local_workspace_set.clear();
        local_workspace_set.extend(subset.iter().copied());

        if self.indices.is_disjoint(local_workspace_set) {
            self.labels.push(label);
            self.indices.extend(local_workspace_set.iter().copied());
            true
        } else {
            false
        }
    }
}

/// Partitions subsets of indices into colors such that the subsets of one color are pairwise
/// disjoint.
///
/// Each subset is placed in the first color it does not intersect. Returns the labels (positions
/// in `subsets`) of every color, in ascending order within a color.
pub fn sequential_greedy_coloring<S: AsRef<[usize]>>(subsets: &[S]) -> Vec<Vec<usize>> {
    let mut colors = Vec::<Color>::new();
    let mut workspace_set = BTreeSet::new();

    'subset_loop: for (label, subset) in subsets.iter().enumerate() {
        let subset = subset.as_ref();
        for color in &mut colors {
            if color.try_add_subset(subset, label, &mut workspace_set) {
                continue 'subset_loop;
            }
        }

        // The subset intersects every existing color
        colors.push(Color::new_with_subset(subset, label));
    }

    colors.into_iter().map(|color| color.labels).collect()
}
