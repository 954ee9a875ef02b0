// Suppose we have a set of items (indexed by a usize).  Vertices of
// the hypergraph, in our case.  We want to be able to mark a subset of
// these as relevant, be able to tell if something has been marked, and if
// it has been marked, map it to range of 0..number_marked.  Marking order
// is kept, so the list doubles as an order-preserving de-duplication of
// the vertex ids seen on a net.
pub struct MarkList {
    pub len: usize,        // Number of elements, 0 to len-1
    pub marked: Vec<bool>, // Marker that an item has been marked
    pub list: Vec<usize>,  // List of actively marked items
    pub index: Vec<usize>, // Index number of an item
}

impl MarkList {
    pub fn new(len: usize) -> MarkList {
        MarkList {
            len: len,
            marked: vec![false; len],
            list: Vec::new(),
            index: vec![0; len],
        }
    }
    /// Returns true if `n` was not marked before.
    pub fn mark(&mut self, n: usize) -> bool {
        if self.marked[n] {
            return false;
        }
        self.marked[n] = true;
        self.index[n] = self.list.len();
        self.list.push(n);
        true
    }
    pub fn is_marked(&self, n: usize) -> bool {
        self.marked[n]
    }
    // Clearing only touches marked items, so reuse across nets is cheap
    pub fn clear(&mut self) {
        for v in &self.list {
            self.marked[*v] = false;
        }
        self.list.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_once_in_order() {
        let mut ml = MarkList::new(6);
        assert!(ml.mark(4));
        assert!(ml.mark(1));
        assert!(!ml.mark(4));
        assert!(ml.mark(5));
        assert_eq!(ml.list, vec![4, 1, 5]);
        assert_eq!(ml.index[5], 2);
        assert!(ml.is_marked(1));
        assert!(!ml.is_marked(0));
    }

    #[test]
    fn clear_resets_marks() {
        let mut ml = MarkList::new(3);
        ml.mark(2);
        ml.mark(0);
        ml.clear();
        assert!(ml.list.is_empty());
        assert!(!ml.is_marked(2));
        assert!(ml.mark(2));
    }
}
