use std::ops::Range;

use crate::element::{Handle, FH};

/// Position of a face that was never pushed, or was removed.
const OUT_OF_HEAP: u32 = u32::MAX;
/// Position of a face that was popped, i.e. settled.
const CLOSED: u32 = u32::MAX - 1;

#[derive(Copy, Clone, Debug)]
struct Entry {
    face: FH,
    key: f64,
}

/// Binary min-heap of faces keyed by cost. Every face slot tracks its position
/// in the heap, so keys can be changed in place.
pub(crate) struct FaceHeap {
    items: Vec<Entry>,
    positions: Vec<u32>,
}

fn parent(index: usize) -> Option<usize> {
    if index > 0 {
        Some((index - 1) >> 1)
    } else {
        None
    }
}

fn children(index: usize) -> Range<usize> {
    let off = index << 1;
    (off + 1)..(off + 3)
}

impl FaceHeap {
    pub fn new(num_slots: usize) -> Self {
        FaceHeap {
            items: Vec::new(),
            positions: vec![OUT_OF_HEAP; num_slots],
        }
    }

    fn place(&mut self, index: usize, entry: Entry) {
        self.positions[entry.face.index() as usize] = index as u32;
        self.items[index] = entry;
    }

    fn sift_up(&mut self, index: usize) {
        let item = self.items[index];
        let mut index = index;
        while let Some(pi) = parent(index) {
            if item.key < self.items[pi].key {
                let moved = self.items[pi];
                self.place(index, moved);
                index = pi;
            } else {
                break;
            }
        }
        self.place(index, item);
    }

    fn sift_down(&mut self, index: usize) {
        let item = self.items[index];
        let mut index = index;
        loop {
            let child = children(index)
                .filter(|ci| *ci < self.items.len())
                .min_by(|a, b| self.items[*a].key.total_cmp(&self.items[*b].key));
            match child {
                Some(child) if self.items[child].key < item.key => {
                    let moved = self.items[child];
                    self.place(index, moved);
                    index = child;
                }
                _ => break,
            }
        }
        self.place(index, item);
    }

    pub fn is_closed(&self, face: FH) -> bool {
        self.positions[face.index() as usize] == CLOSED
    }

    /// Push the face, or move it to the new key if it is already waiting.
    /// Closed faces are ignored. Returns true if the heap changed.
    pub fn push_or_update(&mut self, face: FH, key: f64) -> bool {
        match self.positions[face.index() as usize] {
            CLOSED => false,
            OUT_OF_HEAP => {
                self.items.push(Entry { face, key });
                self.sift_up(self.items.len() - 1);
                true
            }
            pos => {
                let pos = pos as usize;
                let old = std::mem::replace(&mut self.items[pos].key, key);
                if key < old {
                    self.sift_up(pos);
                } else {
                    self.sift_down(pos);
                }
                true
            }
        }
    }

    /// Remove the face with the smallest key and mark it closed.
    pub fn pop(&mut self) -> Option<(FH, f64)> {
        let last = self.items.pop()?;
        let top = if self.items.is_empty() {
            last
        } else {
            let top = self.items[0];
            self.place(0, last);
            self.sift_down(0);
            top
        };
        self.positions[top.face.index() as usize] = CLOSED;
        Some((top.face, top.key))
    }
}

#[cfg(test)]
mod test {
    use super::FaceHeap;
    use crate::element::{Handle, FH};

    #[test]
    fn t_heap_order() {
        // Push faces in a weird order, and expect them to come out sorted.
        let mut heap = FaceHeap::new(10);
        for i in [8u32, 1, 5, 3, 9, 2, 6, 4, 7, 0] {
            heap.push_or_update(i.into(), i as f64);
        }
        let mut sorted = Vec::new();
        while let Some((f, key)) = heap.pop() {
            assert_eq!(f.index() as f64, key);
            sorted.push(f.index());
        }
        assert_eq!(&sorted, &(0..10).collect::<Vec<_>>());
    }

    #[test]
    fn t_heap_update_key() {
        let mut heap = FaceHeap::new(4);
        let faces: Vec<FH> = (0u32..4).map(FH::from).collect();
        for (f, key) in faces.iter().zip([4., 3., 2., 1.]) {
            assert!(heap.push_or_update(*f, key));
        }
        // Keys move both ways.
        assert!(heap.push_or_update(faces[3], 5.));
        assert!(heap.push_or_update(faces[0], 0.5));
        assert_eq!(heap.pop(), Some((faces[0], 0.5)));
        assert!(heap.is_closed(faces[0]));
        // Closed faces are never reopened.
        assert!(!heap.push_or_update(faces[0], 0.));
        assert_eq!(heap.pop(), Some((faces[2], 2.)));
        assert_eq!(heap.pop(), Some((faces[1], 3.)));
        assert_eq!(heap.pop(), Some((faces[3], 5.)));
        assert_eq!(heap.pop(), None);
    }
}
