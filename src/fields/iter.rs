//! Depth-first, pre-order iteration over the descendants of a field.
//!
//! ```text
//! <root>            (not yielded)
//! ├── a             level 1, order 1 of 2
//! │   └── _0        level 2, order 1 of 1
//! └── b             level 1, order 2 of 2
//! ```
//!
//! Fields hold no parent links; the iterator keeps the path from the start
//! field as a stack of sibling slices.

use smallvec::SmallVec;

use super::Field;

/// One field yielded by [`FieldIter`] with its position in the tree.
#[derive(Debug, Clone, Copy)]
pub struct FieldEntry<'a> {
    pub field: &'a Field,
    /// Depth below the start field; its children are at level 1.
    pub level: usize,
    /// 1-based position among its siblings.
    pub order: usize,
    pub siblings: usize,
}

impl FieldEntry<'_> {
    pub fn is_last_sibling(&self) -> bool {
        self.order == self.siblings
    }
}

pub struct FieldIter<'a> {
    stack: SmallVec<[(&'a [Field], usize); 8]>,
}

impl<'a> FieldIter<'a> {
    pub(super) fn new(start: &'a Field) -> Self {
        let mut stack = SmallVec::new();
        if !start.sub_fields().is_empty() {
            stack.push((start.sub_fields(), 0));
        }
        Self { stack }
    }
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = FieldEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (siblings, position) = self.stack.last_mut()?;
            let siblings: &'a [Field] = *siblings;
            let Some(field) = siblings.get(*position) else {
                self.stack.pop();
                continue;
            };
            *position += 1;
            let order = *position;

            let entry = FieldEntry {
                field,
                level: self.stack.len(),
                order,
                siblings: siblings.len(),
            };
            if !field.sub_fields().is_empty() {
                self.stack.push((field.sub_fields(), 0));
            }
            return Some(entry);
        }
    }
}
