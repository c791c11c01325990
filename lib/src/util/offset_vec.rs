use std::fmt;

/// Elements taking up one or more local slots
pub trait Width {
    fn width(&self) -> usize;
}

/// Offset in slots, counting the widths of everything before it
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Offset(pub usize);

/// Elements laid out by width, the way parameters sit in local slots
///
/// `long` and `double` take two slots, everything else one. For an instance method the receiver
/// sits at offset 0 and the parameters follow it.
#[derive(Clone, PartialEq, Eq)]
pub struct OffsetVec<T> {
    entries: Vec<(Offset, T)>,
    offset_len: Offset,
}

impl<T: Width> OffsetVec<T> {
    pub fn new() -> OffsetVec<T> {
        OffsetVec {
            entries: vec![],
            offset_len: Offset(0),
        }
    }

    /// Offset the next element would get (the total width so far)
    pub fn offset_len(&self) -> Offset {
        self.offset_len
    }

    pub fn push(&mut self, slot: T) -> Offset {
        let offset = self.offset_len;
        self.offset_len.0 += slot.width();
        self.entries.push((offset, slot));
        offset
    }

    /// Entry at a position, along with its offset
    pub fn get_index(&self, index: usize) -> Option<(Offset, &T)> {
        self.entries.get(index).map(|(offset, t)| (*offset, t))
    }
}

impl<T: Width> Default for OffsetVec<T> {
    fn default() -> Self {
        OffsetVec::new()
    }
}

impl<T: Width> FromIterator<T> for OffsetVec<T> {
    fn from_iter<A: IntoIterator<Item = T>>(elems: A) -> Self {
        let mut offset_vec = OffsetVec::new();
        for elem in elems {
            offset_vec.push(elem);
        }
        offset_vec
    }
}

impl<T: fmt::Debug> fmt::Debug for OffsetVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|(offset, elem)| format!("#{} = {:?}", offset.0, elem)),
            )
            .finish()
    }
}
