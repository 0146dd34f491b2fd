/// One structural edit reported by the data source.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Insert { start: usize, count: usize },
    Remove { start: usize, count: usize },
    Update { start: usize, count: usize },
    /// Moves a single item. `to` is its index after the move.
    Move { from: usize, to: usize },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Insert,
    Remove,
    Update,
    Move,
}

impl UpdateOp {
    pub fn kind(&self) -> UpdateKind {
        match self {
            UpdateOp::Insert { .. } => UpdateKind::Insert,
            UpdateOp::Remove { .. } => UpdateKind::Remove,
            UpdateOp::Update { .. } => UpdateKind::Update,
            UpdateOp::Move { .. } => UpdateKind::Move,
        }
    }

    /// Whether the op changes which item lives at which index.
    pub fn is_structural(&self) -> bool {
        !matches!(self, UpdateOp::Update { .. })
    }

    /// Maps `position` from before this op to after it. `None` means the
    /// item at `position` was removed.
    pub fn map_position(&self, position: usize) -> Option<usize> {
        match *self {
            UpdateOp::Insert { start, count } => {
                Some(if start <= position { position + count } else { position })
            }
            UpdateOp::Remove { start, count } => {
                if position < start {
                    Some(position)
                } else if position < start + count {
                    None
                } else {
                    Some(position - count)
                }
            }
            UpdateOp::Update { .. } => Some(position),
            UpdateOp::Move { from, to } => {
                if position == from {
                    return Some(to);
                }
                let mut mapped = position;
                if from < mapped {
                    mapped -= 1;
                }
                if to <= mapped {
                    mapped += 1;
                }
                Some(mapped)
            }
        }
    }
    /// Maps `position` from after this op back to before it. `None` means the
    /// item at `position` was inserted by this op.
    pub fn unmap_position(&self, position: usize) -> Option<usize> {
        match *self {
            UpdateOp::Insert { start, count } => {
                if position < start {
                    Some(position)
                } else if position < start + count {
                    None
                } else {
                    Some(position - count)
                }
            }
            UpdateOp::Remove { start, count } => {
                Some(if position < start { position } else { position + count })
            }
            UpdateOp::Update { .. } => Some(position),
            UpdateOp::Move { from, to } => {
                if position == to {
                    return Some(from);
                }
                let shifted = if position < to { position } else { position - 1 };
                Some(if shifted >= from { shifted + 1 } else { shifted })
            }
        }
    }

    /// Rewrites this op for a list that no longer holds one item, found at
    /// `before` ahead of the op and at `after` behind it. Removing the item a
    /// move carries leaves a no-op.
    pub fn without_item(self, before: usize, after: usize) -> UpdateOp {
        match self {
            UpdateOp::Insert { start, count } if before < start => UpdateOp::Insert {
                start: start - 1,
                count,
            },
            UpdateOp::Remove { start, count } if before < start => UpdateOp::Remove {
                start: start - 1,
                count,
            },
            UpdateOp::Update { start, count } if after < start => UpdateOp::Update {
                start: start - 1,
                count,
            },
            UpdateOp::Update { start, count } if after < start + count => UpdateOp::Update {
                start,
                count: count - 1,
            },
            UpdateOp::Move { from, to } if after == to => UpdateOp::Move { from, to: from },
            UpdateOp::Move { from, to } => UpdateOp::Move {
                from: from - usize::from(before < from),
                to: to - usize::from(after < to),
            },
            op => op,
        }
    }

    /// Whether applying the op changes nothing.
    pub fn is_noop(&self) -> bool {
        match *self {
            UpdateOp::Insert { count, .. }
            | UpdateOp::Remove { count, .. }
            | UpdateOp::Update { count, .. } => count == 0,
            UpdateOp::Move { from, to } => from == to,
        }
    }
}
