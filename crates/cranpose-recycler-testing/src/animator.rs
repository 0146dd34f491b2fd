use cranpose_recycler::{AnimationKind, Holder, HolderId, ItemAnimator, ItemBounds};

/// One call the recycler made into a [`RecordingAnimator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnimationRequest {
    Add(HolderId),
    Remove(HolderId),
    Move {
        holder: HolderId,
        from: ItemBounds,
        to: ItemBounds,
    },
    Change {
        old: HolderId,
        new: Option<HolderId>,
    },
}

impl AnimationRequest {
    pub fn kind(&self) -> AnimationKind {
        match self {
            AnimationRequest::Add(_) => AnimationKind::Add,
            AnimationRequest::Remove(_) => AnimationKind::Remove,
            AnimationRequest::Move { .. } => AnimationKind::Move,
            AnimationRequest::Change { .. } => AnimationKind::Change,
        }
    }
}

/// Animator that never animates anything on its own.
///
/// Every request is recorded and stays "running" until a test ends it,
/// which lets tests observe holders pinned by animations.
#[derive(Debug)]
pub struct RecordingAnimator {
    requests: Vec<AnimationRequest>,
    running: Vec<(HolderId, AnimationKind)>,
    change_animations: bool,
    run_calls: usize,
}

impl Default for RecordingAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingAnimator {
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
            running: Vec::new(),
            change_animations: true,
            run_calls: 0,
        }
    }

    pub fn without_change_animations(mut self) -> Self {
        self.change_animations = false;
        self
    }

    pub fn requests(&self) -> &[AnimationRequest] {
        &self.requests
    }

    /// Returns the requests recorded so far and forgets them.
    pub fn take_requests(&mut self) -> Vec<AnimationRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Animations requested and not yet ended.
    pub fn running(&self) -> &[(HolderId, AnimationKind)] {
        &self.running
    }

    pub fn is_running(&self, id: HolderId) -> bool {
        self.running.iter().any(|(holder, _)| *holder == id)
    }

    /// Number of `run_pending_animations` calls.
    pub fn run_calls(&self) -> usize {
        self.run_calls
    }

    fn record(&mut self, id: HolderId, request: AnimationRequest) -> bool {
        self.running.push((id, request.kind()));
        self.requests.push(request);
        true
    }
}

impl<V> ItemAnimator<V> for RecordingAnimator {
    fn supports_change_animations(&self) -> bool {
        self.change_animations
    }

    fn animate_add(&mut self, holder: &Holder<V>) -> bool {
        self.record(holder.id(), AnimationRequest::Add(holder.id()))
    }

    fn animate_remove(&mut self, holder: &Holder<V>) -> bool {
        self.record(holder.id(), AnimationRequest::Remove(holder.id()))
    }

    fn animate_move(&mut self, holder: &Holder<V>, from: ItemBounds, to: ItemBounds) -> bool {
        self.record(
            holder.id(),
            AnimationRequest::Move {
                holder: holder.id(),
                from,
                to,
            },
        )
    }

    fn animate_change(&mut self, old: &Holder<V>, new: Option<&Holder<V>>) -> bool {
        // Acknowledged once, on the outgoing holder.
        self.record(
            old.id(),
            AnimationRequest::Change {
                old: old.id(),
                new: new.map(Holder::id),
            },
        )
    }

    fn run_pending_animations(&mut self) {
        self.run_calls += 1;
    }

    fn end_animation(&mut self, id: HolderId) -> Option<AnimationKind> {
        let index = self.running.iter().position(|(holder, _)| *holder == id)?;
        Some(self.running.remove(index).1)
    }

    fn end_animations(&mut self) -> Vec<(HolderId, AnimationKind)> {
        std::mem::take(&mut self.running)
    }
}
