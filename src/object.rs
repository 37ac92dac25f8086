//! Uniform lifecycle tag shared by every GPU-resident wrapper (spec C1).

use std::cmp::Ordering;

/// Closed enum of every object kind that carries a status in the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectType {
    App,
    Gpu,
    Window,
    Swapchain,
    Canvas,
    Commands,
    Buffer,
    Images,
    Sampler,
    Bindings,
    Compute,
    Graphics,
    Barrier,
    Semaphores,
    Fences,
    Renderpass,
    Submit,
    Custom,
}

/// Lifecycle state. Monotonic except for the explicit `Created <-> NeedUpdate
/// <-> NeedRecreate` cycle: mutators demote a created object, and the owner
/// re-promotes it to `Created` once it has reacted. `Destroyed` is terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectStatus {
    Init,
    Created,
    NeedUpdate,
    NeedRecreate,
    Destroyed,
}

impl ObjectStatus {
    fn rank(self) -> u8 {
        match self {
            ObjectStatus::Init => 0,
            ObjectStatus::Created => 1,
            ObjectStatus::NeedUpdate => 1,
            ObjectStatus::NeedRecreate => 1,
            ObjectStatus::Destroyed => 2,
        }
    }

    /// True once the object has passed `Created`, including the demoted
    /// `NeedUpdate`/`NeedRecreate` states a living object can cycle through.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            ObjectStatus::Created | ObjectStatus::NeedUpdate | ObjectStatus::NeedRecreate
        )
    }
}

impl PartialOrd for ObjectStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.rank().cmp(&other.rank()))
    }
}

/// `(type, status)` pair every GPU wrapper embeds. No operation other than
/// construction is expected to observe a freshly-`Default`-constructed
/// object before `init` runs.
#[derive(Copy, Clone, Debug)]
pub struct Object {
    ty: ObjectType,
    status: ObjectStatus,
}

impl Object {
    pub fn new(ty: ObjectType) -> Self {
        Self {
            ty,
            status: ObjectStatus::Init,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.ty
    }

    pub fn status(&self) -> ObjectStatus {
        self.status
    }

    /// Called exactly once by the owner after the underlying Vulkan handles
    /// have been created successfully.
    pub fn mark_created(&mut self) {
        self.status = ObjectStatus::Created;
    }

    /// A mutator changed a parameter after creation (e.g. rebound a buffer
    /// region in a `Bindings`); the owner must call `update()` before the
    /// next submit.
    pub fn mark_needs_update(&mut self) {
        debug_assert!(self.status.is_live(), "mark_needs_update on a non-live object");
        self.status = ObjectStatus::NeedUpdate;
    }

    /// The resource depends on swapchain-sized state that has gone stale
    /// (e.g. a window resize); the owner must rebuild before the next frame.
    pub fn mark_needs_recreate(&mut self) {
        debug_assert!(self.status.is_live(), "mark_needs_recreate on a non-live object");
        self.status = ObjectStatus::NeedRecreate;
    }

    /// Called by the owner once it has reacted to `NeedUpdate`/`NeedRecreate`.
    pub fn mark_recreated(&mut self) {
        self.status = ObjectStatus::Created;
    }

    /// Idempotent guard every destructor should open with: `if !obj.begin_destroy() { return; }`
    pub fn begin_destroy(&mut self) -> bool {
        if self.status == ObjectStatus::Destroyed {
            log::trace!("{:?} already destroyed, skipping", self.ty);
            return false;
        }
        self.status = ObjectStatus::Destroyed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_monotonic_modulo_live_cycle() {
        let mut obj = Object::new(ObjectType::Buffer);
        assert_eq!(obj.status(), ObjectStatus::Init);
        obj.mark_created();
        assert_eq!(obj.status(), ObjectStatus::Created);
        obj.mark_needs_update();
        assert_eq!(obj.status(), ObjectStatus::NeedUpdate);
        obj.mark_recreated();
        assert_eq!(obj.status(), ObjectStatus::Created);
        assert!(obj.begin_destroy());
        assert_eq!(obj.status(), ObjectStatus::Destroyed);
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut obj = Object::new(ObjectType::Commands);
        obj.mark_created();
        assert!(obj.begin_destroy());
        assert!(!obj.begin_destroy());
    }

    #[test]
    fn ordering_treats_live_states_as_equal_rank() {
        assert!(ObjectStatus::Created >= ObjectStatus::Created);
        assert!(ObjectStatus::NeedUpdate >= ObjectStatus::Created);
        assert!(ObjectStatus::Destroyed > ObjectStatus::Created);
        assert!(ObjectStatus::Init < ObjectStatus::Created);
    }
}
