use slotmap::new_key_type;

new_key_type! {
    /// Identifies a node in the document arena.
    pub struct NodeId;

    /// Cancellation handle for a scheduled timer, interval, or frame callback.
    pub struct TaskId;

    /// Identifies a binding registered with the event router.
    pub struct ListenerId;

    /// Identifies a live decorative particle. The particle's node is owned by
    /// its animation and removed when the animation finishes.
    pub struct ParticleId;
}

/// Milliseconds on the host clock. The atomic unit of stage time.
pub type Millis = u64;

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn node_ids_are_distinct() {
        let mut sm = SlotMap::<NodeId, ()>::with_key();
        let a = sm.insert(());
        let b = sm.insert(());
        assert_ne!(a, b);
    }

    #[test]
    fn removed_task_id_is_not_reused_as_equal() {
        let mut sm = SlotMap::<TaskId, ()>::with_key();
        let a = sm.insert(());
        sm.remove(a);
        let b = sm.insert(());
        // Same slot, new generation.
        assert_ne!(a, b);
        assert!(!sm.contains_key(a));
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut sm = SlotMap::<ListenerId, ()>::with_key();
        let id = sm.insert(());
        let mut map = HashMap::new();
        map.insert(id, "hover");
        assert_eq!(map[&id], "hover");
    }
}
