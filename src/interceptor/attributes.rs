use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// AttributeKey names one typed slot in [`Attributes`]. Keys are usually zero sized
/// marker types owned by the interceptor that reads and writes them.
///
/// ```
/// use webrtc_media_transport::interceptor::{AttributeKey, Attributes};
///
/// struct ArrivalTime;
/// impl AttributeKey for ArrivalTime {
///     type Value = u64;
/// }
///
/// let mut a = Attributes::new();
/// a.set::<ArrivalTime>(42);
/// assert_eq!(a.get::<ArrivalTime>(), Some(&42));
/// ```
pub trait AttributeKey: 'static {
    type Value: Any + Send + Sync;
}

/// Attributes are a typed key/value scratch pad threaded through a single read or write
/// call across the whole interceptor chain. They are never persisted past that call.
#[derive(Default, Clone)]
pub struct Attributes {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Attributes {
    pub fn new() -> Self {
        Attributes::default()
    }

    pub fn get<K: AttributeKey>(&self) -> Option<&K::Value> {
        self.values
            .get(&TypeId::of::<K>())
            .and_then(|v| v.downcast_ref::<K::Value>())
    }

    pub fn set<K: AttributeKey>(&mut self, value: K::Value) {
        self.values.insert(TypeId::of::<K>(), Arc::new(value));
    }

    pub fn contains<K: AttributeKey>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<K>())
    }

    /// remove drops the value stored under `K`, returning whether one was present.
    pub fn remove<K: AttributeKey>(&mut self) -> bool {
        self.values.remove(&TypeId::of::<K>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attributes")
            .field("len", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct SeqKey;
    impl AttributeKey for SeqKey {
        type Value = u16;
    }

    struct TagKey;
    impl AttributeKey for TagKey {
        type Value = String;
    }

    #[test]
    fn test_attributes_typed_access() {
        let mut a = Attributes::new();
        assert!(a.is_empty());
        assert_eq!(a.get::<SeqKey>(), None);

        a.set::<SeqKey>(7);
        a.set::<TagKey>("mock".to_owned());
        assert_eq!(a.len(), 2);
        assert_eq!(a.get::<SeqKey>(), Some(&7));
        assert_eq!(a.get::<TagKey>().map(|s| s.as_str()), Some("mock"));

        a.set::<SeqKey>(8);
        assert_eq!(a.get::<SeqKey>(), Some(&8), "set must overwrite");

        let b = a.clone();
        assert!(a.remove::<SeqKey>());
        assert!(!a.remove::<SeqKey>());
        assert!(!a.contains::<SeqKey>());
        assert!(b.contains::<SeqKey>(), "clones are independent");
    }
}
