use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// How a value accepts partial updates.
///
/// Keyed values (objects, maps) merge a patch shallowly: keys present in the
/// patch overwrite the current entries, everything else is kept. Non-keyed
/// values have nothing to merge into, so a patch replaces them wholesale.
///
/// Implement this for your own state types with a patch type of optional
/// fields:
///
/// ```
/// use ctxstore::Shape;
///
/// #[derive(Clone, PartialEq, Debug)]
/// struct Settings {
///     volume: u8,
///     muted: bool,
/// }
///
/// #[derive(Default)]
/// struct SettingsPatch {
///     volume: Option<u8>,
///     muted: Option<bool>,
/// }
///
/// impl Shape for Settings {
///     type Patch = SettingsPatch;
///
///     fn merge(&mut self, patch: SettingsPatch) {
///         if let Some(volume) = patch.volume {
///             self.volume = volume;
///         }
///         if let Some(muted) = patch.muted {
///             self.muted = muted;
///         }
///     }
///
///     fn is_keyed(&self) -> bool {
///         true
///     }
/// }
///
/// let mut settings = Settings { volume: 3, muted: false };
/// settings.merge(SettingsPatch { muted: Some(true), ..Default::default() });
/// assert_eq!(settings, Settings { volume: 3, muted: true });
/// ```
pub trait Shape: Clone + 'static {
    /// Partial update accepted by [`merge`](Shape::merge).
    type Patch;

    /// Apply a partial update in place.
    fn merge(&mut self, patch: Self::Patch);

    /// Apply a complete value of the same shape.
    ///
    /// Keyed shapes keep entries the incoming value does not mention; the
    /// default replaces.
    fn absorb(&mut self, full: Self) {
        *self = full;
    }

    /// Whether the value is an object/mapping that merges per key.
    fn is_keyed(&self) -> bool {
        false
    }
}

macro_rules! replace_shape {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Shape for $ty {
                type Patch = $ty;

                fn merge(&mut self, patch: $ty) {
                    *self = patch;
                }
            }
        )*
    };
}

replace_shape!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
);

impl<T: Clone + 'static> Shape for Option<T> {
    type Patch = Option<T>;

    fn merge(&mut self, patch: Option<T>) {
        *self = patch;
    }
}

impl<T: Clone + 'static> Shape for Vec<T> {
    type Patch = Vec<T>;

    fn merge(&mut self, patch: Vec<T>) {
        *self = patch;
    }
}

impl<K: Ord + Clone + 'static, V: Clone + 'static> Shape for BTreeMap<K, V> {
    type Patch = BTreeMap<K, V>;

    fn merge(&mut self, patch: BTreeMap<K, V>) {
        self.extend(patch);
    }

    fn absorb(&mut self, full: Self) {
        self.extend(full);
    }

    fn is_keyed(&self) -> bool {
        true
    }
}

impl<K: Eq + Hash + Clone + 'static, V: Clone + 'static> Shape for HashMap<K, V> {
    type Patch = HashMap<K, V>;

    fn merge(&mut self, patch: HashMap<K, V>) {
        self.extend(patch);
    }

    fn absorb(&mut self, full: Self) {
        self.extend(full);
    }

    fn is_keyed(&self) -> bool {
        true
    }
}

#[cfg(feature = "json")]
impl Shape for serde_json::Value {
    type Patch = serde_json::Value;

    fn merge(&mut self, patch: serde_json::Value) {
        use serde_json::Value;

        match (self, patch) {
            (Value::Object(current), Value::Object(patch)) => {
                for (key, value) in patch {
                    current.insert(key, value);
                }
            }
            (current, patch) => *current = patch,
        }
    }

    fn absorb(&mut self, full: Self) {
        self.merge(full);
    }

    fn is_keyed(&self) -> bool {
        self.is_object()
    }
}
