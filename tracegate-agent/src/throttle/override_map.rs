use std::collections::HashMap;

/// Fixed-capacity container of named overrides over a shared default.
///
/// Setting a new key into a full map replaces the *default* value instead of
/// evicting an override: operations named early keep their dedicated entry,
/// and everything else shares whatever was assigned last. Lookups for
/// unknown keys return the default.
pub struct OverrideMap<V> {
    capacity: usize,
    default: V,
    overrides: HashMap<String, V>,
}

impl<V> OverrideMap<V> {
    pub fn new(capacity: usize, default: V) -> Self {
        Self {
            capacity,
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.overrides.contains_key(key)
    }

    pub fn get(&self, key: &str) -> &V {
        self.overrides.get(key).unwrap_or(&self.default)
    }

    pub fn get_mut(&mut self, key: &str) -> &mut V {
        if self.overrides.contains_key(key) {
            self.overrides.get_mut(key).unwrap()
        } else {
            &mut self.default
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if self.overrides.contains_key(&key) || self.overrides.len() < self.capacity {
            self.overrides.insert(key, value);
        } else {
            self.default = value;
        }
    }

    pub fn delete(&mut self, key: &str) {
        self.overrides.remove(key);
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    pub fn default_value(&self) -> &V {
        &self.default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn capacity_is_never_exceeded() {
        let mut map = OverrideMap::new(2, 0);
        map.set("a", 1);
        map.set("b", 2);
        map.set("c", 3);
        map.set("d", 4);
        assert_eq!(map.len(), 2);
        // Existing overrides keep their values.
        assert_eq!(*map.get("a"), 1);
        assert_eq!(*map.get("b"), 2);
    }

    #[test]
    fn full_map_set_replaces_the_default() {
        let mut map = OverrideMap::new(1, 0);
        map.set("a", 1);
        map.set("b", 2);
        assert_eq!(*map.default_value(), 2);
        // Unknown keys now see the most recent set value.
        assert_eq!(*map.get("b"), 2);
        assert_eq!(*map.get("zzz"), 2);
        assert_eq!(*map.get("a"), 1);
    }

    #[test]
    fn set_updates_existing_override_even_when_full() {
        let mut map = OverrideMap::new(1, 0);
        map.set("a", 1);
        map.set("a", 9);
        assert_eq!(*map.get("a"), 9);
        assert_eq!(*map.default_value(), 0);
    }

    #[test]
    fn delete_is_total() {
        let mut map = OverrideMap::new(1, 0);
        map.delete("missing");
        map.set("a", 1);
        map.delete("a");
        assert!(!map.has("a"));
        assert_eq!(*map.get("a"), 0);
    }
}
