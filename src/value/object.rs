//! Object values: a class tag plus a property map (spec §3).
//!
//! Method dispatch is not modeled here — methods resolve through the
//! [`crate::registry`] by class name at call-lowering time, so an object
//! value itself carries only its class name and instance properties.

use ecow::EcoVec;
use hashbrown::HashMap;

use super::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct VesperObject {
    pub class_name: EcoVec<u8>,
    properties: HashMap<EcoVec<u8>, Value>,
    /// Insertion order of property names, mirrored from [`VesperArray`]'s
    /// ordered-map shape so iteration order matches declaration order
    /// (`VesperArray` is `super::array::VesperArray`, referenced here only
    /// in doc text since objects keep their own, simpler, name-keyed map).
    property_order: alloc::vec::Vec<EcoVec<u8>>,
}

impl VesperObject {
    pub fn new(class_name: impl Into<EcoVec<u8>>) -> Self {
        Self {
            class_name: class_name.into(),
            properties: HashMap::new(),
            property_order: alloc::vec::Vec::new(),
        }
    }

    pub fn get(&self, name: &[u8]) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set(&mut self, name: EcoVec<u8>, value: Value) {
        if !self.properties.contains_key(&name) {
            self.property_order.push(name.clone());
        }
        self.properties.insert(name, value);
    }

    pub fn properties(&self) -> impl Iterator<Item = (&EcoVec<u8>, &Value)> {
        self.property_order
            .iter()
            .map(move |name| (name, self.properties.get(name).expect("tracked in order")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let mut obj = VesperObject::new(EcoVec::from(&b"Point"[..]));
        obj.set(EcoVec::from(&b"x"[..]), Value::Int(1));
        obj.set(EcoVec::from(&b"y"[..]), Value::Int(2));
        assert_eq!(obj.get(b"x"), Some(&Value::Int(1)));
        assert_eq!(obj.get(b"y"), Some(&Value::Int(2)));
        assert_eq!(obj.get(b"z"), None);
    }

    #[test]
    fn properties_preserve_insertion_order() {
        let mut obj = VesperObject::new(EcoVec::from(&b"Point"[..]));
        obj.set(EcoVec::from(&b"b"[..]), Value::Int(2));
        obj.set(EcoVec::from(&b"a"[..]), Value::Int(1));
        let names: alloc::vec::Vec<_> = obj.properties().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, alloc::vec![EcoVec::from(&b"b"[..]), EcoVec::from(&b"a"[..])]);
    }

    #[test]
    fn overwrite_keeps_original_position() {
        let mut obj = VesperObject::new(EcoVec::from(&b"Point"[..]));
        obj.set(EcoVec::from(&b"a"[..]), Value::Int(1));
        obj.set(EcoVec::from(&b"b"[..]), Value::Int(2));
        obj.set(EcoVec::from(&b"a"[..]), Value::Int(99));
        let names: alloc::vec::Vec<_> = obj.properties().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, alloc::vec![EcoVec::from(&b"a"[..]), EcoVec::from(&b"b"[..])]);
        assert_eq!(obj.get(b"a"), Some(&Value::Int(99)));
    }
}
