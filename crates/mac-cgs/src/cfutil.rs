//! CoreFoundation conversions for values crossing the CGS boundary.

use core_foundation::{
    array::CFArray,
    base::{CFType, CFTypeRef, TCFType},
    boolean::CFBoolean,
    data::CFData,
    number::{CFBooleanGetValue, CFNumber, CFNumberIsFloatType},
    string::CFString,
};

use crate::{SpaceId, WindowId, properties::PropertyValue};

/// Build the CFArray-of-CFNumber shape the space queries expect.
pub(crate) fn window_ids_array(ids: &[WindowId]) -> CFArray<CFNumber> {
    let numbers: Vec<CFNumber> = ids.iter().map(|&id| CFNumber::from(i64::from(id))).collect();
    CFArray::from_CFTypes(&numbers)
}

/// Read a CFArray of CFNumber space ids into a Vec, skipping malformed
/// entries.
pub(crate) fn space_ids_from_array(array: &CFArray<CFNumber>) -> Vec<SpaceId> {
    (0..array.len())
        .filter_map(|i| array.get(i).and_then(|n| n.to_i64()).map(|v| v as SpaceId))
        .collect()
}

/// Decode an owned CF value (copy rule, +1 retain) into a [`PropertyValue`].
///
/// Returns `None` for a null reference or a CF type outside the modeled set;
/// the reference is released either way.
pub(crate) fn value_from_cftype(value: CFTypeRef) -> Option<PropertyValue> {
    if value.is_null() {
        return None;
    }
    // SAFETY: caller passes a +1 reference per the copy rule; wrapping under
    // the create rule releases it when `cf` drops.
    let cf = unsafe { CFType::wrap_under_create_rule(value) };
    if let Some(b) = cf.downcast::<CFBoolean>() {
        // SAFETY: downcast verified the type.
        let v = unsafe { CFBooleanGetValue(b.as_concrete_TypeRef()) };
        return Some(PropertyValue::Bool(v != 0));
    }
    if let Some(n) = cf.downcast::<CFNumber>() {
        // SAFETY: downcast verified the type.
        let is_float = unsafe { CFNumberIsFloatType(n.as_concrete_TypeRef()) } != 0;
        return if is_float {
            n.to_f64().map(PropertyValue::Float)
        } else {
            n.to_i64().map(PropertyValue::Int)
        };
    }
    if let Some(s) = cf.downcast::<CFString>() {
        return Some(PropertyValue::String(s.to_string()));
    }
    if let Some(d) = cf.downcast::<CFData>() {
        return Some(PropertyValue::Data(d.bytes().to_vec()));
    }
    None
}

/// Encode a [`PropertyValue`] as the CF value the set call consumes.
pub(crate) fn value_to_cftype(value: &PropertyValue) -> CFType {
    match value {
        PropertyValue::Bool(b) => {
            let cf = if *b {
                CFBoolean::true_value()
            } else {
                CFBoolean::false_value()
            };
            cf.into_CFType()
        }
        PropertyValue::Int(i) => CFNumber::from(*i).into_CFType(),
        PropertyValue::Float(x) => CFNumber::from(*x).into_CFType(),
        PropertyValue::String(s) => CFString::new(s).into_CFType(),
        PropertyValue::Data(d) => CFData::from_buffer(d).into_CFType(),
    }
}
